//! Paragraph and code-block splitting.

/// A prose paragraph or a code block, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub text: String,
    pub is_code: bool,
}

impl Block {
    fn prose(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_code: false,
        }
    }

    fn code(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_code: true,
        }
    }
}

/// Split section text into blocks.
///
/// A fenced region (fences included) is one code block, each 4-space
/// indented line is its own code block, and blank lines separate prose
/// paragraphs. An unterminated fence is flushed as a code block.
pub fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut para: Vec<&str> = Vec::new();
    let mut fence: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.starts_with("```") {
            if in_fence {
                fence.push(line);
                flush_fence(&mut blocks, &mut fence);
                in_fence = false;
            } else {
                flush_para(&mut blocks, &mut para);
                in_fence = true;
                fence.push(line);
            }
            continue;
        }

        if in_fence {
            fence.push(line);
            continue;
        }

        if line.starts_with("    ") {
            flush_para(&mut blocks, &mut para);
            blocks.push(Block::code(line.trim_end()));
            continue;
        }

        if line.trim().is_empty() {
            flush_para(&mut blocks, &mut para);
        } else {
            para.push(line);
        }
    }

    if in_fence {
        flush_fence(&mut blocks, &mut fence);
    } else {
        flush_para(&mut blocks, &mut para);
    }

    blocks
}

fn flush_para(blocks: &mut Vec<Block>, para: &mut Vec<&str>) {
    if para.iter().any(|l| !l.trim().is_empty()) {
        blocks.push(Block::prose(para.join("\n").trim()));
    }
    para.clear();
}

fn flush_fence(blocks: &mut Vec<Block>, fence: &mut Vec<&str>) {
    if !fence.is_empty() {
        blocks.push(Block::code(fence.join("\n").trim_end()));
    }
    fence.clear();
}
