//! `PATH` lookup for external renderers.

use std::path::{Path, PathBuf};

/// Locate `program` the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// searched in every `PATH` entry.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
