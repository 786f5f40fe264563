//! `.so` indirection resolution.
//!
//! A man-page source whose first line is `.so <target>` is an alias for
//! another page. Chains are followed iteratively with a visited set, so
//! cycles terminate and missing targets degrade to a synthesized redirect.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use manpager_shared::{ManpagerError, Result};

use crate::strategies::RenderTarget;

/// Prefix of synthesized redirect files, placed next to the source.
pub const REDIRECT_PREFIX: &str = ".temp_";

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of following a source file's `.so` chain.
#[derive(Debug)]
pub enum Resolution {
    /// Not an indirection; render the source itself.
    Direct,
    /// The chain ended at a real page.
    Resolved {
        target: PathBuf,
        working_dir: PathBuf,
    },
    /// The chain pointed at a missing file; a redirect was synthesized.
    Redirect {
        guard: TempRedirect,
        working_dir: PathBuf,
    },
    /// The chain revisited `path`.
    Circular { path: PathBuf },
}

impl Resolution {
    /// The file renderers should be pointed at, or `None` for a cycle.
    pub fn render_target(&self, source: &Path) -> Option<RenderTarget> {
        match self {
            Self::Direct => Some(RenderTarget::direct(source)),
            Self::Resolved {
                target,
                working_dir,
            } => Some(RenderTarget {
                path: target.clone(),
                working_dir: Some(working_dir.clone()),
            }),
            Self::Redirect { guard, working_dir } => Some(RenderTarget {
                path: guard.path().to_path_buf(),
                working_dir: Some(working_dir.clone()),
            }),
            Self::Circular { .. } => None,
        }
    }
}

/// A synthesized redirect file, deleted when dropped.
#[derive(Debug)]
pub struct TempRedirect {
    path: PathBuf,
}

impl TempRedirect {
    fn create(path: PathBuf, contents: &str) -> Result<Self> {
        std::fs::write(&path, contents).map_err(|e| ManpagerError::io(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRedirect {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove redirect file");
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Follow the `.so` chain starting at `source`.
pub fn resolve(source: &Path) -> Result<Resolution> {
    let Some(mut target) = so_target(&read_first_line(source)?) else {
        return Ok(Resolution::Direct);
    };

    let mut visited: HashSet<PathBuf> = HashSet::new();
    visited.insert(canonical(source));
    let mut current = source.to_path_buf();

    loop {
        let Some(next) = candidates(&current, &target)
            .into_iter()
            .find(|c| c.is_file())
        else {
            return synthesize_redirect(source, &target);
        };

        let next = canonical(&next);
        if !visited.insert(next.clone()) {
            debug!(source = %source.display(), at = %next.display(), "circular .so chain");
            return Ok(Resolution::Circular { path: next });
        }

        let line = match read_first_line(&next) {
            Ok(line) => line,
            Err(e) => {
                debug!(source = %source.display(), at = %next.display(), error = %e, "unreadable .so link, rendering source");
                return Ok(Resolution::Direct);
            }
        };

        match so_target(&line) {
            Some(following) => {
                current = next;
                target = following;
            }
            None => {
                let working_dir = next
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                debug!(source = %source.display(), target = %next.display(), "resolved .so chain");
                return Ok(Resolution::Resolved {
                    target: next,
                    working_dir,
                });
            }
        }
    }
}

/// Parse `.so <target>` out of a first line.
pub fn so_target(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(".so")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let target = rest.trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// Lookup locations for `target`, relative to the file that referenced it.
fn candidates(current: &Path, target: &str) -> Vec<PathBuf> {
    let dir = current.parent().unwrap_or_else(|| Path::new("."));
    let bare = bare_name(target);

    if target.contains('/') {
        let parts: Vec<&str> = target.split('/').collect();
        let mut out = Vec::with_capacity(2);
        if let [subdir, file] = parts.as_slice() {
            out.push(dir.join("..").join(subdir).join(file));
        }
        out.push(dir.join(bare));
        out
    } else {
        vec![dir.join(target)]
    }
}

fn synthesize_redirect(source: &Path, target: &str) -> Result<Resolution> {
    let working_dir = source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = working_dir.join(format!("{REDIRECT_PREFIX}{name}"));

    debug!(source = %source.display(), target, "missing .so target, synthesizing redirect");
    match TempRedirect::create(path, &format!(".so {}\n", bare_name(target))) {
        Ok(guard) => Ok(Resolution::Redirect { guard, working_dir }),
        Err(e) => {
            debug!(source = %source.display(), error = %e, "cannot create redirect, rendering source");
            Ok(Resolution::Direct)
        }
    }
}

fn bare_name(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or(target)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn read_first_line(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| ManpagerError::io(path, e))?;
    let mut buf = Vec::new();
    BufReader::new(file)
        .read_until(b'\n', &mut buf)
        .map_err(|e| ManpagerError::io(path, e))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("manpager-so-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn parses_so_lines() {
        assert_eq!(so_target(".so man3/getcwd.3\n"), Some("man3/getcwd.3".into()));
        assert_eq!(so_target(".so   getcwd.3"), Some("getcwd.3".into()));
        assert_eq!(so_target(".so"), None);
        assert_eq!(so_target(".source x"), None);
        assert_eq!(so_target(".TH LS 1"), None);
    }

    #[test]
    fn plain_page_is_direct() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        write(&page, ".TH LS 1\n.SH NAME\nls\n");

        let resolution = resolve(&page).unwrap();
        assert!(matches!(resolution, Resolution::Direct));
        assert_eq!(resolution.render_target(&page), Some(RenderTarget::direct(&page)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn follows_cross_directory_chain() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        let middle = tmp.join("man2/getcwd.2");
        let real = tmp.join("man7/getcwd.7");
        write(&alias, ".so man2/getcwd.2\n");
        write(&middle, ".so man7/getcwd.7\n");
        write(&real, ".TH GETCWD 7\n");

        match resolve(&alias).unwrap() {
            Resolution::Resolved {
                target,
                working_dir,
            } => {
                assert_eq!(target, real.canonicalize().unwrap());
                assert_eq!(working_dir, tmp.join("man7").canonicalize().unwrap());
            }
            other => panic!("expected Resolved, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn falls_back_to_bare_name_in_same_dir() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        let real = tmp.join("man3/getcwd.3");
        write(&alias, ".so man9/getcwd.3\n");
        write(&real, ".TH GETCWD 3\n");

        let resolution = resolve(&alias).unwrap();
        let target = resolution.render_target(&alias).unwrap();
        assert_eq!(target.path, real.canonicalize().unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_target_synthesizes_redirect_and_cleans_up() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        write(&alias, ".so man3/nowhere.3\n");

        let resolution = resolve(&alias).unwrap();
        let redirect_path = match &resolution {
            Resolution::Redirect { guard, working_dir } => {
                assert_eq!(working_dir, &tmp.join("man3"));
                guard.path().to_path_buf()
            }
            other => panic!("expected Redirect, got {other:?}"),
        };

        assert_eq!(redirect_path, tmp.join("man3/.temp_getwd.3"));
        assert_eq!(
            std::fs::read_to_string(&redirect_path).unwrap(),
            ".so nowhere.3\n"
        );

        drop(resolution);
        assert!(!redirect_path.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn blocked_redirect_renders_source() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        write(&alias, ".so man3/nowhere.3\n");
        std::fs::create_dir_all(tmp.join("man3/.temp_getwd.3")).unwrap();

        let resolution = resolve(&alias).unwrap();
        assert!(matches!(resolution, Resolution::Direct));
        assert_eq!(resolution.render_target(&alias), Some(RenderTarget::direct(&alias)));
        assert!(tmp.join("man3/.temp_getwd.3").is_dir());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_link_renders_source() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        write(&alias, ".so mem\n");
        // Opens fine but reading offset 0 fails with EIO, even for root.
        std::os::unix::fs::symlink("/proc/self/mem", tmp.join("man3/mem")).unwrap();

        let resolution = resolve(&alias).unwrap();
        assert!(matches!(resolution, Resolution::Direct));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn cycles_terminate() {
        let tmp = temp_dir();
        let a = tmp.join("man3/a.3");
        let b = tmp.join("man3/b.3");
        write(&a, ".so b.3\n");
        write(&b, ".so a.3\n");

        let resolution = resolve(&a).unwrap();
        assert!(matches!(resolution, Resolution::Circular { .. }));
        assert_eq!(resolution.render_target(&a), None);

        let own = tmp.join("man3/self.3");
        write(&own, ".so man3/self.3\n");
        assert!(matches!(resolve(&own).unwrap(), Resolution::Circular { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unreadable_source_is_io_error() {
        let err = resolve(Path::new("/nonexistent/man1/ls.1")).unwrap_err();
        assert!(matches!(err, ManpagerError::Io { .. }));
    }
}
