//! Architectural Enforcement Integration Tests
//!
//! Source-scanning checks for the chat crates:
//! - No sleep() calls in production code
//! - No blocking I/O inside async code
//!
//! The scanner is line based. It is deliberately simple and errs on the side
//! of flagging; anything it flags should be rewritten rather than excused.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/cli/src"];

/// Workspace root, independent of the directory tests run from
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../..")))
}

/// A loaded Rust source file
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// Raw lines
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file; `None` if it cannot be read
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        })
    }

    /// Lines as `&str`, for the context helpers
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Format a finding at a zero-based line index
    pub fn violation(&self, idx: usize, what: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            idx + 1,
            what,
            self.lines[idx].trim()
        )
    }
}

/// All `.rs` files under the production directories
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                if let Some(file) = SourceFile::load(entry.path()) {
                    files.push(file);
                }
            }
        }
    }

    files
}

/// The code on a line, without a trailing `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// How the function enclosing a line is declared
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `async fn`
    Async,
    /// plain `fn`
    Sync,
}

/// Whether a trimmed line declares a function, and what kind
pub fn fn_declaration(line: &str) -> Option<FnKind> {
    let line = line.trim_start();
    let rest = line
        .strip_prefix("pub(crate) ")
        .or_else(|| line.strip_prefix("pub(super) "))
        .or_else(|| line.strip_prefix("pub "))
        .unwrap_or(line);

    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Kind of the nearest function declared above `current_idx`
///
/// Returns `None` when a module or impl boundary is reached first.
pub fn enclosing_fn(lines: &[&str], current_idx: usize) -> Option<FnKind> {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if let Some(kind) = fn_declaration(line) {
            return Some(kind);
        }

        // Stop at module/impl boundaries
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return None;
        }
    }
    None
}

/// Whether a line sits inside test code
///
/// Test modules live at the bottom of a file behind `#[cfg(test)]`, so any
/// such marker above the line means test code. A `#[test]` or
/// `#[tokio::test]` directly above the enclosing function counts too.
pub fn is_in_test_code(lines: &[&str], current_idx: usize) -> bool {
    if lines[..current_idx]
        .iter()
        .any(|line| line.trim().starts_with("#[cfg(test)]"))
    {
        return true;
    }

    let Some(fn_idx) = (0..current_idx)
        .rev()
        .find(|&i| fn_declaration(lines[i]).is_some())
    else {
        return false;
    };

    for i in (0..fn_idx).rev() {
        let line = lines[i].trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !line.starts_with("#[") && !line.starts_with("///") {
            break;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_declaration_kinds() {
        assert_eq!(fn_declaration("pub async fn load() {"), Some(FnKind::Async));
        assert_eq!(
            fn_declaration("    pub(crate) fn join_url(a: &str) {"),
            Some(FnKind::Sync)
        );
        assert_eq!(fn_declaration("fn main() {"), Some(FnKind::Sync));
        assert_eq!(fn_declaration("let f = fn_ptr;"), None);
    }

    #[test]
    fn test_enclosing_fn_stops_at_impl() {
        let code = vec![
            "async fn outer() {}",
            "impl Foo {",
            "    let x = std::io::stdout();",
        ];
        assert_eq!(enclosing_fn(&code, 2), None);
    }

    #[test]
    fn test_test_code_detection() {
        let code = vec![
            "fn prod() {}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() {",
            "        std::fs::read(\"x\");",
            "    }",
            "}",
        ];
        assert!(!is_in_test_code(&code, 0));
        assert!(is_in_test_code(&code, 4));

        let code = vec![
            "#[tokio::test]",
            "async fn it_works() {",
            "    tokio::time::sleep(d).await;",
            "}",
        ];
        assert!(is_in_test_code(&code, 2));
    }

    #[test]
    fn test_workspace_root_contains_production_dirs() {
        let root = workspace_root();
        for dir in PRODUCTION_DIRS {
            assert!(root.join(dir).exists(), "missing {dir}");
        }
    }
}
