//! Pure predicates used to enforce path confinement, command allowlisting,
//! and output size limits. No I/O beyond path canonicalization.

use std::path::{Path, PathBuf};

/// Default cap applied to captured tool output before truncation.
pub const DEFAULT_OUTPUT_CAP_BYTES: usize = 50 * 1024;

/// Extensions stripped (case-insensitively) before matching a command
/// against an allowlist.
const KNOWN_EXECUTABLE_EXTENSIONS: &[&str] = &[".exe", ".cmd", ".bat", ".sh", ".ps1"];

/// True iff `path`, once canonicalized, is `root` or a descendant of `root`.
///
/// Both sides are canonicalized so that `..` segments and symlinks can't be
/// used to escape `root`. If either side fails to canonicalize (e.g. the
/// path doesn't exist yet, as with a file about to be created), falls back to
/// lexical comparison against the canonicalized root.
pub fn is_within_dir(path: &Path, root: &Path) -> bool {
    let root_canon = match root.canonicalize() {
        Ok(p) => p,
        Err(_) => return false,
    };

    let candidate = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            // Path doesn't exist yet (e.g. a file to be created). Resolve
            // lexically against the canonical root instead of refusing.
            match lexically_resolve(path, &root_canon) {
                Some(p) => p,
                None => return false,
            }
        }
    };

    candidate == root_canon || candidate.starts_with(&root_canon)
}

/// Resolve `path` against `root` without touching the filesystem, collapsing
/// `.` and `..` components lexically.
fn lexically_resolve(path: &Path, root: &Path) -> Option<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Strip a known executable extension (case-insensitive) from `name`.
fn strip_known_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for ext in KNOWN_EXECUTABLE_EXTENSIONS {
        if lower.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Extract the base-name of the first whitespace-delimited token in `cmd`,
/// normalized for allowlist comparison: path stripped, extension stripped,
/// lowercased.
fn normalize_command_token(token: &str) -> String {
    let base = Path::new(token)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(token);
    strip_known_extension(base).to_ascii_lowercase()
}

/// An empty allowlist means unrestricted. Otherwise the first token of `cmd`
/// must normalize to a member of `allow`.
pub fn is_command_allowed(cmd: &str, allow: &[String]) -> bool {
    if allow.is_empty() {
        return true;
    }
    let first_token = match cmd.split_whitespace().next() {
        Some(t) => t,
        None => return false,
    };
    let normalized = normalize_command_token(first_token);
    allow
        .iter()
        .any(|a| normalize_command_token(a) == normalized)
}

/// Truncate `s` to at most `cap` bytes, preserving UTF-8 validity, and append
/// a marker line noting the original size when truncation occurred.
pub fn truncate_output(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }

    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    let mut out = String::with_capacity(end + 64);
    out.push_str(&s[..end]);
    out.push_str(&format!(
        "\n...[truncated, original size {} bytes]",
        s.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn within_root_itself() {
        let dir = TempDir::new().unwrap();
        assert!(is_within_dir(dir.path(), dir.path()));
    }

    #[test]
    fn within_nested_child() {
        let dir = TempDir::new().unwrap();
        let child = dir.path().join("a/b/c.txt");
        assert!(is_within_dir(&child, dir.path()));
    }

    #[test]
    fn escapes_via_dotdot() {
        let dir = TempDir::new().unwrap();
        let escape = dir.path().join("../outside");
        assert!(!is_within_dir(&escape, dir.path()));
    }

    #[test]
    fn existing_file_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let sibling = TempDir::new().unwrap();
        let f = sibling.path().join("x.txt");
        fs::write(&f, "hi").unwrap();
        assert!(!is_within_dir(&f, dir.path()));
    }

    #[test]
    fn empty_allowlist_allows_anything() {
        assert!(is_command_allowed("rm -rf /", &[]));
    }

    #[test]
    fn allowlist_matches_basename_case_insensitive() {
        let allow = vec!["git".to_string()];
        assert!(is_command_allowed("GIT status", &allow));
        assert!(is_command_allowed("/usr/bin/git log", &allow));
        assert!(is_command_allowed("git.exe log", &allow));
        assert!(!is_command_allowed("rm -rf /", &allow));
    }

    #[test]
    fn truncate_noop_under_cap() {
        let s = "a".repeat(100);
        assert_eq!(truncate_output(&s, 200), s);
    }

    #[test]
    fn truncate_exact_cap_is_unchanged() {
        let s = "a".repeat(50);
        assert_eq!(truncate_output(&s, 50), s);
    }

    #[test]
    fn truncate_over_cap_adds_marker() {
        let s = "a".repeat(51);
        let out = truncate_output(&s, 50);
        assert!(out.starts_with(&"a".repeat(50)));
        assert!(out.contains("truncated, original size 51 bytes"));
    }

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let s = format!("{}\u{1F600}", "a".repeat(49));
        let out = truncate_output(&s, 50);
        assert!(String::from_utf8(out.clone().into_bytes()).is_ok());
        assert!(out.starts_with(&"a".repeat(49)));
    }
}
