//! Path resolution against a base directory.
//!
//! Canonicalization here is the ground truth for every containment decision:
//! a member name is never compared as written, only after the on-disk prefix
//! has been resolved through symlinks and the not-yet-created remainder has
//! been normalized lexically.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;

/// Resolves a candidate path against a base directory.
///
/// The candidate is joined to the base (an absolute candidate replaces the
/// base entirely — deliberately permissive input, caught by the containment
/// check rather than here), then canonicalized:
///
/// - if the full path exists, symlinks are collapsed via `fs::canonicalize`;
/// - otherwise the deepest existing ancestor is canonicalized and the
///   remaining components are appended with `.` dropped and `..` popping the
///   tail, so a path that extraction has not created yet still resolves.
///
/// Resolution is a pure function of (candidate, base, current filesystem
/// state). A nonexistent path is never an error; extraction creates paths
/// incrementally and later members routinely name directories that do not
/// exist yet.
///
/// # Errors
///
/// Returns [`ExtractionError::Resolution`] when a filesystem query fails for
/// any reason other than `NotFound` (e.g. permission denied). Safety cannot
/// be assessed for such a path, so the caller must abort rather than guess.
pub fn resolve_under(base: &Path, candidate: &Path) -> Result<PathBuf> {
    resolve_existing_prefix(&base.join(candidate))
}

/// Canonicalizes the existing prefix of `path` and lexically normalizes the
/// rest.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(resolved) => return Ok(resolved),
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(resolution_error(path, e));
        }
        Err(_) => {}
    }

    let components: Vec<Component<'_>> = path.components().collect();
    for split in (1..components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        match prefix.canonicalize() {
            Ok(mut resolved) => {
                push_normalized(&mut resolved, &components[split..]);
                return Ok(resolved);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(resolution_error(&prefix, e)),
        }
    }

    // Nothing along the path exists; the best answer is purely lexical.
    let mut resolved = PathBuf::new();
    push_normalized(&mut resolved, &components);
    Ok(resolved)
}

/// Appends components onto an already-resolved prefix, collapsing `.` and
/// `..` as it goes.
///
/// `PathBuf::pop` at the filesystem root is a no-op, which matches realpath:
/// `/..` resolves to `/`.
fn push_normalized(onto: &mut PathBuf, components: &[Component<'_>]) {
    for component in components {
        match component {
            Component::ParentDir => {
                onto.pop();
            }
            Component::CurDir => {}
            _ => onto.push(component),
        }
    }
}

/// Lexically normalizes a path without touching the filesystem.
///
/// Used for hardlink creation targets, which follow the archive convention
/// of being relative to the archive root rather than the link's directory.
pub(crate) fn normalize_lexical(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();
    let mut normalized = PathBuf::new();
    push_normalized(&mut normalized, &components);
    normalized
}

fn resolution_error(path: &Path, source: std::io::Error) -> ExtractionError {
    ExtractionError::Resolution {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_existing_relative() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        fs::create_dir(base.join("sub")).unwrap();
        fs::write(base.join("sub/file.txt"), "x").unwrap();

        let resolved = resolve_under(&base, Path::new("sub/file.txt")).unwrap();
        assert_eq!(resolved, base.join("sub/file.txt"));
    }

    #[test]
    fn test_resolve_missing_tail_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();

        let resolved = resolve_under(&base, Path::new("not/yet/created.txt")).unwrap();
        assert_eq!(resolved, base.join("not/yet/created.txt"));
    }

    #[test]
    fn test_resolve_collapses_dot_and_dotdot_in_missing_tail() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();

        let resolved = resolve_under(&base, Path::new("a/./b/../c.txt")).unwrap();
        assert_eq!(resolved, base.join("a/c.txt"));
    }

    #[test]
    fn test_resolve_traversal_escapes_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();

        let resolved = resolve_under(&base, Path::new("../evil.txt")).unwrap();
        assert_eq!(resolved, base.parent().unwrap().join("evil.txt"));
        assert!(!resolved.starts_with(&base));
    }

    #[test]
    fn test_resolve_absolute_candidate_replaces_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();

        // join() semantics: an absolute candidate wins. The containment
        // check downstream is what rejects it.
        let resolved = resolve_under(&base, Path::new("/etc/passwd")).unwrap();
        assert_eq!(resolved, PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_resolve_dotdot_clamps_at_root() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let depth = base.components().count() + 10;

        let candidate = PathBuf::from("../".repeat(depth) + "x");
        let resolved = resolve_under(&base, &candidate).unwrap();
        assert_eq!(resolved, PathBuf::from("/x"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_follows_on_disk_symlink() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let outside = TempDir::new().unwrap();
        let outside_path = outside.path().canonicalize().unwrap();

        // A directory inside the base that is really a symlink pointing out.
        symlink(&outside_path, base.join("detour")).unwrap();

        let resolved = resolve_under(&base, Path::new("detour/payload.txt")).unwrap();
        assert_eq!(resolved, outside_path.join("payload.txt"));
        assert!(!resolved.starts_with(&base));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_symlink_prefix_then_missing_suffix() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        fs::create_dir(base.join("real")).unwrap();
        symlink(base.join("real"), base.join("alias")).unwrap();

        let resolved = resolve_under(&base, Path::new("alias/new/file.txt")).unwrap();
        assert_eq!(resolved, base.join("real/new/file.txt"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();

        let first = resolve_under(&base, Path::new("a/b/../c")).unwrap();
        let second = resolve_under(&base, Path::new("a/b/../c")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_lexical() {
        assert_eq!(
            normalize_lexical(Path::new("a/b/../c/./d")),
            PathBuf::from("a/c/d")
        );
        assert_eq!(
            normalize_lexical(Path::new("/tmp/a/b/c/../../d")),
            PathBuf::from("/tmp/a/d")
        );
    }
}
