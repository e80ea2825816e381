//! Logical path handling
//!
//! Logical paths are `/`-separated and relative to the root of the search
//! path. Sanitized paths have no leading, trailing or repeated `/`; the root
//! is the empty string.

use std::path::{Path, PathBuf};

use crate::error::{VfsError, VfsResult};

/// Logical path separator.
pub const SEPARATOR: char = '/';

fn check_segment(segment: &str) -> Result<(), &'static str> {
    match segment {
        "." | ".." => Err("relative segment"),
        s if s.contains('\\') => Err("backslash"),
        s if s.contains(':') => Err("colon"),
        s if s.contains('\0') => Err("NUL"),
        _ => Ok(()),
    }
}

fn normalize(path: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(path.len());
    for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
        check_segment(segment)?;
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(segment);
    }
    Ok(out)
}

/// Sanitize a logical path.
///
/// # Errors
///
/// `InvalidPath` if any segment is `.`/`..` or contains `\`, `:` or NUL.
pub fn sanitize(path: &str) -> VfsResult<String> {
    normalize(path).map_err(|reason| VfsError::invalid_path(format!("{path:?}: {reason}")))
}

/// Sanitize a mount point. `""` and `"/"` both mean the root.
///
/// # Errors
///
/// `InvalidMountPoint` under the same rules as [`sanitize`].
pub fn sanitize_mount_point(mount_point: &str) -> VfsResult<String> {
    normalize(mount_point).map_err(|reason| {
        VfsError::InvalidMountPoint(format!("{mount_point:?}: {reason}"))
    })
}

/// Part of `path` below `mount_point`, if `path` is at or under it.
pub fn strip_mount<'a>(path: &'a str, mount_point: &str) -> Option<&'a str> {
    if mount_point.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(mount_point)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(SEPARATOR)
    }
}

/// Next component of `mount_point` below `dir`, if `dir` is a strict
/// ancestor of `mount_point`.
pub fn child_toward<'a>(dir: &str, mount_point: &'a str) -> Option<&'a str> {
    let rest = if dir.is_empty() {
        mount_point
    } else {
        mount_point.strip_prefix(dir)?.strip_prefix(SEPARATOR)?
    };
    rest.split(SEPARATOR).next().filter(|s| !s.is_empty())
}

/// Join a sanitized logical path under a native root.
pub fn to_native(root: &Path, path: &str) -> PathBuf {
    path.split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Join two sanitized logical paths.
pub fn join(dir: &str, name: &str) -> String {
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{dir}{SEPARATOR}{name}"),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("").unwrap(), "");
        assert_eq!(sanitize("/").unwrap(), "");
        assert_eq!(sanitize("/maps//e1m1.map/").unwrap(), "maps/e1m1.map");
        assert_eq!(sanitize("a.b/c..d").unwrap(), "a.b/c..d");
    }

    #[test]
    fn test_sanitize_rejects() {
        for bad in ["..", "a/../b", "./a", "a\\b", "c:/x", "a/\0"] {
            assert!(
                matches!(sanitize(bad), Err(VfsError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_mount_point_errors_are_distinct() {
        assert!(matches!(
            sanitize_mount_point("../outside"),
            Err(VfsError::InvalidMountPoint(_))
        ));
        assert_eq!(sanitize_mount_point("/").unwrap(), "");
        assert_eq!(sanitize_mount_point("/mods/extra/").unwrap(), "mods/extra");
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(strip_mount("a/b", ""), Some("a/b"));
        assert_eq!(strip_mount("mods/x.dat", "mods"), Some("x.dat"));
        assert_eq!(strip_mount("mods", "mods"), Some(""));
        assert_eq!(strip_mount("modsx/y", "mods"), None);
        assert_eq!(strip_mount("other", "mods"), None);
    }

    #[test]
    fn test_child_toward() {
        assert_eq!(child_toward("", "mods/extra"), Some("mods"));
        assert_eq!(child_toward("mods", "mods/extra"), Some("extra"));
        assert_eq!(child_toward("mods/extra", "mods/extra"), None);
        assert_eq!(child_toward("mo", "mods/extra"), None);
        assert_eq!(child_toward("", ""), None);
    }

    #[test]
    fn test_to_native_stays_under_root() {
        let root = Path::new("/base");
        assert_eq!(to_native(root, ""), PathBuf::from("/base"));
        assert_eq!(to_native(root, "a/b.txt"), PathBuf::from("/base/a/b.txt"));
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(path in "[a-z./]{0,24}") {
            if let Ok(clean) = sanitize(&path) {
                prop_assert_eq!(sanitize(&clean).unwrap(), clean.clone());
                prop_assert!(!clean.starts_with('/'));
                prop_assert!(!clean.ends_with('/'));
                prop_assert!(!clean.contains("//"));
            }
        }
    }
}
