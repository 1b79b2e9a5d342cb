//! Filesystem path helpers shared across the store, index, and run engine.

use std::path::{Path, PathBuf};

/// Get the user's home directory.
///
/// Delegates to the `home` crate, which handles platform-specific lookup
/// (`$HOME` on Unix, `USERPROFILE`/`HOMEDRIVE`+`HOMEPATH` on Windows).
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir()
}

/// Format a filesystem path for user-facing output, replacing the home
/// directory prefix with `~`. Paths outside home are returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            if stripped.as_os_str().is_empty() {
                return "~".to_string();
            }
            let mut display_path = PathBuf::from("~");
            display_path.push(stripped);
            return display_path.display().to_string();
        }
    }
    path.display().to_string()
}

/// Check that a repo-relative path is safe to use as an identity path: no
/// absolute prefix, no `..` components (spec §3 invariant).
pub fn is_safe_repo_relative(path: &str) -> bool {
    let p = Path::new(path);
    if p.is_absolute() {
        return false;
    }
    !p.components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// Join a (possibly relative) working directory against a repo root.
/// Absolute paths are returned unchanged.
pub fn resolve_cwd(cwd: &str, repo_root: Option<&Path>) -> PathBuf {
    let p = Path::new(cwd);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match repo_root {
        Some(root) => root.join(p),
        None => p.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_non_home_paths_unchanged() {
        let path = PathBuf::from("/tmp/gitsavvy-non-home-path");
        assert_eq!(format_path_for_display(&path), path.display().to_string());
    }

    #[test]
    fn rejects_absolute_and_dotdot() {
        assert!(is_safe_repo_relative("workflows/chaz/deploy"));
        assert!(!is_safe_repo_relative("/etc/passwd"));
        assert!(!is_safe_repo_relative("../escape"));
        assert!(!is_safe_repo_relative("workflows/../../escape"));
    }

    #[test]
    fn resolve_cwd_joins_relative_against_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(resolve_cwd("sub/dir", Some(&root)), root.join("sub/dir"));
        assert_eq!(
            resolve_cwd("/abs/dir", Some(&root)),
            PathBuf::from("/abs/dir")
        );
    }
}
