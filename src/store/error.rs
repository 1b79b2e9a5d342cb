//! Error type for the Workflow Store.

use std::fmt;
use std::path::PathBuf;

use crate::git::GitError;
use crate::workflow::{CodecError, ValidationError};

#[derive(Debug)]
pub enum StoreError {
    RepoNotInitialized,
    ValidationFailed {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
    Codec {
        path: PathBuf,
        source: CodecError,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Git(GitError),
    NotFound(String),
    /// A repo-relative path carried an absolute prefix or a `..` component
    /// (spec §3 identity-path invariant).
    UnsafePath(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::RepoNotInitialized => write!(f, "workflow store is not a git repository"),
            StoreError::ValidationFailed { path, errors } => {
                write!(
                    f,
                    "{} failed validation: {}",
                    path.display(),
                    errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                )
            }
            StoreError::Codec { path, source } => write!(f, "{}: {source}", path.display()),
            StoreError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            StoreError::Git(e) => write!(f, "{e}"),
            StoreError::NotFound(reference) => write!(f, "no workflow matching {reference}"),
            StoreError::UnsafePath(path) => {
                write!(f, "{path} is not a safe repo-relative path")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GitError> for StoreError {
    fn from(e: GitError) -> Self {
        if e.is_repo_not_initialized() {
            StoreError::RepoNotInitialized
        } else {
            StoreError::Git(e)
        }
    }
}
