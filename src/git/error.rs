//! Error type for the Git Gateway.
//!
//! Hand-rolled rather than derived: callers need to branch on
//! [`GitError::Conflict`] without downcasting, so the variant carries its
//! payload directly instead of being flattened into a single message string.

use std::fmt;

#[derive(Debug, Clone)]
pub enum GitError {
    /// `git` itself could not be spawned (not installed, not on PATH, …).
    Spawn(String),
    /// The process ran and exited non-zero.
    CommandFailed {
        argv: Vec<String>,
        exit_code: i32,
        stderr: String,
    },
    /// A distinguished `CommandFailed` where the failure is a merge/rebase
    /// conflict rather than a generic git error.
    Conflict {
        argv: Vec<String>,
        files: Vec<String>,
    },
    /// The working tree is not a git repository.
    RepoNotInitialized,
    /// `commit_all` was called with nothing staged.
    NothingToCommit,
    /// A continue was requested while conflicts remain.
    ConflictsRemain(Vec<String>),
    /// Generic failure with a plain message (parse errors, I/O during status, …).
    Message(String),
}

impl GitError {
    pub fn message(msg: impl Into<String>) -> Self {
        GitError::Message(msg.into())
    }

    /// True if this error (or a `CommandFailed` carrying the git message for
    /// "not a git repository") represents an uninitialized repo.
    pub fn is_repo_not_initialized(&self) -> bool {
        matches!(self, GitError::RepoNotInitialized)
    }
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::Spawn(msg) => write!(f, "failed to spawn git: {msg}"),
            GitError::CommandFailed {
                argv,
                exit_code,
                stderr,
            } => {
                write!(
                    f,
                    "git {} failed (exit {exit_code}): {stderr}",
                    argv.join(" ")
                )
            }
            GitError::Conflict { argv, files } => {
                write!(
                    f,
                    "git {} produced conflicts in {} file(s): {}",
                    argv.join(" "),
                    files.len(),
                    files.join(", ")
                )
            }
            GitError::RepoNotInitialized => write!(f, "not a git repository"),
            GitError::NothingToCommit => write!(f, "nothing to commit"),
            GitError::ConflictsRemain(files) => {
                write!(f, "cannot continue: {} file(s) still conflicted: {}", files.len(), files.join(", "))
            }
            GitError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GitError {}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> Self {
        GitError::Spawn(err.to_string())
    }
}

pub type GitResult<T> = Result<T, GitError>;
