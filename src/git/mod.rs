//! Thin driver over a local `git` binary.
//!
//! Shells out rather than linking a library (libgit2 et al.): this keeps
//! failure modes aligned with what the user would see running `git`
//! directly, and sidesteps reimplementing merge/rebase semantics. See
//! `git/error.rs` for how a child's exit code survives the process
//! boundary.

pub mod error;
pub mod integrate;
pub mod status;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

pub use error::{GitError, GitResult};
pub use integrate::{IntegrateSummary, IntegrationStrategy, ResolveChoice};
pub use status::{Status, StatusEntry, parse_porcelain_v2};

/// Drives `git` against a single working tree.
#[derive(Debug, Clone)]
pub struct GitGateway {
    repo_path: PathBuf,
}

impl GitGateway {
    /// Bind to a working tree path. Does not check that it is a repo yet —
    /// call [`GitGateway::is_initialized`] for that.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        GitGateway {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path).args(args);
        cmd
    }

    /// Run a git subcommand, logging before and after, and classify
    /// non-zero exits as [`GitError`].
    fn run(&self, args: &[&str]) -> GitResult<Output> {
        let started = Instant::now();
        log::debug!("$ git {} [{}]", args.join(" "), self.repo_path.display());

        let output = self.command(args).output().map_err(|e| {
            log::warn!("git {} failed to spawn: {e}", args.join(" "));
            GitError::Spawn(e.to_string())
        })?;

        let elapsed = started.elapsed();
        log::debug!(
            "[gsv-trace] cmd=\"git {}\" dur={:.1}ms ok={}",
            args.join(" "),
            elapsed.as_secs_f64() * 1000.0,
            output.status.success()
        );

        if output.status.success() {
            Ok(output)
        } else {
            Err(GitError::CommandFailed {
                argv: args.iter().map(|s| s.to_string()).collect(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn run_allow_failure(&self, args: &[&str]) -> GitResult<Output> {
        self.command(args).output().map_err(|e| GitError::Spawn(e.to_string()))
    }

    fn stdout_of(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    // -- lifecycle -----------------------------------------------------

    /// Idempotent: if `repo_path` already holds a valid repo, succeed without change.
    pub fn init(&self, bare: bool, default_branch: Option<&str>) -> GitResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.repo_path).map_err(GitError::from)?;

        let mut args = vec!["init"];
        if bare {
            args.push("--bare");
        }
        if let Some(branch) = default_branch {
            args.push("--initial-branch");
            args.push(branch);
        }
        self.run(&args)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.run_allow_failure(&["rev-parse", "--git-dir"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn require_initialized(&self) -> GitResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(GitError::RepoNotInitialized)
        }
    }

    // -- status ----------------------------------------------------------

    pub fn status(&self) -> GitResult<Status> {
        self.require_initialized()?;
        let output = self.run(&["status", "--porcelain=v2", "--branch"])?;
        Ok(parse_porcelain_v2(&Self::stdout_of(&output)))
    }

    // -- staging / committing --------------------------------------------

    pub fn add(&self, path: &str) -> GitResult<()> {
        self.require_initialized()?;
        self.run(&["add", "--", path])?;
        Ok(())
    }

    pub fn add_all(&self) -> GitResult<()> {
        self.require_initialized()?;
        self.run(&["add", "-A"])?;
        Ok(())
    }

    /// Returns the new HEAD hash. Fails with [`GitError::NothingToCommit`]
    /// if nothing was staged.
    pub fn commit_all(&self, message: &str) -> GitResult<String> {
        self.require_initialized()?;
        match self.run(&["commit", "-m", message]) {
            Ok(_) => {}
            Err(GitError::CommandFailed { stderr, .. })
                if stderr.contains("nothing to commit") =>
            {
                return Err(GitError::NothingToCommit);
            }
            Err(e) => return Err(e),
        }
        let output = self.run(&["rev-parse", "HEAD"])?;
        Ok(Self::stdout_of(&output).trim().to_string())
    }

    // -- remote sync -------------------------------------------------------

    /// Fetch from `remote`. Non-fatal connectivity failures are only
    /// tolerated by the caller opting into `local_only` (spec: `--local`),
    /// in which case fetch is skipped entirely rather than attempted and ignored.
    pub fn fetch(&self, remote: &str, local_only: bool) -> GitResult<()> {
        self.require_initialized()?;
        if local_only {
            return Ok(());
        }
        self.run(&["fetch", remote])?;
        Ok(())
    }

    pub fn has_conflicts(&self) -> GitResult<bool> {
        Ok(!self.get_conflicts()?.is_empty())
    }

    pub fn get_conflicts(&self) -> GitResult<Vec<String>> {
        self.require_initialized()?;
        let output = self.run(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(Self::stdout_of(&output)
            .lines()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// (in_merge, in_rebase, conflicting_files)
    pub fn get_merge_state(&self) -> GitResult<(bool, bool, Vec<String>)> {
        self.require_initialized()?;
        let git_dir = self.git_dir()?;
        let in_merge = git_dir.join("MERGE_HEAD").exists();
        let in_rebase =
            git_dir.join("rebase-apply").exists() || git_dir.join("rebase-merge").exists();
        let conflicts = self.get_conflicts()?;
        Ok((in_merge, in_rebase, conflicts))
    }

    fn git_dir(&self) -> GitResult<PathBuf> {
        let output = self.run(&["rev-parse", "--git-dir"])?;
        let raw = Self::stdout_of(&output).trim().to_string();
        let path = PathBuf::from(raw);
        Ok(if path.is_absolute() {
            path
        } else {
            self.repo_path.join(path)
        })
    }

    // -- integration -------------------------------------------------------

    /// Implements ff-only/rebase/merge. On conflict, returns
    /// [`GitError::Conflict`] carrying the file list. When `abort_on_conflict`
    /// is true, the attempted operation is aborted first, leaving the
    /// working tree at HEAD; when false, the merge/rebase is left in
    /// progress with its conflicted files staged at stage 2/3, so a caller
    /// can resolve them with [`GitGateway::resolve_file`] and
    /// [`GitGateway::continue_merge`]/[`GitGateway::continue_rebase`].
    pub fn integrate(
        &self,
        strategy: IntegrationStrategy,
        remote: &str,
        branch: &str,
        no_fetch: bool,
        abort_on_conflict: bool,
    ) -> GitResult<IntegrateSummary> {
        self.require_initialized()?;
        if !no_fetch {
            self.fetch(remote, false)?;
        }

        let target = format!("{remote}/{branch}");
        let before = self.status()?;

        let result = match strategy {
            IntegrationStrategy::FfOnly => self.run(&["merge", "--ff-only", &target]),
            IntegrationStrategy::Rebase => self.run(&["rebase", &target]),
            IntegrationStrategy::Merge => self.run(&["merge", &target]),
        };

        match result {
            Ok(_) => {
                let after = self.status()?;
                Ok(IntegrateSummary {
                    branch: after.branch.clone(),
                    strategy: Some(strategy),
                    ahead: after.ahead,
                    behind: before.behind,
                    changed_files: self.diff_name_only(&before.branch, &after.branch)?,
                })
            }
            Err(GitError::CommandFailed { argv, stderr, .. }) => {
                let files = self.get_conflicts().unwrap_or_default();
                if files.is_empty() {
                    // Not a conflict: propagate the original failure and leave
                    // any partial state for the caller to inspect.
                    return Err(GitError::CommandFailed {
                        argv,
                        exit_code: -1,
                        stderr,
                    });
                }
                if abort_on_conflict {
                    match strategy {
                        IntegrationStrategy::Rebase => {
                            self.run_allow_failure(&["rebase", "--abort"]).ok();
                        }
                        _ => {
                            self.run_allow_failure(&["merge", "--abort"]).ok();
                        }
                    }
                }
                Err(GitError::Conflict { argv, files })
            }
            Err(e) => Err(e),
        }
    }

    fn diff_name_only(&self, from: &str, to: &str) -> GitResult<Vec<String>> {
        if from.is_empty() || to.is_empty() || from == to {
            return Ok(Vec::new());
        }
        let range = format!("{from}..{to}");
        match self.run(&["diff", "--name-only", &range]) {
            Ok(output) => Ok(Self::stdout_of(&output)
                .lines()
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
                .collect()),
            Err(_) => Ok(Vec::new()),
        }
    }

    // -- conflict resolution -----------------------------------------------

    pub fn resolve_file(&self, path: &str, choice: ResolveChoice) -> GitResult<()> {
        self.require_initialized()?;
        match choice {
            ResolveChoice::Ours => {
                self.run(&["checkout", "--ours", "--", path])?;
                self.add(path)?;
            }
            ResolveChoice::Theirs => {
                self.run(&["checkout", "--theirs", "--", path])?;
                self.add(path)?;
            }
            ResolveChoice::Manual => {
                self.open_in_editor(path)?;
                let full_path = self.repo_path.join(path);
                let contents = std::fs::read_to_string(&full_path).map_err(GitError::from)?;
                if contents.contains("<<<<<<<") || contents.contains(">>>>>>>") {
                    return Err(GitError::message(format!(
                        "{path} still contains conflict markers"
                    )));
                }
                self.add(path)?;
            }
            ResolveChoice::Unresolved => {
                return Err(GitError::message(format!("{path} left unresolved")));
            }
        }
        Ok(())
    }

    fn open_in_editor(&self, path: &str) -> GitResult<()> {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
        let status = Command::new(editor)
            .arg(self.repo_path.join(path))
            .status()
            .map_err(GitError::from)?;
        if status.success() {
            Ok(())
        } else {
            Err(GitError::message("editor exited non-zero"))
        }
    }

    pub fn abort_merge(&self) -> GitResult<()> {
        self.require_initialized()?;
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    pub fn abort_rebase(&self) -> GitResult<()> {
        self.require_initialized()?;
        self.run(&["rebase", "--abort"])?;
        Ok(())
    }

    pub fn continue_merge(&self) -> GitResult<()> {
        self.require_initialized()?;
        let remaining = self.get_conflicts()?;
        if !remaining.is_empty() {
            return Err(GitError::ConflictsRemain(remaining));
        }
        self.run(&["commit", "--no-edit"])?;
        Ok(())
    }

    pub fn continue_rebase(&self) -> GitResult<()> {
        self.require_initialized()?;
        let remaining = self.get_conflicts()?;
        if !remaining.is_empty() {
            return Err(GitError::ConflictsRemain(remaining));
        }
        self.run(&["rebase", "--continue"])?;
        Ok(())
    }

    pub fn push(&self, remote: &str, branch: &str) -> GitResult<()> {
        self.require_initialized()?;
        self.run(&["push", remote, branch])?;
        Ok(())
    }
}
