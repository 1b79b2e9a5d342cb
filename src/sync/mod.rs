//! Orchestrates fetch + chosen integration strategy, surfaces conflict
//! files, and aborts cleanly.

use crate::git::{GitError, GitGateway, IntegrateSummary, IntegrationStrategy, ResolveChoice};
use crate::index::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Abort,
    Ours,
    Theirs,
    /// Hands control to the TUI collaborator; the core only exposes the
    /// conflict list and resolution primitives.
    Tui,
}

pub struct SyncOptions {
    pub strategy: IntegrationStrategy,
    pub remote: String,
    pub branch: String,
    pub local_only: bool,
    pub push_after: bool,
    pub conflict_policy: ConflictPolicy,
    pub reindex: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            strategy: IntegrationStrategy::FfOnly,
            remote: "origin".to_string(),
            branch: "main".to_string(),
            local_only: false,
            push_after: false,
            conflict_policy: ConflictPolicy::Abort,
            reindex: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Clean(IntegrateSummary),
    /// Conflicts were resolved per `conflict_policy` (ours/theirs) and the
    /// integration was completed.
    ResolvedConflicts {
        files: Vec<String>,
        summary: IntegrateSummary,
    },
    /// Conflicts remain; the working tree was left clean (abort) or is
    /// handed off to the TUI (tui policy).
    UnresolvedConflicts { files: Vec<String> },
}

impl SyncOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncOutcome::Clean(_) | SyncOutcome::ResolvedConflicts { .. } => {
                crate::exit_code::SUCCESS
            }
            SyncOutcome::UnresolvedConflicts { .. } => crate::exit_code::UNRESOLVED_CONFLICTS,
        }
    }
}

pub struct SyncEngine<'a> {
    git: &'a GitGateway,
}

impl<'a> SyncEngine<'a> {
    pub fn new(git: &'a GitGateway) -> Self {
        SyncEngine { git }
    }

    /// Preview the files that would change without mutating the working
    /// tree: the caller is expected to have already fetched (or not, under
    /// `--local`) before calling this.
    pub fn dry_run_summary(&self, options: &SyncOptions) -> Result<Vec<String>, GitError> {
        let target = format!("{}/{}", options.remote, options.branch);
        let diff_range = format!("HEAD..{target}");
        match self.diff_name_only(&diff_range) {
            Ok(files) => Ok(files),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn diff_name_only(&self, range: &str) -> Result<Vec<String>, GitError> {
        // Reuses the gateway's own git binary rather than re-implementing
        // diff parsing: shell out directly since GitGateway doesn't expose
        // an arbitrary diff primitive.
        let output = std::process::Command::new("git")
            .current_dir(self.git.repo_path())
            .args(["diff", "--name-only", range])
            .output()
            .map_err(GitError::from)?;
        if !output.status.success() {
            return Err(GitError::message(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// Run the full sync procedure: fetch (unless `local_only`), integrate,
    /// branch on conflict policy, push if requested, and reindex if stale
    /// or explicitly requested.
    pub fn sync(&self, options: &SyncOptions, index: Option<&mut Index>) -> Result<SyncOutcome, GitError> {
        if !options.local_only {
            self.git.fetch(&options.remote, false)?;
        }

        // `ours`/`theirs` resolve conflicted files in place and continue the
        // same merge/rebase, so the conflict must survive in the working
        // tree rather than being aborted by `integrate` itself.
        let abort_on_conflict = !matches!(
            options.conflict_policy,
            ConflictPolicy::Ours | ConflictPolicy::Theirs
        );

        let result = self.git.integrate(
            options.strategy,
            &options.remote,
            &options.branch,
            true, // already fetched above (or skipped under local_only)
            abort_on_conflict,
        );

        let outcome = match result {
            Ok(summary) => SyncOutcome::Clean(summary),
            Err(GitError::Conflict { files, .. }) => {
                self.resolve_conflicts(files, options)?
            }
            Err(e) => return Err(e),
        };

        if matches!(outcome, SyncOutcome::Clean(_) | SyncOutcome::ResolvedConflicts { .. })
            && options.push_after
        {
            self.git.push(&options.remote, &options.branch)?;
        }

        if let Some(index) = index {
            if options.reindex || index.is_stale() {
                index
                    .rebuild()
                    .map_err(|e| GitError::message(format!("reindex failed: {e}")))?;
            }
        }

        Ok(outcome)
    }

    fn resolve_conflicts(
        &self,
        files: Vec<String>,
        options: &SyncOptions,
    ) -> Result<SyncOutcome, GitError> {
        match options.conflict_policy {
            ConflictPolicy::Abort => Ok(SyncOutcome::UnresolvedConflicts { files }),
            ConflictPolicy::Tui => Ok(SyncOutcome::UnresolvedConflicts { files }),
            ConflictPolicy::Ours | ConflictPolicy::Theirs => {
                let choice = if options.conflict_policy == ConflictPolicy::Ours {
                    ResolveChoice::Ours
                } else {
                    ResolveChoice::Theirs
                };
                for file in &files {
                    self.git.resolve_file(file, choice)?;
                }
                match options.strategy {
                    IntegrationStrategy::Rebase => self.git.continue_rebase()?,
                    _ => self.git.continue_merge()?,
                }
                let status = self.git.status()?;
                Ok(SyncOutcome::ResolvedConflicts {
                    files,
                    summary: IntegrateSummary {
                        branch: status.branch,
                        strategy: Some(options.strategy),
                        ahead: status.ahead,
                        behind: status.behind,
                        changed_files: Vec::new(),
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_maps_conflict_outcome_to_reserved_code() {
        let outcome = SyncOutcome::UnresolvedConflicts {
            files: vec!["workflows/x/y/workflow.yaml".into()],
        };
        assert_eq!(outcome.exit_code(), crate::exit_code::UNRESOLVED_CONFLICTS);
    }

    #[test]
    fn exit_code_maps_clean_outcome_to_success() {
        let outcome = SyncOutcome::Clean(IntegrateSummary::default());
        assert_eq!(outcome.exit_code(), crate::exit_code::SUCCESS);
    }
}
