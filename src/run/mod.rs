//! Per-step executor: parameter materialization, dry-run, from/until
//! slicing, dangerous-command policy, and cancellation.

pub mod cancel;
pub mod error;
pub mod exec;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use cancel::CancellationToken;
pub use error::{RunClassification, RunError};

use crate::placeholder;
use crate::workflow::model::{apply_defaults, Step, Workflow};

/// Inspects a resolved command and decides whether it is dangerous enough
/// to require confirmation. Policy, not enforcement — the core asks but
/// never refuses outright.
pub type DangerousCommandGate = Box<dyn Fn(&Step, &str) -> bool + Send + Sync>;

pub struct RunOptions {
    pub from: Option<String>,
    pub until: Option<String>,
    pub params: BTreeMap<String, String>,
    pub env_overlay: BTreeMap<String, String>,
    pub repo_root: Option<PathBuf>,
    pub dry_run: bool,
    pub auto_confirm: bool,
    pub interactive: bool,
    pub stream_output: bool,
    pub max_output_lines: usize,
    pub dangerous_gate: Option<DangerousCommandGate>,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            from: None,
            until: None,
            params: BTreeMap::new(),
            env_overlay: BTreeMap::new(),
            repo_root: None,
            dry_run: false,
            auto_confirm: false,
            interactive: true,
            stream_output: true,
            max_output_lines: 500,
            dangerous_gate: None,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
    Canceled,
    SkippedContinueOnError,
    DryRun,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_index: usize,
    pub display_name: String,
    pub resolved_command: String,
    pub resolved_cwd: String,
    pub shell: String,
    pub exit_code: Option<i32>,
    pub status: StepStatus,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

pub struct RunOutcome {
    pub steps: Vec<StepResult>,
    pub error: Option<RunError>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        self.error
            .as_ref()
            .map(|e| e.exit_code())
            .unwrap_or(crate::exit_code::SUCCESS)
    }
}

pub struct RunEngine;

impl RunEngine {
    pub fn new() -> Self {
        RunEngine
    }

    fn slice<'a>(workflow: &'a Workflow, options: &RunOptions) -> Vec<(usize, &'a Step)> {
        let from_index = options
            .from
            .as_ref()
            .and_then(|name| workflow.steps.iter().position(|s| s.name == *name));
        let until_index = options
            .until
            .as_ref()
            .and_then(|name| workflow.steps.iter().position(|s| s.name == *name));

        let start = from_index.unwrap_or(0);
        let end = until_index.unwrap_or(workflow.steps.len());

        workflow
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= start && *i < end)
            .collect()
    }

    /// Run the workflow's steps left-to-right, honoring `from`/`until`
    /// slicing, placeholder substitution, dangerous-command gating, and
    /// cancellation.
    pub fn run(&self, workflow: &Workflow, options: &RunOptions) -> RunOutcome {
        let mut results = Vec::new();

        for (index, step) in Self::slice(workflow, options) {
            let resolved = apply_defaults(step, &workflow.defaults);
            let display_name = resolved.display_name(index);

            let command = match placeholder::substitute(&resolved.command, &options.params) {
                Ok(text) => text,
                Err(placeholder::PlaceholderError::Missing(names)) => {
                    if workflow.placeholders.is_empty() {
                        // No placeholders declared at all: treat `<...>` as literal
                        // shell syntax rather than an unfilled token (legacy workflows).
                        resolved.command.clone()
                    } else {
                        return RunOutcome {
                            steps: results,
                            error: Some(RunError::MissingParameters {
                                step_index: index,
                                names,
                            }),
                        };
                    }
                }
                Err(_) => resolved.command.clone(),
            };

            let cwd = resolve_cwd(&resolved.cwd, options.repo_root.as_deref());

            let mut env = std::env::vars().collect::<BTreeMap<_, _>>();
            env.extend(resolved.env.iter().map(|(k, v)| (k.clone(), v.clone())));
            env.extend(options.env_overlay.clone());

            if options.dry_run {
                results.push(StepResult {
                    step_index: index,
                    display_name,
                    resolved_command: command,
                    resolved_cwd: cwd.display().to_string(),
                    shell: resolved.shell.clone(),
                    exit_code: None,
                    status: StepStatus::DryRun,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                });
                continue;
            }

            if let Some(gate) = &options.dangerous_gate {
                if gate(&resolved, &command) && !options.auto_confirm && !options.interactive {
                    return RunOutcome {
                        steps: results,
                        error: Some(RunError::StepFailed {
                            step_index: index,
                            exit_code: crate::exit_code::STEP_FAILED,
                            classification: RunClassification::Failed,
                        }),
                    };
                }
            }

            let exec_result = match exec::run_step(
                &resolved.shell,
                &command,
                &cwd,
                &env,
                &options.cancel,
                options.stream_output,
                options.max_output_lines,
            ) {
                Ok(r) => r,
                Err(e) => {
                    return RunOutcome {
                        steps: results,
                        error: Some(RunError::Spawn {
                            step_index: index,
                            reason: e.to_string(),
                        }),
                    };
                }
            };

            let status = if exec_result.canceled {
                StepStatus::Canceled
            } else if exec_result.exit_code == 0 {
                StepStatus::Succeeded
            } else if resolved.continue_on_error {
                StepStatus::SkippedContinueOnError
            } else {
                StepStatus::Failed
            };

            let terminal_error = match status {
                StepStatus::Canceled => Some(RunError::StepFailed {
                    step_index: index,
                    exit_code: exec_result.exit_code,
                    classification: RunClassification::Canceled,
                }),
                StepStatus::Failed => Some(RunError::StepFailed {
                    step_index: index,
                    exit_code: exec_result.exit_code,
                    classification: RunClassification::Failed,
                }),
                _ => None,
            };

            results.push(StepResult {
                step_index: index,
                display_name,
                resolved_command: command,
                resolved_cwd: cwd.display().to_string(),
                shell: resolved.shell.clone(),
                exit_code: Some(exec_result.exit_code),
                status,
                stdout: exec_result.stdout,
                stderr: exec_result.stderr,
            });

            if let Some(err) = terminal_error {
                return RunOutcome {
                    steps: results,
                    error: Some(err),
                };
            }
        }

        RunOutcome {
            steps: results,
            error: None,
        }
    }
}

impl Default for RunEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_cwd(cwd: &str, repo_root: Option<&Path>) -> PathBuf {
    crate::path::resolve_cwd(cwd, repo_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::Defaults;

    fn workflow_with(commands: &[&str]) -> Workflow {
        Workflow {
            defaults: Defaults {
                shell: "bash".into(),
                ..Default::default()
            },
            steps: commands
                .iter()
                .map(|c| Step {
                    command: c.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Workflow::new("t")
        }
    }

    #[test]
    fn dry_run_does_not_spawn_and_reports_no_error() {
        let workflow = workflow_with(&["echo should-not-run"]);
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let outcome = RunEngine::new().run(&workflow, &options);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.steps[0].status, StepStatus::DryRun);
        assert!(outcome.steps[0].exit_code.is_none());
    }

    #[test]
    fn run_with_failure_halts_and_skips_remaining_steps() {
        let workflow = workflow_with(&["true", "false", "true"]);
        let options = RunOptions {
            interactive: false,
            ..RunOptions::default()
        };
        let outcome = RunEngine::new().run(&workflow, &options);
        assert_eq!(outcome.exit_code(), crate::exit_code::STEP_FAILED);
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[1].step_index, 1);
        assert_eq!(outcome.steps[1].status, StepStatus::Failed);
    }

    #[test]
    fn continue_on_error_proceeds_past_a_failed_step() {
        let workflow = Workflow {
            steps: vec![
                Step {
                    command: "false".into(),
                    continue_on_error: true,
                    ..Default::default()
                },
                Step {
                    command: "true".into(),
                    ..Default::default()
                },
            ],
            defaults: Defaults {
                shell: "bash".into(),
                ..Default::default()
            },
            ..Workflow::new("t")
        };
        let outcome = RunEngine::new().run(&workflow, &RunOptions::default());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[0].status, StepStatus::SkippedContinueOnError);
    }

    #[test]
    fn from_until_same_step_yields_empty_run() {
        let workflow = workflow_with(&["echo a", "echo b"]);
        let named = Workflow {
            steps: vec![
                Step {
                    name: "first".into(),
                    command: "echo a".into(),
                    ..Default::default()
                },
                Step {
                    name: "second".into(),
                    command: "echo b".into(),
                    ..Default::default()
                },
            ],
            ..workflow
        };
        let options = RunOptions {
            from: Some("first".into()),
            until: Some("first".into()),
            ..RunOptions::default()
        };
        let outcome = RunEngine::new().run(&named, &options);
        assert!(outcome.error.is_none());
        assert!(outcome.steps.is_empty());
    }
}
