//! Schema invariant checks run at load time.

use regex::Regex;

use super::model::{CURRENT_SCHEMA_VERSION, Workflow};

const ALLOWED_SHELLS: &[&str] = &["", "bash", "zsh", "sh", "pwsh"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnsupportedSchemaVersion(u32),
    EmptyTitle,
    InvalidPlaceholderName(String),
    InvalidValidateRegex { placeholder: String, reason: String },
    EmptyStepCommand { step_index: usize },
    UnsupportedShell { step_index: usize, shell: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UnsupportedSchemaVersion(v) => {
                write!(f, "unsupported schema_version {v}, expected {CURRENT_SCHEMA_VERSION}")
            }
            ValidationError::EmptyTitle => write!(f, "title must not be empty"),
            ValidationError::InvalidPlaceholderName(name) => {
                write!(f, "placeholder name \"{name}\" is not a valid identifier")
            }
            ValidationError::InvalidValidateRegex { placeholder, reason } => {
                write!(f, "placeholder \"{placeholder}\" validate regex failed to compile: {reason}")
            }
            ValidationError::EmptyStepCommand { step_index } => {
                write!(f, "step {step_index} has an empty command")
            }
            ValidationError::UnsupportedShell { step_index, shell } => {
                write!(f, "step {step_index} uses unsupported shell \"{shell}\"")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_valid_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Enforce: schema_version == 1, non-empty title, placeholder names match
/// the identifier regex, validate regexes compile, step commands are
/// non-empty, shell is one of the allowed set. Returns every violation
/// found rather than stopping at the first.
pub fn validate(workflow: &Workflow) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if workflow.schema_version != CURRENT_SCHEMA_VERSION {
        errors.push(ValidationError::UnsupportedSchemaVersion(workflow.schema_version));
    }

    if workflow.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle);
    }

    for (name, placeholder) in &workflow.placeholders {
        if !is_valid_placeholder_name(name) {
            errors.push(ValidationError::InvalidPlaceholderName(name.clone()));
        }
        if !placeholder.validate.is_empty() {
            if let Err(e) = Regex::new(&placeholder.validate) {
                errors.push(ValidationError::InvalidValidateRegex {
                    placeholder: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for (index, step) in workflow.steps.iter().enumerate() {
        if step.command.trim().is_empty() {
            errors.push(ValidationError::EmptyStepCommand { step_index: index });
        }
        if !ALLOWED_SHELLS.contains(&step.shell.as_str()) {
            errors.push(ValidationError::UnsupportedShell {
                step_index: index,
                shell: step.shell.clone(),
            });
        }
    }

    errors
}

/// Compile every declared `validate` regex; references to undefined
/// placeholders are warnings, not failures, so this returns warning
/// strings separately from hard [`ValidationError`]s.
pub fn undefined_placeholder_warnings(workflow: &Workflow, referenced: &[String]) -> Vec<String> {
    referenced
        .iter()
        .filter(|name| !workflow.placeholders.contains_key(*name))
        .map(|name| format!("placeholder <{name}> is used but not declared"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{Placeholder, Step};
    use indexmap::IndexMap;

    #[test]
    fn valid_workflow_has_no_errors() {
        let workflow = Workflow {
            steps: vec![Step {
                command: "echo hi".into(),
                ..Default::default()
            }],
            ..Workflow::new("Restart Service Safely")
        };
        assert!(validate(&workflow).is_empty());
    }

    #[test]
    fn rejects_empty_title_and_bad_schema_version() {
        let mut workflow = Workflow::new("");
        workflow.schema_version = 2;
        let errors = validate(&workflow);
        assert!(errors.contains(&ValidationError::EmptyTitle));
        assert!(errors.contains(&ValidationError::UnsupportedSchemaVersion(2)));
    }

    #[test]
    fn rejects_invalid_placeholder_name_and_bad_regex() {
        let mut placeholders = IndexMap::new();
        placeholders.insert(
            "2bad".to_string(),
            Placeholder::default(),
        );
        placeholders.insert(
            "ns".to_string(),
            Placeholder {
                validate: "(".into(),
                ..Default::default()
            },
        );
        let workflow = Workflow {
            placeholders,
            ..Workflow::new("t")
        };
        let errors = validate(&workflow);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidPlaceholderName(n) if n == "2bad")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidValidateRegex { placeholder, .. } if placeholder == "ns")));
    }

    #[test]
    fn rejects_empty_step_command_and_bad_shell() {
        let workflow = Workflow {
            steps: vec![Step {
                command: "".into(),
                shell: "fish".into(),
                ..Default::default()
            }],
            ..Workflow::new("t")
        };
        let errors = validate(&workflow);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyStepCommand { step_index: 0 })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnsupportedShell { step_index: 0, .. })));
    }
}
