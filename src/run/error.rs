//! Error type for the Run Engine.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunClassification {
    Failed,
    Canceled,
    MissingParameter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    StepFailed {
        step_index: usize,
        exit_code: i32,
        classification: RunClassification,
    },
    MissingParameters {
        step_index: usize,
        names: Vec<String>,
    },
    Spawn {
        step_index: usize,
        reason: String,
    },
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::StepFailed { classification, .. } => match classification {
                RunClassification::Failed => crate::exit_code::STEP_FAILED,
                RunClassification::Canceled => crate::exit_code::CANCELED,
                RunClassification::MissingParameter => crate::exit_code::MISSING_PARAMETER,
            },
            RunError::MissingParameters { .. } => crate::exit_code::MISSING_PARAMETER,
            RunError::Spawn { .. } => crate::exit_code::STEP_FAILED,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::StepFailed {
                step_index,
                exit_code,
                classification,
            } => write!(
                f,
                "step {step_index} {classification:?} (exit {exit_code})"
            ),
            RunError::MissingParameters { step_index, names } => write!(
                f,
                "step {step_index} is missing parameter(s): {}",
                names.join(", ")
            ),
            RunError::Spawn { step_index, reason } => {
                write!(f, "step {step_index} failed to start: {reason}")
            }
        }
    }
}

impl std::error::Error for RunError {}
