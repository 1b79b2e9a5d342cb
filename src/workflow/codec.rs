//! YAML round-trip for [`Workflow`].
//!
//! `serde_yaml` already emits two-space indentation and preserves struct
//! field declaration order, which gives us the deterministic key order the
//! format requires (schema_version, id, title, description, tags,
//! placeholders, defaults, steps) for free — no custom emitter needed.

use super::model::Workflow;

#[derive(Debug)]
pub enum CodecError {
    Parse(String),
    Serialize(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Parse(msg) => write!(f, "failed to parse workflow yaml: {msg}"),
            CodecError::Serialize(msg) => write!(f, "failed to serialize workflow yaml: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Parse a YAML document into a [`Workflow`]. Unknown top-level keys land
/// in `Workflow::unknown` rather than being rejected.
pub fn parse(text: &str) -> Result<Workflow, CodecError> {
    serde_yaml::from_str(text).map_err(|e| CodecError::Parse(e.to_string()))
}

/// Serialize a [`Workflow`] back to YAML with a stable key order and no
/// trailing whitespace on any line.
pub fn serialize(workflow: &Workflow) -> Result<String, CodecError> {
    let raw = serde_yaml::to_string(workflow).map_err(|e| CodecError::Serialize(e.to_string()))?;
    let trimmed: String = raw
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(if trimmed.ends_with('\n') || trimmed.is_empty() {
        trimmed
    } else {
        format!("{trimmed}\n")
    })
}
