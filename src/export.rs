//! Deterministic Markdown/YAML/JSON rendering of a workflow.
//!
//! Rendering *templates* are out of scope; this produces the one
//! deterministic shape the CLI's `export` command and README update flows
//! consume directly.

use crate::workflow::model::Workflow;
use crate::workflow::{codec, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Yaml,
    Json,
}

#[derive(Debug)]
pub enum ExportError {
    Codec(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Codec(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

pub fn render(workflow: &Workflow, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Yaml => {
            codec::serialize(workflow).map_err(|e| ExportError::Codec(e.to_string()))
        }
        ExportFormat::Json => serde_json::to_string_pretty(workflow)
            .map(|s| format!("{s}\n"))
            .map_err(|e| ExportError::Codec(e.to_string())),
        ExportFormat::Markdown => Ok(render_markdown(workflow)),
    }
}

fn render_markdown(workflow: &Workflow) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", workflow.title));

    if !workflow.description.is_empty() {
        out.push_str(&workflow.description);
        out.push_str("\n\n");
    }

    if !workflow.tags.is_empty() {
        out.push_str(&format!(
            "Tags: {}\n\n",
            workflow
                .tags
                .iter()
                .map(|t| format!("`{t}`"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if !workflow.placeholders.is_empty() {
        out.push_str("## Placeholders\n\n");
        for (name, placeholder) in &workflow.placeholders {
            let prompt = if placeholder.prompt.is_empty() {
                name.clone()
            } else {
                placeholder.prompt.clone()
            };
            let default_note = if placeholder.default.is_empty() {
                String::new()
            } else {
                format!(" (default: `{}`)", placeholder.default)
            };
            out.push_str(&format!("- `<{name}>` — {prompt}{default_note}\n"));
        }
        out.push('\n');
    }

    out.push_str("## Steps\n\n");
    for (index, step) in workflow.steps.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n", index + 1, step.display_name(index)));
        out.push_str(&format!("   ```{}\n   {}\n   ```\n", step.shell, step.command));
    }

    out
}

/// Render only succeeds for a workflow that would also pass load-time
/// validation; callers that already have a validated in-memory workflow
/// can skip straight to [`render`].
pub fn render_validated(workflow: &Workflow, format: ExportFormat) -> Result<String, ExportError> {
    let errors = validate(workflow);
    if !errors.is_empty() {
        return Err(ExportError::Codec(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        ));
    }
    render(workflow, format)
}
