//! In-memory shape of a workflow, its placeholders, and its steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A named, parameterized sequence of shell steps persisted as YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub schema_version: u32,
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub placeholders: IndexMap<String, Placeholder>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Keys present in the source document that this shape doesn't model
    /// explicitly. Preserved on read and re-emitted on write.
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_yaml::Value>,
}

impl Workflow {
    pub fn new(title: impl Into<String>) -> Self {
        Workflow {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: String::new(),
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            placeholders: IndexMap::new(),
            defaults: Defaults::default(),
            steps: Vec::new(),
            unknown: IndexMap::new(),
        }
    }
}

/// Default shell/cwd/confirmation applied when a step omits its own value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub shell: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub confirm_each_step: Option<bool>,
}

/// A `<name>` token substituted with a user-provided value at run time.
///
/// A placeholder is defined either by explicit entry in `Workflow::placeholders`
/// or inferred from step text; inferred placeholders carry empty metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub validate: String,
    #[serde(default)]
    pub secret: bool,
}

/// One unit of work executed by a chosen shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub shell: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub dangerous: bool,
}

impl Step {
    /// Display label: `name` if non-blank, else `"Step N"` (1-based).
    pub fn display_name(&self, index: usize) -> String {
        if self.name.trim().is_empty() {
            format!("Step {}", index + 1)
        } else {
            self.name.clone()
        }
    }
}

/// Fill `shell`/`cwd` from `workflow.defaults` when the step leaves them
/// blank. The only mutation the model exposes to runners.
pub fn apply_defaults(step: &Step, defaults: &Defaults) -> Step {
    let mut resolved = step.clone();
    if resolved.shell.is_empty() {
        resolved.shell = defaults.shell.clone();
    }
    if resolved.cwd.is_empty() {
        resolved.cwd = defaults.cwd.clone();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_defaults_fills_blank_fields_only() {
        let defaults = Defaults {
            shell: "bash".into(),
            cwd: "/repo".into(),
            confirm_each_step: None,
        };
        let step = Step {
            command: "echo hi".into(),
            ..Default::default()
        };
        let resolved = apply_defaults(&step, &defaults);
        assert_eq!(resolved.shell, "bash");
        assert_eq!(resolved.cwd, "/repo");

        let step_with_shell = Step {
            command: "echo hi".into(),
            shell: "zsh".into(),
            ..Default::default()
        };
        let resolved = apply_defaults(&step_with_shell, &defaults);
        assert_eq!(resolved.shell, "zsh");
    }

    #[test]
    fn blank_step_name_renders_step_n() {
        let step = Step {
            command: "echo".into(),
            ..Default::default()
        };
        assert_eq!(step.display_name(0), "Step 1");
        assert_eq!(step.display_name(4), "Step 5");

        let named = Step {
            name: "Ping".into(),
            command: "echo".into(),
            ..Default::default()
        };
        assert_eq!(named.display_name(0), "Ping");
    }
}
