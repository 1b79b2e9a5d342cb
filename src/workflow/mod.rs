//! The workflow shape, its YAML codec, and load-time validation.

pub mod codec;
pub mod model;
pub mod validate;

pub use codec::CodecError;
pub use model::{CURRENT_SCHEMA_VERSION, Defaults, Placeholder, Step, Workflow, apply_defaults};
pub use validate::{ValidationError, validate};

/// A `(id, slug, path, updated_at)` reference into the store, cheap to pass
/// around without loading the full workflow body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRef {
    pub id: String,
    pub slug: String,
    pub path: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl WorkflowRef {
    /// Short human-readable identifier for log lines, e.g. `deploy-api@wf_01`.
    pub fn display_ref(&self) -> String {
        let short_id = self.id.rsplit('_').next().unwrap_or(&self.id);
        let short_id = &short_id[..short_id.len().min(6)];
        format!("{}@{short_id}", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn display_ref_combines_slug_and_short_id() {
        let r = WorkflowRef {
            id: "wf_01HZXYABCDEF".into(),
            slug: "deploy-api".into(),
            path: "workflows/x/deploy-api/workflow.yaml".into(),
            updated_at: Utc::now(),
        };
        assert_eq!(r.display_ref(), "deploy-api@01HZXY");
    }
}
