//! Extraction, validation, and substitution of `<name>` tokens.
//!
//! Token grammar: `<` identifier `>` where identifier matches
//! `[A-Za-z_][A-Za-z0-9_-]*`. The angle brackets are literal; there is no
//! escape sequence.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::workflow::model::{Placeholder, Workflow};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_-]*)>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    /// Raised by `substitute` when values were not provided for every token
    /// present in the text.
    Missing(Vec<String>),
    /// Raised by `validate` when the value does not match the pattern, or
    /// the pattern fails to compile.
    Invalid { reason: String },
}

impl fmt::Display for PlaceholderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderError::Missing(names) => {
                write!(f, "missing placeholder values: {}", names.join(", "))
            }
            PlaceholderError::Invalid { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for PlaceholderError {}

/// Ordered, de-duplicated list of placeholder names found in `text`.
pub fn extract(text: &str) -> Vec<String> {
    let mut seen = IndexSet::new();
    for cap in TOKEN_RE.captures_iter(text) {
        seen.insert(cap[1].to_string());
    }
    seen.into_iter().collect()
}

/// Per-placeholder metadata keyed by name, listing only names actually
/// referenced by some step. Explicitly-declared-but-unused placeholders are
/// omitted: they're legal but inert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceholderUsage {
    pub prompt: String,
    pub default: String,
    pub validate: String,
    pub secret: bool,
    pub used_in: Vec<String>,
}

pub fn extract_with_metadata(workflow: &Workflow) -> BTreeMap<String, PlaceholderUsage> {
    let mut usage: BTreeMap<String, PlaceholderUsage> = BTreeMap::new();

    for (index, step) in workflow.steps.iter().enumerate() {
        let step_name = step.display_name(index);
        for name in extract(&step.command) {
            let entry = usage.entry(name.clone()).or_insert_with(|| {
                workflow
                    .placeholders
                    .get(&name)
                    .map(|p| PlaceholderUsage {
                        prompt: p.prompt.clone(),
                        default: p.default.clone(),
                        validate: p.validate.clone(),
                        secret: p.secret,
                        used_in: Vec::new(),
                    })
                    .unwrap_or_default()
            });
            entry.used_in.push(step_name);
        }
    }

    usage
}

/// Replace every `<name>` occurrence in `text` with its value from `values`.
/// Values are inserted verbatim — callers that need shell-quoting must quote
/// before calling. Fails with [`PlaceholderError::Missing`] listing every
/// name for which no value was provided.
pub fn substitute(text: &str, values: &BTreeMap<String, String>) -> Result<String, PlaceholderError> {
    let missing: Vec<String> = extract(text)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(PlaceholderError::Missing(missing));
    }

    Ok(TOKEN_RE
        .replace_all(text, |caps: &regex::Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// Compile `pattern` and match it against the full `value`.
pub fn validate(value: &str, pattern: &str) -> Result<bool, PlaceholderError> {
    let re = Regex::new(pattern).map_err(|e| PlaceholderError::Invalid {
        reason: e.to_string(),
    })?;
    match re.find(value) {
        Some(m) if m.start() == 0 && m.end() == value.len() => Ok(true),
        _ => Ok(false),
    }
}

/// Compile every declared `validate` regex. References to undefined
/// placeholders are collected as warnings rather than failures.
pub fn validate_at_load_time(workflow: &Workflow) -> (Vec<PlaceholderError>, Vec<String>) {
    let mut errors = Vec::new();
    for (name, placeholder) in &workflow.placeholders {
        if let Err(e) = compile_check(placeholder) {
            errors.push(PlaceholderError::Invalid {
                reason: format!("{name}: {e}"),
            });
        }
    }

    let referenced: Vec<String> = workflow
        .steps
        .iter()
        .flat_map(|s| extract(&s.command))
        .collect();
    let warnings: Vec<String> = referenced
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .filter(|name| !workflow.placeholders.contains_key(name))
        .map(|name| format!("placeholder <{name}> is used but not declared"))
        .collect();

    (errors, warnings)
}

fn compile_check(placeholder: &Placeholder) -> Result<(), String> {
    if placeholder.validate.is_empty() {
        return Ok(());
    }
    Regex::new(&placeholder.validate)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ordered_deduplicated_names() {
        let names = extract("kubectl -n <ns> rollout restart deploy/<svc> -n <ns>");
        assert_eq!(names, vec!["ns".to_string(), "svc".to_string()]);
    }

    #[test]
    fn substitute_replaces_every_occurrence() {
        let mut values = BTreeMap::new();
        values.insert("ns".to_string(), "prod".to_string());
        values.insert("svc".to_string(), "api".to_string());
        let result = substitute(
            "kubectl -n <ns> rollout restart deploy/<svc>",
            &values,
        )
        .unwrap();
        assert_eq!(result, "kubectl -n prod rollout restart deploy/api");
    }

    #[test]
    fn substitute_reports_missing_names() {
        let mut values = BTreeMap::new();
        values.insert("ns".to_string(), "prod".to_string());
        let err = substitute("kubectl -n <ns> rollout restart deploy/<svc>", &values).unwrap_err();
        assert_eq!(err, PlaceholderError::Missing(vec!["svc".to_string()]));
    }

    #[test]
    fn extract_of_substitute_output_has_no_unfilled_tokens() {
        let text = "<a> and <b> and <a>";
        let mut values = BTreeMap::new();
        values.insert("a".to_string(), "1".to_string());
        values.insert("b".to_string(), "2".to_string());
        let out = substitute(text, &values).unwrap();
        assert!(extract(&out).is_empty());
    }

    #[test]
    fn validate_matches_full_value() {
        assert!(validate("prod", "^(prod|staging)$").unwrap());
        assert!(!validate("production", "^(prod|staging)$").unwrap());
    }

    #[test]
    fn metadata_omits_unused_declared_placeholders() {
        let mut workflow = Workflow::new("t");
        workflow.placeholders.insert(
            "unused".to_string(),
            Placeholder::default(),
        );
        workflow.steps.push(crate::workflow::model::Step {
            command: "echo <used>".into(),
            ..Default::default()
        });
        let usage = extract_with_metadata(&workflow);
        assert!(usage.contains_key("used"));
        assert!(!usage.contains_key("unused"));
    }
}
