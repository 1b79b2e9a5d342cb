//! Capture protocol for recording an interactive subshell into a workflow.
//!
//! Record format: `<unix-seconds>\x1F<cwd>\x1F<command>\n`, ASCII 0x1F as
//! field separator. A record's command may embed newlines; both a literal
//! newline and an escaped `\n` are accepted on read, but the writer always
//! emits the escaped form so a single record stays on one line.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::workflow::model::Step;

const FIELD_SEPARATOR: char = '\u{1F}';

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub timestamp: DateTime<Utc>,
    pub cwd: String,
    pub command: String,
}

/// Append one record to `file`, escaping embedded newlines as `\n`.
pub fn write_record(file: &mut File, record: &CaptureRecord) -> std::io::Result<()> {
    let escaped_command = record.command.replace('\n', "\\n");
    writeln!(
        file,
        "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{escaped_command}",
        record.timestamp.timestamp(),
        record.cwd,
    )
}

/// Parse a capture file's contents into records. Accepts both escaped
/// (`\n`) and literal newline forms for the command field on read, per the
/// format's historical ambiguity.
pub fn parse_capture(contents: &str) -> Vec<CaptureRecord> {
    let mut records = Vec::new();

    for line in contents.split('\n') {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, FIELD_SEPARATOR);
        let (Some(ts), Some(cwd), Some(command)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(secs) = ts.parse::<i64>() else { continue };
        let Some(timestamp) = DateTime::from_timestamp(secs, 0) else {
            continue;
        };

        records.push(CaptureRecord {
            timestamp,
            cwd: cwd.to_string(),
            command: command.replace("\\n", "\n"),
        });
    }

    records
}

/// RAII guard for a recording session's temporary files: the capture file
/// (and any shell-init scratch file) is removed on every exit path —
/// success, error, or signal — the way a `Drop` impl discards a worktree's
/// scratch state regardless of how the caller returns.
pub struct CaptureSession {
    capture_path: PathBuf,
    extra_paths: Vec<PathBuf>,
}

impl CaptureSession {
    pub fn new(capture_path: impl Into<PathBuf>) -> Self {
        CaptureSession {
            capture_path: capture_path.into(),
            extra_paths: Vec::new(),
        }
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.extra_paths.push(path.into());
    }

    pub fn path(&self) -> &Path {
        &self.capture_path
    }

    pub fn read_records(&self) -> std::io::Result<Vec<CaptureRecord>> {
        let contents = std::fs::read_to_string(&self.capture_path)?;
        Ok(parse_capture(&contents))
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.capture_path);
        for path in &self.extra_paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// First-word dictionary used to synthesize a human display name. Falls
/// back to the verbatim first word, title-cased, when no entry matches.
fn synthesize_name(command: &str) -> String {
    let first_word = command.split_whitespace().next().unwrap_or("");
    match first_word {
        "kubectl" => "Kubernetes command".to_string(),
        "docker" => "Docker command".to_string(),
        "git" => "Git command".to_string(),
        "terraform" => "Terraform command".to_string(),
        "npm" | "pnpm" | "yarn" => "Node package command".to_string(),
        "cargo" => "Cargo command".to_string(),
        "" => String::new(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(c) => format!("{}{} command", c.to_uppercase(), chars.as_str()),
                None => String::new(),
            }
        }
    }
}

const TOOL_TAGS: &[&str] = &["kubectl", "docker", "git", "terraform", "npm", "cargo", "ssh"];
const ACTION_TAGS: &[&str] = &["deploy", "restart", "rollback", "build", "test", "migrate"];

fn infer_tags(commands: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    let joined = commands.join(" ").to_lowercase();
    for tag in TOOL_TAGS.iter().chain(ACTION_TAGS.iter()) {
        if joined.split_whitespace().any(|w| w == *tag) && !tags.contains(&tag.to_string()) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Turn a sequence of recorded commands into draft [`Step`]s.
pub fn commands_to_steps(commands: &[String]) -> Vec<Step> {
    commands
        .iter()
        .map(|command| Step {
            name: synthesize_name(command),
            command: command.clone(),
            ..Default::default()
        })
        .collect()
}

/// Tag inference across a whole recorded session, for prefilling
/// `Workflow::tags` on the draft produced from a recording.
pub fn infer_session_tags(commands: &[String]) -> Vec<String> {
    infer_tags(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_parse_round_trips_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        let mut file = File::create(&path).unwrap();
        let record = CaptureRecord {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            cwd: "/home/alex/repo".to_string(),
            command: "echo hi".to_string(),
        };
        write_record(&mut file, &record).unwrap();
        drop(file);

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed = parse_capture(&contents);
        assert_eq!(parsed, vec![record]);
    }

    #[test]
    fn parse_accepts_escaped_newline_in_command() {
        let contents = "1700000000\u{1F}/repo\u{1F}echo one\\necho two\n";
        let parsed = parse_capture(contents);
        assert_eq!(parsed[0].command, "echo one\necho two");
    }

    #[test]
    fn capture_session_removes_files_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        std::fs::write(&path, "").unwrap();
        {
            let _session = CaptureSession::new(&path);
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn commands_to_steps_synthesizes_names_from_first_word() {
        let steps = commands_to_steps(&["kubectl get pods".to_string(), "echo hi".to_string()]);
        assert_eq!(steps[0].name, "Kubernetes command");
        assert_eq!(steps[1].name, "Echo command");
    }

    #[test]
    fn infer_session_tags_finds_known_tool_and_action_words() {
        let tags = infer_session_tags(&["kubectl rollout restart deploy/api".to_string()]);
        assert!(tags.contains(&"kubectl".to_string()));
        assert!(tags.contains(&"restart".to_string()));
    }
}
