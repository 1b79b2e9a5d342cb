//! Bash history parser.
//!
//! Lines starting with `#<unix-seconds>` set a timestamp; subsequent
//! non-`#` lines are commands, using the most recent timestamp. Backslash
//! line continuations join across lines. Leading-space lines are dropped
//! (mirrors `HISTCONTROL=ignorespace`).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCommand {
    pub command: String,
    pub timestamp: Option<DateTime<Utc>>,
}

pub fn parse(contents: &str) -> Vec<HistoryCommand> {
    let mut commands = Vec::new();
    let mut current_timestamp: Option<DateTime<Utc>> = None;
    let mut pending: Option<String> = None;

    for raw_line in contents.lines() {
        if let Some(rest) = raw_line.strip_prefix('#') {
            if let Ok(secs) = rest.trim().parse::<i64>() {
                current_timestamp = DateTime::from_timestamp(secs, 0);
                continue;
            }
            // `#` not followed by a timestamp: treat as an ordinary comment line.
            continue;
        }

        if raw_line.starts_with(' ') {
            // HISTCONTROL=ignorespace convention.
            continue;
        }

        if let Some(mut joined) = pending.take() {
            joined.push('\n');
            joined.push_str(raw_line);
            if let Some(stripped) = joined.strip_suffix('\\') {
                pending = Some(stripped.to_string());
            } else {
                commands.push(HistoryCommand {
                    command: joined,
                    timestamp: current_timestamp,
                });
            }
            continue;
        }

        if let Some(stripped) = raw_line.strip_suffix('\\') {
            pending = Some(stripped.to_string());
        } else {
            commands.push(HistoryCommand {
                command: raw_line.to_string(),
                timestamp: current_timestamp,
            });
        }
    }

    if let Some(joined) = pending {
        commands.push(HistoryCommand {
            command: joined,
            timestamp: current_timestamp,
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associates_commands_with_preceding_timestamp() {
        let contents = "#1700000000\nls -la\n#1700000010\necho hi\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, "ls -la");
        assert!(commands[0].timestamp.is_some());
        assert_ne!(commands[0].timestamp, commands[1].timestamp);
    }

    #[test]
    fn joins_backslash_continuations() {
        let contents = "#1700000000\necho one \\\ntwo\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "echo one \ntwo");
    }

    #[test]
    fn drops_leading_space_lines() {
        let contents = "#1700000000\n secret-command\nvisible-command\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "visible-command");
    }
}
