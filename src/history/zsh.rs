//! Zsh extended-history parser: `:<ts>:<elapsed>;<command>`. A trailing `\`
//! on the command continues into the next line (the backslash and any
//! trailing whitespace before it are stripped). Unrecognized lines attach
//! to the current open command.

use chrono::{DateTime, Utc};

use super::bash::HistoryCommand;

pub fn parse(contents: &str) -> Vec<HistoryCommand> {
    let mut commands = Vec::new();
    let mut open: Option<(Option<DateTime<Utc>>, String)> = None;

    for raw_line in contents.lines() {
        if let Some((timestamp, mut command)) = open.take() {
            let trimmed_end = raw_line.trim_end();
            if let Some(stripped) = trimmed_end.strip_suffix('\\') {
                command.push('\n');
                command.push_str(stripped.trim_end());
                open = Some((timestamp, command));
            } else {
                command.push('\n');
                command.push_str(raw_line);
                commands.push(HistoryCommand { command, timestamp });
            }
            continue;
        }

        if let Some(rest) = raw_line.strip_prefix(':') {
            if let Some((header, command)) = rest.split_once(';') {
                let timestamp = header
                    .split_once(':')
                    .and_then(|(ts, _elapsed)| ts.trim().parse::<i64>().ok())
                    .and_then(|secs| DateTime::from_timestamp(secs, 0));

                if let Some(stripped) = command.trim_end().strip_suffix('\\') {
                    open = Some((timestamp, stripped.trim_end().to_string()));
                } else {
                    commands.push(HistoryCommand {
                        command: command.to_string(),
                        timestamp,
                    });
                }
                continue;
            }
        }

        // Unrecognized line with nothing open: skip rather than fail.
    }

    if let Some((timestamp, command)) = open {
        commands.push(HistoryCommand { command, timestamp });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extended_format_with_timestamp() {
        let contents = ":1700000000:0;echo hi\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "echo hi");
        assert!(commands[0].timestamp.is_some());
    }

    #[test]
    fn joins_trailing_backslash_continuation() {
        let contents = ":1700000000:0;echo one \\\necho two\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "echo one\necho two");
    }

    #[test]
    fn skips_unrecognized_lines_with_nothing_open() {
        let contents = "garbage line\n:1700000000:0;echo hi\n";
        let commands = parse(contents);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "echo hi");
    }
}
