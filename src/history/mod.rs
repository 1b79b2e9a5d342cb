//! Shell history discovery, parsing, and filtering.

pub mod bash;
pub mod zsh;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

pub use bash::HistoryCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    /// Enumerated in path detection; parsing is optional.
    Pwsh,
}

/// Probe common locations and return the first that is a regular file.
pub fn detect_history_path(shell: Shell, home: &std::path::Path) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = match shell {
        Shell::Zsh => vec![
            home.join(".zsh_history"),
            home.join(".zhistory"),
            home.join(".histfile"),
        ],
        Shell::Bash => vec![
            home.join(".bash_history"),
            home.join(".local/share/bash/history"),
        ],
        Shell::Pwsh => vec![],
    };

    candidates.into_iter().find(|p| p.is_file())
}

pub fn parse(shell: Shell, contents: &str) -> Vec<HistoryCommand> {
    match shell {
        Shell::Bash => bash::parse(contents),
        Shell::Zsh => zsh::parse(contents),
        Shell::Pwsh => Vec::new(),
    }
}

const DEFAULT_SKIP_LIST: &[&str] = &["cd", "ls", "clear", "history", "exit", "pwd", "ll"];

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub remove_empty: bool,
    pub remove_duplicates: bool,
    pub dedupe_consecutive_only: bool,
    pub use_default_skip_list: bool,
    pub custom_skip_list: Vec<String>,
    pub min_length: usize,
    pub since: Option<DateTime<Utc>>,
}

impl FilterOptions {
    pub fn defaults() -> Self {
        FilterOptions {
            remove_empty: true,
            remove_duplicates: true,
            dedupe_consecutive_only: false,
            use_default_skip_list: true,
            custom_skip_list: Vec::new(),
            min_length: 0,
            since: None,
        }
    }
}

pub fn filter(commands: Vec<HistoryCommand>, options: &FilterOptions) -> Vec<HistoryCommand> {
    let mut result = Vec::with_capacity(commands.len());
    let mut seen = std::collections::HashSet::new();
    let mut last: Option<String> = None;

    for cmd in commands {
        let trimmed = cmd.command.trim();

        if options.remove_empty && trimmed.is_empty() {
            continue;
        }
        if trimmed.len() < options.min_length {
            continue;
        }
        if let Some(since) = options.since {
            if cmd.timestamp.map(|ts| ts < since).unwrap_or(false) {
                continue;
            }
        }

        let first_word = trimmed.split_whitespace().next().unwrap_or("");
        if options.use_default_skip_list && DEFAULT_SKIP_LIST.contains(&first_word) {
            continue;
        }
        if options
            .custom_skip_list
            .iter()
            .any(|skip| skip == first_word)
        {
            continue;
        }

        if options.remove_duplicates {
            if options.dedupe_consecutive_only {
                if last.as_deref() == Some(trimmed) {
                    continue;
                }
            } else if !seen.insert(trimmed.to_string()) {
                continue;
            }
        }

        last = Some(trimmed.to_string());
        result.push(cmd);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(s: &str) -> HistoryCommand {
        HistoryCommand {
            command: s.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn filters_skip_list_and_duplicates() {
        let commands = vec![cmd("ls"), cmd("git status"), cmd("git status"), cmd("")];
        let filtered = filter(commands, &FilterOptions::defaults());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].command, "git status");
    }

    #[test]
    fn min_length_drops_short_commands() {
        let commands = vec![cmd("ll"), cmd("docker ps -a")];
        let options = FilterOptions {
            min_length: 5,
            use_default_skip_list: false,
            ..FilterOptions::defaults()
        };
        let filtered = filter(commands, &options);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].command, "docker ps -a");
    }
}
