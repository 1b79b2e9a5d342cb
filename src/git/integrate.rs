//! Integration strategy and conflict-resolution choice types.
//!
//! Variants, not inheritance: each branch of [`crate::git::GitGateway::integrate`]
//! enumerates these exhaustively rather than dispatching through a trait object.

use std::fmt;

/// How to bring remote commits into the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStrategy {
    FfOnly,
    Rebase,
    Merge,
}

impl IntegrationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStrategy::FfOnly => "ff-only",
            IntegrationStrategy::Rebase => "rebase",
            IntegrationStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for IntegrationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IntegrationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ff-only" => Ok(IntegrationStrategy::FfOnly),
            "rebase" => Ok(IntegrationStrategy::Rebase),
            "merge" => Ok(IntegrationStrategy::Merge),
            other => Err(format!("unknown integration strategy: {other}")),
        }
    }
}

/// Which side wins when resolving a conflicted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveChoice {
    Ours,
    Theirs,
    Manual,
    Unresolved,
}

/// Outcome of a clean `integrate` call, used by the Sync Engine to render a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrateSummary {
    pub branch: String,
    pub strategy: Option<IntegrationStrategy>,
    pub ahead: u32,
    pub behind: u32,
    pub changed_files: Vec<String>,
}

impl Default for IntegrationStrategy {
    fn default() -> Self {
        IntegrationStrategy::FfOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_from_config_string() {
        assert_eq!(
            "rebase".parse::<IntegrationStrategy>().unwrap(),
            IntegrationStrategy::Rebase
        );
        assert!("bogus".parse::<IntegrationStrategy>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for s in [
            IntegrationStrategy::FfOnly,
            IntegrationStrategy::Rebase,
            IntegrationStrategy::Merge,
        ] {
            assert_eq!(s.to_string().parse::<IntegrationStrategy>().unwrap(), s);
        }
    }
}
