//! Layered configuration: a TOML file overridden by `GITSAVVY_<SECTION>__<FIELD>`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Case, Config, ConfigError, Environment, File};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Integration strategy default, mirrors `IntegrationStrategy` but kept
/// string-typed here so unknown values surface as a clean deserialize
/// error rather than requiring this crate's git module at config-parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    FfOnly,
    Rebase,
    Merge,
}

impl Default for SyncStrategy {
    fn default() -> Self {
        SyncStrategy::FfOnly
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityMode {
    Direct,
    Pr,
}

impl Default for IdentityMode {
    fn default() -> Self {
        IdentityMode::Direct
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RepoConfig {
    pub path: String,
    pub remote: String,
    pub branch: String,
    pub sync_strategy: SyncStrategy,
    pub auto_reindex: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            path: String::new(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            sync_strategy: SyncStrategy::default(),
            auto_reindex: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IdentityConfig {
    pub path: String,
    pub mode: IdentityMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GitConfig {
    pub author_name: String,
    pub author_email: String,
    pub sign_commits: bool,
    pub push_on_save: bool,
    pub pr_base_branch: String,
    /// Accepts `{identity}`, `{date}`, `{slug}`.
    pub feature_branch_template: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            author_name: String::new(),
            author_email: String::new(),
            sign_commits: false,
            push_on_save: false,
            pr_base_branch: "main".to_string(),
            feature_branch_template: "gitsavvy/{identity}/{slug}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkflowsConfig {
    pub root: String,
    pub shared_root: String,
    pub draft_root: String,
    pub index_path: String,
    pub schema_version: u32,
    pub auto_rebuild: bool,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        WorkflowsConfig {
            root: "workflows".to_string(),
            shared_root: "shared".to_string(),
            draft_root: "drafts".to_string(),
            index_path: ".svf/index.json".to_string(),
            schema_version: crate::workflow::CURRENT_SCHEMA_VERSION,
            auto_rebuild: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RunnerConfig {
    pub default_shell: String,
    pub confirm_each_step: bool,
    pub stream_output: bool,
    pub max_output_lines: usize,
    pub dangerous_command_warnings: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            default_shell: "bash".to_string(),
            confirm_each_step: false,
            stream_output: true,
            max_output_lines: 500,
            dangerous_command_warnings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    Form,
    PerStep,
}

impl Default for PromptStyle {
    fn default() -> Self {
        PromptStyle::Form
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SaveDefaults {
    None,
    Keychain,
    File,
}

impl Default for SaveDefaults {
    fn default() -> Self {
        SaveDefaults::None
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlaceholdersConfig {
    pub prompt_style: PromptStyle,
    pub save_defaults: SaveDefaults,
    pub keychain_service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TuiConfig {
    pub enabled: bool,
    pub theme: String,
    pub show_help: bool,
}

impl Default for TuiConfig {
    fn default() -> Self {
        TuiConfig {
            enabled: true,
            theme: "default".to_string(),
            show_help: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EditorConfig {
    /// Falls back to `$EDITOR` when blank.
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RedactLevel {
    None,
    Basic,
    Strict,
}

impl Default for RedactLevel {
    fn default() -> Self {
        RedactLevel::Strict
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub redact: RedactLevel,
    pub confirm_send: bool,
}

/// Top-level configuration consumed by the core and its external
/// collaborators (CLI, TUI, self-updater, AI feature). This crate only
/// implements the `repo`/`identity`/`git`/`workflows`/`runner`/`placeholders`
/// sections' semantics; `tui`/`editor`/`ai` are carried as typed fields so
/// downstream collaborators have something to bind to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GitsavvyConfig {
    pub repo: RepoConfig,
    pub identity: IdentityConfig,
    pub git: GitConfig,
    pub workflows: WorkflowsConfig,
    pub runner: RunnerConfig,
    pub placeholders: PlaceholdersConfig,
    pub tui: TuiConfig,
    pub editor: EditorConfig,
    pub ai: AiConfig,
}

const ENV_PREFIX: &str = "GITSAVVY";

impl GitsavvyConfig {
    /// Load from `config_path` if it exists, layered under
    /// `GITSAVVY_<SECTION>__<FIELD>` environment overrides (kebab-case
    /// field names, `__` as the nested separator).
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .convert_case(Case::Kebab),
        );
        builder.build()?.try_deserialize()
    }

    pub fn load_from_str(toml_text: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(
            toml_text,
            config::FileFormat::Toml,
        ));
        builder.build()?.try_deserialize()
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gitsavvy").join("config.toml"))
    }

    /// Write this configuration to `path` as TOML, creating parent
    /// directories as needed. Used by `gsv init` to materialize a config
    /// file the user can then hand-edit.
    pub fn write_default(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, text)
    }
}

/// Resolve the editor command: the config's explicit `editor.command` if
/// set, else `$EDITOR`, else the first of `vi`/`nano`/`vim` found on `PATH`.
pub fn resolve_editor(config: &EditorConfig) -> Option<String> {
    if !config.command.is_empty() {
        return Some(config.command.clone());
    }
    if let Ok(from_env) = std::env::var("EDITOR") {
        if !from_env.is_empty() {
            return Some(from_env);
        }
    }
    ["vi", "nano", "vim"]
        .into_iter()
        .find_map(|candidate| which::which(candidate).ok().map(|_| candidate.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated_without_any_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = GitsavvyConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.repo.remote, "origin");
        assert_eq!(config.runner.default_shell, "bash");
        assert_eq!(config.workflows.root, "workflows");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let toml = "[repo]\nremote = \"upstream\"\n\n[runner]\ndefault_shell = \"zsh\"\n";
        let config = GitsavvyConfig::load_from_str(toml).unwrap();
        assert_eq!(config.repo.remote, "upstream");
        assert_eq!(config.runner.default_shell, "zsh");
    }

    #[test]
    fn env_override_beats_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[repo]\nremote = \"origin\"\n").unwrap();

        // SAFETY for test purposes: single-threaded test process, scoped to this call.
        unsafe {
            std::env::set_var("GITSAVVY_REPO__REMOTE", "env-remote");
        }
        let config = GitsavvyConfig::load(&config_path).unwrap();
        unsafe {
            std::env::remove_var("GITSAVVY_REPO__REMOTE");
        }
        assert_eq!(config.repo.remote, "env-remote");
    }

    #[test]
    fn write_default_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = GitsavvyConfig::default();
        config.repo.remote = "upstream".to_string();
        config.write_default(&path).unwrap();

        let loaded = GitsavvyConfig::load(&path).unwrap();
        assert_eq!(loaded.repo.remote, "upstream");
    }

    #[test]
    fn resolve_editor_prefers_explicit_command() {
        let config = EditorConfig {
            command: "emacs".to_string(),
        };
        assert_eq!(resolve_editor(&config), Some("emacs".to_string()));
    }
}
