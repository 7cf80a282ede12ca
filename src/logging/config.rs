use crate::Result;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";

/// Where console logs should be emitted.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "stdout" => Ok(ConsoleOutput::Stdout),
            "stderr" => Ok(ConsoleOutput::Stderr),
            "none" => Ok(ConsoleOutput::None),
            _ => Err(format!(
                "invalid logging.console_output '{}'; supported values are stdout, stderr, none",
                value
            )),
        }
    }
}

/// Resolved logging configuration after reading the config file and env
/// overrides.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub default_level: String,
    pub enable_file: bool,
    pub log_dir: Option<PathBuf>,
    pub console_output: ConsoleOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: false,
            log_dir: None,
            console_output: ConsoleOutput::default(),
        }
    }
}

impl LoggingConfig {
    /// Load configuration with deterministic precedence: defaults, the
    /// workspace shiplog.toml [logging] section, then env overrides.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(workspace) = workspace_root {
            if let Some(section) = Self::load_from_workspace(workspace)? {
                config.apply(section);
            }
        }
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn load_from_workspace(workspace_root: &Path) -> Result<Option<TomlLoggingSection>> {
        let path = workspace_root.join("shiplog.toml");
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let parsed: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(parsed.logging)
    }

    fn apply(&mut self, section: TomlLoggingSection) {
        if let Some(default_level) = section.default_level {
            self.default_level = default_level;
        }
        if let Some(enable_file) = section.enable_file {
            self.enable_file = enable_file;
        }
        if let Some(log_dir) = section.log_dir {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
        if let Some(console_output) = section.console_output {
            self.console_output = console_output;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("SHIPLOG_LOG") {
            if !level.trim().is_empty() {
                self.default_level = level;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TomlConfig {
    logging: Option<TomlLoggingSection>,
}

#[derive(Debug, Deserialize)]
struct TomlLoggingSection {
    default_level: Option<String>,
    enable_file: Option<bool>,
    log_dir: Option<String>,
    #[serde(default)]
    console_output: Option<ConsoleOutput>,
}
