//! Configuration management for the CLI.
//!
//! Read from `~/.lineage/config.toml` unless a path is given. Every section
//! is optional; a missing file yields the defaults.

use crate::error::{CliError, Result};
use lineage_engine::EngineConfig;
use lineage_llm::OllamaConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Model endpoint settings
    #[serde(default = "default_model")]
    pub model: OllamaConfig,

    /// Where lineage records are stored
    #[serde(default)]
    pub store: StoreSettings,

    /// Where extraction documents are read from
    #[serde(default)]
    pub source: SourceSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite database file (`:memory:` for a throwaway store)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Extraction source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Directory holding one subdirectory per bucket
    #[serde(default = "default_source_root")]
    pub root: PathBuf,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(lineage_home()?.join("config.toml"))
    }

    /// Load configuration from the default path or use defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.engine.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            model: default_model(),
            store: StoreSettings::default(),
            source: SourceSettings::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            root: default_source_root(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn lineage_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
    Ok(home.join(".lineage"))
}

fn default_model() -> OllamaConfig {
    OllamaConfig::for_model("llama3")
}

fn default_store_path() -> PathBuf {
    lineage_home()
        .map(|home| home.join("lineage.db"))
        .unwrap_or_else(|_| PathBuf::from("lineage.db"))
}

fn default_source_root() -> PathBuf {
    PathBuf::from("extractions")
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
