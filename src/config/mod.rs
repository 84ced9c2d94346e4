//! Configuration for padshell
//!
//! Settings come from a YAML file, then environment variables (a `.env`
//! file is loaded first by the binary) override individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::colors::ColorSpec;
use crate::dispatch::{DispatchMode, QueueSettings};
use crate::grid::{self, Coordinate};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub launchpad: LaunchpadConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Device settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaunchpadConfig {
    /// Substring of the MIDI port name, matched case-insensitively
    #[serde(default = "default_port_name")]
    pub port_name: String,
    #[serde(default = "default_grid_size")]
    pub grid_size: u8,
    /// Log every button event at info level
    #[serde(default = "default_true")]
    pub debug_mode: bool,
}

/// How actions are executed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShellConfig {
    #[serde(default = "default_shell_path")]
    pub shell_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    /// Pass `-i` so aliases from rc files are available
    #[serde(default = "default_true")]
    pub interactive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// One pad mapping
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_color")]
    pub color: ColorSpec,
    pub action: String,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            grid_size: default_grid_size(),
            debug_mode: true,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            shell_path: default_shell_path(),
            timeout_secs: default_timeout_secs(),
            work_dir: None,
            interactive: true,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            queue_capacity: default_queue_capacity(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl DispatchConfig {
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            capacity: self.queue_capacity,
            max_concurrent: self.max_concurrent,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse YAML config: {}", path))
    }

    /// Load the file if it exists, otherwise start from defaults
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("LAUNCHPAD_PORT") {
            self.launchpad.port_name = port;
        }
        if let Some(value) = lookup("DEBUG_MODE") {
            self.launchpad.debug_mode = parse_bool(&value)
                .with_context(|| format!("Invalid DEBUG_MODE '{}'", value))?;
        }
        if let Some(value) = lookup("GRID_SIZE") {
            self.launchpad.grid_size = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid GRID_SIZE '{}'", value))?;
        }
        if let Some(shell) = lookup("SHELL_PATH") {
            self.shell.shell_path = shell;
        }
        if let Some(value) = lookup("SHELL_TIMEOUT") {
            self.shell.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid SHELL_TIMEOUT '{}'", value))?;
        }
        if let Some(dir) = lookup("WORK_DIR") {
            self.shell.work_dir = Some(dir).filter(|d| !d.trim().is_empty());
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.launchpad.port_name.trim().is_empty() {
            anyhow::bail!("Launchpad port_name cannot be empty");
        }

        grid::check_grid_size(self.launchpad.grid_size)?;

        if !Path::new(&self.shell.shell_path).exists() {
            anyhow::bail!("Shell '{}' does not exist", self.shell.shell_path);
        }

        if let Some(dir) = &self.shell.work_dir {
            if !Path::new(dir).is_dir() {
                anyhow::bail!("Working directory '{}' does not exist", dir);
            }
        }

        if self.shell.timeout_secs == 0 {
            anyhow::bail!("Shell timeout must be at least 1 second");
        }

        if self.dispatch.queue_capacity == 0 || self.dispatch.max_concurrent == 0 {
            anyhow::bail!("Dispatch queue_capacity and max_concurrent must be greater than 0");
        }

        for (idx, mapping) in self.mappings.iter().enumerate() {
            mapping
                .validate(self.launchpad.grid_size)
                .with_context(|| format!("Invalid mapping #{}", idx))?;
        }

        Ok(())
    }
}

impl MappingConfig {
    fn validate(&self, grid_size: u8) -> Result<()> {
        self.coordinate(grid_size)?;
        self.color.resolve()?;
        if self.action.trim().is_empty() {
            anyhow::bail!("Mapping ({}, {}) has an empty action", self.x, self.y);
        }
        Ok(())
    }

    pub fn coordinate(&self, grid_size: u8) -> Result<Coordinate> {
        Ok(Coordinate::new(self.x, self.y, grid_size)?)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

// Default value functions
fn default_port_name() -> String { "Launchpad Mini MK3".to_string() }
fn default_grid_size() -> u8 { grid::DEFAULT_GRID_SIZE }
fn default_shell_path() -> String { "/bin/zsh".to_string() }
fn default_timeout_secs() -> u64 { 5 }
fn default_true() -> bool { true }
fn default_queue_capacity() -> usize { 32 }
fn default_max_concurrent() -> usize { 4 }
fn default_color() -> ColorSpec { ColorSpec::Numeric(crate::colors::GREEN as u32) }
