use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::nav::ArrowPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub nav: NavConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Only allow moving to completed steps or the one right after them
    pub linear: bool,
    /// Step shown first when the engine owns the active index
    #[serde(default)]
    pub initial: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Validators running longer than this count as faulted (0 = no limit)
    #[serde(default = "default_validation_timeout")]
    pub timeout_ms: u64,
}

fn default_validation_timeout() -> u64 {
    5000 // 5 seconds
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_validation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub arrow_policy: ArrowPolicy,
}

/// Debounced side checks (e.g. "is this email taken")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Simulated latency of the demo lookup service
    #[serde(default = "default_lookup_latency")]
    pub lookup_latency_ms: u64,
}

fn default_debounce() -> u64 {
    500
}

fn default_lookup_latency() -> u64 {
    500
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            lookup_latency_ms: default_lookup_latency(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether the interactive session logs to a file (false = stderr)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".stepper/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // User config in ~/.config/stepper/ (optional global overrides)
        let user_config = dirs::config_dir().map(|dir| dir.join("stepper").join("config.toml"));

        // Environment variables, e.g. STEPPER__ENGINE__LINEAR=true
        let env = config::Environment::with_prefix("STEPPER")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);

        Self::load_layered(
            config_path,
            &Self::local_config_path(),
            user_config.as_deref(),
            Some(env),
        )
    }

    /// Layer defaults, local file, user file, explicit file and environment,
    /// lowest precedence first. Missing files are skipped.
    fn load_layered(
        config_path: Option<&str>,
        local_config: &Path,
        user_config: Option<&Path>,
        env: Option<config::Environment>,
    ) -> Result<Self> {
        // Start with embedded defaults so stepper works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        for path in std::iter::once(local_config).chain(user_config) {
            if path.exists() {
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(PathBuf::from(path)));
        }

        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .stepper/config.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::local_config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create stepper config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str)
            .with_context(|| format!("Failed to write config file {}", config_path.display()))?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                linear: false,
                initial: 0,
            },
            validation: ValidationConfig::default(),
            nav: NavConfig::default(),
            checks: ChecksConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig {
                state: ".stepper".to_string(),
            },
        }
    }
}
