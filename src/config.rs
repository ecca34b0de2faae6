use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "EVENT_TAP_CONFIG";

/// Environment variable overriding the enabled services (comma-separated)
pub const SERVICES_ENV: &str = "EVENT_TAP_SERVICES";

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub services: ServicesConfig,
    pub debug: DebugConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Names of services to register with the runtime
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Level for per-event lines
    pub event_level: LogLevel,
    /// Level for the registration confirmation
    pub info_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Append log output to this file instead of stderr
    pub file: Option<PathBuf>,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }

    /// The level lines are written at, or `None` when output is off
    pub fn as_level(self) -> Option<log::Level> {
        self.as_filter().to_level()
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["debug".to_string()],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            event_level: LogLevel::Debug,
            info_level: LogLevel::Info,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply the services override
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;

        if let Ok(services) = std::env::var(SERVICES_ENV) {
            config.apply_services_override(&services);
        }

        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        Ok(Self::load_first(&Self::candidate_paths()).unwrap_or_else(|| {
            log::info!("No config file found, using defaults");
            Self::default()
        }))
    }

    /// Config locations in lookup order: `EVENT_TAP_CONFIG`, the user config
    /// directory, then the working directory
    fn candidate_paths() -> Vec<PathBuf> {
        std::env::var(CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("event-tap").join("event-tap.yaml")))
            .chain(std::iter::once(PathBuf::from("event-tap.yaml")))
            .collect()
    }

    /// First candidate that exists and parses; broken files are skipped with a warning
    fn load_first(candidates: &[PathBuf]) -> Option<Self> {
        candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from_file(path) {
                Ok(config) => Some(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {:#}", path.display(), e);
                    None
                }
            })
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Replace the enabled services with a comma-separated list
    pub fn apply_services_override(&mut self, services: &str) {
        self.services.enabled = services
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        log::debug!("Services overridden from {}: {:?}", SERVICES_ENV, self.services.enabled);
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
