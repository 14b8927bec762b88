//! Configuration management for memchart.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Args, ConfigFormat};
use memchart::sampler::{SamplerSettings, DEFAULT_INTERVAL_SECS, DEFAULT_PROC_ROOT};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7777;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML config")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML config")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render TOML config")]
    TomlRender(#[from] toml::ser::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Effective configuration. Every field is optional so a partial file only
/// overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    #[serde(alias = "interval-seconds", alias = "seconds")]
    pub interval_seconds: Option<u64>,
    pub verbose: Option<bool>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-metrics")]
    pub enable_metrics: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            interval_seconds: Some(DEFAULT_INTERVAL_SECS),
            verbose: Some(false),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            enable_health: Some(true),
            enable_metrics: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Sampler values derived from this config plus the positional pid list.
    pub fn sampler_settings(&self, pids: Vec<String>) -> SamplerSettings {
        SamplerSettings {
            proc_root: self
                .proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            interval: Duration::from_secs(self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECS)),
            verbose: self.verbose.unwrap_or(false),
            pids,
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.interval_seconds == Some(0) {
        return Err(ConfigError::Invalid(
            "interval_seconds must be greater than 0".into(),
        ));
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level '{}', expected one of {}",
                level,
                LOG_LEVELS.join(", ")
            )));
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                ));
            }
            (Some(_), None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_key_path is not set".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_cert_path is not set".into(),
                ));
            }
            (Some(cert), Some(key)) => {
                if !Path::new(cert).exists() {
                    return Err(ConfigError::Invalid(format!(
                        "TLS certificate file not found: {}",
                        cert
                    )));
                }
                if !Path::new(key).exists() {
                    return Err(ConfigError::Invalid(format!(
                        "TLS private key file not found: {}",
                        key
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(seconds) = args.seconds {
        config.interval_seconds = Some(seconds);
    }
    if args.verbose {
        config.verbose = Some(true);
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_metrics {
        config.enable_metrics = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads a config file, falling back to defaults when none is found.
///
/// Missing fields in the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/memchart/memchart.yaml",
                "/etc/memchart/memchart.yml",
                "/etc/memchart/memchart.json",
                "./memchart.yaml",
                "./memchart.yml",
                "./memchart.json",
            ];
            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    let file_config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(file_config))
}

fn merge_defaults(file: Config) -> Config {
    let d = Config::default();
    Config {
        port: file.port.or(d.port),
        bind: file.bind.or(d.bind),
        interval_seconds: file.interval_seconds.or(d.interval_seconds),
        verbose: file.verbose.or(d.verbose),
        proc_root: file.proc_root.or(d.proc_root),
        enable_health: file.enable_health.or(d.enable_health),
        enable_metrics: file.enable_metrics.or(d.enable_metrics),
        log_level: file
            .log_level
            .map(|level| level.to_ascii_lowercase())
            .or(d.log_level),
        enable_tls: file.enable_tls.or(d.enable_tls),
        tls_cert_path: file.tls_cert_path.or(d.tls_cert_path),
        tls_key_path: file.tls_key_path.or(d.tls_key_path),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}
