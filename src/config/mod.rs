//! Process configuration.
//!
//! Top-level process settings (ports, paths, feature toggles) load from
//! TOML and environment variables, following the loading order and
//! singleton pattern this codebase has always used for configuration:
//!
//! 1. `SHIELD_EDGE_CONFIG` environment variable (path to TOML file)
//! 2. `shield_edge.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The domain-specific documents named in the external-interfaces section
//! (sources, warning thresholds, calibrations, reasonableness rules,
//! alignment geometry), plus the per-tag validation bounds the quality
//! pipeline's threshold validator needs (section 4.2), are separate YAML
//! documents, loaded by their own sub-modules, because operators edit
//! those far more often than process settings and a restart-only TOML
//! singleton would be the wrong shape for them.
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere.

pub mod defaults;
pub mod sources;
pub mod thresholds;
pub mod calibration;
pub mod reasonableness;
pub mod geometry;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

static PROCESS_CONFIG: OnceLock<ProcessConfig> = OnceLock::new();

/// Process-wide settings: ports, data paths, and operational-mode toggles
/// gated by environment variables (section 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub server_addr: String,
    pub data_dir: String,
    pub minimal_health: bool,
    pub stub_api: bool,
    pub skip_source_manager: bool,
    pub disable_lifespan: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            minimal_health: false,
            stub_api: false,
            skip_source_manager: false,
            disable_lifespan: false,
        }
    }
}

impl ProcessConfig {
    /// Load following the precedence order documented on the module.
    pub fn load() -> Self {
        let mut cfg = if let Ok(path) = std::env::var("SHIELD_EDGE_CONFIG") {
            Self::from_toml_file(&path).unwrap_or_default()
        } else if Path::new("shield_edge.toml").exists() {
            Self::from_toml_file("shield_edge.toml").unwrap_or_default()
        } else {
            Self::default()
        };

        if let Ok(addr) = std::env::var("SHIELD_EDGE_SERVER_ADDR") {
            cfg.server_addr = addr;
        }
        if let Ok(dir) = std::env::var("SHIELD_EDGE_DATA_DIR") {
            cfg.data_dir = dir;
        }
        cfg.minimal_health = env_flag("SHIELD_EDGE_MINIMAL_HEALTH", cfg.minimal_health);
        cfg.stub_api = env_flag("SHIELD_EDGE_STUB_API", cfg.stub_api);
        cfg.skip_source_manager =
            env_flag("SHIELD_EDGE_SKIP_SOURCE_MANAGER", cfg.skip_source_manager);
        cfg.disable_lifespan = env_flag("SHIELD_EDGE_DISABLE_LIFESPAN", cfg.disable_lifespan);

        cfg
    }

    fn from_toml_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Initialize the global process configuration. Must be called exactly
/// once before any call to [`get`].
pub fn init(config: ProcessConfig) {
    if PROCESS_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global process configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static ProcessConfig {
    PROCESS_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    PROCESS_CONFIG.get().is_some()
}
