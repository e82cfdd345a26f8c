//! Collector source configuration — tag lists, register maps, and HTTP
//! endpoint definitions consumed by the acquisition collectors (section
//! 4.1). One of the five YAML documents named in section 6.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcSourceConfig {
    pub endpoint: String,
    pub tags: Vec<String>,
    #[serde(default = "default_reconnect_cooldown")]
    pub reconnect_cooldown_seconds: f64,
}

fn default_reconnect_cooldown() -> f64 {
    5.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterType {
    Int16,
    Uint16,
    Int32,
    Float32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterGroup {
    pub field: String,
    pub address: u16,
    pub register_type: RegisterType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceSourceConfig {
    pub endpoint: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: f64,
    pub registers: Vec<RegisterGroup>,
}

fn default_poll_interval() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringEndpointConfig {
    pub name: String,
    pub url: String,
    pub poll_interval_seconds: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub plc: Option<PlcSourceConfig>,
    pub guidance: Option<GuidanceSourceConfig>,
    #[serde(default)]
    pub monitoring_endpoints: Vec<MonitoringEndpointConfig>,
}

impl SourcesConfig {
    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}
