//! Monitoring settings and their external store.
//!
//! The monitoring service of a topology (`{prefix}-util-monitoring`)
//! declares what the monitoring tool should watch. Those settings are
//! published as one JSON object under `{prefix}-monitoring-settings`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topoc_common::config::CompilerConfig;
use topoc_common::constants;
use topoc_common::error::{Result, TopocError};
use topoc_model::Topology;

/// Settings consumed by the monitoring tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Polling interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_in_seconds: Option<u64>,
    /// Non-API service name to staleness threshold in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_api_services_to_monitor: Option<BTreeMap<String, u64>>,
    /// API service name to health-check endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_services_to_monitor: Option<BTreeMap<String, String>>,
}

/// Name of the service carrying monitoring settings.
#[must_use]
pub fn monitoring_service_name(config: &CompilerConfig) -> String {
    format!("{}{}", config.prefix_lower(), constants::MONITORING_SERVICE_SUFFIX)
}

/// Store key the settings are published under.
#[must_use]
pub fn settings_key(config: &CompilerConfig) -> String {
    format!("{}{}", config.prefix_lower(), constants::MONITORING_KEY_SUFFIX)
}

/// Extracts the monitoring settings, if the topology has a monitoring service.
#[must_use]
pub fn extract(topology: &Topology, config: &CompilerConfig) -> Option<MonitoringSettings> {
    let service = topology.service(&monitoring_service_name(config))?;
    Some(MonitoringSettings {
        refresh_interval_in_seconds: service.refresh_interval_in_seconds,
        non_api_services_to_monitor: service.non_api_services_to_monitor.as_ref().map(|list| {
            list.iter()
                .map(|m| (m.name.clone(), m.threshold_in_minutes))
                .collect()
        }),
        api_services_to_monitor: service.api_services_to_monitor.as_ref().map(|list| {
            list.iter()
                .map(|m| (m.name.clone(), m.endpoint.clone()))
                .collect()
        }),
    })
}

/// Publishes the topology's monitoring settings to `store`.
///
/// Nothing is written when the topology has no monitoring service.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn publish(
    topology: &Topology,
    config: &CompilerConfig,
    store: &mut dyn SettingsStore,
) -> Result<Option<MonitoringSettings>> {
    let Some(settings) = extract(topology, config) else {
        tracing::warn!(
            service = %monitoring_service_name(config),
            "no monitoring service in topology, nothing published"
        );
        return Ok(None);
    };
    let key = settings_key(config);
    let value = serde_json::to_string(&settings)?;
    store.publish(&key, &value)?;
    tracing::info!(%key, "monitoring settings published");
    Ok(Some(settings))
}

/// Key-value store receiving published settings.
pub trait SettingsStore {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Publish`] if the write fails.
    fn publish(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Settings store backed by a Redis server.
pub struct RedisStore {
    connection: redis::Connection,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Publish`] if the URL is invalid or the
    /// connection fails.
    pub fn connect(url: &str) -> Result<Self> {
        tracing::debug!(%url, "connecting to settings store");
        let client = redis::Client::open(url).map_err(publish_error)?;
        let connection = client.get_connection().map_err(publish_error)?;
        Ok(Self { connection })
    }

    /// Connects using the configured URL, or the redis service discovery
    /// variables of the environment the compiler runs in.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Publish`] if the connection fails.
    pub fn from_config(config: &CompilerConfig) -> Result<Self> {
        match config.redis_url {
            Some(ref url) => Self::connect(url),
            None => Self::connect(&discovered_url(&config.prefix)),
        }
    }
}

impl SettingsStore for RedisStore {
    fn publish(&mut self, key: &str, value: &str) -> Result<()> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query::<()>(&mut self.connection)
            .map_err(publish_error)
    }
}

fn publish_error(e: redis::RedisError) -> TopocError {
    TopocError::Publish {
        message: e.to_string(),
    }
}

/// Builds a redis URL from `{PREFIX}_UTIL_REDIS_SERVICE_SERVICE_HOST/_PORT`.
fn discovered_url(prefix: &str) -> String {
    let var = |suffix: &str| std::env::var(format!("{prefix}_UTIL_REDIS_SERVICE_SERVICE_{suffix}")).ok();
    let host = var("HOST").unwrap_or_else(|| "localhost".to_string());
    let port = var("PORT").unwrap_or_else(|| "6379".to_string());
    format!("redis://{host}:{port}/")
}

/// In-process store, for dry runs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl SettingsStore for MemoryStore {
    fn publish(&mut self, key: &str, value: &str) -> Result<()> {
        let _ = self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
