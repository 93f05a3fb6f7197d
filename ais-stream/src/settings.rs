use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, File};
use serde::Deserialize;
use tracker_core::{Environment, LogLevel};

use crate::{
    connection::ConnectionSettings, models::BoundingBox, vessel_log::DEFAULT_STATUS_INTERVAL,
};

pub const DEFAULT_STREAM_URL: &str = "wss://stream.aisstream.io/v0/stream";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub stream: StreamSettings,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(with = "humantime_serde")]
    pub batch_window: Duration,
    #[serde(with = "humantime_serde", default = "default_status_interval")]
    pub status_interval: Duration,
    pub location_store: LocationStoreSettings,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_stream_url")]
    pub url: String,
    pub api_key: String,
    pub bounding_boxes: Vec<BoundingBox>,
    pub subscription_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationStoreSettings {
    pub directory: PathBuf,
    #[serde(with = "humantime_serde")]
    pub write_debounce: Duration,
}

fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.to_owned()
}

fn default_status_interval() -> Duration {
    DEFAULT_STATUS_INTERVAL
}

impl Settings {
    pub fn new() -> Result<Settings, ConfigError> {
        let environment = Environment::try_from(
            std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| Environment::Local.to_string()),
        )
        .map_err(|e| ConfigError::Message(e.to_string()))?;

        let builder = Config::builder()
            .add_source(File::with_name(&format!("config/{environment}")).required(true))
            .add_source(config::Environment::with_prefix("AIS_STREAM").separator("__"))
            .set_override("environment", environment.as_ref())?;

        let config = builder.build()?;

        config.try_deserialize()
    }
}
