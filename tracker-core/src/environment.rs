use serde::Deserialize;
use snafu::OptionExt;

use crate::error::{Error, error::InvalidEnvironmentSnafu};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    Local,
    Development,
    Production,
    Test,
}

impl Environment {
    const ALL: [Environment; 4] = [
        Environment::Local,
        Environment::Development,
        Environment::Production,
        Environment::Test,
    ];
}

impl TryFrom<String> for Environment {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_ref() == lower)
            .context(InvalidEnvironmentSnafu { value })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
