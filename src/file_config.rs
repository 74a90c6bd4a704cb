//! Writer settings loaded from JSON or from an INI `[tandemlog]` section.
//!
//! Only the folders and the application name are required; every tuning
//! key falls back to the builder default when absent.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::{Ini, Properties};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::writer::TandemLogBuilder;

/// INI section holding the writer settings.
pub const INI_SECTION: &str = "tandemlog";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub online_folder: PathBuf,
    pub offline_folder: PathBuf,
    pub app_name: String,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub retry_pause_ms: Option<u64>,
    #[serde(default)]
    pub connectivity_interval_ms: Option<u64>,
    #[serde(default)]
    pub reconcile_interval_ms: Option<u64>,
    #[serde(default)]
    pub flush_interval_ms: Option<u64>,
    #[serde(default)]
    pub channel_capacity: Option<usize>,
    #[serde(default)]
    pub normalizer_threads: Option<usize>,
}

impl FileConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        let section = ini
            .section(Some(INI_SECTION))
            .ok_or(ConfigError::MissingSection(INI_SECTION))?;
        Ok(Self {
            online_folder: required(section, "online_folder")?.into(),
            offline_folder: required(section, "offline_folder")?.into(),
            app_name: required(section, "app_name")?.to_owned(),
            retry_count: optional(section, "retry_count")?,
            retry_pause_ms: optional(section, "retry_pause_ms")?,
            connectivity_interval_ms: optional(section, "connectivity_interval_ms")?,
            reconcile_interval_ms: optional(section, "reconcile_interval_ms")?,
            flush_interval_ms: optional(section, "flush_interval_ms")?,
            channel_capacity: optional(section, "channel_capacity")?,
            normalizer_threads: optional(section, "normalizer_threads")?,
        })
    }

    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&text)
    }

    /// Builder seeded with these settings; further setters may follow.
    pub fn into_builder(self) -> TandemLogBuilder {
        let mut builder =
            TandemLogBuilder::new(self.online_folder, self.offline_folder, self.app_name);
        if let Some(count) = self.retry_count {
            builder = builder.with_retry_count(count);
        }
        if let Some(ms) = self.retry_pause_ms {
            builder = builder.with_retry_pause(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connectivity_interval_ms {
            builder = builder.with_connectivity_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.reconcile_interval_ms {
            builder = builder.with_reconcile_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.flush_interval_ms {
            builder = builder.with_flush_interval(Duration::from_millis(ms));
        }
        if let Some(capacity) = self.channel_capacity {
            builder = builder.with_channel_capacity(capacity);
        }
        if let Some(threads) = self.normalizer_threads {
            builder = builder.with_normalizer_threads(threads);
        }
        builder
    }
}

fn required<'a>(section: &'a Properties, key: &'static str) -> Result<&'a str, ConfigError> {
    section
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingKey(key))
}

fn optional<T: std::str::FromStr>(
    section: &Properties,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_owned(),
            value: raw.to_owned(),
        })
}
