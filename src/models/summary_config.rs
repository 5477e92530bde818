use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::mode::SummaryMode;
use crate::core::constants::CompressionType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub mode: SummaryMode,
    pub channels: ChannelConfig,
    pub archive: ArchiveConfig,
    pub plots: PlotConfig,
    pub segdb_error: SegdbErrorPolicy,
    /// Configuration sections as produced by the INI front end.
    pub sections: BTreeMap<String, ConfigSection>,
}

impl SummaryConfig {
    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Base URL of the channel information service. Remote lookups are
    /// skipped when unset.
    pub query_url: Option<String>,
    pub timeout_secs: f64,
    pub max_workers: usize,
    pub find_trend_source: bool,
    pub max_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            query_url: None,
            timeout_secs: 5.0,
            max_workers: 8,
            find_trend_source: true,
            max_depth: 32,
        }
    }
}

impl ChannelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub path: Option<PathBuf>,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub outdir: PathBuf,
    /// Pause after handing a plot to the queue.
    pub dispatch_delay_ms: u64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            outdir: PathBuf::from("plots"),
            dispatch_delay_ms: 500,
        }
    }
}

impl PlotConfig {
    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

/// What to do when a segment-database query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegdbErrorPolicy {
    #[default]
    Raise,
    Ignore,
}

/// One `[section]` of key/value options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSection(pub BTreeMap<String, String>);

impl ConfigSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigSection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
