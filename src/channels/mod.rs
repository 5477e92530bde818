// Channel records, request parsing and name patterns

pub mod dispatch;
pub mod registry;
pub mod resolver;
#[cfg(test)]
pub(crate) mod testing;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub use registry::ChannelRegistry;
pub use resolver::{ChannelResolver, ResolverOptions};

/// Sample rate of a minute trend, in Hz.
pub const MINUTE_TREND_RATE: f64 = 1.0 / 60.0;
/// Sample rate of a second trend, in Hz.
pub const SECOND_TREND_RATE: f64 = 1.0;

// One canonical channel name, e.g. `L1:GDS-CALIB_STRAIN.mean,m-trend`
const CHANNEL_PATTERN: &str = concat!(
    r"(?:[A-Z]\d|[\w-]+)?:",
    r"(?:[a-zA-Z0-9]+)?",
    r"(?:[_-][a-zA-Z0-9]+)?",
    r"(?:[_-][a-zA-Z0-9_-]+)?",
    r"(?:[.-][a-z]+)?",
    r"(?:,(?P<type>(?:[a-z]-)?[a-z]+))?",
);

fn channel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHANNEL_PATTERN).expect("channel pattern is valid"))
}

fn trend_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.[a-z]+\z").expect("trend suffix pattern is valid"))
}

fn ifo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A([A-Z]\d):").expect("ifo pattern is valid"))
}

/// Every canonical channel name found in `name`, left to right.
pub fn channel_tokens(name: &str) -> Vec<String> {
    channel_regex()
        .find_iter(name)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// True when `name` ends in a trend statistic such as `.mean` or `.rms`.
pub fn has_trend_suffix(name: &str) -> bool {
    trend_suffix_regex().is_match(name)
}

/// True when `value` starts with a canonical channel name.
pub fn is_channel_name(value: &str) -> bool {
    channel_regex()
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.len() > 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelType {
    Raw,
    MTrend,
    STrend,
    Other(String),
}

impl ChannelType {
    pub fn as_str(&self) -> &str {
        match self {
            ChannelType::Raw => "raw",
            ChannelType::MTrend => "m-trend",
            ChannelType::STrend => "s-trend",
            ChannelType::Other(s) => s,
        }
    }

    pub fn is_trend(&self) -> bool {
        matches!(self, ChannelType::MTrend | ChannelType::STrend)
    }
}

impl From<&str> for ChannelType {
    fn from(value: &str) -> Self {
        match value {
            "raw" => ChannelType::Raw,
            "m-trend" => ChannelType::MTrend,
            "s-trend" => ChannelType::STrend,
            other => ChannelType::Other(other.to_string()),
        }
    }
}

impl From<String> for ChannelType {
    fn from(value: String) -> Self {
        ChannelType::from(value.as_str())
    }
}

impl From<ChannelType> for String {
    fn from(value: ChannelType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved data channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<ChannelType>,
    #[serde(default)]
    pub sample_rate: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub bits: Option<Vec<String>>,
    #[serde(default)]
    pub filter: Option<String>,
    /// `*_range` attributes, keyed by their full name (e.g. `frequency_range`).
    #[serde(default)]
    pub ranges: BTreeMap<String, (f64, f64)>,
    #[serde(default)]
    pub subchannels: Vec<Channel>,
    /// Explicit observatory identifier, set for composites.
    #[serde(default)]
    pub ifo: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: Option<ChannelType>) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: Option<f64>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Name as used by the data servers: `name` or `name,type`.
    pub fn ndsname(&self) -> String {
        match &self.kind {
            Some(kind) => format!("{},{}", self.name, kind),
            None => self.name.clone(),
        }
    }

    /// Observatory identifier: the explicit one for composites, else the
    /// `X1:` prefix of the name.
    pub fn ifo(&self) -> Option<String> {
        if let Some(ifo) = &self.ifo {
            return Some(ifo.clone());
        }
        ifo_regex()
            .captures(&self.name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Copy provenance and metadata from the raw source of a trend.
    pub fn inherit_from(&mut self, source: &Channel) {
        self.url = source.url.clone();
        self.unit = source.unit.clone();
        if source.bits.is_some() {
            self.bits = source.bits.clone();
        }
        if source.filter.is_some() {
            self.filter = source.filter.clone();
        }
        for (key, range) in &source.ranges {
            self.ranges.entry(key.clone()).or_insert(*range);
        }
    }

    /// True when (name, type, sample_rate) match.
    pub fn same_identity(&self, other: &Channel) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && rates_match(self.sample_rate, other.sample_rate)
    }

    /// `ndsname [rate, unit]`, used when listing ambiguous candidates.
    pub fn describe(&self) -> String {
        let rate = self
            .sample_rate
            .map(|r| format!("{} Hz", r))
            .unwrap_or_else(|| "None".to_string());
        let unit = self.unit.as_deref().unwrap_or("None");
        format!("{} [{}, {}]", self.ndsname(), rate, unit)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub(crate) fn rates_match(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
        _ => false,
    }
}

/// What a caller asked for: a name plus optional type and sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRequest {
    pub name: String,
    pub kind: Option<ChannelType>,
    pub sample_rate: Option<f64>,
}

impl ChannelRequest {
    /// Parse a request string.
    ///
    /// Names containing a space are composite expressions and keep the whole
    /// string, taking their type from the first channel token. Otherwise a
    /// trailing `,type` is split off.
    pub fn parse(request: &str) -> Self {
        if request.contains(' ') {
            let kind = channel_regex()
                .captures(request)
                .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
                .and_then(|c| c.name("type"))
                .map(|m| ChannelType::from(m.as_str()));
            Self {
                name: request.to_string(),
                kind,
                sample_rate: None,
            }
        } else if let Some((name, kind)) = request.rsplit_once(',') {
            Self {
                name: name.to_string(),
                kind: Some(ChannelType::from(kind)),
                sample_rate: None,
            }
        } else {
            Self {
                name: request.to_string(),
                kind: None,
                sample_rate: None,
            }
        }
    }
}

impl From<&str> for ChannelRequest {
    fn from(value: &str) -> Self {
        ChannelRequest::parse(value)
    }
}

impl From<&String> for ChannelRequest {
    fn from(value: &String) -> Self {
        ChannelRequest::parse(value)
    }
}

impl From<&Channel> for ChannelRequest {
    fn from(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            kind: channel.kind.clone(),
            sample_rate: channel.sample_rate,
        }
    }
}

impl fmt::Display for ChannelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) if !self.name.contains(' ') => write!(f, "{},{}", self.name, kind),
            _ => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_of_composite_expression() {
        assert_eq!(
            channel_tokens("L1:PSL-ISS_PDA_OUT_DQ H1:PSL-ISS_PDB_OUT_DQ"),
            vec!["L1:PSL-ISS_PDA_OUT_DQ", "H1:PSL-ISS_PDB_OUT_DQ"]
        );
        assert_eq!(channel_tokens("L1:GDS-CALIB_STRAIN").len(), 1);
        assert!(channel_tokens("no channel here").is_empty());
    }

    #[test]
    fn test_trend_suffix() {
        assert!(has_trend_suffix("L1:ISI-GND_STS_ITMY_X_BLRMS_30M_100M.mean"));
        assert!(!has_trend_suffix("L1:GDS-CALIB_STRAIN"));
        assert!(!has_trend_suffix("L1:GDS-CALIB_STRAIN.Mean"));
    }

    #[test]
    fn test_parse_request_with_type() {
        let req = ChannelRequest::parse("L1:SYS-SIGNAL.rms,s-trend");
        assert_eq!(req.name, "L1:SYS-SIGNAL.rms");
        assert_eq!(req.kind, Some(ChannelType::STrend));
        assert_eq!(req.to_string(), "L1:SYS-SIGNAL.rms,s-trend");
    }

    #[test]
    fn test_parse_composite_request_keeps_whole_name() {
        let req = ChannelRequest::parse("L1:A-B.mean,m-trend L1:C-D.mean,m-trend");
        assert_eq!(req.name, "L1:A-B.mean,m-trend L1:C-D.mean,m-trend");
        assert_eq!(req.kind, Some(ChannelType::MTrend));
    }

    #[test]
    fn test_ifo_and_ndsname() {
        let channel = Channel::new("H1:GDS-CALIB_STRAIN").with_kind(Some(ChannelType::Raw));
        assert_eq!(channel.ifo().as_deref(), Some("H1"));
        assert_eq!(channel.ndsname(), "H1:GDS-CALIB_STRAIN,raw");
        assert_eq!(Channel::new("GDS-CALIB_STRAIN").ifo(), None);
    }

    #[test]
    fn test_inherit_keeps_existing_ranges() {
        let mut source = Channel::new("L1:SYS-SIGNAL");
        source.unit = Some("m".to_string());
        source.url = Some("https://cis.example.org/channel/1".to_string());
        source.ranges.insert("frequency_range".to_string(), (10.0, 100.0));
        source.ranges.insert("y_range".to_string(), (0.0, 1.0));

        let mut trend = Channel::new("L1:SYS-SIGNAL.mean");
        trend.ranges.insert("y_range".to_string(), (-1.0, 1.0));
        trend.inherit_from(&source);

        assert_eq!(trend.unit.as_deref(), Some("m"));
        assert_eq!(trend.url, source.url);
        assert_eq!(trend.ranges["frequency_range"], (10.0, 100.0));
        assert_eq!(trend.ranges["y_range"], (-1.0, 1.0));
    }

    #[test]
    fn test_channel_type_serde() {
        let channel = Channel::new("L1:X-Y").with_kind(Some(ChannelType::MTrend));
        let json = serde_json::to_string(&channel).unwrap();
        assert!(json.contains("\"type\":\"m-trend\""));
        let back: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, channel);
    }
}
