use serde::{Deserialize, Serialize};

use crate::channels::ChannelType;

/// Processing mode of a summary run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Day,
    Week,
    Month,
    Year,
    /// Arbitrary GPS interval, usually short enough for second trends.
    Gps,
}

impl SummaryMode {
    /// Trend type assumed for a trend request that names none.
    pub fn default_trend(self) -> ChannelType {
        match self {
            SummaryMode::Gps => ChannelType::STrend,
            _ => ChannelType::MTrend,
        }
    }
}
