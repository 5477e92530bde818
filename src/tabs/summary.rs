// Channel and data-quality flag tables shown under a tab's plots

use serde::Serialize;

use super::builtin::StateTab;
use crate::channels::{has_trend_suffix, ChannelResolver, MINUTE_TREND_RATE};
use crate::core::error::Result;
use crate::data::{DataQualityFlag, DataStore, SegmentList};
use crate::state::SummaryState;

const INFO_TYPES: &[&str] = &["timeseries", "statevector", "spectrum", "spectrogram"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelInfoRow {
    pub channel: String,
    /// Information page of the channel, or of its raw source for trends.
    pub link: Option<String>,
    pub kind: String,
    pub sample_rate: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagInfoRow {
    pub name: String,
    pub ifo: String,
    pub tag: String,
    pub version: String,
    pub defined: String,
    pub active: String,
}

/// One row per channel used by the tab's data plots.
pub async fn channel_info(
    tab: &StateTab,
    resolver: &ChannelResolver,
) -> Result<Vec<ChannelInfoRow>> {
    let mut rows = Vec::new();
    for channel in tab.channels(INFO_TYPES, None, false) {
        let channel = resolver.resolve(&channel).await?;

        let (link, kind) = match channel.name.rsplit_once('.') {
            Some((source, statistic)) if has_trend_suffix(&channel.name) => {
                let source = resolver.resolve(source).await?;
                let kind = if statistic == "rms" {
                    statistic.to_uppercase()
                } else {
                    title_case(statistic)
                };
                (source.url, kind)
            }
            _ => (channel.url.clone(), "Raw".to_string()),
        };

        let sample_rate = match channel.sample_rate {
            Some(rate) if (rate - MINUTE_TREND_RATE).abs() < 1e-9 => "1/60 Hz".to_string(),
            Some(rate) => format!("{} Hz", rate),
            None => "Unknown".to_string(),
        };

        rows.push(ChannelInfoRow {
            channel: channel.name.clone(),
            link,
            kind,
            sample_rate,
            unit: channel.unit.clone().unwrap_or_else(|| "Unknown".to_string()),
        });
    }
    Ok(rows)
}

/// One row per flag used by the tab's segment plots, restricted to the
/// state's active time. Durations are in seconds with the percentage of
/// the state's livetime.
pub fn flag_info(tab: &StateTab, state: &SummaryState, data: &DataStore) -> Vec<FlagInfoRow> {
    let livetime = state.livetime();
    tab.flags(&["segments"], Some(state.name.as_str()), false)
        .into_iter()
        .map(|name| {
            let flag = data
                .flag(&name)
                .unwrap_or_else(|| {
                    DataQualityFlag::new(
                        name.as_str(),
                        SegmentList::default(),
                        SegmentList::default(),
                    )
                })
                .restrict(&state.active);
            FlagInfoRow {
                ifo: flag.ifo().unwrap_or_default().to_string(),
                tag: flag.tag().to_string(),
                version: flag.version().map(|v| v.to_string()).unwrap_or_default(),
                defined: duration_with_percent(flag.known.duration(), livetime),
                active: duration_with_percent(flag.active.duration(), livetime),
                name,
            }
        })
        .collect()
}

fn duration_with_percent(duration: f64, livetime: f64) -> String {
    if livetime <= 0.0 {
        return "0.00 (0.00%)".to_string();
    }
    format!("{:.2} ({:.2}%)", duration, duration / livetime * 100.0)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
