// Time-series, spectrogram and segment collections shared by a run

pub mod segments;
pub mod series;

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

pub use segments::{DataQualityFlag, Segment, SegmentList};
pub use series::{Spectrogram, TimeSeries};

/// Every dataset loaded or computed during a run.
///
/// Series are grouped per channel (`ndsname`) and may hold several spans
/// each; flags are keyed by name and overwritten on insert.
#[derive(Debug, Default)]
pub struct DataStore {
    timeseries: RwLock<BTreeMap<String, Vec<TimeSeries>>>,
    spectrograms: RwLock<BTreeMap<String, Vec<Spectrogram>>>,
    segments: RwLock<BTreeMap<String, DataQualityFlag>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series under `key`, or under its channel's `ndsname`.
    pub fn add_timeseries(&self, ts: TimeSeries, key: Option<&str>) {
        let key = key.map(str::to_string).unwrap_or_else(|| ts.channel.ndsname());
        let mut map = self.timeseries.write().unwrap_or_else(PoisonError::into_inner);
        let list = map.entry(key).or_default();
        if !list.iter().any(|t| t.epoch == ts.epoch && t.values.len() == ts.values.len()) {
            list.push(ts);
        }
    }

    pub fn add_spectrogram(&self, spec: Spectrogram, key: Option<&str>) {
        let key = key.map(str::to_string).unwrap_or_else(|| spec.channel.ndsname());
        let mut map = self.spectrograms.write().unwrap_or_else(PoisonError::into_inner);
        let list = map.entry(key).or_default();
        if !list.iter().any(|s| s.epoch == spec.epoch && s.values.len() == spec.values.len()) {
            list.push(spec);
        }
    }

    /// Insert a flag, replacing any flag with the same name.
    pub fn insert_segments(&self, flag: DataQualityFlag) {
        self.segments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(flag.name.clone(), flag);
    }

    pub fn timeseries(&self, key: &str) -> Vec<TimeSeries> {
        self.timeseries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn spectrograms(&self, key: &str) -> Vec<Spectrogram> {
        self.spectrograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> Option<DataQualityFlag> {
        self.segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn all_timeseries(&self) -> Vec<TimeSeries> {
        self.timeseries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn all_spectrograms(&self) -> Vec<Spectrogram> {
        self.spectrograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn all_flags(&self) -> Vec<DataQualityFlag> {
        self.segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn timeseries_keys(&self) -> Vec<String> {
        self.timeseries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn spectrogram_keys(&self) -> Vec<String> {
        self.spectrograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn flag_names(&self) -> Vec<String> {
        self.segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Channel, ChannelType};

    #[test]
    fn test_series_grouped_by_channel() {
        let store = DataStore::new();
        let channel = Channel::new("L1:SYS-SIGNAL.mean").with_kind(Some(ChannelType::MTrend));
        store.add_timeseries(TimeSeries::new(channel.clone(), 0.0, 1.0, vec![1.0; 4]), None);
        store.add_timeseries(TimeSeries::new(channel.clone(), 4.0, 1.0, vec![2.0; 4]), None);
        // same span again is not duplicated
        store.add_timeseries(TimeSeries::new(channel, 4.0, 1.0, vec![2.0; 4]), None);

        assert_eq!(store.timeseries_keys(), vec!["L1:SYS-SIGNAL.mean,m-trend"]);
        assert_eq!(store.timeseries("L1:SYS-SIGNAL.mean,m-trend").len(), 2);
        assert!(store.timeseries("L1:SYS-SIGNAL.mean").is_empty());
    }

    #[test]
    fn test_flags_overwrite_by_name() {
        let store = DataStore::new();
        let known = SegmentList::new(vec![Segment::new(0.0, 10.0)]);
        store.insert_segments(DataQualityFlag::new(
            "L1:X:1",
            known.clone(),
            SegmentList::default(),
        ));
        store.insert_segments(DataQualityFlag::new("L1:X:1", known.clone(), known.clone()));

        assert_eq!(store.flag_names(), vec!["L1:X:1"]);
        assert_eq!(store.flag("L1:X:1").unwrap().active, known);
    }
}
