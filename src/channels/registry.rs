// In-memory registry of resolved channels

use super::{rates_match, Channel, ChannelType};
use regex::Regex;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Append-only collection of every channel resolved during a run.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<Vec<Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Channel>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Channel>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Channels matching `name` and, when given, `kind` and `sample_rate`.
    ///
    /// With `exact_match` the name is compared literally. Otherwise `name` is
    /// a regular expression searched within each channel name; an invalid
    /// expression degrades to a substring search.
    pub fn sieve(
        &self,
        name: &str,
        kind: Option<&ChannelType>,
        sample_rate: Option<f64>,
        exact_match: bool,
    ) -> Vec<Channel> {
        let pattern = if exact_match { None } else { Regex::new(name).ok() };
        let name_matches = |candidate: &str| {
            if exact_match {
                candidate == name
            } else if let Some(re) = &pattern {
                re.is_match(candidate)
            } else {
                candidate.contains(name)
            }
        };

        self.read()
            .iter()
            .filter(|c| name_matches(&c.name))
            .filter(|c| kind.map_or(true, |k| c.kind.as_ref() == Some(k)))
            .filter(|c| sample_rate.map_or(true, |r| rates_match(c.sample_rate, Some(r))))
            .cloned()
            .collect()
    }

    /// Add a channel. Duplicates are kept.
    pub fn append(&self, channel: Channel) {
        self.write().push(channel);
    }

    /// Add `channel` unless a record with the same identity is already
    /// stored, and return the stored instance. The check and the append
    /// happen under one lock so concurrent resolutions converge.
    pub fn register(&self, channel: Channel) -> Channel {
        let mut channels = self.write();
        if let Some(existing) = channels.iter().find(|c| c.same_identity(&channel)) {
            return existing.clone();
        }
        channels.push(channel.clone());
        channel
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|c| c.name.clone()).collect()
    }
}
