use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::channels::{ChannelRegistry, ChannelResolver};
use crate::data::DataStore;
use crate::models::SummaryConfig;
use crate::tabs::PlotQueue;

/// Output files already written, or queued for writing, in this run.
#[derive(Debug, Default)]
pub struct WrittenPlots {
    paths: Mutex<HashSet<PathBuf>>,
}

impl WrittenPlots {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    /// Record `path`; returns false if it was already recorded.
    pub fn insert(&self, path: impl Into<PathBuf>) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into())
    }

    pub fn len(&self) -> usize {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one summary run shares between tabs: channel resolution,
/// loaded data, written plots and configuration.
#[derive(Clone, Debug)]
pub struct SummaryContext {
    pub resolver: ChannelResolver,
    pub data: Arc<DataStore>,
    pub written_plots: Arc<WrittenPlots>,
    pub config: Arc<SummaryConfig>,
}

impl SummaryContext {
    pub fn new(config: SummaryConfig) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let resolver = ChannelResolver::from_config(&config.channels, config.mode, registry);
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: SummaryConfig, resolver: ChannelResolver) -> Self {
        Self {
            resolver,
            data: Arc::new(DataStore::new()),
            written_plots: Arc::new(WrittenPlots::default()),
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        self.resolver.registry()
    }

    /// Plot queue over this run's data with the configured dispatch delay.
    pub fn plot_queue(&self) -> PlotQueue {
        PlotQueue::from_config(&self.config, Arc::clone(&self.data))
    }
}

impl Default for SummaryContext {
    fn default() -> Self {
        Self::new(SummaryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_plots_dedup() {
        let written = WrittenPlots::default();
        assert!(written.insert("plots/L1-TIMESERIES.png"));
        assert!(!written.insert("plots/L1-TIMESERIES.png"));
        assert!(written.contains(Path::new("plots/L1-TIMESERIES.png")));
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let a = SummaryContext::default();
        let b = SummaryContext::default();
        a.resolver.resolve("L1:SYS-SIGNAL").await.unwrap();
        assert_eq!(a.registry().len(), 1);
        assert!(b.registry().is_empty());

        let shared = a.clone();
        assert_eq!(shared.registry().len(), 1);
    }
}
