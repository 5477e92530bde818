// Plot descriptors, factories by type, and the queue for off-thread rendering

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::channels::Channel;
use crate::core::error::{Result, SummaryError};
use crate::data::DataStore;
use crate::models::SummaryConfig;
use crate::utils::literal::Literal;

/// One plot of a tab. Rendering itself lives behind [`SummaryPlot::process`].
pub trait SummaryPlot: Send + Sync + fmt::Debug {
    fn plot_type(&self) -> &str;

    fn channels(&self) -> &[Channel] {
        &[]
    }

    /// Flag expressions, e.g. `L1:DMT-ANALYSIS_READY:1&!L1:DMT-INJECTION:1`.
    fn flags(&self) -> &[String] {
        &[]
    }

    /// Event trigger generator, for trigger plots.
    fn etg(&self) -> Option<&str> {
        None
    }

    /// Name of the state this plot belongs to; `None` for every state.
    fn state(&self) -> Option<&str>;

    fn output_file(&self) -> &Path;

    /// Whether the plot may be rendered off the processing task.
    fn is_threadsafe(&self) -> bool {
        true
    }

    fn process(&self, data: &DataStore) -> Result<()>;
}

/// A plot with its per-run `new` marker.
#[derive(Debug, Clone)]
pub struct PlotEntry {
    pub plot: Arc<dyn SummaryPlot>,
    pub new: bool,
}

impl PlotEntry {
    pub fn new(plot: Arc<dyn SummaryPlot>) -> Self {
        Self { plot, new: true }
    }

    /// True when the plot should be drawn for `state`.
    pub fn applies_to(&self, state: Option<&str>) -> bool {
        match (state, self.plot.state()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(own)) => wanted == own,
        }
    }
}

/// What the sources of a plot definition name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Channels,
    Flags,
}

/// Everything a factory needs to build one plot.
#[derive(Debug, Clone)]
pub struct PlotDefinition {
    pub plot_type: String,
    pub channels: Vec<Channel>,
    pub flags: Vec<String>,
    pub start: f64,
    pub end: f64,
    pub state: Option<String>,
    pub outdir: PathBuf,
    pub options: BTreeMap<String, Literal>,
}

impl PlotDefinition {
    pub fn option(&self, key: &str) -> Option<&Literal> {
        self.options.get(key)
    }

    pub fn etg(&self) -> Option<&str> {
        self.option("etg").and_then(Literal::as_str)
    }
}

pub type PlotFactory = Arc<dyn Fn(PlotDefinition) -> Result<Arc<dyn SummaryPlot>> + Send + Sync>;

/// Plot factories keyed by plot type.
#[derive(Clone, Default)]
pub struct PlotRegistry {
    factories: BTreeMap<String, (SourceKind, PlotFactory)>,
}

impl fmt::Debug for PlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl PlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `plot_type`, replacing any previous one.
    pub fn register<F>(&mut self, plot_type: impl Into<String>, sources: SourceKind, factory: F)
    where
        F: Fn(PlotDefinition) -> Result<Arc<dyn SummaryPlot>> + Send + Sync + 'static,
    {
        self.factories.insert(plot_type.into(), (sources, Arc::new(factory)));
    }

    pub fn source_kind(&self, plot_type: &str) -> Result<SourceKind> {
        self.factories
            .get(plot_type)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| SummaryError::UnknownPlotType(plot_type.to_string()))
    }

    pub fn build(&self, definition: PlotDefinition) -> Result<Arc<dyn SummaryPlot>> {
        let (_, factory) = self
            .factories
            .get(&definition.plot_type)
            .ok_or_else(|| SummaryError::UnknownPlotType(definition.plot_type.clone()))?;
        factory(definition)
    }
}

/// Renders thread-safe plots on the blocking pool.
///
/// Dispatch returns immediately after a short pause; [`PlotQueue::join`]
/// is the point after which every queued output file exists.
#[derive(Debug)]
pub struct PlotQueue {
    data: Arc<DataStore>,
    delay: Duration,
    pending: Mutex<Vec<(PathBuf, JoinHandle<Result<()>>)>>,
}

impl PlotQueue {
    pub fn new(data: Arc<DataStore>, delay: Duration) -> Self {
        Self {
            data,
            delay,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queue pausing for `plots.dispatch_delay_ms` after each dispatch.
    pub fn from_config(config: &SummaryConfig, data: Arc<DataStore>) -> Self {
        Self::new(data, config.plots.dispatch_delay())
    }

    pub async fn dispatch(&self, plot: Arc<dyn SummaryPlot>) {
        let output = plot.output_file().to_path_buf();
        let data = Arc::clone(&self.data);
        let handle = tokio::task::spawn_blocking(move || plot.process(&data));
        debug!("Queued {}", output.display());
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((output, handle));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Number of plots queued and not yet joined.
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every queued plot. All plots are awaited even after a
    /// failure; the first failure is returned.
    pub async fn join(&self) -> Result<usize> {
        let pending = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = pending.len();
        let mut first_error = None;

        for (output, handle) in pending {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SummaryError::from(e)),
            };
            if let Err(e) = outcome {
                error!("Plot {} failed: {}", output.display(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("{} queued plots written", count);
                Ok(count)
            }
        }
    }
}
