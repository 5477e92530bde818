// Recording plot and data source used by the tab tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::plots::{PlotDefinition, SummaryPlot};
use super::source::{DataSource, FftParams, SeriesKind};
use crate::channels::Channel;
use crate::core::error::{Result, SummaryError};
use crate::data::{DataStore, SegmentList};
use crate::models::SegdbErrorPolicy;
use crate::state::SummaryState;
use crate::BoxFuture;

#[derive(Debug)]
pub struct TestPlot {
    pub definition: PlotDefinition,
    output: PathBuf,
    fail: bool,
    rendered: Arc<AtomicUsize>,
    log: Option<Arc<Mutex<Vec<PathBuf>>>>,
}

impl TestPlot {
    fn build(
        definition: PlotDefinition,
        fail: bool,
        log: Option<Arc<Mutex<Vec<PathBuf>>>>,
    ) -> Arc<TestPlot> {
        let subject = definition
            .channels
            .first()
            .map(|c| c.name.clone())
            .or_else(|| definition.flags.first().cloned())
            .unwrap_or_default()
            .replace([':', ' ', ','], "-");
        let state = definition.state.clone().unwrap_or_else(|| "ALL".to_string());
        let output = definition.outdir.join(format!(
            "{}-{}-{}.png",
            state,
            definition.plot_type.to_uppercase(),
            subject
        ));
        Arc::new(TestPlot {
            definition,
            output,
            fail,
            rendered: Arc::new(AtomicUsize::new(0)),
            log,
        })
    }

    pub fn from_definition(definition: PlotDefinition) -> Arc<TestPlot> {
        Self::build(definition, false, None)
    }

    pub fn failing(definition: PlotDefinition) -> Arc<TestPlot> {
        Self::build(definition, true, None)
    }

    /// Plot that appends its output path to `log` when processed.
    pub fn logged(definition: PlotDefinition, log: Arc<Mutex<Vec<PathBuf>>>) -> Arc<TestPlot> {
        Self::build(definition, false, Some(log))
    }

    pub fn rendered(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.rendered)
    }
}

impl SummaryPlot for TestPlot {
    fn plot_type(&self) -> &str {
        &self.definition.plot_type
    }

    fn channels(&self) -> &[Channel] {
        &self.definition.channels
    }

    fn flags(&self) -> &[String] {
        &self.definition.flags
    }

    fn etg(&self) -> Option<&str> {
        self.definition.etg()
    }

    fn state(&self) -> Option<&str> {
        self.definition.state.as_deref()
    }

    fn output_file(&self) -> &Path {
        &self.output
    }

    fn is_threadsafe(&self) -> bool {
        self.definition
            .option("threadsafe")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    fn process(&self, _data: &DataStore) -> Result<()> {
        if self.fail {
            return Err(SummaryError::Plot(format!("cannot draw {}", self.output.display())));
        }
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.output.clone());
        }
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_factory(definition: PlotDefinition) -> Result<Arc<dyn SummaryPlot>> {
    Ok(TestPlot::from_definition(definition))
}

/// Data source that records each acquisition call.
#[derive(Debug, Default)]
pub struct MockSource {
    calls: Mutex<Vec<String>>,
    fail_timeseries: bool,
    fail_segments: bool,
}

impl MockSource {
    pub fn failing_timeseries() -> Self {
        Self {
            fail_timeseries: true,
            ..Default::default()
        }
    }

    pub fn failing_segments() -> Self {
        Self {
            fail_segments: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn names(channels: &[Channel]) -> String {
    channels.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",")
}

impl DataSource for MockSource {
    fn timeseries<'a>(
        &'a self,
        channels: &'a [Channel],
        _state: &'a SummaryState,
        kind: SeriesKind,
        _data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let label = match kind {
                SeriesKind::TimeSeries => "timeseries",
                SeriesKind::StateVector => "statevector",
            };
            self.record(format!("{}:{}", label, names(channels)));
            if self.fail_timeseries {
                return Err(SummaryError::Acquisition("frames unavailable".to_string()));
            }
            Ok(())
        })
    }

    fn spectrogram<'a>(
        &'a self,
        channel: &'a Channel,
        _state: &'a SummaryState,
        fft: &'a FftParams,
        _data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("spectrogram:{}:{}", channel.name, fft.len()));
            Ok(())
        })
    }

    fn spectrum<'a>(
        &'a self,
        channel: &'a Channel,
        _state: &'a SummaryState,
        fft: &'a FftParams,
        _data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("spectrum:{}:{}", channel.name, fft.len()));
            Ok(())
        })
    }

    fn segments<'a>(
        &'a self,
        flags: &'a [String],
        _state: &'a SummaryState,
        _policy: SegdbErrorPolicy,
        _data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("segments:{}", flags.join(",")));
            if self.fail_segments {
                return Err(SummaryError::Acquisition(
                    "segment database unreachable".to_string(),
                ));
            }
            Ok(())
        })
    }

    fn triggers<'a>(
        &'a self,
        etg: &'a str,
        channel: &'a Channel,
        _active: &'a SegmentList,
        _data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("triggers:{}:{}", etg, channel.name));
            Ok(())
        })
    }
}
