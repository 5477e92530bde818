// Data acquisition seam used while processing a tab

use std::collections::BTreeMap;

use crate::channels::Channel;
use crate::core::error::Result;
use crate::data::{DataStore, SegmentList};
use crate::models::{SegdbErrorPolicy, SummaryConfig};
use crate::state::SummaryState;
use crate::utils::literal::Literal;
use crate::BoxFuture;

/// FFT parameters handed to spectrogram and spectrum computations.
pub type FftParams = BTreeMap<String, Literal>;

/// Read the `[fft]` section, if any. Values are typed where they parse as
/// literals and kept as strings otherwise.
pub fn fft_params(config: &SummaryConfig) -> FftParams {
    config
        .section("fft")
        .map(|section| {
            section
                .items()
                .map(|(key, value)| (key.to_string(), Literal::parse_or_string(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// How bulk channel data is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    TimeSeries,
    StateVector,
}

/// Loads data for one state into the shared [`DataStore`].
///
/// Every method stores what it fetched in `data`; errors are returned
/// untouched to the tab being processed.
pub trait DataSource: Send + Sync {
    fn timeseries<'a>(
        &'a self,
        channels: &'a [Channel],
        state: &'a SummaryState,
        kind: SeriesKind,
        data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>>;

    fn spectrogram<'a>(
        &'a self,
        channel: &'a Channel,
        state: &'a SummaryState,
        fft: &'a FftParams,
        data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>>;

    fn spectrum<'a>(
        &'a self,
        channel: &'a Channel,
        state: &'a SummaryState,
        fft: &'a FftParams,
        data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>>;

    /// Query the segment database. `policy` is passed through so a source
    /// can tolerate partial failures itself.
    fn segments<'a>(
        &'a self,
        flags: &'a [String],
        state: &'a SummaryState,
        policy: SegdbErrorPolicy,
        data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>>;

    fn triggers<'a>(
        &'a self,
        etg: &'a str,
        channel: &'a Channel,
        active: &'a SegmentList,
        data: &'a DataStore,
    ) -> BoxFuture<'a, Result<()>>;
}
