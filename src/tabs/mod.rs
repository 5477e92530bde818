// Tabs: plot definitions, per-state data acquisition and summary tables

pub mod builtin;
pub mod plots;
pub mod source;
pub mod summary;
#[cfg(test)]
pub(crate) mod testing;

pub use builtin::{parse_layout, ProcessOptions, ProcessReport, StateTab};
pub use plots::{PlotDefinition, PlotEntry, PlotQueue, PlotRegistry, SourceKind, SummaryPlot};
pub use source::{fft_params, DataSource, FftParams, SeriesKind};
pub use summary::{channel_info, flag_info, ChannelInfoRow, FlagInfoRow};
