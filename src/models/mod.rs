// Serde configuration models

pub mod mode;
pub mod summary_config;

pub use mode::SummaryMode;
pub use summary_config::{
    ArchiveConfig, ChannelConfig, ConfigSection, PlotConfig, SegdbErrorPolicy, SummaryConfig,
};
