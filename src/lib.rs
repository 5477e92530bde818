// gwsumm-core
// Channel resolution, data archiving and tab processing for summary pages

pub mod archive;
pub mod channels;
pub mod client;
pub mod core;
pub mod data;
pub mod models;
pub mod state;
pub mod tabs;
pub mod utils;

use std::future::Future;
use std::pin::Pin;

/// Boxed future used at trait seams and for recursive resolution.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export main types
pub use archive::{read_data_archive, write_data_archive, ArchiveContents, ArchiveCounts};
pub use channels::{Channel, ChannelRegistry, ChannelRequest, ChannelResolver, ChannelType};
pub use core::error::{Result, SummaryError};
pub use core::reader::ArchiveReader;
pub use core::writer::ArchiveWriter;
pub use models::{SummaryConfig, SummaryMode};
pub use state::{SummaryContext, SummaryState};
pub use tabs::{StateTab, SummaryPlot};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::constants::*;
        assert_eq!(MAGIC, b"GWSA");
        assert_eq!(RECORD_MAGIC, b"RECD");
        assert_eq!(INDEX_MAGIC, b"IDXT");
        assert_eq!(FOOTER_MAGIC, b"FTER");
    }
}
