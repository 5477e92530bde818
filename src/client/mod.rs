// Remote channel-metadata lookup

pub mod cis;

pub use cis::{ChannelMetadata, ChannelQuery, CisClient, QueryError};
