// GWSA archive container: format, compression, reader and writer

pub mod compression;
pub mod constants;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;
