// Format constants for the GWSA data archive

use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 4] = b"GWSA";
pub const RECORD_MAGIC: &[u8; 4] = b"RECD";
pub const INDEX_MAGIC: &[u8; 4] = b"IDXT";
pub const FOOTER_MAGIC: &[u8; 4] = b"FTER";

pub const FORMAT_VERSION: u8 = 1;

// Group names
pub const TIMESERIES_GROUP: &str = "timeseries";
pub const SPECTROGRAM_GROUP: &str = "spectrogram";
pub const SEGMENTS_GROUP: &str = "segments";

// Compression codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    None = 0,
    Zlib = 1,
    Lz4 = 2,
    #[default]
    Zstd = 3,
}

impl CompressionType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Zlib),
            2 => Some(CompressionType::Lz4),
            3 => Some(CompressionType::Zstd),
            _ => None,
        }
    }
}

// Header prefix: MAGIC(4) version(u8) comp(u8) created(f64) group_count(u16)
pub const HEADER_PREFIX_SIZE: usize = 4 + 1 + 1 + 8 + 2; // 16 bytes

// Record header: group_id(u16) raw_len(u32) comp_len(u32), followed by the key string
pub const RECORD_HEADER_SIZE: usize = 2 + 4 + 4; // 10 bytes

// Index entry prefix: group_id(u16) offset(u64), followed by the key string
pub const INDEX_ENTRY_PREFIX_SIZE: usize = 2 + 8; // 10 bytes

// Footer: FOOTER_MAGIC(4) index_offset(u64)
pub const FOOTER_SIZE: usize = 4 + 8; // 12 bytes
