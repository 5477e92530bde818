// Compression backend implementations

use crate::core::constants::CompressionType;
use crate::core::error::{Result, SummaryError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn compress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),

        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| SummaryError::CompressionFailed(format!("Zlib: {}", e)))?;
            encoder
                .finish()
                .map_err(|e| SummaryError::CompressionFailed(format!("Zlib: {}", e)))
        }

        #[cfg(feature = "lz4")]
        CompressionType::Lz4 => lz4::block::compress(data, None, true)
            .map_err(|e| SummaryError::CompressionFailed(format!("LZ4: {}", e))),

        #[cfg(not(feature = "lz4"))]
        CompressionType::Lz4 => Err(SummaryError::UnsupportedCompression(2)),

        #[cfg(feature = "zstd")]
        CompressionType::Zstd => zstd::encode_all(data, 0)
            .map_err(|e| SummaryError::CompressionFailed(format!("Zstd: {}", e))),

        #[cfg(not(feature = "zstd"))]
        CompressionType::Zstd => Err(SummaryError::UnsupportedCompression(3)),
    }
}

pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),

        CompressionType::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| SummaryError::DecompressionFailed(format!("Zlib: {}", e)))?;
            Ok(decompressed)
        }

        #[cfg(feature = "lz4")]
        CompressionType::Lz4 => lz4::block::decompress(data, None)
            .map_err(|e| SummaryError::DecompressionFailed(format!("LZ4: {}", e))),

        #[cfg(not(feature = "lz4"))]
        CompressionType::Lz4 => Err(SummaryError::UnsupportedCompression(2)),

        #[cfg(feature = "zstd")]
        CompressionType::Zstd => zstd::decode_all(data)
            .map_err(|e| SummaryError::DecompressionFailed(format!("Zstd: {}", e))),

        #[cfg(not(feature = "zstd"))]
        CompressionType::Zstd => Err(SummaryError::UnsupportedCompression(3)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passthrough() {
        let data = b"L1:GDS-CALIB_STRAIN";
        let packed = compress(data, CompressionType::None).unwrap();
        assert_eq!(packed, data);
        assert_eq!(decompress(&packed, CompressionType::None).unwrap(), data);
    }

    #[test]
    fn test_decompress_foreign_zlib() {
        let original = b"hello world";
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let decompressed = decompress(&compressed, CompressionType::Zlib).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_garbage_zlib_is_rejected() {
        let err = decompress(b"not zlib at all", CompressionType::Zlib).unwrap_err();
        assert!(matches!(err, SummaryError::DecompressionFailed(_)));
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_shrinks_repetitive_samples() {
        let samples: Vec<u8> = std::iter::repeat(0.5f64.to_le_bytes())
            .take(512)
            .flatten()
            .collect();
        let packed = compress(&samples, CompressionType::Zstd).unwrap();
        assert!(packed.len() < samples.len());
        assert_eq!(decompress(&packed, CompressionType::Zstd).unwrap(), samples);
    }
}
