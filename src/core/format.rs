// Data structures for the GWSA archive format

use crate::core::error::{Result, SummaryError};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version: u8,
    pub compression: u8,
    pub created: f64,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub group_id: u16,
    pub raw_length: u32,
    pub compressed_length: u32,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub group_id: u16,
    pub offset: u64,
    pub key: String,
}

/// Encode a record payload: `u32` metadata length, JSON metadata, then the
/// samples as little-endian `f64`.
pub fn encode_payload<M: Serialize>(meta: &M, samples: &[f64]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(meta)?;
    let meta_len = u32::try_from(json.len())
        .map_err(|_| SummaryError::CorruptedData("metadata block too large".to_string()))?;

    let mut out = Vec::with_capacity(4 + json.len() + samples.len() * 8);
    out.extend_from_slice(&meta_len.to_le_bytes());
    out.extend_from_slice(&json);
    for value in samples {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

pub fn decode_payload<M: DeserializeOwned>(payload: &[u8]) -> Result<(M, Vec<f64>)> {
    if payload.len() < 4 {
        return Err(SummaryError::CorruptedData(format!(
            "payload of {} bytes has no metadata length",
            payload.len()
        )));
    }
    let meta_len = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let body = &payload[4..];
    if body.len() < meta_len {
        return Err(SummaryError::CorruptedData(format!(
            "metadata block truncated: expected {} bytes, got {}",
            meta_len,
            body.len()
        )));
    }

    let meta = serde_json::from_slice(&body[..meta_len])?;

    let raw = &body[meta_len..];
    if raw.len() % 8 != 0 {
        return Err(SummaryError::CorruptedData(format!(
            "sample block of {} bytes is not a whole number of f64 values",
            raw.len()
        )));
    }
    let samples = raw
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();

    Ok((meta, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Meta {
        name: String,
        epoch: f64,
    }

    #[test]
    fn test_payload_keeps_metadata_and_samples() {
        let meta = Meta {
            name: "L1:GDS-CALIB_STRAIN".to_string(),
            epoch: 1_000_000_000.0,
        };
        let payload = encode_payload(&meta, &[1.5, -2.0, 3.25]).unwrap();
        let (decoded, samples): (Meta, Vec<f64>) = decode_payload(&payload).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(samples, vec![1.5, -2.0, 3.25]);
    }

    #[test]
    fn test_truncated_sample_block() {
        let meta = Meta {
            name: "X".to_string(),
            epoch: 0.0,
        };
        let mut payload = encode_payload(&meta, &[1.0]).unwrap();
        payload.pop();
        let err = decode_payload::<Meta>(&payload).unwrap_err();
        assert!(matches!(err, SummaryError::CorruptedData(_)));
    }
}
