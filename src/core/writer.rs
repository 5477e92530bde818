// GWSA archive writer

use crate::core::compression::compress;
use crate::core::constants::*;
use crate::core::error::{Result, SummaryError};
use crate::core::format::IndexEntry;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ArchiveWriter {
    file: BufWriter<File>,
    compression: CompressionType,
    groups: Vec<String>,
    index: Vec<IndexEntry>,
    offset: u64,
}

impl ArchiveWriter {
    /// Create `path` and write the header declaring `groups`. Groups are
    /// declared up front so an empty group still exists in the archive.
    pub fn create<P: AsRef<Path>>(
        path: P,
        compression: CompressionType,
        groups: &[&str],
    ) -> Result<Self> {
        let file = BufWriter::new(File::create(path.as_ref())?);
        let group_count = u16::try_from(groups.len()).map_err(|_| {
            SummaryError::CorruptedData(format!("too many groups: {}", groups.len()))
        })?;

        let mut writer = Self {
            file,
            compression,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            index: Vec::new(),
            offset: 0,
        };

        let created = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        writer.write_bytes(MAGIC)?;
        writer.write_bytes(&[FORMAT_VERSION, compression as u8])?;
        writer.write_bytes(&created.to_le_bytes())?;
        writer.write_bytes(&group_count.to_le_bytes())?;
        for group in groups {
            writer.write_string(group)?;
        }

        Ok(writer)
    }

    pub fn write_record(&mut self, group: &str, key: &str, payload: &[u8]) -> Result<()> {
        let group_id = self
            .groups
            .iter()
            .position(|g| g == group)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| SummaryError::CorruptedData(format!("undeclared group '{}'", group)))?;

        let raw_length = u32::try_from(payload.len())
            .map_err(|_| SummaryError::CorruptedData(format!("record '{}' too large", key)))?;
        let compressed = compress(payload, self.compression)?;
        let compressed_length = u32::try_from(compressed.len())
            .map_err(|_| SummaryError::CorruptedData(format!("record '{}' too large", key)))?;

        let offset = self.offset;
        self.write_bytes(RECORD_MAGIC)?;
        self.write_bytes(&group_id.to_le_bytes())?;
        self.write_bytes(&raw_length.to_le_bytes())?;
        self.write_bytes(&compressed_length.to_le_bytes())?;
        self.write_string(key)?;
        self.write_bytes(&compressed)?;

        self.index.push(IndexEntry {
            group_id,
            offset,
            key: key.to_string(),
        });
        Ok(())
    }

    /// Write the index and footer, and flush everything to disk.
    pub fn finish(mut self) -> Result<()> {
        let index_offset = self.offset;
        let entry_count = u32::try_from(self.index.len())
            .map_err(|_| SummaryError::CorruptedData("too many records".to_string()))?;

        self.write_bytes(INDEX_MAGIC)?;
        self.write_bytes(&entry_count.to_le_bytes())?;
        let index = std::mem::take(&mut self.index);
        for entry in &index {
            self.write_bytes(&entry.group_id.to_le_bytes())?;
            self.write_bytes(&entry.offset.to_le_bytes())?;
            self.write_string(&entry.key)?;
        }

        self.write_bytes(FOOTER_MAGIC)?;
        self.write_bytes(&index_offset.to_le_bytes())?;

        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| {
            SummaryError::CorruptedData(format!("string too long: {} bytes", value.len()))
        })?;
        self.write_bytes(&len.to_le_bytes())?;
        self.write_bytes(value.as_bytes())
    }
}
