// GWSA archive reader

use crate::core::compression::decompress;
use crate::core::constants::*;
use crate::core::error::{Result, SummaryError};
use crate::core::format::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub struct ArchiveReader {
    path: PathBuf,
    file: Mutex<BufReader<File>>,
    header: FileHeader,
    index: HashMap<u16, Vec<IndexEntry>>,
}

impl ArchiveReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = BufReader::new(File::open(&path)?);

        let header = Self::read_header(&mut file)?;
        let index = Self::read_footer_and_index(&mut file)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            header,
            index,
        })
    }

    fn read_header<R: Read>(file: &mut R) -> Result<FileHeader> {
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        file.read_exact(&mut prefix)?;

        let magic = &prefix[0..4];
        if magic != MAGIC {
            return Err(SummaryError::InvalidMagic {
                expected: MAGIC.to_vec(),
                got: magic.to_vec(),
            });
        }

        let version = prefix[4];
        if version != FORMAT_VERSION {
            return Err(SummaryError::UnsupportedVersion(version));
        }
        let compression = prefix[5];
        let created = f64::from_le_bytes(le_array(&prefix[6..14]));
        let group_count = u16::from_le_bytes(le_array(&prefix[14..16]));

        let mut groups = Vec::with_capacity(group_count as usize);
        for _ in 0..group_count {
            groups.push(read_string(file)?);
        }

        Ok(FileHeader {
            version,
            compression,
            created,
            groups,
        })
    }

    fn read_footer_and_index<R: Read + Seek>(
        file: &mut R,
    ) -> Result<HashMap<u16, Vec<IndexEntry>>> {
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;

        let mut footer = [0u8; FOOTER_SIZE];
        file.read_exact(&mut footer)?;

        let footer_magic = &footer[0..4];
        if footer_magic != FOOTER_MAGIC {
            return Err(SummaryError::InvalidMagic {
                expected: FOOTER_MAGIC.to_vec(),
                got: footer_magic.to_vec(),
            });
        }

        let index_offset = u64::from_le_bytes(le_array(&footer[4..12]));
        file.seek(SeekFrom::Start(index_offset))?;

        let mut index_magic = [0u8; 4];
        file.read_exact(&mut index_magic)?;
        if &index_magic != INDEX_MAGIC {
            return Err(SummaryError::InvalidMagic {
                expected: INDEX_MAGIC.to_vec(),
                got: index_magic.to_vec(),
            });
        }

        let mut count_buf = [0u8; 4];
        file.read_exact(&mut count_buf)?;
        let entry_count = u32::from_le_bytes(count_buf);

        let mut index: HashMap<u16, Vec<IndexEntry>> = HashMap::new();
        for _ in 0..entry_count {
            let mut entry_buf = [0u8; INDEX_ENTRY_PREFIX_SIZE];
            file.read_exact(&mut entry_buf)?;

            let group_id = u16::from_le_bytes(le_array(&entry_buf[0..2]));
            let offset = u64::from_le_bytes(le_array(&entry_buf[2..10]));
            let key = read_string(file)?;

            index.entry(group_id).or_default().push(IndexEntry {
                group_id,
                offset,
                key,
            });
        }

        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation time of the archive, in UNIX seconds.
    pub fn created(&self) -> f64 {
        self.header.created
    }

    pub fn groups(&self) -> &[String] {
        &self.header.groups
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.group_id(name).is_some()
    }

    fn group_id(&self, name: &str) -> Option<u16> {
        self.header
            .groups
            .iter()
            .position(|g| g == name)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Record keys stored under `group`, in write order. An absent group has no keys.
    pub fn keys(&self, group: &str) -> Vec<&str> {
        self.group_id(group)
            .and_then(|id| self.index.get(&id))
            .map(|entries| entries.iter().map(|e| e.key.as_str()).collect())
            .unwrap_or_default()
    }

    /// Decompressed payloads of every record in `group`, keyed by record name.
    pub fn read_group(&self, group: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let Some(entries) = self.group_id(group).and_then(|id| self.index.get(&id)) else {
            return Ok(Vec::new());
        };

        let compression = CompressionType::from_u8(self.header.compression)
            .ok_or(SummaryError::UnsupportedCompression(self.header.compression))?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let (header, payload) = self.read_record_at(entry.offset, compression)?;
            if header.key != entry.key || header.group_id != entry.group_id {
                return Err(SummaryError::CorruptedData(format!(
                    "index entry '{}' points at record '{}'",
                    entry.key, header.key
                )));
            }
            records.push((header.key, payload));
        }
        Ok(records)
    }

    fn read_record_at(
        &self,
        offset: u64,
        compression: CompressionType,
    ) -> Result<(RecordHeader, Vec<u8>)> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        file.seek(SeekFrom::Start(offset))?;

        let mut record_magic = [0u8; 4];
        file.read_exact(&mut record_magic)?;
        if &record_magic != RECORD_MAGIC {
            return Err(SummaryError::CorruptedData("Invalid record magic".to_string()));
        }

        let mut header_buf = [0u8; RECORD_HEADER_SIZE];
        file.read_exact(&mut header_buf)?;

        let group_id = u16::from_le_bytes(le_array(&header_buf[0..2]));
        let raw_length = u32::from_le_bytes(le_array(&header_buf[2..6]));
        let compressed_length = u32::from_le_bytes(le_array(&header_buf[6..10]));
        let key = read_string(&mut *file)?;

        let mut compressed_data = vec![0u8; compressed_length as usize];
        file.read_exact(&mut compressed_data)?;

        let raw_data = decompress(&compressed_data, compression)?;
        if raw_data.len() != raw_length as usize {
            return Err(SummaryError::CorruptedData(format!(
                "Expected {} bytes, got {}",
                raw_length,
                raw_data.len()
            )));
        }

        Ok((
            RecordHeader {
                group_id,
                raw_length,
                compressed_length,
                key,
            },
            raw_data,
        ))
    }
}

fn read_string<R: Read>(file: &mut R) -> Result<String> {
    let mut len_buf = [0u8; 2];
    file.read_exact(&mut len_buf)?;
    let len = u16::from_le_bytes(len_buf) as usize;

    let mut str_buf = vec![0u8; len];
    file.read_exact(&mut str_buf)?;

    String::from_utf8(str_buf).map_err(|e| e.into())
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
