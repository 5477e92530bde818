// Archiving of run data to and from a GWSA file

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channels::ChannelResolver;
use crate::core::constants::*;
use crate::core::error::Result;
use crate::core::format::{decode_payload, encode_payload};
use crate::core::reader::ArchiveReader;
use crate::core::writer::ArchiveWriter;
use crate::data::{DataQualityFlag, DataStore, Spectrogram, TimeSeries};

/// Which collections to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveContents {
    pub timeseries: bool,
    pub spectrogram: bool,
    pub segments: bool,
}

impl Default for ArchiveContents {
    fn default() -> Self {
        Self {
            timeseries: true,
            spectrogram: true,
            segments: true,
        }
    }
}

/// Number of records restored by [`read_data_archive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveCounts {
    pub timeseries: usize,
    pub spectrograms: usize,
    pub flags: usize,
}

/// Write the selected collections of `data` to `path`.
///
/// An existing file at `path` is moved aside first and put back if the
/// write fails.
pub fn write_data_archive<P: AsRef<Path>>(
    data: &DataStore,
    path: P,
    contents: ArchiveContents,
    compression: CompressionType,
) -> Result<()> {
    let path = path.as_ref();
    with_backup(path, |target| write_contents(data, target, contents, compression))?;
    info!("Archive written to {}", path.display());
    Ok(())
}

fn write_contents(
    data: &DataStore,
    path: &Path,
    contents: ArchiveContents,
    compression: CompressionType,
) -> Result<()> {
    let mut groups = Vec::new();
    if contents.timeseries {
        groups.push(TIMESERIES_GROUP);
    }
    if contents.spectrogram {
        groups.push(SPECTROGRAM_GROUP);
    }
    if contents.segments {
        groups.push(SEGMENTS_GROUP);
    }

    let mut writer = ArchiveWriter::create(path, compression, &groups)?;

    if contents.timeseries {
        for ts in data.all_timeseries() {
            let payload = encode_payload(&ts, &ts.values)?;
            writer.write_record(TIMESERIES_GROUP, &ts.archive_key(), &payload)?;
        }
    }
    if contents.spectrogram {
        for spec in data.all_spectrograms() {
            let payload = encode_payload(&spec, &spec.values)?;
            writer.write_record(SPECTROGRAM_GROUP, &spec.archive_key(), &payload)?;
        }
    }
    if contents.segments {
        for flag in data.all_flags() {
            writer.write_record(SEGMENTS_GROUP, &flag.name, &encode_payload(&flag, &[])?)?;
        }
    }

    writer.finish()
}

/// Restore every collection stored in `path` into `data`.
///
/// Absent groups are skipped. Each stored channel is resolved by identity
/// so the registry holds it before its data is inserted.
pub async fn read_data_archive<P: AsRef<Path>>(
    resolver: &ChannelResolver,
    data: &DataStore,
    path: P,
) -> Result<ArchiveCounts> {
    let reader = ArchiveReader::open(path.as_ref())?;
    let mut counts = ArchiveCounts::default();

    for group in [TIMESERIES_GROUP, SPECTROGRAM_GROUP, SEGMENTS_GROUP] {
        if reader.has_group(group) {
            debug!("{} records in '{}'", reader.keys(group).len(), group);
        } else {
            debug!("No '{}' group in {}", group, reader.path().display());
        }
    }

    for (key, payload) in reader.read_group(TIMESERIES_GROUP)? {
        let (mut ts, values): (TimeSeries, Vec<f64>) = decode_payload(&payload)?;
        ts.values = values;
        ts.channel = resolver.adopt(ts.channel).await?;
        debug!("Restored time-series {}", key);
        let ndsname = ts.channel.ndsname();
        data.add_timeseries(ts, Some(&ndsname));
        counts.timeseries += 1;
    }

    for (key, payload) in reader.read_group(SPECTROGRAM_GROUP)? {
        let (mut spec, values): (Spectrogram, Vec<f64>) = decode_payload(&payload)?;
        spec.values = values;
        spec.channel = resolver.adopt(spec.channel).await?;
        debug!("Restored spectrogram {}", key);
        data.add_spectrogram(spec, None);
        counts.spectrograms += 1;
    }

    for (_, payload) in reader.read_group(SEGMENTS_GROUP)? {
        let (flag, _): (DataQualityFlag, Vec<f64>) = decode_payload(&payload)?;
        data.insert_segments(flag);
        counts.flags += 1;
    }

    info!(
        "Read {} time-series, {} spectrograms and {} flags from {}",
        counts.timeseries,
        counts.spectrograms,
        counts.flags,
        reader.path().display()
    );
    Ok(counts)
}

/// Move an existing archive to a unique sibling path. Returns `None` when
/// there was nothing to move.
pub fn backup_existing_archive(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let backup = path.with_file_name(format!(".{}.{}.bak", file_name, Uuid::new_v4().simple()));
    match fs::rename(path, &backup) {
        Ok(()) => {
            debug!("Backed up {} to {}", path.display(), backup.display());
            Some(backup)
        }
        Err(e) => {
            debug!("No backup of {}: {}", path.display(), e);
            None
        }
    }
}

pub fn restore_backup(backup: &Path, target: &Path) -> Result<()> {
    fs::rename(backup, target)?;
    Ok(())
}

fn with_backup<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let backup = backup_existing_archive(path);

    match write(path) {
        Ok(()) => {
            if let Some(backup) = backup {
                if let Err(e) = fs::remove_file(&backup) {
                    warn!("Failed to remove archive backup {}: {}", backup.display(), e);
                }
            }
            Ok(())
        }
        Err(e) => {
            if let Some(backup) = backup {
                match restore_backup(&backup, path) {
                    Ok(()) => warn!("Archive write failed, restored {}", path.display()),
                    Err(re) => error!(
                        "Failed to restore archive backup {}: {}",
                        backup.display(),
                        re
                    ),
                }
            }
            Err(e)
        }
    }
}
