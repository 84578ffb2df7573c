//! File-backed checkpoint store
//!
//! ## Layout
//!
//! ```text
//! {state-path}     # "12" - last flushed frontier index
//! {records-path}   # CSV snapshot, header = Record field names
//! ```
//!
//! Both files are written to a `.tmp` sibling first and renamed into place,
//! snapshot before index, so the index never points past the data written
//! alongside it.

use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::CheckpointState;
use crate::record::{Record, RECORD_FIELDS};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Checkpoint store writing an index file and a CSV snapshot
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    index_path: PathBuf,
    records_path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(index_path: impl Into<PathBuf>, records_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            records_path: records_path.into(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Reads the record snapshot, or an empty list if none was written
    pub fn read_snapshot(&self) -> CheckpointResult<Vec<Record>> {
        let file = match fs::File::open(&self.records_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::Reader::from_reader(file);
        let records = reader
            .deserialize::<Record>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Reads the whole checkpoint
    pub fn read_state(&self) -> CheckpointResult<CheckpointState> {
        Ok(CheckpointState {
            last_completed_index: self.load_resume_index()?,
            records: self.read_snapshot()?,
        })
    }

    fn write_snapshot(&self, records: &[Record]) -> CheckpointResult<()> {
        let tmp = temp_path(&self.records_path);
        ensure_parent(&tmp)?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)?;
            writer.write_record(RECORD_FIELDS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp, &self.records_path)?;
        Ok(())
    }

    fn write_index(&self, index: usize) -> CheckpointResult<()> {
        let tmp = temp_path(&self.index_path);
        ensure_parent(&tmp)?;

        {
            let mut file = fs::File::create(&tmp)?;
            write!(file, "{}", index)?;
            file.flush()?;
        }

        fs::rename(&tmp, &self.index_path)?;
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load_resume_index(&self) -> CheckpointResult<usize> {
        let content = match fs::read_to_string(&self.index_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        content
            .trim()
            .parse::<usize>()
            .map_err(|_| CheckpointError::CorruptIndex {
                path: self.index_path.clone(),
                content,
            })
    }

    fn flush(&mut self, index: usize, records: &[Record]) -> CheckpointResult<()> {
        self.write_snapshot(records)?;
        self.write_index(index)?;
        tracing::info!(
            "Checkpoint saved: index {}, {} records",
            index,
            records.len()
        );
        Ok(())
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        for path in [&self.index_path, &self.records_path] {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// `listings.csv` -> `listings.csv.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
