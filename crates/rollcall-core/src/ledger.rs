//! Attendance log: an append-only `Name,Time` CSV file.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header row written to a fresh log.
pub const HEADER: [&str; 2] = ["Name", "Time"];

/// Time-of-day format used in the `Time` column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("attendance log {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("attendance log {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
}

/// One attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Time")]
    pub time: String,
}

impl AttendanceRecord {
    pub fn new(name: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            time: time.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Open handle to the attendance log. Rows are flushed as they are appended.
pub struct AttendanceLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl AttendanceLog {
    /// Open `path` for appending, creating it with only the header row if absent.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };
        let csv_err = |source| LedgerError::Csv {
            path: path.to_path_buf(),
            source,
        };

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            let mut fresh = csv::Writer::from_path(path).map_err(csv_err)?;
            fresh.write_record(HEADER).map_err(csv_err)?;
            fresh.flush().map_err(io_err)?;
            tracing::info!(path = %path.display(), "created attendance log");
        }

        let mut file = OpenOptions::new().append(true).open(path).map_err(io_err)?;
        if !ends_with_newline(path).map_err(io_err)? {
            tracing::debug!(path = %path.display(), "terminating unfinished last line");
            file.write_all(b"\n").map_err(io_err)?;
        }
        let writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Append one row without touching existing rows.
    pub fn append(&mut self, record: &AttendanceRecord) -> Result<(), LedgerError> {
        self.writer.serialize(record).map_err(|source| LedgerError::Csv {
            path: self.path.clone(),
            source,
        })?;
        self.writer.flush().map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(name = %record.name, time = %record.time, "attendance recorded");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// True if `path` is empty or its last byte is a line feed.
fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read every data row of an attendance log.
pub fn read_records(path: &Path) -> Result<Vec<AttendanceRecord>, LedgerError> {
    let csv_err = |source| LedgerError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<AttendanceRecord>, _>>()
        .map_err(csv_err)
}
