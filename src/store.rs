//! Per-day append-only pollution logs.
//!
//! One UTF-8 text file per local calendar day, named
//! `pollution_<YYYY-MM-DD>.txt`, under an `AirPollutionData` subdirectory of
//! the configured data directory. Files are opened, appended, and closed per
//! call; nothing is held open across ticks.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use crate::models::Sample;

const DATA_SUBDIR: &str = "AirPollutionData";
const FILE_PREFIX: &str = "pollution_";
const FILE_SUFFIX: &str = ".txt";

/// A day log handed off to an external share facility.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub path: PathBuf,
    pub caption: String,
}

/// Append-only store of pollution samples, one text file per calendar day.
#[derive(Debug, Clone)]
pub struct LogStore {
    root: PathBuf,
}

impl LogStore {
    /// `data_dir` is the application's document directory; day files live
    /// in its `AirPollutionData` subdirectory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into().join(DATA_SUBDIR),
        }
    }

    /// Path of the day file for `day_key`, whether or not it exists yet.
    pub fn day_file_path(&self, day_key: &str) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{day_key}{FILE_SUFFIX}"))
    }

    /// Appends one line for `sample` to the file of its calendar day.
    ///
    /// The data directory is created on first use; existing files are never
    /// truncated.
    pub fn append(&self, sample: &Sample) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.day_file_path(&sample.day_key());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", sample.to_log_line())?;

        debug!("appended sample to {}", path.display());
        Ok(())
    }

    /// Day keys derived from the files present, in directory-listing order.
    /// Callers must not assume the keys are sorted.
    pub fn list_days(&self) -> io::Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut days = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(day) = day_key_from_file_name(&name.to_string_lossy()) {
                days.push(day);
            }
        }
        Ok(days)
    }

    /// All samples recorded for `day_key`, in append order.
    ///
    /// Lines that do not parse as six `" | "`-delimited fields are dropped;
    /// a missing day file reads as empty.
    pub fn read_day(&self, day_key: &str) -> io::Result<Vec<Sample>> {
        let path = self.day_file_path(day_key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        Ok(contents.lines().filter_map(Sample::parse_log_line).collect())
    }

    /// Builds the share hand-off for a recorded day.
    ///
    /// Errors if no file exists for `day_key`: a share target must be a real
    /// path.
    pub fn export_day(&self, day_key: &str) -> io::Result<ShareRequest> {
        let path = self.day_file_path(day_key);
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no pollution log recorded for {day_key}"),
            ));
        }

        Ok(ShareRequest {
            path,
            caption: format!("Pollution data for {day_key}"),
        })
    }
}

fn day_key_from_file_name(name: &str) -> Option<String> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .map(str::to_string)
}
