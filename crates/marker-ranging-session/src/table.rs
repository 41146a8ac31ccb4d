//! Sample tables and their CSV log files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use marker_ranging_core::SampleAccumulator;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("failed to write sample log: {0}")]
    Io(#[from] std::io::Error),
    #[error("system clock is before the unix epoch")]
    Clock(#[from] std::time::SystemTimeError),
}

/// Named columns of raw samples. Columns have equal length; entries that
/// were never filled read 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl SampleTable {
    /// Table with one column per accumulator, `capacity` rows each.
    pub fn from_accumulators(columns: &[(&str, &SampleAccumulator)]) -> Self {
        let len = columns
            .iter()
            .map(|(_, acc)| acc.capacity())
            .max()
            .unwrap_or(0);
        let rows = (0..len)
            .map(|i| {
                columns
                    .iter()
                    .map(|(_, acc)| acc.samples().get(i).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();
        Self {
            columns: columns.iter().map(|(name, _)| name.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Header row followed by one line per row, comma separated.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        if !self.columns.is_empty() {
            writeln!(out, "{}", self.columns.join(","))?;
        }
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", line.join(","))?;
        }
        out.flush()
    }
}

/// Writes sample tables to `<dir>/<prefix>_<unix millis>.csv`.
#[derive(Clone, Debug)]
pub struct CsvSampleLog {
    dir: PathBuf,
    prefix: String,
}

impl CsvSampleLog {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, unix_millis: u128) -> String {
        format!("{}_{}.csv", self.prefix, unix_millis)
    }

    /// Write `table` to a fresh timestamped file and return its path.
    pub fn write(&self, table: &SampleTable) -> Result<PathBuf, LogError> {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let path = self.dir.join(self.file_name(millis));
        let file = File::create(&path)?;
        table.write_csv(BufWriter::new(file))?;
        log::info!("sample log written to {}", path.display());
        Ok(path)
    }
}
