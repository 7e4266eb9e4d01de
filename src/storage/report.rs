//! Per-run rank reports.
//!
//! One file per run, named `<username>_<YYYYMMDD>.<ext>`. The pipe format
//! writes a header line followed by one `|`-separated line per game.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use tracing::info;

use super::jsonl::JsonlWriter;
use super::StorageError;
use crate::models::{RankRecord, NOT_AVAILABLE};

/// Column labels of the pipe-delimited report, in field order.
pub const REPORT_HEADERS: [&str; 10] = [
    "Game",
    "Rank",
    "Plays",
    "Rank 1 Plays",
    "Rank 5 Plays",
    "Rank 10 Plays",
    "Rank 20 Plays",
    "Rank 100 Plays",
    "GHI",
    "Owned?",
];

/// Output format for a run's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Pipe,
    Jsonl,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pipe => "csv",
            ReportFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pipe" | "csv" => Ok(ReportFormat::Pipe),
            "jsonl" => Ok(ReportFormat::Jsonl),
            other => Err(StorageError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Pipe => write!(f, "pipe"),
            ReportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// `<username>_<YYYYMMDD>.<ext>`
pub fn report_file_name(username: &str, date: NaiveDate, format: ReportFormat) -> String {
    format!(
        "{}_{}.{}",
        username,
        date.format("%Y%m%d"),
        format.extension()
    )
}

pub fn header_line() -> String {
    REPORT_HEADERS.join("|")
}

/// One pipe-delimited report line.
pub fn format_record(record: &RankRecord) -> String {
    let mut fields = vec![
        record.game.clone(),
        record.rank.to_string(),
        record.plays.clone(),
    ];
    fields.extend(
        record
            .percentile_plays()
            .iter()
            .map(|plays| plays.unwrap_or(NOT_AVAILABLE).to_string()),
    );
    fields.push(record.ghi.to_string());
    fields.push(record.owned.to_string());

    fields.join("|")
}

/// Writes a run's records into the output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    format: ReportFormat,
    date: NaiveDate,
}

impl ReportWriter {
    /// Writer stamped with today's local date.
    pub fn new(output_dir: PathBuf, format: ReportFormat) -> Self {
        Self::with_date(output_dir, format, Local::now().date_naive())
    }

    pub fn with_date(output_dir: PathBuf, format: ReportFormat, date: NaiveDate) -> Self {
        Self {
            output_dir,
            format,
            date,
        }
    }

    pub fn path_for(&self, username: &str) -> PathBuf {
        self.output_dir
            .join(report_file_name(username, self.date, self.format))
    }

    /// Write `records` for `username`, replacing any earlier file of the
    /// same name. Returns the path written.
    pub fn write(&self, username: &str, records: &[RankRecord]) -> Result<PathBuf, StorageError> {
        let path = self.path_for(username);

        match self.format {
            ReportFormat::Pipe => write_pipe(&path, records)?,
            ReportFormat::Jsonl => {
                JsonlWriter::new(path.clone()).write_all(records)?;
            }
        }

        Ok(path)
    }
}

fn write_pipe(path: &Path, records: &[RankRecord]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", header_line())?;
    for record in records {
        writeln!(writer, "{}", format_record(record))?;
    }
    writer.flush()?;

    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
