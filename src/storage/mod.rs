//! Local filesystem layout and result sinks.
//!
//! - Raw page cache (under the data directory)
//! - Per-run reports, pipe-delimited or JSON Lines (under the output directory)

pub mod jsonl;
pub mod report;

pub use jsonl::{JsonlReader, JsonlWriter};
pub use report::{format_record, header_line, report_file_name, ReportFormat, ReportWriter, REPORT_HEADERS};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown report format: {0}")]
    UnknownFormat(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            data_dir,
            output_dir,
        }
    }

    /// Cached page bodies.
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"), PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"), PathBuf::from("/reports"));

        assert_eq!(config.raw_dir(), PathBuf::from("/data/raw"));
        assert_eq!(config.reports_dir(), PathBuf::from("/reports"));
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.raw_dir(), PathBuf::from("./data/raw"));
        assert_eq!(config.reports_dir(), PathBuf::from("."));
    }
}
