//! Result aggregation and report output.
//!
//! Report shape:
//!
//! ```json
//! { "summary": { "total_images": 12, "successful_analyses": 11,
//!                "failed_analyses": 1, "success_rate": "91.7%",
//!                "analysis_timestamp": "2025-07-01T14:03:22.512Z" },
//!   "results": [ ... ] }
//! ```

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{AnalysisRecord, BatchReport, BatchSummary};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Percentage with one decimal place; `0.0%` when `total` is zero.
pub fn format_success_rate(successful: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", successful as f64 / total as f64 * 100.0)
}

pub fn summarize(records: &[AnalysisRecord]) -> BatchSummary {
    let total = records.len();
    let successful = records.iter().filter(|r| r.analysis_success).count();

    BatchSummary {
        total_images: total,
        successful_analyses: successful,
        failed_analyses: total - successful,
        success_rate: format_success_rate(successful, total),
        analysis_timestamp: Utc::now(),
    }
}

pub fn build_report(records: Vec<AnalysisRecord>) -> BatchReport {
    let summary = summarize(&records);
    tracing::info!(
        total = summary.total_images,
        successful = summary.successful_analyses,
        failed = summary.failed_analyses,
        success_rate = %summary.success_rate,
        "batch complete"
    );
    BatchReport { summary, results: records }
}

/// Writes the report as pretty-printed JSON, creating parent directories.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(write_err)?;

    tracing::info!(path = %path.display(), "report written");
    Ok(())
}
