//! Shared data types for the flood depth analyzer.
//!
//! `DepthAssessment` is the four-field payload the vision model returns;
//! `AnalysisRecord` wraps it with per-image metadata and is the unit of
//! output in the batch report. The error types for the per-attempt layer
//! (`ModelError`, `ParseError`) and the per-image layer
//! (`InvocationError`, `EncodingError`) live here so every stage of the
//! pipeline can name them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sentinel written to `model_used` when no model produced a record.
pub const MODEL_NONE: &str = "none";

// ---------------------------------------------------------------------------
// Depth bands and passability
// ---------------------------------------------------------------------------

/// Ordered water depth categories. `Unknown` only appears on failed records.
///
/// Band labels use an en-dash; the ASCII hyphen spelling and the spaced
/// `< 5` / `> 50` forms are accepted on input and normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepthRange {
    #[serde(rename = "<5", alias = "< 5")]
    Below5,
    #[serde(rename = "5–10", alias = "5-10")]
    From5To10,
    #[serde(rename = "10–15", alias = "10-15")]
    From10To15,
    #[serde(rename = "15–20", alias = "15-20")]
    From15To20,
    #[serde(rename = "20–25", alias = "20-25")]
    From20To25,
    #[serde(rename = "25–30", alias = "25-30")]
    From25To30,
    #[serde(rename = "30–35", alias = "30-35")]
    From30To35,
    #[serde(rename = "35–40", alias = "35-40")]
    From35To40,
    #[serde(rename = "40–50", alias = "40-50")]
    From40To50,
    #[serde(rename = ">50", alias = "> 50")]
    Above50,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DepthRange {
    /// All bands a successful analysis may report, shallowest first.
    pub const BANDS: [DepthRange; 10] = [
        DepthRange::Below5,
        DepthRange::From5To10,
        DepthRange::From10To15,
        DepthRange::From15To20,
        DepthRange::From20To25,
        DepthRange::From25To30,
        DepthRange::From30To35,
        DepthRange::From35To40,
        DepthRange::From40To50,
        DepthRange::Above50,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepthRange::Below5 => "<5",
            DepthRange::From5To10 => "5–10",
            DepthRange::From10To15 => "10–15",
            DepthRange::From15To20 => "15–20",
            DepthRange::From20To25 => "20–25",
            DepthRange::From25To30 => "25–30",
            DepthRange::From30To35 => "30–35",
            DepthRange::From35To40 => "35–40",
            DepthRange::From40To50 => "40–50",
            DepthRange::Above50 => ">50",
            DepthRange::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != DepthRange::Unknown
    }
}

impl std::fmt::Display for DepthRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sedan passability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Passability {
    Pass,
    Caution,
    Unsafe,
    Unknown,
}

impl Passability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Passability::Pass => "pass",
            Passability::Caution => "caution",
            Passability::Unsafe => "unsafe",
            Passability::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Passability::Unknown
    }
}

impl std::fmt::Display for Passability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Analysis payload and per-image record
// ---------------------------------------------------------------------------

/// The four content fields of one analysis, in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthAssessment {
    pub depth_cm_estimate: u32,
    pub depth_range: DepthRange,
    pub passability: Passability,
    pub justification: String,
}

/// One image's analysis outcome as written to the report.
///
/// Build with [`AnalysisRecord::success`] or [`AnalysisRecord::failure`];
/// those are the only shapes the report contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub filename: String,
    pub filepath: String,
    pub timestamp: DateTime<Utc>,
    pub model_used: String,
    pub analysis_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub depth_cm_estimate: Option<u32>,
    pub depth_range: DepthRange,
    pub passability: Passability,
    pub justification: String,
}

impl AnalysisRecord {
    pub fn success(image_path: &Path, model_used: &str, assessment: DepthAssessment) -> Self {
        Self {
            filename: file_name_of(image_path),
            filepath: image_path.display().to_string(),
            timestamp: Utc::now(),
            model_used: model_used.to_string(),
            analysis_success: true,
            error: None,
            depth_cm_estimate: Some(assessment.depth_cm_estimate),
            depth_range: assessment.depth_range,
            passability: assessment.passability,
            justification: assessment.justification,
        }
    }

    pub fn failure(image_path: &Path, error: &str) -> Self {
        Self {
            filename: file_name_of(image_path),
            filepath: image_path.display().to_string(),
            timestamp: Utc::now(),
            model_used: MODEL_NONE.to_string(),
            analysis_success: false,
            error: Some(error.to_string()),
            depth_cm_estimate: None,
            depth_range: DepthRange::Unknown,
            passability: Passability::Unknown,
            justification: format!("analysis failed: {}", error),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_images: usize,
    pub successful_analyses: usize,
    pub failed_analyses: usize,
    pub success_rate: String,
    pub analysis_timestamp: DateTime<Utc>,
}

/// The document written at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<AnalysisRecord>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to read an image for inline encoding.
#[derive(Debug, Error)]
#[error("image encoding failed for {}: {source}", path.display())]
pub struct EncodingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A single model attempt failed. Always recoverable: the invoker moves on
/// to the next model or round.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API returned empty content")]
    EmptyContent,

    #[error("unexpected response envelope: {0}")]
    Envelope(String),

    #[error("unparseable content: {0}")]
    Parse(#[from] ParseError),
}

/// Model content could not be turned into a `DepthAssessment`.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The original decode error of the full content.
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Decoded, but a field is outside its allowed set.
    #[error("invalid field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every model in every round failed.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("all models and retries failed ({attempts} attempts over {rounds} rounds)")]
    Exhausted { rounds: u32, attempts: usize },
}

/// Anything that turns one image into a failure record.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
