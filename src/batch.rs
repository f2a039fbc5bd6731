//! Batch orchestration: one pass over an image directory.
//!
//! 1. Lists supported image files directly inside the input directory
//! 2. Orders them: numeric stems ascending, then the rest by name
//! 3. For each image, builds the few-shot prompt and runs the invoker
//! 4. Converts any per-image failure into a failure record and moves on
//! 5. Paces successive images to bound the outbound request rate
//!
//! Only a missing or unreadable input directory (or a failed report write
//! in `run_to_report`) stops the run.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::exemplars::ExemplarStore;
use crate::ingest::image::{encode_image, is_supported};
use crate::invoker::{Invocation, ModelInvoker};
use crate::model::{AnalysisRecord, BatchReport, ImageError};
use crate::prompt::build_messages;
use crate::report::{self, ReportError};

pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input directory does not exist: {}", .0.display())]
    MissingInputDir(PathBuf),

    #[error("failed to read input directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Report(#[from] ReportError),
}

// ---------------------------------------------------------------------------
// Discovery and ordering
// ---------------------------------------------------------------------------

/// Sort key: numeric stems first (by value), then everything else by
/// file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum OrderKey {
    Numeric(i64),
    Named(String),
}

fn order_key(path: &Path) -> OrderKey {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    match stem.parse::<i64>() {
        Ok(n) => OrderKey::Numeric(n),
        Err(_) => OrderKey::Named(file_name(path)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Orders image paths for processing. Ties on a numeric stem (`2.jpg`,
/// `2.png`) fall back to the file name.
pub fn sort_images(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| match order_key(a).cmp(&order_key(b)) {
        Ordering::Equal => file_name(a).cmp(&file_name(b)),
        other => other,
    });
}

/// Supported image files directly inside `dir`, in processing order.
///
/// # Errors
/// - `BatchError::MissingInputDir` — `dir` does not exist.
/// - `BatchError::ReadDir` — `dir` cannot be listed.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.exists() {
        return Err(BatchError::MissingInputDir(dir.to_path_buf()));
    }

    let read_err = |source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_supported(&path) {
            images.push(path);
        }
    }

    sort_images(&mut images);
    Ok(images)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Records from one pass, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub records: Vec<AnalysisRecord>,
    pub success_count: usize,
}

pub struct BatchOrchestrator<'a> {
    invoker: ModelInvoker<'a>,
    exemplars: &'a ExemplarStore,
    pacing: Duration,
    pause: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(invoker: ModelInvoker<'a>, exemplars: &'a ExemplarStore) -> Self {
        Self {
            invoker,
            exemplars,
            pacing: DEFAULT_PACING,
            pause: Box::new(std::thread::sleep),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Replaces the sleep between images.
    pub fn with_pause(mut self, pause: impl Fn(Duration) + 'a) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Analyzes one image. Never fails: errors become a failure record.
    pub fn analyze_image(&self, path: &Path) -> AnalysisRecord {
        match self.try_analyze(path) {
            Ok(invocation) => {
                let attempts = invocation.attempts.len();
                let record = AnalysisRecord::success(path, &invocation.model_used, invocation.assessment);
                tracing::info!(
                    image = %record.filename,
                    model = %record.model_used,
                    attempts,
                    depth_cm = ?record.depth_cm_estimate,
                    passability = %record.passability,
                    "analysis succeeded"
                );
                record
            }
            Err(e) => {
                tracing::error!(image = %path.display(), error = %e, "analysis failed");
                AnalysisRecord::failure(path, &e.to_string())
            }
        }
    }

    fn try_analyze(&self, path: &Path) -> Result<Invocation, ImageError> {
        let target = encode_image(path)?;

        let exemplars = self.exemplars.load();
        if exemplars.is_empty() {
            tracing::warn!("no few-shot exemplars available, sending task prompt only");
        }

        let messages = build_messages(exemplars, &target);
        Ok(self.invoker.invoke(&messages)?)
    }

    /// Analyzes every supported image in `images_dir`.
    pub fn run(&self, images_dir: &Path) -> Result<BatchOutcome, BatchError> {
        let images = list_images(images_dir)?;
        Ok(self.run_files(&images))
    }

    /// Analyzes the given files in the given order.
    pub fn run_files(&self, images: &[PathBuf]) -> BatchOutcome {
        let total = images.len();
        let mut records = Vec::with_capacity(total);
        let mut success_count = 0;

        for (i, path) in images.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                (self.pause)(self.pacing);
            }

            tracing::info!("[{}/{}] processing {}", i + 1, total, path.display());
            let record = self.analyze_image(path);
            if record.analysis_success {
                success_count += 1;
            }
            records.push(record);
        }

        BatchOutcome { records, success_count }
    }

    /// Runs the batch, then writes `{summary, results}` to `output_file`.
    ///
    /// An empty directory still produces a zero-count report.
    pub fn run_to_report(&self, images_dir: &Path, output_file: &Path) -> Result<BatchReport, BatchError> {
        let outcome = self.run(images_dir)?;
        let report = report::build_report(outcome.records);
        report::write_report(&report, output_file)?;
        Ok(report)
    }
}
