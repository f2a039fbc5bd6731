//! flodepth_service: flood depth estimation from parking-lot photographs.
//!
//! Sends each image in a directory to a hosted vision-language model with
//! a few-shot prompt, collects a structured depth/passability assessment
//! per image, and writes one aggregated JSON report per run.
//!
//! # Module structure
//!
//! ```text
//! flodepth_service
//! ├── model      — shared data types (AnalysisRecord, DepthRange, ModelError, …)
//! ├── config     — analyzer.toml loader + API credential resolution
//! ├── logging    — tracing subscriber setup
//! ├── ingest
//! │   ├── image  — image file → base64 + MIME type
//! │   └── fixtures (test only) — representative model response payloads
//! ├── exemplars  — fixed few-shot exemplar table and lazy per-run cache
//! ├── prompt     — chat message construction + response schema
//! ├── client     — VisionClient trait and OpenAI chat completions client
//! ├── invoker    — model fallback / retry-round state machine
//! ├── parse      — tolerant decoding of model output
//! ├── batch      — directory ordering and per-image orchestration
//! └── report     — summary statistics and JSON report output
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod exemplars;
pub mod ingest;
pub mod invoker;
pub mod logging;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod report;
