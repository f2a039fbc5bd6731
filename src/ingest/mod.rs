//! Input handling for the analyzer.
//!
//! - `image`    — reads image files and encodes them for inline transport
//! - `fixtures` — (test only) canned model response payloads

pub mod image;

#[cfg(test)]
pub(crate) mod fixtures;
