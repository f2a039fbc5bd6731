//! Few-shot exemplar registry.
//!
//! Six hand-curated frames of the Charleston Harbor parking lot, each paired
//! with the answer a domain expert gave for it. They are shown to the model
//! as user/assistant turns ahead of the target image.
//!
//! Images are resolved from the few-shot directory the first time the store
//! is asked for them and kept for the rest of the run. A missing or
//! unreadable image drops that exemplar; the batch continues with whatever
//! resolved, down to none at all.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::ingest::image::{EncodedImage, encode_image};
use crate::model::{DepthAssessment, DepthRange, Passability};

/// A hard-coded exemplar before its image is read.
#[derive(Debug, Clone, Copy)]
pub struct ExemplarSpec {
    pub image: &'static str,
    pub depth_cm: u32,
    pub depth_range: DepthRange,
    pub passability: Passability,
    pub justification: &'static str,
}

impl ExemplarSpec {
    pub fn expected_output(&self) -> DepthAssessment {
        DepthAssessment {
            depth_cm_estimate: self.depth_cm,
            depth_range: self.depth_range,
            passability: self.passability,
            justification: self.justification.to_string(),
        }
    }
}

pub const EXEMPLARS: [ExemplarSpec; 6] = [
    ExemplarSpec {
        image: "9.jpg",
        depth_cm: 5,
        depth_range: DepthRange::From5To10,
        passability: Passability::Pass,
        justification: "Pooling at wheel-stop base; stripes crisp; water far below curb. Anchors: 13 cm wheel stop + stripe clarity.",
    },
    ExemplarSpec {
        image: "29.jpg",
        depth_cm: 13,
        depth_range: DepthRange::From10To15,
        passability: Passability::Pass,
        justification: "Water near wheel-stop top (~13 cm); stripes slightly faded; curb top well above water (>30 cm margin). Anchors: wheel stop + curb margin.",
    },
    ExemplarSpec {
        image: "32.jpg",
        depth_cm: 22,
        depth_range: DepthRange::From20To25,
        passability: Passability::Caution,
        justification: "Stripes barely visible; curb top ≈20–25 cm above water. Cross-checked with partial wheel-stop submergence (~13 cm).",
    },
    ExemplarSpec {
        image: "37.jpg",
        depth_cm: 28,
        depth_range: DepthRange::From25To30,
        passability: Passability::Caution,
        justification: "Stripes gone; curb top ≈15–20 cm above water; no reflective sheet on walkway. Anchors: curb margin + wheel-stop coverage.",
    },
    ExemplarSpec {
        image: "43.jpg",
        depth_cm: 42,
        depth_range: DepthRange::From40To50,
        passability: Passability::Unsafe,
        justification: "Sustained overtopping with ~0–5 cm sheet on walkway → ≥40 band; stripes lost; curb margin ~0–5 cm.",
    },
    ExemplarSpec {
        image: "45.jpg",
        depth_cm: 45,
        depth_range: DepthRange::From40To50,
        passability: Passability::Unsafe,
        justification: "Walkway flooding visible (>5 cm in segments); curb overtopped; chains close to water. Conservative choice per overtopping rule.",
    },
];

/// A resolved exemplar: encoded image plus its expected answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Exemplar {
    pub image: EncodedImage,
    pub expected_output: DepthAssessment,
}

/// Lazily populated exemplar cache for one run.
pub struct ExemplarStore {
    dir: PathBuf,
    specs: Vec<ExemplarSpec>,
    cache: OnceCell<Vec<Exemplar>>,
}

impl ExemplarStore {
    /// Store over the built-in exemplar table.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_specs(dir, EXEMPLARS.to_vec())
    }

    pub fn with_specs(dir: impl Into<PathBuf>, specs: Vec<ExemplarSpec>) -> Self {
        Self {
            dir: dir.into(),
            specs,
            cache: OnceCell::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of exemplars in the table, resolved or not.
    pub fn configured_count(&self) -> usize {
        self.specs.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Resolved exemplars. Reads the few-shot directory on the first call
    /// only.
    pub fn load(&self) -> &[Exemplar] {
        self.cache.get_or_init(|| {
            tracing::info!(dir = %self.dir.display(), "loading few-shot exemplars");
            let resolved = resolve_exemplars(&self.dir, &self.specs);
            tracing::info!(
                loaded = resolved.len(),
                configured = self.specs.len(),
                "few-shot exemplars ready"
            );
            resolved
        })
    }
}

fn resolve_exemplars(dir: &Path, specs: &[ExemplarSpec]) -> Vec<Exemplar> {
    let mut resolved = Vec::with_capacity(specs.len());

    for spec in specs {
        let path = dir.join(spec.image);

        if !path.exists() {
            tracing::warn!(path = %path.display(), "few-shot image missing, skipping exemplar");
            continue;
        }

        match encode_image(&path) {
            Ok(image) => resolved.push(Exemplar {
                image,
                expected_output: spec.expected_output(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "few-shot image unreadable, skipping exemplar");
            }
        }
    }

    resolved
}
