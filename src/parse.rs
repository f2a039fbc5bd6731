//! Decoding of model output into a `DepthAssessment`.
//!
//! Strict-schema responses decode directly. When a model wraps the object
//! in prose or a markdown fence, a tolerant pass looks for the first flat
//! `{ ... }` span containing the `"depth_cm_estimate"` key and decodes that
//! alone. The pattern assumes no `}` inside string values; a justification
//! containing one truncates the match and the attempt fails.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::model::{DepthAssessment, DepthRange, ParseError, Passability};

/// Object on the wire, before band and passability checks.
///
/// `depth_cm_estimate` is typed `number` in the response schema, so
/// fractional values are accepted here and rounded during validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssessment {
    depth_cm_estimate: f64,
    depth_range: String,
    passability: String,
    justification: String,
}

fn embedded_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\{[^}]*"depth_cm_estimate"[^}]*\}"#).expect("embedded object pattern is valid")
    })
}

/// Parses model content into an assessment.
///
/// # Errors
/// - `ParseError::Json` — neither the full text nor an embedded object
///   decoded; carries the error from decoding the full text.
/// - `ParseError::Invalid` — decoded, but a value is out of range.
pub fn parse_assessment(content: &str) -> Result<DepthAssessment, ParseError> {
    let raw = match serde_json::from_str::<RawAssessment>(content) {
        Ok(raw) => raw,
        Err(original) => {
            tracing::warn!(error = %original, "JSON decode failed, scanning for embedded object");
            recover_embedded(content).ok_or(ParseError::Json(original))?
        }
    };

    validate(raw)
}

fn recover_embedded(content: &str) -> Option<RawAssessment> {
    let found = embedded_object_pattern().find(content)?;
    serde_json::from_str(found.as_str()).ok()
}

fn validate(raw: RawAssessment) -> Result<DepthAssessment, ParseError> {
    if !raw.depth_cm_estimate.is_finite() || raw.depth_cm_estimate < 0.0 {
        return Err(ParseError::Invalid {
            field: "depth_cm_estimate",
            reason: format!("{} is not a non-negative depth", raw.depth_cm_estimate),
        });
    }

    let depth_range = serde_json::from_value::<DepthRange>(serde_json::Value::String(raw.depth_range.clone()))
        .ok()
        .filter(DepthRange::is_known)
        .ok_or_else(|| ParseError::Invalid {
            field: "depth_range",
            reason: format!("'{}' is not a depth band", raw.depth_range),
        })?;

    let passability = serde_json::from_value::<Passability>(serde_json::Value::String(raw.passability.clone()))
        .ok()
        .filter(Passability::is_known)
        .ok_or_else(|| ParseError::Invalid {
            field: "passability",
            reason: format!("'{}' is not one of pass, caution, unsafe", raw.passability),
        })?;

    if raw.justification.trim().is_empty() {
        return Err(ParseError::Invalid {
            field: "justification",
            reason: "empty".to_string(),
        });
    }

    Ok(DepthAssessment {
        depth_cm_estimate: raw.depth_cm_estimate.round() as u32,
        depth_range,
        passability,
        justification: raw.justification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    #[test]
    fn test_parse_clean_content() {
        let a = parse_assessment(fixture_clean_content()).expect("clean content should parse");
        assert_eq!(a.depth_cm_estimate, 22);
        assert_eq!(a.depth_range, DepthRange::From20To25);
        assert_eq!(a.passability, Passability::Caution);
        assert!(a.justification.starts_with("Stripes barely visible"));
    }

    #[test]
    fn test_recovers_object_embedded_in_prose() {
        let a = parse_assessment(fixture_prose_wrapped_content()).expect("embedded object should be recovered");
        assert_eq!(a.depth_cm_estimate, 42);
        assert_eq!(a.depth_range, DepthRange::From40To50);
        assert_eq!(a.passability, Passability::Unsafe);
    }

    #[test]
    fn test_recovers_fenced_object_and_normalises_hyphen() {
        let a = parse_assessment(fixture_fenced_content()).expect("fenced object should be recovered");
        assert_eq!(a.depth_cm_estimate, 5);
        assert_eq!(a.depth_range, DepthRange::From5To10);
    }

    #[test]
    fn test_no_recoverable_object_propagates_decode_error() {
        let err = parse_assessment(fixture_refusal_content()).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)), "got {:?}", err);
    }

    #[test]
    fn test_object_without_depth_key_is_not_recovered() {
        let text = r#"Sure: {"depth_range": "<5", "passability": "pass", "justification": "dry"}"#;
        assert!(matches!(parse_assessment(text), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_brace_inside_justification_truncates_match() {
        let err = parse_assessment(fixture_brace_in_justification_content()).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_unknown_band_rejected() {
        let err = parse_assessment(fixture_bad_band_content()).unwrap_err();
        match err {
            ParseError::Invalid { field, .. } => assert_eq!(field, "depth_range"),
            other => panic!("expected invalid band, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_passability_rejected_on_success_path() {
        let text = r#"{"depth_cm_estimate":3,"depth_range":"<5","passability":"unknown","justification":"glare"}"#;
        assert!(matches!(
            parse_assessment(text),
            Err(ParseError::Invalid { field: "passability", .. })
        ));
    }

    #[test]
    fn test_missing_field_is_not_fabricated() {
        let text = r#"{"depth_cm_estimate":3,"depth_range":"<5","passability":"pass"}"#;
        assert!(matches!(parse_assessment(text), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_extra_field_rejected() {
        let text = r#"{"depth_cm_estimate":3,"depth_range":"<5","passability":"pass","justification":"dry","confidence":0.9}"#;
        assert!(parse_assessment(text).is_err());
    }

    #[test]
    fn test_fractional_depth_rounded_negative_rejected() {
        let text = r#"{"depth_cm_estimate":12.6,"depth_range":"10–15","passability":"pass","justification":"near top"}"#;
        assert_eq!(parse_assessment(text).unwrap().depth_cm_estimate, 13);

        let text = r#"{"depth_cm_estimate":-4,"depth_range":"<5","passability":"pass","justification":"dry"}"#;
        assert!(matches!(
            parse_assessment(text),
            Err(ParseError::Invalid { field: "depth_cm_estimate", .. })
        ));
    }

    #[test]
    fn test_spaced_open_bands_normalised() {
        let text = r#"{"depth_cm_estimate":55,"depth_range":"> 50","passability":"unsafe","justification":"walkway under water"}"#;
        let a = parse_assessment(text).unwrap();
        assert_eq!(a.depth_range, DepthRange::Above50);
        assert_eq!(a.depth_range.as_str(), ">50");

        let text = r#"{"depth_cm_estimate":2,"depth_range":"< 5","passability":"pass","justification":"stripes crisp"}"#;
        assert_eq!(parse_assessment(text).unwrap().depth_range, DepthRange::Below5);
    }
}
