//! Prompt construction for the depth estimation request.
//!
//! Message layout with exemplars:
//!
//! ```text
//! system     persona
//! user       "Example 1. ..." + exemplar image      ┐
//! assistant  exemplar answer as compact JSON        ┘ × exemplars
//! user       task instructions + target image
//! ```
//!
//! With no exemplars only the final user turn is sent.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::exemplars::Exemplar;
use crate::ingest::image::EncodedImage;
use crate::model::DepthAssessment;

pub const SYSTEM_PROMPT: &str = "You are an engineering vision assistant specialized in flood depth analysis. \
Learn from the following examples and apply the same methodology to new images.";

/// Name given to the response schema in the structured-output request.
pub const SCHEMA_NAME: &str = "flood_analysis";

const IMAGE_DETAIL: &str = "high";

/// Task instructions: region of interest, visual anchors, depth bands,
/// overtopping escalation, passability thresholds, conflict handling and
/// the JSON-only output contract.
pub const TASK_PROMPT: &str = r#"**Task**
You are an engineering vision assistant. From a single Charleston Harbor parking-lot frame, estimate:
  • Water depth at the flooded parking area (cm, integer)
  • Passability for an ordinary sedan
  • Short justification

**Region of interest (ROI)**
Focus ONLY on the left-bottom parking area (asphalt with white bay stripes) and the planter/harbor curb that borders it.

**Visual anchors & canonical dimensions**
  • Concrete wheel stop height = 13 cm
  • Planter/harbor curb reveal (asphalt → curb top) = 45 cm (allow ±5 cm)

**Multi-anchor measurement (required)**
Use at least TWO anchors (e.g., wheel-stop coverage + stripe clarity + curb margin).
When measurable, include a rough pixel→cm reasoning; otherwise cite qualitative cues tied to the bands.

**Cue-based depth bands (aligned with 45 ±5 cm curb reveal)**
  < 5:   wheel stops dry; stripes crisp
  5–10:  pooling at wheel-stop base; stripes crisp
  10–15: water near wheel-stop top; stripes slightly faded
  15–20: stripes faint; curb top ≈25–30 cm ABOVE water
  20–25: stripes barely visible; curb top ≈20–25 cm ABOVE water
  25–30: stripes gone;   curb top ≈15–20 cm ABOVE water; no spill on walkway
  30–35: curb top ≈10–15 cm ABOVE water; no sustained spill
  35–40: curb top ≈ 5–10 cm ABOVE water; occasional kiss/splash only
  40–50: curb top 0–5 cm ABOVE water OR OVERTOPPED; thin (0–5 cm) sheet on walkway
  > 50:  walkway broadly flooded (>5 cm); post bases or chains close to water

**Overtopping (escalation) rules**
If you see a continuous lip/foam crossing onto the walkway or a reflective sheet on the walkway, set the band to ≥40–50.
Thin film 0–5 cm → 40–50; clearly >5 cm → >50.

**Passability rules (sedan)**
  pass ≤ 15 cm; caution 16–30 cm; unsafe > 30 cm

**Conflict handling**
If different anchors disagree by >10 cm, choose the larger (conservative) depth and state the reason (e.g., rain blur, glare).

**Output**
Return JSON ONLY:
{
  "depth_cm_estimate": <integer>,
  "depth_range": "<one of: <5 | 5–10 | 10–15 | 15–20 | 20–25 | 25–30 | 30–35 | 35–40 | 40–50 | >50>",
  "passability": "<pass|caution|unsafe>",
  "justification": "Brief: anchors used, and any evidence."
}
"#;

// ---------------------------------------------------------------------------
// Chat message types (OpenAI chat completions wire format)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

impl ChatMessage {
    pub fn system(text: &str) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.to_string()),
        }
    }

    pub fn assistant(text: String) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text),
        }
    }

    /// A user turn carrying instruction text followed by one image.
    pub fn user_with_image(text: &str, image: &EncodedImage) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.to_string() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                        detail: IMAGE_DETAIL.to_string(),
                    },
                },
            ]),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Exemplar answer as compact JSON in wire field order.
pub fn exemplar_answer_json(expected: &DepthAssessment) -> String {
    // DepthAssessment serializes its four fields in declaration order
    serde_json::to_string(expected).unwrap_or_default()
}

/// Builds the full message sequence for one target image.
pub fn build_messages(exemplars: &[Exemplar], target: &EncodedImage) -> Vec<ChatMessage> {
    if exemplars.is_empty() {
        return vec![ChatMessage::user_with_image(TASK_PROMPT, target)];
    }

    let mut messages = Vec::with_capacity(exemplars.len() * 2 + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    for (i, exemplar) in exemplars.iter().enumerate() {
        let instruction = format!("Example {}. Estimate flooding for this single frame.", i + 1);
        messages.push(ChatMessage::user_with_image(&instruction, &exemplar.image));
        messages.push(ChatMessage::assistant(exemplar_answer_json(&exemplar.expected_output)));
    }

    messages.push(ChatMessage::user_with_image(TASK_PROMPT, target));
    messages
}

/// Strict JSON schema for the four content fields.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "depth_cm_estimate": {
                "type": "number",
                "description": "Estimated water depth in centimeters"
            },
            "depth_range": {
                "type": "string",
                "description": "Depth range category"
            },
            "passability": {
                "type": "string",
                "enum": ["pass", "caution", "unsafe", "unknown"],
                "description": "Vehicle passability assessment"
            },
            "justification": {
                "type": "string",
                "description": "Detailed reasoning for the assessment"
            }
        },
        "required": ["depth_cm_estimate", "depth_range", "passability", "justification"],
        "additionalProperties": false
    })
}

/// The `response_format` object sent with every request.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": true,
            "schema": response_schema()
        }
    })
}
