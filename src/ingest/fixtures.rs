//! Test fixtures: representative content strings returned by the vision
//! model's chat completions endpoint.
//!
//! With strict JSON-schema output the content is normally a single bare
//! object. The other fixtures cover what shows up when a model ignores the
//! response format: prose around the object, a markdown fence, or an
//! answer with no object at all.

/// Clean structured output, 22 cm in the 20–25 band.
#[cfg(test)]
pub(crate) fn fixture_clean_content() -> &'static str {
    r#"{"depth_cm_estimate":22,"depth_range":"20–25","passability":"caution","justification":"Stripes barely visible; curb top about 20–25 cm above water."}"#
}

/// The object wrapped in explanatory prose.
#[cfg(test)]
pub(crate) fn fixture_prose_wrapped_content() -> &'static str {
    r#"Here is my assessment of the frame:
{
  "depth_cm_estimate": 42,
  "depth_range": "40–50",
  "passability": "unsafe",
  "justification": "Sustained overtopping with a thin sheet on the walkway."
}
Let me know if you need anything else."#
}

/// Fenced markdown block, as some models emit despite instructions.
#[cfg(test)]
pub(crate) fn fixture_fenced_content() -> &'static str {
    "```json\n{\"depth_cm_estimate\": 5, \"depth_range\": \"5-10\", \"passability\": \"pass\", \"justification\": \"Pooling at wheel-stop base.\"}\n```"
}

/// Prose with no recoverable object.
#[cfg(test)]
pub(crate) fn fixture_refusal_content() -> &'static str {
    "I'm unable to determine the water depth from this image."
}

/// A `}` inside the justification truncates the tolerant match.
#[cfg(test)]
pub(crate) fn fixture_brace_in_justification_content() -> &'static str {
    r#"Result: {"depth_cm_estimate": 30, "depth_range": "25–30", "passability": "caution", "justification": "curb margin {approx} 15 cm"} done"#
}

/// Valid JSON but a band outside the allowed set.
#[cfg(test)]
pub(crate) fn fixture_bad_band_content() -> &'static str {
    r#"{"depth_cm_estimate":12,"depth_range":"11–14","passability":"pass","justification":"Near wheel-stop top."}"#
}

/// A full chat completions response envelope.
#[cfg(test)]
pub(crate) fn fixture_chat_completion_json() -> &'static str {
    r#"{
      "id": "chatcmpl-abc123",
      "object": "chat.completion",
      "created": 1727000000,
      "model": "gpt-4o-2024-08-06",
      "choices": [
        {
          "index": 0,
          "message": {
            "role": "assistant",
            "content": "{\"depth_cm_estimate\":28,\"depth_range\":\"25–30\",\"passability\":\"caution\",\"justification\":\"Stripes gone; curb top about 15–20 cm above water.\"}",
            "refusal": null
          },
          "finish_reason": "stop"
        }
      ],
      "usage": { "prompt_tokens": 9120, "completion_tokens": 48, "total_tokens": 9168 }
    }"#
}

/// An envelope whose message content is null (e.g. a refusal).
#[cfg(test)]
pub(crate) fn fixture_null_content_completion_json() -> &'static str {
    r#"{
      "id": "chatcmpl-def456",
      "object": "chat.completion",
      "choices": [
        {
          "index": 0,
          "message": { "role": "assistant", "content": null, "refusal": "I can't help with that." },
          "finish_reason": "stop"
        }
      ]
    }"#
}
