//! Extraction of JSON payloads from response bodies.
//!
//! Fund endpoints frequently wrap their payload in a JSONP callback
//! (`jQuery123({...})`, `jsonpgz({...});`). [`extract_json`] accepts both
//! pure JSON and such envelopes without knowing the callback name.

use serde_json::Value;

use crate::error::ParseFailure;

/// Extracts the JSON value embedded in `raw`.
///
/// Pure JSON is parsed directly. Otherwise the substring from the first `{`
/// to the last `}` (inclusive) is parsed.
///
/// # Errors
///
/// Returns [`ParseFailure::NoJsonFound`] when there is no such region and
/// [`ParseFailure::MalformedJson`] when the region is not valid JSON.
pub fn extract_json(raw: &str) -> Result<Value, ParseFailure> {
    let trimmed = raw.trim().trim_start_matches('\u{feff}');
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ParseFailure::NoJsonFound);
    };
    if open >= close {
        return Err(ParseFailure::NoJsonFound);
    }

    serde_json::from_str(&trimmed[open..=close])
        .map_err(|e| ParseFailure::MalformedJson(e.to_string()))
}
