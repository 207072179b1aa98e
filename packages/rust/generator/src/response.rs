//! JSON extraction from model replies.
//!
//! Models often wrap JSON in a Markdown code fence despite being asked not
//! to. A ```` ```json ```` fence wins, then a bare fence, then the whole
//! reply.

use std::sync::LazyLock;

use prepnest_shared::{PrepnestError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json[ \t]*\n?(.*?)\n?```").expect("valid regex"));

static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*\n(.*?)\n?```").expect("valid regex"));

/// The JSON payload of a model reply.
pub fn extract_json(text: &str) -> &str {
    for fence in [&*JSON_FENCE, &*BARE_FENCE] {
        if let Some(body) = fence.captures(text).and_then(|c| c.get(1)) {
            return body.as_str().trim();
        }
    }
    text.trim()
}

/// Extract and deserialize the JSON payload of a model reply.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text);
    if json.is_empty() {
        return Err(PrepnestError::Generation("empty model reply".into()));
    }
    serde_json::from_str(json).map_err(|e| {
        let preview: String = json.chars().take(200).collect();
        PrepnestError::Generation(format!("reply is not valid output JSON: {e} (got: {preview})"))
    })
}
