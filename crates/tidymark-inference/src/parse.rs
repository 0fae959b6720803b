//! Typed parsing of model responses.
//!
//! Models wrap their JSON in prose or code fences often enough that both
//! parsers first locate the payload inside the text, then deserialize it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use tidymark_core::defaults::MAX_TAGS;
use tidymark_core::{Classification, Error, Result};

/// Shortest bracketed span, as models return `[3, 1, 2]` inline.
static INDEX_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").expect("valid index array pattern"));

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    category: Option<JsonValue>,
    #[serde(default)]
    tags: Option<JsonValue>,
    #[serde(default)]
    description: Option<JsonValue>,
}

/// Parse a classification out of model output.
///
/// The first balanced `{...}` object is used. `category` must be a non-empty
/// string. Tags are trimmed, deduplicated and capped at [`MAX_TAGS`]; a
/// missing description becomes empty.
pub fn parse_classification(text: &str) -> Result<Classification> {
    let object = first_json_object(text)
        .ok_or_else(|| Error::ClassificationParse("no JSON object in response".to_string()))?;

    let raw: RawClassification = serde_json::from_str(object)
        .map_err(|e| Error::ClassificationParse(format!("invalid JSON object: {e}")))?;

    let category = raw
        .category
        .as_ref()
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::ClassificationParse("missing category".to_string()))?
        .to_string();

    let mut tags: Vec<String> = Vec::new();
    let candidates: Vec<String> = match raw.tags {
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect(),
        Some(JsonValue::String(joined)) => joined.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    for tag in candidates {
        let tag = tag.trim();
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    let description = raw
        .description
        .as_ref()
        .and_then(JsonValue::as_str)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    Ok(Classification {
        category,
        tags,
        description,
    })
}

/// Parse the first JSON array of integers out of model output.
///
/// Non-integer entries are skipped.
pub fn parse_index_array(text: &str) -> Result<Vec<i64>> {
    let span = INDEX_ARRAY
        .find(text)
        .ok_or_else(|| Error::ClassificationParse("no JSON array in response".to_string()))?;

    let items: Vec<JsonValue> = serde_json::from_str(span.as_str())
        .map_err(|e| Error::ClassificationParse(format!("invalid JSON array: {e}")))?;

    Ok(items.iter().filter_map(JsonValue::as_i64).collect())
}

/// Slice of the first balanced `{...}` in `text`, ignoring braces in strings.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
