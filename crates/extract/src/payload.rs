//! The metadata fetch boundary.
//!
//! The downloader's JSON mode prints one of several shapes depending on the
//! site, the version, and whether things went well:
//!
//! - a bare metadata object,
//! - an `[index, object]` message pair (a negative index signals an error),
//! - a list of such messages, of which only the first matters,
//! - an object carrying an `error` key,
//! - one JSON document per line instead of a single document.
//!
//! [`parse_payload`] folds all of that into a [`FetchPayload`] so the rest of
//! the system only ever matches on three variants.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

/// Placeholder substituted with the gallery id in fetch URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// The fetch URL for gallery `id`.
pub fn gallery_url(template: &str, id: u64) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

/// Outcome of a metadata fetch, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPayload {
    /// A usable metadata record.
    Valid(RawGallery),
    /// The fetcher (or the remote end) reported an error.
    Error(String),
    /// Output was produced, but in no shape we understand.
    Malformed,
}

/// A single value or a list of values. Lists are joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Field {
    One(String),
    Many(Vec<String>),
}
impl Field {
    /// Flattens the field, treating empty strings and empty lists as absent.
    pub fn joined(&self) -> Option<String> {
        let joined = match self {
            Self::One(s) => s.clone(),
            Self::Many(items) => items.join(", "),
        };
        (!joined.is_empty()).then_some(joined)
    }
}

/// Gallery metadata exactly as the fetcher reported it. Every field is
/// optional; normalization happens in
/// [`MetadataRecord::from_fetched`](crate::MetadataRecord::from_fetched).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGallery {
    #[serde(default)]
    pub artist: Option<Field>,
    #[serde(default)]
    pub group: Option<Field>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_jpn: Option<String>,
    #[serde(default)]
    pub parody: Option<Field>,
    #[serde(default)]
    pub series: Option<Field>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Tags are usually strings, but tolerate `null` and non-string entries.
fn lenient_strings<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect())
}

/// Parses raw fetcher output into a [`FetchPayload`].
#[instrument(level = "debug", skip(output), fields(output_size = output.len()))]
pub fn parse_payload(output: &str) -> FetchPayload {
    let value = match serde_json::from_str::<Value>(output) {
        Ok(value) => value,
        // Line-delimited output: the first document carries the gallery.
        Err(_) => match output.lines().map(str::trim).find(|line| !line.is_empty()).map(serde_json::from_str) {
            Some(Ok(value)) => value,
            _ => return FetchPayload::Malformed,
        },
    };
    classify(value)
}

fn classify(value: Value) -> FetchPayload {
    match value {
        Value::Object(map) => from_object(map),
        Value::Array(mut items) => {
            if items.len() >= 2 && items[1].is_object() && let Some(index) = items[0].as_i64() {
                let Value::Object(map) = items.swap_remove(1) else {
                    return FetchPayload::Malformed;
                };
                if index < 0 {
                    return FetchPayload::Error(error_reason(&map).unwrap_or_else(|| format!("message index {index}")));
                }
                return from_object(map);
            }
            match items.into_iter().next() {
                Some(first @ (Value::Array(_) | Value::Object(_))) => classify(first),
                _ => FetchPayload::Malformed,
            }
        },
        _ => FetchPayload::Malformed,
    }
}

fn from_object(map: Map<String, Value>) -> FetchPayload {
    if let Some(reason) = error_reason(&map) {
        return FetchPayload::Error(reason);
    }
    if map.is_empty() {
        return FetchPayload::Malformed;
    }
    match serde_json::from_value::<RawGallery>(Value::Object(map)) {
        Ok(raw) => FetchPayload::Valid(raw),
        Err(e) => {
            tracing::debug!(error = %e, "Metadata object has unexpected field types");
            FetchPayload::Malformed
        },
    }
}

fn error_reason(map: &Map<String, Value>) -> Option<String> {
    let error = map.get("error")?;
    let reason = map
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(reason)
}
