//! List response normalization.
//!
//! The list endpoint has been seen answering with several envelopes. Each
//! known shape is tried in order; a payload matching none of them is treated
//! as "no data" rather than as an error. Records inside a recognized envelope
//! are decoded one by one, so a single entry that does not fit `TwinRecord`
//! is skipped without hiding the rest.

use serde::Deserialize;
use serde_json::Value;

use crate::types::TwinRecord;

/// Known list response shapes, in decode priority order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope {
    /// `{"things": [...]}`
    Things { things: Vec<Value> },
    /// `{"items": [...]}`, the search endpoint's envelope.
    Items { items: Vec<Value> },
    /// `[...]`
    Bare(Vec<Value>),
}

impl ListEnvelope {
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            ListEnvelope::Things { things } => things,
            ListEnvelope::Items { items } => items,
            ListEnvelope::Bare(entries) => entries,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ListEnvelope::Things { .. } => "things",
            ListEnvelope::Items { .. } => "items",
            ListEnvelope::Bare(_) => "bare",
        }
    }
}

/// Extract the twin sequence from a decoded list payload.
///
/// Returns an empty sequence when the payload matches no known shape.
/// Entries that are not twin records are dropped; the rest keep their order.
pub fn normalize_list(payload: Value) -> Vec<TwinRecord> {
    let envelope = match ListEnvelope::deserialize(&payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, kind = value_kind(&payload), "unrecognized list response shape, treating as empty");
            return Vec::new();
        }
    };
    let shape = envelope.shape();
    let entries = envelope.into_entries();
    let received = entries.len();
    let twins: Vec<TwinRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| decode_entry(index, entry))
        .collect();
    tracing::trace!(shape, received, kept = twins.len(), "list response decoded");
    twins
}

fn decode_entry(index: usize, entry: Value) -> Option<TwinRecord> {
    let id = entry.get("thingId").and_then(Value::as_str).map(str::to_owned);
    match TwinRecord::deserialize(entry) {
        Ok(twin) => Some(twin),
        Err(err) => {
            tracing::warn!(index, id = id.as_deref().unwrap_or("-"), error = %err, "skipping list entry that is not a twin record");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
