// Tolerant parsing of CLI output. Never fails: bad input yields `None` or is skipped.

use super::types::{EventType, StreamEvent, StructuredResponse};
use serde_json::Value;
use tracing::debug;

/// Parse single-object `json` output.
///
/// Scans lines from the last one backward for a `{...}` line, since the CLI may echo
/// auxiliary JSON before the final answer. Only when no such line exists is the whole
/// output tried as one document.
pub fn parse_single(output: &str) -> Option<StructuredResponse> {
    let last_object_line = output.lines().rev().map(str::trim).find(|line| {
        line.starts_with('{') && line.ends_with('}')
    });

    match last_object_line {
        Some(line) => to_structured(line),
        None => to_structured(output.trim()),
    }
}

fn to_structured(text: &str) -> Option<StructuredResponse> {
    let raw: Value = serde_json::from_str(text).ok()?;
    if !raw.is_object() {
        return None;
    }
    let mut parsed: StructuredResponse = serde_json::from_value(raw.clone()).ok()?;
    parsed.raw = raw;
    Some(parsed)
}

/// Parse `stream-json` output into events, skipping chatter and partial lines.
pub fn parse_stream(output: &str) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for line in output.lines().map(str::trim) {
        if !line.starts_with('{') {
            continue;
        }
        match serde_json::from_str::<StreamEvent>(line) {
            Ok(event) => events.push(event),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(parsed = events.len(), skipped = skipped, "skipped unparsable stream lines");
    }
    events
}

/// Concatenate the content of every `text` event, in order.
pub fn reconstruct_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter(|e| e.kind == EventType::Text)
        .filter_map(|e| e.content.as_deref())
        .collect()
}
