use serde::{Deserialize, Serialize};
use serde_json::{Deserializer, Map, Value};
use tracing::{debug, instrument, trace};

/// A decoded top-level JSON object.
pub type JsonObject = Map<String, Value>;

/// How `extract_objects` looks for objects once the whole-text decode has not
/// produced an array (or a single object).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractStrategy {
    /// Try a decode at every offset, skipping one character on failure. Quadratic
    /// on garbage, but swallows scalars and strings exactly like a decoder would.
    #[default]
    OffsetScan,
    /// Single pass over brace/bracket depth, then decode each root structure.
    Structural,
}

/// Recover every JSON object from `text`.
///
/// Accepted shapes:
/// - a JSON array: its object elements are returned, everything else dropped
/// - a single JSON object
/// - objects concatenated with or without separators, possibly with noise in between
///
/// Never fails; undecodable spans are skipped and fully unparseable input yields
/// an empty vector.
#[instrument(target = "bili_comments::json_extract", skip(text), fields(len = text.len()))]
pub fn extract_objects(text: &str, strategy: ExtractStrategy) -> Vec<JsonObject> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => {
            let total = items.len();
            let objects: Vec<JsonObject> = items.into_iter().filter_map(into_object).collect();
            debug!(target: "bili_comments::json_extract", total, objects = objects.len(), "decoded top-level array");
            return objects;
        }
        Ok(Value::Object(obj)) => {
            debug!(target: "bili_comments::json_extract", "decoded single top-level object");
            return vec![obj];
        }
        // Scalars fall through; the scan below finds nothing in them either
        Ok(_) | Err(_) => {}
    }

    let objects = match strategy {
        ExtractStrategy::OffsetScan => scan_offsets(text),
        ExtractStrategy::Structural => scan_structures(text),
    };
    debug!(target: "bili_comments::json_extract", ?strategy, objects = objects.len(), "scan complete");
    objects
}

fn into_object(value: Value) -> Option<JsonObject> {
    match value {
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}

fn scan_offsets(text: &str) -> Vec<JsonObject> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    let mut skipped = 0usize;

    while offset < text.len() {
        let rest = &text[offset..];
        let mut values = Deserializer::from_str(rest).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                // byte_offset is the end of the value just decoded, relative to `rest`
                let consumed = values.byte_offset().max(1);
                trace!(target: "bili_comments::json_extract", offset, consumed, "decoded value");
                if let Some(obj) = into_object(value) {
                    out.push(obj);
                }
                offset += consumed;
            }
            Some(Err(_)) => {
                skipped += 1;
                offset += rest.chars().next().map_or(1, char::len_utf8);
            }
            // Only whitespace left
            None => break,
        }
    }

    debug!(target: "bili_comments::json_extract", skipped, "offset scan skipped positions");
    out
}

fn scan_structures(text: &str) -> Vec<JsonObject> {
    fn collect_from_node(text: &str, node: &ObjCoords, out: &mut Vec<JsonObject>) {
        let slice = &text[node.start..=node.end];
        match serde_json::from_str::<Value>(slice) {
            Ok(Value::Object(obj)) => out.push(obj),
            Ok(Value::Array(items)) => out.extend(items.into_iter().filter_map(into_object)),
            Ok(_) => {}
            Err(_) => {
                for child in &node.children {
                    collect_from_node(text, child, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    for node in &find_json_structures(text) {
        collect_from_node(text, node, &mut out);
    }
    out
}

// =============== Structure discovery ===============

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all balanced object/array structures in `text`. Coordinates are byte indices.
///
/// A closer that does not match the innermost opener discards that opener, and an
/// opener still open at the end of input is discarded too. In both cases the complete
/// structures found inside it are kept, so a truncated fragment never swallows the
/// structures that follow it.
#[instrument(target = "bili_comments::json_extract", skip(text))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closed = match b {
            b'"' => {
                in_string = true;
                None
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                None
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                None
            }
            b'}' => Some(NodeType::Object),
            b']' => Some(NodeType::Array),
            _ => None,
        };

        let Some(kind) = closed else { continue };
        let Some(frame) = stack.pop() else { continue };
        if frame.kind != kind {
            // Unbalanced: drop the opener, hand its finished children up a level
            match stack.last_mut() {
                Some(parent) => parent.children.extend(frame.children),
                None => results.extend(frame.children),
            }
            continue;
        }
        let node = ObjCoords::new(frame.start, i, kind, frame.children);
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => results.push(node),
        }
    }

    // Openers never closed (truncated input). Outer frames finished their children
    // before inner frames opened, so bottom-up keeps start order.
    for frame in stack {
        results.extend(frame.children);
    }

    debug!(target: "bili_comments::json_extract", count = results.len(), "found root structures");
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_input_is_empty() {
        assert!(extract_objects("  \n\t ", ExtractStrategy::OffsetScan).is_empty());
        assert!(extract_objects("", ExtractStrategy::Structural).is_empty());
    }

    #[test]
    fn offset_scan_handles_multibyte_noise() {
        let text = "评论{\"a\":1}数据{\"b\":2}";
        let objs = extract_objects(text, ExtractStrategy::OffsetScan);
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[1]["b"], 2);
    }

    #[test]
    fn structural_descends_into_broken_root() {
        // outer object is invalid JSON but holds a valid one
        let text = r#"{"outer": oops, "inner": {"x": 1}}"#;
        let objs = extract_objects(text, ExtractStrategy::Structural);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0]["x"], 1);
    }

    #[test]
    fn unclosed_opener_releases_its_children() {
        let text = r#"{"a":[1,2 {"b":2} {"c":3}"#;
        let coords = find_json_structures(text);
        let roots: Vec<&str> = coords.iter().map(|c| &text[c.start..=c.end]).collect();
        assert_eq!(roots, vec![r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn mismatched_closer_keeps_finished_children() {
        let text = r#"[{"a":1}} {"c":3}"#;
        let coords = find_json_structures(text);
        let roots: Vec<&str> = coords.iter().map(|c| &text[c.start..=c.end]).collect();
        assert_eq!(roots, vec![r#"{"a":1}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn extraction_events_carry_the_extract_target() {
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        struct Targets(Arc<Mutex<Vec<String>>>);

        impl<S: tracing::Subscriber> Layer<S> for Targets {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if let Ok(mut seen) = self.0.lock() {
                    seen.push(event.metadata().target().to_string());
                }
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Targets(Arc::clone(&seen)));
        tracing::subscriber::with_default(subscriber, || {
            extract_objects("{\"a\":1} noise", ExtractStrategy::OffsetScan);
            extract_objects("{\"a\":1} noise", ExtractStrategy::Structural);
        });

        let seen = seen.lock().expect("lock");
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|t| t == "bili_comments::json_extract"), "{:?}", seen);
    }

    #[test]
    fn unbalanced_closer_drops_opener() {
        let coords = find_json_structures(r#"{ ] {"a":1}"#);
        assert_eq!(coords.len(), 1);
        assert_eq!(coords[0].start, 4);
    }
}
