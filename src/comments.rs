//! Envelope → `CommentRecord` mapping.
//!
//! An envelope is one captured API response:
//! `{"code": 0, "data": {"replies": [{"ctime": .., "member": {"mid": .., "uname": ..}, "content": {"message": ..}}]}}`.
//! Field access never panics; every probe goes through [`lookup`] and reports a
//! [`FieldError`] naming the dotted path that was missing or mistyped.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FieldError;
use crate::json_utils::{extract_objects, ExtractStrategy, JsonObject};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized comment. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "CommentText")]
    pub text: String,
}

/// Zone used to render `ctime`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    #[default]
    Local,
    Utc,
}

impl TimeFormat {
    /// Format epoch seconds, or `None` when the value is outside chrono's range.
    pub fn format_epoch(self, secs: i64) -> Option<String> {
        match self {
            TimeFormat::Local => Local.timestamp_opt(secs, 0).earliest().map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            TimeFormat::Utc => DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// Replace every `\n` and `\r` with a single space. Everything else is kept as-is.
pub fn sanitize_text(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Name reported when the value passed to [`lookup`] is itself not an object.
pub const ROOT_NAME: &str = "reply";

/// Walk `path` through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value, FieldError> {
    let mut current = value;
    for (depth, key) in path.iter().enumerate() {
        let obj = current.as_object().ok_or_else(|| FieldError::WrongType {
            path: if depth == 0 { ROOT_NAME.to_string() } else { path[..depth].join(".") },
            expected: "an object",
        })?;
        current = obj.get(*key).ok_or_else(|| FieldError::Missing { path: path[..=depth].join(".") })?;
    }
    Ok(current)
}

fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str, FieldError> {
    lookup(value, path)?
        .as_str()
        .ok_or_else(|| FieldError::WrongType { path: path.join("."), expected: "a string" })
}

/// `ctime` is normally an integer; floats are truncated toward zero.
fn lookup_epoch(value: &Value, path: &[&str]) -> Result<i64, FieldError> {
    let raw = lookup(value, path)?;
    raw.as_i64()
        .or_else(|| raw.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        .ok_or_else(|| FieldError::WrongType { path: path.join("."), expected: "a number" })
}

/// Member ids are integers in practice; a string id is passed through untouched.
fn lookup_id(value: &Value, path: &[&str]) -> Result<String, FieldError> {
    match lookup(value, path)? {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(FieldError::WrongType { path: path.join("."), expected: "an integer" }),
    }
}

/// Map one reply entry, or report the first field that made it unusable.
pub fn map_reply(reply: &Value, tz: TimeFormat) -> Result<CommentRecord, FieldError> {
    let ctime = lookup_epoch(reply, &["ctime"])?;
    let timestamp = tz
        .format_epoch(ctime)
        .ok_or_else(|| FieldError::WrongType { path: "ctime".to_string(), expected: "a representable timestamp" })?;
    let user_id = lookup_id(reply, &["member", "mid"])?;
    let username = sanitize_text(lookup_str(reply, &["member", "uname"])?);
    let text = sanitize_text(lookup_str(reply, &["content", "message"])?);

    Ok(CommentRecord { timestamp, user_id, username, text })
}

/// Map an envelope to its comments. Non-zero `code`, or no `data.replies` list,
/// gives an empty vector. A defective reply is logged and skipped.
pub fn map_envelope(envelope: &JsonObject, tz: TimeFormat) -> Vec<CommentRecord> {
    let code = envelope.get("code").and_then(Value::as_i64);
    if code != Some(0) {
        debug!(?code, "envelope rejected: status code is not 0");
        return Vec::new();
    }

    let Some(replies) = envelope
        .get("data")
        .and_then(Value::as_object)
        .and_then(|data| data.get("replies"))
        .and_then(Value::as_array)
    else {
        debug!("envelope has no data.replies list");
        return Vec::new();
    };

    let mut out = Vec::with_capacity(replies.len());
    for (index, reply) in replies.iter().enumerate() {
        match map_reply(reply, tz) {
            Ok(record) => out.push(record),
            Err(e) => {
                warn!(index, field = e.path(), "skipping reply: {}", e);
                eprintln!("Comment field missing: {}", e);
            }
        }
    }
    out
}

/// Comments recovered from one raw payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedPayload {
    /// Objects the extractor recovered, envelopes or not.
    pub objects: usize,
    pub records: Vec<CommentRecord>,
}

/// Extract every object from a raw payload and map each as an envelope, in order.
pub fn map_payload(text: &str, strategy: ExtractStrategy, tz: TimeFormat) -> MappedPayload {
    let objects = extract_objects(text, strategy);
    let records = objects.iter().flat_map(|obj| map_envelope(obj, tz)).collect();
    MappedPayload { objects: objects.len(), records }
}
