//! Splits one raw completion into the user-facing reply
//! and the structured record update.
//!
//! Wire format:
//!
//! ```text
//! <conversation_response>
//! Thanks! What is your industry?
//! </conversation_response>
//! <updated_data>
//! {"first_name": "Ana", "email": "ana@x.com"}
//! </updated_data>
//! ```
//!
//! Nothing here fails hard. Every deviation from the format is recovered
//! locally and reported as a `ProtocolIssue` so the caller can log it.

pub mod payload;

use serde::Serialize;
use thiserror::Error;

use crate::record::merge::UpdatePayload;

pub const REPLY_OPEN: &str = "<conversation_response>";
pub const REPLY_CLOSE: &str = "</conversation_response>";
pub const UPDATE_OPEN: &str = "<updated_data>";
pub const UPDATE_CLOSE: &str = "</updated_data>";
/// Agent-declared end of the conversation. Removed from the reply text.
pub const COMPLETE_MARKER: &str = "<conversation_complete/>";
/// Reserved value meaning "reset this field to empty".
pub const CLEAR_SENTINEL: &str = "__clear__";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProtocolIssue {
    #[error("no reply region found; the whole response is used as the reply")]
    MissingReplyRegion,

    #[error("malformed update payload: {0}")]
    MalformedUpdatePayload(String),

    #[error("unknown field '{0}' in update payload was dropped")]
    UnknownField(String),

    #[error("{0} additional update region(s) ignored")]
    ExtraUpdateRegion(usize),

    #[error("field '{0}' carried a non-string value and was dropped")]
    NonStringValue(String),
}

#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub reply: String,
    pub payload: UpdatePayload,
    pub issues: Vec<ProtocolIssue>,
    pub concluded: bool,
}

enum Region<'a> {
    Found { body: &'a str, end: usize },
    Broken,
    Absent,
}

/// Locates the first `open ... close` region. An opening tag with no close,
/// or a second opening tag before the close, makes the region `Broken`.
fn find_region<'a>(text: &'a str, open: &str, close: &str) -> Region<'a> {
    let Some(start) = text.find(open) else {
        return Region::Absent;
    };
    let body_start = start + open.len();
    let rest = &text[body_start..];
    let Some(close_at) = rest.find(close) else {
        return Region::Broken;
    };
    let body = &rest[..close_at];
    if body.contains(open) {
        return Region::Broken;
    }
    Region::Found {
        body,
        end: body_start + close_at + close.len(),
    }
}

/// Parses one raw completion. Never fails: the worst case is the whole text
/// as the reply with an empty payload.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut issues = Vec::new();
    let concluded = raw.contains(COMPLETE_MARKER);

    let reply = match find_region(raw, REPLY_OPEN, REPLY_CLOSE) {
        Region::Found { body, .. } if !without_marker(body).trim().is_empty() => {
            without_marker(body).trim().to_string()
        }
        _ => {
            issues.push(ProtocolIssue::MissingReplyRegion);
            without_marker(raw).trim().to_string()
        }
    };

    let payload = match find_region(raw, UPDATE_OPEN, UPDATE_CLOSE) {
        Region::Absent => UpdatePayload::new(),
        Region::Broken => {
            issues.push(ProtocolIssue::MalformedUpdatePayload(
                "update region is unterminated or nested".to_string(),
            ));
            UpdatePayload::new()
        }
        Region::Found { body, end } => {
            let extra = raw[end..].matches(UPDATE_OPEN).count();
            if extra > 0 {
                issues.push(ProtocolIssue::ExtraUpdateRegion(extra));
            }
            match payload::decode_update_body(body) {
                Ok(decoded) => {
                    issues.extend(decoded.issues);
                    decoded.payload
                }
                Err(issue) => {
                    issues.push(issue);
                    UpdatePayload::new()
                }
            }
        }
    };

    ParsedResponse {
        reply,
        payload,
        issues,
        concluded,
    }
}

fn without_marker(text: &str) -> String {
    text.replace(COMPLETE_MARKER, "")
}
