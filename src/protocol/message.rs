//! GhostText wire message types.
//!
//! The wire format is JSON, one object per WebSocket text frame:
//!
//! ```text
//! {
//!   "text":       "full document contents",     (required)
//!   "selections": [{"start": 0, "end": 0}, ..], (optional, default [])
//!   "title":      "page title",                 (first message only)
//!   "url":        "page url",                   (first message only)
//!   "syntax":     "markdown"                    (first message only)
//! }
//! ```
//!
//! Every update carries the complete document text; the protocol is
//! not incremental. All offsets are UTF-16 code units, matching the
//! string indexing of the browser side.

use serde::{Deserialize, Serialize};

use crate::core::DecodeError;

/// One selection range, as UTF-16 code-unit offsets into the
/// accompanying `text`. `start == end` is a bare caret.
///
/// Offsets are non-negative in memory; a negative offset on the wire
/// is a tolerated race (the peer computed it against text that no
/// longer exists) and decodes as 0 rather than rejecting the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Inclusive start offset.
    #[serde(deserialize_with = "clamped_offset")]
    pub start: u64,
    /// Exclusive end offset.
    #[serde(deserialize_with = "clamped_offset")]
    pub end: u64,
}

/// Deserialize a wire offset, clamping negative values to 0.
fn clamped_offset<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.max(0) as u64)
}

impl Selection {
    /// A zero-length selection (caret) at the given offset.
    pub fn caret(offset: u64) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// A selection covering `start..end`.
    pub fn range(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Clamp both offsets into `[0, len]`.
    ///
    /// Out-of-range offsets are a tolerated race between an edit and a
    /// selection update, not a protocol violation, so they are pulled
    /// back into the document rather than rejected.
    pub fn clamp(self, len: u64) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
        }
    }
}

/// Length of `text` in UTF-16 code units.
///
/// Selection offsets on the wire count UTF-16 code units, so clamping
/// must measure the text the same way.
pub fn utf16_len(text: &str) -> u64 {
    text.encode_utf16().count() as u64
}

/// One wire message: the full document text plus selection ranges.
///
/// The metadata fields are only meaningful on the first message of a
/// session, where they describe the originating browser text field;
/// the sync core ignores them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Full document contents.
    pub text: String,

    /// Selection ranges into `text`. Empty means "nothing to apply",
    /// not "collapse to a default cursor".
    #[serde(default)]
    pub selections: Vec<Selection>,

    /// Page title of the originating tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// URL of the originating page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Syntax hint for the editor surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
}

impl Message {
    /// Build an outbound message carrying a local edit.
    ///
    /// Outbound frames always carry empty `title`/`syntax` fields (the
    /// browser side expects them to be present) and never a `url`.
    pub fn outbound(text: impl Into<String>, selections: Vec<Selection>) -> Self {
        Self {
            text: text.into(),
            selections,
            title: Some(String::new()),
            url: None,
            syntax: Some(String::new()),
        }
    }

    /// Decode a wire payload.
    ///
    /// Fails if the payload is not well-formed JSON or omits `text`.
    /// An absent `selections` array decodes as empty.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.get("text").is_some_and(|t| t.is_string()) {
            return Err(DecodeError::MissingText);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encode to a wire payload.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Session-initial metadata carried by this message, if any.
    pub fn into_init(self) -> crate::core::DocumentInit {
        crate::core::DocumentInit {
            text: self.text,
            title: self.title,
            url: self.url,
            syntax: self.syntax,
        }
    }
}

/// Body of a successful discovery handshake response.
///
/// Field names are fixed by the protocol (PascalCase on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeReply {
    /// Protocol version the server speaks.
    #[serde(rename = "ProtocolVersion")]
    pub protocol_version: u32,

    /// Port the peer should open its WebSocket to.
    #[serde(rename = "WebSocketPort")]
    pub web_socket_port: u16,
}

/// Body of a failed discovery handshake response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeError {
    /// Human-readable reason.
    pub error: String,
}
