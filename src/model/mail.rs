//! Core message types: the raw body-part tree and the derived [`EmailData`].

use serde::{Deserialize, Serialize};

use super::attachment::AttachmentDescriptor;

/// A message as returned by the mail source.
///
/// The serde shape matches the Gmail `users.messages.get?format=full`
/// resource, so REST responses deserialize straight into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: String,

    #[serde(default)]
    pub thread_id: Option<String>,

    /// Root of the MIME tree. Top-level headers live on this node.
    #[serde(default)]
    pub payload: BodyPartNode,
}

impl RawMessage {
    /// Header list of the message (the root part's headers).
    pub fn headers(&self) -> &[Header] {
        &self.payload.headers
    }
}

/// A single name/value header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One node of the MIME tree.
///
/// A node with both a non-empty `filename` and a `body.attachment_id` is a
/// reference to a binary attachment, not inline content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPartNode {
    #[serde(default)]
    pub part_id: Option<String>,

    #[serde(default)]
    pub mime_type: String,

    /// Gmail sends `""` for parts without a filename.
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub headers: Vec<Header>,

    #[serde(default)]
    pub body: Option<PartBody>,

    #[serde(default)]
    pub parts: Vec<BodyPartNode>,
}

impl BodyPartNode {
    /// Filename, treating an empty string as absent.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }

    /// Attachment id, treating an empty string as absent.
    pub fn attachment_id(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.attachment_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Inline base64 payload, if any.
    pub fn inline_data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Body of a MIME node: inline data and/or an attachment reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default)]
    pub attachment_id: Option<String>,

    #[serde(default)]
    pub size: u64,

    /// Base64 (URL-safe or standard alphabet) encoded content.
    #[serde(default)]
    pub data: Option<String>,
}

/// Everything the pipeline needs from one message, derived once by the
/// MIME walker and consumed by the resolver and renderers.
#[derive(Debug, Clone, Default)]
pub struct EmailData {
    /// Mail source identifier of the message.
    pub id: String,

    /// Subject line, empty when absent.
    pub subject: String,

    /// `From:` header value, empty when absent.
    pub sender: String,

    /// ISO-8601 timestamp of the `Date:` header; the raw header text when it
    /// cannot be parsed; the processing time when the header is missing.
    pub date: String,

    /// Decoded plain-text body (HTML tags stripped when only HTML exists).
    pub body: String,

    /// Attachments in document order.
    pub attachments: Vec<AttachmentDescriptor>,
}
