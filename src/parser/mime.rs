//! MIME tree traversal: body text extraction and attachment listing.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::attachment::AttachmentDescriptor;
use crate::model::mail::{BodyPartNode, EmailData, RawMessage};
use crate::parser::header::{header_value, normalize_date};
use crate::parser::table::{parse_delimited, ParseMode};

/// Maximum depth for recursive multipart descent (to prevent stack overflow
/// on adversarial input).
pub const MAX_DEPTH: usize = 50;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// State collected while walking one message.
#[derive(Debug, Default)]
pub struct WalkAccumulator {
    /// Concatenated `text/plain` leaves.
    pub plain: String,
    /// Concatenated `text/html` leaves, tags already stripped.
    pub html: String,
    pub attachments: Vec<AttachmentDescriptor>,
}

impl WalkAccumulator {
    /// Body text. Plain text wins when it already holds a loose table;
    /// otherwise the stripped HTML follows it.
    pub fn body(&self) -> String {
        if self.plain.trim().is_empty() {
            return self.html.clone();
        }
        if self.html.trim().is_empty()
            || !parse_delimited(&self.plain, ParseMode::Loose).is_empty()
        {
            return self.plain.clone();
        }
        let mut body = self.plain.clone();
        append_text(&mut body, &self.html);
        body
    }
}

/// Build [`EmailData`] from a raw message: headers plus a full walk of the
/// body tree.
pub fn build_email_data(raw: &RawMessage) -> EmailData {
    let headers = raw.headers();

    let mut acc = WalkAccumulator::default();
    walk(&raw.payload, &mut acc);

    let body = acc.body();
    EmailData {
        id: raw.id.clone(),
        subject: header_value(headers, "Subject")
            .unwrap_or_default()
            .to_string(),
        sender: header_value(headers, "From").unwrap_or_default().to_string(),
        date: normalize_date(header_value(headers, "Date")),
        body,
        attachments: acc.attachments,
    }
}

/// Walk `node` depth-first in document order.
///
/// Any node carrying inline `text/plain` or `text/html` data contributes to
/// the body, whether or not it also has children. Any node with a filename
/// and an attachment id is recorded as an attachment.
pub fn walk(node: &BodyPartNode, acc: &mut WalkAccumulator) {
    walk_at(node, acc, 0);
}

fn walk_at(node: &BodyPartNode, acc: &mut WalkAccumulator, depth: usize) {
    if depth > MAX_DEPTH {
        warn!(depth, "MIME tree too deep, not descending further");
        return;
    }

    let decoded = node.inline_data().and_then(|data| match decode_base64(data) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(mime_type = %node.mime_type, error = %e, "Skipping undecodable part");
            None
        }
    });

    if let Some(ref bytes) = decoded {
        let mime = node.mime_type.to_ascii_lowercase();
        if mime.starts_with("text/plain") {
            append_text(&mut acc.plain, &String::from_utf8_lossy(bytes));
        } else if mime.starts_with("text/html") {
            append_text(&mut acc.html, &strip_html(&String::from_utf8_lossy(bytes)));
        }
    }

    if let (Some(filename), Some(attachment_id)) = (node.filename(), node.attachment_id()) {
        debug!(filename, mime_type = %node.mime_type, "Found attachment");
        acc.attachments.push(AttachmentDescriptor {
            filename: filename.to_string(),
            mime_type: node.mime_type.clone(),
            attachment_id: attachment_id.to_string(),
            content: decoded,
        });
    }

    for part in &node.parts {
        walk_at(part, acc, depth + 1);
    }
}

fn append_text(target: &mut String, text: &str) {
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(text);
}

/// Remove every `<...>` sequence and decode the common HTML entities.
pub fn strip_html(html: &str) -> String {
    let stripped = HTML_TAG.replace_all(html, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Decode base64 in either the URL-safe or the standard alphabet, with or
/// without padding. Gmail uses URL-safe encoding; other sources do not.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    Ok(base64::engine::general_purpose::STANDARD_NO_PAD.decode(normalized)?)
}

/// Encode bytes the way Gmail does (URL-safe alphabet, no padding).
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
