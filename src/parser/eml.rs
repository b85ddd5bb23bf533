//! Conversion of `.eml` files (RFC 5322 messages) into [`RawMessage`] trees.
//!
//! Local messages are mapped onto the same shape the Gmail API returns so
//! the rest of the pipeline cannot tell them apart: text leaves carry
//! base64 inline data, attachments are referenced by MIME part index.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{RelayError, Result};
use crate::model::mail::{BodyPartNode, Header, PartBody, RawMessage};
use crate::parser::mime::{encode_base64, MAX_DEPTH};

/// Parse a complete raw message into a [`RawMessage`] with id `id`.
pub fn parse_eml_message(id: &str, data: &[u8]) -> Result<RawMessage> {
    let msg = parse(id, data)?;

    let mut headers = Vec::new();
    if let Some(subject) = msg.subject() {
        headers.push(Header::new("Subject", subject));
    }
    if let Some(from) = msg.from().and_then(|a| a.first()) {
        let address = from.address().unwrap_or_default();
        let value = match from.name() {
            Some(name) if !name.is_empty() => format!("{name} <{address}>"),
            _ => address.to_string(),
        };
        headers.push(Header::new("From", value));
    }
    if let Some(date) = msg.date() {
        headers.push(Header::new("Date", date.to_rfc3339()));
    }

    let mut payload = convert_part(&msg, 0, 0);
    payload.headers = headers;

    Ok(RawMessage {
        id: id.to_string(),
        thread_id: None,
        payload,
    })
}

/// Decoded content of the part referenced by `attachment_id`.
pub fn attachment_bytes(id: &str, data: &[u8], attachment_id: &str) -> Result<Vec<u8>> {
    let index: usize = attachment_id.parse().map_err(|_| {
        RelayError::MimeError(format!("invalid attachment id '{attachment_id}' in {id}"))
    })?;
    let msg = parse(id, data)?;
    msg.parts
        .get(index)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| {
            RelayError::MimeError(format!("attachment {attachment_id} not found in {id}"))
        })
}

fn parse<'x>(id: &str, data: &'x [u8]) -> Result<Message<'x>> {
    MessageParser::default()
        .parse(data)
        .ok_or_else(|| RelayError::MimeError(format!("failed to parse message {id}")))
}

fn convert_part(msg: &Message<'_>, index: usize, depth: usize) -> BodyPartNode {
    let Some(part) = msg.parts.get(index) else {
        return BodyPartNode::default();
    };

    let filename = part.attachment_name().map(String::from);
    let mut node = BodyPartNode {
        part_id: Some(index.to_string()),
        mime_type: content_type_of(part),
        filename: filename.clone(),
        ..Default::default()
    };

    match &part.body {
        PartType::Multipart(children) => {
            if depth < MAX_DEPTH {
                node.parts = children
                    .iter()
                    .map(|&child| convert_part(msg, child as usize, depth + 1))
                    .collect();
            }
        }
        PartType::Text(text) | PartType::Html(text) if filename.is_none() => {
            node.body = Some(PartBody {
                attachment_id: None,
                size: text.len() as u64,
                data: Some(encode_base64(text.as_bytes())),
            });
        }
        _ => {
            node.body = Some(PartBody {
                attachment_id: Some(index.to_string()),
                size: part.contents().len() as u64,
                data: None,
            });
        }
    }
    node
}

fn content_type_of(part: &MessagePart<'_>) -> String {
    if let Some(ct) = part.content_type() {
        let main = ct.ctype().to_ascii_lowercase();
        return match ct.subtype() {
            Some(sub) => format!("{main}/{}", sub.to_ascii_lowercase()),
            None => main,
        };
    }
    match part.body {
        PartType::Text(_) => "text/plain",
        PartType::Html(_) => "text/html",
        PartType::Multipart(_) => "multipart/mixed",
        PartType::Message(_) => "message/rfc822",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::build_email_data;

    const MULTIPART: &str = "From: Looker <looker@example.com>\r\n\
Subject: Weekly Sales\r\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Your report is attached.\r\n\
--XYZ\r\n\
Content-Type: text/csv; name=\"sales.csv\"\r\n\
Content-Disposition: attachment; filename=\"sales.csv\"\r\n\
\r\n\
Region,Sales\r\n\
East,100\r\n\
--XYZ--\r\n";

    #[test]
    fn test_parse_eml_headers_and_tree() {
        let raw = parse_eml_message("weekly.eml", MULTIPART.as_bytes()).unwrap();
        let email = build_email_data(&raw);
        assert_eq!(email.id, "weekly.eml");
        assert_eq!(email.subject, "Weekly Sales");
        assert_eq!(email.sender, "Looker <looker@example.com>");
        assert_eq!(email.date, "2024-01-04T10:00:00.000Z");
        assert!(email.body.contains("Your report is attached."));
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "sales.csv");
        assert!(email.attachments[0].is_csv());
    }

    #[test]
    fn test_attachment_bytes_by_part_index() {
        let raw = parse_eml_message("weekly.eml", MULTIPART.as_bytes()).unwrap();
        let email = build_email_data(&raw);
        let id = &email.attachments[0].attachment_id;
        let bytes = attachment_bytes("weekly.eml", MULTIPART.as_bytes(), id).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("East,100"));
    }

    #[test]
    fn test_attachment_bytes_bad_id() {
        assert!(attachment_bytes("weekly.eml", MULTIPART.as_bytes(), "x").is_err());
        assert!(attachment_bytes("weekly.eml", MULTIPART.as_bytes(), "99").is_err());
    }
}
