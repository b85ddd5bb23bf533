//! Attachment descriptors.
//!
//! A descriptor references bytes held by the mail source; the content is
//! only fetched when the resolver picks this attachment.

/// Metadata about an email attachment, plus its content once resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentDescriptor {
    /// Filename as declared by the message.
    pub filename: String,

    /// MIME type (e.g. `"text/csv"`, `"application/pdf"`).
    pub mime_type: String,

    /// Reference into the mail source, not ownership of the bytes.
    pub attachment_id: String,

    /// Decoded bytes, present when the message carried them inline or after
    /// the resolver downloaded them.
    pub content: Option<Vec<u8>>,
}

impl AttachmentDescriptor {
    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("application/pdf")
            || self.filename.to_ascii_lowercase().ends_with(".pdf")
    }

    pub fn is_csv(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("text/csv")
            || self.filename.to_ascii_lowercase().ends_with(".csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(filename: &str, mime_type: &str) -> AttachmentDescriptor {
        AttachmentDescriptor {
            filename: filename.into(),
            mime_type: mime_type.into(),
            attachment_id: "att".into(),
            content: None,
        }
    }

    #[test]
    fn test_kind_by_mime_or_extension() {
        assert!(descriptor("report", "application/pdf").is_pdf());
        assert!(descriptor("Report.PDF", "application/octet-stream").is_pdf());
        assert!(descriptor("data.csv", "application/octet-stream").is_csv());
        assert!(descriptor("data", "text/csv").is_csv());
        assert!(!descriptor("logo.png", "image/png").is_csv());
        assert!(!descriptor("logo.png", "image/png").is_pdf());
    }
}
