//! Attachment selection and the fallback chain that turns a message into a
//! grid: PDF attachment, then CSV attachment, then the body text.

use tracing::{debug, info, warn};

use crate::config::AttachmentPolicy;
use crate::error::Result;
use crate::extract::pdf::TextExtractor;
use crate::model::attachment::AttachmentDescriptor;
use crate::model::mail::EmailData;
use crate::model::report::Grid;
use crate::parser::table::{parse_delimited, ParseMode};
use crate::source::MailSource;

/// Find tabular data for `email`.
///
/// Download and extraction failures are logged and swallowed; each failure
/// falls through to the next candidate. Downloaded bytes are kept on the
/// attachment descriptor. Returns `None` when neither the attachments nor
/// the body contain a table.
pub async fn resolve(
    email: &mut EmailData,
    source: &dyn MailSource,
    extractor: &dyn TextExtractor,
    policy: AttachmentPolicy,
) -> Option<Grid> {
    if policy == AttachmentPolicy::PdfThenCsv {
        if let Some(idx) = email.attachments.iter().position(|a| a.is_pdf()) {
            let attachment = &mut email.attachments[idx];
            match parse_pdf(&email.id, attachment, source, extractor).await {
                Ok(grid) if !grid.is_empty() => {
                    info!(message_id = %email.id, rows = grid.len(), "Parsed PDF attachment");
                    return Some(grid);
                }
                Ok(_) => warn!(message_id = %email.id, "Could not extract table structure from PDF"),
                Err(e) => warn!(message_id = %email.id, error = %e, "Could not parse PDF attachment"),
            }
        }
    }

    if let Some(idx) = email.attachments.iter().position(|a| a.is_csv()) {
        let attachment = &mut email.attachments[idx];
        match parse_csv(&email.id, attachment, source).await {
            Ok(grid) if !grid.is_empty() => {
                info!(message_id = %email.id, rows = grid.len(), "Parsed CSV attachment");
                return Some(grid);
            }
            Ok(_) => warn!(message_id = %email.id, "CSV attachment is empty"),
            Err(e) => warn!(message_id = %email.id, error = %e, "Could not download CSV attachment"),
        }
    }

    if email.body.trim().is_empty() {
        return None;
    }
    let grid = parse_delimited(&email.body, ParseMode::Loose);
    if grid.is_empty() {
        debug!(message_id = %email.id, "No tabular data in body");
        None
    } else {
        info!(message_id = %email.id, rows = grid.len(), "Parsed table from body");
        Some(grid)
    }
}

async fn parse_pdf(
    message_id: &str,
    attachment: &mut AttachmentDescriptor,
    source: &dyn MailSource,
    extractor: &dyn TextExtractor,
) -> Result<Grid> {
    let bytes = content(message_id, attachment, source).await?;
    let text = extractor.extract(bytes)?;
    Ok(parse_delimited(&text, ParseMode::LoosePdf))
}

async fn parse_csv(
    message_id: &str,
    attachment: &mut AttachmentDescriptor,
    source: &dyn MailSource,
) -> Result<Grid> {
    let bytes = content(message_id, attachment, source).await?;
    let text = String::from_utf8_lossy(bytes);
    Ok(parse_delimited(text.trim_start_matches('\u{feff}'), ParseMode::Csv))
}

/// Attachment bytes, downloading them on first use.
async fn content<'a>(
    message_id: &str,
    attachment: &'a mut AttachmentDescriptor,
    source: &dyn MailSource,
) -> Result<&'a [u8]> {
    let bytes = match attachment.content.take() {
        Some(bytes) => bytes,
        None => {
            debug!(message_id, filename = %attachment.filename, "Downloading attachment");
            source
                .get_attachment(message_id, &attachment.attachment_id)
                .await?
        }
    };
    Ok(attachment.content.insert(bytes).as_slice())
}
