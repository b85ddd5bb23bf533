//! Mail sources: where report emails are searched, fetched and marked read.
//!
//! The pipeline only talks to [`MailSource`]. Runs are single-threaded and
//! sequential, so the futures are not required to be `Send`.

pub mod eml;
pub mod gmail;

use async_trait::async_trait;

use crate::config::{Config, MailSourceKind};
use crate::error::{RelayError, Result};
use crate::model::mail::RawMessage;

/// Search, fetch and housekeeping operations over a mailbox.
#[async_trait(?Send)]
pub trait MailSource {
    /// Ids of messages matching `query`, at most `max_results`, in the
    /// order the mailbox returns them.
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>>;

    /// Full message including the MIME tree.
    async fn get_full(&self, message_id: &str) -> Result<RawMessage>;

    /// Decoded bytes of one attachment.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;

    /// Mark a message as read so later searches skip it.
    async fn mark_read(&self, message_id: &str) -> Result<()>;
}

/// Build the mail source selected by `config`.
pub async fn from_config(config: &Config) -> Result<Box<dyn MailSource>> {
    match config.mail.source {
        MailSourceKind::Gmail => {
            let source = gmail::GmailSource::connect(&config.mail).await?;
            Ok(Box::new(source))
        }
        MailSourceKind::EmlDir => {
            let dir = config.mail.eml_dir.clone().ok_or_else(|| {
                RelayError::Config("mail.eml_dir must be set for the eml_dir source".into())
            })?;
            Ok(Box::new(eml::EmlDirSource::new(dir)))
        }
    }
}
