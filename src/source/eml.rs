//! A directory of `.eml` files acting as a mailbox.
//!
//! Message ids are file names. Reading a message marks it by renaming
//! `x.eml` to `x.eml.read`, which later searches skip.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::model::mail::RawMessage;
use crate::parser::eml::{attachment_bytes, parse_eml_message};
use crate::parser::header::header_value;
use crate::source::MailSource;

pub const READ_SUFFIX: &str = ".read";

/// Mailbox backed by a local directory.
#[derive(Debug, Clone)]
pub struct EmlDirSource {
    dir: PathBuf,
}

impl EmlDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_of(&self, message_id: &str) -> Result<PathBuf> {
        if message_id.is_empty()
            || message_id.contains(['/', '\\'])
            || message_id.starts_with('.')
        {
            return Err(RelayError::MimeError(format!(
                "invalid message id '{message_id}'"
            )));
        }
        Ok(self.dir.join(message_id))
    }

    async fn read(&self, message_id: &str) -> Result<Vec<u8>> {
        let path = self.path_of(message_id)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::FileNotFound(path)
            } else {
                RelayError::io(path, e)
            }
        })
    }

    /// Unread `.eml` file names, sorted.
    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RelayError::io(&self.dir, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RelayError::io(&self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase().ends_with(".eml") && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait(?Send)]
impl MailSource for EmlDirSource {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let filter = QueryFilter::parse(query);
        let mut hits = Vec::new();
        for name in self.list().await? {
            if hits.len() >= max_results as usize {
                break;
            }
            let data = match self.read(&name).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable message");
                    continue;
                }
            };
            let raw = match parse_eml_message(&name, &data) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unparseable message");
                    continue;
                }
            };
            let subject = header_value(raw.headers(), "Subject").unwrap_or_default();
            let sender = header_value(raw.headers(), "From").unwrap_or_default();
            if filter.matches(subject, sender) {
                hits.push(name);
            }
        }
        debug!(dir = %self.dir.display(), query, hits = hits.len(), "Searched EML directory");
        Ok(hits)
    }

    async fn get_full(&self, message_id: &str) -> Result<RawMessage> {
        let data = self.read(message_id).await?;
        parse_eml_message(message_id, &data)
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let data = self.read(message_id).await?;
        attachment_bytes(message_id, &data, attachment_id)
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        let from = self.path_of(message_id)?;
        let to = self.dir.join(format!("{message_id}{READ_SUFFIX}"));
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| RelayError::io(from, e))
    }
}

/// Gmail-flavoured query subset: `from:x` and `subject:x` tokens plus bare
/// terms, all substring matches ignoring case. Bare terms match the subject.
#[derive(Debug, Default, PartialEq)]
struct QueryFilter {
    from: Vec<String>,
    subject: Vec<String>,
}

impl QueryFilter {
    fn parse(query: &str) -> Self {
        let mut filter = Self::default();
        for token in query.split_whitespace() {
            let lower = token.to_lowercase();
            if let Some(v) = lower.strip_prefix("from:") {
                filter.from.push(v.to_string());
            } else if let Some(v) = lower.strip_prefix("subject:") {
                filter.subject.push(v.to_string());
            } else {
                filter.subject.push(lower);
            }
        }
        filter
    }

    fn matches(&self, subject: &str, sender: &str) -> bool {
        let subject = subject.to_lowercase();
        let sender = sender.to_lowercase();
        self.from.iter().all(|t| sender.contains(t.as_str()))
            && self.subject.iter().all(|t| subject.contains(t.as_str()))
    }
}
