//! The run loop: search once, then fetch, extract, render, deliver and mark
//! each message read, strictly one after another.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::extract::pdf::TextExtractor;
use crate::extract::resolver::resolve;
use crate::parser::mime::build_email_data;
use crate::render::PayloadRenderer;
use crate::sink::{deliver, WebhookSink};
use crate::source::MailSource;

/// Per-message step that failed.
///
/// Extraction and mark-read problems are logged and never fail a message,
/// so they have no stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Rendering,
    Delivering,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Fetching => "fetching",
            Stage::Rendering => "rendering",
            Stage::Delivering => "delivering",
        };
        f.write_str(s)
    }
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageOutcome {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals and per-message outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Messages delivered successfully.
    pub processed: usize,
    pub failed: usize,
    pub messages: Vec<MessageOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: MessageOutcome) {
        if outcome.success {
            self.processed += 1;
        } else {
            self.failed += 1;
        }
        self.messages.push(outcome);
    }
}

/// Wires a mail source, extractor, renderer and sink into one run.
pub struct Orchestrator<'a> {
    pub config: &'a Config,
    pub source: &'a dyn MailSource,
    pub sink: &'a dyn WebhookSink,
    pub extractor: &'a dyn TextExtractor,
    pub renderer: &'a dyn PayloadRenderer,
    /// Render but neither deliver nor mark read.
    pub dry_run: bool,
}

impl<'a> Orchestrator<'a> {
    /// Search once and process every hit in order.
    ///
    /// A failed search aborts the run; per-message failures are recorded in
    /// the summary. `progress` is called with `(done, total)` after each
    /// message.
    pub async fn run(&self, progress: Option<&dyn Fn(usize, usize)>) -> Result<RunSummary> {
        let query = self.config.mail.query.as_str();
        info!(query, max = self.config.mail.max_messages, "Searching for emails");
        let ids = self
            .source
            .search(query, self.config.mail.max_messages)
            .await?;

        let mut summary = RunSummary::default();
        if ids.is_empty() {
            info!("No new emails found");
            return Ok(summary);
        }
        info!(count = ids.len(), "Found email(s)");

        let total = ids.len();
        for (i, id) in ids.iter().enumerate() {
            let outcome = self.process_message(id).await;
            summary.record(outcome);
            if let Some(cb) = progress {
                cb(i + 1, total);
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "Run finished"
        );
        Ok(summary)
    }

    /// Run the per-message pipeline for `message_id`. Never fails: errors
    /// are captured in the returned outcome.
    pub async fn process_message(&self, message_id: &str) -> MessageOutcome {
        let mut subject = None;
        match self.deliver_message(message_id, &mut subject).await {
            Ok(()) => {
                if !self.dry_run {
                    if let Err(e) = self.source.mark_read(message_id).await {
                        warn!(message_id, error = %e, "Could not mark email as read");
                    }
                }
                info!(message_id, subject = subject.as_deref().unwrap_or(""), "Processed email");
                MessageOutcome {
                    message_id: message_id.to_string(),
                    subject,
                    success: true,
                    stage: None,
                    error: None,
                }
            }
            Err((stage, e)) => {
                error!(message_id, %stage, error = %e, "Error processing message");
                MessageOutcome {
                    message_id: message_id.to_string(),
                    subject,
                    success: false,
                    stage: Some(stage),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn deliver_message(
        &self,
        message_id: &str,
        subject: &mut Option<String>,
    ) -> std::result::Result<(), (Stage, RelayError)> {
        let raw = self
            .source
            .get_full(message_id)
            .await
            .map_err(|e| (Stage::Fetching, e))?;
        let mut email = build_email_data(&raw);
        if !email.subject.is_empty() {
            *subject = Some(email.subject.clone());
        }

        let grid = resolve(
            &mut email,
            self.source,
            self.extractor,
            self.config.output.attachments,
        )
        .await;

        let rendered = self
            .renderer
            .render(&email, grid.as_ref())
            .map_err(|e| (Stage::Rendering, e))?;

        if self.dry_run {
            info!(message_id, "Dry run: skipping delivery");
            return Ok(());
        }
        deliver(self.sink, rendered)
            .await
            .map_err(|e| (Stage::Delivering, e))
    }
}
