//! Webhook sinks: where rendered payloads are delivered.

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::report::TrmnlPayload;
use crate::render::Rendered;

pub use http::HttpWebhookSink;

#[async_trait(?Send)]
pub trait WebhookSink {
    async fn send_json(&self, payload: &TrmnlPayload) -> Result<()>;
    async fn send_image(&self, bytes: Vec<u8>, filename: &str) -> Result<()>;
}

/// Deliver whichever payload kind the renderer produced.
pub async fn deliver(sink: &dyn WebhookSink, rendered: Rendered) -> Result<()> {
    match rendered {
        Rendered::Json(payload) => sink.send_json(&payload).await,
        Rendered::Png { bytes, filename } => sink.send_image(bytes, &filename).await,
    }
}
