//! Webhook delivery over HTTP.

use async_trait::async_trait;
use reqwest::multipart;
use tracing::info;

use crate::config::WebhookConfig;
use crate::error::{RelayError, Result};
use crate::model::report::TrmnlPayload;
use crate::sink::WebhookSink;

/// Posts payloads to TRMNL-style webhook URLs.
pub struct HttpWebhookSink {
    client: reqwest::Client,
    json_url: Option<String>,
    image_url: Option<String>,
    api_key: Option<String>,
}

impl HttpWebhookSink {
    pub fn new(
        json_url: Option<String>,
        image_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            json_url,
            image_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Image uploads go to `image_url`, falling back to `url`.
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(
            config.url.clone(),
            config.image_url.clone().or_else(|| config.url.clone()),
            config.api_key.clone(),
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait(?Send)]
impl WebhookSink for HttpWebhookSink {
    async fn send_json(&self, payload: &TrmnlPayload) -> Result<()> {
        let url = self
            .json_url
            .as_deref()
            .ok_or_else(|| RelayError::Config("TRMNL_WEBHOOK_URL environment variable not set".into()))?;
        let resp = self
            .authorize(self.client.post(url).json(payload))
            .send()
            .await?;
        let status = check_status(resp).await?;
        info!(status, metrics = payload.metrics.len(), "Sent payload to webhook");
        Ok(())
    }

    async fn send_image(&self, bytes: Vec<u8>, filename: &str) -> Result<()> {
        let url = self.image_url.as_deref().ok_or_else(|| {
            RelayError::Config("TRMNL_IMAGE_WEBHOOK_URL environment variable not set".into())
        })?;
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/png")?;
        let form = multipart::Form::new().part("image", part);
        let resp = self
            .authorize(self.client.post(url).multipart(form))
            .send()
            .await?;
        let status = check_status(resp).await?;
        info!(status, bytes = size, filename, "Sent image to webhook");
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<u16> {
    let status = resp.status();
    if status.is_success() {
        return Ok(status.as_u16());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RelayError::Webhook {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_image_fallback() {
        let cfg = WebhookConfig {
            url: Some("https://hooks.example/json".into()),
            image_url: None,
            api_key: Some(String::new()),
        };
        let sink = HttpWebhookSink::from_config(&cfg);
        assert_eq!(sink.image_url.as_deref(), Some("https://hooks.example/json"));
        assert!(sink.api_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let sink = HttpWebhookSink::new(None, None, None);
        let payload = crate::render::build_payload(None, None, &[], &[]);
        assert!(matches!(
            sink.send_json(&payload).await,
            Err(RelayError::Config(_))
        ));
        assert!(matches!(
            sink.send_image(vec![1, 2, 3], "r.png").await,
            Err(RelayError::Config(_))
        ));
    }
}
