//! Gmail REST v1 mail source.
//!
//! Authenticates with a bearer token taken from `GMAIL_ACCESS_TOKEN` or
//! refreshed once at startup from an authorized-user credentials file.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::MailConfig;
use crate::error::{RelayError, Result};
use crate::model::mail::RawMessage;
use crate::parser::mime::decode_base64;
use crate::source::MailSource;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    data: String,
}

/// Authorized-user credentials as written by `gcloud auth` and the OAuth
/// installed-app flow.
#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

// ============================================================================
// Source
// ============================================================================

/// Gmail mailbox of one user.
pub struct GmailSource {
    client: reqwest::Client,
    base_url: String,
    user: String,
    access_token: String,
}

impl GmailSource {
    pub fn new(access_token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GMAIL_API_BASE.to_string(),
            user: user.into(),
            access_token: access_token.into(),
        }
    }

    /// Resolve an access token from the environment or the credentials file.
    pub async fn connect(config: &MailConfig) -> Result<Self> {
        if let Some(token) = std::env::var("GMAIL_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
        {
            debug!("Using access token from GMAIL_ACCESS_TOKEN");
            return Ok(Self::new(token.trim(), &config.user));
        }

        let path = config.credentials_path.as_deref().ok_or_else(|| {
            RelayError::Auth(
                "no Gmail credentials: set GMAIL_ACCESS_TOKEN or GMAIL_CREDENTIALS_PATH".into(),
            )
        })?;
        let creds = read_credentials(path)?;
        let client = reqwest::Client::new();
        let token = refresh_access_token(&client, &creds).await?;
        info!(user = %config.user, "Refreshed Gmail access token");
        Ok(Self {
            client,
            base_url: GMAIL_API_BASE.to_string(),
            user: config.user.clone(),
            access_token: token,
        })
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, self.user, tail)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait(?Send)]
impl MailSource for GmailSource {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let max = max_results.to_string();
        let list: MessageListResponse = self
            .get_json(&self.url("messages"), &[("q", query), ("maxResults", &max)])
            .await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_full(&self, message_id: &str) -> Result<RawMessage> {
        self.get_json(
            &self.url(&format!("messages/{message_id}")),
            &[("format", "full")],
        )
        .await
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let body: AttachmentResponse = self
            .get_json(
                &self.url(&format!("messages/{message_id}/attachments/{attachment_id}")),
                &[],
            )
            .await?;
        decode_base64(&body.data)
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("messages/{message_id}/modify")))
            .bearer_auth(&self.access_token)
            .json(&json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Map 401 to an auth error and any other non-2xx to `MailApi`.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), body))
}

fn api_error(status: u16, body: String) -> RelayError {
    if status == 401 {
        RelayError::Auth(format!("Gmail rejected the access token: {body}"))
    } else {
        RelayError::MailApi {
            status,
            message: body,
        }
    }
}

fn read_credentials(path: &Path) -> Result<AuthorizedUser> {
    let text = std::fs::read_to_string(path).map_err(|e| RelayError::io(path, e))?;
    let creds: AuthorizedUser = serde_json::from_str(&text)?;
    if creds.kind.as_deref() == Some("service_account") {
        return Err(RelayError::Auth(
            "service account credentials are not supported; use an authorized-user file or GMAIL_ACCESS_TOKEN".into(),
        ));
    }
    if creds.client_id.is_empty() || creds.refresh_token.is_none() {
        return Err(RelayError::Auth(format!(
            "{} lacks client_id or refresh_token",
            path.display()
        )));
    }
    Ok(creds)
}

async fn refresh_access_token(client: &reqwest::Client, creds: &AuthorizedUser) -> Result<String> {
    let refresh_token = creds.refresh_token.as_deref().unwrap_or_default();
    let mut form = vec![
        ("client_id", creds.client_id.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = creds.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }
    let token_uri = creds.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);

    let resp = client.post(token_uri).form(&form).send().await?;
    let status = resp.status();
    let body_text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(RelayError::Auth(format!(
            "token refresh failed: HTTP {}: {}",
            status.as_u16(),
            body_text
        )));
    }
    let body: serde_json::Value = serde_json::from_str(&body_text)?;
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RelayError::Auth("No access_token in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let src = GmailSource {
            base_url: "http://localhost:9000".into(),
            ..GmailSource::new("tok", "me")
        };
        assert_eq!(
            src.url("messages/abc/modify"),
            "http://localhost:9000/users/me/messages/abc/modify"
        );
        let default = GmailSource::new("tok", "reports@example.com");
        assert_eq!(
            default.url("messages"),
            "https://gmail.googleapis.com/gmail/v1/users/reports@example.com/messages"
        );
    }

    #[test]
    fn test_api_error_mapping() {
        assert!(matches!(api_error(401, "expired".into()), RelayError::Auth(_)));
        match api_error(404, "not found".into()) {
            RelayError::MailApi { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_list_response_without_messages() {
        let list: MessageListResponse = serde_json::from_str(r#"{"resultSizeEstimate":0}"#).unwrap();
        assert!(list.messages.is_empty());
    }

    #[test]
    fn test_full_message_deserializes() {
        let raw: RawMessage = serde_json::from_str(
            r#"{
                "id": "18c1",
                "threadId": "18c1",
                "payload": {
                    "mimeType": "multipart/mixed",
                    "headers": [{"name": "Subject", "value": "Weekly Sales"}],
                    "parts": [
                        {"mimeType": "text/plain", "body": {"size": 2, "data": "SGk"}},
                        {"mimeType": "text/csv", "filename": "sales.csv",
                         "body": {"attachmentId": "ANGjdJ8", "size": 120}}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(raw.headers()[0].value, "Weekly Sales");
        assert_eq!(raw.payload.parts[1].attachment_id(), Some("ANGjdJ8"));
    }

    #[test]
    fn test_credentials_validation() {
        let dir = tempfile::tempdir().unwrap();

        let sa = dir.path().join("sa.json");
        std::fs::write(&sa, r#"{"type":"service_account","client_id":"x"}"#).unwrap();
        assert!(matches!(read_credentials(&sa), Err(RelayError::Auth(_))));

        let partial = dir.path().join("partial.json");
        std::fs::write(&partial, r#"{"type":"authorized_user","client_id":"x"}"#).unwrap();
        assert!(matches!(read_credentials(&partial), Err(RelayError::Auth(_))));

        let ok = dir.path().join("user.json");
        std::fs::write(
            &ok,
            r#"{"type":"authorized_user","client_id":"x","client_secret":"s","refresh_token":"r"}"#,
        )
        .unwrap();
        let creds = read_credentials(&ok).unwrap();
        assert_eq!(creds.refresh_token.as_deref(), Some("r"));
        assert!(creds.token_uri.is_none());
    }
}
