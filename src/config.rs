//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line argument
//! 2. `$REPORTRELAY_CONFIG` (environment variable)
//! 3. `~/.config/reportrelay/config.toml` (Linux/macOS)
//!    `%APPDATA%\reportrelay\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! Environment variables (optionally from a `.env` file) are applied on top
//! of whatever was loaded. The resulting [`Config`] is built once at process
//! start and passed by reference into the pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Largest accepted image width or height, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where report emails come from.
    pub mail: MailConfig,
    /// Where rendered reports are delivered.
    pub webhook: WebhookConfig,
    /// How reports are extracted and rendered.
    pub output: OutputConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Which mail source implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailSourceKind {
    /// Gmail REST API.
    Gmail,
    /// A local directory of `.eml` files.
    EmlDir,
}

/// Mail source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub source: MailSourceKind,
    /// Search query passed to the mail source.
    pub query: String,
    /// Upper bound on messages handled per run.
    pub max_messages: u32,
    /// Gmail user id ("me" for the authenticated account).
    pub user: String,
    /// Authorized-user OAuth credentials JSON for Gmail.
    pub credentials_path: Option<PathBuf>,
    /// Directory scanned by the `eml_dir` source.
    pub eml_dir: Option<PathBuf>,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Endpoint receiving JSON payloads.
    pub url: Option<String>,
    /// Endpoint receiving PNG uploads. Falls back to `url` when unset.
    pub image_url: Option<String>,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

/// Renderer variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    Image,
}

/// Which attachment kinds are considered, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    PdfThenCsv,
    CsvOnly,
}

/// Extraction and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub attachments: AttachmentPolicy,
    /// Prefix put in front of every formatted metric value.
    pub currency_symbol: String,
    pub image_width: u32,
    pub image_height: u32,
    /// Title used when the email has no subject.
    pub default_title: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            source: MailSourceKind::Gmail,
            query: "from:looker@yourdomain.com".to_string(),
            max_messages: 10,
            user: "me".to_string(),
            credentials_path: None,
            eml_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            attachments: AttachmentPolicy::PdfThenCsv,
            currency_symbol: "$".to_string(),
            image_width: 800,
            image_height: 600,
            default_title: "Looker Report".to_string(),
        }
    }
}

// ── Environment overrides ───────────────────────────────────────

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Numeric values that fail to parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TRMNL_WEBHOOK_URL") {
            self.webhook.url = Some(url);
        }
        if let Some(url) = lookup("TRMNL_IMAGE_WEBHOOK_URL") {
            self.webhook.image_url = Some(url);
        }
        if let Some(key) = lookup("TRMNL_API_KEY") {
            self.webhook.api_key = Some(key);
        }
        if let Some(query) = lookup("GMAIL_QUERY") {
            self.mail.query = query;
        }
        if let Some(path) = lookup("GMAIL_CREDENTIALS_PATH") {
            self.mail.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(n) = parse_env_number(&lookup, "MAX_EMAILS_PER_RUN") {
            self.mail.max_messages = n;
        }
        if let Some(n) = parse_env_number(&lookup, "IMAGE_WIDTH") {
            self.output.image_width = n;
        }
        if let Some(n) = parse_env_number(&lookup, "IMAGE_HEIGHT") {
            self.output.image_height = n;
        }
        if let Some(format) = lookup("OUTPUT_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => self.output.format = OutputFormat::Json,
                "image" | "png" => self.output.format = OutputFormat::Image,
                other => tracing::warn!(value = other, "Ignoring unknown OUTPUT_FORMAT"),
            }
        }
    }

    /// URL the chosen output format is delivered to.
    pub fn delivery_url(&self) -> Option<&str> {
        match self.output.format {
            OutputFormat::Json => self.webhook.url.as_deref(),
            OutputFormat::Image => self
                .webhook
                .image_url
                .as_deref()
                .or(self.webhook.url.as_deref()),
        }
    }

    /// Check everything a run needs before any message is touched.
    pub fn validate_for_run(&self) -> Result<()> {
        if self.delivery_url().is_none() {
            let var = match self.output.format {
                OutputFormat::Json => "TRMNL_WEBHOOK_URL",
                OutputFormat::Image => "TRMNL_IMAGE_WEBHOOK_URL",
            };
            return Err(RelayError::Config(format!(
                "{var} environment variable not set"
            )));
        }
        if self.mail.max_messages == 0 {
            return Err(RelayError::Config("max_messages must be at least 1".into()));
        }
        if self.output.image_width <= 80 || self.output.image_height <= 50 {
            return Err(RelayError::Config(format!(
                "image size {}x{} is too small",
                self.output.image_width, self.output.image_height
            )));
        }
        if self.output.image_width > MAX_IMAGE_DIMENSION
            || self.output.image_height > MAX_IMAGE_DIMENSION
        {
            return Err(RelayError::Config(format!(
                "image size {}x{} exceeds {MAX_IMAGE_DIMENSION}px",
                self.output.image_width, self.output.image_height
            )));
        }
        match self.mail.source {
            MailSourceKind::Gmail => {
                if let Some(ref path) = self.mail.credentials_path {
                    if !path.exists() {
                        return Err(RelayError::Config(format!(
                            "Gmail credentials file not found: {}",
                            path.display()
                        )));
                    }
                }
            }
            MailSourceKind::EmlDir => match self.mail.eml_dir {
                Some(ref dir) if dir.is_dir() => {}
                Some(ref dir) => {
                    return Err(RelayError::Config(format!(
                        "EML directory not found: {}",
                        dir.display()
                    )))
                }
                None => {
                    return Err(RelayError::Config(
                        "mail.eml_dir must be set for the eml_dir source".into(),
                    ))
                }
            },
        }
        Ok(())
    }

    /// A copy safe to print: secrets are replaced.
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        if copy.webhook.api_key.is_some() {
            copy.webhook.api_key = Some("********".to_string());
        }
        copy
    }
}

fn parse_env_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u32>() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring non-numeric override");
            None
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from `explicit` or the standard locations.
///
/// A missing file yields defaults. An explicit path that does not exist, or
/// any file that fails to parse, is a configuration error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(RelayError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            Some(p.to_path_buf())
        }
        None => config_file_path().filter(|p| p.exists()),
    };

    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| RelayError::io(&path, e))?;
    let cfg = toml::from_str::<Config>(&contents)
        .map_err(|e| RelayError::Config(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("REPORTRELAY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("reportrelay").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reportrelay")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.mail.max_messages, 10);
        assert_eq!(cfg.mail.user, "me");
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(cfg.output.image_width, 800);
        assert_eq!(cfg.output.image_height, 600);
        assert_eq!(cfg.output.currency_symbol, "$");
        assert!(cfg.webhook.url.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[mail]
query = "from:reports@example.com"

[output]
format = "image"
attachments = "csv_only"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.mail.query, "from:reports@example.com");
        assert_eq!(cfg.output.format, OutputFormat::Image);
        assert_eq!(cfg.output.attachments, AttachmentPolicy::CsvOnly);
        assert_eq!(cfg.mail.max_messages, 10);
        assert_eq!(cfg.output.default_title, "Looker Report");
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("TRMNL_WEBHOOK_URL", "https://usetrmnl.com/api/custom_plugins/abc"),
            ("TRMNL_API_KEY", "secret"),
            ("MAX_EMAILS_PER_RUN", "3"),
            ("IMAGE_WIDTH", "not-a-number"),
            ("OUTPUT_FORMAT", "png"),
        ]));
        assert_eq!(
            cfg.webhook.url.as_deref(),
            Some("https://usetrmnl.com/api/custom_plugins/abc")
        );
        assert_eq!(cfg.webhook.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.mail.max_messages, 3);
        assert_eq!(cfg.output.image_width, 800);
        assert_eq!(cfg.output.format, OutputFormat::Image);
    }

    #[test]
    fn test_validate_requires_webhook() {
        let cfg = Config::default();
        let err = cfg.validate_for_run().unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("TRMNL_WEBHOOK_URL"));
    }

    #[test]
    fn test_validate_image_size_bounds() {
        let mut cfg = Config::default();
        cfg.webhook.url = Some("https://example.com/hook".into());
        cfg.output.image_width = 100_000;
        cfg.output.image_height = 100_000;
        let err = cfg.validate_for_run().unwrap_err();
        assert!(err.to_string().contains("exceeds 4096px"));

        cfg.output.image_width = MAX_IMAGE_DIMENSION;
        cfg.output.image_height = MAX_IMAGE_DIMENSION;
        assert!(cfg.validate_for_run().is_ok());

        cfg.output.image_height = 40;
        assert!(cfg.validate_for_run().is_err());
    }

    #[test]
    fn test_image_output_falls_back_to_json_url() {
        let mut cfg = Config::default();
        cfg.output.format = OutputFormat::Image;
        cfg.webhook.url = Some("https://example.com/hook".into());
        assert_eq!(cfg.delivery_url(), Some("https://example.com/hook"));
        cfg.webhook.image_url = Some("https://example.com/image".into());
        assert_eq!(cfg.delivery_url(), Some("https://example.com/image"));
    }

    #[test]
    fn test_validate_missing_credentials_file() {
        let mut cfg = Config::default();
        cfg.webhook.url = Some("https://example.com/hook".into());
        cfg.mail.credentials_path = Some(PathBuf::from("/definitely/not/here.json"));
        let err = cfg.validate_for_run().unwrap_err();
        assert!(err.to_string().contains("credentials file not found"));
    }

    #[test]
    fn test_validate_eml_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.webhook.url = Some("https://example.com/hook".into());
        cfg.mail.source = MailSourceKind::EmlDir;
        assert!(cfg.validate_for_run().is_err());
        cfg.mail.eml_dir = Some(tmp.path().to_path_buf());
        assert!(cfg.validate_for_run().is_ok());
    }

    #[test]
    fn test_load_explicit_missing_is_error() {
        let err = load_config(Some(Path::new("/nope/config.toml"))).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[webhook]\nurl = \"https://example.com/hook\"\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.webhook.url.as_deref(), Some("https://example.com/hook"));
    }

    #[test]
    fn test_redacted_hides_api_key() {
        let mut cfg = Config::default();
        cfg.webhook.api_key = Some("secret".into());
        let shown = toml::to_string_pretty(&cfg.redacted()).unwrap();
        assert!(!shown.contains("secret"));
    }
}
