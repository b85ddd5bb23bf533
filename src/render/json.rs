//! JSON payload rendering.

use crate::error::Result;
use crate::model::mail::EmailData;
use crate::model::report::{Grid, Metric, SeriesPoint, TrmnlPayload};
use crate::parser::header::now_iso;
use crate::render::{PayloadRenderer, Rendered};
use crate::report::reduce;

pub const DEFAULT_TITLE: &str = "Looker Report";

/// Assemble a payload, defaulting a missing title and timestamp.
pub fn build_payload(
    title: Option<&str>,
    timestamp: Option<&str>,
    metrics: &[Metric],
    series: &[SeriesPoint],
) -> TrmnlPayload {
    TrmnlPayload {
        report_title: title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        timestamp: timestamp
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(now_iso),
        metrics: metrics.to_vec(),
        data: series.to_vec(),
    }
}

/// Reduces the grid and emits the metrics payload.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    pub currency: String,
    pub default_title: String,
}

impl JsonRenderer {
    pub fn new(currency: impl Into<String>, default_title: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            default_title: default_title.into(),
        }
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new("$", DEFAULT_TITLE)
    }
}

impl PayloadRenderer for JsonRenderer {
    fn render(&self, email: &EmailData, grid: Option<&Grid>) -> Result<Rendered> {
        let reduction = grid
            .map(|g| reduce(g, &self.currency))
            .unwrap_or_default()
            .with_fallback();
        let title = if email.subject.is_empty() {
            &self.default_title
        } else {
            &email.subject
        };
        Ok(Rendered::Json(build_payload(
            Some(title),
            Some(&email.date),
            &reduction.metrics,
            &reduction.series,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload_defaults() {
        let p = build_payload(None, None, &[], &[]);
        assert_eq!(p.report_title, "Looker Report");
        assert!(p.timestamp.ends_with('Z'));
        // millisecond precision: 2024-01-04T10:00:00.000Z
        assert_eq!(p.timestamp.len(), 24);
        assert!(p.metrics.is_empty());
    }

    #[test]
    fn test_build_payload_copies_input() {
        let metrics = vec![Metric::placeholder()];
        let series = vec![SeriesPoint {
            category: "East".into(),
            value: 3.0,
        }];
        let p = build_payload(Some("Sales"), Some("2024-01-04T10:00:00.000Z"), &metrics, &series);
        assert_eq!(p.report_title, "Sales");
        assert_eq!(p.timestamp, "2024-01-04T10:00:00.000Z");
        assert_eq!(p.metrics, metrics);
        assert_eq!(p.data, series);
    }

    #[test]
    fn test_renderer_without_grid_uses_placeholder() {
        let email = EmailData {
            subject: "Daily KPIs".into(),
            date: "2024-01-04T10:00:00.000Z".into(),
            ..Default::default()
        };
        let Rendered::Json(p) = JsonRenderer::default().render(&email, None).unwrap() else {
            panic!("expected JSON");
        };
        assert_eq!(p.report_title, "Daily KPIs");
        assert_eq!(p.metrics, vec![Metric::placeholder()]);
        assert!(p.data.is_empty());
    }

    #[test]
    fn test_renderer_currency_and_title() {
        let grid = vec![
            vec!["Day".to_string(), "Revenue".to_string()],
            vec!["Mon".to_string(), "2500".to_string()],
        ];
        let renderer = JsonRenderer::new("€", "Untitled");
        let Rendered::Json(p) = renderer.render(&EmailData::default(), Some(&grid)).unwrap() else {
            panic!("expected JSON");
        };
        assert_eq!(p.report_title, "Untitled");
        assert_eq!(p.metrics[0].value, "€2.5K");
        assert_eq!(p.data.len(), 1);
    }
}
