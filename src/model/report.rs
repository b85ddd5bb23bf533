//! Tabular data and the metrics payload derived from it.

use serde::{Deserialize, Serialize};

/// Rows of string cells. Row 0 is the header row by convention.
///
/// Rows are not padded: consumers must index defensively.
pub type Grid = Vec<Vec<String>>;

/// One labeled latest-value-plus-change summary of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    /// Signed percent change such as `"+12.5%"`; `null` when no comparison
    /// exists.
    pub change: Option<String>,
}

impl Metric {
    /// The single metric emitted when a report carried no usable numbers.
    pub fn placeholder() -> Self {
        Self {
            label: "Status".to_string(),
            value: "Report Received".to_string(),
            change: None,
        }
    }
}

/// One category/value pair of the visualization series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub category: String,
    pub value: f64,
}

/// JSON body delivered to the TRMNL webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrmnlPayload {
    pub report_title: String,
    pub timestamp: String,
    pub metrics: Vec<Metric>,
    pub data: Vec<SeriesPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_shape() {
        let payload = TrmnlPayload {
            report_title: "Weekly Sales".into(),
            timestamp: "2024-01-04T10:00:00.000Z".into(),
            metrics: vec![Metric::placeholder()],
            data: vec![SeriesPoint {
                category: "East".into(),
                value: 12.5,
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["report_title"], "Weekly Sales");
        assert_eq!(json["metrics"][0]["label"], "Status");
        assert_eq!(json["metrics"][0]["value"], "Report Received");
        assert!(json["metrics"][0]["change"].is_null());
        assert_eq!(json["data"][0]["category"], "East");
        assert_eq!(json["data"][0]["value"], 12.5);
    }
}
