//! Reduce a grid to headline metrics and a chart series.

use tracing::debug;

use crate::model::report::{Grid, Metric, SeriesPoint};
use crate::report::format::{format_change, format_value, parse_number};

/// At most this many numeric columns become metrics.
pub const MAX_METRICS: usize = 4;
/// At most this many data rows become series points.
pub const MAX_SERIES: usize = 10;

/// Metrics and series derived from one grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    pub metrics: Vec<Metric>,
    pub series: Vec<SeriesPoint>,
}

impl Reduction {
    /// Substitute the "report received" placeholder when nothing was found.
    pub fn with_fallback(mut self) -> Self {
        if self.is_empty() {
            self.metrics.push(Metric::placeholder());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.series.is_empty()
    }
}

/// Reduce `grid` using `currency` as the value prefix.
///
/// Row 0 is the header row. A column is numeric when at least one data row
/// has a parseable cell at its index.
pub fn reduce(grid: &Grid, currency: &str) -> Reduction {
    let Some((headers, rows)) = grid.split_first() else {
        return Reduction::default();
    };

    let numeric: Vec<usize> = (0..headers.len())
        .filter(|&idx| rows.iter().any(|row| cell_number(row, idx).is_some()))
        .take(MAX_METRICS)
        .collect();

    let metrics: Vec<Metric> = numeric
        .iter()
        .filter_map(|&idx| column_metric(&headers[idx], rows, idx, currency))
        .collect();

    let mut series = Vec::new();
    if headers.len() >= 2 {
        let value_header = numeric
            .first()
            .map(|&idx| &headers[idx])
            .unwrap_or(&headers[1]);
        // first header with that name, which may precede a duplicate
        let value_idx = headers
            .iter()
            .position(|h| h == value_header)
            .unwrap_or(1);

        series = rows
            .iter()
            .take(MAX_SERIES)
            .map(|row| SeriesPoint {
                category: row
                    .first()
                    .filter(|c| !c.is_empty())
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                value: cell_number(row, value_idx).unwrap_or(0.0),
            })
            .collect();
    }

    debug!(
        columns = headers.len(),
        rows = rows.len(),
        metrics = metrics.len(),
        points = series.len(),
        "Reduced grid"
    );
    Reduction { metrics, series }
}

fn cell_number(row: &[String], idx: usize) -> Option<f64> {
    row.get(idx)
        .filter(|cell| !cell.is_empty())
        .and_then(|cell| parse_number(cell))
}

fn column_metric(header: &str, rows: &[Vec<String>], idx: usize, currency: &str) -> Option<Metric> {
    let values: Vec<f64> = rows.iter().filter_map(|row| cell_number(row, idx)).collect();
    let latest = *values.last()?;
    let previous = if values.len() > 1 {
        values[values.len() - 2]
    } else {
        latest
    };
    Some(Metric {
        label: header.to_string(),
        value: format_value(latest, currency),
        change: Some(format_change(latest, previous)),
    })
}
