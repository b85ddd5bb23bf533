//! Number parsing and display formatting for metric values.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

/// Parse the leading number of a cell: `"12.5%"` is 12.5, `"abc"` is `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let m = LEADING_NUMBER.find(cell.trim())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Compact currency display: `$1.2M`, `$3.4K`, `$999`, `$-1.5K`.
pub fn format_value(value: f64, currency: &str) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{currency}{:.1}M", round_to(value / 1_000_000.0, 1))
    } else if abs >= 1_000.0 {
        format!("{currency}{:.1}K", round_to(value / 1_000.0, 1))
    } else {
        format!("{currency}{:.0}", round_to(value, 0))
    }
}

/// Relative change from `previous` to `latest`, e.g. `+12.5%` or `-3.0%`.
///
/// A zero `previous` yields `0.0%` without a sign.
pub fn format_change(latest: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "0.0%".to_string();
    }
    let pct = round_to((latest - previous) / previous * 100.0, 1);
    if pct >= 0.0 {
        format!("+{:.1}%", pct)
    } else {
        format!("{:.1}%", pct)
    }
}

/// Round half away from zero to `decimals` places. Negative zero becomes 0.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
