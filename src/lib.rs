//! `reportrelay` relays scheduled BI report emails to TRMNL e-ink
//! dashboards.
//!
//! A run searches a mailbox for report emails, pulls tabular data out of a
//! PDF or CSV attachment (or the body text), reduces it to a handful of
//! headline metrics and a short chart series, and posts the result to a
//! webhook as JSON or as a rendered PNG.

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod sink;
pub mod source;
