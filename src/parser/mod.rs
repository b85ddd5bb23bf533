//! Email and text parsing: header helpers, MIME tree walking, `.eml`
//! conversion and tabular text detection.

pub mod eml;
pub mod header;
pub mod mime;
pub mod table;
