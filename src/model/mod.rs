//! Core data model types: messages, attachments, grids and payloads.

pub mod attachment;
pub mod mail;
pub mod report;
