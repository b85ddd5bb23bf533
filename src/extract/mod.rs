//! Turning a message's attachments or body into a grid.

pub mod pdf;
pub mod resolver;
