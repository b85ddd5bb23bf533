//! Payload rendering: the metrics JSON document or a PNG of the table.

pub mod canvas;
pub mod json;
pub mod raster;

use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::model::mail::EmailData;
use crate::model::report::{Grid, TrmnlPayload};

pub use json::{build_payload, JsonRenderer};
pub use raster::RasterRenderer;

/// Output of a renderer, ready for a webhook sink.
#[derive(Debug, Clone)]
pub enum Rendered {
    Json(TrmnlPayload),
    Png { bytes: Vec<u8>, filename: String },
}

/// Turns an email and its (optional) table into a deliverable payload.
pub trait PayloadRenderer {
    fn render(&self, email: &EmailData, grid: Option<&Grid>) -> Result<Rendered>;
}

/// Renderer selected by `output.format`.
pub fn renderer_for(config: &Config) -> Box<dyn PayloadRenderer> {
    let output = &config.output;
    match output.format {
        OutputFormat::Json => Box::new(JsonRenderer::new(
            output.currency_symbol.clone(),
            output.default_title.clone(),
        )),
        OutputFormat::Image => Box::new(RasterRenderer::new(
            output.image_width,
            output.image_height,
            output.default_title.clone(),
        )),
    }
}
