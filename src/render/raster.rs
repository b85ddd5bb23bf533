//! E-ink friendly PNG rendering of a report table.

use tracing::debug;

use crate::config::MAX_IMAGE_DIMENSION;
use crate::error::{RelayError, Result};
use crate::model::mail::EmailData;
use crate::model::report::Grid;
use crate::parser::header::parse_date;
use crate::render::canvas::{BitmapCanvas, Canvas, Font, BLACK, WHITE};
use crate::render::{PayloadRenderer, Rendered};

const MARGIN: f32 = 40.0;
const MAX_CELL_CHARS: usize = 15;
const MAX_ROWS: usize = 10;
const ROW_PITCH: f32 = 25.0;

/// Renders the email's table to a PNG of fixed size.
#[derive(Debug, Clone)]
pub struct RasterRenderer {
    pub width: u32,
    pub height: u32,
    pub default_title: String,
}

impl RasterRenderer {
    pub fn new(width: u32, height: u32, default_title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            default_title: default_title.into(),
        }
    }

    fn title<'a>(&'a self, email: &'a EmailData) -> &'a str {
        if email.subject.is_empty() {
            &self.default_title
        } else {
            &email.subject
        }
    }
}

impl PayloadRenderer for RasterRenderer {
    fn render(&self, email: &EmailData, grid: Option<&Grid>) -> Result<Rendered> {
        if self.width > MAX_IMAGE_DIMENSION || self.height > MAX_IMAGE_DIMENSION {
            return Err(RelayError::Render(format!(
                "canvas {}x{} exceeds {MAX_IMAGE_DIMENSION}px",
                self.width, self.height
            )));
        }
        if self.width <= 2 * MARGIN as u32 || self.height <= 50 {
            return Err(RelayError::Render(format!(
                "canvas {}x{} leaves no room for the table",
                self.width, self.height
            )));
        }
        let title = self.title(email);
        let mut canvas = BitmapCanvas::new(self.width, self.height);
        render_layout(&mut canvas, title, &email.date, grid);
        let bytes = canvas.to_png()?;
        debug!(bytes = bytes.len(), width = self.width, height = self.height, "Encoded PNG");
        Ok(Rendered::Png {
            bytes,
            filename: format!("{title}.png"),
        })
    }
}

/// Draw the report layout: title, date line, then the table or a notice.
pub fn render_layout(canvas: &mut dyn Canvas, title: &str, date: &str, grid: Option<&Grid>) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;

    canvas.fill_rect(0.0, 0.0, width, height, WHITE);
    canvas.fill_text(title, MARGIN, 50.0, Font::bold(32), BLACK);
    canvas.fill_text(&display_date(date), MARGIN, 80.0, Font::regular(16), BLACK);

    let mut y = 120.0;
    let Some((headers, rows)) = grid.and_then(|g| g.split_first()) else {
        canvas.fill_text("No data found in email", MARGIN, y, Font::regular(18), BLACK);
        return;
    };

    let col_width = (width - 2.0 * MARGIN) / headers.len().max(1) as f32;
    for (i, header) in headers.iter().enumerate() {
        let x = MARGIN + i as f32 * col_width;
        canvas.fill_text(&truncate(header), x, y, Font::bold(14), BLACK);
    }

    y += 30.0;
    canvas.fill_rect(MARGIN, y - 20.0, width - 2.0 * MARGIN, 1.0, BLACK);

    for row in rows.iter().take(MAX_ROWS) {
        if y > height - 50.0 {
            break;
        }
        for (i, cell) in row.iter().enumerate() {
            let x = MARGIN + i as f32 * col_width;
            canvas.fill_text(&truncate(cell), x, y, Font::regular(12), BLACK);
        }
        y += ROW_PITCH;
    }
}

/// `M/D/YYYY` for parseable dates, the raw text otherwise.
fn display_date(date: &str) -> String {
    match parse_date(date) {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => date.to_string(),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_CELL_CHARS).collect()
}
