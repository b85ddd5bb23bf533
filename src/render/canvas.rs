//! Drawing surface used by the raster layout, plus its bitmap backend.
//!
//! Glyphs come from the 8x8 `font8x8` set and are scaled by whole pixels to
//! approximate the requested size. Text coordinates name the baseline.

use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::Result;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

const GLYPH: u32 = 8;

/// Font request: nominal pixel size and weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Font {
    pub px: u32,
    pub bold: bool,
}

impl Font {
    pub const fn regular(px: u32) -> Self {
        Self { px, bold: false }
    }

    pub const fn bold(px: u32) -> Self {
        Self { px, bold: true }
    }

    /// Integer scale applied to the 8x8 glyphs.
    pub fn scale(&self) -> u32 {
        ((self.px as f32 / GLYPH as f32).round() as u32).max(1)
    }
}

/// Minimal 2D drawing interface.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>);
    /// Draw `text` with its baseline at `y`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Rgb<u8>);
}

/// In-memory RGB canvas.
pub struct BitmapCanvas {
    image: RgbImage,
}

impl BitmapCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    /// Encode the canvas as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    fn draw_glyph(&mut self, glyph: [u8; 8], left: i64, top: i64, scale: u32, color: Rgb<u8>) {
        let scale = scale as i64;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH as i64 {
                // bit 0 is the leftmost pixel
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = left + col * scale;
                let py = top + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        self.put(px + dx, py + dy, color);
                    }
                }
            }
        }
    }
}

impl Canvas for BitmapCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>) {
        let left = x.round() as i64;
        let top = y.round() as i64;
        let right = (x + w).round() as i64;
        let bottom = (y + h).round() as i64;
        for py in top..bottom.max(top + 1) {
            for px in left..right {
                self.put(px, py, color);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Rgb<u8>) {
        let scale = font.scale();
        let advance = (GLYPH * scale) as i64;
        let top = y.round() as i64 - advance;
        let mut left = x.round() as i64;
        for c in text.chars() {
            let glyph = BASIC_FONTS
                .get(c)
                .or_else(|| BASIC_FONTS.get('?'))
                .unwrap_or([0; 8]);
            self.draw_glyph(glyph, left, top, scale, color);
            if font.bold {
                self.draw_glyph(glyph, left + 1, top, scale, color);
            }
            left += advance;
            if left >= self.image.width() as i64 {
                break;
            }
        }
    }
}
