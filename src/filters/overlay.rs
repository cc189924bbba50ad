use chrono::Local;
use image::{GrayImage, Luma, Rgb, RgbImage};

use super::Transform;
use crate::{error::FilterError, types::Frame};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_SPACING: i32 = 1;
// Left edge and distance of the baseline from the bottom edge.
const TEXT_ORIGIN_X: i32 = 1;
const TEXT_BASELINE_OFFSET: i32 = 3;
const OUTLINE_WIDTH: i32 = 2;

/// 5x7 bitmaps, one row per byte, most significant of the low five bits on
/// the left. Only the characters a timestamp needs are present.
fn glyph(c: char) -> [u8; 7] {
    match c {
        '0' => [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
        '1' => [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
        '2' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
        '3' => [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
        '4' => [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
        '5' => [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
        '6' => [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
        '7' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
        '9' => [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
        '-' => [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0c, 0x0c, 0x00, 0x0c, 0x0c, 0x00],
        _ => [0x00; 7],
    }
}

/// Pixels lit by `text` when drawn with its baseline at `baseline_y`.
fn text_pixels(text: &str, origin_x: i32, baseline_y: i32, scale: i32) -> Vec<(i32, i32)> {
    let scale = scale.max(1);
    let top = baseline_y - GLYPH_HEIGHT * scale + 1;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;

    let mut lit = Vec::new();
    for (idx, c) in text.chars().enumerate() {
        let left = origin_x + idx as i32 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        lit.push((left + col * scale + sx, top + row as i32 * scale + sy));
                    }
                }
            }
        }
    }
    lit
}

trait Canvas {
    fn bounds(&self) -> (u32, u32);
    fn paint(&mut self, x: u32, y: u32, bright: bool);

    fn paint_clipped(&mut self, x: i32, y: i32, bright: bool) {
        let (width, height) = self.bounds();
        if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
            return;
        }
        self.paint(x as u32, y as u32, bright);
    }
}

impl Canvas for GrayImage {
    fn bounds(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn paint(&mut self, x: u32, y: u32, bright: bool) {
        self.put_pixel(x, y, Luma([if bright { 255 } else { 0 }]));
    }
}

impl Canvas for RgbImage {
    fn bounds(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn paint(&mut self, x: u32, y: u32, bright: bool) {
        let v = if bright { 255 } else { 0 };
        self.put_pixel(x, y, Rgb([v, v, v]));
    }
}

/// White text over a black outline `OUTLINE_WIDTH` pixels wide, clipped to
/// the canvas.
fn draw_outlined_text<C: Canvas>(canvas: &mut C, text: &str, scale: i32) {
    let (_, height) = canvas.bounds();
    let baseline = height as i32 - TEXT_BASELINE_OFFSET;
    let lit = text_pixels(text, TEXT_ORIGIN_X, baseline, scale);

    for &(x, y) in &lit {
        for dy in -OUTLINE_WIDTH..=OUTLINE_WIDTH {
            for dx in -OUTLINE_WIDTH..=OUTLINE_WIDTH {
                canvas.paint_clipped(x + dx, y + dy, false);
            }
        }
    }
    for &(x, y) in &lit {
        canvas.paint_clipped(x, y, true);
    }
}

pub(crate) fn draw_text(frame: Frame, text: &str, scale: i32) -> Frame {
    match frame {
        Frame::Gray(mut img) => {
            draw_outlined_text(&mut img, text, scale);
            Frame::Gray(img)
        }
        Frame::Color(mut img) => {
            draw_outlined_text(&mut img, text, scale);
            Frame::Color(img)
        }
    }
}

/// Stamps the local wall-clock time in the bottom-left corner.
pub struct Timestamp {
    scale: i32,
}

impl Default for Timestamp {
    fn default() -> Self {
        Self { scale: 2 }
    }
}

impl Transform for Timestamp {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Ok(draw_text(frame, &now, self.scale))
    }
}
