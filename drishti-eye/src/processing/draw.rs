//! Raster primitives for annotation overlays
//!
//! Everything clips against the frame, so callers may pass coordinates that
//! fall partly or entirely outside it.

use crate::config::Bgr;
use crate::frame::Frame;

/// Glyph cell size of the built-in font, before scaling.
const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;

fn hline(frame: &mut Frame, x_start: i32, x_end: i32, y: i32, color: Bgr) {
    if y < 0 || y >= frame.height() as i32 {
        return;
    }
    let lo = x_start.min(x_end).max(0);
    let hi = x_start.max(x_end).min(frame.width() as i32 - 1);
    for x in lo..=hi {
        frame.put_pixel(x, y, color);
    }
}

fn vline(frame: &mut Frame, x: i32, y_start: i32, y_end: i32, color: Bgr) {
    if x < 0 || x >= frame.width() as i32 {
        return;
    }
    let lo = y_start.min(y_end).max(0);
    let hi = y_start.max(y_end).min(frame.height() as i32 - 1);
    for y in lo..=hi {
        frame.put_pixel(x, y, color);
    }
}

/// Rectangle outline between two corners; thickness grows inward.
pub fn draw_rect(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32, color: Bgr, thickness: u32) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));

    for t in 0..thickness.max(1) as i32 {
        let (l, r) = (left.saturating_add(t), right.saturating_sub(t));
        let (tp, b) = (top.saturating_add(t), bottom.saturating_sub(t));
        if l > r || tp > b {
            break;
        }
        hline(frame, l, r, tp, color);
        hline(frame, l, r, b, color);
        vline(frame, l, tp, b, color);
        vline(frame, r, tp, b, color);
    }
}

/// Filled disc; radius 0 paints a single pixel.
pub fn fill_circle(frame: &mut Frame, cx: i32, cy: i32, radius: u32, color: Bgr) {
    let r = radius.min(i32::MAX as u32 / 2) as i32;
    for dy in -r..=r {
        let y = cy.saturating_add(dy);
        if y < 0 || y >= frame.height() as i32 {
            continue;
        }
        let half = (((r as f64).powi(2) - (dy as f64).powi(2)).sqrt()) as i32;
        hline(frame, cx.saturating_sub(half), cx.saturating_add(half), y, color);
    }
}

/// Clip a segment to a rectangle (Liang–Barsky). Returns `None` when the
/// segment lies entirely outside.
fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (xmin, ymin, xmax, ymax): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, x0 - xmin),
        (dx, xmax - x0),
        (-dy, y0 - ymin),
        (dy, ymax - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

/// Straight segment with the given stroke width.
pub fn draw_line(frame: &mut Frame, from: (i32, i32), to: (i32, i32), color: Bgr, thickness: u32) {
    let thickness = thickness.max(1);
    let pad = thickness as f64;
    let bounds = (
        -pad,
        -pad,
        frame.width() as f64 - 1.0 + pad,
        frame.height() as f64 - 1.0 + pad,
    );
    let Some((start, end)) = clip_segment(
        (from.0 as f64, from.1 as f64),
        (to.0 as f64, to.1 as f64),
        bounds,
    ) else {
        return;
    };

    let (mut x, mut y) = (start.0.round() as i32, start.1.round() as i32);
    let (x_end, y_end) = (end.0.round() as i32, end.1.round() as i32);
    let dx = (x_end - x).abs();
    let dy = -(y_end - y).abs();
    let sx = if x < x_end { 1 } else { -1 };
    let sy = if y < y_end { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if thickness == 1 {
            frame.put_pixel(x, y, color);
        } else {
            fill_circle(frame, x, y, thickness / 2, color);
        }
        if x == x_end && y == y_end {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Text with the built-in 5x7 font. `(x, baseline)` is the bottom-left corner;
/// letters are drawn upper-case and unsupported characters leave a gap.
pub fn draw_text(
    frame: &mut Frame,
    x: i32,
    baseline: i32,
    text: &str,
    color: Bgr,
    scale: u32,
    thickness: u32,
) {
    let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    let scale = scale.clamp(1, 1024) as i64;
    let block = scale + thickness.clamp(1, 1024) as i64 - 1;
    let top = baseline as i64 - GLYPH_HEIGHT as i64 * scale;
    let bottom = top + GLYPH_HEIGHT as i64 * scale + block;
    if bottom < 0 || top >= frame.height() as i64 {
        return;
    }
    let mut cursor = x as i64;

    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if cursor >= frame.width() as i64 {
            break;
        }
        if let Some(rows) = glyph_bits(ch) {
            for (row, pattern) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        let px = cursor + col as i64 * scale;
                        let py = top + row as i64 * scale;
                        for by in 0..block {
                            hline(frame, clamp(px), clamp(px + block - 1), clamp(py + by), color);
                        }
                    }
                }
            }
        }
        cursor += (GLYPH_WIDTH as i64 + 1) * scale;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        _ => return None,
    };
    Some(rows)
}
