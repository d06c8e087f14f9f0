//! Box overlays for recognized and unknown faces.
//!
//! Only outlines are drawn into the pixels. The `name (score)` caption of
//! each box comes from [`label`] and is logged next to the saved snapshot.

use crate::pipeline::recognition::Recognition;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

pub const KNOWN_COLOR: [u8; 3] = [0, 255, 0];
pub const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];
pub const LINE_WIDTH: i32 = 2;

/// Draws one outline per recognition: green when matched, red otherwise.
pub fn draw_recognitions(frame: &mut Frame, recognitions: &[Recognition]) {
    for r in recognitions {
        let color = if r.identity.is_known() {
            KNOWN_COLOR
        } else {
            UNKNOWN_COLOR
        };
        draw_box(frame, &r.bbox, color, LINE_WIDTH);
    }
}

/// Caption for one box, e.g. `alice (0.87)` or `unknown (0.12)`.
pub fn label(recognition: &Recognition) -> String {
    format!("{} ({:.2})", recognition.identity, recognition.score)
}

/// Draws a `thickness`-pixel outline just inside `bbox`, clipped to the frame.
pub fn draw_box(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3], thickness: i32) {
    if frame.channels() != 3 {
        return;
    }
    let Some(b) = bbox.clamp_to(frame.width(), frame.height()) else {
        return;
    };
    let t = thickness.max(1);
    let width = frame.width() as usize;
    let data = frame.data_mut();

    for y in b.y..b.bottom() {
        for x in b.x..b.right() {
            let on_edge = x < bbox.x + t
                || x >= bbox.right() - t
                || y < bbox.y + t
                || y >= bbox.bottom() - t;
            if on_edge {
                let offset = (y as usize * width + x as usize) * 3;
                data[offset..offset + 3].copy_from_slice(&color);
            }
        }
    }
}
