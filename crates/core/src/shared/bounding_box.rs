/// Axis-aligned face box in frame pixel coordinates.
///
/// May extend past the frame edges; use [`BoundingBox::clamp_to`] before
/// touching pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `[x1, y1, x2, y2]` corner coordinates, rounding outward.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let left = x1.floor() as i32;
        let top = y1.floor() as i32;
        let right = x2.ceil() as i32;
        let bottom = y2.ceil() as i32;
        Self::new(left, top, (right - left).max(0), (bottom - top).max(0))
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection with the `[0, width) x [0, height)` frame rectangle.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Square box sharing this box's center, with side `max(w, h) * (1 + margin)`.
    pub fn expand_to_square(&self, margin: f64) -> BoundingBox {
        let side = (self.width.max(self.height) as f64 * (1.0 + margin)).round() as i32;
        let cx = self.x as f64 + self.width as f64 / 2.0;
        let cy = self.y as f64 + self.height as f64 / 2.0;
        let x = (cx - side as f64 / 2.0).round() as i32;
        let y = (cy - side as f64 / 2.0).round() as i32;
        BoundingBox::new(x, y, side, side)
    }

}
