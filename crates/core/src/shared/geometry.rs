/// A 2D point. Landmark points are normalized to `[0, 1]` relative to the
/// frame, origin top-left; pixel-space points use the same type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Maps a normalized point into the pixel space of a `width` x `height` image.
    pub fn to_image(self, width: u32, height: u32) -> Point2 {
        Point2::new(self.x * width as f64, self.y * height as f64)
    }
}

/// Axis-aligned rectangle in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}
