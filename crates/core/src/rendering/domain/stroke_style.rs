pub const DEFAULT_STROKE_COLOR: [u8; 3] = [255, 255, 255];
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Line style for landmark contours. Caps and joins are always round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: [u8; 3],
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR,
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}
