use image::{Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut, Canvas};
use imageproc::point::Point;

use crate::detection::domain::face_observation::{FaceObservation, LandmarkRegion};
use crate::rendering::domain::landmark_renderer::{LandmarkRenderer, RenderError};
use crate::rendering::domain::stroke_style::StrokeStyle;
use crate::shared::frame::Frame;
use crate::shared::geometry::Point2;

/// Strokes landmark regions with `imageproc` primitives.
///
/// Each segment is a filled quad of the stroke width; a filled circle at
/// every vertex supplies round caps and joins. Pixel `(x, y)` covers the unit
/// square centered on `(x + 0.5, y + 0.5)` in image space.
pub struct CpuLandmarkRenderer {
    style: StrokeStyle,
}

impl CpuLandmarkRenderer {
    pub fn new(style: StrokeStyle) -> Self {
        Self { style }
    }

    fn draw<C: Canvas>(&self, canvas: &mut C, face: &FaceObservation, color: C::Pixel) {
        let (width, height) = canvas.dimensions();
        for region in LandmarkRegion::ALL {
            let Some(points) = face.region(region) else {
                continue;
            };
            let path: Vec<Point2> = points
                .iter()
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .map(|p| p.to_image(width, height))
                .collect();
            stroke_path(canvas, &path, region.is_closed(), self.style.width as f64, color);
        }
    }
}

impl Default for CpuLandmarkRenderer {
    fn default() -> Self {
        Self::new(StrokeStyle::default())
    }
}

impl LandmarkRenderer for CpuLandmarkRenderer {
    fn render(&self, frame: &Frame, face: &FaceObservation) -> Result<Frame, RenderError> {
        let (width, height) = (frame.width(), frame.height());
        let mismatch = RenderError::BufferMismatch { width, height };
        let [r, g, b] = self.style.color;

        let data = match frame.channels() {
            3 => {
                let mut canvas =
                    RgbImage::from_raw(width, height, frame.data().to_vec()).ok_or(mismatch)?;
                self.draw(&mut canvas, face, Rgb([r, g, b]));
                canvas.into_raw()
            }
            4 => {
                let mut canvas =
                    RgbaImage::from_raw(width, height, frame.data().to_vec()).ok_or(mismatch)?;
                self.draw(&mut canvas, face, Rgba([r, g, b, 255]));
                canvas.into_raw()
            }
            channels => return Err(RenderError::UnsupportedFormat { channels }),
        };

        Ok(Frame::new(
            data,
            width,
            height,
            frame.channels(),
            frame.sequence(),
        ))
    }
}

fn path_segments(path: &[Point2], closed: bool) -> Vec<(Point2, Point2)> {
    let mut segments: Vec<_> = path.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && path.len() > 2 {
        segments.push((path[path.len() - 1], path[0]));
    }
    segments
}

fn stroke_path<C: Canvas>(
    canvas: &mut C,
    path: &[Point2],
    closed: bool,
    width: f64,
    color: C::Pixel,
) {
    if width <= 0.0 {
        return;
    }
    let half_width = width / 2.0;
    let radius = half_width.round() as i32;
    let reach = half_width + 1.0;

    for (a, b) in path_segments(path, closed) {
        if !touches_canvas(canvas, &[a, b], reach) {
            continue;
        }
        if let Some(quad) = segment_quad(a, b, half_width) {
            draw_polygon_mut(canvas, &quad, color);
        }
    }
    for &p in path {
        if touches_canvas(canvas, &[p], reach) {
            let (x, y) = pixel_index(p);
            draw_filled_circle_mut(canvas, (x.round() as i32, y.round() as i32), radius, color);
        }
    }
}

/// Image-space point to pixel-index coordinates.
fn pixel_index(p: Point2) -> (f64, f64) {
    (p.x - 0.5, p.y - 0.5)
}

/// Rectangle of `half_width` on both sides of `a`-`b`, or `None` when the
/// segment is too short to have a direction.
fn segment_quad(a: Point2, b: Point2, half_width: f64) -> Option<[Point<i32>; 4]> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return None;
    }
    let (nx, ny) = (-dy / length * half_width, dx / length * half_width);
    let corner = |p: Point2, side: f64| {
        let (x, y) = pixel_index(p);
        Point::new((x + side * nx).round() as i32, (y + side * ny).round() as i32)
    };
    let quad = [corner(a, 1.0), corner(b, 1.0), corner(b, -1.0), corner(a, -1.0)];
    // draw_polygon_mut rejects polygons whose first and last points coincide.
    (quad[0] != quad[3]).then_some(quad)
}

fn touches_canvas<C: Canvas>(canvas: &C, points: &[Point2], reach: f64) -> bool {
    let (width, height) = canvas.dimensions();
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    max_x + reach >= 0.0
        && max_y + reach >= 0.0
        && min_x - reach <= width as f64
        && min_y - reach <= height as f64
}
