use ndarray::Array4;

use crate::shared::frame::Frame;

/// Memory layout of a model's image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

impl TensorLayout {
    /// Infers the layout from a 4D input shape; channel-first when dim 1 is 3.
    pub fn from_shape(shape: &[i64]) -> Option<Self> {
        if shape.len() != 4 {
            return None;
        }
        if shape[1] == 3 {
            Some(TensorLayout::Nchw)
        } else if shape[3] == 3 {
            Some(TensorLayout::Nhwc)
        } else {
            None
        }
    }
}

/// Square (or full-frame) source window in pixel coordinates. May extend
/// past the frame edges; samples outside the frame read as black.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn full_frame(frame: &Frame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width() as f64,
            height: frame.height() as f64,
        }
    }

    /// Square window centered on a box, `scale` times its longer side.
    pub fn square_around(x1: f64, y1: f64, x2: f64, y2: f64, scale: f64) -> Self {
        let side = (x2 - x1).max(y2 - y1) * scale;
        let cx = (x1 + x2) / 2.0;
        let cy = (y1 + y2) / 2.0;
        Self {
            x: cx - side / 2.0,
            y: cy - side / 2.0,
            width: side,
            height: side,
        }
    }

    /// Maps a coordinate in a `size` x `size` model input back to frame pixels.
    pub fn to_frame(&self, u: f64, v: f64, size: usize) -> (f64, f64) {
        (
            self.x + u / size as f64 * self.width,
            self.y + v / size as f64 * self.height,
        )
    }
}

/// Nearest-neighbour resample of `crop` into a `size` x `size` float tensor
/// normalized to `[0, 1]`. Uses the first three channels of the frame.
pub fn sample_crop(frame: &Frame, crop: CropRect, size: usize, layout: TensorLayout) -> Array4<f32> {
    let src = frame.as_ndarray();
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;

    let mut tensor = match layout {
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, size, size)),
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, size, size, 3)),
    };

    for y in 0..size {
        let src_y = (crop.y + (y as f64 + 0.5) * crop.height / size as f64).floor() as i64;
        if src_y < 0 || src_y >= fh {
            continue;
        }
        for x in 0..size {
            let src_x = (crop.x + (x as f64 + 0.5) * crop.width / size as f64).floor() as i64;
            if src_x < 0 || src_x >= fw {
                continue;
            }
            for c in 0..3 {
                let value = src[[src_y as usize, src_x as usize, c]] as f32 / 255.0;
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }
    }

    tensor
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::channels_first(&[1, 3, 128, 128], Some(TensorLayout::Nchw))]
    #[case::channels_last(&[1, 192, 192, 3], Some(TensorLayout::Nhwc))]
    #[case::wrong_rank(&[1, 1404], None)]
    #[case::no_rgb_axis(&[1, 1, 64, 64], None)]
    fn test_layout_from_shape(#[case] shape: &[i64], #[case] expected: Option<TensorLayout>) {
        assert_eq!(TensorLayout::from_shape(shape), expected);
    }

    #[test]
    fn test_sample_full_frame_shape_per_layout() {
        let frame = Frame::filled(200, 100, &[128, 128, 128], 0);
        let crop = CropRect::full_frame(&frame);
        assert_eq!(
            sample_crop(&frame, crop, 128, TensorLayout::Nchw).shape(),
            &[1, 3, 128, 128]
        );
        assert_eq!(
            sample_crop(&frame, crop, 192, TensorLayout::Nhwc).shape(),
            &[1, 192, 192, 3]
        );
    }

    #[test]
    fn test_sample_normalizes_to_unit_range() {
        let frame = Frame::filled(50, 50, &[255, 0, 51], 0);
        let t = sample_crop(&frame, CropRect::full_frame(&frame), 16, TensorLayout::Nhwc);
        assert_relative_eq!(t[[0, 3, 3, 0]], 1.0);
        assert_relative_eq!(t[[0, 3, 3, 1]], 0.0);
        assert_relative_eq!(t[[0, 3, 3, 2]], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_sample_outside_frame_is_black() {
        let frame = Frame::filled(10, 10, &[255, 255, 255], 0);
        let crop = CropRect {
            x: -10.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
        };
        let t = sample_crop(&frame, crop, 4, TensorLayout::Nchw);
        // Left half of the crop lies outside the frame.
        assert_relative_eq!(t[[0, 0, 0, 0]], 0.0);
        assert_relative_eq!(t[[0, 0, 0, 3]], 1.0);
    }

    #[test]
    fn test_sample_ignores_alpha_channel() {
        let frame = Frame::filled(4, 4, &[0, 255, 0, 17], 0);
        let t = sample_crop(&frame, CropRect::full_frame(&frame), 2, TensorLayout::Nchw);
        assert_relative_eq!(t[[0, 1, 1, 1]], 1.0);
    }

    #[test]
    fn test_square_around_uses_longer_side() {
        let crop = CropRect::square_around(10.0, 20.0, 50.0, 100.0, 1.5);
        assert_relative_eq!(crop.width, 120.0);
        assert_relative_eq!(crop.height, 120.0);
        assert_relative_eq!(crop.x, -30.0);
        assert_relative_eq!(crop.y, 0.0);
    }

    #[test]
    fn test_to_frame_maps_model_space_back() {
        let crop = CropRect {
            x: 100.0,
            y: 50.0,
            width: 96.0,
            height: 96.0,
        };
        let (x, y) = crop.to_frame(96.0, 192.0, 192);
        assert_relative_eq!(x, 148.0);
        assert_relative_eq!(y, 146.0);
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }
}
