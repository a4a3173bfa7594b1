use ndarray::ArrayView3;

/// A single camera frame: interleaved 8-bit pixels in row-major order.
///
/// `channels` is 3 for RGB and 4 for RGBA. `sequence` is the capture order
/// assigned by the source and survives every transformation of the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            sequence,
        }
    }

    /// A frame of uniform color, mostly useful for sources and tests.
    pub fn filled(width: u32, height: u32, pixel: &[u8], sequence: u64) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * pixel.len())
            .collect();
        Self::new(data, width, height, pixel.len() as u8, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at column `x`, row `y`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = self.offset(x, y);
        &self.data[offset..offset + self.channels as usize]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let offset = self.offset(x, y);
        let channels = self.channels as usize;
        &mut self.data[offset..offset + channels]
    }

    /// Returns the frame flipped around its vertical axis.
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * self.channels as usize;
        let channels = self.channels as usize;
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)) {
            for px in row.chunks_exact(channels).rev() {
                data.extend_from_slice(px);
            }
        }
        Frame::new(data, self.width, self.height, self.channels, self.sequence)
    }

    /// Converts to 4-channel RGBA, filling alpha with 255 for RGB frames.
    pub fn to_rgba(&self) -> Result<Vec<u8>, String> {
        match self.channels {
            4 => Ok(self.data.clone()),
            3 => {
                let mut out = Vec::with_capacity(self.data.len() / 3 * 4);
                for px in self.data.chunks_exact(3) {
                    out.extend_from_slice(px);
                    out.push(255);
                }
                Ok(out)
            }
            c => Err(format!("cannot convert {c}-channel frame to RGBA")),
        }
    }

    /// `(height, width, channels)` view for tensor preprocessing.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }
}
