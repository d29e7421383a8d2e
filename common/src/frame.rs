use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use std::io::Cursor;

/// A low-resolution scan frame holding one comparable channel per pixel.
///
/// The channel is the green component of the RGB sample, which carries most
/// of the luminance information on a Bayer sensor. Pixels are stored in
/// row-major order; the buffer length always equals `width * height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Scan-space location of the pixel that tipped the changed-pixel count over
/// the sensitivity limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub x: u32,
    pub y: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Extract the green channel of an RGB image.
    pub fn from_rgb(img: &RgbImage) -> Self {
        let data = img.pixels().map(|p| p.0[1]).collect();
        Self {
            width: img.width(),
            height: img.height(),
            data,
        }
    }

    /// Decode an encoded still (JPEG, PNG) and fit it to `width x height`.
    ///
    /// Sensors do not always honor the requested resolution exactly, so the
    /// decoded image is resized with nearest-neighbour sampling when needed.
    pub fn decode(encoded: &[u8], width: u32, height: u32) -> Result<Self, FrameError> {
        let img = ImageReader::new(Cursor::new(encoded))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;

        let rgb = if img.width() != width || img.height() != height {
            img.resize_exact(width, height, FilterType::Nearest).to_rgb8()
        } else {
            img.to_rgb8()
        };
        Ok(Self::from_rgb(&rgb))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Channel value at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// One row of channel values.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer has {got} pixels, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("frame dimensions differ: {a:?} vs {b:?}")]
    DimensionMismatch { a: (u32, u32), b: (u32, u32) },
    #[error("failed to decode frame: {0}")]
    Decode(String),
}
