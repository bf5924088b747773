//! Camera frames
//!
//! The engine only carries raw frames from the capture device to the
//! snapshot. Presentation needs `BGR -> RGBA` conversion followed by a
//! resize to the display resolution; both are provided here so any sink can
//! apply the same transformation.

use thiserror::Error;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel, blue first (what capture devices hand out)
    Bgr8,
    /// 4 bytes per pixel, red first, opaque alpha
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Errors building a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Buffer length does not match the dimensions
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        /// Frame width
        width: u32,
        /// Frame height
        height: u32,
        /// Bytes the dimensions require
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Width or height is zero
    #[error("frame dimensions must be non-zero")]
    Empty,
}

/// A single captured video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl VideoFrame {
    /// Wrap a pixel buffer, checking its size against the dimensions
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert to RGBA with an opaque alpha channel
    pub fn to_rgba(&self) -> VideoFrame {
        match self.format {
            PixelFormat::Rgba8 => self.clone(),
            PixelFormat::Bgr8 => {
                let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
                for px in self.data.chunks_exact(3) {
                    data.extend_from_slice(&[px[2], px[1], px[0], 0xFF]);
                }
                VideoFrame {
                    width: self.width,
                    height: self.height,
                    format: PixelFormat::Rgba8,
                    data,
                }
            }
        }
    }

    /// Nearest-neighbour resize to `width` x `height`
    pub fn resize(&self, width: u32, height: u32) -> Result<VideoFrame, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let bpp = self.format.bytes_per_pixel();
        let src_stride = self.width as usize * bpp;
        let mut data = Vec::with_capacity(width as usize * height as usize * bpp);

        for y in 0..height as u64 {
            let sy = (y * self.height as u64 / height as u64) as usize;
            let row = &self.data[sy * src_stride..(sy + 1) * src_stride];
            for x in 0..width as u64 {
                let sx = (x * self.width as u64 / width as u64) as usize;
                data.extend_from_slice(&row[sx * bpp..(sx + 1) * bpp]);
            }
        }

        Ok(VideoFrame {
            width,
            height,
            format: self.format,
            data,
        })
    }

    /// RGBA frame at the display resolution
    pub fn prepare_for_display(&self, width: u32, height: u32) -> Result<VideoFrame, FrameError> {
        self.to_rgba().resize(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_buffer_size_checked() {
        let err = VideoFrame::new(2, 2, PixelFormat::Bgr8, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferSize {
                width: 2,
                height: 2,
                expected: 12,
                actual: 11
            }
        );
        assert_eq!(VideoFrame::new(0, 2, PixelFormat::Bgr8, vec![]), Err(FrameError::Empty));
    }

    #[test]
    fn test_bgr_to_rgba() {
        let frame = VideoFrame::new(2, 1, PixelFormat::Bgr8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let rgba = frame.to_rgba();

        assert_eq!(rgba.format(), PixelFormat::Rgba8);
        assert_eq!(rgba.data(), &[3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn test_upscale_nearest() {
        let frame = VideoFrame::new(2, 1, PixelFormat::Rgba8, vec![1, 1, 1, 1, 2, 2, 2, 2]).unwrap();
        let big = frame.resize(4, 2).unwrap();

        assert_eq!(big.width(), 4);
        assert_eq!(big.height(), 2);
        let firsts: Vec<u8> = big.data().chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(firsts, vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn test_prepare_for_display() {
        let frame = VideoFrame::new(4, 4, PixelFormat::Bgr8, vec![9; 48]).unwrap();
        let shown = frame.prepare_for_display(2, 2).unwrap();

        assert_eq!(shown.format(), PixelFormat::Rgba8);
        assert_eq!(shown.data().len(), 16);
        assert_eq!(shown.data()[3], 255);
    }
}
