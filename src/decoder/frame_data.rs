use anyhow::{anyhow, Result};
use image::{ImageBuffer, Rgb};

/// One decoded video frame, packed RGB24, row-major.
///
/// Lives for a single pipeline iteration.
#[derive(Clone)]
pub struct FrameData {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameData {
    pub fn new(buffer: Vec<u8>, width: u32, height: u32) -> Self {
        Self { buffer, width, height }
    }

    #[cfg(test)]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let buffer = rgb.repeat((width * height) as usize);
        Self::new(buffer, width, height)
    }

    /// Borrowed image view over the frame buffer, no copy.
    pub fn view(&self) -> Result<ImageBuffer<Rgb<u8>, &[u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.as_slice()).ok_or_else(|| {
            anyhow!(
                "Frame buffer of {} bytes does not match {}x{} RGB",
                self.buffer.len(),
                self.width,
                self.height
            )
        })
    }
}
