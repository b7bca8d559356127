use anyhow::Result;

use super::frame_data::FrameData;
use crate::utils::logger;

/// Low-level frame reader behind a [`FrameStream`].
pub trait FrameReader {
    /// Decodes the next frame. `Ok(None)` is end of stream.
    fn read_frame(&mut self) -> Result<Option<FrameData>>;

    /// Frees the decoder handle. Called exactly once by [`FrameStream`].
    fn release(&mut self);

    /// Name used in log lines.
    fn label(&self) -> String;
}

/// Ordered, finite frame sequence over a [`FrameReader`].
///
/// A read error ends the stream like EOF does. After the end nothing more is
/// yielded, and the reader is released once: at the end, or on drop if the
/// consumer stops early.
pub struct FrameStream<R: FrameReader> {
    reader: R,
    frames: u64,
    finished: bool,
}

impl<R: FrameReader> FrameStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            frames: 0,
            finished: false,
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.reader.release();
        logger::debug(&format!(
            "Closed {} after {} frames",
            self.reader.label(),
            self.frames
        ));
    }
}

impl<R: FrameReader> Iterator for FrameStream<R> {
    type Item = FrameData;

    fn next(&mut self) -> Option<FrameData> {
        if self.finished {
            return None;
        }
        match self.reader.read_frame() {
            Ok(Some(frame)) => {
                self.frames += 1;
                Some(frame)
            }
            Ok(None) => {
                logger::debug(&format!("Decoder EOF: {}", self.reader.label()));
                self.finish();
                None
            }
            Err(e) => {
                logger::error(&format!(
                    "Decoding error in {} after frame {}: {:#}",
                    self.reader.label(),
                    self.frames,
                    e
                ));
                self.finish();
                None
            }
        }
    }
}

impl<R: FrameReader> Drop for FrameStream<R> {
    fn drop(&mut self) {
        self.finish();
    }
}
