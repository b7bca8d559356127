#[cfg(feature = "opencv")]
pub mod ssd;

use anyhow::Result;

use crate::decoder::FrameData;

#[cfg(feature = "opencv")]
pub use ssd::SsdFaceDetector;

/// One proposed face, box normalized to the source frame:
/// `(x1, y1, x2, y2)` as fractions of width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCandidate {
    pub confidence: f32,
    pub bbox: [f32; 4],
}

impl DetectionCandidate {
    pub fn new(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            confidence,
            bbox: [x1, y1, x2, y2],
        }
    }
}

/// Face detection backend.
///
/// Candidates must come back in the order the model emitted them: the
/// selector keeps the first of equally confident candidates, so a stable
/// order is what makes its choice reproducible. No candidates is `Ok(vec![])`.
pub trait FaceDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Vec<DetectionCandidate>>;
}
