use serde::Serialize;

use crate::detector::DetectionCandidate;

/// Face box in pixel coordinates of the source frame.
///
/// Values come straight from truncating the scaled detector output, so they
/// may be reversed or fall outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelBox {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

/// Non-empty rectangle inside the frame, ready to crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    /// Clamps the box into a `width` x `height` frame.
    /// `None` if nothing of positive area remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRegion> {
        let clamp = |v: i32, max: u32| v.clamp(0, max.min(i32::MAX as u32) as i32) as u32;

        let x0 = clamp(self.start_x, width);
        let y0 = clamp(self.start_y, height);
        let x1 = clamp(self.end_x, width);
        let y1 = clamp(self.end_y, height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(CropRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

impl From<CropRegion> for PixelBox {
    fn from(region: CropRegion) -> Self {
        PixelBox {
            start_x: region.x as i32,
            start_y: region.y as i32,
            end_x: (region.x + region.width) as i32,
            end_y: (region.y + region.height) as i32,
        }
    }
}

/// The winning candidate of one frame, mapped to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub confidence: f32,
    pub pixel_box: PixelBox,
}

/// Picks at most one face per frame.
///
/// Highest confidence wins and the earliest candidate wins a tie. The winner
/// must be strictly above `min_confidence`.
pub fn select(
    candidates: &[DetectionCandidate],
    min_confidence: f32,
    width: u32,
    height: u32,
) -> Option<Selection> {
    let best = candidates.iter().fold(None::<&DetectionCandidate>, |best, c| match best {
        Some(b) if c.confidence <= b.confidence => Some(b),
        _ => Some(c),
    })?;

    if !(best.confidence > min_confidence) {
        return None;
    }

    Some(Selection {
        confidence: best.confidence,
        pixel_box: denormalize(best, width, height),
    })
}

/// Scales a normalized box by the frame size, truncating toward zero.
pub fn denormalize(candidate: &DetectionCandidate, width: u32, height: u32) -> PixelBox {
    let [x1, y1, x2, y2] = candidate.bbox;
    let w = width as f64;
    let h = height as f64;
    PixelBox {
        start_x: (x1 as f64 * w) as i32,
        start_y: (y1 as f64 * h) as i32,
        end_x: (x2 as f64 * w) as i32,
        end_y: (y2 as f64 * h) as i32,
    }
}
