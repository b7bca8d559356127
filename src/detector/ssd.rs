//! res10 SSD face detector running on OpenCV's DNN module.
//!
//! The network is loaded once from a Caffe topology and weights pair and
//! reused for every frame. Each frame is resized to the fixed 300x300 input
//! and mean-subtracted; the model reports boxes as fractions of its input,
//! which, since the whole frame is resized, are also fractions of the
//! original frame.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat, Scalar, Size},
    dnn,
    imgproc,
    prelude::*,
};
use std::path::Path;

use super::{DetectionCandidate, FaceDetector};
use crate::decoder::FrameData;
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// Values per detection row: image id, class id, confidence, x1, y1, x2, y2.
const DETECTION_ROW_LEN: usize = 7;

pub struct SsdFaceDetector {
    net: dnn::Net,
}

impl SsdFaceDetector {
    /// Loads `deploy.prototxt` and the res10 caffemodel from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let prototxt = model_dir.join(constants::MODEL_PROTOTXT);
        let weights = model_dir.join(constants::MODEL_WEIGHTS);
        file_utils::require_file(&prototxt, "Detector topology")?;
        file_utils::require_file(&weights, "Detector weights")?;

        let net = dnn::read_net_from_caffe(&path_str(&prototxt)?, &path_str(&weights)?)
            .with_context(|| format!("Failed to load detector from {}", model_dir.display()))?;

        if net.empty()? {
            return Err(anyhow!("Detector network is empty: {}", model_dir.display()));
        }

        logger::info(&format!("Loaded face detector from {}", model_dir.display()));

        Ok(Self { net })
    }

    fn to_blob(frame: &FrameData) -> Result<Mat> {
        let flat = Mat::from_slice(&frame.buffer)?;
        let image = flat.reshape(3, frame.height as i32)?.try_clone()?;

        let input = Size::new(constants::MODEL_INPUT_SIZE, constants::MODEL_INPUT_SIZE);
        let mut resized = Mat::default();
        imgproc::resize(&image, &mut resized, input, 0.0, 0.0, imgproc::INTER_LINEAR)?;

        let (b, g, r) = constants::MODEL_MEAN_BGR;
        // Frames are RGB; the model was trained on BGR, hence swap_rb
        let blob = dnn::blob_from_image(
            &resized,
            1.0,
            input,
            Scalar::new(b, g, r, 0.0),
            true,
            false,
            core::CV_32F,
        )?;
        Ok(blob)
    }
}

impl FaceDetector for SsdFaceDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Vec<DetectionCandidate>> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }

        let blob = Self::to_blob(frame)?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let detections = self.net.forward_single("")?;

        let values = detections.data_typed::<f32>()?;
        Ok(parse_detections(values))
    }
}

/// Turns the flat `[1, 1, N, 7]` output into candidates, keeping model order.
pub fn parse_detections(values: &[f32]) -> Vec<DetectionCandidate> {
    values
        .chunks_exact(DETECTION_ROW_LEN)
        .map(|row| DetectionCandidate::new(row[2], row[3], row[4], row[5], row[6]))
        .collect()
}

fn path_str(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Path is not valid UTF-8: {}", path.display()))
}
