use anyhow::{anyhow, Context, Result};
use opencv::{
    prelude::*,
    videoio,
    imgproc,
};
use std::path::{Path, PathBuf};

use super::frame_data::FrameData;
use super::stream::{FrameReader, FrameStream};
use super::{VideoInfo, VideoOpener};
use crate::utils::logger;

/// Sequential OpenCV decoder for one video file.
///
/// Wrap it in a [`FrameStream`] to get end-of-stream on decode errors and a
/// single release of the capture handle.
pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    path: PathBuf,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {}", path.display()))?;

        // CAP_ANY lets OpenCV pick whichever backend can decode the container
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("Failed to create capture for {}", path.display()))?;

        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path.display()));
        }

        logger::debug(&format!("Opened video {}", path.display()));

        Ok(Self {
            capture,
            path: path.to_path_buf(),
        })
    }

    pub fn info(&self) -> Result<VideoInfo> {
        Ok(VideoInfo {
            path: self.path.clone(),
            width: self.capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: self.capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: self.capture.get(videoio::CAP_PROP_FPS)?,
            frame_count: self.capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64,
            backend: self.capture.get_backend_name()?,
        })
    }

    /// Decodes the next frame. `Ok(None)` is end of stream.
    pub fn read_frame(&mut self) -> Result<Option<FrameData>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? {
            return Ok(None);
        }
        if frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

        if !rgb.is_continuous() {
            return Err(anyhow!("Frame is not continuous"));
        }

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let buffer = rgb.data_bytes()?.to_vec();

        Ok(Some(FrameData::new(buffer, width, height)))
    }
}

impl FrameReader for VideoDecoder {
    fn read_frame(&mut self) -> Result<Option<FrameData>> {
        VideoDecoder::read_frame(self)
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            logger::error(&format!("Failed to release {}: {}", self.path.display(), e));
        }
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Opens each video with [`VideoDecoder`].
pub struct OpenCvOpener;

impl VideoOpener for OpenCvOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Iterator<Item = FrameData>>> {
        Ok(Box::new(FrameStream::new(VideoDecoder::open(path)?)))
    }
}
