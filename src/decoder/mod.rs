pub mod frame_data;
pub mod stream;
#[cfg(feature = "opencv")]
pub mod video;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use frame_data::FrameData;
pub use stream::{FrameReader, FrameStream};
#[cfg(feature = "opencv")]
pub use video::{OpenCvOpener, VideoDecoder};

/// Opens a video as an ordered, finite stream of frames.
///
/// Dropping the returned stream releases the underlying decoder.
pub trait VideoOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Iterator<Item = FrameData>>>;
}

/// Container properties reported by the decoder backend.
#[derive(Debug, Serialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
    pub backend: String,
}
