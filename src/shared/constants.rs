pub const APP_NAME: &str = "facecrop";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_SKIP: u32 = 16;
pub const DEFAULT_FLIP: u8 = 0;
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Network topology and trained weights of the res10 SSD face detector.
pub const MODEL_PROTOTXT: &str = "deploy.prototxt";
pub const MODEL_WEIGHTS: &str = "res10_300x300_ssd_iter_140000.caffemodel";

/// Fixed input resolution the detector was trained on.
#[cfg(feature = "opencv")]
pub const MODEL_INPUT_SIZE: i32 = 300;

/// Per-channel BGR mean subtracted before inference.
#[cfg(feature = "opencv")]
pub const MODEL_MEAN_BGR: (f64, f64, f64) = (104.0, 177.0, 123.0);

pub const CROP_EXTENSION: &str = "png";
