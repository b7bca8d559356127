pub mod config;
pub mod extractor;
pub mod manifest;
pub mod sampler;
pub mod selector;
pub mod writer;

pub use config::{ExtractConfig, Settings};
#[cfg(feature = "opencv")]
pub use extractor::BatchDriver;
pub use writer::FlipAxis;
