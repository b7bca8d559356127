use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::selector::PixelBox;

/// Provenance of one saved crop.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub file: String,
    pub video: PathBuf,
    /// 1-based ordinal of the frame within its video.
    pub frame: u64,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: PixelBox,
}

/// JSON Lines sidecar, one entry per crop.
pub struct ManifestWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ManifestWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create manifest: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, entry: &ManifestEntry) -> Result<()> {
        serde_json::to_writer(&mut self.out, entry)?;
        writeln!(self.out)
            .with_context(|| format!("Failed to write manifest: {}", self.path.display()))
    }

    pub fn finish(mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("Failed to flush manifest: {}", self.path.display()))
    }
}
