use anyhow::{Context, Result};
use clap::ValueEnum;
use image::{imageops, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};

use super::selector::CropRegion;
use crate::decoder::FrameData;
use crate::shared::constants;

/// Mirror applied to crops when flipping is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlipAxis {
    /// Reverse row order (upside down)
    Vertical,
    /// Reverse column order (mirror image)
    Horizontal,
    Both,
}

/// Writes crops as `{output_dir}/{n}.png` with `n` counting up from zero.
///
/// The counter is shared across every video of a run and only moves after a
/// successful write, so names are gap-free and never collide.
pub struct CropWriter {
    output_dir: PathBuf,
    flip: Option<FlipAxis>,
    saved: u64,
}

impl CropWriter {
    pub fn new(output_dir: &Path, flip: Option<FlipAxis>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            flip,
            saved: 0,
        }
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    /// Path the next crop will be written to.
    pub fn next_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.saved, constants::CROP_EXTENSION))
    }

    pub fn write(&mut self, frame: &FrameData, region: CropRegion) -> Result<PathBuf> {
        if region.x.saturating_add(region.width) > frame.width
            || region.y.saturating_add(region.height) > frame.height
        {
            anyhow::bail!(
                "Crop region {:?} exceeds {}x{} frame",
                region,
                frame.width,
                frame.height
            );
        }

        let view = frame.view()?;
        let crop = self.prepare(&view, region);

        let path = self.next_path();
        crop.save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("Failed to write crop {}", path.display()))?;

        self.saved += 1;
        Ok(path)
    }

    fn prepare<I>(&self, image: &I, region: CropRegion) -> RgbImage
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        let crop = RgbImage::from_fn(region.width, region.height, |x, y| {
            image.get_pixel(region.x + x, region.y + y)
        });

        match self.flip {
            None => crop,
            Some(FlipAxis::Vertical) => imageops::flip_vertical(&crop),
            Some(FlipAxis::Horizontal) => imageops::flip_horizontal(&crop),
            Some(FlipAxis::Both) => imageops::rotate180(&crop),
        }
    }
}
