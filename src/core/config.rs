use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

use super::writer::FlipAxis;
use crate::shared::constants;
use crate::utils::file_utils;

/// Tunables that may come from the command line or a config file.
/// `None` means "not given here".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub confidence: Option<f32>,
    pub skip: Option<u32>,
    pub flip: Option<u8>,
    pub flip_axis: Option<FlipAxis>,
    pub extension: Option<String>,
}

impl Settings {
    /// Reads a `key = value` file. Blank lines and `#` comments are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut settings = Settings::default();

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                anyhow::bail!("line {}: expected `key = value`, got `{}`", idx + 1, trimmed);
            };
            let (key, value) = (key.trim(), value.trim());
            let bad = || format!("line {}: invalid value `{}` for `{}`", idx + 1, value, key);

            match key {
                "confidence" => settings.confidence = Some(value.parse::<f32>().with_context(bad)?),
                "skip" => settings.skip = Some(value.parse::<u32>().with_context(bad)?),
                "flip" => settings.flip = Some(value.parse::<u8>().with_context(bad)?),
                "flip-axis" => {
                    let axis = FlipAxis::from_str(value, true).map_err(|e| anyhow::anyhow!(e));
                    settings.flip_axis = Some(axis.with_context(bad)?);
                }
                "extension" => settings.extension = Some(value.trim_start_matches('.').to_string()),
                other => anyhow::bail!("line {}: unknown setting `{}`", idx + 1, other),
            }
        }

        Ok(settings)
    }

    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            confidence: self.confidence.or(fallback.confidence),
            skip: self.skip.or(fallback.skip),
            flip: self.flip.or(fallback.flip),
            flip_axis: self.flip_axis.or(fallback.flip_axis),
            extension: self.extension.or(fallback.extension),
        }
    }
}

/// Validated configuration of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model_dir: PathBuf,
    pub confidence: f32,
    pub skip: u32,
    pub flip: Option<FlipAxis>,
    pub extension: String,
    pub manifest: Option<PathBuf>,
}

impl ExtractConfig {
    /// Merges command line over config file over built-in defaults, then
    /// validates. Every error here is raised before any video is touched.
    pub fn resolve(
        input_dir: PathBuf,
        output_dir: PathBuf,
        model_dir: PathBuf,
        manifest: Option<PathBuf>,
        cli: Settings,
        config_file: Option<&Path>,
    ) -> Result<Self> {
        let file = match config_file {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        let merged = cli.or(file);

        let flip = match merged.flip.unwrap_or(constants::DEFAULT_FLIP) {
            0 => None,
            1 => Some(merged.flip_axis.unwrap_or(FlipAxis::Vertical)),
            other => anyhow::bail!("Flip must be 0 or 1, got {}", other),
        };

        let config = Self {
            input_dir,
            output_dir,
            model_dir,
            confidence: merged.confidence.unwrap_or(constants::DEFAULT_CONFIDENCE),
            skip: merged.skip.unwrap_or(constants::DEFAULT_SKIP),
            flip,
            extension: merged
                .extension
                .unwrap_or_else(|| constants::DEFAULT_VIDEO_EXTENSION.to_string()),
            manifest,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.skip == 0 {
            anyhow::bail!("Frame stride (skip) must be at least 1");
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            anyhow::bail!("Confidence must be within [0, 1], got {}", self.confidence);
        }
        if self.extension.is_empty() {
            anyhow::bail!("Video extension must not be empty");
        }

        file_utils::require_dir(&self.output_dir, "Output")?;
        file_utils::require_file(
            &self.model_dir.join(constants::MODEL_PROTOTXT),
            "Detector topology",
        )?;
        file_utils::require_file(&self.model_dir.join(constants::MODEL_WEIGHTS), "Detector weights")?;

        Ok(())
    }
}
