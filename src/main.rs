mod core;
mod decoder;
mod detector;
mod shared;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::{ExtractConfig, FlipAxis, Settings};

#[derive(Parser)]
#[command(author, version, about = "Build a face crop dataset from a folder of videos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample frames from every video and save the most confident face of each
    Extract {
        #[arg(short, long, help = "Directory holding the input videos")]
        input: PathBuf,
        #[arg(short, long, help = "Existing directory that receives 0.png, 1.png, ...")]
        output: PathBuf,
        #[arg(
            short,
            long,
            visible_alias = "detector",
            short_alias = 'd',
            help = "Directory with deploy.prototxt and the res10 caffemodel"
        )]
        model: PathBuf,
        #[arg(short, long, help = "Minimum detection confidence, exclusive [default: 0.5]")]
        confidence: Option<f32>,
        #[arg(short, long, help = "Analyze every Nth frame [default: 16]")]
        skip: Option<u32>,
        #[arg(short, long, help = "1 to flip each crop before saving [default: 0]")]
        flip: Option<u8>,
        #[arg(long, value_enum, help = "Axis used when flipping [default: vertical]")]
        flip_axis: Option<FlipAxis>,
        #[arg(short, long, help = "Video container extension to match [default: mp4]")]
        extension: Option<String>,
        #[arg(long, help = "Write a JSON Lines provenance record per saved crop")]
        manifest: Option<PathBuf>,
        #[arg(long, help = "key = value file with defaults for the tunables above")]
        config: Option<PathBuf>,
    },
    /// Print container properties of a video as JSON
    Probe {
        #[arg(short, long)]
        video: PathBuf,
    },
}

fn main() -> Result<()> {
    crate::utils::logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            model,
            confidence,
            skip,
            flip,
            flip_axis,
            extension,
            manifest,
            config,
        } => {
            let settings = Settings {
                confidence,
                skip,
                flip,
                flip_axis,
                extension: extension.map(|e| e.trim_start_matches('.').to_string()),
            };
            let config =
                ExtractConfig::resolve(input, output, model, manifest, settings, config.as_deref())?;
            run_extract(&config)?;
        }
        Commands::Probe { video } => {
            run_probe(&video)?;
        }
    }

    Ok(())
}

#[cfg(feature = "opencv")]
fn run_extract(config: &ExtractConfig) -> Result<()> {
    use crate::core::BatchDriver;
    use crate::decoder::OpenCvOpener;
    use crate::detector::SsdFaceDetector;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    crate::utils::logger::info(&format!("Extract configuration: {:?}", config));

    let mut detector = SsdFaceDetector::load(&config.model_dir)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let summary = BatchDriver::new(config, &mut detector)?.run(&OpenCvOpener, &running)?;

    if !running.load(Ordering::SeqCst) {
        eprintln!("Interrupted, stopping early.");
    }
    eprintln!(
        "Done: {} videos, {} frames read, {} analyzed, {} faces saved to {}",
        summary.videos,
        summary.frames_read,
        summary.frames_sampled,
        summary.saved,
        config.output_dir.display()
    );

    Ok(())
}

#[cfg(feature = "opencv")]
fn run_probe(video: &std::path::Path) -> Result<()> {
    let decoder = crate::decoder::VideoDecoder::open(video)?;
    let info = decoder.info()?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn run_extract(_config: &ExtractConfig) -> Result<()> {
    anyhow::bail!("facecrop was built without the `opencv` feature; video decoding and face detection are unavailable")
}

#[cfg(not(feature = "opencv"))]
fn run_probe(_video: &std::path::Path) -> Result<()> {
    anyhow::bail!("facecrop was built without the `opencv` feature; video decoding is unavailable")
}
