use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::config::ExtractConfig;
use super::manifest::{ManifestEntry, ManifestWriter};
use super::sampler::FrameSampler;
use super::selector::{self, PixelBox};
use super::writer::CropWriter;
use crate::decoder::{FrameData, VideoOpener};
use crate::detector::FaceDetector;
use crate::utils::{file_utils, logger};

/// Totals of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub videos: usize,
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub saved: u64,
}

/// Runs sample -> detect -> select -> write over every matching video.
///
/// Videos are handled one at a time in sorted order; each video's stream is
/// dropped before the next is opened. The crop counter is the only state
/// carried from one video to the next.
pub struct BatchDriver<'a> {
    config: &'a ExtractConfig,
    detector: &'a mut dyn FaceDetector,
    writer: CropWriter,
    manifest: Option<ManifestWriter>,
    summary: BatchSummary,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a ExtractConfig, detector: &'a mut dyn FaceDetector) -> Result<Self> {
        let manifest = config
            .manifest
            .as_deref()
            .map(ManifestWriter::create)
            .transpose()?;

        Ok(Self {
            config,
            detector,
            writer: CropWriter::new(&config.output_dir, config.flip),
            manifest,
            summary: BatchSummary::default(),
        })
    }

    /// Processes the whole batch. `running` is polled before every frame;
    /// clearing it stops the run cleanly after the frame in flight.
    pub fn run(mut self, opener: &dyn VideoOpener, running: &AtomicBool) -> Result<BatchSummary> {
        let videos = file_utils::list_files(&self.config.input_dir, &self.config.extension)?;

        if videos.is_empty() {
            let msg = format!(
                "No .{} videos found in {}",
                self.config.extension,
                self.config.input_dir.display()
            );
            logger::warn(&msg);
            eprintln!("{}", msg);
        }

        for video in &videos {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            let stream = match opener.open(video) {
                Ok(stream) => stream,
                Err(e) => {
                    logger::error(&format!("Skipping {}: {:#}", video.display(), e));
                    eprintln!("Skipping {}: {:#}", video.display(), e);
                    continue;
                }
            };

            self.summary.videos += 1;
            self.process_video(video, stream, running)?;
        }

        if let Some(manifest) = self.manifest.take() {
            manifest.finish()?;
        }

        logger::info(&format!("Batch finished: {:?}", self.summary));
        Ok(self.summary)
    }

    fn process_video(
        &mut self,
        video: &Path,
        mut stream: Box<dyn Iterator<Item = FrameData>>,
        running: &AtomicBool,
    ) -> Result<()> {
        let mut sampler = FrameSampler::new(self.config.skip)?;
        let saved_before = self.writer.saved();
        let mut sampled = 0u64;

        logger::info(&format!("Processing {}", video.display()));

        while running.load(Ordering::SeqCst) {
            let Some(frame) = stream.next() else {
                break;
            };
            if !sampler.accept() {
                continue;
            }
            sampled += 1;
            self.process_frame(video, &frame, sampler.read())?;
        }

        // Release the decoder before the next video is opened
        drop(stream);

        let saved = self.writer.saved() - saved_before;
        self.summary.frames_read += sampler.read();
        self.summary.frames_sampled += sampled;
        self.summary.saved = self.writer.saved();

        let line = format!(
            "{}: {} frames read, {} analyzed, {} faces saved",
            video.display(),
            sampler.read(),
            sampled,
            saved
        );
        logger::info(&line);
        eprintln!("{}", line);

        Ok(())
    }

    fn process_frame(&mut self, video: &Path, frame: &FrameData, ordinal: u64) -> Result<()> {
        let candidates = match self.detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(e) => {
                logger::error(&format!(
                    "Detection failed on {} frame {}: {:#}",
                    video.display(),
                    ordinal,
                    e
                ));
                return Ok(());
            }
        };

        let Some(selection) =
            selector::select(&candidates, self.config.confidence, frame.width, frame.height)
        else {
            return Ok(());
        };

        let Some(region) = selection.pixel_box.clamp_to(frame.width, frame.height) else {
            logger::debug(&format!(
                "Degenerate box {:?} on {} frame {}, skipped",
                selection.pixel_box,
                video.display(),
                ordinal
            ));
            return Ok(());
        };

        let path = self.writer.write(frame, region)?;
        logger::info(&format!(
            "Saved {} from {} frame {} (confidence {:.3})",
            path.display(),
            video.display(),
            ordinal,
            selection.confidence
        ));
        eprintln!("[INFO] saved {} to disk", path.display());

        if let Some(manifest) = self.manifest.as_mut() {
            let file = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            manifest.record(&ManifestEntry {
                file,
                video: video.to_path_buf(),
                frame: ordinal,
                confidence: selection.confidence,
                bbox: PixelBox::from(region),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectionCandidate;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const W: u32 = 40;
    const H: u32 = 20;

    /// Serves synthetic videos keyed by file name. Each frame's first red
    /// byte holds its 1-based ordinal so the fake detector can see it.
    struct FakeOpener {
        lengths: HashMap<String, u8>,
        opened: RefCell<Vec<String>>,
    }

    impl FakeOpener {
        fn new(videos: &[(&str, u8)]) -> Self {
            Self {
                lengths: videos.iter().map(|(n, len)| (n.to_string(), *len)).collect(),
                opened: RefCell::new(Vec::new()),
            }
        }
    }

    impl VideoOpener for FakeOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn Iterator<Item = FrameData>>> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let len = *self
                .lengths
                .get(&name)
                .ok_or_else(|| anyhow::anyhow!("corrupt container"))?;
            self.opened.borrow_mut().push(name);
            Ok(Box::new((1..=len).map(|ordinal| {
                let mut frame = FrameData::filled(W, H, [0, 0, 0]);
                frame.buffer[0] = ordinal;
                frame
            })))
        }
    }

    type Script = Box<dyn Fn(u8) -> Result<Vec<DetectionCandidate>>>;

    struct FakeDetector {
        seen: Vec<u8>,
        script: Script,
    }

    impl FakeDetector {
        fn new(script: impl Fn(u8) -> Result<Vec<DetectionCandidate>> + 'static) -> Self {
            Self {
                seen: Vec::new(),
                script: Box::new(script),
            }
        }

        fn always(confidence: f32) -> Self {
            Self::new(move |_| Ok(vec![DetectionCandidate::new(confidence, 0.25, 0.0, 0.75, 0.5)]))
        }
    }

    impl FaceDetector for FakeDetector {
        fn detect(&mut self, frame: &FrameData) -> Result<Vec<DetectionCandidate>> {
            let ordinal = frame.buffer[0];
            self.seen.push(ordinal);
            (self.script)(ordinal)
        }
    }

    struct Fixture {
        _root: TempDir,
        config: ExtractConfig,
    }

    fn fixture(videos: &[&str], skip: u32) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("videos");
        let output = root.path().join("faces");
        fs::create_dir(&input).unwrap();
        fs::create_dir(&output).unwrap();
        for name in videos {
            File::create(input.join(name)).unwrap();
        }

        let config = ExtractConfig {
            input_dir: input,
            output_dir: output,
            model_dir: root.path().join("model"),
            confidence: 0.5,
            skip,
            flip: None,
            extension: "mp4".to_string(),
            manifest: None,
        };
        Fixture { _root: root, config }
    }

    fn run(
        config: &ExtractConfig,
        opener: &FakeOpener,
        detector: &mut FakeDetector,
    ) -> Result<BatchSummary> {
        let running = AtomicBool::new(true);
        BatchDriver::new(config, detector)?.run(opener, &running)
    }

    fn saved_names(config: &ExtractConfig) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&config.output_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort_by_key(|n| n.trim_end_matches(".png").parse::<u64>().unwrap_or(u64::MAX));
        names
    }

    #[test]
    fn test_counter_spans_videos_in_sorted_order() {
        let f = fixture(&["b.mp4", "a.mp4", "skip.avi"], 16);
        let opener = FakeOpener::new(&[("a.mp4", 40), ("b.mp4", 20)]);
        let mut detector = FakeDetector::always(0.9);

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(*opener.opened.borrow(), vec!["a.mp4", "b.mp4"]);
        assert_eq!(detector.seen, vec![16, 32, 16]);
        assert_eq!(saved_names(&f.config), vec!["0.png", "1.png", "2.png"]);
        assert_eq!(
            summary,
            BatchSummary { videos: 2, frames_read: 60, frames_sampled: 3, saved: 3 }
        );
    }

    #[test]
    fn test_crop_matches_box() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 1)]);
        let mut detector = FakeDetector::always(0.9);

        run(&f.config, &opener, &mut detector).unwrap();

        let crop = image::open(f.config.output_dir.join("0.png")).unwrap().to_rgb8();
        assert_eq!(crop.dimensions(), (20, 10));
    }

    #[test]
    fn test_no_candidates_and_threshold_write_nothing() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 4)]);
        let mut detector = FakeDetector::new(|ordinal| match ordinal {
            1 => Ok(vec![]),
            2 => Ok(vec![DetectionCandidate::new(0.5, 0.0, 0.0, 1.0, 1.0)]),
            3 => Ok(vec![DetectionCandidate::new(0.51, 0.0, 0.0, 1.0, 1.0)]),
            _ => Ok(vec![DetectionCandidate::new(0.2, 0.0, 0.0, 1.0, 1.0)]),
        });

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(summary.frames_sampled, 4);
        assert_eq!(summary.saved, 1);
        assert_eq!(saved_names(&f.config), vec!["0.png"]);
    }

    #[test]
    fn test_degenerate_box_keeps_counter() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 3)]);
        let mut detector = FakeDetector::new(|ordinal| match ordinal {
            2 => Ok(vec![DetectionCandidate::new(0.9, 0.6, 0.6, 0.4, 0.4)]),
            _ => Ok(vec![DetectionCandidate::new(0.9, 0.0, 0.0, 0.5, 0.5)]),
        });

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(summary.saved, 2);
        assert_eq!(saved_names(&f.config), vec!["0.png", "1.png"]);
    }

    #[test]
    fn test_no_matching_videos_is_clean() {
        let f = fixture(&["notes.txt"], 16);
        let opener = FakeOpener::new(&[]);
        let mut detector = FakeDetector::always(0.9);

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(saved_names(&f.config).is_empty());
    }

    #[test]
    fn test_missing_input_dir_is_clean() {
        let f = fixture(&["a.mp4"], 1);
        fs::remove_dir_all(&f.config.input_dir).unwrap();
        let opener = FakeOpener::new(&[("a.mp4", 3)]);
        let mut detector = FakeDetector::always(0.9);

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(opener.opened.borrow().is_empty());
        assert!(saved_names(&f.config).is_empty());
    }

    #[test]
    fn test_unopenable_video_is_skipped() {
        let f = fixture(&["a.mp4", "broken.mp4", "c.mp4"], 2);
        let opener = FakeOpener::new(&[("a.mp4", 2), ("c.mp4", 2)]);
        let mut detector = FakeDetector::always(0.9);

        let summary = run(&f.config, &opener, &mut detector).unwrap();

        assert_eq!(summary.videos, 2);
        assert_eq!(saved_names(&f.config), vec!["0.png", "1.png"]);
    }

    #[test]
    fn test_detection_error_skips_frame() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 3)]);
        let mut detector = FakeDetector::new(|ordinal| {
            if ordinal == 1 {
                anyhow::bail!("inference failed")
            }
            Ok(vec![DetectionCandidate::new(0.9, 0.0, 0.0, 1.0, 1.0)])
        });

        let summary = run(&f.config, &opener, &mut detector).unwrap();
        assert_eq!(summary.saved, 2);
    }

    #[test]
    fn test_write_error_is_fatal() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 2)]);
        let mut detector = FakeDetector::always(0.9);
        fs::remove_dir(&f.config.output_dir).unwrap();

        assert!(run(&f.config, &opener, &mut detector).is_err());
    }

    #[test]
    fn test_stopped_run_reads_nothing() {
        let f = fixture(&["a.mp4"], 1);
        let opener = FakeOpener::new(&[("a.mp4", 5)]);
        let mut detector = FakeDetector::always(0.9);
        let running = AtomicBool::new(false);

        let summary = BatchDriver::new(&f.config, &mut detector)
            .unwrap()
            .run(&opener, &running)
            .unwrap();

        assert_eq!(summary.frames_read, 0);
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn test_manifest_records_provenance() {
        let mut f = fixture(&["a.mp4", "b.mp4"], 2);
        let manifest_path: PathBuf = f.config.output_dir.with_file_name("faces.jsonl");
        f.config.manifest = Some(manifest_path.clone());
        let opener = FakeOpener::new(&[("a.mp4", 4), ("b.mp4", 2)]);
        let mut detector = FakeDetector::always(0.9);

        run(&f.config, &opener, &mut detector).unwrap();

        let entries: Vec<serde_json::Value> = fs::read_to_string(&manifest_path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1]["file"], "1.png");
        assert_eq!(entries[1]["frame"], 4);
        assert!(entries[2]["video"].as_str().unwrap().ends_with("b.mp4"));
        assert_eq!(entries[2]["frame"], 2);
        assert_eq!(entries[0]["box"]["start_x"], 10);
        assert_eq!(entries[0]["box"]["end_x"], 30);
    }
}
