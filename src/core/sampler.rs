use anyhow::Result;

/// Stride-based frame sampler for one video.
///
/// `read` counts every frame pulled from the source. It is bumped before the
/// stride test, so with `skip = k` the accepted ordinals are `k, 2k, 3k, ...`.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    skip: u32,
    read: u64,
}

impl FrameSampler {
    pub fn new(skip: u32) -> Result<Self> {
        if skip == 0 {
            anyhow::bail!("Frame stride must be at least 1, got 0");
        }
        Ok(Self { skip, read: 0 })
    }

    /// Registers one pulled frame and reports whether it should be analyzed.
    pub fn accept(&mut self) -> bool {
        self.read += 1;
        self.read % self.skip as u64 == 0
    }

    /// Frames pulled so far; also the 1-based ordinal of the latest frame.
    pub fn read(&self) -> u64 {
        self.read
    }
}
