use anyhow::Result;

use crate::detect::backend::{DetectOptions, LocalizerBackend};
use crate::detect::result::Detection;

/// Stub backend for testing and default wiring. Returns a canned detection
/// list filtered by the caller's confidence threshold.
pub struct StubLocalizer {
    detections: Vec<Detection>,
}

impl StubLocalizer {
    /// A stub that never detects anything.
    pub fn empty() -> Self {
        Self {
            detections: Vec::new(),
        }
    }

    /// A stub that always reports the given detections.
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl Default for StubLocalizer {
    fn default() -> Self {
        Self::empty()
    }
}

impl LocalizerBackend for StubLocalizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>> {
        Ok(self
            .detections
            .iter()
            .filter(|det| det.confidence >= opts.min_confidence)
            .cloned()
            .collect())
    }
}
