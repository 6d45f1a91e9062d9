use anyhow::Result;

use crate::detect::result::Detection;

/// Per-call tuning for a localizer backend.
#[derive(Clone, Copy, Debug)]
pub struct DetectOptions {
    /// Detections below this confidence are dropped by the backend.
    pub min_confidence: f32,
    /// Long-side resolution the backend should downscale to before inference.
    /// Returned boxes are always in input pixel coordinates regardless.
    pub target_resolution: u32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.25,
            target_resolution: 960,
        }
    }
}

/// Object localizer backend trait.
///
/// This is a capability boundary: the pipeline only assumes "given an image,
/// produce zero or more axis-aligned boxes with confidence". Implementations
/// own any internal resizing or letterboxing; boxes they return must be in the
/// pixel coordinates of the frame they received.
///
/// Implementations must treat the pixel slice as read-only and ephemeral and
/// must not perform network I/O during `detect`.
pub trait LocalizerBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB8 frame. May return an empty vector.
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
