//! Metric scale recovery from a fiducial marker.
//!
//! The marker locator is an external collaborator behind [`MarkerLocator`]:
//! given an image, it produces zero or more marker observations with ordered
//! corner coordinates and an identifier. The calibrator turns one observation
//! into a meters-per-pixel [`ScaleFactor`] using the marker's known physical
//! size. "No marker found" is a legitimate outcome, not an error.

mod stub;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use stub::StubMarkerLocator;

/// One detected fiducial marker.
///
/// Corners are in pixel coordinates, in detector-returned order; corner 0 and
/// corner 2 are diagonally opposite.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerObservation {
    /// Dictionary id of the decoded marker.
    pub id: u32,
    pub corners: [[f32; 2]; 4],
}

/// Fiducial-marker locator trait.
///
/// Capability boundary for the marker-detection collaborator (e.g. an ArUco
/// 4x4 dictionary detector). Implementations must treat the pixel slice as
/// read-only and ephemeral.
pub trait MarkerLocator: Send {
    /// Locator identifier.
    fn name(&self) -> &'static str;

    /// Locate markers in an RGB8 frame. May return an empty vector.
    fn locate(&mut self, pixels: &[u8], width: u32, height: u32)
        -> Result<Vec<MarkerObservation>>;
}

/// Validated meters-per-pixel conversion factor. Always finite and positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Returns `None` for non-finite or non-positive values (degenerate
    /// markers produce those; they must surface as "calibration absent").
    pub fn new(meters_per_pixel: f64) -> Option<Self> {
        if meters_per_pixel.is_finite() && meters_per_pixel > 0.0 {
            Some(Self(meters_per_pixel))
        } else {
            None
        }
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.0
    }
}

/// Derive a scale factor from one marker observation.
///
/// Uses the Euclidean pixel distance between diagonally opposite corners 0
/// and 2; the configured reference length is divided by that distance.
pub fn scale_from_marker(marker: &MarkerObservation, reference_length_m: f64) -> Option<ScaleFactor> {
    let dx = (marker.corners[0][0] - marker.corners[2][0]) as f64;
    let dy = (marker.corners[0][1] - marker.corners[2][1]) as f64;
    let diagonal_px = (dx * dx + dy * dy).sqrt();
    ScaleFactor::new(reference_length_m / diagonal_px)
}

/// Scale calibrator: locator + reference length.
pub struct ScaleCalibrator {
    locator: Arc<Mutex<dyn MarkerLocator>>,
    reference_length_m: f64,
}

impl ScaleCalibrator {
    pub fn new<L: MarkerLocator + 'static>(locator: L, reference_length_m: f64) -> Self {
        Self {
            locator: Arc::new(Mutex::new(locator)),
            reference_length_m,
        }
    }

    /// Derive a meters-per-pixel factor from the frame, or `None` when no
    /// usable marker is present.
    pub fn calibrate(&self, frame: &Frame) -> Result<Option<ScaleFactor>> {
        let markers = {
            let mut guard = self
                .locator
                .lock()
                .map_err(|_| anyhow!("marker locator lock poisoned"))?;
            guard.locate(frame.pixels(), frame.width(), frame.height())?
        };
        Ok(Self::pick_reference(&markers)
            .and_then(|marker| scale_from_marker(marker, self.reference_length_m)))
    }

    /// Choose the calibration reference among detected markers.
    ///
    /// Currently first-in-locator-output-order. Deterministic; a scored policy
    /// (largest, most central, by id) can replace this without touching callers.
    fn pick_reference(markers: &[MarkerObservation]) -> Option<&MarkerObservation> {
        markers.first()
    }
}
