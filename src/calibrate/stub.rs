use anyhow::Result;

use crate::calibrate::{MarkerLocator, MarkerObservation};

/// Stub locator for testing and default wiring. Returns canned observations.
pub struct StubMarkerLocator {
    markers: Vec<MarkerObservation>,
}

impl StubMarkerLocator {
    /// A locator that never finds a marker.
    pub fn empty() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    /// A locator that always reports the given markers, in order.
    pub fn with_markers(markers: Vec<MarkerObservation>) -> Self {
        Self { markers }
    }
}

impl Default for StubMarkerLocator {
    fn default() -> Self {
        Self::empty()
    }
}

impl MarkerLocator for StubMarkerLocator {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn locate(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<Vec<MarkerObservation>> {
        Ok(self.markers.clone())
    }
}
