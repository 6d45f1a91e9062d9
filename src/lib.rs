//! Gálibo kernel — vehicle clearance gauge decision service.
//!
//! Estimates the physical height and width of a vehicle from a single
//! inspection photo and compares the measurement against per-vehicle-type
//! regulatory limits, producing an approval verdict.
//!
//! # Pipeline
//!
//! One request flows linearly through:
//!
//! 1. Limit lookup for the requested vehicle type (unknown key is a client
//!    error, never a flagged verdict).
//! 2. Object localizer and scale calibrator, both against the same frame
//!    (order-independent, no shared mutable state).
//! 3. Primary-subject selection (deterministic, injectable policy).
//! 4. Pixel-to-metric conversion using the marker-derived scale factor.
//! 5. Tolerance-aware compliance evaluation.
//! 6. Verdict assembly, covering the success path and both degraded branches
//!    (no detection, no scale reference).
//!
//! # Invariants
//!
//! - A verdict is `APROBADO` iff its reason list is empty (enforced by the
//!   `Verdict` constructors).
//! - A scale factor, when present, is finite and positive (enforced by
//!   `ScaleFactor::new`).
//! - The limit table and detector wiring are built once at startup and never
//!   mutated; requests share them read-only.
//! - Frames live only for the duration of one request.
//!
//! # Module Structure
//!
//! - `frame`: decoded image container
//! - `detect`: object localizer capability boundary (trait, backends, registry)
//! - `calibrate`: fiducial-marker scale recovery
//! - `select`: primary-subject selection policies
//! - `measure` / `evaluate`: conversion and compliance rules
//! - `verdict`: terminal output entity and wire shapes
//! - `api`: HTTP/JSON transport
//! - `config`: process-wide immutable configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod api;
pub mod calibrate;
pub mod config;
pub mod detect;
pub mod evaluate;
pub mod frame;
pub mod measure;
pub mod select;
pub mod verdict;

pub use calibrate::{MarkerLocator, MarkerObservation, ScaleCalibrator, ScaleFactor, StubMarkerLocator};
pub use config::GaliboConfig;
pub use detect::{DetectOptions, Detection, LocalizerBackend, LocalizerRegistry, StubLocalizer};
pub use evaluate::{evaluate, Evaluation};
pub use frame::Frame;
pub use measure::{convert, Measurement};
pub use select::{selector_from_name, LargestArea, SubjectSelector, TallestBox};
pub use verdict::{ReasonCode, Verdict, VerdictOutcome, VerdictSource};

#[cfg(feature = "backend-tract")]
pub use detect::TractLocalizer;

/// Regulatory limits for one vehicle type, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleLimits {
    pub alto_m: f64,
    pub ancho_m: f64,
}

/// Reference limit values shared by all default vehicle types.
const DEFAULT_LIMITS: VehicleLimits = VehicleLimits {
    alto_m: 4.8,
    ancho_m: 3.1,
};

/// Immutable vehicle-type → limits table, loaded once at process start.
#[derive(Clone, Debug)]
pub struct LimitTable {
    entries: BTreeMap<String, VehicleLimits>,
}

impl LimitTable {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, VehicleLimits)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up the limits for a vehicle type.
    pub fn get(&self, vehicle_type: &str) -> Result<VehicleLimits, InspectError> {
        self.entries
            .get(vehicle_type)
            .copied()
            .ok_or_else(|| InspectError::UnknownVehicleType(vehicle_type.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &VehicleLimits)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn vehicle_types(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl Default for LimitTable {
    fn default() -> Self {
        Self::from_entries(
            ["cabezal_furgon", "camion_rigido", "plataforma"]
                .into_iter()
                .map(|key| (key.to_string(), DEFAULT_LIMITS)),
        )
    }
}

/// Request-boundary error taxonomy.
///
/// Client-input errors are distinct from inspection outcomes: a photo that
/// cannot be measured still yields a verdict, while a malformed request
/// fails here and never reaches verdict assembly.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("invalid image payload: {0}")]
    InvalidImage(String),
    #[error("unknown vehicle type '{0}'")]
    UnknownVehicleType(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Decision assembler: owns the read-only wiring and runs the pipeline for
/// each request. Shareable across request threads (`&self` API; interior
/// locking only at the collaborator boundaries).
pub struct Inspector {
    limits: LimitTable,
    tolerance_m: f64,
    detect_opts: DetectOptions,
    localizers: LocalizerRegistry,
    calibrator: ScaleCalibrator,
    selector: Box<dyn SubjectSelector>,
}

impl Inspector {
    pub fn new(
        limits: LimitTable,
        tolerance_m: f64,
        detect_opts: DetectOptions,
        localizers: LocalizerRegistry,
        calibrator: ScaleCalibrator,
        selector: Box<dyn SubjectSelector>,
    ) -> Self {
        Self {
            limits,
            tolerance_m,
            detect_opts,
            localizers,
            calibrator,
            selector,
        }
    }

    /// Build an inspector from configuration plus collaborator wiring.
    pub fn from_config<L>(
        cfg: &GaliboConfig,
        localizers: LocalizerRegistry,
        marker_locator: L,
    ) -> anyhow::Result<Self>
    where
        L: MarkerLocator + 'static,
    {
        Ok(Self::new(
            cfg.limits.clone(),
            cfg.tolerance_m,
            DetectOptions {
                min_confidence: cfg.min_confidence,
                target_resolution: cfg.target_resolution,
            },
            localizers,
            ScaleCalibrator::new(marker_locator, cfg.marker_length_m),
            selector_from_name(&cfg.selector)?,
        ))
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }

    /// Run one inspection on a decoded frame.
    pub fn inspect(&self, frame: &Frame, vehicle_type: &str) -> Result<Verdict, InspectError> {
        // Limit lookup first: it depends only on the request key, and its
        // failure is a client error rather than an inspection outcome.
        let limits = self.limits.get(vehicle_type)?;

        let detections = self.localizers.detect(
            frame.pixels(),
            frame.width(),
            frame.height(),
            &self.detect_opts,
        )?;
        let scale = self.calibrator.calibrate(frame)?;

        let verdict = match self.selector.select(&detections) {
            None => Verdict::no_detection(limits),
            Some(subject) => match scale {
                None => Verdict::no_scale(limits),
                Some(scale) => {
                    let measurement = convert(subject, scale);
                    let eval = evaluate(&measurement, &limits, self.tolerance_m);
                    Verdict::measured(measurement, limits, eval)
                }
            },
        };

        log::info!(
            "inspection verdict: type={} outcome={} source={:?} reasons={:?}",
            vehicle_type,
            verdict.outcome.as_str(),
            verdict.source,
            verdict
                .reasons
                .iter()
                .map(ReasonCode::as_str)
                .collect::<Vec<_>>()
        );
        Ok(verdict)
    }

    /// Run one inspection on encoded image bytes.
    pub fn inspect_bytes(&self, bytes: &[u8], vehicle_type: &str) -> Result<Verdict, InspectError> {
        let frame =
            Frame::decode(bytes).map_err(|e| InspectError::InvalidImage(e.to_string()))?;
        self.inspect(&frame, vehicle_type)
    }

    /// Run one inspection on a standard-base64 image payload.
    pub fn inspect_base64(
        &self,
        payload: &str,
        vehicle_type: &str,
    ) -> Result<Verdict, InspectError> {
        let frame = Frame::decode_base64(payload)
            .map_err(|e| InspectError::InvalidImage(e.to_string()))?;
        self.inspect(&frame, vehicle_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_frame() -> Frame {
        Frame::from_rgb8(vec![0; 300], 10, 10).unwrap()
    }

    fn inspector_with(localizer: StubLocalizer, locator: StubMarkerLocator) -> Inspector {
        let mut localizers = LocalizerRegistry::new();
        localizers.register(localizer);
        Inspector::new(
            LimitTable::default(),
            0.05,
            DetectOptions::default(),
            localizers,
            ScaleCalibrator::new(locator, 0.20),
            Box::new(TallestBox),
        )
    }

    #[test]
    fn default_table_holds_reference_types() {
        let table = LimitTable::default();
        for key in ["cabezal_furgon", "camion_rigido", "plataforma"] {
            let limits = table.get(key).unwrap();
            assert_eq!(limits.alto_m, 4.8);
            assert_eq!(limits.ancho_m, 3.1);
        }
    }

    #[test]
    fn unknown_vehicle_type_is_a_client_error() {
        let inspector = inspector_with(StubLocalizer::empty(), StubMarkerLocator::empty());
        let err = inspector
            .inspect(&blank_frame(), "unknown_type")
            .unwrap_err();
        assert!(matches!(err, InspectError::UnknownVehicleType(_)));
    }

    #[test]
    fn undecodable_bytes_are_a_client_error() {
        let inspector = inspector_with(StubLocalizer::empty(), StubMarkerLocator::empty());
        let err = inspector
            .inspect_bytes(b"definitely not an image", "camion_rigido")
            .unwrap_err();
        assert!(matches!(err, InspectError::InvalidImage(_)));
    }

    #[test]
    fn no_detection_branch_still_reports_limits() {
        let inspector = inspector_with(StubLocalizer::empty(), StubMarkerLocator::empty());
        let verdict = inspector.inspect(&blank_frame(), "plataforma").unwrap();
        assert_eq!(verdict.source, VerdictSource::NoDetection);
        assert_eq!(verdict.limits.alto_m, 4.8);
        assert!(verdict.measurement.is_none());
    }
}
