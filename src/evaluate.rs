//! Compliance evaluation against the per-type limit table.

use crate::verdict::{ReasonCode, VerdictOutcome};
use crate::{Measurement, VehicleLimits};

/// Outcome of comparing one measurement against its limits.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub outcome: VerdictOutcome,
    pub reasons: Vec<ReasonCode>,
}

/// Compare a measurement against the limits with an additive tolerance.
///
/// A dimension is violated only when the measured value is strictly greater
/// than `limit + tolerance`; the margin absorbs calibration noise. Both
/// checks always run, so both reasons may accumulate.
pub fn evaluate(measurement: &Measurement, limits: &VehicleLimits, tolerance_m: f64) -> Evaluation {
    let mut reasons = Vec::new();
    if measurement.height_m > limits.alto_m + tolerance_m {
        reasons.push(ReasonCode::ExcedeAltura);
    }
    if measurement.width_m > limits.ancho_m + tolerance_m {
        reasons.push(ReasonCode::ExcedeAncho);
    }
    let outcome = if reasons.is_empty() {
        VerdictOutcome::Aprobado
    } else {
        VerdictOutcome::Observado
    };
    Evaluation { outcome, reasons }
}
