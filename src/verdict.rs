//! Verdict entity and its wire shape.
//!
//! A verdict is constructed once per request and serialized immediately. The
//! constructors are the only way to build one, which keeps the core invariant
//! (`Aprobado` iff no reasons) true by construction.

use serde_json::{json, Value};

use crate::evaluate::Evaluation;
use crate::measure::Measurement;
use crate::VehicleLimits;

/// Terminal outcome. `Aprobado` iff the reason list is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictOutcome {
    Aprobado,
    Observado,
}

impl VerdictOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictOutcome::Aprobado => "APROBADO",
            VerdictOutcome::Observado => "OBSERVADO",
        }
    }
}

/// Which terminal branch of the pipeline produced the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictSource {
    Measured,
    NoDetection,
    NoScaleReference,
}

/// Machine-readable reason codes, using the original wire strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    NoDetection,
    NoScaleMarker,
    ExcedeAltura,
    ExcedeAncho,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NoDetection => "no_detection",
            ReasonCode::NoScaleMarker => "no_scale_marker",
            ReasonCode::ExcedeAltura => "excede_altura",
            ReasonCode::ExcedeAncho => "excede_ancho",
        }
    }
}

/// Rule-source tag reported on measured verdicts.
const RULE_SOURCE: &str = "GT";

/// One inspection verdict. Immutable after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub outcome: VerdictOutcome,
    pub reasons: Vec<ReasonCode>,
    pub measurement: Option<Measurement>,
    pub limits: VehicleLimits,
    pub source: VerdictSource,
}

impl Verdict {
    /// Terminal branch: the localizer produced no usable candidate.
    pub fn no_detection(limits: VehicleLimits) -> Self {
        Self {
            outcome: VerdictOutcome::Observado,
            reasons: vec![ReasonCode::NoDetection],
            measurement: None,
            limits,
            source: VerdictSource::NoDetection,
        }
    }

    /// Terminal branch: no usable fiducial marker, measurement impossible.
    pub fn no_scale(limits: VehicleLimits) -> Self {
        Self {
            outcome: VerdictOutcome::Observado,
            reasons: vec![ReasonCode::NoScaleMarker],
            measurement: None,
            limits,
            source: VerdictSource::NoScaleReference,
        }
    }

    /// Terminal branch: measured and evaluated.
    pub fn measured(measurement: Measurement, limits: VehicleLimits, eval: Evaluation) -> Self {
        Self {
            outcome: eval.outcome,
            reasons: eval.reasons,
            measurement: Some(measurement),
            limits,
            source: VerdictSource::Measured,
        }
    }

    /// Wire shape of the verdict.
    ///
    /// Three shapes, matched key-for-key to the original service:
    /// no-detection omits the measurement keys, no-scale carries explicit
    /// nulls, measured carries values plus the rule-source tag. Every shape
    /// reports the applicable limits.
    pub fn to_json(&self) -> Value {
        let motivos: Vec<&str> = self.reasons.iter().map(ReasonCode::as_str).collect();
        match self.source {
            VerdictSource::NoDetection => json!({
                "resultado": self.outcome.as_str(),
                "motivos": motivos,
                "limite_alto_m": self.limits.alto_m,
                "limite_ancho_m": self.limits.ancho_m,
            }),
            VerdictSource::NoScaleReference => json!({
                "resultado": self.outcome.as_str(),
                "motivos": motivos,
                "alto_m": Value::Null,
                "ancho_m": Value::Null,
                "limite_alto_m": self.limits.alto_m,
                "limite_ancho_m": self.limits.ancho_m,
            }),
            VerdictSource::Measured => {
                // Constructors guarantee the measurement is present here.
                let (alto_m, ancho_m) = match &self.measurement {
                    Some(m) => (json!(m.height_m), json!(m.width_m)),
                    None => (Value::Null, Value::Null),
                };
                json!({
                    "resultado": self.outcome.as_str(),
                    "motivos": motivos,
                    "alto_m": alto_m,
                    "ancho_m": ancho_m,
                    "limite_alto_m": self.limits.alto_m,
                    "limite_ancho_m": self.limits.ancho_m,
                    "regla_fuente": RULE_SOURCE,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate;

    const LIMITS: VehicleLimits = VehicleLimits {
        alto_m: 4.8,
        ancho_m: 3.1,
    };

    #[test]
    fn no_detection_shape_omits_measurement_keys() {
        let wire = Verdict::no_detection(LIMITS).to_json();
        let obj = wire.as_object().unwrap();
        assert_eq!(wire["resultado"], "OBSERVADO");
        assert_eq!(wire["motivos"], json!(["no_detection"]));
        assert!(!obj.contains_key("alto_m"));
        assert!(!obj.contains_key("ancho_m"));
        assert!(!obj.contains_key("regla_fuente"));
        assert_eq!(wire["limite_alto_m"], 4.8);
        assert_eq!(wire["limite_ancho_m"], 3.1);
    }

    #[test]
    fn no_scale_shape_carries_explicit_nulls() {
        let wire = Verdict::no_scale(LIMITS).to_json();
        let obj = wire.as_object().unwrap();
        assert_eq!(wire["motivos"], json!(["no_scale_marker"]));
        assert!(obj.contains_key("alto_m"));
        assert!(wire["alto_m"].is_null());
        assert!(wire["ancho_m"].is_null());
        assert!(!obj.contains_key("regla_fuente"));
    }

    #[test]
    fn measured_shape_reports_values_and_rule_source() {
        let m = Measurement {
            height_m: 4.0,
            width_m: 1.0,
        };
        let verdict = Verdict::measured(m, LIMITS, evaluate(&m, &LIMITS, 0.05));
        let wire = verdict.to_json();
        assert_eq!(wire["resultado"], "APROBADO");
        assert_eq!(wire["motivos"], json!([]));
        assert_eq!(wire["alto_m"], 4.0);
        assert_eq!(wire["ancho_m"], 1.0);
        assert_eq!(wire["regla_fuente"], "GT");
    }

    #[test]
    fn outcome_matches_reason_emptiness_on_every_branch() {
        let m = Measurement {
            height_m: 5.2,
            width_m: 1.3,
        };
        let verdicts = [
            Verdict::no_detection(LIMITS),
            Verdict::no_scale(LIMITS),
            Verdict::measured(m, LIMITS, evaluate(&m, &LIMITS, 0.05)),
        ];
        for verdict in verdicts {
            assert_eq!(
                verdict.outcome == VerdictOutcome::Aprobado,
                verdict.reasons.is_empty()
            );
        }
    }
}
