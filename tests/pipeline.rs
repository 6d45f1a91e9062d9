use galibo_kernel::{
    DetectOptions, Detection, Frame, Inspector, LimitTable, LocalizerRegistry, MarkerObservation,
    ReasonCode, ScaleCalibrator, StubLocalizer, StubMarkerLocator, TallestBox, Verdict,
    VerdictOutcome, VerdictSource,
};

fn frame() -> Frame {
    Frame::from_rgb8(vec![128; 640 * 480 * 3], 640, 480).unwrap()
}

/// Marker whose corner 0 -> corner 2 diagonal is 20 px, so with the 0.20 m
/// reference length the derived scale is exactly 0.01 m/px.
fn marker_with_diagonal_20px() -> MarkerObservation {
    MarkerObservation {
        id: 0,
        corners: [[0.0, 0.0], [12.0, 0.0], [12.0, 16.0], [0.0, 16.0]],
    }
}

fn inspector(detections: Vec<Detection>, markers: Vec<MarkerObservation>) -> Inspector {
    let mut localizers = LocalizerRegistry::new();
    localizers.register(StubLocalizer::with_detections(detections));
    Inspector::new(
        LimitTable::default(),
        0.05,
        DetectOptions::default(),
        localizers,
        ScaleCalibrator::new(StubMarkerLocator::with_markers(markers), 0.20),
        Box::new(TallestBox),
    )
}

fn assert_outcome_consistency(verdict: &Verdict) {
    assert_eq!(
        verdict.outcome == VerdictOutcome::Aprobado,
        verdict.reasons.is_empty()
    );
}

#[test]
fn scenario_a_within_limits_is_approved() {
    let inspector = inspector(
        vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.9)],
        vec![marker_with_diagonal_20px()],
    );
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();

    assert_eq!(verdict.outcome, VerdictOutcome::Aprobado);
    assert_eq!(verdict.source, VerdictSource::Measured);
    assert!(verdict.reasons.is_empty());
    let m = verdict.measurement.unwrap();
    assert!((m.height_m - 4.0).abs() < 1e-6);
    assert!((m.width_m - 1.0).abs() < 1e-6);
    assert_outcome_consistency(&verdict);
}

#[test]
fn scenario_b_height_over_margin_is_flagged() {
    // Diagonal of 0.20/0.013 px gives a scale of 0.013 m/px: the 400 px box
    // measures 5.2 m, over the 4.8 + 0.05 margin; width 1.3 m stays within.
    let diagonal = (0.20 / 0.013) as f32;
    let marker = MarkerObservation {
        id: 0,
        corners: [
            [0.0, 0.0],
            [diagonal / 2.0, 0.0],
            [diagonal, 0.0],
            [diagonal / 2.0, 1.0],
        ],
    };
    let inspector = inspector(vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.9)], vec![marker]);
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();

    assert_eq!(verdict.outcome, VerdictOutcome::Observado);
    assert_eq!(verdict.reasons, vec![ReasonCode::ExcedeAltura]);
    let m = verdict.measurement.unwrap();
    assert!((m.height_m - 5.2).abs() < 1e-3);
    assert!((m.width_m - 1.3).abs() < 1e-3);
    assert_outcome_consistency(&verdict);
}

#[test]
fn scenario_c_no_detections_reports_limits() {
    let inspector = inspector(Vec::new(), vec![marker_with_diagonal_20px()]);
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();

    assert_eq!(verdict.outcome, VerdictOutcome::Observado);
    assert_eq!(verdict.source, VerdictSource::NoDetection);
    assert_eq!(verdict.reasons, vec![ReasonCode::NoDetection]);
    assert!(verdict.measurement.is_none());
    assert_eq!(verdict.limits.alto_m, 4.8);
    assert_eq!(verdict.limits.ancho_m, 3.1);
    assert_outcome_consistency(&verdict);
}

#[test]
fn no_marker_yields_no_scale_branch() {
    let inspector = inspector(vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.9)], Vec::new());
    let verdict = inspector.inspect(&frame(), "plataforma").unwrap();

    assert_eq!(verdict.source, VerdictSource::NoScaleReference);
    assert_eq!(verdict.reasons, vec![ReasonCode::NoScaleMarker]);
    assert!(verdict.measurement.is_none());
    let wire = verdict.to_json();
    assert!(wire["alto_m"].is_null());
    assert!(wire["ancho_m"].is_null());
    assert_outcome_consistency(&verdict);
}

#[test]
fn degenerate_marker_counts_as_no_scale() {
    // Zero-size marker: corner 0 == corner 2, non-finite scale.
    let marker = MarkerObservation {
        id: 3,
        corners: [[50.0, 50.0]; 4],
    };
    let inspector = inspector(vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.9)], vec![marker]);
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();
    assert_eq!(verdict.source, VerdictSource::NoScaleReference);
}

#[test]
fn no_detection_takes_precedence_over_no_scale() {
    let inspector = inspector(Vec::new(), Vec::new());
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();
    assert_eq!(verdict.source, VerdictSource::NoDetection);
    assert_eq!(verdict.reasons, vec![ReasonCode::NoDetection]);
}

#[test]
fn selector_picks_first_occurrence_of_max_height() {
    let detections = vec![
        Detection::new(0.0, 0.0, 50.0, 10.0, 0.9),
        Detection::new(0.0, 0.0, 10.0, 30.0, 0.9),
        Detection::new(100.0, 0.0, 400.0, 30.0, 0.9),
    ];
    let inspector = inspector(detections, vec![marker_with_diagonal_20px()]);
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();
    // Second box (10 px wide) wins the height tie, not the third (300 px wide).
    let m = verdict.measurement.unwrap();
    assert!((m.width_m - 0.1).abs() < 1e-6);
}

#[test]
fn repeated_inspections_are_identical() {
    let inspector = inspector(
        vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.9)],
        vec![marker_with_diagonal_20px()],
    );
    let frame = frame();
    let first = inspector.inspect(&frame, "camion_rigido").unwrap();
    let second = inspector.inspect(&frame, "camion_rigido").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn below_threshold_detections_are_invisible() {
    let inspector = inspector(
        vec![Detection::new(0.0, 0.0, 100.0, 400.0, 0.1)],
        vec![marker_with_diagonal_20px()],
    );
    let verdict = inspector.inspect(&frame(), "camion_rigido").unwrap();
    assert_eq!(verdict.source, VerdictSource::NoDetection);
}
