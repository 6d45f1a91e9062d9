//! Pixel-to-metric measurement conversion.

use serde::Serialize;

use crate::calibrate::ScaleFactor;
use crate::detect::Detection;

/// Physical dimensions derived for one request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Measurement {
    pub height_m: f64,
    pub width_m: f64,
}

/// Apply the scale factor to the selected box.
///
/// Pure; the caller has already validated the scale factor (construction of
/// [`ScaleFactor`] enforces finite and positive).
pub fn convert(detection: &Detection, scale: ScaleFactor) -> Measurement {
    let mpp = scale.meters_per_pixel();
    Measurement {
        height_m: detection.height() as f64 * mpp,
        width_m: detection.width() as f64 * mpp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_box_dimensions() {
        let det = Detection::new(0.0, 0.0, 100.0, 400.0, 0.9);
        let scale = ScaleFactor::new(0.01).unwrap();
        let m = convert(&det, scale);
        assert!((m.height_m - 4.0).abs() < 1e-9);
        assert!((m.width_m - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offset_boxes_measure_the_same() {
        let scale = ScaleFactor::new(0.013).unwrap();
        let at_origin = Detection::new(0.0, 0.0, 100.0, 400.0, 0.9);
        let offset = Detection::new(250.0, 30.0, 350.0, 430.0, 0.9);
        assert_eq!(convert(&at_origin, scale), convert(&offset, scale));
    }
}
