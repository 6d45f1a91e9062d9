//! Primary-subject selection.
//!
//! In a clearance photo the vehicle silhouette is expected to dominate the
//! scene vertically, so the default policy picks the tallest box. That is a
//! domain heuristic, not a guarantee; the policy is injectable so deployments
//! can swap in a different rule without touching the pipeline.

use anyhow::{anyhow, Result};

use crate::detect::Detection;

/// Subject-selection policy: pick the single detection representing the
/// vehicle under measurement. Must be deterministic; ties break by first
/// occurrence in the input sequence.
pub trait SubjectSelector: Send + Sync {
    /// Policy identifier (used in configuration).
    fn name(&self) -> &'static str;

    /// Returns `None` when there are no candidates.
    fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection>;
}

/// Default policy: greatest box height.
pub struct TallestBox;

impl SubjectSelector for TallestBox {
    fn name(&self) -> &'static str {
        "tallest"
    }

    fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        select_by(detections, Detection::height)
    }
}

/// Alternative policy: greatest box area.
pub struct LargestArea;

impl SubjectSelector for LargestArea {
    fn name(&self) -> &'static str {
        "largest-area"
    }

    fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        select_by(detections, Detection::area)
    }
}

// Strictly-greater scan so the first occurrence of the maximum wins.
fn select_by<'a, F>(detections: &'a [Detection], key: F) -> Option<&'a Detection>
where
    F: Fn(&Detection) -> f32,
{
    let mut best: Option<(&Detection, f32)> = None;
    for det in detections {
        let value = key(det);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((det, value)),
        }
    }
    best.map(|(det, _)| det)
}

/// Look up a selection policy by its configured name.
pub fn selector_from_name(name: &str) -> Result<Box<dyn SubjectSelector>> {
    match name {
        "tallest" => Ok(Box::new(TallestBox)),
        "largest-area" => Ok(Box::new(LargestArea)),
        other => Err(anyhow!("unknown subject selector '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(h: f32, w: f32) -> Detection {
        Detection::new(0.0, 0.0, w, h, 0.5)
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(TallestBox.select(&[]).is_none());
        assert!(LargestArea.select(&[]).is_none());
    }

    #[test]
    fn tallest_box_wins() {
        let dets = [det(10.0, 100.0), det(30.0, 5.0), det(20.0, 50.0)];
        let picked = TallestBox.select(&dets).unwrap();
        assert_eq!(picked.height(), 30.0);
    }

    #[test]
    fn tallest_tie_breaks_by_first_occurrence() {
        let dets = [det(10.0, 1.0), det(30.0, 2.0), det(30.0, 3.0)];
        let picked = TallestBox.select(&dets).unwrap();
        assert!(std::ptr::eq(picked, &dets[1]));
    }

    #[test]
    fn largest_area_differs_from_tallest() {
        let dets = [det(10.0, 100.0), det(30.0, 5.0)];
        assert_eq!(LargestArea.select(&dets).unwrap().area(), 1000.0);
        assert_eq!(TallestBox.select(&dets).unwrap().height(), 30.0);
    }

    #[test]
    fn selector_lookup_by_name() {
        assert_eq!(selector_from_name("tallest").unwrap().name(), "tallest");
        assert_eq!(
            selector_from_name("largest-area").unwrap().name(),
            "largest-area"
        );
        assert!(selector_from_name("most-central").is_err());
    }
}
