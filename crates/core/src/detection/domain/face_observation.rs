//! Detector output for a single face: named landmark regions in normalized
//! frame coordinates.

use std::collections::BTreeMap;
use std::fmt;

use crate::shared::geometry::{NormalizedRect, Point2};

/// Named facial feature outlines, in drawing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LandmarkRegion {
    FaceContour,
    OuterLips,
    InnerLips,
    LeftEye,
    RightEye,
    LeftPupil,
    RightPupil,
    LeftEyebrow,
    RightEyebrow,
}

impl LandmarkRegion {
    pub const ALL: [LandmarkRegion; 9] = [
        LandmarkRegion::FaceContour,
        LandmarkRegion::OuterLips,
        LandmarkRegion::InnerLips,
        LandmarkRegion::LeftEye,
        LandmarkRegion::RightEye,
        LandmarkRegion::LeftPupil,
        LandmarkRegion::RightPupil,
        LandmarkRegion::LeftEyebrow,
        LandmarkRegion::RightEyebrow,
    ];

    /// The face contour runs ear to ear along the jaw and stays open;
    /// every other region outlines an enclosed feature.
    pub fn is_closed(self) -> bool {
        self != LandmarkRegion::FaceContour
    }

    pub fn name(self) -> &'static str {
        match self {
            LandmarkRegion::FaceContour => "face_contour",
            LandmarkRegion::OuterLips => "outer_lips",
            LandmarkRegion::InnerLips => "inner_lips",
            LandmarkRegion::LeftEye => "left_eye",
            LandmarkRegion::RightEye => "right_eye",
            LandmarkRegion::LeftPupil => "left_pupil",
            LandmarkRegion::RightPupil => "right_pupil",
            LandmarkRegion::LeftEyebrow => "left_eyebrow",
            LandmarkRegion::RightEyebrow => "right_eyebrow",
        }
    }
}

impl fmt::Display for LandmarkRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One detected face. Regions missing from the map were not located.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    bounds: NormalizedRect,
    confidence: f64,
    regions: BTreeMap<LandmarkRegion, Vec<Point2>>,
}

impl FaceObservation {
    pub fn new(bounds: NormalizedRect, confidence: f64) -> Self {
        Self {
            bounds,
            confidence,
            regions: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a region. Empty point lists are ignored.
    pub fn with_region(mut self, region: LandmarkRegion, points: Vec<Point2>) -> Self {
        self.insert_region(region, points);
        self
    }

    pub fn insert_region(&mut self, region: LandmarkRegion, points: Vec<Point2>) {
        if !points.is_empty() {
            self.regions.insert(region, points);
        }
    }

    pub fn bounds(&self) -> NormalizedRect {
        self.bounds
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn region(&self, region: LandmarkRegion) -> Option<&[Point2]> {
        self.regions.get(&region).map(|p| p.as_slice())
    }

    /// Present regions in drawing order.
    pub fn regions(&self) -> impl Iterator<Item = (LandmarkRegion, &[Point2])> {
        self.regions.iter().map(|(r, p)| (*r, p.as_slice()))
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> NormalizedRect {
        NormalizedRect {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        }
    }

    #[test]
    fn test_only_contour_is_open() {
        let open: Vec<_> = LandmarkRegion::ALL
            .iter()
            .filter(|r| !r.is_closed())
            .collect();
        assert_eq!(open, vec![&LandmarkRegion::FaceContour]);
    }

    #[test]
    fn test_all_is_sorted_in_drawing_order() {
        let mut sorted = LandmarkRegion::ALL;
        sorted.sort();
        assert_eq!(sorted, LandmarkRegion::ALL);
        assert_eq!(LandmarkRegion::ALL[0], LandmarkRegion::FaceContour);
        assert_eq!(LandmarkRegion::ALL[8], LandmarkRegion::RightEyebrow);
    }

    #[test]
    fn test_regions_iterate_in_drawing_order() {
        let obs = FaceObservation::new(bounds(), 0.9)
            .with_region(LandmarkRegion::RightEyebrow, vec![Point2::new(0.6, 0.3)])
            .with_region(LandmarkRegion::FaceContour, vec![Point2::new(0.3, 0.5)])
            .with_region(LandmarkRegion::LeftEye, vec![Point2::new(0.4, 0.4)]);

        let order: Vec<_> = obs.regions().map(|(r, _)| r).collect();
        assert_eq!(
            order,
            vec![
                LandmarkRegion::FaceContour,
                LandmarkRegion::LeftEye,
                LandmarkRegion::RightEyebrow
            ]
        );
    }

    #[test]
    fn test_empty_region_is_absent() {
        let obs = FaceObservation::new(bounds(), 0.9).with_region(LandmarkRegion::InnerLips, vec![]);
        assert!(obs.region(LandmarkRegion::InnerLips).is_none());
        assert_eq!(obs.region_count(), 0);
    }

    #[test]
    fn test_accessors() {
        let obs = FaceObservation::new(bounds(), 0.75)
            .with_region(LandmarkRegion::LeftPupil, vec![Point2::new(0.4, 0.4)]);
        assert_eq!(obs.bounds(), bounds());
        assert_eq!(obs.confidence(), 0.75);
        assert_eq!(
            obs.region(LandmarkRegion::LeftPupil),
            Some(&[Point2::new(0.4, 0.4)][..])
        );
    }

    #[test]
    fn test_display_uses_snake_case_name() {
        assert_eq!(LandmarkRegion::OuterLips.to_string(), "outer_lips");
    }
}
