//! Groups the 468-point face mesh (478 with refined irises) into named
//! landmark regions.
//!
//! "Left" and "right" are as seen in the image: the left eye is the one with
//! the smaller x coordinate on an upright, frontal face.

use crate::detection::domain::face_observation::{FaceObservation, LandmarkRegion};
use crate::shared::geometry::{NormalizedRect, Point2};

pub const MESH_POINTS: usize = 468;
pub const REFINED_MESH_POINTS: usize = 478;

/// Jaw line from the left temple around the chin to the right temple.
const FACE_CONTOUR: [usize; 25] = [
    162, 127, 234, 93, 132, 58, 172, 136, 150, 149, 176, 148, 152, 377, 400, 378, 379, 365, 397,
    288, 361, 323, 454, 356, 389,
];

const OUTER_LIPS: [usize; 20] = [
    61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291, 375, 321, 405, 314, 17, 84, 181, 91, 146,
];

const INNER_LIPS: [usize; 20] = [
    78, 191, 80, 81, 82, 13, 312, 311, 310, 415, 308, 324, 318, 402, 317, 14, 87, 178, 88, 95,
];

const LEFT_EYE: [usize; 16] = [
    33, 246, 161, 160, 159, 158, 157, 173, 133, 155, 154, 153, 145, 144, 163, 7,
];

const RIGHT_EYE: [usize; 16] = [
    362, 398, 384, 385, 386, 387, 388, 466, 263, 249, 390, 373, 374, 380, 381, 382,
];

const LEFT_EYEBROW: [usize; 10] = [70, 63, 105, 66, 107, 55, 65, 52, 53, 46];

const RIGHT_EYEBROW: [usize; 10] = [336, 296, 334, 293, 300, 276, 283, 282, 295, 285];

/// Iris rings; only present in refined meshes.
const LEFT_PUPIL: [usize; 4] = [469, 470, 471, 472];
const RIGHT_PUPIL: [usize; 4] = [474, 475, 476, 477];

fn indices(region: LandmarkRegion) -> &'static [usize] {
    match region {
        LandmarkRegion::FaceContour => &FACE_CONTOUR,
        LandmarkRegion::OuterLips => &OUTER_LIPS,
        LandmarkRegion::InnerLips => &INNER_LIPS,
        LandmarkRegion::LeftEye => &LEFT_EYE,
        LandmarkRegion::RightEye => &RIGHT_EYE,
        LandmarkRegion::LeftPupil => &LEFT_PUPIL,
        LandmarkRegion::RightPupil => &RIGHT_PUPIL,
        LandmarkRegion::LeftEyebrow => &LEFT_EYEBROW,
        LandmarkRegion::RightEyebrow => &RIGHT_EYEBROW,
    }
}

/// Builds an observation from normalized mesh points. Regions whose indices
/// fall outside the mesh (irises on an unrefined mesh) are left out.
pub fn observation_from_mesh(
    points: &[Point2],
    bounds: NormalizedRect,
    confidence: f64,
) -> Result<FaceObservation, String> {
    if points.len() < MESH_POINTS {
        return Err(format!(
            "face mesh has {} points, expected at least {MESH_POINTS}",
            points.len()
        ));
    }

    let mut observation = FaceObservation::new(bounds, confidence);
    for region in LandmarkRegion::ALL {
        let idx = indices(region);
        if idx.iter().all(|&i| i < points.len()) {
            observation.insert_region(region, idx.iter().map(|&i| points[i]).collect());
        }
    }
    Ok(observation)
}
