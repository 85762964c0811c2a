//! Synthetic face-mesh landmark sets with a known EAR, for tests.
//!
//! Enabled inside this crate's tests and for dependents through the
//! `test-support` feature.

use crate::config::EyeIndexSet;
use landmarks::{LandmarkPoint, FACE_MESH_LANDMARKS};

/// Landmark set of `len` points where both eyes have the given lid opening
/// and a horizontal width of `width`. Eyes whose indices do not fit in `len`
/// are left at the origin.
pub fn face_with_opening(len: usize, opening: f32, width: f32) -> Vec<LandmarkPoint> {
    let mut points = vec![LandmarkPoint::default(); len];
    for (eye, cx) in [(EyeIndexSet::LEFT, 0.35f32), (EyeIndexSet::RIGHT, 0.65f32)] {
        if eye.max_index() >= len {
            continue;
        }
        let [p0, p1, p2, p3, p4, p5] = *eye.indices();
        let half = width / 2.0;
        let y = 0.4f32;
        points[p0] = LandmarkPoint::new(cx - half, y);
        points[p3] = LandmarkPoint::new(cx + half, y);
        points[p1] = LandmarkPoint::new(cx - half / 3.0, y - opening / 2.0);
        points[p5] = LandmarkPoint::new(cx - half / 3.0, y + opening / 2.0);
        points[p2] = LandmarkPoint::new(cx + half / 3.0, y - opening / 2.0);
        points[p4] = LandmarkPoint::new(cx + half / 3.0, y + opening / 2.0);
    }
    points
}

/// Full face-mesh landmark set whose average EAR is `ear`
pub fn face_with_ear(ear: f64) -> Vec<LandmarkPoint> {
    let width = 0.1f32;
    // (A + B) / C = 2 * opening / width
    let opening = (ear as f32) * width / 2.0;
    face_with_opening(FACE_MESH_LANDMARKS, opening, width)
}
