//! Fits a reference leaf shape to organ dimensions and meshes it
use crate::{
    plantgen::interp,
    symbol::{LeafShape, Mesh},
};
use nalgebra::Vector3;

/// Builds the mesh of a (possibly growing) leaf blade
///
/// The reference midrib is scaled so that its arc length is `final_length`.
/// A growing leaf exposes its distal `length / final_length` part, whose base
/// is moved to the origin.  `s_base` and `s_top` then select a window of
/// that visible part, as fractions of the current length.
///
/// The leaf lies in the XZ plane (Z up), with its width along Y.  Each
/// section along the midrib contributes a left and a right edge vertex, and
/// each pair of consecutive sections two triangles.
///
/// Returns `None` if the window is empty or the mesh would have fewer than two
/// triangles.
pub fn fit_leaf(
    shape: &LeafShape,
    final_length: f64,
    length: f64,
    s_base: f64,
    s_top: f64,
    radius_max: f64,
) -> Option<Mesh> {
    if !(final_length > 0.0 && length > 0.0) || shape.len() < 2 {
        return None;
    }
    let arc = shape.arc_length();
    if !(arc > 0.0) {
        return None;
    }
    let scale = final_length / arc;
    let visible = (length / final_length).clamp(0.0, 1.0);
    let s_base = s_base.clamp(0.0, 1.0);
    let s_top = s_top.clamp(0.0, 1.0);

    let origin = 1.0 - visible;
    let lo = origin + s_base * visible;
    let hi = origin + s_top * visible;
    if !(hi > lo) {
        return None;
    }

    let mut sections = vec![lo];
    sections.extend(shape.s.iter().cloned().filter(|s| *s > lo && *s < hi));
    sections.push(hi);

    let point = |s: f64| {
        (
            interp(s, &shape.s, &shape.x) * scale,
            interp(s, &shape.s, &shape.y) * scale,
        )
    };
    let (x0, z0) = point(origin);

    let mut mesh = Mesh::new();
    for s in &sections {
        let (x, z) = point(*s);
        let w = interp(*s, &shape.s, &shape.r) * radius_max;
        let (x, z) = ((x - x0) as f32, (z - z0) as f32);
        mesh.vertices.push(Vector3::new(x, -w as f32, z));
        mesh.vertices.push(Vector3::new(x, w as f32, z));
    }
    for k in 0..sections.len() - 1 {
        let (a, b) = (2 * k, 2 * k + 2);
        mesh.triangles.push(Vector3::new(a, a + 1, b + 1));
        mesh.triangles.push(Vector3::new(a, b + 1, b));
    }

    (mesh.triangles.len() >= 2).then_some(mesh)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    /// Straight vertical leaf of unit length, with a constant width
    fn strip() -> LeafShape {
        LeafShape::from_midrib(
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.25, 0.5, 0.75, 1.0],
            vec![1.0; 5],
        )
    }

    #[test]
    fn full_leaf() {
        let m = fit_leaf(&strip(), 10.0, 10.0, 0.0, 1.0, 0.5).unwrap();
        assert_eq!(m.vertices.len(), 10);
        assert_eq!(m.triangles.len(), 8);
        // 10 cm long, 1 cm wide
        assert_relative_eq!(m.area(), 10.0, epsilon = 1e-4);
        let top = m.vertices.iter().map(|v| v.z).fold(0.0, f32::max);
        assert_relative_eq!(top, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn growing_leaf() {
        // Only the distal half is visible, and its base is at the origin
        let m = fit_leaf(&strip(), 10.0, 5.0, 0.0, 1.0, 0.5).unwrap();
        assert_relative_eq!(m.area(), 5.0, epsilon = 1e-4);
        assert_eq!(m.vertices[0].z, 0.0);

        // Upper half of the visible part
        let m = fit_leaf(&strip(), 10.0, 5.0, 0.5, 1.0, 0.5).unwrap();
        assert_relative_eq!(m.area(), 2.5, epsilon = 1e-4);
        assert_relative_eq!(m.vertices[0].z, 2.5, epsilon = 1e-5);
    }

    #[test]
    fn degenerate() {
        assert!(fit_leaf(&strip(), 10.0, 0.0, 0.0, 1.0, 0.5).is_none());
        assert!(fit_leaf(&strip(), 0.0, 1.0, 0.0, 1.0, 0.5).is_none());
        assert!(fit_leaf(&strip(), 10.0, 10.0, 0.7, 0.7, 0.5).is_none());
        assert!(fit_leaf(&strip(), 10.0, 10.0, 0.8, 0.2, 0.5).is_none());
    }
}
