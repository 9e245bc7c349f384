//! Stem tessellations
use crate::symbol::Mesh;
use nalgebra::Vector3;
use std::f32::consts::PI;

/// Number of slices of [`tapered_cylinder`] when building stems
pub const STEM_SLICES: usize = 3;

/// Builds a cheap stem: two triangles rotated by half a turn, joined into a
/// closed solid
///
/// The mesh always has 6 vertices and 8 triangles.  The base is at the origin
/// and the top at `(0, 0, length)`.
pub fn slim_cylinder(length: f32, radius_base: f32, radius_top: f32) -> Mesh {
    let ring = |r: f32, phase: f32, z: f32| {
        (0..3).map(move |i| {
            let a = 2.0 * PI * i as f32 / 3.0 + phase;
            Vector3::new(r * a.cos(), r * a.sin(), z)
        })
    };
    let vertices = ring(radius_base, 0.0, 0.0)
        .chain(ring(radius_top, PI, length))
        .collect();
    let triangles = [
        [2usize, 1, 0],
        [3, 4, 5],
        [0, 5, 4],
        [0, 4, 2],
        [2, 4, 3],
        [3, 1, 2],
        [1, 3, 5],
        [5, 0, 1],
    ]
    .into_iter()
    .map(Vector3::from)
    .collect();
    Mesh {
        triangles,
        vertices,
    }
}

/// Tessellates a tapered cylinder with the given number of slices
///
/// Vertices are the base ring, the top ring, and (if `solid`) the centers of
/// both caps, for `2 * slices + 2` vertices and `4 * slices` triangles.
pub fn tapered_cylinder(
    length: f32,
    radius_base: f32,
    radius_top: f32,
    slices: usize,
    solid: bool,
) -> Mesh {
    let mut mesh = Mesh::new();
    for (r, z) in [(radius_base, 0.0), (radius_top, length)] {
        for i in 0..slices {
            let a = 2.0 * PI * i as f32 / slices as f32;
            mesh.vertices.push(Vector3::new(r * a.cos(), r * a.sin(), z));
        }
    }
    for i in 0..slices {
        let j = (i + 1) % slices;
        let (b0, b1, t0, t1) = (i, j, i + slices, j + slices);
        mesh.triangles.push(Vector3::new(b0, b1, t1));
        mesh.triangles.push(Vector3::new(b0, t1, t0));
    }
    if solid {
        let bottom = mesh.vertices.len();
        mesh.vertices.push(Vector3::zeros());
        mesh.vertices.push(Vector3::new(0.0, 0.0, length));
        let top = bottom + 1;
        for i in 0..slices {
            let j = (i + 1) % slices;
            mesh.triangles.push(Vector3::new(bottom, j, i));
            mesh.triangles.push(Vector3::new(top, i + slices, j + slices));
        }
    }
    mesh
}
