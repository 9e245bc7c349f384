//! Indexed triangle meshes and their binary STL output
use nalgebra::{Isometry3, Point3, Vector3};
use std::io::{BufWriter, Write};

/// An indexed 3D mesh
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Mesh {
    /// Triangles, as indexes into [`self.vertices`](Self::vertices)
    pub triangles: Vec<Vector3<usize>>,
    /// Vertex positions
    pub vertices: Vec<Vector3<f32>>,
}

impl Mesh {
    /// Builds a new, empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Total surface area of the mesh
    pub fn area(&self) -> f32 {
        self.triangles
            .iter()
            .map(|t| {
                let a = self.vertices[t.x];
                let ab = self.vertices[t.y] - a;
                let ac = self.vertices[t.z] - a;
                ab.cross(&ac).norm() / 2.0
            })
            .sum()
    }

    /// Returns a copy of this mesh, moved by the given rigid transform
    pub fn transformed(&self, iso: &Isometry3<f32>) -> Self {
        Self {
            triangles: self.triangles.clone(),
            vertices: self
                .vertices
                .iter()
                .map(|v| iso.transform_point(&Point3::from(*v)).coords)
                .collect(),
        }
    }

    /// Appends another mesh, re-indexing its triangles
    pub fn extend(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles
            .extend(other.triangles.iter().map(|t| t.add_scalar(offset)));
    }

    /// Writes a binary STL to the given output
    pub fn write_stl<F: std::io::Write>(
        &self,
        out: &mut F,
    ) -> Result<(), crate::Error> {
        // Many small writes, usually to a file
        let mut out = BufWriter::new(out);
        const HEADER: &[u8] = b"Binary STL file exported by ADEL";
        static_assertions::const_assert!(HEADER.len() <= 80);
        out.write_all(HEADER)?;
        out.write_all(&[0u8; 80 - HEADER.len()])?;
        out.write_all(&(self.triangles.len() as u32).to_le_bytes())?;
        for t in &self.triangles {
            let a = self.vertices[t.x];
            // STL facet normals are unit vectors; degenerate triangles get
            // a zero normal, which readers recompute from the winding
            let normal = (self.vertices[t.y] - a)
                .cross(&(self.vertices[t.z] - a))
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::zeros);
            for p in &normal {
                out.write_all(&p.to_le_bytes())?;
            }
            for v in t {
                for p in &self.vertices[*v] {
                    out.write_all(&p.to_le_bytes())?;
                }
            }
            out.write_all(&[0u8; std::mem::size_of::<u16>()])?; // attributes
        }
        out.flush()?;
        Ok(())
    }
}
