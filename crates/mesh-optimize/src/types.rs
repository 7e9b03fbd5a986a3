//! Core mesh data types.
//!
//! The [`Mesh`] is the single store every pipeline stage reads and mutates.
//! Derived quantities (bounds, centroid, areas, normals, volume) are computed
//! on demand from the current vertex and face arrays and never cached.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult};

/// Faces above this count use rayon for per-face computations.
pub const PARALLEL_FACE_THRESHOLD: usize = 100_000;

/// Triangles with area below this are degenerate (model units squared).
pub const DEGENERATE_AREA_EPSILON: f64 = 1e-10;

/// A vertex position in model units (millimeters by convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// A triangle mesh with indexed vertices and faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Triangle faces as indices into the vertex array.
    /// Each face is [v0, v1, v2] with counter-clockwise winding.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a validated mesh from decoded vertex and face arrays.
    ///
    /// Fails if either array is empty, a face references a missing vertex, or
    /// a coordinate is not finite.
    pub fn from_buffers(positions: Vec<[f64; 3]>, faces: Vec<[u32; 3]>) -> MeshResult<Self> {
        let mesh = Self {
            vertices: positions
                .into_iter()
                .map(|[x, y, z]| Vertex::from_coords(x, y, z))
                .collect(),
            faces,
        };
        mesh.check_geometry()?;
        Ok(mesh)
    }

    /// Flatten several sub-meshes into one, offsetting face indices.
    pub fn concatenate<'a>(parts: impl IntoIterator<Item = &'a Mesh>) -> Self {
        let mut merged = Mesh::new();
        for part in parts {
            let offset = merged.vertices.len() as u32;
            merged.vertices.extend_from_slice(&part.vertices);
            merged.faces.extend(
                part.faces
                    .iter()
                    .map(|&[a, b, c]| [a + offset, b + offset, c + offset]),
            );
        }
        merged
    }

    /// Check the structural invariants every pipeline stage relies on.
    pub fn check_geometry(&self) -> MeshResult<()> {
        if self.vertices.is_empty() {
            return Err(MeshError::empty_mesh("mesh has no vertices"));
        }
        if self.faces.is_empty() {
            return Err(MeshError::empty_mesh("mesh has no faces"));
        }

        for (vertex_index, vertex) in self.vertices.iter().enumerate() {
            let p = vertex.position;
            for (coordinate, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
                if !value.is_finite() {
                    return Err(MeshError::InvalidCoordinate {
                        vertex_index,
                        coordinate,
                        value,
                    });
                }
            }
        }

        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&vertex_index) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::InvalidVertexIndex {
                    face_index,
                    vertex_index,
                    vertex_count,
                });
            }
        }

        Ok(())
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces (triangles) in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty (no vertices or faces).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if mesh is empty.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for vertex in &self.vertices[1..] {
            let p = &vertex.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Bounding box size per axis (width, height, depth). Zero for an empty mesh.
    pub fn extents(&self) -> Vector3<f64> {
        self.bounds()
            .map(|(min, max)| max - min)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Center of the bounding box.
    pub fn bounds_center(&self) -> Point3<f64> {
        self.bounds()
            .map(|(min, max)| nalgebra::center(&min, &max))
            .unwrap_or_else(Point3::origin)
    }

    /// Mean of all vertex positions.
    pub fn vertex_mean(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Center of mass.
    ///
    /// For a watertight mesh enclosing a non-zero volume this is the
    /// volumetric centroid; otherwise it falls back to the vertex mean.
    pub fn centroid(&self) -> Point3<f64> {
        if self.is_watertight() {
            let mut weighted = Vector3::zeros();
            let mut total = 0.0;
            for tri in self.triangles() {
                let vol = tri.signed_tetra_volume();
                weighted += (tri.v0.coords + tri.v1.coords + tri.v2.coords) * (vol / 4.0);
                total += vol;
            }
            if total.abs() > f64::EPSILON {
                return Point3::from(weighted / total);
            }
        }
        self.vertex_mean()
    }

    /// Per-face triangle area.
    pub fn face_areas(&self) -> Vec<f64> {
        if self.faces.len() > PARALLEL_FACE_THRESHOLD {
            self.faces
                .par_iter()
                .map(|face| self.face_triangle(face).area())
                .collect()
        } else {
            self.triangles().map(|tri| tri.area()).collect()
        }
    }

    /// Per-face unit normal by the right-hand rule. Zero for degenerate faces.
    pub fn face_normals(&self) -> Vec<Vector3<f64>> {
        let normal = |tri: Triangle| tri.normal().unwrap_or_else(Vector3::zeros);
        if self.faces.len() > PARALLEL_FACE_THRESHOLD {
            self.faces
                .par_iter()
                .map(|face| normal(self.face_triangle(face)))
                .collect()
        } else {
            self.triangles().map(normal).collect()
        }
    }

    /// Indices of faces whose area is below [`DEGENERATE_AREA_EPSILON`].
    pub fn degenerate_faces(&self) -> Vec<usize> {
        self.face_areas()
            .iter()
            .enumerate()
            .filter(|&(_, &area)| area < DEGENERATE_AREA_EPSILON)
            .map(|(i, _)| i)
            .collect()
    }

    /// Check whether every edge is shared by exactly two faces traversing it
    /// in opposite directions.
    pub fn is_watertight(&self) -> bool {
        !self.faces.is_empty() && MeshAdjacency::build(&self.faces).is_watertight()
    }

    /// Iterate over triangles, yielding Triangle structs with actual vertex data.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|face| self.face_triangle(face))
    }

    /// Get a specific triangle by face index.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|face| self.face_triangle(face))
    }

    #[inline]
    fn face_triangle(&self, &[i0, i1, i2]: &[u32; 3]) -> Triangle {
        Triangle {
            v0: self.vertices[i0 as usize].position,
            v1: self.vertices[i1 as usize].position,
            v2: self.vertices[i2 as usize].position,
        }
    }

    /// Reverse the winding of one face.
    #[inline]
    pub fn flip_face(&mut self, face_idx: usize) {
        self.faces[face_idx].swap(1, 2);
    }

    /// Translate mesh by the given vector.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Scale mesh uniformly around the origin.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.position.coords *= factor;
        }
    }

    /// Compute the signed volume of the mesh.
    ///
    /// Sum of signed tetrahedra formed by each face and the origin. Positive
    /// for a closed mesh with outward-facing normals, negative when inside-out.
    /// Not meaningful for open meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles().map(|tri| tri.signed_tetra_volume()).sum()
    }

    /// Enclosed volume, or `None` when the mesh is not watertight.
    pub fn volume(&self) -> Option<f64> {
        self.is_watertight().then(|| self.signed_volume().abs())
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_areas().iter().sum()
    }
}

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the front (normal points
/// toward viewer).
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the (unnormalized) face normal via cross product.
    /// The direction follows the right-hand rule with CCW winding.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the unit face normal.
    /// Returns None for degenerate triangles (zero area).
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON * f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Compute the area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid (center of mass).
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Signed volume of the tetrahedron spanned by this triangle and the origin.
    #[inline]
    pub fn signed_tetra_volume(&self) -> f64 {
        self.v0.coords.dot(&self.v1.coords.cross(&self.v2.coords)) / 6.0
    }
}
