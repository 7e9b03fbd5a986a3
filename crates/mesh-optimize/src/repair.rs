//! Repair operations and the geometry backend the pipeline drives.

use tracing::info;

use crate::error::{MeshError, MeshResult};
use crate::holes::{HoleFillReport, HoleFillStrategy, fill_holes_with};
use crate::types::DEGENERATE_AREA_EPSILON;
use crate::winding;
use crate::{Mesh, Triangle};

/// Remove triangles with area below threshold.
///
/// Vertices are never removed; any left unreferenced stay in the vertex
/// array. Returns the number of triangles removed.
pub fn remove_degenerate_faces(mesh: &mut Mesh, area_threshold: f64) -> MeshResult<usize> {
    mesh.check_geometry()
        .map_err(|e| MeshError::repair_failed(e.to_string()))?;

    let original_count = mesh.faces.len();
    let vertices = &mesh.vertices;

    mesh.faces.retain(|&[i0, i1, i2]| {
        let tri = Triangle::new(
            vertices[i0 as usize].position,
            vertices[i1 as usize].position,
            vertices[i2 as usize].position,
        );
        tri.area() >= area_threshold
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        info!(
            "Removed {} degenerate triangles (area < {:e})",
            removed, area_threshold
        );
    }
    Ok(removed)
}

/// Geometry backend used by the optimizer for every repair step.
///
/// The pipeline owns one backend per [`Optimizer`](crate::Optimizer); swap it
/// with [`Optimizer::with_backend`](crate::Optimizer::with_backend) to route
/// repairs through a different implementation.
pub trait RepairBackend: Send + Sync {
    /// Short name, used in logs.
    fn name(&self) -> &'static str;

    /// Drop faces with near-zero area. Returns the number removed.
    fn remove_degenerate_faces(&self, mesh: &mut Mesh) -> MeshResult<usize>;

    /// Close boundary loops of at most `max_hole_edges` edges.
    fn fill_holes(
        &self,
        mesh: &mut Mesh,
        strategy: HoleFillStrategy,
        max_hole_edges: usize,
    ) -> MeshResult<HoleFillReport>;

    /// Make face orientation consistent. Returns the number of faces flipped.
    fn fix_normals(&self, mesh: &mut Mesh) -> MeshResult<usize>;

    /// Reverse a closed mesh that faces inward. Returns true if it did.
    fn fix_inversion(&self, mesh: &mut Mesh) -> MeshResult<bool>;
}

/// The built-in backend: the algorithms in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl RepairBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn remove_degenerate_faces(&self, mesh: &mut Mesh) -> MeshResult<usize> {
        remove_degenerate_faces(mesh, DEGENERATE_AREA_EPSILON)
    }

    fn fill_holes(
        &self,
        mesh: &mut Mesh,
        strategy: HoleFillStrategy,
        max_hole_edges: usize,
    ) -> MeshResult<HoleFillReport> {
        fill_holes_with(mesh, strategy, max_hole_edges)
    }

    fn fix_normals(&self, mesh: &mut Mesh) -> MeshResult<usize> {
        mesh.check_geometry()
            .map_err(|e| MeshError::winding_failed(e.to_string()))?;
        winding::fix_normals(mesh)
    }

    fn fix_inversion(&self, mesh: &mut Mesh) -> MeshResult<bool> {
        mesh.check_geometry()
            .map_err(|e| MeshError::winding_failed(e.to_string()))?;
        Ok(winding::fix_inversion(mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn quad_with_sliver() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.5, 0.0, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([0, 2, 3]);
        mesh.faces.push([0, 4, 1]);
        mesh
    }

    #[test]
    fn test_remove_degenerate_faces() {
        let mut mesh = quad_with_sliver();
        let removed = remove_degenerate_faces(&mut mesh, DEGENERATE_AREA_EPSILON).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.vertex_count(), 5);
    }

    #[test]
    fn test_remove_degenerate_is_idempotent() {
        let mut mesh = quad_with_sliver();
        remove_degenerate_faces(&mut mesh, DEGENERATE_AREA_EPSILON).unwrap();
        assert_eq!(
            remove_degenerate_faces(&mut mesh, DEGENERATE_AREA_EPSILON).unwrap(),
            0
        );
    }

    #[test]
    fn test_collapsed_index_face_is_degenerate() {
        let mut mesh = quad_with_sliver();
        mesh.faces.push([1, 1, 2]);
        let removed = NativeBackend.remove_degenerate_faces(&mut mesh).unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_invalid_index_is_a_repair_failure() {
        let mut mesh = quad_with_sliver();
        mesh.faces.push([0, 1, 99]);
        let err = NativeBackend.remove_degenerate_faces(&mut mesh).unwrap_err();
        assert!(err.is_repair_failure());
        assert_eq!(mesh.face_count(), 4);
    }

    #[test]
    fn test_native_backend_name() {
        assert_eq!(NativeBackend.name(), "native");
    }
}
