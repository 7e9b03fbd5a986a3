//! Mesh topology queries via adjacency structures.

use hashbrown::HashMap;

/// Canonical undirected edge key: (smaller_index, larger_index).
pub type EdgeKey = (u32, u32);

/// Canonicalize an edge so that the smaller index comes first.
#[inline]
pub fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a < b { (a, b) } else { (b, a) }
}

/// Lightweight topology structure for mesh queries.
///
/// Built in one pass over the faces; each face contributes its three directed
/// edges. Edges whose endpoints coincide (collapsed faces) are not recorded.
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Maps canonical edge → faces that contain it, in face order.
    pub edge_to_faces: HashMap<EdgeKey, Vec<u32>>,

    /// Maps directed edge (a, b) → number of faces traversing a → b.
    pub directed_edges: HashMap<(u32, u32), u32>,
}

impl MeshAdjacency {
    /// Build adjacency structures from a face list.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<EdgeKey, Vec<u32>> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut directed_edges: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3);

        for (face_idx, &[v0, v1, v2]) in faces.iter().enumerate() {
            let face_idx = face_idx as u32;
            for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
                if a == b {
                    continue;
                }
                edge_to_faces
                    .entry(edge_key(a, b))
                    .or_default()
                    .push(face_idx);
                *directed_edges.entry((a, b)).or_default() += 1;
            }
        }

        Self {
            edge_to_faces,
            directed_edges,
        }
    }

    /// Number of faces traversing the directed edge a → b.
    #[inline]
    pub fn directed_count(&self, a: u32, b: u32) -> u32 {
        self.directed_edges.get(&(a, b)).copied().unwrap_or(0)
    }

    /// Whether a two-face edge is traversed once in each direction.
    fn is_consistent_pair(&self, &(a, b): &EdgeKey) -> bool {
        self.directed_count(a, b) == 1 && self.directed_count(b, a) == 1
    }

    /// Boundary edges (exactly one incident face), sorted for deterministic
    /// downstream processing.
    pub fn boundary_edges(&self) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self
            .edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Non-manifold edges (three or more incident faces), sorted.
    pub fn non_manifold_edges(&self) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self
            .edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&edge, _)| edge)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Count boundary edges.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() == 1)
            .count()
    }

    /// Count non-manifold edges.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() > 2)
            .count()
    }

    /// Count two-face edges whose faces traverse them in the same direction.
    pub fn winding_conflict_count(&self) -> usize {
        self.edge_to_faces
            .iter()
            .filter(|(edge, faces)| faces.len() == 2 && !self.is_consistent_pair(edge))
            .count()
    }

    /// Check if the mesh is manifold (every edge has at most two faces).
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// Check if the mesh is watertight.
    ///
    /// Every edge must have exactly two incident faces that traverse it in
    /// opposite directions.
    pub fn is_watertight(&self) -> bool {
        !self.edge_to_faces.is_empty()
            && self
                .edge_to_faces
                .iter()
                .all(|(edge, faces)| faces.len() == 2 && self.is_consistent_pair(edge))
    }

    /// Get faces adjacent to an edge.
    /// The edge is automatically canonicalized (min, max).
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[u32]> {
        self.edge_to_faces
            .get(&edge_key(v0, v1))
            .map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Vec<[u32; 3]> {
        vec![[0, 1, 2]]
    }

    fn two_triangles_shared_edge() -> Vec<[u32; 3]> {
        vec![[0, 1, 2], [1, 0, 3]]
    }

    fn tetrahedron() -> Vec<[u32; 3]> {
        vec![[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]]
    }

    #[test]
    fn test_single_triangle_is_not_watertight() {
        let adj = MeshAdjacency::build(&single_triangle());
        assert!(!adj.is_watertight());
        assert!(adj.is_manifold());
        assert_eq!(adj.boundary_edge_count(), 3);
        assert_eq!(adj.boundary_edges(), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_two_triangles_shared_edge() {
        let adj = MeshAdjacency::build(&two_triangles_shared_edge());
        let shared = adj.faces_for_edge(1, 0).expect("edge exists");
        assert_eq!(shared, &[0, 1]);
        assert_eq!(adj.boundary_edge_count(), 4);
        assert_eq!(adj.winding_conflict_count(), 0);
    }

    #[test]
    fn test_tetrahedron_is_watertight() {
        let adj = MeshAdjacency::build(&tetrahedron());
        assert!(adj.is_watertight());
        assert!(adj.is_manifold());
        assert_eq!(adj.boundary_edge_count(), 0);
        assert_eq!(adj.non_manifold_edge_count(), 0);
    }

    #[test]
    fn test_flipped_face_breaks_watertightness() {
        let mut faces = tetrahedron();
        faces[3].swap(1, 2);
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.boundary_edge_count(), 0);
        assert_eq!(adj.winding_conflict_count(), 3);
        assert!(!adj.is_watertight());
    }

    #[test]
    fn test_non_manifold_edge() {
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.non_manifold_edges(), vec![(0, 1)]);
        assert!(!adj.is_manifold());
    }

    #[test]
    fn test_collapsed_edges_are_skipped() {
        let adj = MeshAdjacency::build(&[[0, 0, 1]]);
        assert!(adj.faces_for_edge(0, 0).is_none());
        assert_eq!(adj.faces_for_edge(0, 1).map(|f| f.len()), Some(2));
    }
}
