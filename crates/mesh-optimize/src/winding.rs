//! Normal consistency and winding order correction.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::Mesh;
use crate::adjacency::{EdgeKey, MeshAdjacency, edge_key};
use crate::error::MeshResult;

/// Result of propagating orientation across each connected component.
#[derive(Debug, Clone, Default)]
pub struct OrientationAnalysis {
    /// Per face: `true` when the face disagrees with the majority orientation
    /// of its connected component.
    pub inverted: Vec<bool>,

    /// Number of edge-connected components visited.
    pub component_count: usize,
}

impl OrientationAnalysis {
    /// Number of faces disagreeing with their component's majority.
    pub fn inverted_count(&self) -> usize {
        self.inverted.iter().filter(|&&inv| inv).count()
    }

    /// True when every face agrees with its component's majority.
    pub fn is_consistent(&self) -> bool {
        self.inverted.iter().all(|&inv| !inv)
    }
}

/// Propagate orientation by BFS from the lowest-index face of each component.
///
/// A neighbor is marked flipped relative to the seed when it traverses the
/// shared edge in the same direction as the current face. Within each
/// component the larger group defines the majority orientation; ties keep the
/// seed's orientation.
///
/// Edges are visited in canonical key order and neighbors in face order, so
/// the BFS tree depends only on which vertices each face uses, not on its
/// winding. Flipping the reported faces and analyzing again therefore reports
/// nothing, even on non-manifold input. Collapsed faces (a repeated vertex)
/// have no orientation and form their own single-face component.
pub fn analyze_orientation(mesh: &Mesh) -> OrientationAnalysis {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return OrientationAnalysis::default();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut visited = vec![false; face_count];
    let mut flipped = vec![false; face_count];
    let mut inverted = vec![false; face_count];
    let mut component_count = 0;

    for start_face in 0..face_count {
        if visited[start_face] {
            continue;
        }

        component_count += 1;
        let mut component: Vec<usize> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        queue.push_back(start_face);
        visited[start_face] = true;

        while let Some(face_idx) = queue.pop_front() {
            component.push(face_idx);
            let face = mesh.faces[face_idx];
            if is_collapsed(&face) {
                continue;
            }

            for (a, b) in sorted_edge_keys(&face) {
                let Some(neighbors) = adjacency.edge_to_faces.get(&(a, b)) else {
                    continue;
                };
                let Some(forward) = edge_direction_in_face(&face, a, b) else {
                    continue;
                };

                for &neighbor in neighbors {
                    let neighbor = neighbor as usize;
                    if neighbor == face_idx || visited[neighbor] {
                        continue;
                    }
                    let neighbor_face = &mesh.faces[neighbor];
                    if is_collapsed(neighbor_face) {
                        continue;
                    }
                    let Some(neighbor_forward) = edge_direction_in_face(neighbor_face, a, b)
                    else {
                        continue;
                    };
                    visited[neighbor] = true;

                    // Same direction on a shared edge means opposite orientation
                    flipped[neighbor] = flipped[face_idx] ^ (forward == neighbor_forward);

                    queue.push_back(neighbor);
                }
            }
        }

        let flipped_in_component = component.iter().filter(|&&f| flipped[f]).count();
        let majority_flipped = flipped_in_component * 2 > component.len();
        for &f in &component {
            inverted[f] = flipped[f] != majority_flipped;
        }
    }

    let analysis = OrientationAnalysis {
        inverted,
        component_count,
    };

    debug!(
        inverted = analysis.inverted_count(),
        components = component_count,
        "Orientation analysis complete"
    );

    analysis
}

/// Flip every face that disagrees with its component's majority orientation.
///
/// Returns the number of faces flipped. Running it twice in a row flips
/// nothing the second time.
pub fn fix_normals(mesh: &mut Mesh) -> MeshResult<usize> {
    let analysis = analyze_orientation(mesh);
    let mut flipped = 0;

    for (face_idx, &inv) in analysis.inverted.iter().enumerate() {
        if inv {
            mesh.flip_face(face_idx);
            flipped += 1;
        }
    }

    if flipped > 0 {
        info!(
            "Fixed normals: flipped {} faces across {} component(s)",
            flipped, analysis.component_count
        );
    } else {
        debug!(
            "Normals already consistent across {} component(s)",
            analysis.component_count
        );
    }

    Ok(flipped)
}

/// Reverse every face of a closed, consistently wound mesh whose signed
/// volume is negative (the whole surface faces inward).
///
/// Returns true if the mesh was flipped.
pub fn fix_inversion(mesh: &mut Mesh) -> bool {
    if !mesh.is_watertight() || mesh.signed_volume() >= 0.0 {
        return false;
    }

    for face in &mut mesh.faces {
        face.swap(1, 2);
    }
    info!("Mesh was inside-out: reversed all {} faces", mesh.face_count());
    true
}

fn is_collapsed(face: &[u32; 3]) -> bool {
    face[0] == face[1] || face[1] == face[2] || face[2] == face[0]
}

/// The face's three undirected edges, sorted. Invariant under winding flips.
fn sorted_edge_keys(face: &[u32; 3]) -> [EdgeKey; 3] {
    let mut keys = [
        edge_key(face[0], face[1]),
        edge_key(face[1], face[2]),
        edge_key(face[2], face[0]),
    ];
    keys.sort_unstable();
    keys
}

/// Check if edge (a, b) appears in face in the same direction (a -> b).
/// Returns Some(true) if same direction, Some(false) if opposite, None if edge not found.
pub(crate) fn edge_direction_in_face(face: &[u32; 3], a: u32, b: u32) -> Option<bool> {
    for i in 0..3 {
        let v0 = face[i];
        let v1 = face[(i + 1) % 3];

        if v0 == a && v1 == b {
            return Some(true);
        }
        if v0 == b && v1 == a {
            return Some(false);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn tetrahedron() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
        mesh.faces.push([0, 2, 1]);
        mesh.faces.push([0, 1, 3]);
        mesh.faces.push([1, 2, 3]);
        mesh.faces.push([0, 3, 2]);
        mesh
    }

    #[test]
    fn test_already_consistent() {
        let mut mesh = tetrahedron();
        let analysis = analyze_orientation(&mesh);
        assert!(analysis.is_consistent());
        assert_eq!(analysis.component_count, 1);

        let original = mesh.faces.clone();
        assert_eq!(fix_normals(&mut mesh).unwrap(), 0);
        assert_eq!(mesh.faces, original);
    }

    #[test]
    fn test_single_inverted_face_is_minority() {
        let mut mesh = tetrahedron();
        mesh.flip_face(2);

        let analysis = analyze_orientation(&mesh);
        assert_eq!(analysis.inverted_count(), 1);
        assert!(analysis.inverted[2]);

        assert_eq!(fix_normals(&mut mesh).unwrap(), 1);
        assert!(mesh.is_watertight());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_seed_face_can_be_the_minority() {
        let mut mesh = tetrahedron();
        mesh.flip_face(0);

        let analysis = analyze_orientation(&mesh);
        assert_eq!(analysis.inverted_count(), 1);
        assert!(analysis.inverted[0]);

        fix_normals(&mut mesh).unwrap();
        assert!(mesh.is_watertight());
    }

    #[test]
    fn test_fix_normals_is_idempotent() {
        let mut mesh = tetrahedron();
        mesh.flip_face(1);
        mesh.flip_face(3);

        fix_normals(&mut mesh).unwrap();
        let once = mesh.faces.clone();
        assert_eq!(fix_normals(&mut mesh).unwrap(), 0);
        assert_eq!(mesh.faces, once);
    }

    #[test]
    fn test_fix_normals_is_idempotent_on_non_manifold_soup() {
        let mut mesh = Mesh::new();
        for i in 0..5 {
            let t = i as f64;
            mesh.vertices
                .push(Vertex::from_coords(t, t * t * 0.5, (t * 1.7).sin()));
        }
        mesh.faces = vec![[3, 0, 4], [0, 2, 4], [3, 4, 0], [0, 3, 2], [1, 2, 0]];

        fix_normals(&mut mesh).unwrap();
        let once = mesh.faces.clone();
        assert_eq!(fix_normals(&mut mesh).unwrap(), 0);
        assert_eq!(mesh.faces, once);
        assert!(analyze_orientation(&mesh).is_consistent());
    }

    #[test]
    fn test_collapsed_face_is_its_own_component() {
        let mut mesh = tetrahedron();
        mesh.faces.push([0, 0, 1]);

        let analysis = analyze_orientation(&mesh);
        assert_eq!(analysis.component_count, 2);
        assert!(analysis.is_consistent());
    }

    #[test]
    fn test_fix_disconnected_components() {
        let mut mesh = Mesh::new();
        for x in [0.0, 10.0] {
            mesh.vertices.push(Vertex::from_coords(x, 0.0, 0.0));
            mesh.vertices.push(Vertex::from_coords(x + 1.0, 0.0, 0.0));
            mesh.vertices.push(Vertex::from_coords(x + 0.5, 1.0, 0.0));
            mesh.vertices.push(Vertex::from_coords(x + 0.5, -1.0, 0.0));
        }
        mesh.faces.push([0, 1, 2]);
        mesh.faces.push([0, 1, 3]);
        mesh.faces.push([4, 5, 6]);
        mesh.faces.push([4, 5, 7]);

        let analysis = analyze_orientation(&mesh);
        assert_eq!(analysis.component_count, 2);
        assert_eq!(analysis.inverted_count(), 2);

        fix_normals(&mut mesh).unwrap();

        for (a, b, v0, v1) in [(0, 1, 0, 1), (2, 3, 4, 5)] {
            let d0 = edge_direction_in_face(&mesh.faces[a], v0, v1);
            let d1 = edge_direction_in_face(&mesh.faces[b], v0, v1);
            match (d0, d1) {
                (Some(d0), Some(d1)) => assert_ne!(d0, d1),
                _ => panic!("edge should exist in both faces"),
            }
        }
    }

    #[test]
    fn test_fix_inversion_flips_inside_out_mesh() {
        let mut mesh = tetrahedron();
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        assert!(mesh.signed_volume() < 0.0);
        assert!(analyze_orientation(&mesh).is_consistent());

        assert!(fix_inversion(&mut mesh));
        assert!(mesh.signed_volume() > 0.0);
        assert!(!fix_inversion(&mut mesh));
    }

    #[test]
    fn test_fix_inversion_ignores_open_mesh() {
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        assert!(!fix_inversion(&mut mesh));
    }
}
