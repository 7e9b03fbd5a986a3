//! Hole detection and filling for mesh repair.

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Mesh;
use crate::adjacency::{EdgeKey, MeshAdjacency, edge_key};
use crate::error::{MeshError, MeshResult};

/// Default upper bound on the number of edges of a hole that gets filled.
pub const DEFAULT_MAX_HOLE_EDGES: usize = 1000;

/// Placeholder index for a vertex that is appended when the patch is merged.
const PENDING_VERTEX: u32 = u32::MAX;

/// A closed boundary loop representing a hole in the mesh.
///
/// Vertices are ordered so that consecutive pairs run opposite to the way the
/// loop's adjacent faces traverse them; triangles that follow this order close
/// the hole with consistent winding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    /// Ordered list of vertex indices forming the loop.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop.
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }

    /// Mean position of the loop vertices.
    pub fn centroid(&self, mesh: &Mesh) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, &v| {
                acc + mesh.vertices[v as usize].position.coords
            });
        Point3::from(sum / self.vertices.len().max(1) as f64)
    }
}

/// All boundary structure found in a mesh.
#[derive(Debug, Clone, Default)]
pub struct BoundaryScan {
    /// Closed loops, ready to be filled.
    pub loops: Vec<BoundaryLoop>,

    /// Chains of boundary edges that never returned to their start vertex.
    pub open_chains: Vec<Vec<u32>>,
}

/// How a hole is triangulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleFillStrategy {
    /// Fan from the loop vertex nearest the loop centroid. Adds `n - 2` faces
    /// and no vertices.
    #[default]
    VertexFan,
    /// Insert the loop centroid as a new vertex and fan around it. Adds `n`
    /// faces and one vertex.
    CentroidFan,
}

/// Outcome of a hole-filling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoleFillReport {
    /// Number of loops closed.
    pub holes_filled: usize,

    /// Number of faces appended.
    pub faces_added: usize,

    /// Edge counts of loops skipped for exceeding the size limit.
    pub skipped_holes: Vec<usize>,

    /// Number of boundary chains that could not be closed.
    pub open_chains: usize,
}

impl HoleFillReport {
    /// True when the pass left the mesh untouched.
    pub fn is_noop(&self) -> bool {
        self.faces_added == 0
    }
}

/// Detect all boundary loops (holes) in the mesh.
pub fn detect_holes(mesh: &Mesh) -> BoundaryScan {
    scan_boundaries(&MeshAdjacency::build(&mesh.faces))
}

/// Chain the boundary edges of prebuilt adjacency into loops.
///
/// Boundary edges are chained by following shared vertices. A chain closes
/// when it returns to its start vertex; a chain that dead-ends is reported in
/// [`BoundaryScan::open_chains`].
pub fn scan_boundaries(adjacency: &MeshAdjacency) -> BoundaryScan {
    let boundary_edges = adjacency.boundary_edges();
    if boundary_edges.is_empty() {
        return BoundaryScan::default();
    }

    debug!("Found {} boundary edges", boundary_edges.len());

    let mut edge_neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in &boundary_edges {
        edge_neighbors.entry(a).or_default().push(b);
        edge_neighbors.entry(b).or_default().push(a);
    }

    let mut used: HashSet<EdgeKey> = HashSet::with_capacity(boundary_edges.len());
    let mut scan = BoundaryScan::default();

    for &(start, first) in &boundary_edges {
        if !used.insert((start, first)) {
            continue;
        }

        let mut chain = vec![start];
        let mut current = first;

        let closed = loop {
            if current == start {
                break true;
            }
            chain.push(current);

            let next = edge_neighbors.get(&current).and_then(|neighbors| {
                neighbors
                    .iter()
                    .copied()
                    .find(|&n| !used.contains(&edge_key(current, n)))
            });

            match next {
                Some(n) => {
                    used.insert(edge_key(current, n));
                    current = n;
                }
                None => break false,
            }
        };

        if closed && chain.len() >= 3 {
            scan.loops.push(orient_loop(chain, adjacency));
        } else {
            warn!(
                "Boundary chain starting at vertex {} is not closed ({} vertices)",
                start,
                chain.len()
            );
            scan.open_chains.push(chain);
        }
    }

    if !scan.loops.is_empty() {
        info!(
            "Detected {} holes (boundary loops), sizes: {:?}",
            scan.loops.len(),
            scan.loops.iter().map(|l| l.edge_count()).collect::<Vec<_>>()
        );
    }

    scan
}

/// Order the loop against the majority direction of its adjacent faces.
fn orient_loop(mut vertices: Vec<u32>, adjacency: &MeshAdjacency) -> BoundaryLoop {
    let n = vertices.len();
    let forward = (0..n)
        .filter(|&i| adjacency.directed_count(vertices[i], vertices[(i + 1) % n]) > 0)
        .count();

    // Adjacent faces already run along the loop order: the fill must run against it
    if forward * 2 > n {
        vertices.reverse();
    }
    BoundaryLoop { vertices }
}

/// A set of new triangles for one hole, plus an optional new vertex.
#[derive(Debug, Clone)]
struct FillPatch {
    triangles: Vec<[u32; 3]>,
    new_vertex: Option<Point3<f64>>,
}

/// Triangulate one hole.
fn triangulate_loop(mesh: &Mesh, boundary: &BoundaryLoop, strategy: HoleFillStrategy) -> FillPatch {
    let n = boundary.vertices.len();
    let centroid = boundary.centroid(mesh);

    match strategy {
        HoleFillStrategy::VertexFan => {
            let anchor = boundary
                .vertices
                .iter()
                .enumerate()
                .map(|(i, &v)| (i, (mesh.vertices[v as usize].position - centroid).norm_squared()))
                .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
                .0;

            let ring: Vec<u32> = (0..n).map(|i| boundary.vertices[(anchor + i) % n]).collect();
            let triangles = (1..n - 1).map(|i| [ring[0], ring[i], ring[i + 1]]).collect();

            FillPatch {
                triangles,
                new_vertex: None,
            }
        }
        HoleFillStrategy::CentroidFan => {
            let triangles = (0..n)
                .map(|i| {
                    [
                        PENDING_VERTEX,
                        boundary.vertices[i],
                        boundary.vertices[(i + 1) % n],
                    ]
                })
                .collect();

            FillPatch {
                triangles,
                new_vertex: Some(centroid),
            }
        }
    }
}

/// Fill every hole with the default strategy and size limit.
pub fn fill_holes(mesh: &mut Mesh) -> MeshResult<HoleFillReport> {
    fill_holes_with(mesh, HoleFillStrategy::default(), DEFAULT_MAX_HOLE_EDGES)
}

/// Fill all holes whose edge count is at most `max_hole_edges`.
///
/// Each hole is triangulated independently (in parallel via rayon), then all
/// patches are appended to the mesh in loop order.
pub fn fill_holes_with(
    mesh: &mut Mesh,
    strategy: HoleFillStrategy,
    max_hole_edges: usize,
) -> MeshResult<HoleFillReport> {
    mesh.check_geometry()
        .map_err(|e| MeshError::hole_fill_failed(e.to_string()))?;

    let scan = detect_holes(mesh);

    let (fillable, skipped): (Vec<_>, Vec<_>) = scan
        .loops
        .into_iter()
        .partition(|hole| hole.edge_count() <= max_hole_edges);

    for hole in &skipped {
        warn!(
            "Skipping large hole with {} edges (max: {})",
            hole.edge_count(),
            max_hole_edges
        );
    }

    let source: &Mesh = mesh;
    let patches: Vec<FillPatch> = fillable
        .par_iter()
        .map(|hole| triangulate_loop(source, hole, strategy))
        .collect();

    let mut report = HoleFillReport {
        holes_filled: patches.len(),
        faces_added: 0,
        skipped_holes: skipped.iter().map(|h| h.edge_count()).collect(),
        open_chains: scan.open_chains.len(),
    };

    for patch in patches {
        let center = patch.new_vertex.map(|position| {
            mesh.vertices.push(crate::Vertex::new(position));
            (mesh.vertices.len() - 1) as u32
        });

        for tri in patch.triangles {
            let resolved = tri.map(|v| match (v, center) {
                (PENDING_VERTEX, Some(c)) => c,
                _ => v,
            });
            mesh.faces.push(resolved);
            report.faces_added += 1;
        }
    }

    if report.holes_filled > 0 {
        info!(
            holes = report.holes_filled,
            faces_added = report.faces_added,
            "Filled holes"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn open_box_mesh() -> Mesh {
        // A box missing its top face (has a square hole)
        let mut mesh = Mesh::new();

        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0)); // 0
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0)); // 1
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0)); // 2
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0)); // 3
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0)); // 4
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 1.0)); // 5
        mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 1.0)); // 6
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 1.0)); // 7

        // Bottom
        mesh.faces.push([0, 2, 1]);
        mesh.faces.push([0, 3, 2]);
        // Front
        mesh.faces.push([0, 1, 5]);
        mesh.faces.push([0, 5, 4]);
        // Right
        mesh.faces.push([1, 2, 6]);
        mesh.faces.push([1, 6, 5]);
        // Back
        mesh.faces.push([2, 3, 7]);
        mesh.faces.push([2, 7, 6]);
        // Left
        mesh.faces.push([3, 0, 4]);
        mesh.faces.push([3, 4, 7]);

        mesh
    }

    #[test]
    fn test_detect_holes() {
        let mesh = open_box_mesh();
        let scan = detect_holes(&mesh);

        assert_eq!(scan.loops.len(), 1);
        assert_eq!(scan.loops[0].edge_count(), 4);
        assert!(scan.open_chains.is_empty());
    }

    #[test]
    fn test_loop_runs_against_adjacent_faces() {
        let mesh = open_box_mesh();
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let hole = &scan_boundaries(&adjacency).loops[0];

        let n = hole.vertices.len();
        for i in 0..n {
            let (a, b) = (hole.vertices[i], hole.vertices[(i + 1) % n]);
            assert_eq!(adjacency.directed_count(a, b), 0);
            assert_eq!(adjacency.directed_count(b, a), 1);
        }
    }

    #[test]
    fn test_fill_quad_hole_vertex_fan() {
        let mut mesh = open_box_mesh();
        let initial_faces = mesh.face_count();
        let initial_vertices = mesh.vertex_count();

        let report = fill_holes(&mut mesh).unwrap();

        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.faces_added, 2);
        assert_eq!(mesh.face_count(), initial_faces + 2);
        assert_eq!(mesh.vertex_count(), initial_vertices);
        assert!(mesh.is_watertight());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_fill_quad_hole_centroid_fan() {
        let mut mesh = open_box_mesh();
        let initial_faces = mesh.face_count();

        let report = fill_holes_with(&mut mesh, HoleFillStrategy::CentroidFan, 100).unwrap();

        assert_eq!(report.faces_added, 4);
        assert_eq!(mesh.face_count(), initial_faces + 4);
        assert_eq!(mesh.vertex_count(), 9);
        let top = mesh.vertices[8].position;
        assert_eq!(top, Point3::new(0.5, 0.5, 1.0));
        assert!(mesh.is_watertight());
    }

    #[test]
    fn test_fill_holes_is_noop_when_closed() {
        let mut mesh = open_box_mesh();
        fill_holes(&mut mesh).unwrap();
        let closed = mesh.clone();

        let report = fill_holes(&mut mesh).unwrap();
        assert!(report.is_noop());
        assert_eq!(mesh, closed);
    }

    #[test]
    fn test_large_hole_is_skipped() {
        let mut mesh = open_box_mesh();
        let report = fill_holes_with(&mut mesh, HoleFillStrategy::VertexFan, 3).unwrap();
        assert_eq!(report.holes_filled, 0);
        assert_eq!(report.skipped_holes, vec![4]);
        assert!(!mesh.is_watertight());
    }

    /// Three faces sharing edge 0-1: the boundary splits into one closed
    /// loop and one chain that dead-ends at the non-manifold edge.
    fn fan_on_one_edge() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(10.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(5.0, 8.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(5.0, -8.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(5.0, 0.0, 8.0));
        mesh.faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        mesh
    }

    #[test]
    fn test_dead_end_boundary_is_an_open_chain() {
        let scan = detect_holes(&fan_on_one_edge());

        assert_eq!(scan.loops.len(), 1);
        assert_eq!(scan.loops[0].vertices, vec![0, 2, 1, 3]);
        assert_eq!(scan.open_chains, vec![vec![0, 4, 1]]);
    }

    #[test]
    fn test_open_chain_is_left_alone() {
        let mut mesh = fan_on_one_edge();
        let report = fill_holes(&mut mesh).unwrap();

        assert_eq!(report.open_chains, 1);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.faces_added, 2);
        assert_eq!(mesh.face_count(), 5);
        assert!(!mesh.faces[3..].iter().any(|f| f.contains(&4)));
    }

    #[test]
    fn test_single_triangle_boundary_is_a_loop() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);

        let report = fill_holes(&mut mesh).unwrap();
        assert_eq!(report.faces_added, 1);
        assert_eq!(mesh.faces[1], [0, 2, 1]);
        assert!(mesh.is_watertight());
    }

    #[test]
    fn test_fill_rejects_invalid_mesh() {
        let mut mesh = Mesh::new();
        let err = fill_holes(&mut mesh).unwrap_err();
        assert!(err.is_repair_failure());
    }
}
