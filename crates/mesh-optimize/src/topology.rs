//! Topology analysis: watertightness, holes, degenerate faces and orientation.

use tracing::{debug, warn};

use crate::Mesh;
use crate::adjacency::MeshAdjacency;
use crate::holes::scan_boundaries;
use crate::winding::analyze_orientation;

/// Topology report for a mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyReport {
    /// Every edge has two faces traversing it in opposite directions.
    pub is_watertight: bool,

    /// Whether all edges have at most 2 adjacent faces.
    pub is_manifold: bool,

    /// Number of boundary edges (edges with 1 adjacent face).
    pub boundary_edge_count: usize,

    /// Number of non-manifold edges (edges with >2 adjacent faces).
    pub non_manifold_edge_count: usize,

    /// Two-face edges traversed in the same direction by both faces.
    pub winding_conflict_count: usize,

    /// Closed boundary loops.
    pub hole_count: usize,

    /// Boundary chains that never close.
    pub open_chain_count: usize,

    /// Indices of faces with near-zero area.
    pub degenerate_faces: Vec<usize>,

    /// Faces disagreeing with the majority orientation of their component.
    pub inverted_face_count: usize,

    /// Number of edge-connected components.
    pub component_count: usize,
}

impl TopologyReport {
    /// Number of degenerate faces.
    pub fn degenerate_face_count(&self) -> usize {
        self.degenerate_faces.len()
    }

    /// Whether some face normals disagree with their neighbours.
    pub fn has_inconsistent_normals(&self) -> bool {
        self.inverted_face_count > 0
    }
}

impl std::fmt::Display for TopologyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Topology:")?;
        writeln!(
            f,
            "  Watertight: {} (boundary edges: {}, holes: {})",
            if self.is_watertight { "yes" } else { "NO" },
            self.boundary_edge_count,
            self.hole_count
        )?;
        writeln!(
            f,
            "  Manifold: {} (non-manifold edges: {})",
            if self.is_manifold { "yes" } else { "NO" },
            self.non_manifold_edge_count
        )?;
        writeln!(
            f,
            "  Orientation: {} inverted faces, {} winding conflicts",
            self.inverted_face_count, self.winding_conflict_count
        )?;
        writeln!(f, "  Degenerate faces: {}", self.degenerate_faces.len())?;
        writeln!(f, "  Components: {}", self.component_count)?;
        Ok(())
    }
}

/// Analyze the topology of a mesh.
///
/// Builds the edge adjacency once and derives every count from it. Nothing
/// here mutates the mesh. Face indices must be in range; run
/// [`Mesh::check_geometry`] first on untrusted input.
pub fn analyze_topology(mesh: &Mesh) -> TopologyReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let boundaries = scan_boundaries(&adjacency);
    let orientation = analyze_orientation(mesh);

    let report = TopologyReport {
        is_watertight: adjacency.is_watertight(),
        is_manifold: adjacency.is_manifold(),
        boundary_edge_count: adjacency.boundary_edge_count(),
        non_manifold_edge_count: adjacency.non_manifold_edge_count(),
        winding_conflict_count: adjacency.winding_conflict_count(),
        hole_count: boundaries.loops.len(),
        open_chain_count: boundaries.open_chains.len(),
        degenerate_faces: mesh.degenerate_faces(),
        inverted_face_count: orientation.inverted_count(),
        component_count: orientation.component_count,
    };

    if !report.is_watertight {
        warn!(
            "Mesh is not watertight: {} boundary edges, {} winding conflicts",
            report.boundary_edge_count, report.winding_conflict_count
        );
    }

    if !report.is_manifold {
        warn!(
            "Mesh is not manifold: {} non-manifold edges",
            report.non_manifold_edge_count
        );
    }

    debug!("{}", report);

    report
}
