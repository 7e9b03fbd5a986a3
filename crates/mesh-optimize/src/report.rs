//! Printability analysis: statistics, issues, recommendations and score.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Mesh;
use crate::error::MeshResult;
use crate::topology::{TopologyReport, analyze_topology};

/// Best possible printability score.
pub const MAX_SCORE: u8 = 5;

/// Worst possible printability score.
pub const MIN_SCORE: u8 = 1;

/// Above this face count the mesh is considered too heavy.
pub const HIGH_FACE_COUNT: usize = 500_000;

/// Below this face count the mesh is considered too coarse.
pub const LOW_FACE_COUNT: usize = 100;

/// Largest dimension (mm) above which a typical print bed is exceeded.
pub const LARGE_DIMENSION_MM: f64 = 300.0;

/// Largest dimension (mm) below which fine detail is lost.
pub const SMALL_DIMENSION_MM: f64 = 10.0;

/// Smallest dimension (mm) below which features are too thin to print.
pub const THIN_DIMENSION_MM: f64 = 1.0;

/// Axis-aligned bounding box size in millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// Before/after statistics for a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub face_count: usize,
    pub bounding_box: BoundingBox,
    pub is_watertight: bool,
    /// Enclosed volume; `None` unless the mesh is watertight.
    pub volume: Option<f64>,
    pub center: [f64; 3],
}

impl MeshStats {
    /// Snapshot the current state of a mesh.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let extents = mesh.extents();
        let center = mesh.centroid();
        Self {
            vertex_count: mesh.vertex_count(),
            face_count: mesh.face_count(),
            bounding_box: BoundingBox {
                width: extents.x,
                height: extents.y,
                depth: extents.z,
            },
            is_watertight: mesh.is_watertight(),
            volume: mesh.volume(),
            center: [center.x, center.y, center.z],
        }
    }
}

/// Category of a detected printability issue, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NotWatertight,
    DegenerateFaces,
    HighFaceCount,
    LowFaceCount,
    InvertedNormals,
    TooLarge,
    TooSmall,
    TooThin,
}

impl IssueKind {
    /// Score deduction for this issue.
    pub fn penalty(self) -> u8 {
        match self {
            IssueKind::NotWatertight => 2,
            IssueKind::InvertedNormals => 0,
            IssueKind::DegenerateFaces
            | IssueKind::HighFaceCount
            | IssueKind::LowFaceCount
            | IssueKind::TooLarge
            | IssueKind::TooSmall
            | IssueKind::TooThin => 1,
        }
    }
}

/// One detected condition with its human-readable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    pub recommendation: String,
}

impl Issue {
    fn new(kind: IssueKind, message: String, recommendation: &str) -> Self {
        Self {
            kind,
            message,
            recommendation: recommendation.to_string(),
        }
    }
}

/// Immutable analysis snapshot of one mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub stats: MeshStats,

    /// Issue messages, parallel to `recommendations`.
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub printability_score: u8,

    pub hole_count: usize,
    pub non_manifold_edge_count: usize,
    pub degenerate_face_count: usize,
    pub inverted_face_count: usize,

    /// Categories of `issues`, in the same order.
    pub issue_kinds: Vec<IssueKind>,
}

impl AnalysisReport {
    /// Whether an issue of the given kind was detected.
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issue_kinds.contains(&kind)
    }
}

impl std::fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bb = &self.stats.bounding_box;
        writeln!(f, "Analysis Report:")?;
        writeln!(f, "  Vertices: {}", self.stats.vertex_count)?;
        writeln!(f, "  Faces: {}", self.stats.face_count)?;
        writeln!(
            f,
            "  Dimensions: {:.1} x {:.1} x {:.1} mm",
            bb.width, bb.height, bb.depth
        )?;
        match self.stats.volume {
            Some(v) => writeln!(f, "  Volume: {:.2} mm^3", v)?,
            None => writeln!(f, "  Volume: n/a (not watertight)")?,
        }
        writeln!(
            f,
            "  Watertight: {} (holes: {})",
            if self.stats.is_watertight { "yes" } else { "NO" },
            self.hole_count
        )?;
        writeln!(f, "  Non-manifold edges: {}", self.non_manifold_edge_count)?;
        writeln!(f, "  Degenerate faces: {}", self.degenerate_face_count)?;
        writeln!(f, "  Inverted faces: {}", self.inverted_face_count)?;
        writeln!(
            f,
            "  Printability: {}/{}",
            self.printability_score, MAX_SCORE
        )?;

        for (issue, rec) in self.issues.iter().zip(&self.recommendations) {
            writeln!(f, "  - {}", issue)?;
            writeln!(f, "    -> {}", rec)?;
        }
        Ok(())
    }
}

/// Format an integer with comma thousands separators.
fn with_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Detect printability issues, in report order.
pub fn detect_issues(mesh: &Mesh, topology: &TopologyReport) -> Vec<Issue> {
    let mut issues = Vec::new();

    if !topology.is_watertight {
        issues.push(Issue::new(
            IssueKind::NotWatertight,
            "Mesh is not watertight (has holes or gaps)".to_string(),
            "Enable 'Fill Holes' to repair mesh",
        ));
    }

    let degenerate = topology.degenerate_face_count();
    if degenerate > 0 {
        issues.push(Issue::new(
            IssueKind::DegenerateFaces,
            format!("Found {} degenerate faces (zero area)", degenerate),
            "Consider mesh cleanup to remove degenerate faces",
        ));
    }

    let face_count = mesh.face_count();
    if face_count > HIGH_FACE_COUNT {
        issues.push(Issue::new(
            IssueKind::HighFaceCount,
            format!(
                "High polygon count ({} faces) may slow printing software",
                with_thousands(face_count)
            ),
            "Enable simplification to reduce polygon count",
        ));
    } else if face_count < LOW_FACE_COUNT {
        issues.push(Issue::new(
            IssueKind::LowFaceCount,
            format!("Very low polygon count ({} faces)", face_count),
            "Model may appear faceted when printed",
        ));
    }

    if topology.has_inconsistent_normals() {
        issues.push(Issue::new(
            IssueKind::InvertedNormals,
            "Some face normals may be inverted".to_string(),
            "Enable 'Fix Normals' to correct orientation",
        ));
    }

    let extents = mesh.extents();
    let max_dim = extents.max();
    let min_dim = extents.min();

    if max_dim > LARGE_DIMENSION_MM {
        issues.push(Issue::new(
            IssueKind::TooLarge,
            format!("Model is large ({:.1}mm) - may not fit print bed", max_dim),
            "Consider scaling down to fit your printer",
        ));
    } else if max_dim < SMALL_DIMENSION_MM {
        issues.push(Issue::new(
            IssueKind::TooSmall,
            format!(
                "Model is small ({:.1}mm) - fine details may not print",
                max_dim
            ),
            "Consider scaling up for better detail",
        ));
    }

    if min_dim < THIN_DIMENSION_MM {
        issues.push(Issue::new(
            IssueKind::TooThin,
            format!("Minimum dimension is very thin ({:.2}mm)", min_dim),
            "Very thin features may not print successfully",
        ));
    }

    issues
}

/// Score from 5 down, one fixed penalty per issue, clamped to [1, 5].
pub fn printability_score(issues: &[Issue]) -> u8 {
    let penalty: u32 = issues.iter().map(|i| u32::from(i.kind.penalty())).sum();
    let score = u32::from(MAX_SCORE).saturating_sub(penalty);
    score.clamp(u32::from(MIN_SCORE), u32::from(MAX_SCORE)) as u8
}

/// Validate a mesh and build its analysis report.
///
/// Fails with the same errors as [`Mesh::check_geometry`] (empty mesh,
/// out-of-range index, non-finite coordinate).
pub fn analyze(mesh: &Mesh) -> MeshResult<AnalysisReport> {
    mesh.check_geometry()?;
    Ok(build_report(mesh))
}

/// Analysis report for a mesh already known to have in-range indices.
pub(crate) fn build_report(mesh: &Mesh) -> AnalysisReport {
    let topology = analyze_topology(mesh);
    let issues = detect_issues(mesh, &topology);
    let score = printability_score(&issues);

    info!(
        faces = mesh.face_count(),
        issues = issues.len(),
        score,
        "Mesh analyzed"
    );
    for issue in &issues {
        debug!(kind = ?issue.kind, "{}", issue.message);
    }

    AnalysisReport {
        stats: MeshStats::from_mesh(mesh),
        printability_score: score,
        hole_count: topology.hole_count,
        non_manifold_edge_count: topology.non_manifold_edge_count,
        degenerate_face_count: topology.degenerate_face_count(),
        inverted_face_count: topology.inverted_face_count,
        issue_kinds: issues.iter().map(|i| i.kind).collect(),
        recommendations: issues.iter().map(|i| i.recommendation.clone()).collect(),
        issues: issues.into_iter().map(|i| i.message).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    /// Closed UV sphere, outward wound: `2 * slices * (stacks - 1)` faces.
    fn uv_sphere(radius: f64, stacks: u32, slices: u32) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, radius));
        for i in 1..stacks {
            let phi = std::f64::consts::PI * i as f64 / stacks as f64;
            for j in 0..slices {
                let theta = 2.0 * std::f64::consts::PI * j as f64 / slices as f64;
                mesh.vertices.push(Vertex::from_coords(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                ));
            }
        }
        let south = mesh.vertices.len() as u32;
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, -radius));

        let ring = |i: u32, j: u32| 1 + (i - 1) * slices + j % slices;
        for j in 0..slices {
            mesh.faces.push([0, ring(1, j), ring(1, j + 1)]);
        }
        for i in 1..stacks - 1 {
            for j in 0..slices {
                let (a, b) = (ring(i, j), ring(i, j + 1));
                let (c, d) = (ring(i + 1, j), ring(i + 1, j + 1));
                mesh.faces.push([a, c, d]);
                mesh.faces.push([a, d, b]);
            }
        }
        for j in 0..slices {
            mesh.faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
        }
        mesh
    }

    /// Closed axis-aligned box with one corner at the origin, outward wound.
    fn cuboid(w: f64, h: f64, d: f64) -> Mesh {
        Mesh::from_buffers(
            vec![
                [0.0, 0.0, 0.0],
                [w, 0.0, 0.0],
                [w, h, 0.0],
                [0.0, h, 0.0],
                [0.0, 0.0, d],
                [w, 0.0, d],
                [w, h, d],
                [0.0, h, d],
            ],
            vec![
                [0, 2, 1],
                [0, 3, 2],
                [0, 1, 5],
                [0, 5, 4],
                [3, 7, 6],
                [3, 6, 2],
                [0, 4, 7],
                [0, 7, 3],
                [1, 2, 6],
                [1, 6, 5],
                [4, 5, 6],
                [4, 6, 7],
            ],
        )
        .unwrap()
    }

    /// Open heightfield sheet of `2 * n * n` faces spanning `size` x `size` mm,
    /// sloped so it is `slope * size` mm deep.
    fn sloped_sheet(n: u32, size: f64, slope: f64) -> Mesh {
        let step = size / n as f64;
        let mut mesh = Mesh::new();
        for j in 0..=n {
            for i in 0..=n {
                let x = i as f64 * step;
                mesh.vertices
                    .push(Vertex::from_coords(x, j as f64 * step, x * slope));
            }
        }
        let at = |i: u32, j: u32| j * (n + 1) + i;
        for j in 0..n {
            for i in 0..n {
                let (a, b) = (at(i, j), at(i + 1, j));
                let (c, d) = (at(i + 1, j + 1), at(i, j + 1));
                mesh.faces.push([a, b, c]);
                mesh.faces.push([a, c, d]);
            }
        }
        mesh
    }

    fn issue(kind: IssueKind) -> Issue {
        Issue::new(kind, String::new(), "")
    }

    #[test]
    fn test_clean_sphere_scores_five() {
        let mesh = uv_sphere(20.0, 8, 16);
        assert_eq!(mesh.face_count(), 224);

        let report = analyze(&mesh).unwrap();
        assert!(report.stats.is_watertight);
        assert!(report.issues.is_empty());
        assert_eq!(report.printability_score, 5);
        assert!(report.stats.volume.is_some());
    }

    #[test]
    fn test_small_tetrahedron_issues_in_order() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
        mesh.faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3]];

        let report = analyze(&mesh).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![
                IssueKind::NotWatertight,
                IssueKind::LowFaceCount,
                IssueKind::TooSmall
            ]
        );
        assert_eq!(report.issues.len(), report.recommendations.len());
        assert_eq!(report.issues[0], "Mesh is not watertight (has holes or gaps)");
        assert_eq!(report.issues[1], "Very low polygon count (3 faces)");
        assert_eq!(report.printability_score, 1);
        assert_eq!(report.hole_count, 1);
        assert_eq!(report.stats.volume, None);
    }

    #[test]
    fn test_inverted_normals_reported_without_penalty() {
        let mut mesh = uv_sphere(20.0, 8, 16);
        mesh.flip_face(5);

        let report = analyze(&mesh).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![IssueKind::NotWatertight, IssueKind::InvertedNormals]
        );
        assert_eq!(report.inverted_face_count, 1);
        assert_eq!(report.printability_score, 3);
    }

    #[test]
    fn test_score_clamps_at_one() {
        let worst = [
            issue(IssueKind::NotWatertight),
            issue(IssueKind::DegenerateFaces),
            issue(IssueKind::HighFaceCount),
            issue(IssueKind::TooLarge),
            issue(IssueKind::TooThin),
        ];
        assert_eq!(printability_score(&worst), 1);
        assert_eq!(printability_score(&[]), 5);
    }

    #[test]
    fn test_heavy_open_large_mesh_scores_one() {
        let issues = [
            issue(IssueKind::NotWatertight),
            issue(IssueKind::HighFaceCount),
            issue(IssueKind::TooLarge),
        ];
        assert_eq!(printability_score(&issues), 1);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(with_thousands(0), "0");
        assert_eq!(with_thousands(999), "999");
        assert_eq!(with_thousands(1000), "1,000");
        assert_eq!(with_thousands(1_000_000), "1,000,000");
    }

    #[test]
    fn test_report_serializes_flat_stats() {
        let report = analyze(&uv_sphere(20.0, 8, 16)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["face_count"], 224);
        assert_eq!(json["printability_score"], 5);
        assert!(json["bounding_box"]["width"].as_f64().unwrap() > 39.0);
    }

    #[test]
    fn test_million_face_open_large_mesh_scores_one() {
        let mesh = sloped_sheet(708, 400.0, 0.02);
        assert_eq!(mesh.face_count(), 1_002_528);

        let report = analyze(&mesh).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![
                IssueKind::NotWatertight,
                IssueKind::HighFaceCount,
                IssueKind::TooLarge
            ]
        );
        assert_eq!(
            report.issues[1],
            "High polygon count (1,002,528 faces) may slow printing software"
        );
        assert_eq!(report.issues[2], "Model is large (400.0mm) - may not fit print bed");
        assert_eq!(report.printability_score, 1);
    }

    #[test]
    fn test_large_box_is_not_also_small() {
        let report = analyze(&cuboid(400.0, 20.0, 20.0)).unwrap();
        assert!(report.stats.is_watertight);
        assert_eq!(
            report.issue_kinds,
            vec![IssueKind::LowFaceCount, IssueKind::TooLarge]
        );
        assert!(!report.has_issue(IssueKind::TooSmall));
        assert_eq!(report.printability_score, 3);
    }

    #[test]
    fn test_small_box_is_not_also_large() {
        let report = analyze(&cuboid(5.0, 5.0, 5.0)).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![IssueKind::LowFaceCount, IssueKind::TooSmall]
        );
        assert_eq!(report.printability_score, 3);
    }

    #[test]
    fn test_thin_plate_reports_minimum_dimension() {
        let report = analyze(&cuboid(20.0, 20.0, 0.5)).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![IssueKind::LowFaceCount, IssueKind::TooThin]
        );
        assert_eq!(report.issues[1], "Minimum dimension is very thin (0.50mm)");
        assert_eq!(report.printability_score, 3);

        let report = analyze(&cuboid(5.0, 5.0, 0.5)).unwrap();
        assert_eq!(
            report.issue_kinds,
            vec![
                IssueKind::LowFaceCount,
                IssueKind::TooSmall,
                IssueKind::TooThin
            ]
        );
        assert_eq!(report.printability_score, 2);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let mut mesh = cuboid(20.0, 20.0, 20.0);
        mesh.faces.push([0, 1, 99]);
        let err = analyze(&mesh).unwrap_err();
        assert!(matches!(
            err,
            crate::MeshError::InvalidVertexIndex { vertex_index: 99, .. }
        ));
    }
}
