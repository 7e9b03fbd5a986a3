//! Print-readiness analysis, repair and placement for triangle meshes.
//!
//! This crate takes a decoded triangle mesh, reports what would stop it from
//! printing cleanly, repairs what it can and places it in the build volume.
//!
//! # Features
//!
//! - **File I/O**: Load and save STL, OBJ and GLB (scenes are flattened)
//! - **Analysis**: Watertightness, holes, non-manifold edges, degenerate and
//!   inverted faces, a 1-5 printability score with issues and recommendations
//! - **Repair**: Degenerate removal, hole filling, normal orientation,
//!   inside-out correction
//! - **Transformation**: Target-size, uniform and fit-to-bed scaling;
//!   centering on the ground plane
//!
//! # Units and Scale
//!
//! **This library assumes millimeter (mm) units.** The score thresholds are
//! tuned for desktop printers: larger than 300mm may not fit, smaller than
//! 10mm loses detail, thinner than 1mm may not print.
//!
//! # Coordinate System
//!
//! - X: width
//! - Y: height
//! - Z: depth, and the vertical axis for grounding
//!
//! Face winding is **counter-clockwise (CCW) when viewed from outside** the mesh.
//!
//! # Quick Start
//!
//! ```no_run
//! use mesh_optimize::{Mesh, OptimizeOptions, Optimizer};
//!
//! let mesh = Mesh::load("model.glb").unwrap();
//!
//! let report = mesh.analyze().unwrap();
//! println!("{}", report);
//!
//! let result = Optimizer::new(OptimizeOptions::default())
//!     .optimize(mesh)
//!     .unwrap();
//! for warning in &result.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! result.mesh.save("model_fixed.glb").unwrap();
//! ```
//!
//! # Pipeline Configuration
//!
//! ```no_run
//! use mesh_optimize::{Mesh, OptimizeOptions, Optimizer, TargetSize};
//!
//! let options = OptimizeOptions {
//!     fix_normals: false,
//!     target_size: Some(TargetSize::width(120.0)),
//!     ..Default::default()
//! };
//!
//! let mesh = Mesh::load("part.stl").unwrap();
//! let result = Optimizer::new(options).optimize(mesh).unwrap();
//! println!("{:?}", result.operations); // ["scale_to_target:...", "center_and_ground"]
//! ```

pub mod adjacency;
pub mod error;
pub mod holes;
pub mod io;
pub mod options;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod topology;
pub mod tracing_ext;
pub mod transform;
pub mod types;
pub mod winding;

pub use adjacency::MeshAdjacency;
pub use error::{ErrorCode, MeshError, MeshResult, RecoverySuggestion};
pub use holes::{
    BoundaryLoop, BoundaryScan, DEFAULT_MAX_HOLE_EDGES, HoleFillReport, HoleFillStrategy,
    detect_holes, fill_holes, fill_holes_with,
};
pub use io::{MeshFormat, encode_mesh, load_mesh, load_mesh_from_bytes, save_mesh, save_mesh_as};
pub use options::{OptimizeOptions, ScaleRequest};
pub use pipeline::{OperationLog, OptimizeResult, Optimizer};
pub use repair::{NativeBackend, RepairBackend, remove_degenerate_faces};
pub use report::{AnalysisReport, BoundingBox, Issue, IssueKind, MeshStats, analyze, printability_score};
pub use topology::{TopologyReport, analyze_topology};
pub use transform::{
    BED_MARGIN, BedSize, CenterMode, TargetSize, center_mesh, fit_to_bed, scale_to_target,
    uniform_scale,
};
pub use types::{DEGENERATE_AREA_EPSILON, Mesh, Triangle, Vertex};
pub use winding::{OrientationAnalysis, analyze_orientation, fix_inversion, fix_normals};

impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh to a file, auto-detecting format from extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> MeshResult<()> {
        io::save_mesh(self, path.as_ref())
    }

    /// Printability analysis of the current state. Fails on malformed
    /// geometry instead of panicking.
    pub fn analyze(&self) -> MeshResult<AnalysisReport> {
        report::analyze(self)
    }

    /// Topology counts of the current state.
    pub fn topology(&self) -> TopologyReport {
        topology::analyze_topology(self)
    }

    /// Fill holes with the default strategy.
    pub fn fill_holes(&mut self) -> MeshResult<HoleFillReport> {
        holes::fill_holes(self)
    }

    /// Make face orientation consistent. Returns the number of faces flipped.
    pub fn fix_normals(&mut self) -> MeshResult<usize> {
        winding::fix_normals(self)
    }

    /// Drop faces with near-zero area. Returns the number removed.
    pub fn remove_degenerate_faces(&mut self) -> MeshResult<usize> {
        repair::remove_degenerate_faces(self, DEGENERATE_AREA_EPSILON)
    }
}
