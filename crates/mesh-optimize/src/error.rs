//! Error types for mesh analysis, repair and transformation.
//!
//! Each error carries:
//! - A human-readable message
//! - A machine-readable [`ErrorCode`] in the format `MESH-XXXX`
//! - A [`RecoverySuggestion`] for callers that want to guide users
//! - A `miette` diagnostic code and help line for terminal display
//!
//! # Error Codes
//!
//! - `MESH-1xxx`: I/O errors (file reading, writing, parsing)
//! - `MESH-2xxx`: Geometry validation errors (fatal on load)
//! - `MESH-3xxx`: Repair errors (downgraded to warnings by the pipeline)
//! - `MESH-4xxx`: Format errors
//! - `MESH-5xxx`: Transform errors (fatal for the requested operation only)

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// MESH-1001: Failed to read file
    IoRead = 1001,
    /// MESH-1002: Failed to write file
    IoWrite = 1002,
    /// MESH-1003: Failed to parse file contents
    ParseError = 1003,

    /// MESH-2001: Face references an out-of-range vertex
    InvalidVertexIndex = 2001,
    /// MESH-2002: Vertex has a NaN or infinite coordinate
    InvalidCoordinate = 2002,
    /// MESH-2003: Mesh has no vertices or no faces
    EmptyMesh = 2003,

    /// MESH-3001: Generic repair failure
    RepairFailed = 3001,
    /// MESH-3002: Hole filling failed
    HoleFillFailed = 3002,
    /// MESH-3003: Orientation repair failed
    WindingFailed = 3003,

    /// MESH-4001: Unsupported file format
    UnsupportedFormat = 4001,

    /// MESH-5001: Scale divides by a zero-length axis
    DegenerateExtent = 5001,
    /// MESH-5002: Scale factor, target or bed size is not a positive finite number
    InvalidParameter = 5002,
}

impl ErrorCode {
    /// Returns the code as a string in the format `MESH-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "MESH-1001",
            ErrorCode::IoWrite => "MESH-1002",
            ErrorCode::ParseError => "MESH-1003",
            ErrorCode::InvalidVertexIndex => "MESH-2001",
            ErrorCode::InvalidCoordinate => "MESH-2002",
            ErrorCode::EmptyMesh => "MESH-2003",
            ErrorCode::RepairFailed => "MESH-3001",
            ErrorCode::HoleFillFailed => "MESH-3002",
            ErrorCode::WindingFailed => "MESH-3003",
            ErrorCode::UnsupportedFormat => "MESH-4001",
            ErrorCode::DegenerateExtent => "MESH-5001",
            ErrorCode::InvalidParameter => "MESH-5002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a caller can do about an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Export the model again, optionally in a specific format.
    ReexportFile { format: Option<&'static str> },
    /// Run another pipeline step first.
    EnableStep { step: &'static str },
    /// Save or load with one of the supported formats.
    UseSupportedFormat,
    /// Inspect the input or the filesystem.
    CheckInput { checks: Vec<&'static str> },
    /// Change one option of the run.
    ChangeOption { option: String, hint: &'static str },
    /// Nothing to do but report it.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::ReexportFile { format: Some(format) } => {
                write!(f, "Export the model again as {}", format)
            }
            RecoverySuggestion::ReexportFile { format: None } => {
                write!(f, "Export the model again from the modelling tool")
            }
            RecoverySuggestion::EnableStep { step } => write!(f, "Enable {} and retry", step),
            RecoverySuggestion::UseSupportedFormat => write!(f, "Use .stl, .obj or .glb"),
            RecoverySuggestion::CheckInput { checks } => write!(f, "Check: {}", checks.join(", ")),
            RecoverySuggestion::ChangeOption { option, hint } => write!(f, "{}: {}", option, hint),
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Errors that can occur during mesh operations.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(mesh::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(mesh::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error decoding a mesh payload.
    #[error("failed to parse mesh from {path}: {details}")]
    #[diagnostic(
        code(mesh::parse::error),
        help("The payload may be corrupted or truncated. Try re-exporting from the original software.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(
        code(mesh::format::unsupported),
        help("Supported formats: STL, OBJ, GLB")
    )]
    UnsupportedFormat { extension: Option<String> },

    /// Empty mesh (no vertices or faces).
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(mesh::geometry::empty),
        help("The mesh must have at least one vertex and one face")
    )]
    EmptyMesh { details: String },

    /// Face references a vertex that does not exist.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(mesh::geometry::vertex_index),
        help("Check the exporter settings; every face must reference existing vertices")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Vertex coordinate is NaN or infinite.
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(mesh::geometry::coordinate),
        help("Check for numerical issues in the source data")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// A repair step could not complete.
    #[error("mesh repair failed: {details}")]
    #[diagnostic(
        code(mesh::repair::failed),
        help("Try running individual repair operations to identify the specific issue")
    )]
    RepairFailed { details: String },

    /// Hole filling could not complete.
    #[error("hole filling failed: {details}")]
    #[diagnostic(
        code(mesh::repair::hole_fill),
        help("The hole boundary may be self-intersecting or pinched")
    )]
    HoleFillFailed { details: String },

    /// Orientation repair could not complete.
    #[error("normal orientation repair failed: {details}")]
    #[diagnostic(
        code(mesh::repair::winding),
        help("Non-manifold edges can prevent a consistent orientation")
    )]
    WindingFailed { details: String },

    /// A scale operation would divide by a zero-length axis.
    #[error("cannot scale along {axis}: current extent is {extent}")]
    #[diagnostic(
        code(mesh::transform::degenerate_extent),
        help("The mesh is flat along this axis; leave the axis unspecified")
    )]
    DegenerateExtent { axis: &'static str, extent: f64 },

    /// A transform parameter is not a positive finite number.
    #[error("invalid parameter {name}: {value}")]
    #[diagnostic(
        code(mesh::transform::parameter),
        help("Scale factors, target sizes and bed sizes must be positive finite numbers")
    )]
    InvalidParameter { name: &'static str, value: f64 },
}

impl MeshError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::IoRead { .. } => ErrorCode::IoRead,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
            MeshError::ParseError { .. } => ErrorCode::ParseError,
            MeshError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            MeshError::RepairFailed { .. } => ErrorCode::RepairFailed,
            MeshError::HoleFillFailed { .. } => ErrorCode::HoleFillFailed,
            MeshError::WindingFailed { .. } => ErrorCode::WindingFailed,
            MeshError::DegenerateExtent { .. } => ErrorCode::DegenerateExtent,
            MeshError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
        }
    }

    /// True for malformed input geometry, which aborts before any repair runs.
    pub fn is_invalid_geometry(&self) -> bool {
        matches!(
            self,
            MeshError::EmptyMesh { .. }
                | MeshError::InvalidVertexIndex { .. }
                | MeshError::InvalidCoordinate { .. }
        )
    }

    /// True for errors raised inside a single repair step.
    pub fn is_repair_failure(&self) -> bool {
        matches!(
            self,
            MeshError::RepairFailed { .. }
                | MeshError::HoleFillFailed { .. }
                | MeshError::WindingFailed { .. }
        )
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::IoRead { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["the file exists", "it is readable"],
            },
            MeshError::IoWrite { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["the output directory exists", "it is writable"],
            },
            MeshError::ParseError { .. } => RecoverySuggestion::ReexportFile {
                format: Some("binary STL or GLB"),
            },
            MeshError::UnsupportedFormat { .. } => RecoverySuggestion::UseSupportedFormat,
            MeshError::EmptyMesh { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["the scene contains triangle geometry"],
            },
            MeshError::InvalidVertexIndex { .. } | MeshError::InvalidCoordinate { .. } => {
                RecoverySuggestion::ReexportFile { format: None }
            }
            MeshError::RepairFailed { .. } => RecoverySuggestion::None,
            MeshError::HoleFillFailed { .. } => RecoverySuggestion::ChangeOption {
                option: "max_hole_edges".into(),
                hint: "lower it to leave large openings alone",
            },
            MeshError::WindingFailed { .. } => RecoverySuggestion::EnableStep {
                step: "remove_degenerate",
            },
            MeshError::DegenerateExtent { axis, .. } => RecoverySuggestion::ChangeOption {
                option: (*axis).to_string(),
                hint: "the model is flat along this axis and cannot be sized on it",
            },
            MeshError::InvalidParameter { name, .. } => RecoverySuggestion::ChangeOption {
                option: (*name).to_string(),
                hint: "must be a positive finite number",
            },
        }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create a RepairFailed error.
    pub fn repair_failed(details: impl Into<String>) -> Self {
        MeshError::RepairFailed {
            details: details.into(),
        }
    }

    /// Create a HoleFillFailed error.
    pub fn hole_fill_failed(details: impl Into<String>) -> Self {
        MeshError::HoleFillFailed {
            details: details.into(),
        }
    }

    /// Create a WindingFailed error.
    pub fn winding_failed(details: impl Into<String>) -> Self {
        MeshError::WindingFailed {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_format() {
        assert_eq!(ErrorCode::IoRead.as_str(), "MESH-1001");
        assert_eq!(ErrorCode::DegenerateExtent.to_string(), "MESH-5001");
        let err = MeshError::DegenerateExtent {
            axis: "depth",
            extent: 0.0,
        };
        assert_eq!(err.code(), ErrorCode::DegenerateExtent);
    }

    #[test]
    fn test_taxonomy_helpers() {
        let err = MeshError::InvalidVertexIndex {
            face_index: 3,
            vertex_index: 9,
            vertex_count: 4,
        };
        assert!(err.is_invalid_geometry());
        assert!(!err.is_repair_failure());
        assert!(err.to_string().contains("face 3 references vertex 9"));

        let err = MeshError::hole_fill_failed("open chain");
        assert!(err.is_repair_failure());
        assert!(!err.is_invalid_geometry());
    }

    #[test]
    fn test_recovery_suggestion_display() {
        let err = MeshError::DegenerateExtent {
            axis: "width",
            extent: 0.0,
        };
        let text = err.recovery_suggestion().to_string();
        assert!(text.starts_with("width: the model is flat"));

        let err = MeshError::UnsupportedFormat {
            extension: Some("ply".into()),
        };
        assert_eq!(
            err.recovery_suggestion(),
            RecoverySuggestion::UseSupportedFormat
        );
    }
}
