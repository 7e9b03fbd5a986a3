//! Configuration for the optimization pipeline.
//!
//! Options deserialize from JSON or TOML with every field optional:
//!
//! ```toml
//! fill_holes = true
//! fix_normals = true
//! center_mode = "bounds_center"
//! output_format = "stl"
//!
//! [target_size]
//! width = 100.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::holes::{DEFAULT_MAX_HOLE_EDGES, HoleFillStrategy};
use crate::io::MeshFormat;
use crate::transform::{BedSize, CenterMode, TargetSize};

/// Options for a single optimize run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeOptions {
    /// Drop zero-area faces before any other repair.
    pub remove_degenerate: bool,
    pub fill_holes: bool,
    pub fix_normals: bool,
    /// Second hole-filling pass plus inversion fix once winding is consistent.
    pub make_watertight: bool,
    pub center_mesh: bool,
    pub center_mode: CenterMode,
    pub hole_fill: HoleFillStrategy,
    /// Holes with more edges are left open.
    pub max_hole_edges: usize,
    pub output_format: MeshFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size: Option<TargetSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_bed_size: Option<BedSize>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            remove_degenerate: true,
            fill_holes: true,
            fix_normals: true,
            make_watertight: true,
            center_mesh: true,
            center_mode: CenterMode::default(),
            hole_fill: HoleFillStrategy::default(),
            max_hole_edges: DEFAULT_MAX_HOLE_EDGES,
            output_format: MeshFormat::default(),
            target_size: None,
            uniform_scale: None,
            print_bed_size: None,
        }
    }
}

/// The one scaling operation a run performs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleRequest {
    Target(TargetSize),
    Uniform(f64),
    FitBed(BedSize),
}

impl OptimizeOptions {
    /// Options with every repair and transform disabled.
    pub fn none() -> Self {
        Self {
            remove_degenerate: false,
            fill_holes: false,
            fix_normals: false,
            make_watertight: false,
            center_mesh: false,
            ..Default::default()
        }
    }

    /// Pick the scaling operation: a target size with at least one axis wins,
    /// then a uniform factor, then bed fitting.
    pub fn scale_request(&self) -> Option<ScaleRequest> {
        if let Some(target) = self.target_size.filter(|t| !t.is_empty()) {
            Some(ScaleRequest::Target(target))
        } else if let Some(factor) = self.uniform_scale {
            Some(ScaleRequest::Uniform(factor))
        } else {
            self.print_bed_size.map(ScaleRequest::FitBed)
        }
    }

    /// Parse options from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse options from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load options from a `.json` or `.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| MeshError::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => {
                Self::from_json(&contents).map_err(|e| MeshError::parse_error(path, e.to_string()))
            }
            Some("toml") => {
                Self::from_toml(&contents).map_err(|e| MeshError::parse_error(path, e.to_string()))
            }
            other => Err(MeshError::UnsupportedFormat {
                extension: other.map(String::from),
            }),
        }
    }
}
