//! Scaling and placement of a mesh in the build volume.
//!
//! Axes follow the print convention: width is X, height is Y, depth is Z, and
//! Z is vertical, so "grounding" means moving the lowest Z to zero.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Mesh;
use crate::error::{MeshError, MeshResult};

/// Fraction of the bed that a fitted mesh may occupy on each axis.
pub const BED_MARGIN: f64 = 0.95;

const AXIS_NAMES: [&str; 3] = ["width", "height", "depth"];

/// Which point is moved to the origin when centering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterMode {
    /// The mesh centroid (volumetric for closed meshes).
    #[default]
    Centroid,
    /// The center of the bounding box.
    BoundsCenter,
}

/// Desired size in millimeters; unspecified axes follow the uniform factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSize {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

impl TargetSize {
    /// Target with only the width given.
    pub fn width(width: f64) -> Self {
        Self {
            width: Some(width),
            ..Default::default()
        }
    }

    /// True when no axis is specified.
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.depth.is_none()
    }

    fn axes(&self) -> [Option<f64>; 3] {
        [self.width, self.height, self.depth]
    }
}

/// Printer build volume in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BedSize {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BedSize {
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    fn axes(&self) -> [f64; 3] {
        [self.width, self.height, self.depth]
    }
}

fn check_positive(name: &'static str, value: f64) -> MeshResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MeshError::InvalidParameter { name, value })
    }
}

fn check_extent(axis: usize, extent: f64) -> MeshResult<f64> {
    if extent > 0.0 {
        Ok(extent)
    } else {
        Err(MeshError::DegenerateExtent {
            axis: AXIS_NAMES[axis],
            extent,
        })
    }
}

/// Move the chosen center to the origin, then lift the mesh so its lowest
/// point rests on Z = 0.
///
/// Returns the total translation applied.
pub fn center_mesh(mesh: &mut Mesh, mode: CenterMode) -> Vector3<f64> {
    if mesh.vertices.is_empty() {
        return Vector3::zeros();
    }

    let center = match mode {
        CenterMode::Centroid => mesh.centroid(),
        CenterMode::BoundsCenter => mesh.bounds_center(),
    };
    let mut offset = -center.coords;
    mesh.translate(offset);

    if let Some((min, _)) = mesh.bounds() {
        let lift = Vector3::new(0.0, 0.0, -min.z);
        mesh.translate(lift);
        offset += lift;
    }

    debug!(
        "Centered mesh: offset ({:.3}, {:.3}, {:.3})",
        offset.x, offset.y, offset.z
    );
    offset
}

/// Scale uniformly so that every specified axis reaches at most its target.
///
/// The factor is the smallest `target / extent` among the given axes, so the
/// aspect ratio is preserved. Returns `None` when no axis is specified.
pub fn scale_to_target(mesh: &mut Mesh, target: &TargetSize) -> MeshResult<Option<f64>> {
    let extents = mesh.extents();
    let mut factor: Option<f64> = None;

    for (axis, wanted) in target.axes().into_iter().enumerate() {
        let Some(wanted) = wanted else {
            continue;
        };
        let wanted = check_positive(AXIS_NAMES[axis], wanted)?;
        let ratio = wanted / check_extent(axis, extents[axis])?;
        factor = Some(factor.map_or(ratio, |f: f64| f.min(ratio)));
    }

    if let Some(factor) = factor {
        mesh.scale(factor);
        info!(factor, "Scaled to target size");
    }
    Ok(factor)
}

/// Multiply every coordinate by `factor`.
pub fn uniform_scale(mesh: &mut Mesh, factor: f64) -> MeshResult<()> {
    let factor = check_positive("uniform_scale", factor)?;
    mesh.scale(factor);
    info!(factor, "Applied uniform scale");
    Ok(())
}

/// Shrink the mesh to fit inside `bed * margin` on every axis.
///
/// Never scales up: returns `Ok(None)` and leaves the mesh untouched when it
/// already fits.
pub fn fit_to_bed(mesh: &mut Mesh, bed: &BedSize, margin: f64) -> MeshResult<Option<f64>> {
    let margin = check_positive("margin", margin)?;
    let extents = mesh.extents();

    let mut factor = f64::INFINITY;
    for (axis, size) in bed.axes().into_iter().enumerate() {
        let size = check_positive(AXIS_NAMES[axis], size)?;
        let ratio = size * margin / check_extent(axis, extents[axis])?;
        factor = factor.min(ratio);
    }

    if factor < 1.0 {
        mesh.scale(factor);
        info!(factor, "Scaled down to fit print bed");
        Ok(Some(factor))
    } else {
        debug!("Mesh already fits print bed");
        Ok(None)
    }
}
