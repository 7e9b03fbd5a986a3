//! Tracing extensions for mesh operations.
//!
//! Structured logging and timing for the optimization pipeline. Events are
//! emitted under three targets:
//!
//! - `mesh_optimize::timing`: per-step spans and elapsed time
//! - `mesh_optimize::mesh_state`: vertex/face counts and dimensions
//! - `mesh_optimize::pipeline`: what each step did
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=mesh_optimize=debug for detailed output
//! ```

use std::time::Instant;
use tracing::{Span, debug, info, warn};

use crate::Mesh;

/// A performance timer that logs duration on drop.
///
/// ```rust,ignore
/// let timer = OperationTimer::with_context("fill_holes", &mesh);
/// timer.span().in_scope(|| fill_holes(&mut mesh));
/// // elapsed time is logged when `timer` drops
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("mesh_operation", operation = name);
        debug!(target: "mesh_optimize::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer that records the mesh size in its span.
    pub fn with_context(name: &'static str, mesh: &Mesh) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count()
        );
        debug!(
            target: "mesh_optimize::timing",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Get the span for this timer.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "mesh_optimize::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log mesh statistics at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let dims = mesh.extents();

    debug!(
        target: "mesh_optimize::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// What a single pipeline step ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome<'a> {
    /// The step changed the mesh; carries the operation log entry.
    Applied(&'a str),
    /// The step ran and found nothing to do.
    Unchanged,
    /// The step was disabled or not applicable.
    Skipped,
    /// The step failed and the mesh was restored; carries the warning.
    Failed(&'a str),
}

/// Log the outcome of one pipeline step.
pub fn log_step_outcome(step: &str, outcome: StepOutcome<'_>) {
    match outcome {
        StepOutcome::Applied(entry) => info!(
            target: "mesh_optimize::pipeline",
            step = step,
            entry = entry,
            "Step applied"
        ),
        StepOutcome::Unchanged => debug!(
            target: "mesh_optimize::pipeline",
            step = step,
            "Step made no changes"
        ),
        StepOutcome::Skipped => debug!(
            target: "mesh_optimize::pipeline",
            step = step,
            "Step skipped"
        ),
        StepOutcome::Failed(warning) => warn!(
            target: "mesh_optimize::pipeline",
            step = step,
            warning = warning,
            "Step failed, mesh restored"
        ),
    }
}
