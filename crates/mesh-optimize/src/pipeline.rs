//! The optimization pipeline.
//!
//! A fixed, best-effort sequence over one owned [`Mesh`]:
//!
//! 1. validate input (fatal on malformed geometry)
//! 2. analyze (the "original" report)
//! 3. remove degenerate faces
//! 4. fill holes
//! 5. fix normals
//! 6. watertight pass (fix normals, fill holes again, fix inversion)
//! 7. scale (target size, else uniform, else fit to bed)
//! 8. center and ground
//! 9. analyze (the "optimized" report)
//!
//! Every step from 3 on runs against a snapshot: if it returns an error the
//! mesh is restored to its pre-step state, the error becomes a warning and the
//! next step runs.

use serde::Serialize;
use tracing::info;

use crate::Mesh;
use crate::error::MeshResult;
use crate::holes::HoleFillReport;
use crate::io::MeshFormat;
use crate::options::{OptimizeOptions, ScaleRequest};
use crate::repair::{NativeBackend, RepairBackend};
use crate::report::{AnalysisReport, build_report};
use crate::tracing_ext::{OperationTimer, StepOutcome, log_mesh_stats, log_step_outcome};
use crate::transform::{BED_MARGIN, center_mesh, fit_to_bed, scale_to_target, uniform_scale};

/// Centering offsets at or below this length count as "already centered".
const CENTER_TOLERANCE_MM: f64 = 1e-9;

/// Ordered record of what the pipeline did, plus non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationLog {
    pub operations: Vec<String>,
    pub warnings: Vec<String>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation entry.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.operations.push(entry.into());
    }

    /// Append a warning. Repeats are kept so the log reads in pipeline order.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Whether an operation with this name (ignoring any `:<param>`) ran.
    pub fn contains(&self, name: &str) -> bool {
        self.operations
            .iter()
            .any(|op| op.split(':').next() == Some(name))
    }
}

/// Everything an optimize call returns.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResult {
    /// The repaired and transformed mesh.
    #[serde(skip)]
    pub mesh: Mesh,
    pub original: AnalysisReport,
    pub optimized: AnalysisReport,
    pub operations: Vec<String>,
    pub warnings: Vec<String>,
    pub output_format: MeshFormat,
}

/// Runs analysis and the repair/transform sequence with a given backend.
#[derive(Debug, Clone)]
pub struct Optimizer<B: RepairBackend = NativeBackend> {
    options: OptimizeOptions,
    backend: B,
}

impl Optimizer<NativeBackend> {
    /// Optimizer using the built-in geometry backend.
    pub fn new(options: OptimizeOptions) -> Self {
        Self::with_backend(options, NativeBackend)
    }
}

impl Default for Optimizer<NativeBackend> {
    fn default() -> Self {
        Self::new(OptimizeOptions::default())
    }
}

impl<B: RepairBackend> Optimizer<B> {
    /// Optimizer routing every repair through `backend`.
    pub fn with_backend(options: OptimizeOptions, backend: B) -> Self {
        Self { options, backend }
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate and analyze a mesh without changing it.
    pub fn analyze(&self, mesh: &Mesh) -> MeshResult<AnalysisReport> {
        mesh.check_geometry()?;
        let _timer = OperationTimer::with_context("analyze", mesh);
        Ok(build_report(mesh))
    }

    /// Run the full pipeline on an owned mesh.
    ///
    /// Fails only if the input geometry is malformed; every later problem is
    /// reported in [`OptimizeResult::warnings`].
    pub fn optimize(&self, mut mesh: Mesh) -> MeshResult<OptimizeResult> {
        mesh.check_geometry()?;

        let _timer = OperationTimer::with_context("optimize", &mesh);
        info!(backend = self.backend.name(), "Starting optimization");
        log_mesh_stats(&mesh, "input");

        let original = build_report(&mesh);
        let mut log = OperationLog::new();

        self.repair(&mut mesh, &mut log);
        self.transform(&mut mesh, &mut log);

        log_mesh_stats(&mesh, "output");
        let optimized = build_report(&mesh);

        info!(
            operations = log.operations.len(),
            warnings = log.warnings.len(),
            score_before = original.printability_score,
            score_after = optimized.printability_score,
            "Optimization complete"
        );

        Ok(OptimizeResult {
            mesh,
            original,
            optimized,
            operations: log.operations,
            warnings: log.warnings,
            output_format: self.options.output_format,
        })
    }

    fn repair(&self, mesh: &mut Mesh, log: &mut OperationLog) {
        let opts = &self.options;
        let backend = &self.backend;

        if opts.remove_degenerate {
            if let Some(removed) = run_step("remove_degenerate_faces", mesh, log, |m| {
                backend.remove_degenerate_faces(m)
            }) {
                record_count(log, "remove_degenerate_faces", removed);
            }
        } else {
            log_step_outcome("remove_degenerate_faces", StepOutcome::Skipped);
        }

        if opts.fill_holes {
            if let Some(report) = run_step("fill_holes", mesh, log, |m| {
                backend.fill_holes(m, opts.hole_fill, opts.max_hole_edges)
            }) {
                record_fill(log, &report, opts.max_hole_edges);
            }
        } else {
            log_step_outcome("fill_holes", StepOutcome::Skipped);
        }

        if opts.fix_normals {
            if let Some(flipped) = run_step("fix_normals", mesh, log, |m| backend.fix_normals(m)) {
                record_count(log, "fix_normals", flipped);
            }
        } else {
            log_step_outcome("fix_normals", StepOutcome::Skipped);
        }

        if !opts.make_watertight {
            log_step_outcome("make_watertight", StepOutcome::Skipped);
            return;
        }

        if mesh.is_watertight() {
            log_step_outcome("make_watertight", StepOutcome::Unchanged);
        } else if let Some(report) = run_step("make_watertight", mesh, log, |m| {
            backend.fix_normals(m)?;
            backend.fill_holes(m, opts.hole_fill, opts.max_hole_edges)
        }) {
            record_fill_warnings(log, &report, opts.max_hole_edges);
            if mesh.is_watertight() {
                log.record("make_watertight");
                log_step_outcome("make_watertight", StepOutcome::Applied("make_watertight"));
            } else {
                log.warn("Could not make mesh fully watertight");
                log_step_outcome(
                    "make_watertight",
                    StepOutcome::Failed("Could not make mesh fully watertight"),
                );
            }
        }

        if mesh.is_watertight() {
            if let Some(true) = run_step("fix_inversion", mesh, log, |m| backend.fix_inversion(m)) {
                log.record("fix_inversion");
                log_step_outcome("fix_inversion", StepOutcome::Applied("fix_inversion"));
            }
        }
    }

    fn transform(&self, mesh: &mut Mesh, log: &mut OperationLog) {
        match self.options.scale_request() {
            Some(ScaleRequest::Target(target)) => {
                if let Some(Some(factor)) =
                    run_step("scale_to_target", mesh, log, |m| scale_to_target(m, &target))
                {
                    record_factor(log, "scale_to_target", factor);
                }
            }
            Some(ScaleRequest::Uniform(factor)) => {
                if run_step("uniform_scale", mesh, log, |m| uniform_scale(m, factor)).is_some() {
                    record_factor(log, "uniform_scale", factor);
                }
            }
            Some(ScaleRequest::FitBed(bed)) => {
                match run_step("fit_to_bed", mesh, log, |m| fit_to_bed(m, &bed, BED_MARGIN)) {
                    Some(Some(factor)) => record_factor(log, "fit_to_bed", factor),
                    Some(None) => log_step_outcome("fit_to_bed", StepOutcome::Unchanged),
                    None => {}
                }
            }
            None => log_step_outcome("scale", StepOutcome::Skipped),
        }

        if self.options.center_mesh {
            let mode = self.options.center_mode;
            if let Some(offset) = run_step("center_and_ground", mesh, log, |m| {
                Ok(center_mesh(m, mode))
            }) {
                if offset.norm() > CENTER_TOLERANCE_MM {
                    log.record("center_and_ground");
                    log_step_outcome("center_and_ground", StepOutcome::Applied("center_and_ground"));
                } else {
                    log_step_outcome("center_and_ground", StepOutcome::Unchanged);
                }
            }
        } else {
            log_step_outcome("center_and_ground", StepOutcome::Skipped);
        }
    }
}

/// Run one step against a snapshot; on error restore the mesh and turn the
/// error into a warning.
fn run_step<T>(
    name: &'static str,
    mesh: &mut Mesh,
    log: &mut OperationLog,
    step: impl FnOnce(&mut Mesh) -> MeshResult<T>,
) -> Option<T> {
    let timer = OperationTimer::with_context(name, mesh);
    let snapshot = mesh.clone();

    match timer.span().in_scope(|| step(mesh)) {
        Ok(value) => Some(value),
        Err(e) => {
            *mesh = snapshot;
            let warning = format!("{} failed: {}", name, e);
            log_step_outcome(name, StepOutcome::Failed(&warning));
            log.warn(warning);
            None
        }
    }
}

fn record_count(log: &mut OperationLog, name: &str, count: usize) {
    if count > 0 {
        let entry = format!("{}:{}", name, count);
        log_step_outcome(name, StepOutcome::Applied(&entry));
        log.record(entry);
    } else {
        log_step_outcome(name, StepOutcome::Unchanged);
    }
}

fn record_factor(log: &mut OperationLog, name: &str, factor: f64) {
    let entry = format!("{}:{:.3}", name, factor);
    log_step_outcome(name, StepOutcome::Applied(&entry));
    log.record(entry);
}

fn record_fill(log: &mut OperationLog, report: &HoleFillReport, max_hole_edges: usize) {
    record_count(log, "fill_holes", report.holes_filled);
    record_fill_warnings(log, report, max_hole_edges);
}

fn record_fill_warnings(log: &mut OperationLog, report: &HoleFillReport, max_hole_edges: usize) {
    for edges in &report.skipped_holes {
        log.warn(format!(
            "Skipped hole with {} edges (max {})",
            edges, max_hole_edges
        ));
    }
    if report.open_chains > 0 {
        log.warn(format!(
            "{} boundary chain(s) could not be closed and were left open",
            report.open_chains
        ));
    }
}
