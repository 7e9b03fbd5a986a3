//! mesh optimize command - repair, scale and center a mesh.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use mesh_optimize::{
    AnalysisReport, BedSize, Mesh, MeshFormat, OptimizeOptions, Optimizer, TargetSize,
    save_mesh_as,
};
use serde::Serialize;
use tracing::debug;

use crate::{Cli, OutputFormat, output};

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Input mesh file (stl, obj or glb)
    pub input: PathBuf,

    /// Output file path (format from extension, else the config's output_format)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Options file (.toml or .json); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip hole filling
    #[arg(long)]
    pub no_fill_holes: bool,

    /// Skip winding repair
    #[arg(long)]
    pub no_fix_normals: bool,

    /// Skip the watertight pass and inside-out correction
    #[arg(long)]
    pub no_watertight: bool,

    /// Leave the mesh where it is instead of centering it on the ground plane
    #[arg(long)]
    pub no_center: bool,

    /// Target width in mm (X)
    #[arg(long)]
    pub target_width: Option<f64>,

    /// Target height in mm (Y)
    #[arg(long)]
    pub target_height: Option<f64>,

    /// Target depth in mm (Z)
    #[arg(long)]
    pub target_depth: Option<f64>,

    /// Uniform scale factor
    #[arg(long)]
    pub scale: Option<f64>,

    /// Print bed size in mm; the mesh is shrunk to fit if needed
    #[arg(long, num_args = 3, value_names = ["W", "H", "D"])]
    pub bed: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct OptimizeOutput<'a> {
    success: bool,
    input: String,
    output: String,
    original: &'a AnalysisReport,
    optimized: &'a AnalysisReport,
    operations: &'a [String],
    warnings: &'a [String],
    output_format: MeshFormat,
}

pub fn run(args: &OptimizeArgs, cli: &Cli) -> Result<()> {
    let options = build_options(args)?;
    let format = MeshFormat::from_path(&args.output).unwrap_or(options.output_format);
    debug!(output = ?args.output, %format, "Resolved output format");

    let mesh = Mesh::load(&args.input)
        .with_context(|| format!("Failed to load mesh from {:?}", args.input))?;

    let result = Optimizer::new(options).optimize(mesh)?;

    save_mesh_as(&result.mesh, &args.output, format)
        .with_context(|| format!("Failed to save mesh to {:?}", args.output))?;

    match cli.format {
        OutputFormat::Json => {
            let envelope = OptimizeOutput {
                success: true,
                input: args.input.display().to_string(),
                output: args.output.display().to_string(),
                original: &result.original,
                optimized: &result.optimized,
                operations: &result.operations,
                warnings: &result.warnings,
                output_format: format,
            };
            output::print(&envelope, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Optimization Results".bold().underline());
                println!("  {}: {}", "Input".cyan(), args.input.display());
                println!(
                    "  {}: {} ({})",
                    "Output".cyan(),
                    args.output.display(),
                    format
                );
                println!(
                    "  {}: {} -> {}",
                    "Faces".cyan(),
                    result.original.stats.face_count,
                    result.optimized.stats.face_count
                );
                println!(
                    "  {}: {} -> {}",
                    "Printability".cyan(),
                    output::score(result.original.printability_score),
                    output::score(result.optimized.printability_score)
                );

                if result.operations.is_empty() {
                    println!("  {}: none", "Operations".cyan());
                } else {
                    println!("  {}:", "Operations".cyan());
                    for op in &result.operations {
                        println!("    - {}", op);
                    }
                }
                println!();
            }

            for warning in &result.warnings {
                output::warning(warning, cli.format, cli.quiet);
            }
            output::success(
                &format!("Saved optimized mesh to {}", args.output.display()),
                cli.format,
                cli.quiet,
            );
        }
    }

    Ok(())
}

/// Start from the config file (or defaults) and apply command-line overrides.
fn build_options(args: &OptimizeArgs) -> Result<OptimizeOptions> {
    let mut options = match &args.config {
        Some(path) => OptimizeOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {:?}", path))?,
        None => OptimizeOptions::default(),
    };

    if args.no_fill_holes {
        options.fill_holes = false;
    }
    if args.no_fix_normals {
        options.fix_normals = false;
    }
    if args.no_watertight {
        options.make_watertight = false;
    }
    if args.no_center {
        options.center_mesh = false;
    }

    let target = TargetSize {
        width: args.target_width,
        height: args.target_height,
        depth: args.target_depth,
    };
    if !target.is_empty() {
        options.target_size = Some(target);
    }
    if let Some(factor) = args.scale {
        options.uniform_scale = Some(factor);
    }
    if let Some(bed) = &args.bed {
        let &[width, height, depth] = bed.as_slice() else {
            bail!("--bed takes exactly three values, got {}", bed.len());
        };
        options.print_bed_size = Some(BedSize::new(width, height, depth));
    }

    Ok(options)
}
