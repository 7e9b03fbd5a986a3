//! mesh analyze command - report printability without changing the mesh.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_optimize::{AnalysisReport, Mesh, Optimizer};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct AnalyzeResult<'a> {
    path: String,
    #[serde(flatten)]
    report: &'a AnalysisReport,
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let report = Optimizer::default().analyze(&mesh)?;

    match cli.format {
        OutputFormat::Json => {
            let result = AnalyzeResult {
                path: input.display().to_string(),
                report: &report,
            };
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                print_report(input, &report);
            }
        }
    }

    Ok(())
}

fn print_report(input: &Path, report: &AnalysisReport) {
    let stats = &report.stats;
    let bb = &stats.bounding_box;

    println!("{}", "Mesh Analysis".bold().underline());
    println!("  {}: {}", "File".cyan(), input.display());
    println!("  {}: {}", "Vertices".cyan(), stats.vertex_count);
    println!("  {}: {}", "Faces".cyan(), stats.face_count);
    println!(
        "  {}: {:.2} x {:.2} x {:.2} mm",
        "Dimensions".cyan(),
        bb.width,
        bb.height,
        bb.depth
    );
    match stats.volume {
        Some(vol) => println!("  {}: {:.2} mm³", "Volume".cyan(), vol),
        None => println!("  {}: n/a", "Volume".cyan()),
    }
    println!(
        "  {}: {}",
        "Watertight".cyan(),
        if stats.is_watertight {
            "yes".green()
        } else {
            "no".red()
        }
    );
    if report.hole_count > 0 {
        println!("  {}: {}", "Holes".cyan(), report.hole_count);
    }
    if report.non_manifold_edge_count > 0 {
        println!(
            "  {}: {}",
            "Non-manifold edges".cyan(),
            report.non_manifold_edge_count
        );
    }
    println!(
        "  {}: {}",
        "Printability".cyan(),
        output::score(report.printability_score)
    );

    if report.issues.is_empty() {
        println!();
        println!("{} No issues found", "✓".green().bold());
        return;
    }

    println!();
    println!("{}", "Issues".bold());
    for (issue, recommendation) in report.issues.iter().zip(&report.recommendations) {
        println!("  {} {}", "•".yellow(), issue);
        println!("    {}", recommendation.dimmed());
    }
}
