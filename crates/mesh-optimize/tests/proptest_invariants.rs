//! Property-based tests for analysis, repair and transform invariants.
//!
//! Run with: cargo test -p mesh-optimize -- proptest

use mesh_optimize::{
    BED_MARGIN, BedSize, Issue, IssueKind, Mesh, OptimizeOptions, Optimizer, TargetSize, Vertex,
    analyze, fit_to_bed, fix_inversion, fix_normals, printability_score, scale_to_target,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_vertex() -> impl Strategy<Value = Vertex> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Vertex::from_coords(x, y, z))
}

/// Random triangle soup with in-range indices.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = Mesh> {
    prop::collection::vec(arb_vertex(), 3..=max_vertices).prop_flat_map(move |verts| {
        let n = verts.len() as u32;
        prop::collection::vec(prop::array::uniform3(0..n), 1..=max_faces).prop_map(
            move |faces| Mesh {
                vertices: verts.clone(),
                faces,
            },
        )
    })
}

fn arb_issue_kind() -> impl Strategy<Value = IssueKind> {
    prop_oneof![
        Just(IssueKind::NotWatertight),
        Just(IssueKind::DegenerateFaces),
        Just(IssueKind::HighFaceCount),
        Just(IssueKind::LowFaceCount),
        Just(IssueKind::InvertedNormals),
        Just(IssueKind::TooLarge),
        Just(IssueKind::TooSmall),
        Just(IssueKind::TooThin),
    ]
}

/// Closed UV sphere, outward wound.
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

// =============================================================================
// Score
// =============================================================================

proptest! {
    #[test]
    fn proptest_score_is_clamped(kinds in prop::collection::vec(arb_issue_kind(), 0..12)) {
        let issues: Vec<Issue> = kinds
            .into_iter()
            .map(|kind| Issue {
                kind,
                message: String::new(),
                recommendation: String::new(),
            })
            .collect();
        let score = printability_score(&issues);
        prop_assert!((1..=5).contains(&score));
    }

    #[test]
    fn proptest_analysis_never_panics(mesh in arb_mesh(20, 30)) {
        let report = analyze(&mesh).unwrap();
        prop_assert!((1..=5).contains(&report.printability_score));
        prop_assert_eq!(report.issues.len(), report.recommendations.len());
        prop_assert_eq!(report.issues.len(), report.issue_kinds.len());
        prop_assert_eq!(report.stats.face_count, mesh.face_count());
    }

    #[test]
    fn proptest_optimize_never_fails_on_valid_input(mesh in arb_mesh(12, 16)) {
        let result = Optimizer::new(OptimizeOptions::default()).optimize(mesh);
        prop_assert!(result.is_ok());
        let result = result.unwrap();
        prop_assert!((1..=5).contains(&result.optimized.printability_score));

        prop_assert!(result.warnings.iter().all(|w| !w.is_empty()));
        prop_assert!(result.operations.iter().all(|op| !op.contains(' ')));
    }
}

// =============================================================================
// Transforms
// =============================================================================

proptest! {
    #[test]
    fn proptest_fit_to_bed_never_enlarges(
        mesh in arb_mesh(8, 10),
        bed in prop::array::uniform3(1.0..500.0f64),
    ) {
        let mut mesh = mesh;
        let before = mesh.extents();
        prop_assume!(before.iter().all(|&e| e > 1e-6));

        let bed = BedSize::new(bed[0], bed[1], bed[2]);
        let factor = fit_to_bed(&mut mesh, &bed, BED_MARGIN).unwrap();
        let after = mesh.extents();

        for axis in 0..3 {
            prop_assert!(after[axis] <= before[axis] * (1.0 + 1e-9));
        }
        if let Some(factor) = factor {
            prop_assert!(factor < 1.0);
            prop_assert!(after.x <= bed.width * BED_MARGIN * (1.0 + 1e-9));
            prop_assert!(after.y <= bed.height * BED_MARGIN * (1.0 + 1e-9));
            prop_assert!(after.z <= bed.depth * BED_MARGIN * (1.0 + 1e-9));
        } else {
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn proptest_scale_to_target_hits_tightest_axis(
        mesh in arb_mesh(8, 10),
        width in 1.0..500.0f64,
        depth in 1.0..500.0f64,
    ) {
        let mut mesh = mesh;
        let before = mesh.extents();
        prop_assume!(before.iter().all(|&e| e > 1e-3));

        let target = TargetSize {
            width: Some(width),
            height: None,
            depth: Some(depth),
        };
        let factor = scale_to_target(&mut mesh, &target).unwrap().unwrap();
        let after = mesh.extents();

        let expected = (width / before.x).min(depth / before.z);
        prop_assert!((factor - expected).abs() <= expected * 1e-12);
        prop_assert!(after.x <= width * (1.0 + 1e-9));
        prop_assert!(after.z <= depth * (1.0 + 1e-9));
        // One of the requested axes lands exactly on target
        let hit_width = (after.x - width).abs() <= width * 1e-9;
        let hit_depth = (after.z - depth).abs() <= depth * 1e-9;
        prop_assert!(hit_width || hit_depth);
        // Aspect ratio preserved
        prop_assert!((after.y / after.x - before.y / before.x).abs() <= 1e-6 * (before.y / before.x));
    }
}

// =============================================================================
// Winding
// =============================================================================

proptest! {
    #[test]
    fn proptest_fix_normals_restores_flipped_sphere(
        flips in prop::collection::vec(any::<bool>(), 224),
    ) {
        let mut mesh = uv_sphere(20.0, 8, 16);
        for (face_idx, &flip) in flips.iter().enumerate() {
            if flip {
                mesh.flip_face(face_idx);
            }
        }

        fix_normals(&mut mesh).unwrap();
        prop_assert!(mesh.is_watertight());
        prop_assert_eq!(fix_normals(&mut mesh).unwrap(), 0);

        fix_inversion(&mut mesh);
        prop_assert!(mesh.signed_volume() > 0.0);
        prop_assert!(!fix_inversion(&mut mesh));
    }
}

proptest! {
    #[test]
    fn proptest_fix_normals_is_idempotent_on_soup(mesh in arb_mesh(8, 24)) {
        let mut mesh = mesh;
        mesh.faces.retain(|f| f[0] != f[1] && f[1] != f[2] && f[2] != f[0]);

        fix_normals(&mut mesh).unwrap();
        let once = mesh.faces.clone();
        prop_assert_eq!(fix_normals(&mut mesh).unwrap(), 0);
        prop_assert_eq!(mesh.faces, once);
    }

    #[test]
    fn proptest_fix_normals_is_idempotent_with_collapsed_faces(mesh in arb_mesh(6, 20)) {
        let mut mesh = mesh;
        fix_normals(&mut mesh).unwrap();
        let once = mesh.faces.clone();
        prop_assert_eq!(fix_normals(&mut mesh).unwrap(), 0);
        prop_assert_eq!(mesh.faces, once);
    }
}
