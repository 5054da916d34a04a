use approx::assert_relative_eq;
use requant_engine::{
    Diagnostic, FileFormat, InferenceKind, PassKind, PolicyFlags, Region, plan_conversion,
};
use requant_ir::{ArrayDescriptor, ElementKind, GraphView, OperatorKind, OperatorRecord};

fn flags() -> PolicyFlags {
    PolicyFlags {
        input_format: FileFormat::TrainingGraph,
        output_format: FileFormat::MobileBinary,
        ..Default::default()
    }
}

/// One fake-quant marker between two float arrays, followed by an add.
fn marker_graph() -> GraphView {
    GraphView::new(
        vec![
            ArrayDescriptor::float("input").with_range(-1.0, 1.0).as_input(),
            ArrayDescriptor::float("quantized").with_range(-1.0, 1.0),
            ArrayDescriptor::float("output").with_range(-2.0, 2.0),
        ],
        vec![
            OperatorRecord::simple(
                "fq",
                OperatorKind::FakeQuant,
                vec!["input".into()],
                vec!["quantized".into()],
            ),
            OperatorRecord::simple(
                "add",
                OperatorKind::Add,
                vec!["quantized".into()],
                vec!["output".into()],
            ),
        ],
    )
}

#[test]
fn quantized_conversion_end_to_end() {
    let job = plan_conversion(
        PolicyFlags {
            inference_type: Some(InferenceKind::QuantizedUint8),
            ..flags()
        },
        &marker_graph(),
        &PassKind::default_candidates(),
    )
    .unwrap();

    assert!(job.resolution.is_complete());
    assert_eq!(job.resolution.decisions.len(), 3);

    let input = &job.resolution.decisions[0];
    assert_eq!(input.array, "input");
    assert_eq!(input.kind, ElementKind::QuantUint8);
    let params = input.params.unwrap();
    assert_relative_eq!(params.scale, 2.0 / 255.0, max_relative = 1e-12);
    assert_eq!(params.zero_point, 128);

    // The marker stays; its boundary is hard.
    assert!(!job.boundaries.is_empty());
    assert!(!job.plan.contains(&PassKind::MarkerRemoval));
}

#[test]
fn drop_fake_quant_clears_boundaries_and_schedules_removal() {
    let job = plan_conversion(
        PolicyFlags {
            drop_fake_quant: true,
            ..flags()
        },
        &marker_graph(),
        &PassKind::default_candidates(),
    )
    .unwrap();

    assert!(job.boundaries.is_empty());
    assert!(job.plan.contains(&PassKind::MarkerRemoval));
}

#[test]
fn hard_boundary_blocks_crossing_passes() {
    let mut candidates = PassKind::default_candidates();
    candidates.push(PassKind::Rewrite {
        name: "reorder-activations".into(),
        crosses_markers: true,
    });

    let job = plan_conversion(flags(), &marker_graph(), &candidates).unwrap();

    for step in &job.plan.steps {
        if step.kind.crosses_markers() {
            match &step.region {
                Region::Excluding(edges) => {
                    assert!(edges.iter().any(|edge| edge.0 == "quantized"));
                }
                Region::WholeGraph => panic!("crossing pass scheduled over a hard boundary"),
            }
        }
    }
}

#[test]
fn soft_boundary_crossing_surfaces_a_warning() {
    let mut candidates = PassKind::default_candidates();
    candidates.push(PassKind::Rewrite {
        name: "reorder-activations".into(),
        crosses_markers: true,
    });

    let job = plan_conversion(
        PolicyFlags {
            relax_quant_boundary: true,
            ..flags()
        },
        &marker_graph(),
        &candidates,
    )
    .unwrap();

    let warned = job.diagnostics.iter().any(|diag| {
        matches!(diag, Diagnostic::SoftBoundaryCrossed { pass, .. } if pass == "reorder-activations")
    });
    assert!(warned, "soft crossing must never be silent");

    // And the crossing pass is not restricted.
    let step = job
        .plan
        .steps
        .iter()
        .find(|step| step.kind.crosses_markers())
        .unwrap();
    assert_eq!(step.region, Region::WholeGraph);
}

#[test]
fn disable_recurrent_fusion_removes_the_pass() {
    let job = plan_conversion(
        PolicyFlags {
            disable_recurrent_fusion: true,
            ..flags()
        },
        &marker_graph(),
        &PassKind::default_candidates(),
    )
    .unwrap();

    assert!(!job.plan.contains(&PassKind::RecurrentFusion));
}

#[test]
fn per_array_failures_reported_as_diagnostics() {
    let graph = GraphView::new(
        vec![
            ArrayDescriptor::float("measured").with_range(0.0, 6.0),
            ArrayDescriptor::float("unmeasured"),
        ],
        vec![],
    );

    let job = plan_conversion(
        PolicyFlags {
            inference_type: Some(InferenceKind::QuantizedUint8),
            ..flags()
        },
        &graph,
        &PassKind::default_candidates(),
    )
    .unwrap();

    assert_eq!(job.resolution.decisions.len(), 1);
    assert_eq!(job.resolution.failures.len(), 1);
    assert_eq!(job.diagnostics, vec![Diagnostic::QuantizationInfeasible {
        array: "unmeasured".into()
    }]);
}

#[test]
fn default_range_unblocks_unmeasured_arrays() {
    let graph = GraphView::new(vec![ArrayDescriptor::float("unmeasured")], vec![]);

    let job = plan_conversion(
        PolicyFlags {
            inference_type: Some(InferenceKind::QuantizedUint8),
            default_range_min: Some(0.0),
            default_range_max: Some(6.0),
            ..flags()
        },
        &graph,
        &PassKind::default_candidates(),
    )
    .unwrap();

    assert!(job.resolution.is_complete());
    let decision = &job.resolution.decisions[0];
    assert_eq!(
        decision.range_origin,
        Some(requant_engine::RangeOrigin::Synthetic)
    );
}

#[test]
fn flags_deserialize_from_json() {
    let flags: PolicyFlags = serde_json::from_str(
        r#"{
            "input_format": "TrainingGraph",
            "output_format": "MobileBinary",
            "inference_type": "QuantizedUint8",
            "drop_fake_quant": true
        }"#,
    )
    .unwrap();

    assert_eq!(flags.input_format, FileFormat::TrainingGraph);
    assert_eq!(flags.inference_type, Some(InferenceKind::QuantizedUint8));
    assert!(flags.drop_fake_quant);
    assert!(!flags.relax_quant_boundary);
}
