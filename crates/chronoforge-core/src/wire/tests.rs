//! Tests for the wire codec.

use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::domains::{Domain, ModelDomains};
use crate::export::to_rust_source;
use crate::model::{
    BoolExpr, CumulExpr, FloatExpr, Func, IntExpr, IntStepFunction, IntervalVar, Model, PrecedenceKind,
    Presence, RefId,
};
use crate::solution::{ObjectiveValue, Solution, SolutionValue};

fn two_tasks() -> (Model, IntervalVar, IntervalVar) {
    let mut m = Model::with_name("two-tasks");
    let a = m.interval_var().length(10).name("a").build().unwrap();
    let b = m.interval_var().length(5).optional().name("b").build().unwrap();
    m.end_before_start(a, b, 0).unwrap();
    let end = m.end_or(b, 0).unwrap();
    m.minimize(end).unwrap();
    (m, a, b)
}

// ============================================================================
// Model records
// ============================================================================

#[test]
fn test_model_record_shape() {
    let (m, _, _) = two_tasks();
    let value = serde_json::to_value(encode_model(&m).unwrap()).unwrap();

    assert_eq!(value["name"], "two-tasks");
    assert_eq!(value["refs"].as_array().unwrap().len(), 3);
    assert_eq!(value["refs"][0]["func"], "intervalVar");
    assert_eq!(value["refs"][0]["lengthMin"], 10);
    assert_eq!(value["refs"][1]["status"], "optional");
    assert_eq!(value["refs"][2]["func"], "endOr");
    assert_eq!(value["refs"][2]["args"], json!([{"ref": 1}, 0]));

    // the precedence is used once, so it is inlined
    assert_eq!(
        value["model"],
        json!([{"arg": {"func": "endBeforeStart", "args": [{"ref": 0}, {"ref": 1}]}}])
    );
    assert_eq!(value["objective"], json!({"sense": "minimize", "expr": {"ref": 2}}));
}

#[test]
fn test_model_round_trip_keeps_ids() {
    let (m, a, b) = two_tasks();
    let wire = encode_model(&m).unwrap();
    let text = serde_json::to_string(&wire).unwrap();
    let back = decode_model(&serde_json::from_str(&text).unwrap()).unwrap();

    assert_eq!(encode_model(&back).unwrap(), wire);
    assert_eq!(back.name(), Some("two-tasks"));
    let a2 = back.interval_var_by_name("a").unwrap();
    let b2 = back.interval_var_by_name("b").unwrap();
    assert_eq!(back.ref_id(a2), m.ref_id(a));
    assert_eq!(back.ref_id(b2), m.ref_id(b));
    assert_eq!(back.top_level().len(), 1);
}

#[test]
fn test_shared_subexpression_is_written_once() {
    let mut m = Model::new();
    let x = m.int_var().range(0, 10).build().unwrap();
    let shared = m.plus(x, 1).unwrap();
    let lo = m.ge(shared, 0).unwrap();
    let hi = m.le(shared, 5).unwrap();
    m.constraint(lo).unwrap();
    m.constraint(hi).unwrap();

    let wire = encode_model(&m).unwrap();
    let funcs: Vec<_> = wire.refs.iter().map(|n| n.func).collect();
    assert_eq!(funcs.iter().filter(|f| **f == Func::IntPlus).count(), 1);
    let text = serde_json::to_string(&wire).unwrap();
    assert_eq!(text.matches("intPlus").count(), 1);
}

#[test]
fn test_decode_rejects_cycle() {
    let wire: WireModel = serde_json::from_value(json!({
        "refs": [
            {"func": "intNeg", "args": [{"ref": 1}]},
            {"func": "intNeg", "args": [{"ref": 0}]}
        ],
        "model": []
    }))
    .unwrap();
    assert!(matches!(decode_model(&wire), Err(WireError::Cycle(_))));
}

#[test]
fn test_decode_rejects_dangling_ref() {
    let wire: WireModel = serde_json::from_value(json!({
        "refs": [],
        "model": [{"ref": 3}]
    }))
    .unwrap();
    assert!(matches!(decode_model(&wire), Err(WireError::DanglingRef(3))));
}

#[test]
fn test_decode_rejects_bad_arity() {
    let wire: WireModel = serde_json::from_value(json!({
        "refs": [{"func": "intNeg"}],
        "model": []
    }))
    .unwrap();
    assert!(matches!(
        decode_model(&wire),
        Err(WireError::Model(ModelError::Arity { .. }))
    ));
}

#[test]
fn test_decode_rejects_unsorted_step_function() {
    let wire: WireModel = serde_json::from_value(json!({
        "refs": [{"func": "intStepFunction", "values": [[5, 1], [2, 0]]}],
        "model": []
    }))
    .unwrap();
    assert!(matches!(
        decode_model(&wire),
        Err(WireError::Model(ModelError::StepFunctionOrder { .. }))
    ));
}

// ============================================================================
// Solutions and events
// ============================================================================

#[test]
fn test_solution_event_maps_ids_back() {
    let (m, a, b) = two_tasks();
    let line = r#"{"msg":"solution","solveTime":0.25,"objective":15,"values":[{"id":0,"value":{"start":0,"end":10}},{"id":1,"value":null}]}"#;
    let EngineMessage::Solution(event) = decode_message(&m, line).unwrap() else {
        panic!("expected a solution");
    };
    assert_eq!(event.solve_time, 0.25);
    assert_eq!(event.solution.get_start(a), Some(0));
    assert_eq!(event.solution.get_end(a), Some(10));
    assert!(event.solution.is_absent(b));
    assert_eq!(event.solution.objective(), ObjectiveValue::Value(15.0));
}

#[test]
fn test_objective_null_differs_from_missing() {
    let (m, _, _) = two_tasks();
    let decode = |line: &str| match decode_message(&m, line).unwrap() {
        EngineMessage::Solution(event) => event.solution.objective(),
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(
        decode(r#"{"msg":"solution","solveTime":1,"objective":null,"values":[]}"#),
        ObjectiveValue::Absent
    );
    assert_eq!(
        decode(r#"{"msg":"solution","solveTime":1,"values":[]}"#),
        ObjectiveValue::Undefined
    );

    let mut s = Solution::new();
    s.set_objective(ObjectiveValue::Absent);
    let value = serde_json::to_value(encode_solution(&m, &s).unwrap()).unwrap();
    assert_eq!(value, json!({"objective": null, "values": []}));

    s.set_objective(ObjectiveValue::Undefined);
    let value = serde_json::to_value(encode_solution(&m, &s).unwrap()).unwrap();
    assert_eq!(value, json!({"values": []}));
}

#[test]
fn test_unknown_id_is_rejected() {
    let (m, _, _) = two_tasks();
    let line = r#"{"msg":"solution","solveTime":1,"values":[{"id":7,"value":1}]}"#;
    assert!(matches!(decode_message(&m, line), Err(WireError::UnknownId(7))));

    // id 2 is the objective expression, not a variable
    let line = r#"{"msg":"solution","solveTime":1,"values":[{"id":2,"value":1}]}"#;
    assert!(matches!(decode_message(&m, line), Err(WireError::UnknownId(2))));
}

#[test]
fn test_invalid_solution_is_an_error() {
    let (m, _, _) = two_tasks();
    let line = r#"{"msg":"solution","solveTime":1,"valid":false,"values":[]}"#;
    assert!(matches!(decode_message(&m, line), Err(WireError::InvalidSolution)));
}

#[test]
fn test_numeric_values_follow_variable_type() {
    let mut m = Model::new();
    let f = m.float_var().range(0.0, 10.0).build().unwrap();
    let b = m.bool_var().build().unwrap();
    let wire: WireSolution =
        serde_json::from_value(json!({"values": [{"id": 0, "value": 3}, {"id": 1, "value": 1}]}))
            .unwrap();
    let solution = decode_solution(&m, &wire).unwrap();
    assert_eq!(solution.value(f), Some(SolutionValue::Float(3.0)));
    assert_eq!(solution.value(b), Some(SolutionValue::Bool(true)));
}

#[test]
fn test_summary_and_lower_bound() {
    let (m, _, _) = two_tasks();
    let line = r#"{"msg":"summary","nbSolutions":2,"duration":1.5,"proof":true,"nbLNSSteps":4,"objectiveSense":"minimize"}"#;
    let message = decode_message(&m, line).unwrap();
    assert!(message.is_terminal());
    let EngineMessage::Summary(summary) = message else {
        panic!("expected a summary");
    };
    assert_eq!(summary.nb_solutions, 2);
    assert_eq!(summary.nb_lns_steps, Some(4));
    assert!(summary.proof);

    let line = r#"{"msg":"lowerBound","solveTime":0.5,"value":12}"#;
    let message = decode_message(&m, line).unwrap();
    assert!(!message.is_terminal());
    assert_eq!(
        message,
        EngineMessage::LowerBound(LowerBoundEvent {
            solve_time: 0.5,
            value: 12.0
        })
    );
}

#[test]
fn test_domains_event() {
    let (m, a, _) = two_tasks();
    let line = r#"{"msg":"domains","duration":0.1,"domains":[{"id":0,"presence":"present","startMin":0,"startMax":5,"endMin":10,"endMax":15}]}"#;
    let EngineMessage::Domains(event) = decode_message(&m, line).unwrap() else {
        panic!("expected domains");
    };
    let domains = event.domains.unwrap();
    assert_eq!(domains.start_range(a), Some((0, 5)));
    assert_eq!(domains.end_range(a), Some((10, 15)));

    let line = r#"{"msg":"domains","duration":0.1,"infeasible":true}"#;
    let EngineMessage::Domains(event) = decode_message(&m, line).unwrap() else {
        panic!("expected domains");
    };
    assert!(event.domains.is_none());
}

#[test]
fn test_events_survive_encoding() {
    let (m, a, b) = two_tasks();
    let mut solution = Solution::new();
    solution.set_interval(a, 0, 10);
    solution.set_interval(b, 10, 15);
    solution.set_objective(ObjectiveValue::Value(15.0));

    let mut domains = ModelDomains::new();
    domains.insert(
        b,
        Domain {
            presence: Some(Presence::Optional),
            length_min: Some(5),
            length_max: Some(5),
            ..Domain::default()
        },
    );

    let messages = [
        EngineMessage::Warning("careful".into()),
        EngineMessage::Solution(SolutionEvent {
            solve_time: 2.0,
            valid: Some(true),
            solution,
        }),
        EngineMessage::Domains(DomainsEvent {
            duration: 0.5,
            domains: Some(domains),
        }),
    ];
    for message in messages {
        let line = encode_event(&m, &message).unwrap();
        assert_eq!(decode_message(&m, &line).unwrap(), message);
    }
}

// ============================================================================
// Commands and documents
// ============================================================================

#[test]
fn test_stop_command_line() {
    assert_eq!(
        stop_command("user").unwrap(),
        r#"{"msg":"stop","reason":"user"}"#
    );
}

#[test]
fn test_solve_command_round_trip() {
    let (m, a, b) = two_tasks();
    let mut warm = Solution::new();
    warm.set_interval(a, 0, 10);
    warm.set_absent(b);
    let parameters = json!({"timeLimit": 10, "nbWorkers": 2});

    let line = solve_command(&m, &parameters, Some(&warm)).unwrap();
    assert!(!line.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["msg"], "solve");
    assert_eq!(value["warmStart"]["values"][1], json!({"id": 1, "value": null}));

    let EngineRequest::Solve {
        model,
        parameters: received,
        warm_start,
    } = decode_command::<serde_json::Value>(&line).unwrap()
    else {
        panic!("expected a solve command");
    };
    assert_eq!(received, parameters);
    assert_eq!(encode_model(&model).unwrap(), encode_model(&m).unwrap());
    let warm_start = warm_start.unwrap();
    let a2 = model.interval_var_by_name("a").unwrap();
    let b2 = model.interval_var_by_name("b").unwrap();
    assert_eq!(warm_start.get_end(a2), Some(10));
    assert!(warm_start.is_absent(b2));
}

#[test]
fn test_solution_command_requires_variables() {
    let (m, a, _) = two_tasks();
    let end = m.objective().unwrap().expr;
    let mut s = Solution::new();
    s.set_interval(a, 0, 10);
    assert!(solution_command(&m, &s).is_ok());

    s.set_value(end, SolutionValue::Int(3));
    assert!(matches!(solution_command(&m, &s), Err(WireError::Malformed(_))));
}

#[test]
fn test_problem_document_round_trip() {
    let (m, a, _) = two_tasks();
    let mut warm = Solution::new();
    warm.set_interval(a, 0, 10);
    let parameters = json!({"timeLimit": 5});

    let text = problem_to_json(&m, Some(&parameters), Some(&warm)).unwrap();
    let problem: Problem<serde_json::Value> = json_to_problem(&text).unwrap();

    assert_eq!(problem.parameters, Some(parameters));
    assert_eq!(encode_model(&problem.model).unwrap(), encode_model(&m).unwrap());
    let a2 = problem.model.interval_var_by_name("a").unwrap();
    assert_eq!(problem.warm_start.unwrap().get_start(a2), Some(0));

    let bare: Problem<serde_json::Value> =
        json_to_problem(&problem_to_json::<()>(&m, None, None).unwrap()).unwrap();
    assert!(bare.parameters.is_none());
    assert!(bare.warm_start.is_none());
}

#[test]
fn test_rust_source_export() {
    let (m, _, _) = two_tasks();
    let source = to_rust_source(&m);
    assert!(source.contains("let mut m = Model::with_name(\"two-tasks\");"));
    assert!(source.contains(
        "let n0 = m.interval_var().length_min(10).length_max(10).name(\"a\").build()?;"
    ));
    assert!(source.contains(".optional().name(\"b\").build()?;"));
    assert!(source.contains("let n2 = m.end_before_start(n0, n1, 0)?;"));
    assert!(source.contains("let n3 = m.end_or(n1, 0_i64)?;"));
    assert!(source.contains("m.minimize(n3)?;"));
    assert!(source.ends_with("    Ok(m)\n}\n"));
}

// ============================================================================
// Property tests
// ============================================================================

/// Handles created so far, one pool per kind.
struct Pools {
    ints: Vec<IntExpr>,
    floats: Vec<FloatExpr>,
    bools: Vec<BoolExpr>,
    intervals: Vec<IntervalVar>,
    cumuls: Vec<CumulExpr>,
    steps: Vec<IntStepFunction>,
}

fn pick<T: Copy>(items: &[T], i: usize) -> T {
    items[i % items.len()]
}

/// Builds a model from random operations covering every operator family.
fn build_model(ops: &[(u8, usize, usize, i64)]) -> Model {
    let mut m = Model::new();
    let first_int = m.int_var().range(-10, 10).build().unwrap();
    let first_float = m.float_var().range(-10.0, 10.0).build().unwrap();
    let first_bool = m.bool_var().build().unwrap();
    let first_iv = m.interval_var().length(5).build().unwrap();
    let first_pulse = m.pulse(first_iv, 1).unwrap();
    let first_step = m.step_function(&[(0, 1), (10, 0)]).unwrap();
    let mut p = Pools {
        ints: vec![first_int.into()],
        floats: vec![first_float.into()],
        bools: vec![first_bool.into()],
        intervals: vec![first_iv],
        cumuls: vec![first_pulse],
        steps: vec![first_step],
    };

    for (i, &(op, a, b, c)) in ops.iter().enumerate() {
        let ia = pick(&p.ints, a);
        let ib = pick(&p.ints, b);
        let fa = pick(&p.floats, a);
        let ba = pick(&p.bools, a);
        let bb = pick(&p.bools, b);
        let va = pick(&p.intervals, a);
        let vb = pick(&p.intervals, b);
        let ca = pick(&p.cumuls, a);
        let cb = pick(&p.cumuls, b);
        let sa = pick(&p.steps, a);
        let k = c.abs();
        match op {
            // integers
            0 => {
                let var = m.int_var().range(c.min(0), c.max(0)).build().unwrap();
                p.ints.push(var.into());
            }
            1 => p.ints.push(m.plus(ia, ib).unwrap()),
            2 => p.ints.push(m.times(ia, c).unwrap()),
            3 => {
                let le = m.le(ia, c).unwrap();
                m.constraint(le).unwrap();
            }
            4 => m.set_node_name(ia, format!("e{i}")).unwrap(),
            5 => {
                let items = [ia, ib];
                let e = match k % 5 {
                    0 => m.sum(items).unwrap(),
                    1 => m.min(items).unwrap(),
                    2 => m.max2(ia, ib).unwrap(),
                    3 => m.abs(ia).unwrap(),
                    _ => m.div(ia, k + 1).unwrap(),
                };
                p.ints.push(e);
            }
            // floats
            6 => {
                let var = m.float_var().range(-(k as f64), k as f64).build().unwrap();
                p.floats.push(var.into());
            }
            7 => p.floats.push(m.float_plus(fa, ia).unwrap()),
            8 => p.floats.push(m.float_times(fa, c as f64 / 2.0).unwrap()),
            9 => p.floats.push(m.float_guard(fa, 1.5).unwrap()),
            10 => p.bools.push(m.in_range(fa, -(k as f64), 3.5).unwrap()),
            // intervals
            11 => {
                let iv = if c < 0 {
                    m.interval_var().optional().length(k).build().unwrap()
                } else {
                    m.interval_var().start_range(0, k).build().unwrap()
                };
                p.intervals.push(iv);
            }
            12 => {
                let e = match k % 6 {
                    0 => m.start(va).unwrap(),
                    1 => m.end(va).unwrap(),
                    2 => m.length(va).unwrap(),
                    3 => m.start_or(va, c).unwrap(),
                    4 => m.end_or(va, c).unwrap(),
                    _ => m.length_or(va, c).unwrap(),
                };
                p.ints.push(e);
            }
            13 => {
                let kind = PrecedenceKind::ALL[(k % 8) as usize];
                m.precedence(kind, va, vb, c % 3).unwrap();
            }
            14 => {
                let main = m.interval_var().optional().build().unwrap();
                if c < 0 {
                    m.alternative(main, &[va, vb]).unwrap();
                } else {
                    m.span(main, &[va, vb]).unwrap();
                }
                p.intervals.push(main);
            }
            15 => {
                let matrix = vec![vec![0, k], vec![k, 0]];
                m.no_overlap(&[va, vb], (c % 2 == 0).then_some(matrix)).unwrap();
            }
            16 => {
                let seq = m.sequence_var(&[va, vb]).build().unwrap();
                m.no_overlap_sequence(seq, Some(vec![vec![0, k], vec![k, 0]]))
                    .unwrap();
            }
            // cumulative functions
            17 => {
                let f = match k % 4 {
                    0 => m.pulse(va, k).unwrap(),
                    1 => m.step_at_start(va, ia).unwrap(),
                    2 => m.step_at_end(va, 2).unwrap(),
                    _ => m.step_at(c, 3).unwrap(),
                };
                p.cumuls.push(f);
            }
            18 => {
                let f = match k % 4 {
                    0 => m.cumul_plus(ca, cb).unwrap(),
                    1 => m.cumul_minus(ca, cb).unwrap(),
                    2 => m.cumul_neg(ca).unwrap(),
                    _ => m.cumul_sum(&[ca, cb]).unwrap(),
                };
                p.cumuls.push(f);
            }
            19 => {
                if c < 0 {
                    m.cumul_ge(ca, c).unwrap();
                } else {
                    m.cumul_le(ca, c).unwrap();
                }
            }
            // step functions
            20 => p.steps.push(m.step_function(&[(-k - 1, 2), (0, 0), (k + 1, 1)]).unwrap()),
            21 => {
                let e = if c < 0 {
                    m.step_function_eval(sa, ia).unwrap()
                } else {
                    m.step_function_sum(sa, va).unwrap()
                };
                p.ints.push(e);
            }
            22 => {
                match k % 3 {
                    0 => m.forbid_extent(va, sa).unwrap(),
                    1 => m.forbid_start(va, sa).unwrap(),
                    _ => m.forbid_end(va, sa).unwrap(),
                };
            }
            // presence
            23 => {
                let e = match k % 3 {
                    0 => m.presence(va).unwrap(),
                    1 => m.identity(ia, ib).unwrap(),
                    _ => m.presence(ia).unwrap(),
                };
                p.bools.push(e);
            }
            24 => p.ints.push(m.guard(ia, c).unwrap()),
            // booleans
            _ => {
                let e = match k % 4 {
                    0 => m.and(ba, bb).unwrap(),
                    1 => m.or(ba, bb).unwrap(),
                    2 => m.not(ba).unwrap(),
                    _ => m.implies(ba, bb).unwrap(),
                };
                if c % 2 == 0 {
                    m.constraint(e).unwrap();
                }
                p.bools.push(e);
            }
        }
    }
    if let Some(last) = p.ints.last() {
        m.minimize(*last).unwrap();
    }
    m
}

proptest! {
    #[test]
    fn test_decode_inverts_encode(
        ops in prop::collection::vec((0u8..26, any::<usize>(), any::<usize>(), -100i64..100), 0..60)
    ) {
        let m = build_model(&ops);
        let wire = encode_model(&m).unwrap();
        let text = serde_json::to_string(&wire).unwrap();
        let back = decode_model(&serde_json::from_str(&text).unwrap()).unwrap();

        prop_assert_eq!(encode_model(&back).unwrap(), wire);
        prop_assert_eq!(back.refs().len(), m.refs().len());
        for (i, id) in back.refs().iter().enumerate() {
            prop_assert_eq!(back.ref_id(*id), Some(RefId(i as u32)));
        }
    }
}
