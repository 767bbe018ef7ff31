//! Tests for client-side evaluation.

use super::*;
use crate::model::IntervalVar;

fn present(m: &mut Model, length: i64) -> IntervalVar {
    m.interval_var().length(length).build().unwrap()
}

fn optional(m: &mut Model) -> IntervalVar {
    m.interval_var().optional().build().unwrap()
}

// ============================================================================
// Presence algebra
// ============================================================================

mod presence {
    use super::*;

    #[test]
    fn test_absence_propagates_through_arithmetic() {
        let mut m = Model::new();
        let x = optional(&mut m);
        let start = m.start(x).unwrap();
        let shifted = m.plus(start, 1).unwrap();
        let scaled = m.float_times(shifted, 2.5).unwrap();
        let cmp = m.le(shifted, 5).unwrap();

        let mut s = Solution::new();
        s.set_absent(x);

        assert_eq!(eval(&m, &s, start).unwrap(), Value::Absent);
        assert_eq!(eval(&m, &s, shifted).unwrap(), Value::Absent);
        assert_eq!(eval(&m, &s, scaled).unwrap(), Value::Absent);
        assert_eq!(eval_constraint(&m, &s, cmp).unwrap(), None);
    }

    #[test]
    fn test_guard_and_presence_absorb_absence() {
        let mut m = Model::new();
        let x = optional(&mut m);
        let start = m.start(x).unwrap();
        let guarded = m.guard(start, 7).unwrap();
        let is_present = m.presence(x).unwrap();
        let start_or = m.start_or(x, 3).unwrap();
        let length_or = m.length_or(x, -1).unwrap();

        let mut s = Solution::new();
        s.set_absent(x);
        assert_eq!(eval(&m, &s, guarded).unwrap(), Value::Int(7));
        assert_eq!(eval(&m, &s, is_present).unwrap(), Value::Bool(false));
        assert_eq!(eval(&m, &s, start_or).unwrap(), Value::Int(3));
        assert_eq!(eval(&m, &s, length_or).unwrap(), Value::Int(-1));

        s.set_interval(x, 4, 9);
        assert_eq!(eval(&m, &s, guarded).unwrap(), Value::Int(4));
        assert_eq!(eval(&m, &s, is_present).unwrap(), Value::Bool(true));
        assert_eq!(eval(&m, &s, length_or).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_aggregates_drop_absent_operands() {
        let mut m = Model::new();
        let x = optional(&mut m);
        let y = present(&mut m, 3);
        let sx = m.start(x).unwrap();
        let sy = m.start(y).unwrap();
        let total = m.sum([sx, sy]).unwrap();
        let lowest = m.min([sx]).unwrap();

        let mut s = Solution::new();
        s.set_absent(x);
        s.set_interval(y, 2, 5);

        assert_eq!(eval(&m, &s, total).unwrap(), Value::Int(2));
        assert_eq!(eval(&m, &s, lowest).unwrap(), Value::Absent);
    }

    #[test]
    fn test_identity_treats_absent_as_equal() {
        let mut m = Model::new();
        let x = optional(&mut m);
        let y = optional(&mut m);
        let sx = m.start(x).unwrap();
        let sy = m.start(y).unwrap();
        let same = m.identity(sx, sy).unwrap();
        let eq = m.eq(sx, sy).unwrap();

        let mut s = Solution::new();
        s.set_absent(x);
        s.set_absent(y);
        assert_eq!(eval(&m, &s, same).unwrap(), Value::Bool(true));
        assert_eq!(eval(&m, &s, eq).unwrap(), Value::Absent);

        s.set_interval(y, 0, 1);
        assert_eq!(eval(&m, &s, same).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_undefined_arithmetic_is_absent() {
        let mut m = Model::new();
        let x = m.int_var().range(0, 10).build().unwrap();
        let q = m.div(x, 0).unwrap();
        let f = m.float_div(x, 0.0).unwrap();
        let ok = m.div(x, 2).unwrap();

        let mut s = Solution::new();
        s.set_int(x, 5);
        assert_eq!(eval(&m, &s, q).unwrap(), Value::Absent);
        assert_eq!(eval(&m, &s, f).unwrap(), Value::Absent);
        assert_eq!(eval(&m, &s, ok).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_boolean_connectives() {
        let mut m = Model::new();
        let a = m.bool_var().build().unwrap();
        let b = m.bool_var().build().unwrap();
        let and = m.and(a, b).unwrap();
        let or = m.or(a, b).unwrap();
        let implies = m.implies(a, b).unwrap();
        let not = m.not(a).unwrap();

        let mut s = Solution::new();
        s.set_bool(a, true);
        s.set_bool(b, false);
        assert_eq!(eval(&m, &s, and).unwrap(), Value::Bool(false));
        assert_eq!(eval(&m, &s, or).unwrap(), Value::Bool(true));
        assert_eq!(eval(&m, &s, implies).unwrap(), Value::Bool(false));
        assert_eq!(eval(&m, &s, not).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_in_range() {
        let mut m = Model::new();
        let x = m.int_var().build().unwrap();
        let r = m.in_range(x, 1.0, 4.0).unwrap();

        let mut s = Solution::new();
        s.set_int(x, 4);
        assert_eq!(eval(&m, &s, r).unwrap(), Value::Bool(true));
        s.set_int(x, 5);
        assert_eq!(eval(&m, &s, r).unwrap(), Value::Bool(false));
    }
}

// ============================================================================
// Scheduling constraints
// ============================================================================

mod scheduling {
    use super::*;

    #[test]
    fn test_precedence_with_delay() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let b = present(&mut m, 5);
        let c = m.end_before_start(a, b, 2).unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 12, 17);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(true));

        s.set_interval(b, 11, 16);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(false));
    }

    #[test]
    fn test_precedence_absent_operand() {
        let mut m = Model::new();
        let a = optional(&mut m);
        let b = present(&mut m, 5);
        let c = m.start_at_start(a, b, 0).unwrap();

        let mut s = Solution::new();
        s.set_absent(a);
        s.set_interval(b, 0, 5);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), None);
    }

    #[test]
    fn test_extreme_endpoints_do_not_overflow() {
        let mut m = Model::new();
        let a = m.interval_var().build().unwrap();
        let b = m.interval_var().build().unwrap();
        let after = m.end_before_start(a, b, 1).unwrap();
        let spaced = m
            .no_overlap(&[a, b], Some(vec![vec![0, 1], vec![1, 0]]))
            .unwrap();
        let length = m.length(a).unwrap();

        let mut s = Solution::new();
        s.set_interval(a, i64::MIN, i64::MAX);
        s.set_interval(b, i64::MAX, i64::MAX);
        assert_eq!(eval_constraint(&m, &s, after).unwrap(), Some(false));
        assert_eq!(eval(&m, &s, length).unwrap(), Value::Absent);

        s.set_interval(a, 0, i64::MAX);
        s.set_interval(b, -10, -5);
        assert_eq!(eval_constraint(&m, &s, spaced).unwrap(), Some(true));
    }

    #[test]
    fn test_alternative_selects_one() {
        let mut m = Model::new();
        let main = present(&mut m, 10);
        let o1 = optional(&mut m);
        let o2 = optional(&mut m);
        let c = m.alternative(main, &[o1, o2]).unwrap();

        let mut s = Solution::new();
        s.set_interval(main, 0, 10);
        s.set_absent(o1);
        s.set_interval(o2, 0, 10);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(true));

        s.set_interval(o1, 0, 10);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(false));

        s.set_absent(o1);
        s.set_interval(o2, 1, 11);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(false));
    }

    #[test]
    fn test_span_covers_children() {
        let mut m = Model::new();
        let main = m.interval_var().build().unwrap();
        let c1 = present(&mut m, 5);
        let c2 = present(&mut m, 10);
        let c = m.span(main, &[c1, c2]).unwrap();

        let mut s = Solution::new();
        s.set_interval(c1, 0, 5);
        s.set_interval(c2, 10, 20);
        s.set_interval(main, 0, 20);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(true));

        s.set_interval(main, 0, 25);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(false));
    }

    #[test]
    fn test_no_overlap_with_transitions() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let b = present(&mut m, 10);
        let plain = m.no_overlap(&[a, b], None).unwrap();
        let spaced = m
            .no_overlap(&[a, b], Some(vec![vec![0, 5], vec![5, 0]]))
            .unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 10, 20);
        assert_eq!(eval_constraint(&m, &s, plain).unwrap(), Some(true));
        assert_eq!(eval_constraint(&m, &s, spaced).unwrap(), Some(false));

        s.set_interval(b, 15, 25);
        assert_eq!(eval_constraint(&m, &s, spaced).unwrap(), Some(true));

        s.set_interval(b, 5, 15);
        assert_eq!(eval_constraint(&m, &s, plain).unwrap(), Some(false));
    }

    #[test]
    fn test_no_overlap_sequence_uses_types() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let b = present(&mut m, 10);
        let c = present(&mut m, 10);
        let seq = m.sequence_var(&[a, b, c]).types(vec![0, 0, 1]).build().unwrap();
        let con = m
            .no_overlap_sequence(seq, Some(vec![vec![0, 3], vec![3, 0]]))
            .unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 10, 20);
        s.set_interval(c, 23, 33);
        assert_eq!(eval_constraint(&m, &s, con).unwrap(), Some(true));

        s.set_interval(c, 21, 31);
        assert_eq!(eval_constraint(&m, &s, con).unwrap(), Some(false));
    }
}

// ============================================================================
// Cumulative and step functions
// ============================================================================

mod functions {
    use super::*;

    #[test]
    fn test_cumul_le_on_overlapping_pulses() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let b = present(&mut m, 10);
        let pa = m.pulse(a, 2).unwrap();
        let pb = m.pulse(b, 2).unwrap();
        let usage = m.cumul_sum(&[pa, pb]).unwrap();
        let tight = m.cumul_le(usage, 3).unwrap();
        let loose = m.cumul_le(usage, 4).unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 5, 15);
        assert_eq!(eval_constraint(&m, &s, tight).unwrap(), Some(false));
        assert_eq!(eval_constraint(&m, &s, loose).unwrap(), Some(true));

        s.set_interval(b, 10, 20);
        assert_eq!(eval_constraint(&m, &s, tight).unwrap(), Some(true));
    }

    #[test]
    fn test_cumul_ge_counts_the_zero_level() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let pa = m.pulse(a, 2).unwrap();
        let positive = m.cumul_ge(pa, 2).unwrap();
        let zero = m.cumul_ge(pa, 0).unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        assert_eq!(eval_constraint(&m, &s, positive).unwrap(), Some(false));
        assert_eq!(eval_constraint(&m, &s, zero).unwrap(), Some(true));
    }

    #[test]
    fn test_cumul_ge_on_negative_steps() {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let pa = m.pulse(a, 3).unwrap();
        let neg = m.cumul_neg(pa).unwrap();
        let holds = m.cumul_ge(neg, -3).unwrap();
        let fails = m.cumul_ge(neg, -2).unwrap();

        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        assert_eq!(eval_constraint(&m, &s, holds).unwrap(), Some(true));
        assert_eq!(eval_constraint(&m, &s, fails).unwrap(), Some(false));
    }

    #[test]
    fn test_cumul_le_negative_bound() {
        let mut m = Model::new();
        let down = m.step_at(0, -5).unwrap();
        let c = m.cumul_le(down, -1).unwrap();

        let s = Solution::new();
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(false));
    }

    #[test]
    fn test_empty_sum_is_zero_everywhere() {
        let mut m = Model::new();
        let empty = m.cumul_sum(&[]).unwrap();
        let below = m.cumul_le(empty, -1).unwrap();
        let at_most_zero = m.cumul_le(empty, 0).unwrap();
        let above = m.cumul_ge(empty, 1).unwrap();

        let s = Solution::new();
        assert_eq!(eval_constraint(&m, &s, below).unwrap(), Some(false));
        assert_eq!(eval_constraint(&m, &s, at_most_zero).unwrap(), Some(true));
        assert_eq!(eval_constraint(&m, &s, above).unwrap(), Some(false));
    }

    #[test]
    fn test_absent_pulse_contributes_nothing() {
        let mut m = Model::new();
        let a = optional(&mut m);
        let pa = m.pulse(a, 5).unwrap();
        let neg = m.cumul_neg(pa).unwrap();
        let c = m.cumul_le(neg, 0).unwrap();

        let mut s = Solution::new();
        s.set_absent(a);
        assert_eq!(eval_constraint(&m, &s, c).unwrap(), Some(true));
    }

    #[test]
    fn test_step_function_queries() {
        let mut m = Model::new();
        let f = m.step_function(&[(0, 1), (5, 0), (10, 1)]).unwrap();
        let iv = m.interval_var().build().unwrap();
        let at7 = m.step_function_eval(f, 7).unwrap();
        let total = m.step_function_sum(f, iv).unwrap();

        let mut s = Solution::new();
        s.set_interval(iv, 0, 12);
        assert_eq!(eval(&m, &s, at7).unwrap(), Value::Int(0));
        assert_eq!(eval(&m, &s, total).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_forbid_constraints() {
        let mut m = Model::new();
        let f = m.step_function(&[(0, 1), (5, 0), (10, 1)]).unwrap();
        let iv = m.interval_var().build().unwrap();
        let extent = m.forbid_extent(iv, f).unwrap();
        let start = m.forbid_start(iv, f).unwrap();
        let end = m.forbid_end(iv, f).unwrap();

        let mut s = Solution::new();
        s.set_interval(iv, 1, 5);
        assert_eq!(eval_constraint(&m, &s, extent).unwrap(), Some(true));
        assert_eq!(eval_constraint(&m, &s, end).unwrap(), Some(true));

        s.set_interval(iv, 3, 8);
        assert_eq!(eval_constraint(&m, &s, extent).unwrap(), Some(false));
        assert_eq!(eval_constraint(&m, &s, start).unwrap(), Some(true));

        s.set_interval(iv, 6, 12);
        assert_eq!(eval_constraint(&m, &s, start).unwrap(), Some(false));
        assert_eq!(eval_constraint(&m, &s, end).unwrap(), Some(true));
    }

    #[test]
    fn test_step_points_sum_and_coverage() {
        let points = StepPoints::new(vec![(0, 2), (4, 0)]);
        assert_eq!(points.at(-1), 0);
        assert_eq!(points.at(3), 2);
        assert_eq!(points.sum(-2, 6), 8);
        assert!(points.nonzero_over(0, 4));
        assert!(!points.nonzero_over(0, 5));
    }
}

// ============================================================================
// Verification
// ============================================================================

mod verification {
    use super::*;

    fn two_tasks() -> (Model, IntervalVar, IntervalVar) {
        let mut m = Model::new();
        let a = present(&mut m, 10);
        let b = present(&mut m, 5);
        m.end_before_start(a, b, 0).unwrap();
        let end = m.end(b).unwrap();
        m.minimize(end).unwrap();
        (m, a, b)
    }

    #[test]
    fn test_verify_accepts_feasible_solution() {
        let (m, a, b) = two_tasks();
        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 10, 15);
        s.set_objective(ObjectiveValue::Value(15.0));
        verify(&m, &s).unwrap();
    }

    #[test]
    fn test_verify_rejects_wrong_objective() {
        let (m, a, b) = two_tasks();
        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 10, 15);
        s.set_objective(ObjectiveValue::Value(14.0));
        assert!(matches!(
            verify(&m, &s),
            Err(EvalError::Objective { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_violated_precedence() {
        let (m, a, b) = two_tasks();
        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        s.set_interval(b, 5, 10);
        assert!(matches!(
            verify(&m, &s),
            Err(EvalError::Violated {
                func: Func::EndBeforeStart,
                ..
            })
        ));
    }

    #[test]
    fn test_verify_rejects_domain_violation() {
        let (m, a, b) = two_tasks();
        let mut s = Solution::new();
        s.set_interval(a, 0, 9);
        s.set_interval(b, 10, 15);
        assert!(matches!(verify(&m, &s), Err(EvalError::Domain { .. })));

        s.set_absent(a);
        assert!(matches!(verify(&m, &s), Err(EvalError::Domain { .. })));
    }

    #[test]
    fn test_verify_requires_every_variable() {
        let (m, a, _) = two_tasks();
        let mut s = Solution::new();
        s.set_interval(a, 0, 10);
        assert!(matches!(verify(&m, &s), Err(EvalError::MissingValue(_))));
    }
}
