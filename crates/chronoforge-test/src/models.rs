//! Sample scheduling models and matching solutions.
//!
//! Solution builders look variables up by name, so they work on a model
//! rebuilt by the wire decoder as well as on the original.

use chronoforge_core::{IntervalVar, Model, ModelError, ObjectiveValue, Solution};

/// Two tasks of length 10, `x` before `y`, minimizing the end of `y`.
#[derive(Debug, Clone)]
pub struct TwoTasks {
    pub model: Model,
    pub x: IntervalVar,
    pub y: IntervalVar,
}

pub fn two_tasks() -> Result<TwoTasks, ModelError> {
    let mut model = Model::with_name("two-tasks");
    let x = model.interval_var().length(10).name("x").build()?;
    let y = model.interval_var().length(10).name("y").build()?;
    model.end_before_start(x, y, 0)?;
    let end = model.end(y)?;
    model.minimize(end)?;
    Ok(TwoTasks { model, x, y })
}

/// `x` on `[start, start + 10)` and `y` right after it.
pub fn two_tasks_solution(model: &Model, start: i64) -> Option<Solution> {
    let x = model.interval_var_by_name("x")?;
    let y = model.interval_var_by_name("y")?;
    let mut solution = Solution::new();
    solution.set_interval(x, start, start + 10);
    solution.set_interval(y, start + 10, start + 20);
    solution.set_objective(ObjectiveValue::Value((start + 20) as f64));
    Some(solution)
}

/// A present `main` interval realized by one of two optional modes.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub model: Model,
    pub main: IntervalVar,
    pub a: IntervalVar,
    pub b: IntervalVar,
}

pub fn alternative() -> Result<Alternative, ModelError> {
    let mut model = Model::with_name("alternative");
    let main = model.interval_var().length(10).name("main").build()?;
    let a = model
        .interval_var()
        .length(10)
        .optional()
        .name("a")
        .build()?;
    let b = model
        .interval_var()
        .length(10)
        .optional()
        .name("b")
        .build()?;
    model.alternative(main, &[a, b])?;
    Ok(Alternative { model, main, a, b })
}

/// `main` and the chosen mode on `[start, start + 10)`, the other absent.
pub fn alternative_solution(model: &Model, start: i64, use_a: bool) -> Option<Solution> {
    let main = model.interval_var_by_name("main")?;
    let a = model.interval_var_by_name("a")?;
    let b = model.interval_var_by_name("b")?;
    let (chosen, other) = if use_a { (a, b) } else { (b, a) };
    let mut solution = Solution::new();
    solution.set_interval(main, start, start + 10);
    solution.set_interval(chosen, start, start + 10);
    solution.set_absent(other);
    Some(solution)
}

/// Two present tasks of length 10 that may start anywhere in `[0, 20]`.
#[derive(Debug, Clone)]
pub struct NoOverlap {
    pub model: Model,
    pub a: IntervalVar,
    pub b: IntervalVar,
}

pub fn no_overlap() -> Result<NoOverlap, ModelError> {
    let mut model = Model::with_name("no-overlap");
    let a = model
        .interval_var()
        .length(10)
        .start_range(0, 20)
        .name("a")
        .build()?;
    let b = model
        .interval_var()
        .length(10)
        .start_range(0, 20)
        .name("b")
        .build()?;
    model.no_overlap(&[a, b], None)?;
    Ok(NoOverlap { model, a, b })
}

/// `a` at `a_start` and `b` at `b_start`, both of length 10.
pub fn no_overlap_solution(model: &Model, a_start: i64, b_start: i64) -> Option<Solution> {
    let a = model.interval_var_by_name("a")?;
    let b = model.interval_var_by_name("b")?;
    let mut solution = Solution::new();
    solution.set_interval(a, a_start, a_start + 10);
    solution.set_interval(b, b_start, b_start + 10);
    Some(solution)
}
