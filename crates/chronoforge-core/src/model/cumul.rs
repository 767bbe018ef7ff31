//! Cumulative functions and integer step functions.

use super::handles::{Constraint, CumulExpr, IntExpr, IntOperand, IntStepFunction, IntervalVar};
use super::node::{Arg, Func, Kind, NodeData, NodeId};
use super::Model;
use crate::error::{ModelError, Result};

/// Checks that step function points are strictly increasing in x.
pub(crate) fn check_step_points(points: &[Vec<i64>]) -> Result<()> {
    let mut previous: Option<i64> = None;
    for point in points {
        let [x, _y] = point.as_slice() else {
            return Err(ModelError::Invalid(format!(
                "step function point must be [x, y], got {point:?}"
            )));
        };
        if let Some(previous) = previous {
            if *x <= previous {
                return Err(ModelError::StepFunctionOrder { previous, x: *x });
            }
        }
        previous = Some(*x);
    }
    Ok(())
}

impl Model {
    fn expect_cumul(&self, id: NodeId) -> Result<()> {
        self.expect_kind(id, "cumulative expression", |k| k == Kind::Cumul)
    }

    fn expect_step_function(&self, id: NodeId) -> Result<()> {
        self.expect_kind(id, "step function", |k| k == Kind::StepFunction)
    }

    fn interval_step(
        &mut self,
        func: Func,
        iv: IntervalVar,
        height: IntOperand,
    ) -> Result<CumulExpr> {
        self.expect_kind(iv.0, "interval variable", |k| k == Kind::Interval)?;
        let height = self.int_arg(height)?;
        self.add(NodeData::new(func, vec![Arg::Node(iv.0), height]))
            .map(CumulExpr)
    }

    // ========================================================================
    // Elementary cumulative functions
    // ========================================================================

    /// `height` over `[start, end)` of `iv`; zero everywhere when absent.
    pub fn pulse(&mut self, iv: IntervalVar, height: impl Into<IntOperand>) -> Result<CumulExpr> {
        self.interval_step(Func::Pulse, iv, height.into())
    }

    /// Rises by `height` at the start of `iv` and stays there.
    pub fn step_at_start(
        &mut self,
        iv: IntervalVar,
        height: impl Into<IntOperand>,
    ) -> Result<CumulExpr> {
        self.interval_step(Func::StepAtStart, iv, height.into())
    }

    /// Rises by `height` at the end of `iv` and stays there.
    pub fn step_at_end(
        &mut self,
        iv: IntervalVar,
        height: impl Into<IntOperand>,
    ) -> Result<CumulExpr> {
        self.interval_step(Func::StepAtEnd, iv, height.into())
    }

    /// Rises by `height` at a fixed time.
    pub fn step_at(&mut self, x: i64, height: impl Into<IntOperand>) -> Result<CumulExpr> {
        let height = self.int_arg(height.into())?;
        self.add(NodeData::new(Func::StepAt, vec![Arg::Int(x), height]))
            .map(CumulExpr)
    }

    // ========================================================================
    // Composition
    // ========================================================================

    pub fn cumul_plus(&mut self, a: CumulExpr, b: CumulExpr) -> Result<CumulExpr> {
        self.expect_cumul(a.0)?;
        self.expect_cumul(b.0)?;
        self.add(NodeData::new(
            Func::CumulPlus,
            vec![Arg::Node(a.0), Arg::Node(b.0)],
        ))
        .map(CumulExpr)
    }

    pub fn cumul_minus(&mut self, a: CumulExpr, b: CumulExpr) -> Result<CumulExpr> {
        self.expect_cumul(a.0)?;
        self.expect_cumul(b.0)?;
        self.add(NodeData::new(
            Func::CumulMinus,
            vec![Arg::Node(a.0), Arg::Node(b.0)],
        ))
        .map(CumulExpr)
    }

    pub fn cumul_neg(&mut self, a: CumulExpr) -> Result<CumulExpr> {
        self.expect_cumul(a.0)?;
        self.add(NodeData::new(Func::CumulNeg, vec![Arg::Node(a.0)]))
            .map(CumulExpr)
    }

    pub fn cumul_sum(&mut self, items: &[CumulExpr]) -> Result<CumulExpr> {
        for item in items {
            self.expect_cumul(item.0)?;
        }
        let list = items.iter().map(|c| Arg::Node(c.0)).collect();
        self.add(NodeData::new(Func::CumulSum, vec![Arg::List(list)]))
            .map(CumulExpr)
    }

    /// The function never exceeds `max`.
    pub fn cumul_le(&mut self, f: CumulExpr, max: i64) -> Result<Constraint> {
        self.expect_cumul(f.0)?;
        self.add(NodeData::new(Func::CumulLe, vec![Arg::Node(f.0), Arg::Int(max)]))
            .map(Constraint)
    }

    /// The function stays at or above `min` at every time point, including
    /// the 0 level before its first change.
    pub fn cumul_ge(&mut self, f: CumulExpr, min: i64) -> Result<Constraint> {
        self.expect_cumul(f.0)?;
        self.add(NodeData::new(Func::CumulGe, vec![Arg::Node(f.0), Arg::Int(min)]))
            .map(Constraint)
    }

    // ========================================================================
    // Step functions
    // ========================================================================

    /// Step function from `(x, y)` points: `f(t)` is the `y` of the last point
    /// with `x <= t`, and 0 before the first point.
    pub fn step_function(&mut self, points: &[(i64, i64)]) -> Result<IntStepFunction> {
        let values: Vec<Vec<i64>> = points.iter().map(|(x, y)| vec![*x, *y]).collect();
        check_step_points(&values)?;
        let mut data = NodeData::new(Func::IntStepFunction, Vec::new());
        data.values = Some(values);
        self.add(data).map(IntStepFunction)
    }

    pub fn step_function_eval(
        &mut self,
        f: IntStepFunction,
        x: impl Into<IntOperand>,
    ) -> Result<IntExpr> {
        self.expect_step_function(f.0)?;
        let x = self.int_operand(x.into())?;
        self.add(NodeData::new(
            Func::StepFunctionEval,
            vec![Arg::Node(f.0), Arg::Node(x)],
        ))
        .map(IntExpr)
    }

    /// Sum of `f` over `[start, end)` of `iv`.
    pub fn step_function_sum(&mut self, f: IntStepFunction, iv: IntervalVar) -> Result<IntExpr> {
        self.step_function_interval(Func::StepFunctionSum, f, iv)
            .map(IntExpr)
    }

    /// `iv` does not overlap any point where `f` is zero.
    pub fn forbid_extent(&mut self, iv: IntervalVar, f: IntStepFunction) -> Result<Constraint> {
        self.step_function_interval(Func::ForbidExtent, f, iv)
            .map(Constraint)
    }

    /// `iv` does not start where `f` is zero.
    pub fn forbid_start(&mut self, iv: IntervalVar, f: IntStepFunction) -> Result<Constraint> {
        self.step_function_interval(Func::ForbidStart, f, iv)
            .map(Constraint)
    }

    /// `iv` does not end right after a point where `f` is zero.
    pub fn forbid_end(&mut self, iv: IntervalVar, f: IntStepFunction) -> Result<Constraint> {
        self.step_function_interval(Func::ForbidEnd, f, iv)
            .map(Constraint)
    }

    fn step_function_interval(
        &mut self,
        func: Func,
        f: IntStepFunction,
        iv: IntervalVar,
    ) -> Result<NodeId> {
        self.expect_step_function(f.0)?;
        self.expect_kind(iv.0, "interval variable", |k| k == Kind::Interval)?;
        // stepFunctionSum takes the function first, forbid* take the interval first
        let args = if func == Func::StepFunctionSum {
            vec![Arg::Node(f.0), Arg::Node(iv.0)]
        } else {
            vec![Arg::Node(iv.0), Arg::Node(f.0)]
        };
        self.add(NodeData::new(func, args))
    }
}
