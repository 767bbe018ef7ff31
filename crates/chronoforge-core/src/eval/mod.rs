//! Client-side evaluation of model nodes against a solution.
//!
//! Every integer, float, boolean and interval expression evaluates to a
//! concrete value or to [`Value::Absent`]. Absence propagates through every
//! operator except `guard`, `presence`, `identity`, the `*Or` accessors and
//! the array aggregates, which drop absent operands.
//!
//! Constraints evaluate to `Option<bool>`, where `None` means the constraint
//! is absent and therefore satisfied.

mod cumul;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use thiserror::Error;

use crate::error::ModelError;
use crate::model::{
    self, Arg, Func, Kind, Model, Node, NodeData, NodeId, PrecedenceKind, INTERVAL_MAX,
    INTERVAL_MIN, INT_VAR_MAX, INT_VAR_MIN, LENGTH_MAX,
};
use crate::solution::{ObjectiveValue, Solution, SolutionValue};

pub use cumul::StepPoints;

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Interval { start: i64, end: i64 },
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Absent | Value::Interval { .. } => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_interval(&self) -> Option<(i64, i64)> {
        match self {
            Value::Interval { start, end } => Some((*start, *end)),
            _ => None,
        }
    }
}

/// Error raised while evaluating or verifying a solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("variable {0} has no value in the solution")]
    MissingValue(NodeId),

    #[error("node {node} ({func}) is malformed: {detail}")]
    Malformed {
        node: NodeId,
        func: Func,
        detail: String,
    },

    #[error("list argument used where a scalar is expected")]
    ListAsScalar,

    #[error("value of variable {node} violates its domain: {detail}")]
    Domain { node: NodeId, detail: String },

    #[error("constraint {node} ({func}) is violated")]
    Violated { node: NodeId, func: Func },

    #[error("reported objective {reported:?} differs from evaluated {actual:?}")]
    Objective {
        reported: ObjectiveValue,
        actual: ObjectiveValue,
    },
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// Evaluates one expression.
pub fn eval(model: &Model, solution: &Solution, node: impl Node) -> Result<Value> {
    Evaluator::new(model, solution).value(node.node())
}

/// Evaluates one constraint or boolean expression.
pub fn eval_constraint(model: &Model, solution: &Solution, node: impl Node) -> Result<Option<bool>> {
    Evaluator::new(model, solution).constraint(node.node())
}

/// Checks variable domains, every top-level constraint and the objective.
pub fn verify(model: &Model, solution: &Solution) -> Result<()> {
    let mut evaluator = Evaluator::new(model, solution);
    for id in model.variables() {
        evaluator.check_domain(id)?;
    }
    for id in model.top_level() {
        if evaluator.constraint(*id)? == Some(false) {
            return Err(EvalError::Violated {
                node: *id,
                func: model.node(*id)?.func,
            });
        }
    }
    if let Some(objective) = model.objective() {
        let reported = solution.objective();
        if !reported.is_undefined() {
            let actual = match evaluator.value(objective.expr)?.as_f64() {
                Some(v) => ObjectiveValue::Value(v),
                None => ObjectiveValue::Absent,
            };
            let same = match (reported, actual) {
                (ObjectiveValue::Value(a), ObjectiveValue::Value(b)) => (a - b).abs() <= 1e-6,
                (a, b) => a == b,
            };
            if !same {
                return Err(EvalError::Objective { reported, actual });
            }
        }
    }
    Ok(())
}

/// Memoizing evaluator over one model and solution.
pub struct Evaluator<'a> {
    model: &'a Model,
    solution: &'a Solution,
    cache: HashMap<NodeId, Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a Model, solution: &'a Solution) -> Self {
        Self {
            model,
            solution,
            cache: HashMap::new(),
        }
    }

    fn malformed(id: NodeId, node: &NodeData, detail: impl Into<String>) -> EvalError {
        EvalError::Malformed {
            node: id,
            func: node.func,
            detail: detail.into(),
        }
    }

    fn arg<'n>(id: NodeId, node: &'n NodeData, i: usize) -> Result<&'n Arg> {
        node.args
            .get(i)
            .ok_or_else(|| Self::malformed(id, node, format!("missing argument {i}")))
    }

    fn list<'n>(id: NodeId, node: &'n NodeData, i: usize) -> Result<&'n [Arg]> {
        Self::arg(id, node, i)?
            .as_list()
            .ok_or_else(|| Self::malformed(id, node, format!("argument {i} is not a list")))
    }

    /// Value of a literal or node argument.
    pub fn arg_value(&mut self, arg: &Arg) -> Result<Value> {
        match arg {
            Arg::Int(v) => Ok(Value::Int(*v)),
            Arg::Float(v) => Ok(Value::Float(*v)),
            Arg::Bool(b) => Ok(Value::Bool(*b)),
            Arg::Node(id) => self.value(*id),
            Arg::List(_) => Err(EvalError::ListAsScalar),
        }
    }

    fn int_arg(&mut self, id: NodeId, node: &NodeData, i: usize) -> Result<Option<i64>> {
        let value = self.arg_value(Self::arg(id, node, i)?)?;
        if value.is_absent() {
            return Ok(None);
        }
        value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Self::malformed(id, node, format!("argument {i} is not integral")))
    }

    fn float_arg(&mut self, id: NodeId, node: &NodeData, i: usize) -> Result<Option<f64>> {
        let value = self.arg_value(Self::arg(id, node, i)?)?;
        if value.is_absent() {
            return Ok(None);
        }
        value
            .as_f64()
            .map(Some)
            .ok_or_else(|| Self::malformed(id, node, format!("argument {i} is not numeric")))
    }

    fn bool_arg(&mut self, id: NodeId, node: &NodeData, i: usize) -> Result<Option<bool>> {
        let value = self.arg_value(Self::arg(id, node, i)?)?;
        if value.is_absent() {
            return Ok(None);
        }
        value
            .as_bool()
            .map(Some)
            .ok_or_else(|| Self::malformed(id, node, format!("argument {i} is not boolean")))
    }

    pub(crate) fn interval_arg(
        &mut self,
        id: NodeId,
        node: &NodeData,
        arg: &Arg,
    ) -> Result<Option<(i64, i64)>> {
        match self.arg_value(arg)? {
            Value::Absent => Ok(None),
            Value::Interval { start, end } => Ok(Some((start, end))),
            _ => Err(Self::malformed(id, node, "expected an interval")),
        }
    }

    /// Evaluates a node.
    pub fn value(&mut self, id: NodeId) -> Result<Value> {
        if let Some(value) = self.cache.get(&id) {
            return Ok(*value);
        }
        let model = self.model;
        let node = model.node(id)?;
        let value = self.compute(id, node)?;
        self.cache.insert(id, value);
        Ok(value)
    }

    fn variable(&self, id: NodeId, node: &NodeData) -> Result<Value> {
        let value = self
            .solution
            .value(id)
            .ok_or(EvalError::MissingValue(id))?;
        Ok(match (node.func, value) {
            (_, SolutionValue::Absent) => Value::Absent,
            (Func::IntVar, SolutionValue::Int(v)) => Value::Int(v),
            (Func::IntVar, SolutionValue::Bool(b)) => Value::Int(i64::from(b)),
            (Func::BoolVar, SolutionValue::Bool(b)) => Value::Bool(b),
            (Func::BoolVar, SolutionValue::Int(v)) => Value::Bool(v != 0),
            (Func::FloatVar, SolutionValue::Float(v)) => Value::Float(v),
            (Func::FloatVar, SolutionValue::Int(v)) => Value::Float(v as f64),
            (Func::IntervalVar, SolutionValue::Interval { start, end }) => {
                Value::Interval { start, end }
            }
            (_, other) => {
                return Err(EvalError::Domain {
                    node: id,
                    detail: format!("{other:?} is not a value of a {}", node.kind().name()),
                })
            }
        })
    }

    fn compute(&mut self, id: NodeId, node: &NodeData) -> Result<Value> {
        use Func::*;

        match node.func {
            IntVar | BoolVar | FloatVar | IntervalVar => self.variable(id, node),
            IntConst | FloatConst | BoolConst => self.arg_value(Self::arg(id, node, 0)?),

            IntPlus | IntMinus | IntTimes | IntDiv | IntMin2 | IntMax2 => {
                let (Some(a), Some(b)) = (self.int_arg(id, node, 0)?, self.int_arg(id, node, 1)?)
                else {
                    return Ok(Value::Absent);
                };
                let result = match node.func {
                    IntPlus => a.checked_add(b),
                    IntMinus => a.checked_sub(b),
                    IntTimes => a.checked_mul(b),
                    IntDiv => a.checked_div(b),
                    IntMin2 => Some(a.min(b)),
                    _ => Some(a.max(b)),
                };
                Ok(result.map_or(Value::Absent, Value::Int))
            }
            IntNeg | IntAbs => match self.int_arg(id, node, 0)? {
                None => Ok(Value::Absent),
                Some(a) => {
                    let result = if node.func == IntNeg {
                        a.checked_neg()
                    } else {
                        a.checked_abs()
                    };
                    Ok(result.map_or(Value::Absent, Value::Int))
                }
            },
            IntSum | IntMin | IntMax => {
                let mut present = Vec::new();
                for item in Self::list(id, node, 0)? {
                    let value = self.arg_value(item)?;
                    if let Some(v) = value.as_i64() {
                        present.push(v);
                    } else if !value.is_absent() {
                        return Err(Self::malformed(id, node, "operand is not integral"));
                    }
                }
                Ok(match node.func {
                    IntSum => present
                        .iter()
                        .try_fold(0i64, |acc, v| acc.checked_add(*v))
                        .map_or(Value::Absent, Value::Int),
                    IntMin => present.into_iter().min().map_or(Value::Absent, Value::Int),
                    _ => present.into_iter().max().map_or(Value::Absent, Value::Int),
                })
            }
            IntGuard | FloatGuard => {
                let value = self.arg_value(Self::arg(id, node, 0)?)?;
                if value.is_absent() {
                    self.arg_value(Self::arg(id, node, 1)?)
                } else {
                    Ok(value)
                }
            }

            FloatPlus | FloatMinus | FloatTimes | FloatDiv | FloatMin2 | FloatMax2 => {
                let (Some(a), Some(b)) =
                    (self.float_arg(id, node, 0)?, self.float_arg(id, node, 1)?)
                else {
                    return Ok(Value::Absent);
                };
                Ok(match node.func {
                    FloatPlus => Value::Float(a + b),
                    FloatMinus => Value::Float(a - b),
                    FloatTimes => Value::Float(a * b),
                    FloatDiv if b == 0.0 => Value::Absent,
                    FloatDiv => Value::Float(a / b),
                    FloatMin2 => Value::Float(a.min(b)),
                    _ => Value::Float(a.max(b)),
                })
            }
            FloatNeg | FloatAbs => Ok(match self.float_arg(id, node, 0)? {
                None => Value::Absent,
                Some(a) if node.func == FloatNeg => Value::Float(-a),
                Some(a) => Value::Float(a.abs()),
            }),
            FloatSum | FloatMin | FloatMax => {
                let mut present = Vec::new();
                for item in Self::list(id, node, 0)? {
                    let value = self.arg_value(item)?;
                    if let Some(v) = value.as_f64() {
                        present.push(v);
                    } else if !value.is_absent() {
                        return Err(Self::malformed(id, node, "operand is not numeric"));
                    }
                }
                Ok(match node.func {
                    FloatSum => Value::Float(present.iter().sum()),
                    FloatMin => present
                        .into_iter()
                        .reduce(f64::min)
                        .map_or(Value::Absent, Value::Float),
                    _ => present
                        .into_iter()
                        .reduce(f64::max)
                        .map_or(Value::Absent, Value::Float),
                })
            }

            Presence => {
                let value = self.arg_value(Self::arg(id, node, 0)?)?;
                Ok(Value::Bool(!value.is_absent()))
            }
            Identity => {
                let a = self.float_arg(id, node, 0)?;
                let b = self.float_arg(id, node, 1)?;
                Ok(Value::Bool(a == b))
            }
            Eq | Ne | Lt | Le | Gt | Ge => {
                let (Some(a), Some(b)) =
                    (self.float_arg(id, node, 0)?, self.float_arg(id, node, 1)?)
                else {
                    return Ok(Value::Absent);
                };
                Ok(Value::Bool(match node.func {
                    Eq => a == b,
                    Ne => a != b,
                    Lt => a < b,
                    Le => a <= b,
                    Gt => a > b,
                    _ => a >= b,
                }))
            }
            InRange => {
                let Some(x) = self.float_arg(id, node, 0)? else {
                    return Ok(Value::Absent);
                };
                let lb = self.float_arg(id, node, 1)?.unwrap_or(f64::NEG_INFINITY);
                let ub = self.float_arg(id, node, 2)?.unwrap_or(f64::INFINITY);
                Ok(Value::Bool(lb <= x && x <= ub))
            }

            BoolAnd | BoolOr | BoolImplies => {
                let (Some(a), Some(b)) = (self.bool_arg(id, node, 0)?, self.bool_arg(id, node, 1)?)
                else {
                    return Ok(Value::Absent);
                };
                Ok(Value::Bool(match node.func {
                    BoolAnd => a && b,
                    BoolOr => a || b,
                    _ => !a || b,
                }))
            }
            BoolNot => Ok(self
                .bool_arg(id, node, 0)?
                .map_or(Value::Absent, |b| Value::Bool(!b))),

            StartOf | EndOf | LengthOf | StartOr | EndOr | LengthOr => {
                let interval = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
                match interval {
                    Some((start, end)) => Ok(match node.func {
                        StartOf | StartOr => Value::Int(start),
                        EndOf | EndOr => Value::Int(end),
                        _ => end.checked_sub(start).map_or(Value::Absent, Value::Int),
                    }),
                    None if matches!(node.func, StartOr | EndOr | LengthOr) => {
                        self.arg_value(Self::arg(id, node, 1)?)
                    }
                    None => Ok(Value::Absent),
                }
            }

            StepFunctionEval => {
                let points = self.step_points(Self::arg(id, node, 0)?)?;
                Ok(self
                    .int_arg(id, node, 1)?
                    .map_or(Value::Absent, |x| Value::Int(points.at(x))))
            }
            StepFunctionSum => {
                let points = self.step_points(Self::arg(id, node, 0)?)?;
                let interval = self.interval_arg(id, node, Self::arg(id, node, 1)?)?;
                Ok(interval.map_or(Value::Absent, |(s, e)| Value::Int(points.sum(s, e))))
            }

            _ if node.kind() == Kind::Constraint => Ok(self
                .constraint(id)?
                .map_or(Value::Absent, Value::Bool)),

            SequenceVar | IntStepFunction | Pulse | StepAtStart | StepAtEnd | StepAt
            | CumulPlus | CumulMinus | CumulNeg | CumulSum => {
                Err(Self::malformed(id, node, "node has no scalar value"))
            }
            _ => Err(Self::malformed(id, node, "unsupported operator")),
        }
    }

    /// Evaluates a constraint or boolean node. `None` means absent.
    pub fn constraint(&mut self, id: NodeId) -> Result<Option<bool>> {
        let model = self.model;
        let node = model.node(id)?;
        match node.func {
            Func::Alternative => self.alternative(id, node).map(Some),
            Func::Span => self.span(id, node).map(Some),
            Func::NoOverlap => self.no_overlap(id, node).map(Some),
            Func::CumulLe | Func::CumulGe => self.cumul_bound(id, node).map(Some),
            Func::ForbidExtent | Func::ForbidStart | Func::ForbidEnd => self.forbid(id, node),
            func => {
                if let Some(kind) = PrecedenceKind::from_func(func) {
                    return self.precedence(id, node, kind);
                }
                match self.value(id)? {
                    Value::Absent => Ok(None),
                    value => value
                        .as_bool()
                        .map(Some)
                        .ok_or_else(|| Self::malformed(id, node, "not a boolean expression")),
                }
            }
        }
    }

    fn precedence(
        &mut self,
        id: NodeId,
        node: &NodeData,
        kind: PrecedenceKind,
    ) -> Result<Option<bool>> {
        let a = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
        let b = self.interval_arg(id, node, Self::arg(id, node, 1)?)?;
        let (Some(a), Some(b)) = (a, b) else {
            return Ok(None);
        };
        let delay = match node.args.get(2) {
            Some(arg) => match self.arg_value(arg)?.as_i64() {
                Some(d) => d,
                None => return Ok(None),
            },
            None => 0,
        };
        let first = if kind.uses_end_of_first() { a.1 } else { a.0 };
        let Some(lhs) = first.checked_add(delay) else {
            return Ok(Some(false));
        };
        let rhs = if kind.uses_end_of_second() { b.1 } else { b.0 };
        Ok(Some(if kind.is_equality() {
            lhs == rhs
        } else {
            lhs <= rhs
        }))
    }

    fn intervals(&mut self, id: NodeId, node: &NodeData, items: &[Arg]) -> Result<Vec<Option<(i64, i64)>>> {
        items
            .iter()
            .map(|item| self.interval_arg(id, node, item))
            .collect()
    }

    fn alternative(&mut self, id: NodeId, node: &NodeData) -> Result<bool> {
        let main = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
        let options = self.intervals(id, node, Self::list(id, node, 1)?)?;
        let present: Vec<(i64, i64)> = options.into_iter().flatten().collect();
        Ok(match main {
            None => present.is_empty(),
            Some(main) => present.len() == 1 && present[0] == main,
        })
    }

    fn span(&mut self, id: NodeId, node: &NodeData) -> Result<bool> {
        let main = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
        let covered = self.intervals(id, node, Self::list(id, node, 1)?)?;
        let present: Vec<(i64, i64)> = covered.into_iter().flatten().collect();
        Ok(match main {
            None => present.is_empty(),
            Some((start, end)) => {
                let min_start = present.iter().map(|iv| iv.0).min();
                let max_end = present.iter().map(|iv| iv.1).max();
                min_start == Some(start) && max_end == Some(end)
            }
        })
    }

    fn no_overlap(&mut self, id: NodeId, node: &NodeData) -> Result<bool> {
        let model = self.model;
        let first = Self::arg(id, node, 0)?;
        let (items, types): (&[Arg], Option<&Vec<i64>>) = match first {
            Arg::List(items) => (items, None),
            Arg::Node(seq_id) => {
                let seq = model.node(*seq_id)?;
                let items = seq
                    .args
                    .first()
                    .and_then(Arg::as_list)
                    .ok_or_else(|| Self::malformed(*seq_id, seq, "sequence without intervals"))?;
                (items, seq.values.as_ref().and_then(|v| v.first()))
            }
            _ => return Err(Self::malformed(id, node, "expected intervals or a sequence")),
        };
        let intervals = self.intervals(id, node, items)?;
        let matrix = node.values.as_ref();
        let kind_of = |i: usize| {
            types
                .and_then(|t| t.get(i))
                .map_or(i, |t| usize::try_from(*t).unwrap_or(i))
        };
        let gap = |i: usize, j: usize| -> i64 {
            matrix
                .and_then(|m| m.get(kind_of(i)))
                .and_then(|row| row.get(kind_of(j)))
                .copied()
                .unwrap_or(0)
        };
        for i in 0..intervals.len() {
            for j in (i + 1)..intervals.len() {
                let (Some(a), Some(b)) = (intervals[i], intervals[j]) else {
                    continue;
                };
                let a_first = a.1.checked_add(gap(i, j)).is_some_and(|e| e <= b.0);
                let b_first = b.1.checked_add(gap(j, i)).is_some_and(|e| e <= a.0);
                if !a_first && !b_first {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn forbid(&mut self, id: NodeId, node: &NodeData) -> Result<Option<bool>> {
        let interval = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
        let points = self.step_points(Self::arg(id, node, 1)?)?;
        let Some((start, end)) = interval else {
            return Ok(None);
        };
        Ok(Some(match node.func {
            Func::ForbidStart => points.at(start) != 0,
            Func::ForbidEnd => end.checked_sub(1).is_some_and(|t| points.at(t) != 0),
            _ if end <= start => points.at(start) != 0,
            _ => points.nonzero_over(start, end),
        }))
    }

    // ========================================================================
    // Domains
    // ========================================================================

    pub(crate) fn check_domain(&mut self, id: NodeId) -> Result<()> {
        let model = self.model;
        let node = model.node(id)?;
        if node.func == Func::SequenceVar {
            return Ok(());
        }
        let value = self.value(id)?;
        let presence = node.presence.unwrap_or(model::Presence::Present);
        let domain_err = |detail: String| EvalError::Domain { node: id, detail };
        match (presence, value.is_absent()) {
            (model::Presence::Present, true) => return Err(domain_err("present variable is absent".into())),
            (model::Presence::Absent, false) => return Err(domain_err("absent variable is present".into())),
            (_, true) => return Ok(()),
            _ => {}
        }
        let b = &node.bounds;
        let within = |what: &str, v: i64, lo: Option<i64>, hi: Option<i64>, dlo: i64, dhi: i64| {
            let (lo, hi) = (lo.unwrap_or(dlo), hi.unwrap_or(dhi));
            if v < lo || v > hi {
                Err(domain_err(format!("{what} {v} outside [{lo}, {hi}]")))
            } else {
                Ok(())
            }
        };
        match (node.func, value) {
            (Func::IntVar, Value::Int(v)) => within(
                "value",
                v,
                b.min.map(|m| m as i64),
                b.max.map(|m| m as i64),
                INT_VAR_MIN,
                INT_VAR_MAX,
            ),
            (Func::FloatVar, Value::Float(v)) => {
                let lo = b.min.unwrap_or(f64::MIN);
                let hi = b.max.unwrap_or(f64::MAX);
                if v < lo || v > hi {
                    Err(domain_err(format!("value {v} outside [{lo}, {hi}]")))
                } else {
                    Ok(())
                }
            }
            (Func::IntervalVar, Value::Interval { start, end }) => {
                within("start", start, b.start_min, b.start_max, INTERVAL_MIN, INTERVAL_MAX)?;
                within("end", end, b.end_min, b.end_max, INTERVAL_MIN, INTERVAL_MAX)?;
                let length = end
                    .checked_sub(start)
                    .ok_or_else(|| domain_err(format!("length of [{start}, {end}) overflows")))?;
                within("length", length, b.length_min, b.length_max, 0, LENGTH_MAX)
            }
            _ => Ok(()),
        }
    }
}
