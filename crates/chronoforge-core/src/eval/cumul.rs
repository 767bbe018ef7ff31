//! Cumulative and step function evaluation.

use super::{EvalError, Evaluator, Result, Value};
use crate::model::{Arg, Func, NodeData, NodeId};

/// Points of an integer step function, sorted by x.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPoints(Vec<(i64, i64)>);

impl StepPoints {
    pub fn new(points: Vec<(i64, i64)>) -> Self {
        Self(points)
    }

    /// `y` of the last point with `x <= t`, 0 before the first point.
    pub fn at(&self, t: i64) -> i64 {
        let idx = self.0.partition_point(|(x, _)| *x <= t);
        if idx == 0 {
            0
        } else {
            self.0[idx - 1].1
        }
    }

    /// First breakpoint strictly after `t`.
    fn next_change(&self, t: i64) -> Option<i64> {
        let idx = self.0.partition_point(|(x, _)| *x <= t);
        self.0.get(idx).map(|(x, _)| *x)
    }

    /// Sum of the function over `[start, end)`.
    pub fn sum(&self, start: i64, end: i64) -> i64 {
        let mut total = 0i64;
        let mut t = start;
        while t < end {
            let segment_end = self.next_change(t).map_or(end, |x| x.min(end));
            total = total.saturating_add(self.at(t).saturating_mul(segment_end - t));
            t = segment_end;
        }
        total
    }

    /// Whether the function is non-zero everywhere in `[start, end)`.
    pub fn nonzero_over(&self, start: i64, end: i64) -> bool {
        let mut t = start;
        while t < end {
            if self.at(t) == 0 {
                return false;
            }
            t = self.next_change(t).map_or(end, |x| x.min(end));
        }
        true
    }
}

impl Evaluator<'_> {
    pub(crate) fn step_points(&mut self, arg: &Arg) -> Result<StepPoints> {
        let Arg::Node(id) = arg else {
            return Err(EvalError::ListAsScalar);
        };
        let node = self.model.node(*id)?;
        if node.func != Func::IntStepFunction {
            return Err(Self::malformed(*id, node, "expected a step function"));
        }
        let mut points = Vec::new();
        for point in node.values.iter().flatten() {
            match point.as_slice() {
                [x, y] => points.push((*x, *y)),
                _ => return Err(Self::malformed(*id, node, "step point is not [x, y]")),
            }
        }
        Ok(StepPoints::new(points))
    }

    /// Height changes `(time, delta)` contributed by a cumulative expression.
    pub(crate) fn cumul_events(&mut self, id: NodeId) -> Result<Vec<(i64, i64)>> {
        let model = self.model;
        let node = model.node(id)?;
        let height = |this: &mut Self| -> Result<Option<i64>> {
            let value = this.arg_value(Self::arg(id, node, 1)?)?;
            Ok(value.as_i64())
        };
        Ok(match node.func {
            Func::Pulse | Func::StepAtStart | Func::StepAtEnd => {
                let interval = self.interval_arg(id, node, Self::arg(id, node, 0)?)?;
                let (Some((start, end)), Some(h)) = (interval, height(self)?) else {
                    return Ok(Vec::new());
                };
                match node.func {
                    Func::Pulse => vec![(start, h), (end, -h)],
                    Func::StepAtStart => vec![(start, h)],
                    _ => vec![(end, h)],
                }
            }
            Func::StepAt => {
                let x = self.arg_value(Self::arg(id, node, 0)?)?;
                match (x.as_i64(), height(self)?) {
                    (Some(x), Some(h)) => vec![(x, h)],
                    _ => Vec::new(),
                }
            }
            Func::CumulPlus | Func::CumulMinus => {
                let mut events = self.cumul_child(id, node, 0)?;
                let mut rhs = self.cumul_child(id, node, 1)?;
                if node.func == Func::CumulMinus {
                    negate(&mut rhs);
                }
                events.append(&mut rhs);
                events
            }
            Func::CumulNeg => {
                let mut events = self.cumul_child(id, node, 0)?;
                negate(&mut events);
                events
            }
            Func::CumulSum => {
                let mut events = Vec::new();
                for item in Self::list(id, node, 0)? {
                    let Arg::Node(child) = item else {
                        return Err(Self::malformed(id, node, "cumulSum item is not a node"));
                    };
                    events.extend(self.cumul_events(*child)?);
                }
                events
            }
            _ => return Err(Self::malformed(id, node, "not a cumulative expression")),
        })
    }

    fn cumul_child(&mut self, id: NodeId, node: &NodeData, i: usize) -> Result<Vec<(i64, i64)>> {
        match Self::arg(id, node, i)? {
            Arg::Node(child) => self.cumul_events(*child),
            _ => Err(Self::malformed(id, node, format!("argument {i} is not a node"))),
        }
    }

    /// Checks the bound at every time point. The function is 0 before its
    /// first change, so that level counts too.
    pub(crate) fn cumul_bound(&mut self, id: NodeId, node: &NodeData) -> Result<bool> {
        let Arg::Node(f) = Self::arg(id, node, 0)? else {
            return Err(Self::malformed(id, node, "argument 0 is not a node"));
        };
        let bound = match self.arg_value(Self::arg(id, node, 1)?)? {
            Value::Absent => return Ok(true),
            value => value
                .as_i64()
                .ok_or_else(|| Self::malformed(id, node, "bound is not integral"))?,
        };
        let within = |level: i64| match node.func {
            Func::CumulLe => level <= bound,
            _ => level >= bound,
        };
        if !within(0) {
            return Ok(false);
        }

        let mut events = self.cumul_events(*f)?;
        events.sort_by_key(|(t, _)| *t);
        let mut level = 0i64;
        let mut i = 0;
        while i < events.len() {
            let t = events[i].0;
            while i < events.len() && events[i].0 == t {
                level = level.saturating_add(events[i].1);
                i += 1;
            }
            if !within(level) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn negate(events: &mut [(i64, i64)]) {
    for (_, delta) in events.iter_mut() {
        *delta = -*delta;
    }
}
