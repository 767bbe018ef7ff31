//! Builders for decision variables.
//!
//! Bounds are validated in `build()`, so an out-of-range value is reported at
//! the call that creates the variable.

use super::handles::{BoolVar, FloatVar, IntVar, IntervalVar, SequenceVar};
use super::node::{Arg, Bounds, Func, Kind, NodeData, Presence};
use super::{finite, Model, INTERVAL_MAX, INTERVAL_MIN, INT_VAR_MAX, INT_VAR_MIN, LENGTH_MAX};
use crate::error::{ModelError, Result};

fn check_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(ModelError::OutOfRange {
            what,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_pair(
    what: &'static str,
    lo: Option<i64>,
    hi: Option<i64>,
    min: i64,
    max: i64,
) -> Result<()> {
    if let Some(lo) = lo {
        check_range(what, lo, min, max)?;
    }
    if let Some(hi) = hi {
        check_range(what, hi, min, max)?;
    }
    if let (Some(lo), Some(hi)) = (lo, hi) {
        if lo > hi {
            return Err(ModelError::InvalidBounds {
                what,
                min: lo as f64,
                max: hi as f64,
            });
        }
    }
    Ok(())
}

impl Model {
    pub fn int_var(&mut self) -> IntVarBuilder<'_> {
        IntVarBuilder {
            model: self,
            min: None,
            max: None,
            presence: None,
            name: None,
        }
    }

    pub fn bool_var(&mut self) -> BoolVarBuilder<'_> {
        BoolVarBuilder {
            model: self,
            presence: None,
            name: None,
        }
    }

    pub fn float_var(&mut self) -> FloatVarBuilder<'_> {
        FloatVarBuilder {
            model: self,
            min: None,
            max: None,
            presence: None,
            name: None,
        }
    }

    pub fn interval_var(&mut self) -> IntervalVarBuilder<'_> {
        IntervalVarBuilder {
            model: self,
            bounds: Bounds::default(),
            presence: None,
            name: None,
        }
    }

    /// Sequence over the given intervals.
    pub fn sequence_var(&mut self, intervals: &[IntervalVar]) -> SequenceVarBuilder<'_> {
        SequenceVarBuilder {
            model: self,
            intervals: intervals.to_vec(),
            types: None,
            name: None,
        }
    }

    fn finish_var(
        &mut self,
        mut data: NodeData,
        presence: Option<Presence>,
        name: Option<String>,
    ) -> Result<super::NodeId> {
        data.presence = presence;
        data.name = name;
        self.add(data)
    }
}

/// Builder returned by [`Model::int_var`].
pub struct IntVarBuilder<'m> {
    model: &'m mut Model,
    min: Option<i64>,
    max: Option<i64>,
    presence: Option<Presence>,
    name: Option<String>,
}

impl IntVarBuilder<'_> {
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: i64, max: i64) -> Self {
        self.min(min).max(max)
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<IntVar> {
        check_pair("intVar", self.min, self.max, INT_VAR_MIN, INT_VAR_MAX)?;
        let mut data = NodeData::new(Func::IntVar, Vec::new());
        data.bounds.min = self.min.map(|v| v as f64);
        data.bounds.max = self.max.map(|v| v as f64);
        self.model
            .finish_var(data, self.presence, self.name)
            .map(IntVar)
    }
}

/// Builder returned by [`Model::bool_var`].
pub struct BoolVarBuilder<'m> {
    model: &'m mut Model,
    presence: Option<Presence>,
    name: Option<String>,
}

impl BoolVarBuilder<'_> {
    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<BoolVar> {
        let data = NodeData::new(Func::BoolVar, Vec::new());
        self.model
            .finish_var(data, self.presence, self.name)
            .map(BoolVar)
    }
}

/// Builder returned by [`Model::float_var`].
pub struct FloatVarBuilder<'m> {
    model: &'m mut Model,
    min: Option<f64>,
    max: Option<f64>,
    presence: Option<Presence>,
    name: Option<String>,
}

impl FloatVarBuilder<'_> {
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<FloatVar> {
        for value in [self.min, self.max].into_iter().flatten() {
            finite("floatVar", value)?;
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ModelError::InvalidBounds {
                    what: "floatVar",
                    min,
                    max,
                });
            }
        }
        let mut data = NodeData::new(Func::FloatVar, Vec::new());
        data.bounds.min = self.min;
        data.bounds.max = self.max;
        self.model
            .finish_var(data, self.presence, self.name)
            .map(FloatVar)
    }
}

/// Builder returned by [`Model::interval_var`].
///
/// Intervals are present unless marked optional or absent.
pub struct IntervalVarBuilder<'m> {
    model: &'m mut Model,
    bounds: Bounds,
    presence: Option<Presence>,
    name: Option<String>,
}

impl IntervalVarBuilder<'_> {
    /// Fixes the start.
    pub fn start(self, start: i64) -> Self {
        self.start_range(start, start)
    }

    pub fn start_range(mut self, min: i64, max: i64) -> Self {
        self.bounds.start_min = Some(min);
        self.bounds.start_max = Some(max);
        self
    }

    pub fn start_min(mut self, min: i64) -> Self {
        self.bounds.start_min = Some(min);
        self
    }

    pub fn start_max(mut self, max: i64) -> Self {
        self.bounds.start_max = Some(max);
        self
    }

    /// Fixes the end.
    pub fn end(self, end: i64) -> Self {
        self.end_range(end, end)
    }

    pub fn end_range(mut self, min: i64, max: i64) -> Self {
        self.bounds.end_min = Some(min);
        self.bounds.end_max = Some(max);
        self
    }

    pub fn end_min(mut self, min: i64) -> Self {
        self.bounds.end_min = Some(min);
        self
    }

    pub fn end_max(mut self, max: i64) -> Self {
        self.bounds.end_max = Some(max);
        self
    }

    /// Fixes the length.
    pub fn length(self, length: i64) -> Self {
        self.length_range(length, length)
    }

    pub fn length_range(mut self, min: i64, max: i64) -> Self {
        self.bounds.length_min = Some(min);
        self.bounds.length_max = Some(max);
        self
    }

    pub fn length_min(mut self, min: i64) -> Self {
        self.bounds.length_min = Some(min);
        self
    }

    pub fn length_max(mut self, max: i64) -> Self {
        self.bounds.length_max = Some(max);
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<IntervalVar> {
        let b = &self.bounds;
        check_pair("start", b.start_min, b.start_max, INTERVAL_MIN, INTERVAL_MAX)?;
        check_pair("end", b.end_min, b.end_max, INTERVAL_MIN, INTERVAL_MAX)?;
        check_pair("length", b.length_min, b.length_max, 0, LENGTH_MAX)?;
        let mut data = NodeData::new(Func::IntervalVar, Vec::new());
        data.bounds = self.bounds;
        self.model
            .finish_var(data, self.presence, self.name)
            .map(IntervalVar)
    }
}

/// Builder returned by [`Model::sequence_var`].
pub struct SequenceVarBuilder<'m> {
    model: &'m mut Model,
    intervals: Vec<IntervalVar>,
    types: Option<Vec<i64>>,
    name: Option<String>,
}

impl SequenceVarBuilder<'_> {
    /// Assigns a transition type to each interval.
    pub fn types(mut self, types: Vec<i64>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<SequenceVar> {
        for iv in &self.intervals {
            self.model
                .expect_kind(iv.0, "interval variable", |k| k == Kind::Interval)?;
        }
        if let Some(types) = &self.types {
            if types.len() != self.intervals.len() {
                return Err(ModelError::Invalid(format!(
                    "sequence has {} intervals but {} types",
                    self.intervals.len(),
                    types.len()
                )));
            }
            if let Some(t) = types.iter().find(|t| **t < 0) {
                return Err(ModelError::Invalid(format!(
                    "sequence type {t} is negative"
                )));
            }
        }
        let list = self.intervals.iter().map(|iv| Arg::Node(iv.0)).collect();
        let mut data = NodeData::new(Func::SequenceVar, vec![Arg::List(list)]);
        data.values = self.types.map(|t| vec![t]);
        self.model
            .finish_var(data, None, self.name)
            .map(SequenceVar)
    }
}
