//! Solutions: sparse variable assignments plus an objective value.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{BoolVar, FloatVar, IntVar, IntervalVar, Node, NodeId};

/// Value of one variable in a solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolutionValue {
    /// The variable is not part of the solution.
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Interval { start: i64, end: i64 },
}

impl SolutionValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, SolutionValue::Absent)
    }
}

impl Serialize for SolutionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SolutionValue::Absent => serializer.serialize_none(),
            SolutionValue::Bool(b) => serializer.serialize_bool(*b),
            SolutionValue::Int(v) => serializer.serialize_i64(*v),
            SolutionValue::Float(v) => serializer.serialize_f64(*v),
            SolutionValue::Interval { start, end } => {
                let mut s = serializer.serialize_struct("Interval", 2)?;
                s.serialize_field("start", start)?;
                s.serialize_field("end", end)?;
                s.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Interval { start: i64, end: i64 },
}

impl<'de> Deserialize<'de> for SolutionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawValue>::deserialize(deserializer)? {
            None => SolutionValue::Absent,
            Some(RawValue::Bool(b)) => SolutionValue::Bool(b),
            Some(RawValue::Int(v)) => SolutionValue::Int(v),
            Some(RawValue::Float(v)) => SolutionValue::Float(v),
            Some(RawValue::Interval { start, end }) => SolutionValue::Interval { start, end },
        })
    }
}

/// Objective of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ObjectiveValue {
    /// The model has no objective.
    #[default]
    Undefined,
    /// The objective expression is absent in this solution.
    Absent,
    Value(f64),
}

impl ObjectiveValue {
    pub fn value(self) -> Option<f64> {
        match self {
            ObjectiveValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ObjectiveValue::Undefined)
    }

    /// Wire form: `None` when undefined, `Some(None)` when absent.
    pub fn to_wire(self) -> Option<Option<f64>> {
        match self {
            ObjectiveValue::Undefined => None,
            ObjectiveValue::Absent => Some(None),
            ObjectiveValue::Value(v) => Some(Some(v)),
        }
    }

    pub fn from_wire(value: Option<Option<f64>>) -> Self {
        match value {
            None => ObjectiveValue::Undefined,
            Some(None) => ObjectiveValue::Absent,
            Some(Some(v)) => ObjectiveValue::Value(v),
        }
    }
}

impl Serialize for ObjectiveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value() {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_none(),
        }
    }
}

/// Sparse assignment of values to the variables of one model.
///
/// A solution is built empty for warm starts and external injection, or
/// decoded from an engine message against the model it belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    values: BTreeMap<NodeId, SolutionValue>,
    objective: ObjectiveValue,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objective(&self) -> ObjectiveValue {
        self.objective
    }

    pub fn set_objective(&mut self, objective: ObjectiveValue) {
        self.objective = objective;
    }

    pub fn set_value(&mut self, node: impl Node, value: SolutionValue) {
        self.values.insert(node.node(), value);
    }

    pub fn set_int(&mut self, var: IntVar, value: i64) {
        self.set_value(var, SolutionValue::Int(value));
    }

    pub fn set_bool(&mut self, var: BoolVar, value: bool) {
        self.set_value(var, SolutionValue::Bool(value));
    }

    pub fn set_float(&mut self, var: FloatVar, value: f64) {
        self.set_value(var, SolutionValue::Float(value));
    }

    pub fn set_interval(&mut self, var: IntervalVar, start: i64, end: i64) {
        self.set_value(var, SolutionValue::Interval { start, end });
    }

    pub fn set_absent(&mut self, node: impl Node) {
        self.set_value(node, SolutionValue::Absent);
    }

    pub fn value(&self, node: impl Node) -> Option<SolutionValue> {
        self.values.get(&node.node()).copied()
    }

    /// Whether the variable is assigned and absent.
    pub fn is_absent(&self, node: impl Node) -> bool {
        self.value(node).is_some_and(|v| v.is_absent())
    }

    pub fn is_present(&self, node: impl Node) -> bool {
        self.value(node).is_some_and(|v| !v.is_absent())
    }

    pub fn get_int(&self, var: IntVar) -> Option<i64> {
        match self.value(var)? {
            SolutionValue::Int(v) => Some(v),
            SolutionValue::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    pub fn get_bool(&self, var: BoolVar) -> Option<bool> {
        match self.value(var)? {
            SolutionValue::Bool(b) => Some(b),
            SolutionValue::Int(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn get_float(&self, var: FloatVar) -> Option<f64> {
        match self.value(var)? {
            SolutionValue::Float(v) => Some(v),
            SolutionValue::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn get_start(&self, var: IntervalVar) -> Option<i64> {
        match self.value(var)? {
            SolutionValue::Interval { start, .. } => Some(start),
            _ => None,
        }
    }

    pub fn get_end(&self, var: IntervalVar) -> Option<i64> {
        match self.value(var)? {
            SolutionValue::Interval { end, .. } => Some(end),
            _ => None,
        }
    }

    pub fn get_length(&self, var: IntervalVar) -> Option<i64> {
        match self.value(var)? {
            SolutionValue::Interval { start, end } => Some(end - start),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, SolutionValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct ValuesByIndex<'a>(&'a BTreeMap<NodeId, SolutionValue>);

impl Serialize for ValuesByIndex<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, value) in self.0 {
            map.serialize_entry(&id.index(), value)?;
        }
        map.end()
    }
}

/// Serializes values keyed by arena index. Use the wire codec for the
/// engine-facing form keyed by materialized id.
impl Serialize for Solution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.objective.is_undefined() { 1 } else { 2 };
        let mut s = serializer.serialize_struct("Solution", fields)?;
        if !self.objective.is_undefined() {
            s.serialize_field("objective", &self.objective)?;
        }
        s.serialize_field("values", &ValuesByIndex(&self.values))?;
        s.end()
    }
}
