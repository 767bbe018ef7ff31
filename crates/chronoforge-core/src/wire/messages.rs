//! Serde shapes of the JSON-lines protocol.
//!
//! These types mirror the wire exactly. Conversion to and from [`Model`],
//! [`Solution`] and [`ModelDomains`] happens in the encoder and decoder,
//! which know the materialized id space.
//!
//! [`Model`]: crate::model::Model
//! [`Solution`]: crate::solution::Solution
//! [`ModelDomains`]: crate::domains::ModelDomains

use serde::{Deserialize, Deserializer, Serialize};

use crate::domains::{Domain, ModelDomains};
use crate::model::{Func, ObjectiveSense, Presence, RefId};
use crate::solution::{Solution, SolutionValue};

/// Deserializes a present field, keeping an explicit `null` as `Some(None)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// One node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub func: Func,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<WireArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Presence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<i64>>>,
}

/// One argument: a literal, a list, a reference or an inline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireArg {
    Ref {
        #[serde(rename = "ref")]
        id: RefId,
    },
    Inline {
        arg: Box<WireNode>,
    },
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<WireArg>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireObjective {
    pub sense: ObjectiveSense,
    pub expr: WireArg,
}

/// Model record: materialized nodes, top-level list and objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub refs: Vec<WireNode>,
    pub model: Vec<WireArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<WireObjective>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    pub id: RefId,
    pub value: SolutionValue,
}

/// Solution record. A missing `objective` is undefined, `null` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireSolution {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub objective: Option<Option<f64>>,
    pub values: Vec<WireValue>,
}

/// Outbound command, one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum Command<P> {
    Solve {
        model: WireModel,
        parameters: P,
        #[serde(rename = "warmStart", default, skip_serializing_if = "Option::is_none")]
        warm_start: Option<WireSolution>,
    },
    Propagate {
        model: WireModel,
        parameters: P,
    },
    ToText {
        model: WireModel,
        parameters: P,
        #[serde(rename = "warmStart", default, skip_serializing_if = "Option::is_none")]
        warm_start: Option<WireSolution>,
    },
    Stop {
        reason: String,
    },
    Solution {
        solution: WireSolution,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSolutionEvent {
    pub solve_time: f64,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub objective: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    pub values: Vec<WireValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDomain {
    pub id: RefId,
    #[serde(flatten)]
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDomains {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub infeasible: bool,
    pub duration: f64,
    #[serde(default)]
    pub domains: Vec<WireDomain>,
}

/// Final statistics of a solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveSummary {
    pub nb_solutions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_sense: Option<ObjectiveSense>,
    pub duration: f64,
    pub proof: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_branches: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_fails: Option<u64>,
    #[serde(
        rename = "nbLNSSteps",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nb_lns_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_restarts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_int_vars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_interval_vars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_constraints: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_workers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
}

/// Inbound event as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum WireEvent {
    Log {
        data: String,
    },
    Trace {
        data: String,
    },
    Warning {
        data: String,
    },
    Error {
        data: String,
    },
    Solution(WireSolutionEvent),
    #[serde(rename_all = "camelCase")]
    LowerBound {
        solve_time: f64,
        value: f64,
    },
    Summary(SolveSummary),
    Domains(WireDomains),
    Text {
        data: String,
    },
}

/// A solution reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionEvent {
    pub solve_time: f64,
    /// `Some(true)` when the engine verified the solution.
    pub valid: Option<bool>,
    pub solution: Solution,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowerBoundEvent {
    pub solve_time: f64,
    pub value: f64,
}

/// Propagation outcome. `domains` is `None` when the model is infeasible.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainsEvent {
    pub duration: f64,
    pub domains: Option<ModelDomains>,
}

/// Inbound event decoded against the model it refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    Log(String),
    Trace(String),
    Warning(String),
    Error(String),
    Solution(SolutionEvent),
    LowerBound(LowerBoundEvent),
    Summary(SolveSummary),
    Domains(DomainsEvent),
    Text(String),
}

impl EngineMessage {
    /// Whether this event ends the data stream of a command.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineMessage::Summary(_) | EngineMessage::Domains(_) | EngineMessage::Text(_)
        )
    }
}
