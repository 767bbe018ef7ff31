//! Variable domains reported by propagation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{IntervalVar, Node, NodeId, Presence};

/// Domain of one variable after propagation.
///
/// Numeric variables fill `min`/`max`; interval variables fill the
/// start, end and length fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
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
}

impl Domain {
    pub fn is_absent(&self) -> bool {
        self.presence == Some(Presence::Absent)
    }
}

/// Domains of all variables of a model, keyed by node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDomains {
    domains: BTreeMap<NodeId, Domain>,
}

impl ModelDomains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: impl Node, domain: Domain) {
        self.domains.insert(node.node(), domain);
    }

    pub fn get(&self, node: impl Node) -> Option<&Domain> {
        self.domains.get(&node.node())
    }

    /// `(start_min, start_max)` of a present-capable interval.
    pub fn start_range(&self, var: IntervalVar) -> Option<(i64, i64)> {
        let d = self.get(var)?;
        Some((d.start_min?, d.start_max?))
    }

    pub fn end_range(&self, var: IntervalVar) -> Option<(i64, i64)> {
        let d = self.get(var)?;
        Some((d.end_min?, d.end_max?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Domain)> + '_ {
        self.domains.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
