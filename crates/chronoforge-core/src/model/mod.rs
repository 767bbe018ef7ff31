//! The expression graph and the model that owns it.
//!
//! A [`Model`] stores every node in an arena. Nodes reference their operands
//! by [`NodeId`], so sharing a sub-expression between parents costs nothing
//! and cycles cannot be built through the public API.
//!
//! Nodes receive a materialized [`RefId`] lazily: on creation for decision
//! variables, and otherwise the first time a node is used for the second
//! time, is named, or becomes the objective. The wire codec inlines every node
//! without a `RefId`.

mod arith;
mod builders;
mod cumul;
mod handles;
mod interval;
mod node;


use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

pub use builders::{
    BoolVarBuilder, FloatVarBuilder, IntVarBuilder, IntervalVarBuilder, SequenceVarBuilder,
};
pub use handles::{
    BoolExpr, BoolOperand, BoolValued, BoolVar, Constraint, CumulExpr, FloatExpr, FloatOperand,
    FloatValued, FloatVar, IntExpr, IntOperand, IntStepFunction, IntValued, IntVar, IntervalVar,
    Node, SequenceVar,
};
pub use interval::PrecedenceKind;
pub(crate) use cumul::check_step_points;
pub(crate) use interval::{check_transitions, sequence_transition_size};
pub use node::{Arg, Bounds, Func, Kind, NodeData, NodeId, Presence, RefId};

use crate::error::{ModelError, Result};

/// Largest value of an integer variable.
pub const INT_VAR_MAX: i64 = 1_073_741_823;
/// Smallest value of an integer variable.
pub const INT_VAR_MIN: i64 = -INT_VAR_MAX;
/// Largest start or end of an interval variable.
pub const INTERVAL_MAX: i64 = 715_827_882;
/// Smallest start or end of an interval variable.
pub const INTERVAL_MIN: i64 = -INTERVAL_MAX;
/// Largest length of an interval variable.
pub const LENGTH_MAX: i64 = INTERVAL_MAX - INTERVAL_MIN;
/// Largest magnitude of a float variable bound.
pub const FLOAT_VAR_MAX: f64 = f64::MAX;

static NEXT_MODEL_TAG: AtomicU32 = AtomicU32::new(1);

/// Float literals must survive JSON, which has no NaN or infinity.
pub(crate) fn finite(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::OutOfRange {
            what,
            value,
            min: -FLOAT_VAR_MAX,
            max: FLOAT_VAR_MAX,
        })
    }
}

/// Direction of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// Objective of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: NodeId,
}

/// A scheduling model: the node arena, the top-level list and the objective.
///
/// Cloning a model keeps its identity, so handles created before the clone
/// remain valid on both copies.
#[derive(Debug, Clone)]
pub struct Model {
    tag: u32,
    name: Option<String>,
    nodes: Vec<NodeData>,
    refs: Vec<NodeId>,
    top_level: Vec<NodeId>,
    objective: Option<Objective>,
    int_consts: HashMap<i64, NodeId>,
    float_consts: HashMap<u64, NodeId>,
    bool_consts: [Option<NodeId>; 2],
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            tag: NEXT_MODEL_TAG.fetch_add(1, Ordering::Relaxed),
            name: None,
            nodes: Vec::new(),
            refs: Vec::new(),
            top_level: Vec::new(),
            objective: None,
            int_consts: HashMap::new(),
            float_consts: HashMap::new(),
            bool_consts: [None, None],
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut model = Self::new();
        model.name = Some(name.into());
        model
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// All nodes, indexed by [`NodeId::index`].
    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    /// Nodes with their ids, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeData)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (self.id_at(i), n))
    }

    /// Nodes with a materialized id, ordered by that id.
    pub fn refs(&self) -> &[NodeId] {
        &self.refs
    }

    /// Constraints and expressions added to the model itself.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn objective(&self) -> Option<Objective> {
        self.objective
    }

    /// Looks up a node, rejecting ids from other models.
    pub fn node(&self, id: NodeId) -> Result<&NodeData> {
        if id.model != self.tag {
            return Err(ModelError::UnknownNode(id));
        }
        self.nodes.get(id.index()).ok_or(ModelError::UnknownNode(id))
    }

    pub fn ref_id(&self, id: impl Node) -> Option<RefId> {
        self.node(id.node()).ok().and_then(|n| n.ref_id)
    }

    /// Node holding the given materialized id.
    pub fn node_by_ref(&self, id: RefId) -> Option<NodeId> {
        self.refs.get(id.index()).copied()
    }

    /// Decision variables in creation order.
    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, n)| n.func.is_variable())
            .map(|(id, _)| id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name.as_deref() == Some(name))
            .map(|i| self.id_at(i))
    }

    pub fn interval_var_by_name(&self, name: &str) -> Option<IntervalVar> {
        self.node_by_name(name)
            .filter(|id| self.nodes[id.index()].func == Func::IntervalVar)
            .map(IntervalVar)
    }

    /// Names a node. Named nodes are always materialized.
    pub fn set_node_name(&mut self, node: impl Node, name: impl Into<String>) -> Result<()> {
        let id = node.node();
        self.node(id)?;
        self.nodes[id.index()].name = Some(name.into());
        self.materialize(id);
        Ok(())
    }

    /// Adds a boolean expression to the top-level list as a constraint.
    pub fn constraint(&mut self, expr: impl Into<BoolOperand>) -> Result<()> {
        let id = self.bool_operand(expr.into())?;
        self.add_top_level(id);
        Ok(())
    }

    pub fn minimize(&mut self, expr: impl Into<FloatOperand>) -> Result<()> {
        self.set_objective(ObjectiveSense::Minimize, expr.into())
    }

    pub fn maximize(&mut self, expr: impl Into<FloatOperand>) -> Result<()> {
        self.set_objective(ObjectiveSense::Maximize, expr.into())
    }

    fn set_objective(&mut self, sense: ObjectiveSense, expr: FloatOperand) -> Result<()> {
        let id = self.float_operand(expr)?;
        self.materialize(id);
        self.objective = Some(Objective { sense, expr: id });
        Ok(())
    }

    /// Shared constant node for an integer value.
    pub fn int_const(&mut self, value: i64) -> IntExpr {
        if let Some(id) = self.int_consts.get(&value) {
            return IntExpr(*id);
        }
        let id = self.push_raw(NodeData::new(Func::IntConst, vec![Arg::Int(value)]));
        self.int_consts.insert(value, id);
        IntExpr(id)
    }

    /// Shared constant node for a float value. NaN and infinities are
    /// rejected.
    pub fn float_const(&mut self, value: f64) -> Result<FloatExpr> {
        let value = finite("floatConst", value)?;
        if let Some(id) = self.float_consts.get(&value.to_bits()) {
            return Ok(FloatExpr(*id));
        }
        let id = self.push_raw(NodeData::new(Func::FloatConst, vec![Arg::Float(value)]));
        self.float_consts.insert(value.to_bits(), id);
        Ok(FloatExpr(id))
    }

    /// Shared constant node for a boolean value.
    pub fn bool_const(&mut self, value: bool) -> BoolExpr {
        let slot = usize::from(value);
        if let Some(id) = self.bool_consts[slot] {
            return BoolExpr(id);
        }
        let id = self.push_raw(NodeData::new(Func::BoolConst, vec![Arg::Bool(value)]));
        self.bool_consts[slot] = Some(id);
        BoolExpr(id)
    }

    // ========================================================================
    // Arena plumbing
    // ========================================================================

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            model: self.tag,
            index: index as u32,
        }
    }

    pub(crate) fn kind_of(&self, id: NodeId) -> Result<Kind> {
        self.node(id).map(NodeData::kind)
    }

    /// Checks that `id` belongs to this model and has an accepted kind.
    pub(crate) fn expect_kind(
        &self,
        id: NodeId,
        expected: &'static str,
        accept: impl Fn(Kind) -> bool,
    ) -> Result<()> {
        let kind = self.kind_of(id)?;
        if accept(kind) {
            Ok(())
        } else {
            Err(ModelError::KindMismatch {
                node: id,
                expected,
                actual: kind.name(),
            })
        }
    }

    pub(crate) fn int_operand(&mut self, op: IntOperand) -> Result<NodeId> {
        match op {
            IntOperand::Const(v) => Ok(self.int_const(v).0),
            IntOperand::Node(id) => {
                self.expect_kind(id, "integer expression", Kind::is_integral)?;
                Ok(id)
            }
        }
    }

    pub(crate) fn float_operand(&mut self, op: FloatOperand) -> Result<NodeId> {
        match op {
            FloatOperand::Int(v) => Ok(self.int_const(v).0),
            FloatOperand::Float(v) => Ok(self.float_const(v)?.0),
            FloatOperand::Node(id) => {
                self.expect_kind(id, "numeric expression", Kind::is_numeric)?;
                Ok(id)
            }
        }
    }

    pub(crate) fn bool_operand(&mut self, op: BoolOperand) -> Result<NodeId> {
        match op {
            BoolOperand::Const(v) => Ok(self.bool_const(v).0),
            BoolOperand::Node(id) => {
                self.expect_kind(id, "boolean expression", |k| k == Kind::Bool)?;
                Ok(id)
            }
        }
    }

    /// Integer argument that stays a literal when given as a constant.
    pub(crate) fn int_arg(&mut self, op: IntOperand) -> Result<Arg> {
        match op {
            IntOperand::Const(v) => Ok(Arg::Int(v)),
            IntOperand::Node(_) => self.int_operand(op).map(Arg::Node),
        }
    }

    /// Appends a node without counting uses of its arguments.
    fn push_raw(&mut self, data: NodeData) -> NodeId {
        let id = self.id_at(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// Appends a node built by the modeling vocabulary.
    ///
    /// Every argument counts as one use. Variables are materialized at once
    /// and constraints join the top-level list.
    pub(crate) fn add(&mut self, data: NodeData) -> Result<NodeId> {
        let mut operands = Vec::new();
        for arg in &data.args {
            arg.for_each_node(&mut |id| operands.push(id));
        }
        for id in &operands {
            self.node(*id)?;
        }
        let func = data.func;
        let id = self.push_raw(data);
        for operand in operands {
            self.use_node(operand);
        }
        if func.is_variable() {
            self.materialize(id);
        }
        if func.is_constraint() {
            self.add_top_level(id);
        }
        Ok(id)
    }

    fn add_top_level(&mut self, id: NodeId) {
        self.top_level.push(id);
        self.use_node(id);
    }

    fn use_node(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        node.uses += 1;
        if node.uses >= 2 {
            self.materialize(id);
        }
    }

    /// Assigns the next materialized id unless the node already has one.
    pub(crate) fn materialize(&mut self, id: NodeId) -> RefId {
        if let Some(ref_id) = self.nodes[id.index()].ref_id {
            return ref_id;
        }
        let ref_id = RefId(self.refs.len() as u32);
        self.nodes[id.index()].ref_id = Some(ref_id);
        self.refs.push(id);
        ref_id
    }

    // ========================================================================
    // Reconstruction (used by the wire decoder)
    // ========================================================================

    /// Inserts a decoded node whose arguments were already inserted.
    pub(crate) fn insert_decoded(&mut self, mut data: NodeData) -> NodeId {
        data.ref_id = None;
        data.uses = 0;
        let mut operands = Vec::new();
        for arg in &data.args {
            arg.for_each_node(&mut |id| operands.push(id));
        }
        let id = self.push_raw(data);
        for operand in operands {
            self.nodes[operand.index()].uses += 1;
        }
        id
    }

    /// Records the decoded materialized ids in wire order.
    pub(crate) fn restore_refs(&mut self, refs: Vec<NodeId>) {
        for (i, id) in refs.iter().enumerate() {
            self.nodes[id.index()].ref_id = Some(RefId(i as u32));
        }
        self.refs = refs;
    }

    pub(crate) fn restore_top_level(&mut self, id: NodeId) {
        self.nodes[id.index()].uses += 1;
        self.top_level.push(id);
    }

    pub(crate) fn restore_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Materializes named nodes that a record inlined.
    pub(crate) fn materialize_named(&mut self) {
        let named: Vec<NodeId> = (0..self.nodes.len())
            .filter(|i| self.nodes[*i].name.is_some() && self.nodes[*i].ref_id.is_none())
            .map(|i| self.id_at(i))
            .collect();
        for id in named {
            self.materialize(id);
        }
    }

    pub(crate) fn restore_constant(&mut self, id: NodeId) {
        let data = &self.nodes[id.index()];
        match (data.func, data.args.first()) {
            (Func::IntConst, Some(Arg::Int(v))) => {
                self.int_consts.entry(*v).or_insert(id);
            }
            (Func::FloatConst, Some(Arg::Float(v))) => {
                self.float_consts.entry(v.to_bits()).or_insert(id);
            }
            (Func::BoolConst, Some(Arg::Bool(v))) => {
                let slot = usize::from(*v);
                self.bool_consts[slot].get_or_insert(id);
            }
            _ => {}
        }
    }
}
