//! Typed handles over node ids and the operand conversions used by the
//! modeling vocabulary.
//!
//! Handles are `Copy` newtypes around [`NodeId`]. Capability traits layer the
//! allowed operations: every [`BoolValued`] handle is also [`IntValued`], and
//! every [`IntValued`] handle is also [`FloatValued`].

use super::node::NodeId;

/// Anything backed by a node of a model.
pub trait Node: Copy {
    fn node(self) -> NodeId;
}

impl Node for NodeId {
    fn node(self) -> NodeId {
        self
    }
}

/// Handles usable as float operands.
pub trait FloatValued: Node {}

/// Handles usable as integer operands.
pub trait IntValued: FloatValued {}

/// Handles usable as boolean operands (true = 1, false = 0).
pub trait BoolValued: IntValued {}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) NodeId);

        impl $name {
            pub fn id(self) -> NodeId {
                self.0
            }
        }

        impl Node for $name {
            fn node(self) -> NodeId {
                self.0
            }
        }
    };
}

handle!(
    /// Float-valued expression.
    FloatExpr
);
handle!(
    /// Integer-valued expression.
    IntExpr
);
handle!(
    /// Boolean-valued expression.
    BoolExpr
);
handle!(
    /// Integer decision variable.
    IntVar
);
handle!(
    /// Boolean decision variable.
    BoolVar
);
handle!(
    /// Float decision variable.
    FloatVar
);
handle!(
    /// Interval decision variable with start, end, length and presence.
    IntervalVar
);
handle!(
    /// Ordering of a set of interval variables.
    SequenceVar
);
handle!(
    /// Cumulative function built from pulses and steps.
    CumulExpr
);
handle!(
    /// Piecewise-constant integer function.
    IntStepFunction
);
handle!(
    /// Constraint node added to the model's top-level list.
    Constraint
);

impl FloatValued for FloatExpr {}
impl FloatValued for FloatVar {}
impl FloatValued for IntExpr {}
impl FloatValued for IntVar {}
impl FloatValued for BoolExpr {}
impl FloatValued for BoolVar {}

impl IntValued for IntExpr {}
impl IntValued for IntVar {}
impl IntValued for BoolExpr {}
impl IntValued for BoolVar {}

impl BoolValued for BoolExpr {}
impl BoolValued for BoolVar {}

impl From<IntVar> for IntExpr {
    fn from(v: IntVar) -> Self {
        IntExpr(v.0)
    }
}

impl From<BoolVar> for BoolExpr {
    fn from(v: BoolVar) -> Self {
        BoolExpr(v.0)
    }
}

impl From<FloatVar> for FloatExpr {
    fn from(v: FloatVar) -> Self {
        FloatExpr(v.0)
    }
}

/// Integer operand: a literal or an integer-valued node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntOperand {
    Const(i64),
    Node(NodeId),
}

/// Float operand: an integer literal, a float literal or a numeric node.
///
/// Integer literals stay integral so that comparisons between integer
/// expressions and literals do not go through a float constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatOperand {
    Int(i64),
    Float(f64),
    Node(NodeId),
}

/// Boolean operand: a literal or a boolean-valued node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoolOperand {
    Const(bool),
    Node(NodeId),
}

impl From<i64> for IntOperand {
    fn from(v: i64) -> Self {
        IntOperand::Const(v)
    }
}

impl From<i32> for IntOperand {
    fn from(v: i32) -> Self {
        IntOperand::Const(i64::from(v))
    }
}

impl From<bool> for IntOperand {
    fn from(v: bool) -> Self {
        IntOperand::Const(i64::from(v))
    }
}

impl From<i64> for FloatOperand {
    fn from(v: i64) -> Self {
        FloatOperand::Int(v)
    }
}

impl From<i32> for FloatOperand {
    fn from(v: i32) -> Self {
        FloatOperand::Int(i64::from(v))
    }
}

impl From<f64> for FloatOperand {
    fn from(v: f64) -> Self {
        FloatOperand::Float(v)
    }
}

impl From<IntOperand> for FloatOperand {
    fn from(v: IntOperand) -> Self {
        match v {
            IntOperand::Const(c) => FloatOperand::Int(c),
            IntOperand::Node(id) => FloatOperand::Node(id),
        }
    }
}

impl From<bool> for BoolOperand {
    fn from(v: bool) -> Self {
        BoolOperand::Const(v)
    }
}

macro_rules! operand_from_handles {
    ($operand:ident: $($handle:ident),*) => {
        $(
            impl From<$handle> for $operand {
                fn from(h: $handle) -> Self {
                    $operand::Node(h.0)
                }
            }
        )*
    };
}

operand_from_handles!(IntOperand: IntExpr, IntVar, BoolExpr, BoolVar);
operand_from_handles!(FloatOperand: FloatExpr, FloatVar, IntExpr, IntVar, BoolExpr, BoolVar);
operand_from_handles!(BoolOperand: BoolExpr, BoolVar);
