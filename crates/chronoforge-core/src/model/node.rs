//! Node storage: identifiers, operator tags and the per-node record.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Stable identity of a node inside one model's arena.
///
/// The index never changes once assigned. The `model` tag lets the model
/// reject handles that were created by a different model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) model: u32,
    pub(crate) index: u32,
}

impl NodeId {
    /// Position of the node in the model's arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Materialized wire identity, assigned lazily in order of materialization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RefId(pub u32);

impl RefId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value kind produced by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Float,
    Interval,
    Sequence,
    Cumul,
    StepFunction,
    Constraint,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool expression",
            Kind::Int => "int expression",
            Kind::Float => "float expression",
            Kind::Interval => "interval variable",
            Kind::Sequence => "sequence variable",
            Kind::Cumul => "cumulative expression",
            Kind::StepFunction => "step function",
            Kind::Constraint => "constraint",
        }
    }

    /// Whether values of this kind can be used where a float is expected.
    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Bool | Kind::Int | Kind::Float)
    }

    /// Whether values of this kind can be used where an integer is expected.
    pub fn is_integral(self) -> bool {
        matches!(self, Kind::Bool | Kind::Int)
    }
}

macro_rules! funcs {
    ($($variant:ident => $tag:literal, $kind:ident, $arity:expr;)*) => {
        /// Operator tag of a node.
        ///
        /// Serializes as the camelCase wire tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Func {
            $(
                #[serde(rename = $tag)]
                $variant,
            )*
        }

        impl Func {
            /// Every operator, in declaration order.
            pub const ALL: &'static [Func] = &[$(Func::$variant),*];

            pub fn tag(self) -> &'static str {
                match self {
                    $(Func::$variant => $tag,)*
                }
            }

            /// Kind of the value this operator produces.
            pub fn kind(self) -> Kind {
                match self {
                    $(Func::$variant => Kind::$kind,)*
                }
            }

            /// Accepted number of arguments.
            pub fn arity(self) -> RangeInclusive<usize> {
                match self {
                    $(Func::$variant => $arity,)*
                }
            }

            pub fn from_tag(tag: &str) -> Option<Func> {
                match tag {
                    $($tag => Some(Func::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

funcs! {
    // Decision variables
    IntVar => "intVar", Int, 0..=0;
    BoolVar => "boolVar", Bool, 0..=0;
    FloatVar => "floatVar", Float, 0..=0;
    IntervalVar => "intervalVar", Interval, 0..=0;
    SequenceVar => "sequenceVar", Sequence, 1..=1;

    // Constants
    IntConst => "intConst", Int, 1..=1;
    FloatConst => "floatConst", Float, 1..=1;
    BoolConst => "boolConst", Bool, 1..=1;

    // Integer arithmetic
    IntPlus => "intPlus", Int, 2..=2;
    IntMinus => "intMinus", Int, 2..=2;
    IntTimes => "intTimes", Int, 2..=2;
    IntDiv => "intDiv", Int, 2..=2;
    IntNeg => "intNeg", Int, 1..=1;
    IntAbs => "intAbs", Int, 1..=1;
    IntMin2 => "intMin2", Int, 2..=2;
    IntMax2 => "intMax2", Int, 2..=2;
    IntSum => "intSum", Int, 1..=1;
    IntMin => "intMin", Int, 1..=1;
    IntMax => "intMax", Int, 1..=1;
    IntGuard => "intGuard", Int, 2..=2;

    // Float arithmetic
    FloatPlus => "floatPlus", Float, 2..=2;
    FloatMinus => "floatMinus", Float, 2..=2;
    FloatTimes => "floatTimes", Float, 2..=2;
    FloatDiv => "floatDiv", Float, 2..=2;
    FloatNeg => "floatNeg", Float, 1..=1;
    FloatAbs => "floatAbs", Float, 1..=1;
    FloatMin2 => "floatMin2", Float, 2..=2;
    FloatMax2 => "floatMax2", Float, 2..=2;
    FloatSum => "floatSum", Float, 1..=1;
    FloatMin => "floatMin", Float, 1..=1;
    FloatMax => "floatMax", Float, 1..=1;
    FloatGuard => "floatGuard", Float, 2..=2;

    // Presence and comparisons
    Presence => "presence", Bool, 1..=1;
    Identity => "identity", Bool, 2..=2;
    Eq => "eq", Bool, 2..=2;
    Ne => "ne", Bool, 2..=2;
    Lt => "lt", Bool, 2..=2;
    Le => "le", Bool, 2..=2;
    Gt => "gt", Bool, 2..=2;
    Ge => "ge", Bool, 2..=2;
    InRange => "inRange", Bool, 3..=3;

    // Booleans
    BoolAnd => "boolAnd", Bool, 2..=2;
    BoolOr => "boolOr", Bool, 2..=2;
    BoolNot => "boolNot", Bool, 1..=1;
    BoolImplies => "boolImplies", Bool, 2..=2;

    // Interval accessors
    StartOf => "startOf", Int, 1..=1;
    EndOf => "endOf", Int, 1..=1;
    LengthOf => "lengthOf", Int, 1..=1;
    StartOr => "startOr", Int, 2..=2;
    EndOr => "endOr", Int, 2..=2;
    LengthOr => "lengthOr", Int, 2..=2;

    // Precedences: [predecessor, successor, delay?]
    EndBeforeStart => "endBeforeStart", Constraint, 2..=3;
    EndBeforeEnd => "endBeforeEnd", Constraint, 2..=3;
    StartBeforeStart => "startBeforeStart", Constraint, 2..=3;
    StartBeforeEnd => "startBeforeEnd", Constraint, 2..=3;
    EndAtStart => "endAtStart", Constraint, 2..=3;
    EndAtEnd => "endAtEnd", Constraint, 2..=3;
    StartAtStart => "startAtStart", Constraint, 2..=3;
    StartAtEnd => "startAtEnd", Constraint, 2..=3;

    // Interval structure
    Alternative => "alternative", Constraint, 2..=2;
    Span => "span", Constraint, 2..=2;
    NoOverlap => "noOverlap", Constraint, 1..=1;

    // Cumulative functions
    Pulse => "pulse", Cumul, 2..=2;
    StepAtStart => "stepAtStart", Cumul, 2..=2;
    StepAtEnd => "stepAtEnd", Cumul, 2..=2;
    StepAt => "stepAt", Cumul, 2..=2;
    CumulPlus => "cumulPlus", Cumul, 2..=2;
    CumulMinus => "cumulMinus", Cumul, 2..=2;
    CumulNeg => "cumulNeg", Cumul, 1..=1;
    CumulSum => "cumulSum", Cumul, 1..=1;
    CumulLe => "cumulLe", Constraint, 2..=2;
    CumulGe => "cumulGe", Constraint, 2..=2;

    // Step functions
    IntStepFunction => "intStepFunction", StepFunction, 0..=0;
    StepFunctionEval => "stepFunctionEval", Int, 2..=2;
    StepFunctionSum => "stepFunctionSum", Int, 2..=2;
    ForbidExtent => "forbidExtent", Constraint, 2..=2;
    ForbidStart => "forbidStart", Constraint, 2..=2;
    ForbidEnd => "forbidEnd", Constraint, 2..=2;
}

impl Func {
    /// Whether nodes with this tag are decision variables.
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            Func::IntVar | Func::BoolVar | Func::FloatVar | Func::IntervalVar | Func::SequenceVar
        )
    }

    pub fn is_constant(self) -> bool {
        matches!(self, Func::IntConst | Func::FloatConst | Func::BoolConst)
    }

    /// Whether nodes with this tag are added to the top-level list on creation.
    pub fn is_constraint(self) -> bool {
        self.kind() == Kind::Constraint
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Presence status of an optional-capable variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Optional,
    Present,
    Absent,
}

/// Domain bound fields carried by variable nodes.
///
/// Unset fields leave the default domain to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub start_min: Option<i64>,
    pub start_max: Option<i64>,
    pub end_min: Option<i64>,
    pub end_max: Option<i64>,
    pub length_min: Option<i64>,
    pub length_max: Option<i64>,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        *self == Bounds::default()
    }
}

/// One argument of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Bool(bool),
    Node(NodeId),
    List(Vec<Arg>),
}

impl Arg {
    /// Visits every node referenced by this argument, depth first.
    pub fn for_each_node(&self, f: &mut impl FnMut(NodeId)) {
        match self {
            Arg::Node(id) => f(*id),
            Arg::List(items) => items.iter().for_each(|item| item.for_each_node(f)),
            Arg::Int(_) | Arg::Float(_) | Arg::Bool(_) => {}
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Arg::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arg]> {
        match self {
            Arg::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            Arg::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Arg::Int(v) => Some(*v as f64),
            Arg::Float(v) => Some(*v),
            Arg::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }
}

/// A single modeling element stored in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub func: Func,
    pub args: Vec<Arg>,
    pub name: Option<String>,
    pub presence: Option<Presence>,
    pub bounds: Bounds,
    /// Step function points or transition matrix, depending on `func`.
    pub values: Option<Vec<Vec<i64>>>,
    pub(crate) ref_id: Option<RefId>,
    pub(crate) uses: u32,
}

impl NodeData {
    pub fn new(func: Func, args: Vec<Arg>) -> Self {
        Self {
            func,
            args,
            name: None,
            presence: None,
            bounds: Bounds::default(),
            values: None,
            ref_id: None,
            uses: 0,
        }
    }

    pub fn kind(&self) -> Kind {
        self.func.kind()
    }

    /// Materialized id, if the node has one.
    pub fn ref_id(&self) -> Option<RefId> {
        self.ref_id
    }

    /// Number of parents (including the top-level list) using this node.
    pub fn uses(&self) -> u32 {
        self.uses
    }
}
