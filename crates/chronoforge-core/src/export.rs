//! Rust source export.
//!
//! [`to_rust_source`] prints a function that rebuilds a model through the
//! same builder calls that created it. Constant nodes are printed as
//! literals, which the builder turns back into shared constants.

use std::fmt::Write;

use crate::model::{self, Arg, Func, Kind, Model, NodeData, NodeId, ObjectiveSense};

struct SourceWriter<'m> {
    model: &'m Model,
    out: String,
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        "f64::NAN".into()
    } else if v.is_infinite() {
        let name = if v > 0.0 { "INFINITY" } else { "NEG_INFINITY" };
        format!("f64::{name}")
    } else {
        format!("{v:?}_f64")
    }
}

fn presence_call(presence: Option<model::Presence>) -> &'static str {
    match presence {
        None => "",
        Some(model::Presence::Optional) => ".optional()",
        Some(model::Presence::Present) => ".presence(Presence::Present)",
        Some(model::Presence::Absent) => ".presence(Presence::Absent)",
    }
}

fn var_name(id: NodeId) -> String {
    format!("n{}", id.index())
}

impl SourceWriter<'_> {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.model.node(id).ok()
    }

    /// Operand text: a literal for constants, the binding otherwise.
    fn operand(&self, arg: &Arg) -> String {
        match arg {
            Arg::Int(v) => format!("{v}_i64"),
            Arg::Float(v) => float_literal(*v),
            Arg::Bool(b) => b.to_string(),
            Arg::List(items) => {
                let items: Vec<String> = items.iter().map(|a| self.operand(a)).collect();
                format!("[{}]", items.join(", "))
            }
            Arg::Node(id) => match self.node(*id) {
                Some(node) if node.func.is_constant() => node
                    .args
                    .first()
                    .map_or_else(|| var_name(*id), |a| self.operand(a)),
                _ => var_name(*id),
            },
        }
    }

    fn float_operand(&self, arg: &Arg) -> String {
        match arg.as_f64() {
            Some(v) if !matches!(arg, Arg::Node(_)) => float_literal(v),
            _ => self.operand(arg),
        }
    }

    /// Aggregate operands wrapped in the operand type, since handles of
    /// different kinds can be mixed.
    fn operand_list(&self, arg: Option<&Arg>, operand: &str) -> String {
        let items: Vec<String> = arg
            .and_then(Arg::as_list)
            .unwrap_or_default()
            .iter()
            .map(|a| format!("{operand}::from({})", self.operand(a)))
            .collect();
        if items.is_empty() {
            return format!("Vec::<{operand}>::new()");
        }
        format!("[{}]", items.join(", "))
    }

    fn handle_list(&self, arg: Option<&Arg>) -> String {
        let items: Vec<String> = arg
            .and_then(Arg::as_list)
            .unwrap_or_default()
            .iter()
            .map(|a| self.operand(a))
            .collect();
        format!("&[{}]", items.join(", "))
    }

    fn matrix(values: &Option<Vec<Vec<i64>>>) -> String {
        match values {
            None => "None".into(),
            Some(rows) => {
                let rows: Vec<String> = rows.iter().map(|r| format!("vec!{r:?}")).collect();
                format!("Some(vec![{}])", rows.join(", "))
            }
        }
    }

    fn variable_call(&self, node: &NodeData) -> String {
        let b = &node.bounds;
        let mut call = String::new();
        match node.func {
            Func::IntVar => {
                call.push_str("m.int_var()");
                if let Some(min) = b.min {
                    let _ = write!(call, ".min({})", min as i64);
                }
                if let Some(max) = b.max {
                    let _ = write!(call, ".max({})", max as i64);
                }
            }
            Func::FloatVar => {
                call.push_str("m.float_var()");
                if let Some(min) = b.min {
                    let _ = write!(call, ".min({})", float_literal(min));
                }
                if let Some(max) = b.max {
                    let _ = write!(call, ".max({})", float_literal(max));
                }
            }
            Func::BoolVar => call.push_str("m.bool_var()"),
            Func::IntervalVar => {
                call.push_str("m.interval_var()");
                let fields = [
                    ("start_min", b.start_min),
                    ("start_max", b.start_max),
                    ("end_min", b.end_min),
                    ("end_max", b.end_max),
                    ("length_min", b.length_min),
                    ("length_max", b.length_max),
                ];
                for (setter, value) in fields {
                    if let Some(v) = value {
                        let _ = write!(call, ".{setter}({v})");
                    }
                }
            }
            _ => {
                let _ = write!(call, "m.sequence_var({})", self.handle_list(node.args.first()));
                if let Some(types) = node.values.as_ref().and_then(|v| v.first()) {
                    let _ = write!(call, ".types(vec!{types:?})");
                }
            }
        }
        call.push_str(presence_call(node.presence));
        if let Some(name) = &node.name {
            let _ = write!(call, ".name({name:?})");
        }
        call.push_str(".build()?");
        call
    }

    fn expression_call(&self, node: &NodeData) -> String {
        use Func::*;

        let a = |i: usize| node.args.get(i).map_or_else(String::new, |x| self.operand(x));
        let f = |i: usize| {
            node.args
                .get(i)
                .map_or_else(String::new, |x| self.float_operand(x))
        };
        let method = match node.func {
            IntPlus => "plus",
            IntMinus => "minus",
            IntTimes => "times",
            IntDiv => "div",
            IntNeg => "neg",
            IntAbs => "abs",
            IntMin2 => "min2",
            IntMax2 => "max2",
            IntGuard => "guard",
            FloatPlus => "float_plus",
            FloatMinus => "float_minus",
            FloatTimes => "float_times",
            FloatDiv => "float_div",
            FloatNeg => "float_neg",
            FloatAbs => "float_abs",
            FloatMin2 => "float_min2",
            FloatMax2 => "float_max2",
            FloatGuard => "float_guard",
            Presence => "presence",
            Identity => "identity",
            Eq => "eq",
            Ne => "ne",
            Lt => "lt",
            Le => "le",
            Gt => "gt",
            Ge => "ge",
            BoolAnd => "and",
            BoolOr => "or",
            BoolNot => "not",
            BoolImplies => "implies",
            StartOf => "start",
            EndOf => "end",
            LengthOf => "length",
            StartOr => "start_or",
            EndOr => "end_or",
            LengthOr => "length_or",
            EndBeforeStart => "end_before_start",
            EndBeforeEnd => "end_before_end",
            StartBeforeStart => "start_before_start",
            StartBeforeEnd => "start_before_end",
            EndAtStart => "end_at_start",
            EndAtEnd => "end_at_end",
            StartAtStart => "start_at_start",
            StartAtEnd => "start_at_end",
            Pulse => "pulse",
            StepAtStart => "step_at_start",
            StepAtEnd => "step_at_end",
            StepAt => "step_at",
            CumulPlus => "cumul_plus",
            CumulMinus => "cumul_minus",
            CumulNeg => "cumul_neg",
            CumulLe => "cumul_le",
            CumulGe => "cumul_ge",
            StepFunctionEval => "step_function_eval",
            StepFunctionSum => "step_function_sum",
            ForbidExtent => "forbid_extent",
            ForbidStart => "forbid_start",
            ForbidEnd => "forbid_end",

            IntSum | IntMin | IntMax => {
                let method = match node.func {
                    IntSum => "sum",
                    IntMin => "min",
                    _ => "max",
                };
                return format!(
                    "m.{method}({})?",
                    self.operand_list(node.args.first(), "IntOperand")
                );
            }
            FloatSum | FloatMin | FloatMax => {
                let method = match node.func {
                    FloatSum => "float_sum",
                    FloatMin => "float_min",
                    _ => "float_max",
                };
                return format!(
                    "m.{method}({})?",
                    self.operand_list(node.args.first(), "FloatOperand")
                );
            }
            InRange => return format!("m.in_range({}, {}, {})?", a(0), f(1), f(2)),
            Alternative | Span => {
                let method = if node.func == Alternative {
                    "alternative"
                } else {
                    "span"
                };
                return format!("m.{method}({}, {})?", a(0), self.handle_list(node.args.get(1)));
            }
            NoOverlap => {
                return match node.args.first() {
                    Some(Arg::List(_)) => format!(
                        "m.no_overlap({}, {})?",
                        self.handle_list(node.args.first()),
                        Self::matrix(&node.values)
                    ),
                    _ => format!(
                        "m.no_overlap_sequence({}, {})?",
                        a(0),
                        Self::matrix(&node.values)
                    ),
                };
            }
            CumulSum => {
                return format!("m.cumul_sum({})?", self.handle_list(node.args.first()));
            }
            IntStepFunction => {
                let points: Vec<String> = node
                    .values
                    .iter()
                    .flatten()
                    .map(|p| format!("({}, {})", p.first().unwrap_or(&0), p.get(1).unwrap_or(&0)))
                    .collect();
                return format!("m.step_function(&[{}])?", points.join(", "));
            }
            _ => return format!("m.int_const({})", a(0)),
        };

        let mut args: Vec<String> = (0..node.args.len()).map(a).collect();
        if matches!(node.func, FloatGuard) {
            args[1] = f(1);
        }
        // Precedences without a delay record two arguments.
        if node.func.kind() == Kind::Constraint
            && node.func.arity().end() == &3
            && node.args.len() == 2
        {
            args.push("0".into());
        }
        format!("m.{method}({})?", args.join(", "))
    }

    fn write(mut self) -> String {
        let model = self.model;
        let _ = writeln!(self.out, "use chronoforge_core::model::*;");
        let _ = writeln!(self.out, "use chronoforge_core::ModelError;");
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "#[allow(unused_variables)]");
        let _ = writeln!(self.out, "pub fn build_model() -> Result<Model, ModelError> {{");
        match model.name() {
            Some(name) => {
                let _ = writeln!(self.out, "    let mut m = Model::with_name({name:?});");
            }
            None => {
                let _ = writeln!(self.out, "    let mut m = Model::new();");
            }
        }

        for (id, node) in model.iter() {
            if node.func.is_constant() {
                continue;
            }
            let call = if node.func.is_variable() {
                self.variable_call(node)
            } else {
                self.expression_call(node)
            };
            let _ = writeln!(self.out, "    let {} = {call};", var_name(id));
            if !node.func.is_variable() {
                if let Some(name) = &node.name {
                    let _ = writeln!(
                        self.out,
                        "    m.set_node_name({}, {name:?})?;",
                        var_name(id)
                    );
                }
            }
        }

        for id in model.top_level() {
            let is_constraint = self.node(*id).is_some_and(|n| n.func.is_constraint());
            if !is_constraint {
                let _ = writeln!(
                    self.out,
                    "    m.constraint({})?;",
                    self.operand(&Arg::Node(*id))
                );
            }
        }
        if let Some(objective) = model.objective() {
            let method = match objective.sense {
                ObjectiveSense::Minimize => "minimize",
                ObjectiveSense::Maximize => "maximize",
            };
            let _ = writeln!(
                self.out,
                "    m.{method}({})?;",
                self.operand(&Arg::Node(objective.expr))
            );
        }
        let _ = writeln!(self.out, "    Ok(m)");
        let _ = writeln!(self.out, "}}");
        self.out
    }
}

/// Prints Rust source that rebuilds `model` with the builder API.
pub fn to_rust_source(model: &Model) -> String {
    SourceWriter {
        model,
        out: String::new(),
    }
    .write()
}
