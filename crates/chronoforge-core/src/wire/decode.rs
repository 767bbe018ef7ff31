use serde::de::DeserializeOwned;

use super::messages::{
    Command, DomainsEvent, EngineMessage, LowerBoundEvent, SolutionEvent, WireArg, WireDomains,
    WireEvent, WireModel, WireNode, WireSolution, WireValue,
};
use super::{Result, WireError};
use crate::domains::ModelDomains;
use crate::error::ModelError;
use crate::model::{
    check_step_points, check_transitions, sequence_transition_size, Arg, Bounds, Func, Model,
    NodeData, NodeId, Objective, RefId,
};
use crate::solution::{Solution, SolutionValue};

#[derive(Clone, Copy)]
enum Slot {
    Pending,
    Visiting,
    Done(NodeId),
}

/// Rebuilds a model from its record.
///
/// References are resolved depth first so that every node is inserted after
/// its operands; a reference back to a node still being resolved is a cycle.
struct ModelDecoder<'w> {
    wire: &'w WireModel,
    model: Model,
    slots: Vec<Slot>,
}

impl<'w> ModelDecoder<'w> {
    fn resolve_ref(&mut self, id: RefId) -> Result<NodeId> {
        let wire = self.wire;
        let slot = self
            .slots
            .get(id.index())
            .copied()
            .ok_or(WireError::DanglingRef(id.0))?;
        match slot {
            Slot::Done(node) => Ok(node),
            Slot::Visiting => Err(WireError::Cycle(id.0)),
            Slot::Pending => {
                self.slots[id.index()] = Slot::Visiting;
                let node = self.build_node(&wire.refs[id.index()])?;
                self.slots[id.index()] = Slot::Done(node);
                Ok(node)
            }
        }
    }

    fn arg(&mut self, arg: &WireArg) -> Result<Arg> {
        Ok(match arg {
            WireArg::Ref { id } => Arg::Node(self.resolve_ref(*id)?),
            WireArg::Inline { arg } => Arg::Node(self.build_node(arg)?),
            WireArg::Bool(b) => Arg::Bool(*b),
            WireArg::Int(v) => Arg::Int(*v),
            WireArg::Float(v) => Arg::Float(*v),
            WireArg::List(items) => Arg::List(
                items
                    .iter()
                    .map(|item| self.arg(item))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn node_arg(&mut self, arg: &WireArg) -> Result<NodeId> {
        match self.arg(arg)? {
            Arg::Node(id) => Ok(id),
            other => Err(WireError::Malformed(format!(
                "expected a node reference, found {other:?}"
            ))),
        }
    }

    fn build_node(&mut self, wire: &WireNode) -> Result<NodeId> {
        let args = wire
            .args
            .iter()
            .map(|arg| self.arg(arg))
            .collect::<Result<Vec<_>>>()?;
        let arity = wire.func.arity();
        if !arity.contains(&args.len()) {
            return Err(ModelError::Arity {
                func: wire.func,
                expected: *arity.start(),
                actual: args.len(),
            }
            .into());
        }
        self.check_values(wire, &args)?;

        let mut data = NodeData::new(wire.func, args);
        data.name = wire.name.clone();
        data.presence = wire.status;
        data.bounds = Bounds {
            min: wire.min,
            max: wire.max,
            start_min: wire.start_min,
            start_max: wire.start_max,
            end_min: wire.end_min,
            end_max: wire.end_max,
            length_min: wire.length_min,
            length_max: wire.length_max,
        };
        data.values = wire.values.clone();
        let id = self.model.insert_decoded(data);
        if wire.func.is_constant() {
            self.model.restore_constant(id);
        }
        Ok(id)
    }

    fn check_values(&self, wire: &WireNode, args: &[Arg]) -> Result<()> {
        let Some(values) = &wire.values else {
            return Ok(());
        };
        match wire.func {
            Func::IntStepFunction => check_step_points(values)?,
            Func::NoOverlap => {
                let size = match args.first() {
                    Some(Arg::List(items)) => items.len(),
                    Some(Arg::Node(seq)) => sequence_transition_size(self.model.node(*seq)?),
                    _ => 0,
                };
                check_transitions(values, size)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Model> {
        let wire = self.wire;
        for i in 0..wire.refs.len() {
            self.resolve_ref(RefId(i as u32))?;
        }
        let refs = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Done(id) => Ok(*id),
                _ => Err(WireError::Malformed("unresolved reference".into())),
            })
            .collect::<Result<Vec<_>>>()?;
        self.model.restore_refs(refs);

        for arg in &wire.model {
            let id = self.node_arg(arg)?;
            self.model.restore_top_level(id);
        }
        if let Some(objective) = &wire.objective {
            let expr = self.node_arg(&objective.expr)?;
            self.model.materialize(expr);
            self.model.restore_objective(Objective {
                sense: objective.sense,
                expr,
            });
        }

        self.model.materialize_named();
        Ok(self.model)
    }
}

/// Reconstructs a model from its wire record.
pub fn decode_model(wire: &WireModel) -> Result<Model> {
    let mut model = Model::new();
    if let Some(name) = &wire.name {
        model.set_name(name.clone());
    }
    ModelDecoder {
        wire,
        model,
        slots: vec![Slot::Pending; wire.refs.len()],
    }
    .finish()
}

/// Maps a materialized id back to a variable of `model`.
fn variable_node(model: &Model, id: RefId) -> Result<(NodeId, Func)> {
    let node = model.node_by_ref(id).ok_or(WireError::UnknownId(id.0))?;
    let func = model.node(node)?.func;
    if !func.is_variable() {
        return Err(WireError::UnknownId(id.0));
    }
    Ok((node, func))
}

fn decode_values(model: &Model, values: &[WireValue], solution: &mut Solution) -> Result<()> {
    for WireValue { id, value } in values {
        let (node, func) = variable_node(model, *id)?;
        let value = match (func, *value) {
            (Func::FloatVar, SolutionValue::Int(v)) => SolutionValue::Float(v as f64),
            (Func::BoolVar, SolutionValue::Int(v)) => SolutionValue::Bool(v != 0),
            (_, value) => value,
        };
        solution.set_value(node, value);
    }
    Ok(())
}

/// Decodes a solution record against the variables of `model`.
pub fn decode_solution(model: &Model, wire: &WireSolution) -> Result<Solution> {
    let mut solution = Solution::new();
    decode_values(model, &wire.values, &mut solution)?;
    solution.set_objective(crate::solution::ObjectiveValue::from_wire(wire.objective));
    Ok(solution)
}

pub fn decode_domains(model: &Model, wire: &WireDomains) -> Result<DomainsEvent> {
    if wire.infeasible {
        return Ok(DomainsEvent {
            duration: wire.duration,
            domains: None,
        });
    }
    let mut domains = ModelDomains::new();
    for entry in &wire.domains {
        let (node, _) = variable_node(model, entry.id)?;
        domains.insert(node, entry.domain);
    }
    Ok(DomainsEvent {
        duration: wire.duration,
        domains: Some(domains),
    })
}

/// Decodes one inbound line against the model the command was sent with.
///
/// A solution flagged `valid: false` is a protocol error: the engine reports
/// verification failures as errors, never as solutions.
pub fn decode_message(model: &Model, line: &str) -> Result<EngineMessage> {
    let event: WireEvent = serde_json::from_str(line)?;
    Ok(match event {
        WireEvent::Log { data } => EngineMessage::Log(data),
        WireEvent::Trace { data } => EngineMessage::Trace(data),
        WireEvent::Warning { data } => EngineMessage::Warning(data),
        WireEvent::Error { data } => EngineMessage::Error(data),
        WireEvent::Text { data } => EngineMessage::Text(data),
        WireEvent::Solution(event) => {
            if event.valid == Some(false) {
                return Err(WireError::InvalidSolution);
            }
            let mut solution = Solution::new();
            decode_values(model, &event.values, &mut solution)?;
            solution.set_objective(crate::solution::ObjectiveValue::from_wire(event.objective));
            EngineMessage::Solution(SolutionEvent {
                solve_time: event.solve_time,
                valid: event.valid,
                solution,
            })
        }
        WireEvent::LowerBound { solve_time, value } => {
            EngineMessage::LowerBound(LowerBoundEvent { solve_time, value })
        }
        WireEvent::Summary(summary) => EngineMessage::Summary(summary),
        WireEvent::Domains(domains) => EngineMessage::Domains(decode_domains(model, &domains)?),
    })
}

/// Command as seen by an engine, with the model already rebuilt.
#[derive(Debug, Clone)]
pub enum EngineRequest<P> {
    Solve {
        model: Model,
        parameters: P,
        warm_start: Option<Solution>,
    },
    Propagate {
        model: Model,
        parameters: P,
    },
    ToText {
        model: Model,
        parameters: P,
        warm_start: Option<Solution>,
    },
    Stop {
        reason: String,
    },
    /// External solution; decode it with [`decode_solution`] against the
    /// model of the running command.
    Solution(WireSolution),
}

/// Decodes one outbound line on the engine side.
pub fn decode_command<P: DeserializeOwned>(line: &str) -> Result<EngineRequest<P>> {
    let command: Command<P> = serde_json::from_str(line)?;
    Ok(match command {
        Command::Solve {
            model,
            parameters,
            warm_start,
        } => {
            let model = decode_model(&model)?;
            let warm_start = warm_start
                .map(|ws| decode_solution(&model, &ws))
                .transpose()?;
            EngineRequest::Solve {
                model,
                parameters,
                warm_start,
            }
        }
        Command::Propagate { model, parameters } => EngineRequest::Propagate {
            model: decode_model(&model)?,
            parameters,
        },
        Command::ToText {
            model,
            parameters,
            warm_start,
        } => {
            let model = decode_model(&model)?;
            let warm_start = warm_start
                .map(|ws| decode_solution(&model, &ws))
                .transpose()?;
            EngineRequest::ToText {
                model,
                parameters,
                warm_start,
            }
        }
        Command::Stop { reason } => EngineRequest::Stop { reason },
        Command::Solution { solution } => EngineRequest::Solution(solution),
    })
}
