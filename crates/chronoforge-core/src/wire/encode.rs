use serde::Serialize;

use super::messages::{
    Command, EngineMessage, WireArg, WireDomain, WireDomains, WireEvent, WireModel, WireNode,
    WireObjective, WireSolution, WireSolutionEvent, WireValue,
};
use super::{Result, WireError};
use crate::domains::ModelDomains;
use crate::model::{Arg, Model, NodeData, NodeId, RefId};
use crate::solution::Solution;

fn encode_arg(model: &Model, arg: &Arg) -> Result<WireArg> {
    Ok(match arg {
        Arg::Int(v) => WireArg::Int(*v),
        Arg::Float(v) => WireArg::Float(*v),
        Arg::Bool(b) => WireArg::Bool(*b),
        Arg::List(items) => WireArg::List(
            items
                .iter()
                .map(|item| encode_arg(model, item))
                .collect::<Result<_>>()?,
        ),
        Arg::Node(id) => encode_reference(model, *id)?,
    })
}

/// A materialized node becomes `{"ref":id}`, anything else is inlined.
fn encode_reference(model: &Model, id: NodeId) -> Result<WireArg> {
    let node = model.node(id)?;
    Ok(match node.ref_id() {
        Some(ref_id) => WireArg::Ref { id: ref_id },
        None => WireArg::Inline {
            arg: Box::new(encode_node(model, node)?),
        },
    })
}

fn encode_node(model: &Model, node: &NodeData) -> Result<WireNode> {
    let b = &node.bounds;
    Ok(WireNode {
        func: node.func,
        args: node
            .args
            .iter()
            .map(|arg| encode_arg(model, arg))
            .collect::<Result<_>>()?,
        name: node.name.clone(),
        status: node.presence,
        min: b.min,
        max: b.max,
        start_min: b.start_min,
        start_max: b.start_max,
        end_min: b.end_min,
        end_max: b.end_max,
        length_min: b.length_min,
        length_max: b.length_max,
        values: node.values.clone(),
    })
}

/// Builds the model record: materialized nodes in id order, the top-level
/// list and the objective.
pub fn encode_model(model: &Model) -> Result<WireModel> {
    let refs = model
        .refs()
        .iter()
        .map(|id| encode_node(model, model.node(*id)?))
        .collect::<Result<_>>()?;
    let top_level = model
        .top_level()
        .iter()
        .map(|id| encode_reference(model, *id))
        .collect::<Result<_>>()?;
    let objective = match model.objective() {
        Some(objective) => Some(WireObjective {
            sense: objective.sense,
            expr: encode_reference(model, objective.expr)?,
        }),
        None => None,
    };
    Ok(WireModel {
        name: model.name().map(str::to_owned),
        refs,
        model: top_level,
        objective,
    })
}

fn variable_ref(model: &Model, id: NodeId) -> Result<RefId> {
    let node = model.node(id)?;
    match node.ref_id() {
        Some(ref_id) if node.func.is_variable() => Ok(ref_id),
        _ => Err(WireError::Malformed(format!(
            "node {id} is not a variable and cannot carry a solution value"
        ))),
    }
}

/// Translates a solution into the materialized id space of `model`.
pub fn encode_solution(model: &Model, solution: &Solution) -> Result<WireSolution> {
    let values = solution
        .iter()
        .map(|(id, value)| {
            Ok(WireValue {
                id: variable_ref(model, id)?,
                value,
            })
        })
        .collect::<Result<_>>()?;
    Ok(WireSolution {
        objective: solution.objective().to_wire(),
        values,
    })
}

fn encode_domains(model: &Model, domains: &ModelDomains) -> Result<Vec<WireDomain>> {
    domains
        .iter()
        .map(|(id, domain)| {
            Ok(WireDomain {
                id: variable_ref(model, id)?,
                domain: *domain,
            })
        })
        .collect()
}

/// Serializes one command as a single line, without the trailing newline.
pub fn encode_command<P: Serialize>(command: &Command<P>) -> Result<String> {
    Ok(serde_json::to_string(command)?)
}

pub fn solve_command<P: Serialize>(
    model: &Model,
    parameters: &P,
    warm_start: Option<&Solution>,
) -> Result<String> {
    let warm_start = warm_start
        .map(|s| encode_solution(model, s))
        .transpose()?;
    encode_command(&Command::Solve {
        model: encode_model(model)?,
        parameters,
        warm_start,
    })
}

pub fn propagate_command<P: Serialize>(model: &Model, parameters: &P) -> Result<String> {
    encode_command(&Command::Propagate {
        model: encode_model(model)?,
        parameters,
    })
}

pub fn to_text_command<P: Serialize>(
    model: &Model,
    parameters: &P,
    warm_start: Option<&Solution>,
) -> Result<String> {
    let warm_start = warm_start
        .map(|s| encode_solution(model, s))
        .transpose()?;
    encode_command(&Command::ToText {
        model: encode_model(model)?,
        parameters,
        warm_start,
    })
}

pub fn stop_command(reason: &str) -> Result<String> {
    encode_command(&Command::<()>::Stop {
        reason: reason.to_owned(),
    })
}

pub fn solution_command(model: &Model, solution: &Solution) -> Result<String> {
    encode_command(&Command::<()>::Solution {
        solution: encode_solution(model, solution)?,
    })
}

/// Serializes an engine event. Engines and test doubles use this to speak
/// the protocol back to a session.
pub fn encode_event(model: &Model, message: &EngineMessage) -> Result<String> {
    let event = match message {
        EngineMessage::Log(data) => WireEvent::Log { data: data.clone() },
        EngineMessage::Trace(data) => WireEvent::Trace { data: data.clone() },
        EngineMessage::Warning(data) => WireEvent::Warning { data: data.clone() },
        EngineMessage::Error(data) => WireEvent::Error { data: data.clone() },
        EngineMessage::Text(data) => WireEvent::Text { data: data.clone() },
        EngineMessage::Solution(event) => {
            let solution = encode_solution(model, &event.solution)?;
            WireEvent::Solution(WireSolutionEvent {
                solve_time: event.solve_time,
                objective: solution.objective,
                valid: event.valid,
                values: solution.values,
            })
        }
        EngineMessage::LowerBound(event) => WireEvent::LowerBound {
            solve_time: event.solve_time,
            value: event.value,
        },
        EngineMessage::Summary(summary) => WireEvent::Summary(summary.clone()),
        EngineMessage::Domains(event) => WireEvent::Domains(WireDomains {
            infeasible: event.domains.is_none(),
            duration: event.duration,
            domains: match &event.domains {
                Some(domains) => encode_domains(model, domains)?,
                None => Vec::new(),
            },
        }),
    };
    Ok(serde_json::to_string(&event)?)
}
