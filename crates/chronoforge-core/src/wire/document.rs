//! Stand-alone JSON document holding a problem.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::decode::{decode_model, decode_solution};
use super::encode::{encode_model, encode_solution};
use super::messages::{WireModel, WireSolution};
use super::Result;
use crate::model::Model;
use crate::solution::Solution;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "P: Deserialize<'de>"))]
struct Document<P> {
    model: WireModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warm_start: Option<WireSolution>,
}

/// A model with the parameters and warm start it was exported with.
#[derive(Debug, Clone)]
pub struct Problem<P> {
    pub model: Model,
    pub parameters: Option<P>,
    pub warm_start: Option<Solution>,
}

/// Serializes `{model, parameters?, warmStart?}` as pretty-printed JSON.
pub fn problem_to_json<P: Serialize>(
    model: &Model,
    parameters: Option<&P>,
    warm_start: Option<&Solution>,
) -> Result<String> {
    let document = Document {
        model: encode_model(model)?,
        parameters,
        warm_start: warm_start
            .map(|s| encode_solution(model, s))
            .transpose()?,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Reads a document written by [`problem_to_json`].
pub fn json_to_problem<P: DeserializeOwned>(json: &str) -> Result<Problem<P>> {
    let document: Document<P> = serde_json::from_str(json)?;
    let model = decode_model(&document.model)?;
    let warm_start = document
        .warm_start
        .map(|ws| decode_solution(&model, &ws))
        .transpose()?;
    Ok(Problem {
        model,
        parameters: document.parameters,
        warm_start,
    })
}
