//! Outcomes of solver commands.

use chronoforge_core::{
    DomainsEvent, LowerBoundEvent, ModelDomains, ObjectiveValue, Solution, SolutionEvent,
    SolveSummary,
};
use serde::Serialize;

/// One entry of the solution history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRecord {
    pub solve_time: f64,
    pub objective: ObjectiveValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

/// Everything a solve reported.
///
/// `summary` is `None` only when the session failed before the engine sent
/// it and an error listener turned the failure into an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub summary: Option<SolveSummary>,
    pub solution_history: Vec<SolutionRecord>,
    pub lower_bound_history: Vec<LowerBoundEvent>,
    /// Last solution reported, the best the engine found.
    pub best_solution: Option<Solution>,
    pub best_solution_time: Option<f64>,
    pub best_solution_valid: Option<bool>,
    pub best_objective: ObjectiveValue,
    pub best_lower_bound: Option<f64>,
}

impl SolveResult {
    pub(crate) fn record_solution(&mut self, event: &SolutionEvent) {
        let objective = event.solution.objective();
        self.solution_history.push(SolutionRecord {
            solve_time: event.solve_time,
            objective,
            valid: event.valid,
        });
        self.best_solution = Some(event.solution.clone());
        self.best_solution_time = Some(event.solve_time);
        self.best_solution_valid = event.valid;
        self.best_objective = objective;
    }

    pub(crate) fn record_lower_bound(&mut self, event: &LowerBoundEvent) {
        self.lower_bound_history.push(*event);
        self.best_lower_bound = Some(event.value);
    }

    pub fn nb_solutions(&self) -> u64 {
        self.summary
            .as_ref()
            .map_or(self.solution_history.len() as u64, |s| s.nb_solutions)
    }

    /// Objective of the best solution, or the summary's objective.
    pub fn objective(&self) -> Option<f64> {
        self.best_objective
            .value()
            .or_else(|| self.summary.as_ref().and_then(|s| s.objective))
    }

    /// Whether the engine proved optimality or infeasibility.
    pub fn proof(&self) -> bool {
        self.summary.as_ref().is_some_and(|s| s.proof)
    }

    /// Solve duration in seconds, from the summary.
    pub fn duration(&self) -> Option<f64> {
        self.summary.as_ref().map(|s| s.duration)
    }
}

/// Domains after propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationResult {
    pub duration: f64,
    /// `None` when propagation proved the model infeasible.
    pub domains: Option<ModelDomains>,
}

impl PropagationResult {
    pub fn is_infeasible(&self) -> bool {
        self.domains.is_none()
    }
}

impl From<DomainsEvent> for PropagationResult {
    fn from(event: DomainsEvent) -> Self {
        Self {
            duration: event.duration,
            domains: event.domains,
        }
    }
}
