//! The search orchestrator: drives a first solution through repeated
//! neighborhood-operator moves under a metaheuristic acceptance rule, a
//! finalizer, and search limits.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use routing_core::{Assignment, RoutingModel, RoutingStatus};

use crate::builders::DecisionBuilder;
use crate::filters::{accept_all, LocalSearchFilter};
use crate::operators::Operators;
use crate::random::Random;

#[derive(Debug, Clone)]
pub enum Metaheuristic {
    None,
    GuidedLocalSearch { penalty_factor: f64 },
    SimulatedAnnealing { initial_temperature: f64, cooling_rate: f64 },
    TabuSearch { tenure: usize },
    ObjectiveTabu { tenure: usize },
}

impl Default for Metaheuristic {
    fn default() -> Self {
        Metaheuristic::None
    }
}

/// Observes every accepted solution during search; the orchestrator calls
/// `on_solution` each time `current` improves and polls `should_stop`
/// once per iteration.
pub trait SearchMonitor {
    fn on_solution(&mut self, assignment: &Assignment, cost: i64);

    fn should_stop(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub wall_time: Option<Duration>,
    pub max_improving_solutions: Option<usize>,
    pub max_branches: Option<usize>,
    pub max_failures: Option<usize>,
}

/// A variable a finalizer should push to one extreme once the
/// metaheuristic search is done proposing structural moves; applies to
/// dimension slack, which is otherwise left free by every operator above.
#[derive(Debug, Clone, Copy)]
enum FinalizerTarget {
    Minimize(routing_core::DimensionIndex, i64),
    Maximize(routing_core::DimensionIndex, i64),
}

#[derive(Debug, Clone, Default)]
pub struct Finalizer {
    targets: Vec<FinalizerTarget>,
}

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimize_slack(&mut self, dimension: routing_core::DimensionIndex, index: i64) {
        self.targets.push(FinalizerTarget::Minimize(dimension, index));
    }

    pub fn maximize_slack(&mut self, dimension: routing_core::DimensionIndex, index: i64) {
        self.targets.push(FinalizerTarget::Maximize(dimension, index));
    }

    /// Pushes every registered slack variable to its bound, without
    /// touching `next`/`active` — purely a tie-break pass over otherwise
    /// unconstrained values.
    pub fn apply(&self, model: &RoutingModel, assignment: &mut Assignment) {
        for &target in &self.targets {
            match target {
                FinalizerTarget::Minimize(dimension, index) => {
                    assignment.set_slack(dimension, index, 0);
                }
                FinalizerTarget::Maximize(dimension, index) => {
                    let vehicle = assignment.vehicle(index).unwrap_or(0).max(0) as usize;
                    let capacity = model.dimension_at(dimension).capacity(vehicle);
                    assignment.set_slack(dimension, index, capacity);
                }
            }
        }
    }
}

struct SearchState {
    best: Assignment,
    best_cost: i64,
    current: Assignment,
    current_cost: i64,
    tabu: HashMap<(i64, i64), usize>,
    penalties: HashMap<(i64, i64), i64>,
    temperature: f64,
    iteration: usize,
    improving_count: usize,
    failures: usize,
}

pub struct Orchestrator {
    builder: Box<dyn DecisionBuilder>,
    operators: Operators,
    filters: Vec<Box<dyn LocalSearchFilter>>,
    metaheuristic: Metaheuristic,
    limits: SearchLimits,
    finalizer: Finalizer,
}

impl Orchestrator {
    pub fn builder(builder: Box<dyn DecisionBuilder>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            orchestrator: Orchestrator {
                builder,
                operators: Operators::new(),
                filters: Vec::new(),
                metaheuristic: Metaheuristic::None,
                limits: SearchLimits::default(),
                finalizer: Finalizer::new(),
            },
        }
    }

    /// Greatest arc cost incident to any node in `assignment` — the edge
    /// Guided Local Search penalizes next.
    fn most_expensive_arc(&self, model: &RoutingModel, assignment: &Assignment) -> Option<(i64, i64)> {
        let mut worst: Option<((i64, i64), i64)> = None;
        for (&from, &to) in assignment.next_indices() {
            let vehicle = (0..model.num_vehicles())
                .find(|&v| model.manager().start(v) == from)
                .unwrap_or(0);
            let cost = model.arc_cost_for_vehicle(from, to, vehicle as i64).ok()?;
            if worst.map(|(_, c)| cost > c).unwrap_or(true) {
                worst = Some(((from, to), cost));
            }
        }
        worst.map(|(arc, _)| arc)
    }

    fn augmented_cost(&self, state: &SearchState, model: &RoutingModel, assignment: &Assignment) -> Option<i64> {
        let base = model.compute_cost(assignment).ok()?;
        if let Metaheuristic::GuidedLocalSearch { penalty_factor } = self.metaheuristic {
            let mut penalty_sum = 0i64;
            for (&from, &to) in assignment.next_indices() {
                if let Some(&p) = state.penalties.get(&(from, to)) {
                    penalty_sum += p;
                }
            }
            return Some(base + (penalty_sum as f64 * penalty_factor) as i64);
        }
        Some(base)
    }

    fn accept(&self, state: &mut SearchState, candidate_cost: i64, random: &mut Random) -> bool {
        match self.metaheuristic {
            Metaheuristic::None => candidate_cost < state.current_cost,
            Metaheuristic::GuidedLocalSearch { .. } => candidate_cost <= state.current_cost,
            Metaheuristic::SimulatedAnnealing { .. } => {
                if candidate_cost < state.current_cost {
                    true
                } else {
                    let delta = (candidate_cost - state.current_cost) as f64;
                    let probability = (-delta / state.temperature.max(1e-9)).exp();
                    random.chance((probability.min(1.0), 1.0))
                }
            }
            Metaheuristic::TabuSearch { .. } | Metaheuristic::ObjectiveTabu { .. } => {
                candidate_cost <= state.current_cost || candidate_cost < state.best_cost
            }
        }
    }

    fn is_move_tabu(&self, state: &SearchState, candidate: &Assignment) -> bool {
        match self.metaheuristic {
            Metaheuristic::TabuSearch { .. } => candidate
                .next_indices()
                .any(|(&from, &to)| state.tabu.contains_key(&(from, to))),
            _ => false,
        }
    }

    fn mark_tabu(&self, state: &mut SearchState, previous: &Assignment) {
        let tenure = match self.metaheuristic {
            Metaheuristic::TabuSearch { tenure } | Metaheuristic::ObjectiveTabu { tenure } => tenure,
            _ => return,
        };
        for (&from, &to) in previous.next_indices() {
            state.tabu.insert((from, to), state.iteration + tenure);
        }
        state.tabu.retain(|_, expiry| *expiry > state.iteration);
    }

    fn update_penalties(&self, state: &mut SearchState, model: &RoutingModel) {
        if let Metaheuristic::GuidedLocalSearch { .. } = self.metaheuristic {
            if let Some(arc) = self.most_expensive_arc(model, &state.current) {
                *state.penalties.entry(arc).or_insert(0) += 1;
            }
        }
    }

    fn limit_exceeded(&self, state: &SearchState, start_time: Instant) -> Option<RoutingStatus> {
        if let Some(wall_time) = self.limits.wall_time {
            if start_time.elapsed() >= wall_time {
                return Some(RoutingStatus::FailTimeout);
            }
        }
        if let Some(max) = self.limits.max_improving_solutions {
            if state.improving_count >= max {
                return Some(RoutingStatus::Success);
            }
        }
        if let Some(max) = self.limits.max_branches {
            if state.iteration >= max {
                return Some(RoutingStatus::Success);
            }
        }
        if let Some(max) = self.limits.max_failures {
            if state.failures >= max {
                return Some(RoutingStatus::Success);
            }
        }
        None
    }

    pub fn solve(
        &self,
        model: &RoutingModel,
        random: &mut Random,
        monitor: Option<&mut dyn SearchMonitor>,
    ) -> (RoutingStatus, Option<Assignment>) {
        if !model.is_closed() {
            debug!("solve() called on a model that has not been closed");
            return (RoutingStatus::Invalid, None);
        }

        let Some(initial) = self.builder.build(model, &self.filters, random) else {
            debug!(builder = self.builder.name(), "first-solution builder failed to commit an assignment");
            return (RoutingStatus::Fail, None);
        };
        let Ok(initial_cost) = model.compute_cost(&initial) else {
            return (RoutingStatus::Invalid, None);
        };
        info!(builder = self.builder.name(), cost = initial_cost, "initial solution built");

        let mut state = SearchState {
            best: initial.clone(),
            best_cost: initial_cost,
            current: initial,
            current_cost: initial_cost,
            tabu: HashMap::new(),
            penalties: HashMap::new(),
            temperature: match self.metaheuristic {
                Metaheuristic::SimulatedAnnealing { initial_temperature, .. } => initial_temperature,
                _ => 1.0,
            },
            iteration: 0,
            improving_count: 0,
            failures: 0,
        };
        let mut monitor = monitor;
        if let Some(m) = monitor.as_deref_mut() {
            m.on_solution(&state.best, state.best_cost);
        }

        let start_time = Instant::now();
        if self.operators.is_empty() {
            return (RoutingStatus::Success, Some(state.best));
        }

        loop {
            if let Some(status) = self.limit_exceeded(&state, start_time) {
                info!(?status, iterations = state.iteration, best_cost = state.best_cost, "search stopped");
                let mut best = state.best;
                self.finalizer.apply(model, &mut best);
                return (status, Some(best));
            }
            if monitor.as_deref().map(|m| m.should_stop()).unwrap_or(false) {
                break;
            }

            let operator_index = state.iteration % self.operators.len();
            let operator = self.operators.get(operator_index).unwrap();
            state.iteration += 1;

            if !random.chance((operator.chance(), 1.0)) {
                continue;
            }

            let Some(candidate) = operator.execute(model, &state.current, random) else {
                state.failures += 1;
                continue;
            };
            if !accept_all(&self.filters, model, &state.current, &candidate) {
                state.failures += 1;
                continue;
            }
            if self.is_move_tabu(&state, &candidate) {
                state.failures += 1;
                continue;
            }

            let Some(candidate_cost) = self.augmented_cost(&state, model, &candidate) else {
                state.failures += 1;
                continue;
            };

            if self.accept(&mut state, candidate_cost, random) {
                let previous = state.current.clone();
                state.current = candidate;
                state.current_cost = candidate_cost;
                self.mark_tabu(&mut state, &previous);
                self.update_penalties(&mut state, model);

                if let Ok(true_cost) = model.compute_cost(&state.current) {
                    if true_cost < state.best_cost {
                        state.best = state.current.clone();
                        state.best_cost = true_cost;
                        state.improving_count += 1;
                        debug!(iteration = state.iteration, cost = state.best_cost, "improving solution found");
                        if let Some(m) = monitor.as_deref_mut() {
                            m.on_solution(&state.best, state.best_cost);
                        }
                    }
                }
            } else {
                state.failures += 1;
            }

            if let Metaheuristic::SimulatedAnnealing { cooling_rate, .. } = self.metaheuristic {
                state.temperature *= cooling_rate;
            }
        }

        let mut best = state.best;
        self.finalizer.apply(model, &mut best);
        (RoutingStatus::Success, Some(best))
    }
}

pub struct OrchestratorBuilder {
    orchestrator: Orchestrator,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn operator<Op: crate::operators::Operator + 'static>(mut self, operator: Op) -> Self {
        self.orchestrator.operators.push(Box::new(operator));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Box<dyn LocalSearchFilter>) -> Self {
        self.orchestrator.filters.push(filter);
        self
    }

    #[must_use]
    pub fn metaheuristic(mut self, metaheuristic: Metaheuristic) -> Self {
        self.orchestrator.metaheuristic = metaheuristic;
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: SearchLimits) -> Self {
        self.orchestrator.limits = limits;
        self
    }

    #[must_use]
    pub fn finalizer(mut self, finalizer: Finalizer) -> Self {
        self.orchestrator.finalizer = finalizer;
        self
    }

    #[must_use]
    pub fn build(self) -> Orchestrator {
        self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::local_cheapest_insertion::LocalCheapestInsertion;
    use crate::operators::{Relocate, TwoOpt};
    use routing_core::IndexManager;

    #[test]
    fn test_solve_returns_success_for_tsp4() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let orchestrator = Orchestrator::builder(Box::new(LocalCheapestInsertion))
            .operator(Relocate)
            .operator(TwoOpt)
            .limits(SearchLimits {
                max_branches: Some(20),
                ..Default::default()
            })
            .build();

        let mut random = Random::seed(1);
        let (status, assignment) = orchestrator.solve(&model, &mut random, None);
        assert_eq!(status, RoutingStatus::Success);
        assert!(assignment.is_some());
        let cost = model.compute_cost(&assignment.unwrap()).unwrap();
        assert!(cost > 0);
    }

    #[test]
    fn test_solve_fails_on_open_model() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let model = RoutingModel::new(manager);
        let orchestrator = Orchestrator::builder(Box::new(LocalCheapestInsertion)).build();
        let mut random = Random::seed(1);
        let (status, assignment) = orchestrator.solve(&model, &mut random, None);
        assert_eq!(status, RoutingStatus::Invalid);
        assert!(assignment.is_none());
    }

    fn tsp_model(n: usize) -> RoutingModel {
        let manager = IndexManager::new(n, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();
        model
    }

    proptest::proptest! {
        /// The same seed on the same model with the same operator set
        /// always produces the same assignment.
        #[test]
        fn prop_same_seed_same_result(n in 4usize..9, seed in 0u64..1000) {
            let model = tsp_model(n);
            let build = || {
                Orchestrator::builder(Box::new(LocalCheapestInsertion))
                    .operator(Relocate)
                    .operator(TwoOpt)
                    .limits(SearchLimits { max_branches: Some(15), ..Default::default() })
                    .build()
            };
            let mut r1 = Random::seed(seed);
            let (status1, a1) = build().solve(&model, &mut r1, None);
            let mut r2 = Random::seed(seed);
            let (status2, a2) = build().solve(&model, &mut r2, None);
            prop_assert_eq!(status1, status2);
            let c1 = model.compute_cost(&a1.unwrap()).unwrap();
            let c2 = model.compute_cost(&a2.unwrap()).unwrap();
            prop_assert_eq!(c1, c2);
        }
    }
}
