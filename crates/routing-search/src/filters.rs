//! Local-search filters. Each consumes a `Delta` (a proposed set of
//! `next` reassignments) and accepts or rejects it against one cheap,
//! path-local check. Modeled as capability objects, the same trait-object
//! collection shape as the neighborhood operators.

use std::collections::HashMap;

use routing_core::{Assignment, RoutingModel};

use crate::propagator::{self, Task, Tasks};

/// A proposed reassignment of `next(index) -> value` pairs, not yet
/// committed.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    pub next: HashMap<i64, i64>,
}

impl Delta {
    pub fn set(&mut self, index: i64, next: i64) {
        self.next.insert(index, next);
    }

    /// Apply the delta on top of a base assignment without mutating it,
    /// producing the candidate assignment the filters evaluate.
    pub fn apply(&self, base: &Assignment) -> Assignment {
        let mut candidate = base.clone();
        for (&index, &next) in &self.next {
            candidate.set_next(index, next);
            candidate.set_active(index, next != index);
        }
        candidate
    }
}

pub trait LocalSearchFilter {
    fn name(&self) -> &'static str;

    /// Returns `true` iff `candidate` is acceptable with respect to this
    /// filter's check. `base` is the assignment `candidate` was derived
    /// from, for filters that need to compare against the prior state
    /// rather than just check `candidate` in isolation.
    fn accept(&self, model: &RoutingModel, base: &Assignment, candidate: &Assignment) -> bool;
}

/// Active count per disjunction stays within `max_cardinality`; hard
/// disjunctions (`penalty = kNoPenalty`) must hit it exactly.
pub struct NodeDisjunctionFilter;

impl LocalSearchFilter for NodeDisjunctionFilter {
    fn name(&self) -> &'static str {
        "NodeDisjunction"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        for (_, disjunction) in model.disjunctions().iter() {
            let active_count = disjunction
                .indices
                .iter()
                .filter(|&&index| candidate.active(index).unwrap_or(false))
                .count();
            if active_count > disjunction.max_cardinality {
                return false;
            }
            if disjunction.is_hard() && active_count != disjunction.max_cardinality {
                return false;
            }
        }
        true
    }
}

/// An active index's vehicle must be in its allowed set.
pub struct VehicleVarFilter;

impl LocalSearchFilter for VehicleVarFilter {
    fn name(&self) -> &'static str {
        "VehicleVar"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let Some(path) = candidate.walk(start, end, model.manager().num_indices() as usize + 1)
            else {
                return false;
            };
            for &index in &path {
                if index != start && index != end && !model.is_vehicle_allowed(index, vehicle) {
                    return false;
                }
            }
        }
        true
    }
}

/// Forward bounds propagation of one dimension's cumul over every
/// touched path.
pub struct PathCumulFilter {
    pub dimension: String,
}

impl LocalSearchFilter for PathCumulFilter {
    fn name(&self) -> &'static str {
        "PathCumul"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        let Ok(dimension) = model.dimension(&self.dimension) else {
            return true;
        };
        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let Some(path) = candidate.walk(start, end, model.manager().num_indices() as usize + 1)
            else {
                return false;
            };
            let (start_min, _) = dimension.start_cumul_bounds(vehicle);
            let slacks = vec![0i64; path.len().saturating_sub(1)];
            let cumuls =
                dimension.propagate_forward(model.registry(), vehicle, &path, start_min, &slacks);
            for (&index, &cumul) in path.iter().zip(cumuls.iter()) {
                if cumul < 0 || cumul > dimension.capacity(vehicle) {
                    return false;
                }
                let _ = index;
            }
            if let (Some(&bound), Some(&last)) =
                (cumuls.first(), cumuls.last())
            {
                if let Some(upper) = dimension.span_upper_bound(vehicle) {
                    if last - bound > upper {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Runs the disjunctive propagator for every touched vehicle that has
/// breaks registered.
pub struct VehicleBreaksFilter {
    pub dimension: String,
}

impl LocalSearchFilter for VehicleBreaksFilter {
    fn name(&self) -> &'static str {
        "VehicleBreaks"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        let Ok(dimension) = model.dimension(&self.dimension) else {
            return true;
        };
        for vehicle in 0..model.num_vehicles() {
            let breaks = dimension.breaks(vehicle);
            if breaks.is_empty() {
                continue;
            }
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let Some(path) = candidate.walk(start, end, model.manager().num_indices() as usize + 1)
            else {
                return false;
            };
            let visited: Vec<i64> = path[1..path.len().saturating_sub(1)].to_vec();
            let mut tasks = Vec::with_capacity(visited.len() + breaks.len());
            let mut forbidden = Vec::with_capacity(visited.len() + breaks.len());
            for &index in &visited {
                let duration = dimension.visit_transit(index);
                let cumul = candidate.cumul(dimension.index, index).unwrap_or(0);
                tasks.push(Task {
                    start_min: cumul,
                    duration_min: duration,
                    end_max: i64::MAX / 4,
                    is_preemptible: false,
                });
                forbidden.push(breaks.iter().map(|b| (b.start_min, b.start_min + b.duration_min)).collect());
            }
            let num_chain_tasks = tasks.len();
            for brk in breaks {
                tasks.push(Task {
                    start_min: brk.start_min,
                    duration_min: brk.duration_min,
                    end_max: brk.end_max,
                    is_preemptible: false,
                });
                forbidden.push(Vec::new());
            }
            let mut bundle = Tasks {
                tasks,
                num_chain_tasks,
                forbidden_intervals: forbidden,
            };
            if !propagator::propagate(&mut bundle) {
                return false;
            }
        }
        true
    }
}

/// Pickup precedes delivery on the same vehicle, with LIFO/FIFO nesting
/// where the vehicle's policy requires it.
pub struct PickupDeliveryFilter;

impl LocalSearchFilter for PickupDeliveryFilter {
    fn name(&self) -> &'static str {
        "PickupDelivery"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        use routing_core::nests_correctly;

        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let Some(path) = candidate.walk(start, end, model.manager().num_indices() as usize + 1)
            else {
                return false;
            };
            let mut sequence = Vec::new();
            for (pair_index, pair) in model.pickup_delivery_pairs().iter().enumerate() {
                let pickup_pos = path.iter().position(|&i| i == pair.pickup);
                let delivery_pos = path.iter().position(|&i| i == pair.delivery);
                match (pickup_pos, delivery_pos) {
                    (Some(p), Some(d)) => {
                        if p >= d {
                            return false;
                        }
                        sequence.push((p, pair_index, true));
                        sequence.push((d, pair_index, false));
                    }
                    (None, None) => {}
                    _ => return false,
                }
            }
            sequence.sort_by_key(|&(pos, _, _)| pos);
            let ordered: Vec<(usize, bool)> =
                sequence.iter().map(|&(_, pair, is_pickup)| (pair, is_pickup)).collect();
            let policy = model.pickup_delivery_pairs().policy_of_vehicle(vehicle);
            if !nests_correctly(policy, &ordered) {
                return false;
            }
        }
        true
    }
}

/// No pair of incompatible visit types may share a vehicle.
pub struct TypeIncompatibilityFilter;

impl LocalSearchFilter for TypeIncompatibilityFilter {
    fn name(&self) -> &'static str {
        "TypeIncompatibility"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let Some(path) = candidate.walk(start, end, model.manager().num_indices() as usize + 1)
            else {
                return false;
            };
            let types: Vec<i64> = path[1..path.len().saturating_sub(1)]
                .iter()
                .map(|&i| model.visit_type(i))
                .collect();
            for a in 0..types.len() {
                for b in (a + 1)..types.len() {
                    if model.are_types_incompatible(types[a], types[b]) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Delta on the amortized quadratic route-length term.
pub struct VehicleAmortizedCostFilter {
    /// Reject deltas that would increase the total amortized cost, used
    /// to bound search toward non-worsening moves under pure local search.
    pub reject_increase: bool,
}

impl VehicleAmortizedCostFilter {
    fn total_amortized_cost(model: &RoutingModel, assignment: &Assignment) -> Option<i64> {
        let mut total = 0;
        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let path = assignment.walk(start, end, model.manager().num_indices() as usize + 1)?;
            let route_length = path.len().saturating_sub(2) as i64;
            total += model.amortized_cost(vehicle, route_length, path.len() > 2);
        }
        Some(total)
    }
}

impl LocalSearchFilter for VehicleAmortizedCostFilter {
    fn name(&self) -> &'static str {
        "VehicleAmortizedCost"
    }

    fn accept(&self, model: &RoutingModel, base: &Assignment, candidate: &Assignment) -> bool {
        if !self.reject_increase {
            return true;
        }
        let Some(candidate_total) = Self::total_amortized_cost(model, candidate) else {
            return false;
        };
        let Some(base_total) = Self::total_amortized_cost(model, base) else {
            return true;
        };
        candidate_total <= base_total
    }
}

/// Catch-all: recompute the full objective and compare against the
/// current best, standing in for restoring the delta into a CP solver
/// and asking it to propagate.
pub struct CpFeasibilityFilter;

impl LocalSearchFilter for CpFeasibilityFilter {
    fn name(&self) -> &'static str {
        "CPFeasibility"
    }

    fn accept(&self, model: &RoutingModel, _base: &Assignment, candidate: &Assignment) -> bool {
        model.compute_cost(candidate).is_ok()
    }
}

/// Shared machinery every path-scoped filter builds on: identify the
/// vehicle (start-of-path) for a touched index and walk only the paths
/// that changed.
pub struct BasePathFilter;

impl BasePathFilter {
    /// Vehicles whose path is touched by `delta`.
    pub fn touched_vehicles(model: &RoutingModel, delta: &Delta) -> Vec<usize> {
        let mut touched = Vec::new();
        for vehicle in 0..model.num_vehicles() {
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let in_range = |i: i64| i >= 0 && (i == start || i == end || i < model.manager().size());
            let is_touched = delta.next.keys().any(|&index| {
                in_range(index) && (index == start || model.manager().vehicle_of_start(index) == Some(vehicle))
            });
            if is_touched {
                touched.push(vehicle);
            }
        }
        touched
    }
}

/// Run every filter in order; short-circuits on the first rejection.
pub fn accept_all(
    filters: &[Box<dyn LocalSearchFilter>],
    model: &RoutingModel,
    base: &Assignment,
    candidate: &Assignment,
) -> bool {
    filters.iter().all(|filter| filter.accept(model, base, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::{routes_to_assignment, IndexManager};

    #[test]
    fn test_node_disjunction_filter_rejects_overfull_disjunction() {
        let manager = IndexManager::new(5, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        let plain = [
            model.manager().node_to_index(1).unwrap(),
            model.manager().node_to_index(2).unwrap(),
        ];
        model.add_disjunction(plain.to_vec(), 10, 1).unwrap();
        model.close().unwrap();

        let assignment = routes_to_assignment(model.manager(), &[vec![1, 2, 3, 4]]).unwrap();
        assert!(!NodeDisjunctionFilter.accept(&model, &assignment, &assignment));
    }

    fn tsp_model_with_pair(pickup_node: usize, delivery_node: usize) -> RoutingModel {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        let p = model.manager().node_to_index(pickup_node).unwrap();
        let d = model.manager().node_to_index(delivery_node).unwrap();
        model.add_pickup_and_delivery(p, d).unwrap();
        model.close().unwrap();
        model
    }

    #[test]
    fn test_pickup_delivery_filter_accepts_in_order_pair() {
        let model = tsp_model_with_pair(1, 2);
        let assignment = routes_to_assignment(model.manager(), &[vec![1, 2, 3]]).unwrap();
        assert!(PickupDeliveryFilter.accept(&model, &assignment, &assignment));
    }

    #[test]
    fn test_pickup_delivery_filter_rejects_reversed_pair() {
        let model = tsp_model_with_pair(1, 2);
        let assignment = routes_to_assignment(model.manager(), &[vec![2, 1, 3]]).unwrap();
        assert!(!PickupDeliveryFilter.accept(&model, &assignment, &assignment));
    }

    #[test]
    fn test_vehicle_amortized_cost_filter_rejects_newly_used_vehicle() {
        let manager = IndexManager::new(3, &[0, 0], &[0, 0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.set_amortized_cost_factors_of_vehicle(1, 100, 0);
        model.close().unwrap();

        let base = routes_to_assignment(model.manager(), &[vec![1, 2], vec![]]).unwrap();
        let candidate = routes_to_assignment(model.manager(), &[vec![1], vec![2]]).unwrap();
        let filter = VehicleAmortizedCostFilter { reject_increase: true };
        assert!(!filter.accept(&model, &base, &candidate));

        let lenient = VehicleAmortizedCostFilter { reject_increase: false };
        assert!(lenient.accept(&model, &base, &candidate));
    }
}
