//! LocalCheapestInsertion: takes the first pending index in variable
//! order, tries every legal insertion position in that order, and commits
//! the first one a filter accepts — rather than searching for the single
//! cheapest position like GlobalCheapestInsertion.

use routing_core::{Assignment, RoutingModel};

use crate::filters::LocalSearchFilter;
use crate::random::Random;

use super::{DecisionBuilder, FilteredAssignmentBuilder};

#[derive(Default)]
pub struct LocalCheapestInsertion;

impl DecisionBuilder for LocalCheapestInsertion {
    fn name(&self) -> &'static str {
        "LocalCheapestInsertion"
    }

    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        _random: &mut Random,
    ) -> Option<Assignment> {
        let mut builder = FilteredAssignmentBuilder::new(model, filters, None)?;

        loop {
            let pending = builder.pending_indices();
            let Some(&node) = pending.first() else {
                break;
            };

            let mut positions: Vec<(i64, i64)> = Vec::new(); // (cost, prev)
            for vehicle in 0..model.num_vehicles() {
                if !model.is_vehicle_allowed(node, vehicle) {
                    continue;
                }
                let start = model.manager().start(vehicle);
                let end = model.manager().end(vehicle);
                let mut prev = start;
                loop {
                    let next = builder.committed().next(prev).unwrap_or(end);
                    let base = model.arc_cost_for_vehicle(prev, next, vehicle as i64).ok()?;
                    let added = model.arc_cost_for_vehicle(prev, node, vehicle as i64).ok()?
                        + model.arc_cost_for_vehicle(node, next, vehicle as i64).ok()?
                        - base;
                    positions.push((added, prev));
                    if next == end {
                        break;
                    }
                    prev = next;
                }
            }
            positions.sort_by_key(|&(cost, _)| cost);

            let mut placed = false;
            for (_, prev) in positions {
                if builder.try_insert_after(prev, node) {
                    placed = true;
                    break;
                }
            }
            if !placed {
                // Node cannot be legally inserted anywhere right now; drop it
                // from this round so the loop terminates. `is_complete`
                // reports the shortfall to the caller.
                if model.disjunctions().containing(node).is_empty() {
                    return None;
                }
                break;
            }
        }

        if builder.is_complete() {
            Some(builder.committed().clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::IndexManager;
    use std::collections::HashSet;

    #[test]
    fn test_builds_tsp4_route() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = LocalCheapestInsertion;
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
    }
}
