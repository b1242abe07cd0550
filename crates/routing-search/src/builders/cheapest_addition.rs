//! CheapestAddition: extends each route from its current chain end by
//! appending whichever pending node is cheapest to reach, one vehicle at
//! a time, higher-indexed (already-started) vehicles first.

use routing_core::{Assignment, RoutingModel};

use crate::filters::LocalSearchFilter;
use crate::random::Random;

use super::{DecisionBuilder, FilteredAssignmentBuilder};

#[derive(Default)]
pub struct CheapestAddition;

impl DecisionBuilder for CheapestAddition {
    fn name(&self) -> &'static str {
        "CheapestAddition"
    }

    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        _random: &mut Random,
    ) -> Option<Assignment> {
        let mut builder = FilteredAssignmentBuilder::new(model, filters, None)?;

        let mut vehicle_order: Vec<usize> = (0..model.num_vehicles()).collect();
        vehicle_order.sort_by_key(|&vehicle| {
            let started = builder
                .chain_ends()
                .iter()
                .find(|&&(v, _)| v == vehicle)
                .map(|&(_, end)| end != model.manager().start(vehicle))
                .unwrap_or(false);
            std::cmp::Reverse(started)
        });

        loop {
            let pending = builder.pending_indices();
            if pending.is_empty() {
                break;
            }

            let mut extended_any = false;
            for &vehicle in &vehicle_order {
                let (_, chain_end) = builder
                    .chain_ends()
                    .into_iter()
                    .find(|&(v, _)| v == vehicle)
                    .unwrap();
                let end = model.manager().end(vehicle);
                if chain_end == end {
                    continue;
                }

                let mut best: Option<(i64, i64)> = None; // (cost, node)
                for &node in &pending {
                    if !model.is_vehicle_allowed(node, vehicle) {
                        continue;
                    }
                    let cost = model
                        .arc_cost_for_vehicle(chain_end, node, vehicle as i64)
                        .ok()?;
                    if best.map(|(c, _)| cost < c).unwrap_or(true) {
                        best = Some((cost, node));
                    }
                }

                if let Some((_, node)) = best {
                    if builder.try_insert_after(chain_end, node) {
                        extended_any = true;
                    }
                }
            }

            if !extended_any {
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

        let builder = CheapestAddition;
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
    }
}
