//! Christofides: MST over the pending customers, a greedy minimum matching
//! on the MST's odd-degree vertices, an Eulerian circuit over the combined
//! edge multiset, shortcut to a Hamiltonian tour, then the tour is walked
//! in order filling the current vehicle's route for as long as filters
//! keep accepting insertions, spilling to the next vehicle the moment one
//! is rejected. A node a vehicle won't take is retried on the next one
//! rather than dropped; anything still unplaced once vehicles run out is
//! swept up by a nearest-chain-end fallback pass.

use routing_graph::{eulerian_circuit, greedy_min_matching, prim_mst, shortcut};

use routing_core::{Assignment, RoutingModel};

use crate::filters::LocalSearchFilter;
use crate::random::Random;

use super::{DecisionBuilder, FilteredAssignmentBuilder};

#[derive(Default)]
pub struct Christofides;

impl DecisionBuilder for Christofides {
    fn name(&self) -> &'static str {
        "Christofides"
    }

    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        _random: &mut Random,
    ) -> Option<Assignment> {
        let mut builder = FilteredAssignmentBuilder::new(model, filters, None)?;
        let pending = builder.pending_indices();
        let n = pending.len();
        if n == 0 {
            return if builder.is_complete() {
                Some(builder.committed().clone())
            } else {
                None
            };
        }
        if n == 1 {
            let vehicle = (0..model.num_vehicles())
                .find(|&v| model.is_vehicle_allowed(pending[0], v))?;
            let start = model.manager().start(vehicle);
            if !builder.try_insert_after(start, pending[0]) {
                return None;
            }
            return if builder.is_complete() {
                Some(builder.committed().clone())
            } else {
                None
            };
        }

        let mut cost = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    cost[i][j] = model.arc_cost_for_vehicle(pending[i], pending[j], 0).ok()? as f64;
                }
            }
        }

        let mst_edges = prim_mst(&cost);
        let degrees = routing_graph::mst::degrees(n, &mst_edges);
        let odd_vertices: Vec<usize> = (0..n).filter(|&v| degrees[v] % 2 == 1).collect();
        let matching = greedy_min_matching(&cost, &odd_vertices);

        let mut multigraph = mst_edges;
        multigraph.extend(matching);

        let circuit = eulerian_circuit(n, &multigraph, 0);
        let tour = shortcut(&circuit);

        let num_vehicles = model.num_vehicles();
        let mut vehicle = 0usize;
        let mut prev = if num_vehicles > 0 {
            model.manager().start(0)
        } else {
            0
        };

        for &local in &tour {
            let node = pending[local];
            loop {
                if vehicle >= num_vehicles {
                    break;
                }
                if model.is_vehicle_allowed(node, vehicle) && builder.try_insert_after(prev, node) {
                    prev = node;
                    break;
                }
                // This vehicle won't take the node, either by allowance or
                // by filter rejection; spill to the next vehicle and retry
                // the same node there instead of dropping it.
                vehicle += 1;
                if vehicle < num_vehicles {
                    prev = model.manager().start(vehicle);
                }
            }
        }

        // Anything no vehicle in tour order ever accepted (vehicles ran
        // out, or every remaining vehicle rejected it) is appended to
        // whichever open chain end is cheapest to reach.
        loop {
            let remaining = builder.pending_indices();
            let Some(&node) = remaining.first() else {
                break;
            };
            let mut best: Option<(i64, i64)> = None;
            for (v, end) in builder.chain_ends() {
                if !model.is_vehicle_allowed(node, v) {
                    continue;
                }
                let Ok(arc_cost) = model.arc_cost_for_vehicle(end, node, v as i64) else {
                    continue;
                };
                if best.map(|(c, _)| arc_cost < c).unwrap_or(true) {
                    best = Some((arc_cost, end));
                }
            }
            match best {
                Some((_, end)) => {
                    if !builder.try_insert_after(end, node) {
                        return None;
                    }
                }
                None => return None,
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

        let builder = Christofides;
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_spills_across_vehicles_without_dropping_nodes() {
        // Node 1 is barred from vehicle 0, the vehicle the tour visits
        // first; the walk must spill it onto vehicle 1 rather than drop it.
        let manager = IndexManager::new(4, &[0, 0], &[0, 0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.set_allowed_vehicles_for_index(1, HashSet::from([1]));
        model.close().unwrap();

        let builder = Christofides;
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
        assert!(routes[1].contains(&1));
    }
}
