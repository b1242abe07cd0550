//! GlobalCheapestInsertion: greedily inserts the globally cheapest
//! `(node, position)` pair across every route, one commit at a time,
//! re-scoring from scratch after each commit.
//!
//! The reference algorithm only re-scores entries touching the four arcs
//! created by the last commit via a priority queue; this port recomputes
//! the full candidate set per round instead, trading the incremental
//! re-scoring for a simpler, still-correct greedy loop.

use std::collections::HashSet;

use routing_core::{Assignment, RoutingModel};

use crate::filters::LocalSearchFilter;
use crate::random::Random;

use super::{DecisionBuilder, FilteredAssignmentBuilder};

pub struct GlobalCheapestInsertion {
    /// Routes are grown one at a time when true; all routes grow together
    /// otherwise.
    pub is_sequential: bool,
    /// Truncates each node's insertion-position search to the nearest
    /// `ratio` fraction of candidate positions (by raw arc cost into the
    /// node), instead of scanning every open arc on every route.
    pub neighbors_ratio: Option<f64>,
    /// Before the main greedy loop, seeds `floor(ratio * num_vehicles)`
    /// otherwise-empty routes with the farthest pending nodes from
    /// vehicle 0's start, one node per route.
    pub farthest_seeds_ratio: Option<f64>,
}

impl Default for GlobalCheapestInsertion {
    fn default() -> Self {
        GlobalCheapestInsertion {
            is_sequential: false,
            neighbors_ratio: None,
            farthest_seeds_ratio: None,
        }
    }
}

/// One candidate insertion arc `prev -> next` open on `vehicle`.
struct Slot {
    vehicle: usize,
    prev: i64,
    next: i64,
}

fn route_slots(model: &RoutingModel, builder: &FilteredAssignmentBuilder<'_>, vehicle: usize) -> Vec<Slot> {
    let start = model.manager().start(vehicle);
    let end = model.manager().end(vehicle);
    let mut slots = Vec::new();
    let mut prev = start;
    loop {
        let next = builder.committed().next(prev).unwrap_or(end);
        slots.push(Slot { vehicle, prev, next });
        if next == end {
            break;
        }
        prev = next;
    }
    slots
}

/// Cost of inserting a single `node` into the arc `prev -> next`.
fn single_insertion_cost(model: &RoutingModel, slot: &Slot, node: i64) -> Option<i64> {
    if !model.is_vehicle_allowed(node, slot.vehicle) {
        return None;
    }
    let base = model.arc_cost_for_vehicle(slot.prev, slot.next, slot.vehicle as i64).ok()?;
    let added = model.arc_cost_for_vehicle(slot.prev, node, slot.vehicle as i64).ok()?
        + model.arc_cost_for_vehicle(node, slot.next, slot.vehicle as i64).ok()?
        - base;
    Some(added)
}

/// Cost of inserting a pickup/delivery pair as an adjacent block
/// `prev -> pickup -> delivery -> next`.
fn pair_insertion_cost(model: &RoutingModel, slot: &Slot, pickup: i64, delivery: i64) -> Option<i64> {
    if !model.is_vehicle_allowed(pickup, slot.vehicle) || !model.is_vehicle_allowed(delivery, slot.vehicle) {
        return None;
    }
    let base = model.arc_cost_for_vehicle(slot.prev, slot.next, slot.vehicle as i64).ok()?;
    let added = model.arc_cost_for_vehicle(slot.prev, pickup, slot.vehicle as i64).ok()?
        + model.arc_cost_for_vehicle(pickup, delivery, slot.vehicle as i64).ok()?
        + model.arc_cost_for_vehicle(delivery, slot.next, slot.vehicle as i64).ok()?
        - base;
    Some(added)
}

/// Truncates `slots` to the nearest fraction of positions by entry cost
/// into `node`, when a ratio is configured.
fn truncate_slots(model: &RoutingModel, slots: Vec<Slot>, node: i64, ratio: Option<f64>) -> Vec<Slot> {
    let Some(ratio) = ratio else {
        return slots;
    };
    let mut scored: Vec<(i64, Slot)> = slots
        .into_iter()
        .filter_map(|slot| {
            let entry = model.arc_cost_for_vehicle(slot.prev, node, slot.vehicle as i64).ok()?;
            Some((entry, slot))
        })
        .collect();
    scored.sort_by_key(|(cost, _)| *cost);
    let keep = ((scored.len() as f64) * ratio).ceil().max(1.0) as usize;
    scored.truncate(keep.max(1).min(scored.len().max(1)));
    scored.into_iter().map(|(_, slot)| slot).collect()
}

impl GlobalCheapestInsertion {
    fn farthest_seed_warmup(&self, model: &RoutingModel, builder: &mut FilteredAssignmentBuilder<'_>) {
        let Some(ratio) = self.farthest_seeds_ratio else {
            return;
        };
        let seeds = ((model.num_vehicles() as f64) * ratio).floor() as usize;
        if seeds == 0 || model.num_vehicles() == 0 {
            return;
        }
        let reference_start = model.manager().start(0);
        let mut pending: Vec<(i64, i64)> = builder
            .pending_indices()
            .into_iter()
            .filter_map(|node| {
                let cost = model.arc_cost_for_vehicle(reference_start, node, 0).ok()?;
                Some((cost, node))
            })
            .collect();
        pending.sort_by_key(|(cost, _)| std::cmp::Reverse(*cost));

        let mut empty_vehicles: Vec<usize> = (0..model.num_vehicles())
            .filter(|&vehicle| {
                let start = model.manager().start(vehicle);
                let end = model.manager().end(vehicle);
                builder.committed().next(start) == Some(end) || builder.committed().next(start).is_none()
            })
            .collect();

        for (_, node) in pending.into_iter().take(seeds) {
            let Some(vehicle) = empty_vehicles.pop() else {
                break;
            };
            let start = model.manager().start(vehicle);
            if !builder.try_insert_after(start, node) {
                empty_vehicles.push(vehicle);
            }
        }
    }
}

impl DecisionBuilder for GlobalCheapestInsertion {
    fn name(&self) -> &'static str {
        "GlobalCheapestInsertion"
    }

    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        _random: &mut Random,
    ) -> Option<Assignment> {
        let mut builder = FilteredAssignmentBuilder::new(model, filters, None)?;
        self.farthest_seed_warmup(model, &mut builder);

        let mut excluded_singles: HashSet<i64> = HashSet::new();
        let mut excluded_pairs: HashSet<usize> = HashSet::new();

        loop {
            let active_through = if self.is_sequential {
                1
            } else {
                model.num_vehicles()
            };
            let mut slots: Vec<Slot> = Vec::new();
            for vehicle in 0..active_through.min(model.num_vehicles()).max(1) {
                slots.extend(route_slots(model, &builder, vehicle));
            }

            let pending: HashSet<i64> = builder
                .pending_indices()
                .into_iter()
                .filter(|index| !excluded_singles.contains(index))
                .collect();
            if pending.is_empty() {
                break;
            }

            enum Candidate {
                Single { prev: i64, node: i64 },
                Pair { prev: i64, pair_index: usize, pickup: i64, delivery: i64 },
            }

            let mut best: Option<(i64, Candidate)> = None;

            for (pair_index, pair) in model.pickup_delivery_pairs().iter().enumerate() {
                if excluded_pairs.contains(&pair_index) {
                    continue;
                }
                if !pending.contains(&pair.pickup) || !pending.contains(&pair.delivery) {
                    continue;
                }
                let candidate_slots = truncate_slots(model, slots.iter().map(|s| Slot { vehicle: s.vehicle, prev: s.prev, next: s.next }).collect(), pair.pickup, self.neighbors_ratio);
                for slot in &candidate_slots {
                    if let Some(cost) = pair_insertion_cost(model, slot, pair.pickup, pair.delivery) {
                        if best.as_ref().map(|(c, _)| cost < *c).unwrap_or(true) {
                            best = Some((
                                cost,
                                Candidate::Pair {
                                    prev: slot.prev,
                                    pair_index,
                                    pickup: pair.pickup,
                                    delivery: pair.delivery,
                                },
                            ));
                        }
                    }
                }
            }

            let mut paired_nodes: HashSet<i64> = HashSet::new();
            for (idx, pair) in model.pickup_delivery_pairs().iter().enumerate() {
                if !excluded_pairs.contains(&idx) && pending.contains(&pair.pickup) && pending.contains(&pair.delivery) {
                    paired_nodes.insert(pair.pickup);
                    paired_nodes.insert(pair.delivery);
                }
            }

            for &node in pending.iter().filter(|n| !paired_nodes.contains(n)) {
                let candidate_slots = truncate_slots(model, slots.iter().map(|s| Slot { vehicle: s.vehicle, prev: s.prev, next: s.next }).collect(), node, self.neighbors_ratio);
                for slot in &candidate_slots {
                    if let Some(cost) = single_insertion_cost(model, slot, node) {
                        if best.as_ref().map(|(c, _)| cost < *c).unwrap_or(true) {
                            best = Some((cost, Candidate::Single { prev: slot.prev, node }));
                        }
                    }
                }
            }

            match best {
                Some((_, Candidate::Single { prev, node })) => {
                    if !builder.try_insert_after(prev, node) {
                        excluded_singles.insert(node);
                    }
                }
                Some((_, Candidate::Pair { prev, pair_index, pickup, delivery })) => {
                    if builder.try_insert_after(prev, pickup) && builder.try_insert_after(pickup, delivery) {
                        // committed
                    } else {
                        excluded_pairs.insert(pair_index);
                    }
                }
                None => break,
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

    #[test]
    fn test_builds_tsp4_route() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = GlobalCheapestInsertion::default();
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_inserts_pickup_delivery_pair_together() {
        let manager = IndexManager::new(5, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.add_pickup_and_delivery(1, 2).unwrap();
        model.close().unwrap();

        let builder = GlobalCheapestInsertion::default();
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let route = &routes[0];
        let pickup_pos = route.iter().position(|&n| n == 1).unwrap();
        let delivery_pos = route.iter().position(|&n| n == 2).unwrap();
        assert!(pickup_pos < delivery_pos);
    }

    #[test]
    fn test_farthest_seed_warmup_opens_routes_before_greedy_loop() {
        let manager = IndexManager::new(5, &[0, 0], &[0, 0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = GlobalCheapestInsertion {
            is_sequential: false,
            neighbors_ratio: None,
            farthest_seeds_ratio: Some(1.0),
        };
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();
        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        assert!(routes.iter().all(|r| !r.is_empty()));
    }
}
