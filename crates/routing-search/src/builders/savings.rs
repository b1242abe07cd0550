//! Savings (Clarke-Wright): for every ordered pair of pending customers
//! `(i, j)` and every vehicle type `t`, `saving(i, j, t) = arc(start_t, j)
//! + arc(i, end_t) - coef * arc(i, j)` — the cost avoided by visiting `i`
//! then `j` back-to-back on one vehicle of type `t`, instead of each from
//! its own round trip to the depot. Vehicle types are vehicles grouped by
//! the model's vehicle-class equivalence (cost class, fixed cost, start,
//! end, and dimension profile), a finer grouping than plain
//! cost-class + start + end; reusing it here avoids recomputing a second,
//! coarser equivalence relation just for Savings.
//!
//! *Sequential*: opens one route with the single highest-saving pair, then
//! repeatedly extends whichever end (head or tail) has the best remaining
//! saving touching it, closing the route once neither end can be extended
//! and moving on to the next.
//!
//! *Parallel*: walks the full savings list once, highest first. Each entry
//! either opens a new route, extends an existing route from the matching
//! end, or splices two routes together when the saving links one route's
//! tail to another's head. Opening a new route draws the cheapest
//! available vehicle of that saving's type first.
//!
//! Any customer no savings pair ever reaches is appended to the nearest
//! open chain end (or seeds a fresh singleton route) in a final pass.

use std::collections::{HashMap, HashSet, VecDeque};

use routing_core::{Assignment, RoutingModel, VehicleClassIndex};

use crate::filters::LocalSearchFilter;
use crate::random::Random;

use super::{DecisionBuilder, FilteredAssignmentBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsVariant {
    Sequential,
    Parallel,
}

pub struct Savings {
    pub variant: SavingsVariant,
    /// `coef` in `saving(i,j,t) = arc(start_t,j) + arc(i,end_t) - coef *
    /// arc(i,j)`. The classical Clarke-Wright coefficient is `1`.
    pub arc_coefficient: i64,
    /// Restricts the `(i, j)` pairs considered for savings to those where
    /// `j` is among `i`'s `ratio` nearest customers, or vice versa
    /// (symmetrized), instead of scoring every ordered pair.
    pub savings_neighbors_ratio: Option<f64>,
}

impl Default for Savings {
    fn default() -> Self {
        Savings {
            variant: SavingsVariant::Parallel,
            arc_coefficient: 1,
            savings_neighbors_ratio: None,
        }
    }
}

struct VehicleType {
    representative: usize,
    start: i64,
    end: i64,
}

struct SavingsEntry {
    saving: i64,
    i: i64,
    j: i64,
    type_index: usize,
}

impl Savings {
    fn vehicle_types(&self, model: &RoutingModel) -> (Vec<VehicleType>, Vec<usize>) {
        let mut representative_of_class: HashMap<VehicleClassIndex, usize> = HashMap::new();
        let mut type_index_of_class: HashMap<VehicleClassIndex, usize> = HashMap::new();
        let mut types = Vec::new();
        let mut vehicle_type = vec![0usize; model.num_vehicles()];

        for vehicle in 0..model.num_vehicles() {
            let class = model.vehicle_class_of_vehicle(vehicle);
            let type_index = *type_index_of_class.entry(class).or_insert_with(|| {
                let representative = *representative_of_class.entry(class).or_insert(vehicle);
                types.push(VehicleType {
                    representative,
                    start: model.manager().start(representative),
                    end: model.manager().end(representative),
                });
                types.len() - 1
            });
            vehicle_type[vehicle] = type_index;
        }
        (types, vehicle_type)
    }

    /// Vehicles available to open a fresh route, grouped by type index and
    /// ordered cheapest fixed cost first.
    fn available_by_type(&self, model: &RoutingModel, vehicle_type: &[usize], num_types: usize) -> Vec<VecDeque<usize>> {
        let mut available: Vec<Vec<usize>> = vec![Vec::new(); num_types];
        for vehicle in 0..model.num_vehicles() {
            available[vehicle_type[vehicle]].push(vehicle);
        }
        available
            .into_iter()
            .map(|mut vehicles| {
                vehicles.sort_by_key(|&v| model.vehicle_classes()[model.vehicle_class_of_vehicle(v).0].fixed_cost);
                vehicles.into()
            })
            .collect()
    }

    fn build_savings_list(
        &self,
        model: &RoutingModel,
        customers: &[i64],
        types: &[VehicleType],
    ) -> Option<Vec<SavingsEntry>> {
        let neighbor_pairs = self.restrict_to_neighbors(model, customers, types)?;

        let mut entries = Vec::new();
        for &(i, j) in &neighbor_pairs {
            for (type_index, t) in types.iter().enumerate() {
                let to_j = model.arc_cost_for_vehicle(t.start, j, t.representative as i64).ok()?;
                let from_i = model.arc_cost_for_vehicle(i, t.end, t.representative as i64).ok()?;
                let direct = model.arc_cost_for_vehicle(i, j, t.representative as i64).ok()?;
                let saving = to_j + from_i - self.arc_coefficient * direct;
                entries.push(SavingsEntry { saving, i, j, type_index });
            }
        }
        entries.sort_by(|a, b| b.saving.cmp(&a.saving));
        Some(entries)
    }

    /// All ordered pairs `(i, j)` worth scoring: every pair when no ratio
    /// is configured, otherwise only those where `j` is among `i`'s
    /// nearest `ratio` fraction of the other customers (by raw arc cost
    /// under the first vehicle type), or `i` is among `j`'s.
    fn restrict_to_neighbors(
        &self,
        model: &RoutingModel,
        customers: &[i64],
        types: &[VehicleType],
    ) -> Option<Vec<(i64, i64)>> {
        let Some(ratio) = self.savings_neighbors_ratio else {
            let mut pairs = Vec::new();
            for &i in customers {
                for &j in customers {
                    if i != j {
                        pairs.push((i, j));
                    }
                }
            }
            return Some(pairs);
        };
        let representative = types.first().map(|t| t.representative).unwrap_or(0) as i64;
        let keep = ((customers.len() as f64) * ratio).ceil().max(1.0) as usize;

        let mut nearest: HashMap<i64, HashSet<i64>> = HashMap::new();
        for &i in customers {
            let mut costs: Vec<(i64, i64)> = Vec::new();
            for &j in customers {
                if i == j {
                    continue;
                }
                costs.push((model.arc_cost_for_vehicle(i, j, representative).ok()?, j));
            }
            costs.sort();
            nearest.insert(i, costs.into_iter().take(keep).map(|(_, j)| j).collect());
        }

        let mut pairs = Vec::new();
        for &i in customers {
            for &j in customers {
                if i == j {
                    continue;
                }
                let i_near_j = nearest.get(&i).map(|s| s.contains(&j)).unwrap_or(false);
                let j_near_i = nearest.get(&j).map(|s| s.contains(&i)).unwrap_or(false);
                if i_near_j || j_near_i {
                    pairs.push((i, j));
                }
            }
        }
        Some(pairs)
    }

    fn build_parallel(
        &self,
        model: &RoutingModel,
        builder: &mut FilteredAssignmentBuilder<'_>,
        entries: &[SavingsEntry],
        types: &[VehicleType],
        vehicle_type: &[usize],
        mut available: Vec<VecDeque<usize>>,
    ) -> Option<()> {
        let num_vehicles = model.num_vehicles();
        let mut chain_start: Vec<Option<i64>> = vec![None; num_vehicles];
        let mut chain_end: Vec<Option<i64>> = vec![None; num_vehicles];
        let mut head_owner: HashMap<i64, usize> = HashMap::new();
        let mut tail_owner: HashMap<i64, usize> = HashMap::new();
        let mut placed: HashSet<i64> = HashSet::new();

        for entry in entries {
            if entry.saving <= 0 {
                break;
            }
            let (i, j, type_index) = (entry.i, entry.j, entry.type_index);
            if !model.is_vehicle_allowed(i, types[type_index].representative)
                || !model.is_vehicle_allowed(j, types[type_index].representative)
            {
                continue;
            }

            let i_placed = placed.contains(&i);
            let j_placed = placed.contains(&j);

            if !i_placed && !j_placed {
                let Some(vehicle) = available[type_index].pop_front() else {
                    continue;
                };
                let start = model.manager().start(vehicle);
                let end = model.manager().end(vehicle);
                builder.set_value(start, i);
                builder.set_value(i, j);
                builder.set_value(j, end);
                if builder.commit() {
                    chain_start[vehicle] = Some(i);
                    chain_end[vehicle] = Some(j);
                    head_owner.insert(i, vehicle);
                    tail_owner.insert(j, vehicle);
                    placed.insert(i);
                    placed.insert(j);
                } else {
                    available[type_index].push_front(vehicle);
                }
            } else if i_placed && !j_placed {
                let Some(&vehicle) = tail_owner.get(&i) else {
                    continue;
                };
                let end = model.manager().end(vehicle);
                builder.set_value(i, j);
                builder.set_value(j, end);
                if builder.commit() {
                    chain_end[vehicle] = Some(j);
                    tail_owner.remove(&i);
                    tail_owner.insert(j, vehicle);
                    placed.insert(j);
                }
            } else if !i_placed && j_placed {
                let Some(&vehicle) = head_owner.get(&j) else {
                    continue;
                };
                let start = model.manager().start(vehicle);
                builder.set_value(start, i);
                builder.set_value(i, j);
                if builder.commit() {
                    chain_start[vehicle] = Some(i);
                    head_owner.remove(&j);
                    head_owner.insert(i, vehicle);
                    placed.insert(i);
                }
            } else {
                let (Some(&vehicle_a), Some(&vehicle_b)) = (tail_owner.get(&i), head_owner.get(&j)) else {
                    continue;
                };
                if vehicle_a == vehicle_b {
                    continue;
                }
                let end_a = model.manager().end(vehicle_a);
                let start_b = model.manager().start(vehicle_b);
                let end_b = model.manager().end(vehicle_b);
                builder.set_value(i, j);
                builder.set_value(chain_end[vehicle_b].unwrap(), end_a);
                builder.set_value(start_b, end_b);
                if builder.commit() {
                    let new_tail = chain_end[vehicle_b].unwrap();
                    chain_end[vehicle_a] = Some(new_tail);
                    tail_owner.remove(&i);
                    tail_owner.insert(new_tail, vehicle_a);
                    head_owner.remove(&j);
                    chain_start[vehicle_b] = None;
                    chain_end[vehicle_b] = None;
                    available[vehicle_type[vehicle_b]].push_front(vehicle_b);
                }
            }
        }
        Some(())
    }

    fn build_sequential(
        &self,
        model: &RoutingModel,
        builder: &mut FilteredAssignmentBuilder<'_>,
        entries: &[SavingsEntry],
        types: &[VehicleType],
        mut available: Vec<VecDeque<usize>>,
        customers: &[i64],
    ) -> Option<()> {
        let mut placed: HashSet<i64> = HashSet::new();

        loop {
            let Some(opening) = entries.iter().find(|e| {
                e.saving > 0 && !placed.contains(&e.i) && !placed.contains(&e.j)
            }) else {
                break;
            };
            let type_index = opening.type_index;
            let Some(vehicle) = available[type_index].pop_front() else {
                // No vehicle left of this type; drop this pair's type from
                // consideration by marking both unusable for opening and
                // retrying with the next best pair.
                placed.insert(opening.i);
                continue;
            };
            let (mut head, mut tail) = (opening.i, opening.j);
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            builder.set_value(start, head);
            builder.set_value(head, tail);
            builder.set_value(tail, end);
            if !builder.commit() {
                available[type_index].push_front(vehicle);
                placed.insert(opening.i);
                continue;
            }
            placed.insert(head);
            placed.insert(tail);

            loop {
                let extension = entries
                    .iter()
                    .filter(|e| e.type_index == type_index)
                    .find_map(|e| {
                        if e.saving <= 0 {
                            return None;
                        }
                        if e.i == tail && !placed.contains(&e.j) {
                            Some((true, e.j))
                        } else if e.j == head && !placed.contains(&e.i) {
                            Some((false, e.i))
                        } else {
                            None
                        }
                    });
                match extension {
                    Some((extend_tail, node)) => {
                        if extend_tail {
                            builder.set_value(tail, node);
                            builder.set_value(node, end);
                        } else {
                            builder.set_value(start, node);
                            builder.set_value(node, head);
                        }
                        if builder.commit() {
                            if extend_tail {
                                tail = node;
                            } else {
                                head = node;
                            }
                            placed.insert(node);
                        } else {
                            // Filters rejected the extension; leave it
                            // pending for the fallback pass rather than
                            // retrying it against this route forever.
                            placed.insert(node);
                        }
                    }
                    None => break,
                }
            }

            if placed.len() >= customers.len() {
                break;
            }
        }
        Some(())
    }
}

impl DecisionBuilder for Savings {
    fn name(&self) -> &'static str {
        "Savings"
    }

    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        _random: &mut Random,
    ) -> Option<Assignment> {
        let mut builder = FilteredAssignmentBuilder::new(model, filters, None)?;
        let num_vehicles = model.num_vehicles();
        let customers = builder.pending_indices();
        let (types, vehicle_type) = self.vehicle_types(model);
        if types.is_empty() || customers.is_empty() {
            return if builder.is_complete() { Some(builder.committed().clone()) } else { None };
        }
        let available = self.available_by_type(model, &vehicle_type, types.len());
        let entries = self.build_savings_list(model, &customers, &types)?;

        match self.variant {
            SavingsVariant::Parallel => {
                self.build_parallel(model, &mut builder, &entries, &types, &vehicle_type, available)?;
            }
            SavingsVariant::Sequential => {
                self.build_sequential(model, &mut builder, &entries, &types, available, &customers)?;
            }
        }

        // Fallback pass for any customer no savings pair ever placed.
        loop {
            let remaining = builder.pending_indices();
            let Some(&node) = remaining.first() else {
                break;
            };
            let active_ends: Vec<(usize, i64)> = builder.chain_ends();
            let mut best: Option<(i64, i64)> = None; // (cost, prev)
            for &(vehicle, end) in &active_ends {
                if vehicle >= num_vehicles || !model.is_vehicle_allowed(node, vehicle) {
                    continue;
                }
                let cost = model.arc_cost_for_vehicle(end, node, vehicle as i64).ok()?;
                if best.map(|(c, _)| cost < c).unwrap_or(true) {
                    best = Some((cost, end));
                }
            }
            match best {
                Some((_, prev)) => {
                    if !builder.try_insert_after(prev, node) {
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
    use std::collections::HashSet as StdHashSet;

    #[test]
    fn test_builds_tsp4_route() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = Savings::default();
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: StdHashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, StdHashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_merges_two_singleton_routes_with_two_vehicles() {
        let manager = IndexManager::new(3, &[0, 0], &[0, 0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = Savings::default();
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();
        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: StdHashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, StdHashSet::from([1, 2]));
    }

    #[test]
    fn test_sequential_variant_builds_tsp4_route() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();

        let builder = Savings {
            variant: SavingsVariant::Sequential,
            ..Savings::default()
        };
        let filters: Vec<Box<dyn LocalSearchFilter>> = vec![];
        let mut random = Random::seed(1);
        let assignment = builder.build(&model, &filters, &mut random).unwrap();

        let routes = routing_core::assignment_to_routes(model.manager(), &assignment).unwrap();
        let visited: StdHashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, StdHashSet::from([1, 2, 3]));
    }
}
