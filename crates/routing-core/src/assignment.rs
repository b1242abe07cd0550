//! Assignment: the committed solution object passed between builders,
//! filters, and the orchestrator, plus its serialized on-disk form.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cost_class::DimensionIndex;
use crate::error::RoutingResult;
use crate::index_manager::IndexManager;

/// In-memory committed assignment. `cumuls`/`slacks` are keyed by dimension.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    next: HashMap<i64, i64>,
    vehicle: HashMap<i64, i64>,
    active: HashMap<i64, bool>,
    cumuls: HashMap<(DimensionIndex, i64), i64>,
    slacks: HashMap<(DimensionIndex, i64), i64>,
    cost: Option<i64>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_next(&mut self, index: i64, next: i64) {
        self.next.insert(index, next);
    }

    pub fn next(&self, index: i64) -> Option<i64> {
        self.next.get(&index).copied()
    }

    pub fn set_vehicle(&mut self, index: i64, vehicle: i64) {
        self.vehicle.insert(index, vehicle);
    }

    pub fn vehicle(&self, index: i64) -> Option<i64> {
        self.vehicle.get(&index).copied()
    }

    pub fn set_active(&mut self, index: i64, active: bool) {
        self.active.insert(index, active);
    }

    pub fn active(&self, index: i64) -> Option<bool> {
        self.active.get(&index).copied()
    }

    pub fn set_cumul(&mut self, dimension: DimensionIndex, index: i64, value: i64) {
        self.cumuls.insert((dimension, index), value);
    }

    pub fn cumul(&self, dimension: DimensionIndex, index: i64) -> Option<i64> {
        self.cumuls.get(&(dimension, index)).copied()
    }

    pub fn set_slack(&mut self, dimension: DimensionIndex, index: i64, value: i64) {
        self.slacks.insert((dimension, index), value);
    }

    pub fn slack(&self, dimension: DimensionIndex, index: i64) -> Option<i64> {
        self.slacks.get(&(dimension, index)).copied()
    }

    pub fn set_cost(&mut self, cost: i64) {
        self.cost = Some(cost);
    }

    pub fn cost(&self) -> Option<i64> {
        self.cost
    }

    pub fn next_indices(&self) -> impl Iterator<Item = (&i64, &i64)> {
        self.next.iter()
    }

    /// Follow `next` from `start` until `end` (or until a cycle would
    /// exceed `max_steps`), returning the indices visited including both
    /// endpoints. Used by the round-trip helpers and by filters that need
    /// to walk a route rather than just inspect one arc.
    pub fn walk(&self, start: i64, end: i64, max_steps: usize) -> Option<Vec<i64>> {
        let mut path = vec![start];
        let mut current = start;
        for _ in 0..max_steps {
            if current == end {
                return Some(path);
            }
            current = self.next(current)?;
            path.push(current);
        }
        None
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedAssignment {
    pub next_values: Vec<(i64, i64)>,
    /// Present only when the model's cost is non-homogeneous across
    /// vehicles.
    pub vehicle_values: Option<Vec<(i64, i64)>>,
    pub cost: i64,
}

impl Assignment {
    pub fn to_serialized(&self, include_vehicle_values: bool) -> SerializedAssignment {
        let mut next_values: Vec<(i64, i64)> = self.next.iter().map(|(&k, &v)| (k, v)).collect();
        next_values.sort();
        let vehicle_values = include_vehicle_values.then(|| {
            let mut v: Vec<(i64, i64)> = self.vehicle.iter().map(|(&k, &v)| (k, v)).collect();
            v.sort();
            v
        });
        SerializedAssignment {
            next_values,
            vehicle_values,
            cost: self.cost.unwrap_or(0),
        }
    }

    pub fn from_serialized(serialized: &SerializedAssignment) -> Self {
        let mut assignment = Assignment::new();
        for &(index, next) in &serialized.next_values {
            assignment.set_next(index, next);
        }
        if let Some(vehicle_values) = &serialized.vehicle_values {
            for &(index, vehicle) in vehicle_values {
                assignment.set_vehicle(index, vehicle);
            }
        }
        assignment.set_cost(serialized.cost);
        assignment
    }

    /// Returns `false` on I/O failure rather than propagating.
    pub fn write_to(&self, path: impl AsRef<Path>, include_vehicle_values: bool) -> bool {
        self.try_write_to(path, include_vehicle_values).is_ok()
    }

    fn try_write_to(&self, path: impl AsRef<Path>, include_vehicle_values: bool) -> io::Result<()> {
        let serialized = self.to_serialized(include_vehicle_values);
        let json = serde_json::to_string_pretty(&serialized)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    pub fn read_from(path: impl AsRef<Path>) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        let serialized: SerializedAssignment = serde_json::from_str(&contents).ok()?;
        Some(Self::from_serialized(&serialized))
    }
}

/// Build an `Assignment` from per-vehicle physical-node routes. Indices not
/// on any route are left inactive (`next(i) = i`). Fails if a route names a
/// node with no corresponding plain index (vehicle starts/ends are not
/// valid route entries).
pub fn routes_to_assignment(
    manager: &IndexManager,
    routes: &[Vec<usize>],
) -> RoutingResult<Assignment> {
    let mut assignment = Assignment::new();
    let size = manager.size();

    for index in 0..manager.num_indices() {
        if index < size {
            assignment.set_next(index, index);
            assignment.set_active(index, false);
        }
    }

    for (vehicle, route) in routes.iter().enumerate() {
        let start = manager.start(vehicle);
        let end = manager.end(vehicle);
        assignment.set_active(start, true);
        assignment.set_vehicle(start, vehicle as i64);

        let mut previous = start;
        for &node in route {
            let index = manager.node_to_index(node)?;
            assignment.set_next(previous, index);
            assignment.set_active(index, true);
            assignment.set_vehicle(index, vehicle as i64);
            previous = index;
        }
        assignment.set_next(previous, end);
    }

    Ok(assignment)
}

/// Inverse of `routes_to_assignment`. Fails if `next` chains to an index
/// that does not resolve to a physical node (a malformed or partial
/// assignment).
pub fn assignment_to_routes(
    manager: &IndexManager,
    assignment: &Assignment,
) -> RoutingResult<Vec<Vec<usize>>> {
    let mut routes = Vec::with_capacity(manager.num_vehicles());
    for vehicle in 0..manager.num_vehicles() {
        let start = manager.start(vehicle);
        let end = manager.end(vehicle);
        let mut route = Vec::new();
        let mut current = start;
        loop {
            let next = assignment.next(current).unwrap_or(end);
            if next == end {
                break;
            }
            route.push(manager.index_to_node(next)?);
            current = next;
        }
        routes.push(route);
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_routes_to_assignment() {
        // 6 nodes: 0 is the shared depot, 1..=5 are customers, 2 vehicles.
        let manager = IndexManager::new(6, &[0, 0], &[0, 0]).unwrap();
        let routes = vec![vec![1, 2], vec![3, 4, 5]];
        let assignment = routes_to_assignment(&manager, &routes).unwrap();
        let recovered = assignment_to_routes(&manager, &assignment).unwrap();
        assert_eq!(recovered, routes);
    }

    #[test]
    fn test_empty_route_chains_start_to_end() {
        let manager = IndexManager::new(2, &[0], &[0]).unwrap();
        let assignment = routes_to_assignment(&manager, &[vec![]]).unwrap();
        assert_eq!(assignment.next(manager.start(0)), Some(manager.end(0)));
    }

    #[test]
    fn test_serialization_round_trip() {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut assignment = routes_to_assignment(&manager, &[vec![1, 2]]).unwrap();
        assignment.set_cost(42);
        let serialized = assignment.to_serialized(false);
        let restored = Assignment::from_serialized(&serialized);
        assert_eq!(restored.cost(), Some(42));
        assert_eq!(
            assignment_to_routes(&manager, &restored).unwrap(),
            assignment_to_routes(&manager, &assignment).unwrap()
        );
    }

    #[test]
    fn test_routes_to_assignment_rejects_unknown_node() {
        let manager = IndexManager::new(3, &[0], &[0]).unwrap();
        let err = routes_to_assignment(&manager, &[vec![99]]).unwrap_err();
        assert_eq!(err, crate::error::RoutingError::InvalidIndex(99));
    }

    proptest::proptest! {
        /// Round-trip law: `AssignmentToRoutes(RoutesToAssignment(r)) == r`
        /// for any partition of customers 1..n across vehicles, regardless
        /// of how that partition is cut.
        #[test]
        fn prop_routes_round_trip(
            num_customers in 0usize..12,
            num_vehicles in 1usize..4,
            seed in 0u64..10_000,
        ) {
            let num_nodes = num_customers + 1;
            let starts = vec![0usize; num_vehicles];
            let ends = vec![0usize; num_vehicles];
            let manager = IndexManager::new(num_nodes, &starts, &ends).unwrap();

            let mut routes: Vec<Vec<usize>> = vec![Vec::new(); num_vehicles];
            let mut s = seed;
            for customer in 1..=num_customers {
                s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
                let vehicle = (s as usize) % num_vehicles;
                routes[vehicle].push(customer);
            }

            let assignment = routes_to_assignment(&manager, &routes).unwrap();
            let recovered = assignment_to_routes(&manager, &assignment).unwrap();
            prop_assert_eq!(recovered, routes);
        }
    }
}
