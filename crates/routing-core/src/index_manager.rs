//! Bijection node↔variable-index with per-vehicle start/end duplication.
//!
//! Layout of the `0..num_indices()` space:
//!
//! ```text
//! [ plain nodes (not used as any vehicle start/end) ]
//! [ vehicle starts, one per vehicle                 ]
//! [ vehicle ends, one per vehicle                   ]   <- IsEnd(i) ⇔ i ≥ Size()
//! ```
//!
//! A physical node used as a start/end for one or more vehicles never gets
//! a plain slot — it is represented solely through the per-vehicle
//! start/end indices, which is the `− (physical starts+ends)` term in
//! `N = nodes + 2·vehicles − (physical starts+ends)`.

use std::collections::HashMap;

use crate::error::{RoutingError, RoutingResult};

#[derive(Debug, Clone)]
pub struct IndexManager {
    num_vehicles: usize,
    /// Physical node id for each plain index, in index order.
    plain_node_of: Vec<usize>,
    node_to_plain_index: HashMap<usize, i64>,
    /// Physical node id backing each vehicle's start/end, for `IndexToNode`.
    start_node: Vec<usize>,
    end_node: Vec<usize>,
}

impl IndexManager {
    /// `num_nodes` is the total physical location count; `starts`/`ends`
    /// give, per vehicle, the physical node id of its start/end depot.
    pub fn new(num_nodes: usize, starts: &[usize], ends: &[usize]) -> RoutingResult<Self> {
        if starts.len() != ends.len() {
            return Err(RoutingError::InvalidParameter(
                "starts and ends must have the same length".into(),
            ));
        }
        let num_vehicles = starts.len();
        for &node in starts.iter().chain(ends.iter()) {
            if node >= num_nodes {
                return Err(RoutingError::InvalidIndex(node as i64));
            }
        }

        let mut is_terminal = vec![false; num_nodes];
        for &node in starts.iter().chain(ends.iter()) {
            is_terminal[node] = true;
        }

        let mut plain_node_of = Vec::new();
        let mut node_to_plain_index = HashMap::new();
        for node in 0..num_nodes {
            if !is_terminal[node] {
                node_to_plain_index.insert(node, plain_node_of.len() as i64);
                plain_node_of.push(node);
            }
        }

        Ok(IndexManager {
            num_vehicles,
            plain_node_of,
            node_to_plain_index,
            start_node: starts.to_vec(),
            end_node: ends.to_vec(),
        })
    }

    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// `Size()`: number of indices that are not a vehicle end.
    pub fn size(&self) -> i64 {
        (self.plain_node_of.len() + self.num_vehicles) as i64
    }

    /// Total number of variable indices, including vehicle ends.
    pub fn num_indices(&self) -> i64 {
        self.size() + self.num_vehicles as i64
    }

    pub fn start(&self, vehicle: usize) -> i64 {
        self.plain_node_of.len() as i64 + vehicle as i64
    }

    pub fn end(&self, vehicle: usize) -> i64 {
        self.size() + vehicle as i64
    }

    pub fn is_start(&self, index: i64) -> bool {
        let plain_len = self.plain_node_of.len() as i64;
        index >= plain_len && index < plain_len + self.num_vehicles as i64
    }

    pub fn is_end(&self, index: i64) -> bool {
        index >= self.size()
    }

    pub fn vehicle_of_start(&self, index: i64) -> Option<usize> {
        if self.is_start(index) {
            Some((index - self.plain_node_of.len() as i64) as usize)
        } else {
            None
        }
    }

    pub fn vehicle_of_end(&self, index: i64) -> Option<usize> {
        if self.is_end(index) {
            Some((index - self.size()) as usize)
        } else {
            None
        }
    }

    /// Physical node id backing a variable index (start/end indices
    /// resolve to their depot's physical node; this is many-to-one for
    /// shared depots, which is why the friendly node↔index translation
    /// utility is out of scope — this bijection is the internal one the
    /// Model uses, not a convenience API).
    pub fn index_to_node(&self, index: i64) -> RoutingResult<usize> {
        if let Some(v) = self.vehicle_of_start(index) {
            return Ok(self.start_node[v]);
        }
        if let Some(v) = self.vehicle_of_end(index) {
            return Ok(self.end_node[v]);
        }
        if index < 0 || index >= self.plain_node_of.len() as i64 {
            return Err(RoutingError::InvalidIndex(index));
        }
        Ok(self.plain_node_of[index as usize])
    }

    /// Index of a plain (non-terminal) node. Returns an error for a node
    /// that is some vehicle's start/end — use `start`/`end` instead.
    pub fn node_to_index(&self, node: usize) -> RoutingResult<i64> {
        self.node_to_plain_index
            .get(&node)
            .copied()
            .ok_or(RoutingError::InvalidIndex(node as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_vehicle_shared_depot() {
        // 4 nodes: 0 is the shared depot, 1..3 are customers.
        let mgr = IndexManager::new(4, &[0], &[0]).unwrap();
        assert_eq!(mgr.num_indices(), 4 + 2 - 1); // nodes + 2*V - physical starts/ends
        assert_eq!(mgr.size(), 4); // plain(3) + start(1)
        assert_eq!(mgr.start(0), 3);
        assert_eq!(mgr.end(0), 4);
        assert!(mgr.is_start(3));
        assert!(mgr.is_end(4));
        assert!(!mgr.is_end(3));
        assert_eq!(mgr.index_to_node(3).unwrap(), 0);
        assert_eq!(mgr.index_to_node(4).unwrap(), 0);
    }

    #[test]
    fn test_distinct_depots_per_vehicle() {
        // 6 nodes: 0,1 are depots for vehicle 0 and 1 respectively.
        let mgr = IndexManager::new(6, &[0, 1], &[0, 1]).unwrap();
        // physical starts+ends = {0, 1} -> 2 distinct terminal nodes
        assert_eq!(mgr.num_indices(), 6 + 4 - 2);
        assert_eq!(mgr.size(), 4 + 2); // plain(4) + starts(2)
        assert_eq!(mgr.start(0), 4);
        assert_eq!(mgr.start(1), 5);
        assert_eq!(mgr.end(0), 6);
        assert_eq!(mgr.end(1), 7);
    }

    #[test]
    fn test_node_to_index_rejects_terminal_node() {
        let mgr = IndexManager::new(3, &[0], &[0]).unwrap();
        assert!(mgr.node_to_index(0).is_err());
        assert!(mgr.node_to_index(1).is_ok());
    }

    proptest::proptest! {
        /// Index bijection: every plain node's index round-trips back to
        /// the same node, for any node/vehicle-depot layout.
        #[test]
        fn prop_plain_node_round_trips(
            num_nodes in 1usize..20,
            num_vehicles in 0usize..5,
            seed in 0u64..10_000,
        ) {
            let mut starts = Vec::new();
            let mut ends = Vec::new();
            let mut s = seed;
            for _ in 0..num_vehicles {
                s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
                starts.push((s as usize) % num_nodes);
                s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
                ends.push((s as usize) % num_nodes);
            }
            let mgr = IndexManager::new(num_nodes, &starts, &ends).unwrap();
            for node in 0..num_nodes {
                if let Ok(index) = mgr.node_to_index(node) {
                    prop_assert_eq!(mgr.index_to_node(index).unwrap(), node);
                }
            }
        }
    }
}
