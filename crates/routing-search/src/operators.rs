//! Neighborhood operators: each takes a complete `Assignment` and proposes
//! one structurally different neighbor. A trait object collection the
//! orchestrator iterates, rolling `chance()` before calling `execute`.

use std::collections::HashSet;

use routing_core::{Assignment, RoutingModel};

use crate::random::Random;

pub trait Operator {
    fn name(&self) -> &'static str;

    /// Returns a neighboring assignment, or `None` if this operator found
    /// no applicable move for the current solution.
    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment>;

    fn chance(&self) -> f64 {
        1.0
    }
}

#[derive(Default)]
pub struct Operators(Vec<Box<dyn Operator>>);

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Operator> {
        self.0.get(index).map(AsRef::as_ref)
    }

    pub fn push(&mut self, operator: Box<dyn Operator>) {
        self.0.push(operator);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn Operator>> {
        self.0.iter()
    }
}

/// Every non-start index currently routed (active, or unconstrained by a
/// disjunction).
fn active_nodes(model: &RoutingModel, assignment: &Assignment) -> Vec<i64> {
    let size = model.manager().size();
    (0..size)
        .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
        .filter(|&i| assignment.active(i) != Some(false))
        .collect()
}

/// Non-start indices belonging to a disjunction and currently inactive.
fn inactive_optional_nodes(model: &RoutingModel, assignment: &Assignment) -> Vec<i64> {
    let size = model.manager().size();
    (0..size)
        .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
        .filter(|&i| assignment.active(i) == Some(false))
        .filter(|&i| !model.disjunctions().containing(i).is_empty())
        .collect()
}

fn predecessor(assignment: &Assignment, node: i64) -> Option<i64> {
    assignment
        .next_indices()
        .find(|&(_, &next)| next == node)
        .map(|(&prev, _)| prev)
}

fn vehicle_of(model: &RoutingModel, assignment: &Assignment, node: i64) -> Option<usize> {
    for vehicle in 0..model.num_vehicles() {
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        if let Some(path) = assignment.walk(start, end, model.manager().size() as usize + 2) {
            if path.contains(&node) {
                return Some(vehicle);
            }
        }
    }
    None
}

/// Splices `node` out of whatever chain it's in, returning the new
/// assignment and the index `node` used to follow from.
fn remove_node(assignment: &Assignment, node: i64) -> (Assignment, i64) {
    let mut next = assignment.clone();
    let prev = predecessor(assignment, node).unwrap_or(node);
    let after = assignment.next(node).unwrap_or(node);
    next.set_next(prev, after);
    (next, prev)
}

fn insert_after(assignment: &Assignment, prev: i64, node: i64) -> Assignment {
    let mut next = assignment.clone();
    let old_next = assignment.next(prev).unwrap_or(prev);
    next.set_next(prev, node);
    next.set_next(node, old_next);
    next
}

fn random_pair(count: usize, random: &mut Random) -> Option<(usize, usize)> {
    if count < 2 {
        return None;
    }
    let a = random.range_usize(0, count);
    let mut b = random.range_usize(0, count);
    while b == a {
        b = random.range_usize(0, count);
    }
    Some((a, b))
}

/// Relocates one random active node to follow another random position.
pub struct Relocate;

impl Operator for Relocate {
    fn name(&self) -> &'static str {
        "Relocate"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let nodes = active_nodes(model, assignment);
        if nodes.len() < 2 {
            return None;
        }
        let node = nodes[random.range_usize(0, nodes.len())];
        let (removed, _) = remove_node(assignment, node);
        let candidates: Vec<i64> = removed
            .next_indices()
            .map(|(&from, _)| from)
            .filter(|&from| from != node)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let target = candidates[random.range_usize(0, candidates.len())];
        Some(insert_after(&removed, target, node))
    }
}

/// Swaps the positions of two random active nodes.
pub struct Exchange;

impl Operator for Exchange {
    fn name(&self) -> &'static str {
        "Exchange"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let nodes = active_nodes(model, assignment);
        let (ia, ib) = random_pair(nodes.len(), random)?;
        let (a, b) = (nodes[ia], nodes[ib]);
        let prev_a = predecessor(assignment, a)?;
        let prev_b = predecessor(assignment, b)?;
        let next_a = assignment.next(a)?;
        let next_b = assignment.next(b)?;

        let mut candidate = assignment.clone();
        if next_a == b {
            candidate.set_next(prev_a, b);
            candidate.set_next(b, a);
            candidate.set_next(a, next_b);
        } else if next_b == a {
            candidate.set_next(prev_b, a);
            candidate.set_next(a, b);
            candidate.set_next(b, next_a);
        } else {
            candidate.set_next(prev_a, b);
            candidate.set_next(b, next_a);
            candidate.set_next(prev_b, a);
            candidate.set_next(a, next_b);
        }
        Some(candidate)
    }
}

/// Swaps the tail segments of two vehicles' routes at random cut points.
pub struct Cross;

impl Operator for Cross {
    fn name(&self) -> &'static str {
        "Cross"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let (va, vb) = random_pair(model.num_vehicles(), random)?;
        let end_a = model.manager().end(va);
        let end_b = model.manager().end(vb);
        let path_a = assignment.walk(model.manager().start(va), end_a, model.manager().size() as usize + 2)?;
        let path_b = assignment.walk(model.manager().start(vb), end_b, model.manager().size() as usize + 2)?;
        if path_a.len() < 2 || path_b.len() < 2 {
            return None;
        }
        let cut_a = random.range_usize(0, path_a.len() - 1);
        let cut_b = random.range_usize(0, path_b.len() - 1);

        let mut candidate = assignment.clone();
        candidate.set_next(path_a[cut_a], path_b[cut_b + 1]);
        candidate.set_next(path_b[cut_b], path_a[cut_a + 1]);
        Some(candidate)
    }
}

/// Reverses a random segment of one vehicle's route.
pub struct TwoOpt;

impl Operator for TwoOpt {
    fn name(&self) -> &'static str {
        "TwoOpt"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        if path.len() < 5 {
            return None;
        }
        // Interior positions only: index 0 is the vehicle start, the last
        // index is the vehicle end, neither may move.
        let mut i = random.range_usize(1, path.len() - 1);
        let mut j = random.range_usize(1, path.len() - 1);
        if i > j {
            std::mem::swap(&mut i, &mut j);
        }
        if j - i < 2 {
            return None;
        }

        let mut candidate = assignment.clone();
        let mut segment: Vec<i64> = path[i..=j].to_vec();
        segment.reverse();
        for w in segment.windows(2) {
            candidate.set_next(w[0], w[1]);
        }
        candidate.set_next(path[i - 1], segment[0]);
        candidate.set_next(*segment.last().unwrap(), path[j + 1]);
        Some(candidate)
    }
}

/// Relocates a chain of 1-3 consecutive nodes elsewhere (generalizes
/// `Relocate` to move blocks.
pub struct OrOpt {
    pub chain_len: usize,
}

impl Default for OrOpt {
    fn default() -> Self {
        OrOpt { chain_len: 2 }
    }
}

impl Operator for OrOpt {
    fn name(&self) -> &'static str {
        "OrOpt"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        let chain_len = self.chain_len.max(1);
        if path.len() < chain_len + 3 {
            return None;
        }
        let first = random.range_usize(1, path.len() - chain_len - 1);
        let chain = &path[first..first + chain_len];
        let before = path[first - 1];
        let after = path[first + chain_len];

        let mut candidate = assignment.clone();
        candidate.set_next(before, after);

        let targets: Vec<i64> = path
            .iter()
            .copied()
            .filter(|p| !chain.contains(p) && *p != before && *p != end)
            .collect();
        if targets.is_empty() {
            return None;
        }
        let target = targets[random.range_usize(0, targets.len())];
        let target_next = candidate.next(target).unwrap_or(target);
        candidate.set_next(target, chain[0]);
        for w in chain.windows(2) {
            candidate.set_next(w[0], w[1]);
        }
        candidate.set_next(*chain.last().unwrap(), target_next);
        Some(candidate)
    }
}

/// Chained improving 2-opt moves within one route — a bounded
/// approximation of Lin-Kernighan's sequential-edge-exchange search,
/// since the unbounded variable-depth search is out of scope for a
/// heuristic library.
pub struct LinKernighan {
    pub depth: usize,
}

impl Default for LinKernighan {
    fn default() -> Self {
        LinKernighan { depth: 3 }
    }
}

impl Operator for LinKernighan {
    fn name(&self) -> &'static str {
        "LinKernighan"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let mut current = assignment.clone();
        let mut applied = false;
        let two_opt = TwoOpt;
        for _ in 0..self.depth {
            match two_opt.execute(model, &current, random) {
                Some(next) => {
                    current = next;
                    applied = true;
                }
                None => break,
            }
        }
        applied.then_some(current)
    }
}

/// Or-opt restricted to moves that keep the chain within the same
/// vehicle's route — a single-route refinement of `OrOpt`.
pub struct TspOpt;

impl Operator for TspOpt {
    fn name(&self) -> &'static str {
        "TSPOpt"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        if path.len() < 5 {
            return None;
        }
        let node_pos = random.range_usize(1, path.len() - 1);
        let node = path[node_pos];
        let (removed, _) = remove_node(assignment, node);
        let remaining = removed.walk(start, end, model.manager().size() as usize + 2)?;
        let candidates: Vec<i64> = remaining.into_iter().filter(|&p| p != end).collect();
        if candidates.is_empty() {
            return None;
        }
        let target = candidates[random.range_usize(0, candidates.len())];
        Some(insert_after(&removed, target, node))
    }
}

/// Relocates a pickup/delivery pair together, preserving their relative
/// order, to a new position.
pub struct RelocatePair;

impl Operator for RelocatePair {
    fn name(&self) -> &'static str {
        "RelocatePair"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let pairs = model.pickup_delivery_pairs();
        if pairs.len() == 0 {
            return None;
        }
        let pair_index = random.range_usize(0, pairs.len());
        let pair = pairs.get(pair_index);
        let (pickup, delivery) = (pair.pickup, pair.delivery);

        let (after_pickup_removed, _) = remove_node(assignment, pickup);
        let (after_both_removed, _) = remove_node(&after_pickup_removed, delivery);

        let vehicle = vehicle_of(model, assignment, pickup).unwrap_or(0);
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = after_both_removed.walk(start, end, model.manager().size() as usize + 2)?;
        if path.len() < 2 {
            return None;
        }
        let target = path[random.range_usize(0, path.len() - 1)];
        let with_pickup = insert_after(&after_both_removed, target, pickup);
        Some(insert_after(&with_pickup, pickup, delivery))
    }
}

/// Exchanges the positions of two pickup/delivery pairs.
pub struct ExchangePair;

impl Operator for ExchangePair {
    fn name(&self) -> &'static str {
        "ExchangePair"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let pairs = model.pickup_delivery_pairs();
        let (ia, ib) = random_pair(pairs.len(), random)?;
        let pair_a = pairs.get(ia);
        let pair_b = pairs.get(ib);
        let (pickup_a, delivery_a) = (pair_a.pickup, pair_a.delivery);
        let (pickup_b, delivery_b) = (pair_b.pickup, pair_b.delivery);
        let prev_pickup_a = predecessor(assignment, pickup_a)?;
        let prev_pickup_b = predecessor(assignment, pickup_b)?;

        let (step1, _) = remove_node(assignment, delivery_a);
        let (step2, _) = remove_node(&step1, pickup_a);
        let (step3, _) = remove_node(&step2, delivery_b);
        let (step4, _) = remove_node(&step3, pickup_b);

        let with_b_at_a = insert_after(&step4, prev_pickup_a, pickup_b);
        let with_b_delivery = insert_after(&with_b_at_a, pickup_b, delivery_b);
        let with_a_at_b = insert_after(&with_b_delivery, prev_pickup_b, pickup_a);
        Some(insert_after(&with_a_at_b, pickup_a, delivery_a))
    }
}

/// Relocates a pickup/delivery pair only to the position immediately
/// following its current neighbor, a cheaper-to-evaluate restriction of
/// `RelocatePair`.
pub struct LightRelocatePair;

impl Operator for LightRelocatePair {
    fn name(&self) -> &'static str {
        "LightRelocatePair"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let pairs = model.pickup_delivery_pairs();
        if pairs.len() == 0 {
            return None;
        }
        let pair_index = random.range_usize(0, pairs.len());
        let pair = pairs.get(pair_index);
        let (pickup, delivery) = (pair.pickup, pair.delivery);
        let after_delivery = assignment.next(delivery)?;
        if after_delivery == model.manager().end(vehicle_of(model, assignment, pickup).unwrap_or(0)) {
            return None;
        }
        let target = assignment.next(after_delivery).unwrap_or(after_delivery);

        let (step1, _) = remove_node(assignment, delivery);
        let (step2, _) = remove_node(&step1, pickup);
        let with_pickup = insert_after(&step2, target, pickup);
        Some(insert_after(&with_pickup, pickup, delivery))
    }
}

/// Relocates a node together with its immediate chain neighbor as one
/// two-node block.
pub struct RelocateNeighbors;

impl Operator for RelocateNeighbors {
    fn name(&self) -> &'static str {
        "RelocateNeighbors"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        OrOpt { chain_len: 2 }.execute(model, assignment, random)
    }
}

/// Relocates whichever active node currently has the highest sum of
/// incident arc costs among a random sample.
pub struct RelocateExpensiveChain {
    pub sample_size: usize,
}

impl Default for RelocateExpensiveChain {
    fn default() -> Self {
        RelocateExpensiveChain { sample_size: 8 }
    }
}

impl Operator for RelocateExpensiveChain {
    fn name(&self) -> &'static str {
        "RelocateExpensiveChain"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let nodes = active_nodes(model, assignment);
        if nodes.is_empty() {
            return None;
        }
        let mut worst: Option<(i64, i64)> = None; // (cost, node)
        for _ in 0..self.sample_size.min(nodes.len()) {
            let node = nodes[random.range_usize(0, nodes.len())];
            let vehicle = vehicle_of(model, assignment, node).unwrap_or(0) as i64;
            let prev = predecessor(assignment, node)?;
            let next = assignment.next(node)?;
            let incident = model.arc_cost_for_vehicle(prev, node, vehicle).ok()?
                + model.arc_cost_for_vehicle(node, next, vehicle).ok()?;
            if worst.map(|(c, _)| incident > c).unwrap_or(true) {
                worst = Some((incident, node));
            }
        }
        let (_, node) = worst?;
        let (removed, _) = remove_node(assignment, node);
        let candidates: Vec<i64> = removed
            .next_indices()
            .map(|(&from, _)| from)
            .filter(|&from| from != node)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let target = candidates[random.range_usize(0, candidates.len())];
        Some(insert_after(&removed, target, node))
    }
}

/// Activates one currently-inactive optional node at its cheapest
/// insertion point.
pub struct MakeActive;

impl Operator for MakeActive {
    fn name(&self) -> &'static str {
        "MakeActive"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let inactive = inactive_optional_nodes(model, assignment);
        if inactive.is_empty() {
            return None;
        }
        let node = inactive[random.range_usize(0, inactive.len())];
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let target = model.manager().start(vehicle);
        let mut candidate = insert_after(assignment, target, node);
        candidate.set_active(node, true);
        Some(candidate)
    }
}

/// Deactivates one active, disjunction-member node and removes it from
/// its route.
pub struct MakeInactive;

impl Operator for MakeInactive {
    fn name(&self) -> &'static str {
        "MakeInactive"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let size = model.manager().size();
        let members: Vec<i64> = (0..size)
            .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
            .filter(|&i| assignment.active(i) != Some(false))
            .filter(|&i| !model.disjunctions().containing(i).is_empty())
            .collect();
        if members.is_empty() {
            return None;
        }
        let node = members[random.range_usize(0, members.len())];
        let (mut candidate, _) = remove_node(assignment, node);
        candidate.set_active(node, false);
        Some(candidate)
    }
}

/// Deactivates a contiguous chain of 2-3 disjunction-member nodes
/// (generalizes `MakeInactive`).
pub struct MakeChainInactive {
    pub chain_len: usize,
}

impl Default for MakeChainInactive {
    fn default() -> Self {
        MakeChainInactive { chain_len: 2 }
    }
}

impl Operator for MakeChainInactive {
    fn name(&self) -> &'static str {
        "MakeChainInactive"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        let chain_len = self.chain_len.max(1);
        if path.len() < chain_len + 2 {
            return None;
        }
        let first = random.range_usize(1, path.len() - chain_len);
        let chain = &path[first..first + chain_len];
        if !chain
            .iter()
            .all(|&n| !model.disjunctions().containing(n).is_empty())
        {
            return None;
        }
        let before = path[first - 1];
        let after = path[first + chain_len];
        let mut candidate = assignment.clone();
        candidate.set_next(before, after);
        for &n in chain {
            candidate.set_active(n, false);
        }
        Some(candidate)
    }
}

/// Swaps active status between an active disjunction member and one of
/// its inactive disjunction siblings, inserting the newly active node at
/// the departing node's old slot.
pub struct SwapActive;

impl Operator for SwapActive {
    fn name(&self) -> &'static str {
        "SwapActive"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let size = model.manager().size();
        let active_members: Vec<i64> = (0..size)
            .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
            .filter(|&i| assignment.active(i) != Some(false))
            .filter(|&i| !model.disjunctions().containing(i).is_empty())
            .collect();
        if active_members.is_empty() {
            return None;
        }
        let leaving = active_members[random.range_usize(0, active_members.len())];
        let disjunction = model.disjunctions().containing(leaving).first()?;
        let siblings: Vec<i64> = (0..size)
            .filter(|&i| model.disjunctions().containing(i).contains(disjunction))
            .filter(|&i| assignment.active(i) == Some(false))
            .collect();
        if siblings.is_empty() {
            return None;
        }
        let entering = siblings[random.range_usize(0, siblings.len())];

        let (mut candidate, prev) = remove_node(assignment, leaving);
        candidate.set_active(leaving, false);
        candidate = insert_after(&candidate, prev, entering);
        candidate.set_active(entering, true);
        Some(candidate)
    }
}

/// Like `SwapActive`, but the entering node may land anywhere in the
/// route rather than only the departing node's slot.
pub struct ExtendedSwapActive;

impl Operator for ExtendedSwapActive {
    fn name(&self) -> &'static str {
        "ExtendedSwapActive"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let size = model.manager().size();
        let active_members: Vec<i64> = (0..size)
            .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
            .filter(|&i| assignment.active(i) != Some(false))
            .filter(|&i| !model.disjunctions().containing(i).is_empty())
            .collect();
        if active_members.is_empty() {
            return None;
        }
        let leaving = active_members[random.range_usize(0, active_members.len())];
        let disjunction = model.disjunctions().containing(leaving).first()?;
        let siblings: Vec<i64> = (0..size)
            .filter(|&i| model.disjunctions().containing(i).contains(disjunction))
            .filter(|&i| assignment.active(i) == Some(false))
            .collect();
        if siblings.is_empty() {
            return None;
        }
        let entering = siblings[random.range_usize(0, siblings.len())];

        let (mut candidate, _) = remove_node(assignment, leaving);
        candidate.set_active(leaving, false);
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let target = model.manager().start(vehicle);
        candidate = insert_after(&candidate, target, entering);
        candidate.set_active(entering, true);
        Some(candidate)
    }
}

/// Swaps two consecutive two-node blocks between routes — a block
/// generalization of `Exchange`.
pub struct NodePairSwap;

impl Operator for NodePairSwap {
    fn name(&self) -> &'static str {
        "NodePairSwap"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let nodes = active_nodes(model, assignment);
        if nodes.len() < 4 {
            return None;
        }
        let a0 = nodes[random.range_usize(0, nodes.len())];
        let a1 = assignment.next(a0)?;
        if model.manager().is_end(a1) {
            return None;
        }
        let mut others: Vec<i64> = nodes
            .iter()
            .copied()
            .filter(|&n| n != a0 && n != a1)
            .collect();
        if others.is_empty() {
            return None;
        }
        random.shuffle(&mut others);
        let b0 = others[0];
        let b1 = assignment.next(b0)?;
        if b1 == a0 || model.manager().is_end(b1) {
            return None;
        }
        let prev_a = predecessor(assignment, a0)?;
        let prev_b = predecessor(assignment, b0)?;
        let after_a = assignment.next(a1)?;
        let after_b = assignment.next(b1)?;

        let mut candidate = assignment.clone();
        candidate.set_next(prev_a, b0);
        candidate.set_next(b0, b1);
        candidate.set_next(b1, after_a);
        candidate.set_next(prev_b, a0);
        candidate.set_next(a0, a1);
        candidate.set_next(a1, after_b);
        Some(candidate)
    }
}

/// Compound move: relocates a pickup/delivery pair, then exchanges one
/// unrelated active node elsewhere in the same candidate.
pub struct ExchangeRelocatePair;

impl Operator for ExchangeRelocatePair {
    fn name(&self) -> &'static str {
        "ExchangeRelocatePair"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let relocated = RelocatePair.execute(model, assignment, random)?;
        Exchange.execute(model, &relocated, random).or(Some(relocated))
    }
}

fn reinsert_greedily(model: &RoutingModel, mut candidate: Assignment, nodes: &[i64], random: &mut Random) -> Option<Assignment> {
    let mut order = nodes.to_vec();
    random.shuffle(&mut order);
    for node in order {
        let mut best: Option<(i64, i64)> = None; // (cost, prev)
        for vehicle in 0..model.num_vehicles() {
            if !model.is_vehicle_allowed(node, vehicle) {
                continue;
            }
            let start = model.manager().start(vehicle);
            let end = model.manager().end(vehicle);
            let path = candidate.walk(start, end, model.manager().size() as usize + 2)?;
            for w in path.windows(2) {
                let added = model.arc_cost_for_vehicle(w[0], node, vehicle as i64).ok()?
                    + model.arc_cost_for_vehicle(node, w[1], vehicle as i64).ok()?
                    - model.arc_cost_for_vehicle(w[0], w[1], vehicle as i64).ok()?;
                if best.map(|(c, _)| added < c).unwrap_or(true) {
                    best = Some((added, w[0]));
                }
            }
        }
        let (_, prev) = best?;
        candidate = insert_after(&candidate, prev, node);
    }
    Some(candidate)
}

/// Destroys a random contiguous sub-chain of one route and greedily
/// reinserts the removed nodes anywhere.
pub struct PathLns {
    pub destroy_len: usize,
}

impl Default for PathLns {
    fn default() -> Self {
        PathLns { destroy_len: 3 }
    }
}

impl Operator for PathLns {
    fn name(&self) -> &'static str {
        "PathLNS"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        let destroy_len = self.destroy_len.max(1).min(path.len().saturating_sub(2));
        if destroy_len == 0 {
            return None;
        }
        let first = random.range_usize(1, path.len() - destroy_len);
        let removed_nodes = path[first..first + destroy_len].to_vec();
        let before = path[first - 1];
        let after = path[first + destroy_len];

        let mut candidate = assignment.clone();
        candidate.set_next(before, after);
        reinsert_greedily(model, candidate, &removed_nodes, random)
    }
}

/// Destroys a random fraction of every route's nodes and greedily
/// reinserts all of them.
pub struct FullPathLns {
    pub destroy_fraction: f64,
}

impl Default for FullPathLns {
    fn default() -> Self {
        FullPathLns { destroy_fraction: 0.2 }
    }
}

impl Operator for FullPathLns {
    fn name(&self) -> &'static str {
        "FullPathLNS"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let nodes = active_nodes(model, assignment);
        if nodes.is_empty() {
            return None;
        }
        let count = ((nodes.len() as f64) * self.destroy_fraction).ceil() as usize;
        let count = count.max(1).min(nodes.len());
        let mut shuffled = nodes.clone();
        random.shuffle(&mut shuffled);
        let to_remove: HashSet<i64> = shuffled.into_iter().take(count).collect();

        let mut candidate = assignment.clone();
        for &node in &to_remove {
            let (next, _) = remove_node(&candidate, node);
            candidate = next;
        }
        let removed_nodes: Vec<i64> = to_remove.into_iter().collect();
        reinsert_greedily(model, candidate, &removed_nodes, random)
    }
}

/// `PathLNS` restricted to a single vehicle's route for both destroy and
/// repair.
pub struct TspLns {
    pub destroy_len: usize,
}

impl Default for TspLns {
    fn default() -> Self {
        TspLns { destroy_len: 3 }
    }
}

impl Operator for TspLns {
    fn name(&self) -> &'static str {
        "TSPLNS"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let vehicle = random.range_usize(0, model.num_vehicles().max(1));
        let start = model.manager().start(vehicle);
        let end = model.manager().end(vehicle);
        let path = assignment.walk(start, end, model.manager().size() as usize + 2)?;
        let destroy_len = self.destroy_len.max(1).min(path.len().saturating_sub(2));
        if destroy_len == 0 {
            return None;
        }
        let first = random.range_usize(1, path.len() - destroy_len);
        let removed_nodes = path[first..first + destroy_len].to_vec();
        let before = path[first - 1];
        let after = path[first + destroy_len];

        let mut candidate = assignment.clone();
        candidate.set_next(before, after);

        let mut order = removed_nodes.clone();
        random.shuffle(&mut order);
        for node in order {
            let path_now = candidate.walk(start, end, model.manager().size() as usize + 2)?;
            let mut best: Option<(i64, i64)> = None;
            for w in path_now.windows(2) {
                let added = model.arc_cost_for_vehicle(w[0], node, vehicle as i64).ok()?
                    + model.arc_cost_for_vehicle(node, w[1], vehicle as i64).ok()?
                    - model.arc_cost_for_vehicle(w[0], w[1], vehicle as i64).ok()?;
                if best.map(|(c, _)| added < c).unwrap_or(true) {
                    best = Some((added, w[0]));
                }
            }
            let (_, prev) = best?;
            candidate = insert_after(&candidate, prev, node);
        }
        Some(candidate)
    }
}

/// Randomly flips the active status of a batch of optional nodes,
/// leaving acceptance to the orchestrator's filters.
pub struct InactiveLns {
    pub batch_size: usize,
}

impl Default for InactiveLns {
    fn default() -> Self {
        InactiveLns { batch_size: 3 }
    }
}

impl Operator for InactiveLns {
    fn name(&self) -> &'static str {
        "InactiveLNS"
    }

    fn execute(&self, model: &RoutingModel, assignment: &Assignment, random: &mut Random) -> Option<Assignment> {
        let size = model.manager().size();
        let mut members: Vec<i64> = (0..size)
            .filter(|&i| !model.manager().is_start(i) && !model.manager().is_end(i))
            .filter(|&i| !model.disjunctions().containing(i).is_empty())
            .collect();
        if members.is_empty() {
            return None;
        }
        random.shuffle(&mut members);
        let mut candidate = assignment.clone();
        let mut touched = false;
        for &node in members.iter().take(self.batch_size.max(1)) {
            match candidate.active(node) {
                Some(true) => {
                    let (next, _) = remove_node(&candidate, node);
                    candidate = next;
                    candidate.set_active(node, false);
                    touched = true;
                }
                Some(false) => {
                    let vehicle = random.range_usize(0, model.num_vehicles().max(1));
                    let target = model.manager().start(vehicle);
                    candidate = insert_after(&candidate, target, node);
                    candidate.set_active(node, true);
                    touched = true;
                }
                None => {}
            }
        }
        touched.then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::{routes_to_assignment, IndexManager};

    fn tsp_model() -> (RoutingModel, Assignment) {
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();
        let assignment = routes_to_assignment(model.manager(), &[vec![1, 2, 3]]).unwrap();
        (model, assignment)
    }

    #[test]
    fn test_relocate_preserves_all_active_nodes() {
        let (model, assignment) = tsp_model();
        let mut random = Random::seed(7);
        let candidate = Relocate.execute(&model, &assignment, &mut random).unwrap();
        let routes = routing_core::assignment_to_routes(model.manager(), &candidate).unwrap();
        let visited: HashSet<usize> = routes.into_iter().flatten().collect();
        assert_eq!(visited, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_two_opt_reverses_segment() {
        let manager = IndexManager::new(5, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();
        let assignment = routing_core::routes_to_assignment(model.manager(), &[vec![1, 2, 3, 4]]).unwrap();
        let mut random = Random::seed(3);
        let candidate = TwoOpt.execute(&model, &assignment, &mut random);
        assert!(candidate.is_some());
    }

    #[test]
    fn test_make_inactive_then_make_active_round_trips() {
        let manager = IndexManager::new(3, &[0], &[0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.add_disjunction(vec![1], 10, 0).unwrap();
        model.close().unwrap();
        let assignment = routing_core::routes_to_assignment(model.manager(), &[vec![1, 2]]).unwrap();

        let mut random = Random::seed(1);
        let deactivated = MakeInactive.execute(&model, &assignment, &mut random).unwrap();
        assert_eq!(deactivated.active(1), Some(false));
    }
}
