//! Vilim's theta-tree: a balanced binary tree over tasks ordered by
//! `start_min`, used by the disjunctive propagator's `EdgeFinding`
//! subprocedure to compute, in `O(log n)` per update, the earliest
//! completion time ("envelope") of any subset of tasks currently marked
//! present ("in Theta").
//!
//! Leaves are addressed by the caller's sorted position (0-indexed, by
//! ascending `start_min`); a leaf not yet inserted contributes `-infinity`
//! envelope and zero duration, so it never affects ancestors until
//! `insert` is called for it.

const NEG_INF: i64 = i64::MIN / 2;

#[derive(Clone, Copy, Debug)]
struct Node {
    envelope: i64,
    duration: i64,
}

const EMPTY: Node = Node {
    envelope: NEG_INF,
    duration: 0,
};

pub struct ThetaTree {
    leaf_count: usize,
    // Complete binary tree stored as a 1-indexed array; `tree[1]` is the
    // root, leaves occupy `[leaf_count.next_power_of_two() .. 2*pow2)`.
    tree: Vec<Node>,
    pow2: usize,
}

impl ThetaTree {
    pub fn new(leaf_count: usize) -> Self {
        let pow2 = leaf_count.max(1).next_power_of_two();
        ThetaTree {
            leaf_count,
            tree: vec![EMPTY; 2 * pow2],
            pow2,
        }
    }

    fn leaf_slot(&self, leaf: usize) -> usize {
        self.pow2 + leaf
    }

    /// Mark the task at `leaf` present with the given `start_min` and
    /// `duration_min`.
    pub fn insert(&mut self, leaf: usize, start_min: i64, duration_min: i64) {
        debug_assert!(leaf < self.leaf_count);
        let slot = self.leaf_slot(leaf);
        self.tree[slot] = Node {
            envelope: start_min + duration_min,
            duration: duration_min,
        };
        self.bubble_up(slot);
    }

    /// Remove the task at `leaf` from Theta.
    pub fn remove(&mut self, leaf: usize) {
        debug_assert!(leaf < self.leaf_count);
        let slot = self.leaf_slot(leaf);
        self.tree[slot] = EMPTY;
        self.bubble_up(slot);
    }

    fn bubble_up(&mut self, mut slot: usize) {
        while slot > 1 {
            slot /= 2;
            let left = self.tree[2 * slot];
            let right = self.tree[2 * slot + 1];
            self.tree[slot] = combine(left, right);
        }
    }

    /// Earliest completion time of every task currently present in Theta.
    pub fn envelope(&self) -> i64 {
        if self.tree.len() > 1 {
            self.tree[1].envelope
        } else {
            NEG_INF
        }
    }

    pub fn total_duration(&self) -> i64 {
        if self.tree.len() > 1 {
            self.tree[1].duration
        } else {
            0
        }
    }
}

fn combine(left: Node, right: Node) -> Node {
    Node {
        envelope: (left.envelope + right.duration).max(right.envelope),
        duration: left.duration + right.duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_has_no_envelope() {
        let tree = ThetaTree::new(4);
        assert_eq!(tree.envelope(), NEG_INF);
        assert_eq!(tree.total_duration(), 0);
    }

    #[test]
    fn test_sequential_tasks_chain_envelope() {
        // Three tasks sorted by start_min: [0,10), [5,15) can't start till 10,
        // but theta-tree assumes tasks run in leaf order back-to-back after
        // their own start_min, so envelope = max over prefixes.
        let mut tree = ThetaTree::new(3);
        tree.insert(0, 0, 10); // start 0 dur 10 -> completes 10
        tree.insert(1, 5, 5); // start 5 dur 5, but sequenced after task 0
        tree.insert(2, 8, 2);
        // envelope = completion time if all three run back to back in leaf
        // order, each task's own start_min only binding if tree is idle:
        // task0 completes at 10, task1 (dur 5) pushed to 15, task2 (dur 2)
        // pushed to 17.
        assert_eq!(tree.envelope(), 17);
        assert_eq!(tree.total_duration(), 17);
    }

    #[test]
    fn test_remove_resets_contribution() {
        let mut tree = ThetaTree::new(2);
        tree.insert(0, 0, 10);
        tree.insert(1, 0, 10);
        assert_eq!(tree.total_duration(), 20);
        tree.remove(1);
        assert_eq!(tree.total_duration(), 10);
        assert_eq!(tree.envelope(), 10);
    }
}
