//! The disjunctive propagator behind vehicle break scheduling. A
//! non-fixed-point filter: each subprocedure tightens `start_min`/
//! `end_max` once and returns `false` on detected infeasibility.

use routing_graph::ThetaTree;

#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub start_min: i64,
    pub duration_min: i64,
    pub end_max: i64,
    pub is_preemptible: bool,
}

impl Task {
    pub fn end_min(&self) -> i64 {
        self.start_min + self.duration_min
    }

    pub fn start_max(&self) -> i64 {
        self.end_max - self.duration_min
    }
}

/// `num_chain_tasks` tasks form a precedence chain (e.g. the visited nodes
/// of one vehicle's route, in order); the rest are free-floating breaks.
pub struct Tasks {
    pub tasks: Vec<Task>,
    pub num_chain_tasks: usize,
    pub forbidden_intervals: Vec<Vec<(i64, i64)>>,
}

impl Tasks {
    pub fn chain(&self) -> &[Task] {
        &self.tasks[..self.num_chain_tasks]
    }
}

/// Runs every subprocedure once, in a fixed order. Returns `false` iff
/// infeasibility was proven.
pub fn propagate(tasks: &mut Tasks) -> bool {
    precedences(tasks)
        && mirror_precedences(tasks)
        && edge_finding(tasks)
        && detectable_precedences_with_chain(tasks)
        && forbidden_intervals(tasks)
}

/// Propagate `start_min` forward along the chain, then `end_max` backward.
fn precedences(tasks: &mut Tasks) -> bool {
    for i in 1..tasks.num_chain_tasks {
        let predecessor_end_min = tasks.tasks[i - 1].end_min();
        let task = &mut tasks.tasks[i];
        task.start_min = task.start_min.max(predecessor_end_min);
        if task.start_min > task.end_max {
            return false;
        }
    }
    for i in (0..tasks.num_chain_tasks.saturating_sub(1)).rev() {
        let successor_start_max = tasks.tasks[i + 1].start_max();
        let task = &mut tasks.tasks[i];
        task.end_max = task.end_max.min(successor_start_max + task.duration_min);
        if task.start_min > task.end_max {
            return false;
        }
    }
    true
}

/// Reflect every task through a time origin, re-run `precedences`, then
/// reflect back — this filters the symmetric (end-max-tightening)
/// direction that a single forward pass misses.
fn mirror_precedences(tasks: &mut Tasks) -> bool {
    let horizon = tasks
        .tasks
        .iter()
        .map(|t| t.end_max)
        .max()
        .unwrap_or(0);

    for task in &mut tasks.tasks {
        let mirrored_start = horizon - task.end_max;
        let mirrored_end = horizon - task.start_min;
        task.start_min = mirrored_start;
        task.end_max = mirrored_end;
    }

    let ok = precedences(tasks);

    for task in &mut tasks.tasks {
        let start = horizon - task.end_max;
        let end = horizon - task.start_min;
        task.start_min = start;
        task.end_max = end;
    }

    ok
}

/// Vilim's theta-tree edge-finding pass.
/// Orders tasks by `end_max`; for every prefix under that order, detects
/// overload and strengthens `start_min` of later tasks proven to run
/// after the prefix.
fn edge_finding(tasks: &mut Tasks) -> bool {
    let n = tasks.tasks.len();
    if n == 0 {
        return true;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| tasks.tasks[i].end_max);

    let mut tree = ThetaTree::new(n);
    for (rank, &task_index) in order.iter().enumerate() {
        let task = tasks.tasks[task_index];
        tree.insert(rank, task.start_min, task.duration_min);
        if tree.envelope() > task.end_max {
            return false;
        }
    }

    // For task t, the envelope of every task ordered strictly before it
    // (by end_max) is a lower bound on when t can start, since those
    // tasks provably must all complete first in the worst case ordering.
    let mut tree = ThetaTree::new(n);
    for (rank, &task_index) in order.iter().enumerate() {
        let envelope_before = tree.envelope();
        let task = &mut tasks.tasks[task_index];
        if rank > 0 {
            task.start_min = task.start_min.max(envelope_before);
            if task.start_min > task.end_max {
                return false;
            }
        }
        tree.insert(rank, task.start_min, task.duration_min);
    }

    true
}

/// For each chain task `t` and each non-chain task `u` whose forced
/// interval overlaps the end of `t`'s slack, accumulate energy and raise
/// `start_min(t)`.
fn detectable_precedences_with_chain(tasks: &mut Tasks) -> bool {
    let chain_len = tasks.num_chain_tasks;
    for t in 0..chain_len {
        let duration_t = tasks.tasks[t].duration_min;
        let end_max_t = tasks.tasks[t].end_max;
        let mut forced_energy = 0i64;
        for u in chain_len..tasks.tasks.len() {
            let task_u = tasks.tasks[u];
            if task_u.end_min() > end_max_t - duration_t {
                forced_energy += task_u.duration_min;
            }
        }
        let task = &mut tasks.tasks[t];
        task.start_min = task.start_min.max(forced_energy);
        if task.start_min > task.end_max {
            return false;
        }
    }
    true
}

/// If `[start_min, start_min+duration_min)` intersects a forbidden
/// interval, push `start_min` to the next free point.
fn forbidden_intervals(tasks: &mut Tasks) -> bool {
    for (index, task) in tasks.tasks.iter_mut().enumerate() {
        loop {
            let window_end = task.start_min + task.duration_min;
            let overlap = tasks.forbidden_intervals[index]
                .iter()
                .find(|&&(lo, hi)| task.start_min < hi && window_end > lo);
            match overlap {
                Some(&(_, hi)) => task.start_min = hi,
                None => break,
            }
            if task.start_min > task.end_max {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start_min: i64, duration_min: i64, end_max: i64) -> Task {
        Task {
            start_min,
            duration_min,
            end_max,
            is_preemptible: false,
        }
    }

    #[test]
    fn test_precedences_push_chain_forward() {
        let mut tasks = Tasks {
            tasks: vec![task(0, 5, 100), task(0, 5, 100)],
            num_chain_tasks: 2,
            forbidden_intervals: vec![Vec::new(), Vec::new()],
        };
        assert!(precedences(&mut tasks));
        assert_eq!(tasks.tasks[1].start_min, 5);
    }

    #[test]
    fn test_forbidden_interval_pushes_start_past_break() {
        let mut tasks = Tasks {
            tasks: vec![task(8, 4, 100)],
            num_chain_tasks: 1,
            forbidden_intervals: vec![vec![(10, 20)]],
        };
        assert!(forbidden_intervals(&mut tasks));
        assert_eq!(tasks.tasks[0].start_min, 20);
    }

    #[test]
    fn test_break_scheduling_scenario() {
        // 3 nodes of service 4, break [10,20) dur 10.
        let mut tasks = Tasks {
            tasks: vec![task(8, 4, 100), task(12, 4, 100), task(16, 4, 100)],
            num_chain_tasks: 3,
            forbidden_intervals: vec![vec![(10, 20)], vec![(10, 20)], vec![(10, 20)]],
        };
        assert!(propagate(&mut tasks));
        for t in &tasks.tasks {
            let window = (t.start_min, t.start_min + t.duration_min);
            assert!(window.1 <= 10 || window.0 >= 20, "{:?} overlaps break", window);
        }
    }

    #[test]
    fn test_edge_finding_detects_overload() {
        let mut tasks = Tasks {
            tasks: vec![task(0, 10, 15), task(0, 10, 15)],
            num_chain_tasks: 0,
            forbidden_intervals: vec![Vec::new(), Vec::new()],
        };
        assert!(!edge_finding(&mut tasks));
    }
}
