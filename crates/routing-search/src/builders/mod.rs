//! Filtered first-solution decision builders: each one incrementally fills
//! in the unset route variables of an initially-empty assignment, checking
//! every tentative move against the active filter set before committing.

pub mod cheapest_addition;
pub mod christofides;
pub mod global_cheapest_insertion;
pub mod local_cheapest_insertion;
pub mod savings;

use routing_core::{routes_to_assignment, Assignment, RoutingModel};

use crate::filters::{accept_all, Delta, LocalSearchFilter};
use crate::random::Random;

pub trait DecisionBuilder {
    fn name(&self) -> &'static str;

    /// Builds a complete `Assignment`, or `None` if no feasible solution
    /// could be committed.
    fn build(
        &self,
        model: &RoutingModel,
        filters: &[Box<dyn LocalSearchFilter>],
        random: &mut Random,
    ) -> Option<Assignment>;
}

/// Shared machinery every concrete builder drives: a committed assignment
/// plus `set_value`/`commit` over a pending `Delta`.
pub struct FilteredAssignmentBuilder<'a> {
    model: &'a RoutingModel,
    filters: &'a [Box<dyn LocalSearchFilter>],
    committed: Assignment,
    pending: Delta,
}

impl<'a> FilteredAssignmentBuilder<'a> {
    /// `pre_locked` seeds partial per-vehicle routes the caller has fixed
    /// in advance; an empty route per vehicle otherwise. Returns `None` if
    /// `pre_locked` names a node with no corresponding plain index.
    pub fn new(
        model: &'a RoutingModel,
        filters: &'a [Box<dyn LocalSearchFilter>],
        pre_locked: Option<&[Vec<usize>]>,
    ) -> Option<Self> {
        let routes = pre_locked
            .map(<[Vec<usize>]>::to_vec)
            .unwrap_or_else(|| vec![Vec::new(); model.num_vehicles()]);
        let committed = routes_to_assignment(model.manager(), &routes).ok()?;
        Some(FilteredAssignmentBuilder {
            model,
            filters,
            committed,
            pending: Delta::default(),
        })
    }

    pub fn committed(&self) -> &Assignment {
        &self.committed
    }

    pub fn set_value(&mut self, index: i64, next: i64) {
        self.pending.set(index, next);
    }

    /// Runs every filter against the candidate obtained by merging the
    /// pending delta into the committed assignment; on acceptance the
    /// delta is merged and cleared, otherwise discarded.
    pub fn commit(&mut self) -> bool {
        let candidate = self.pending.apply(&self.committed);
        if accept_all(self.filters, self.model, &self.committed, &candidate) {
            self.committed = candidate;
            self.pending = Delta::default();
            true
        } else {
            self.pending = Delta::default();
            false
        }
    }

    /// Insert `index` right after `after`, before whatever `after` used to
    /// point to, then attempt to commit the two-arc delta.
    pub fn try_insert_after(&mut self, after: i64, index: i64) -> bool {
        let old_next = self.committed.next(after).unwrap_or(after);
        self.set_value(after, index);
        self.set_value(index, old_next);
        self.commit()
    }

    /// True once every plain index (excluding vehicle ends) is active, or
    /// its inactivity is excused: either by a soft disjunction (a penalty
    /// may be paid for leaving it unperformed), or by a hard disjunction
    /// whose `max_cardinality` is already met by another active member.
    /// An index with no disjunction membership at all must be active.
    pub fn is_complete(&self) -> bool {
        let size = self.model.manager().size();
        (0..size).all(|index| {
            if self.model.manager().is_start(index) {
                return true;
            }
            if self.committed.active(index) == Some(true) {
                return true;
            }
            let disjunctions = self.model.disjunctions().containing(index);
            if disjunctions.is_empty() {
                return false;
            }
            disjunctions.iter().any(|&d| {
                let disjunction = self.model.disjunctions().get(d);
                if !disjunction.is_hard() {
                    return true;
                }
                let active_count = disjunction
                    .indices
                    .iter()
                    .filter(|&&member| self.committed.active(member) == Some(true))
                    .count();
                active_count >= disjunction.max_cardinality
            })
        })
    }

    /// All plain, non-start indices not currently active — the pool a
    /// builder must place.
    pub fn pending_indices(&self) -> Vec<i64> {
        let size = self.model.manager().size();
        (0..size)
            .filter(|&index| !self.model.manager().is_start(index))
            .filter(|&index| self.committed.active(index) != Some(true))
            .collect()
    }

    /// Every `(vehicle, chain_end_index)` pair currently open for
    /// extension, in vehicle order.
    pub fn chain_ends(&self) -> Vec<(usize, i64)> {
        (0..self.model.num_vehicles())
            .map(|vehicle| {
                let start = self.model.manager().start(vehicle);
                let end = self.model.manager().end(vehicle);
                let mut current = start;
                while let Some(next) = self.committed.next(current) {
                    if next == end {
                        break;
                    }
                    current = next;
                }
                (vehicle, current)
            })
            .collect()
    }
}
