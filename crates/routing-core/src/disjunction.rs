//! Disjunctions: sets of indices with a cardinality/penalty constraint on
//! how many may be active.

use crate::error::{RoutingError, RoutingResult};

/// `p = kNoPenalty` marks a hard constraint: exactly `max_cardinality`
/// indices must be active, and dropping any is not permitted.
pub const NO_PENALTY: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisjunctionIndex(pub usize);

#[derive(Debug, Clone)]
pub struct Disjunction {
    pub indices: Vec<i64>,
    pub max_cardinality: usize,
    pub penalty: i64,
}

impl Disjunction {
    pub fn is_hard(&self) -> bool {
        self.penalty == NO_PENALTY
    }
}

#[derive(Debug, Default)]
pub struct Disjunctions {
    disjunctions: Vec<Disjunction>,
    /// Every index belongs to at most one disjunction in the reference
    /// implementation's usage pattern; this maps an index to the
    /// disjunctions that contain it for fast filter lookups.
    index_to_disjunctions: std::collections::HashMap<i64, Vec<DisjunctionIndex>>,
}

impl Disjunctions {
    pub fn add(
        &mut self,
        indices: Vec<i64>,
        penalty: i64,
        max_cardinality: usize,
    ) -> RoutingResult<DisjunctionIndex> {
        if max_cardinality > indices.len() {
            return Err(RoutingError::IllPosedDisjunction {
                max_cardinality,
                indices: indices.len(),
            });
        }
        let disjunction_index = DisjunctionIndex(self.disjunctions.len());
        for &index in &indices {
            self.index_to_disjunctions
                .entry(index)
                .or_default()
                .push(disjunction_index);
        }
        self.disjunctions.push(Disjunction {
            indices,
            max_cardinality,
            penalty,
        });
        Ok(disjunction_index)
    }

    pub fn get(&self, index: DisjunctionIndex) -> &Disjunction {
        &self.disjunctions[index.0]
    }

    pub fn len(&self) -> usize {
        self.disjunctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjunctions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DisjunctionIndex, &Disjunction)> {
        self.disjunctions
            .iter()
            .enumerate()
            .map(|(i, d)| (DisjunctionIndex(i), d))
    }

    pub fn containing(&self, index: i64) -> &[DisjunctionIndex] {
        self.index_to_disjunctions
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ill_posed_disjunction_rejected() {
        let mut d = Disjunctions::default();
        let err = d.add(vec![0, 1], 10, 3).unwrap_err();
        assert_eq!(
            err,
            RoutingError::IllPosedDisjunction {
                max_cardinality: 3,
                indices: 2
            }
        );
    }

    #[test]
    fn test_add_and_lookup() {
        let mut d = Disjunctions::default();
        let idx = d.add(vec![4], 50, 1).unwrap();
        assert!(!d.get(idx).is_hard());
        assert_eq!(d.containing(4), &[idx]);
        assert_eq!(d.containing(99), &[] as &[DisjunctionIndex]);
    }
}
