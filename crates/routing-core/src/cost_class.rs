//! Cost classes and vehicle classes: the equivalence classes `Close`
//! derives to shrink search domains and share cost caches.

use std::collections::HashMap;

use crate::transit::CallbackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CostClassIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleClassIndex(pub usize);

/// One `(dimension, transit-evaluator-class, span-cost-coefficient)` term,
/// only present for dimensions with a nonzero span cost on a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanTerm {
    pub dimension: DimensionIndex,
    pub transit_class: CallbackId,
    pub span_coefficient: i64,
}

/// Fixed cost is deliberately excluded from the class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CostClass {
    pub arc_cost_evaluator: CallbackId,
    /// Sorted ascending for canonicalization.
    pub span_terms: Vec<SpanTerm>,
}

impl CostClass {
    pub fn canonicalize(arc_cost_evaluator: CallbackId, mut span_terms: Vec<SpanTerm>) -> Self {
        span_terms.sort();
        CostClass {
            arc_cost_evaluator,
            span_terms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionVehicleProfile {
    pub dimension: DimensionIndex,
    pub start_cumul_min: i64,
    pub start_cumul_max: i64,
    pub end_cumul_min: i64,
    pub end_cumul_max: i64,
    pub capacity: i64,
    pub evaluator_class: CallbackId,
}

/// Strictly finer than `CostClass`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VehicleClass {
    pub cost_class: CostClassIndex,
    pub fixed_cost: i64,
    pub start_node: usize,
    pub end_node: usize,
    pub dimension_profiles: Vec<DimensionVehicleProfile>,
    pub unvisitable_fingerprint: u64,
}

/// Canonicalize a set of per-vehicle cost classes into a deduplicated
/// list, returning `(classes, vehicle_to_class)`.
pub fn build_cost_classes(per_vehicle: Vec<CostClass>) -> (Vec<CostClass>, Vec<CostClassIndex>) {
    let mut classes: Vec<CostClass> = Vec::new();
    let mut index_of: HashMap<CostClass, CostClassIndex> = HashMap::new();
    let mut vehicle_to_class = Vec::with_capacity(per_vehicle.len());

    for class in per_vehicle {
        let idx = *index_of.entry(class.clone()).or_insert_with(|| {
            let idx = CostClassIndex(classes.len());
            classes.push(class);
            idx
        });
        vehicle_to_class.push(idx);
    }

    (classes, vehicle_to_class)
}

/// Canonicalize per-vehicle vehicle classes (finer than cost classes).
pub fn build_vehicle_classes(
    per_vehicle: Vec<VehicleClass>,
) -> (Vec<VehicleClass>, Vec<VehicleClassIndex>) {
    let mut classes: Vec<VehicleClass> = Vec::new();
    let mut index_of: HashMap<VehicleClass, VehicleClassIndex> = HashMap::new();
    let mut vehicle_to_class = Vec::with_capacity(per_vehicle.len());

    for class in per_vehicle {
        let idx = *index_of.entry(class.clone()).or_insert_with(|| {
            let idx = VehicleClassIndex(classes.len());
            classes.push(class);
            idx
        });
        vehicle_to_class.push(idx);
    }

    (classes, vehicle_to_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vehicles_share_a_cost_class() {
        let a = CostClass::canonicalize(
            CallbackId(0),
            vec![SpanTerm {
                dimension: DimensionIndex(0),
                transit_class: CallbackId(1),
                span_coefficient: 5,
            }],
        );
        let b = CostClass::canonicalize(
            CallbackId(0),
            vec![SpanTerm {
                dimension: DimensionIndex(0),
                transit_class: CallbackId(1),
                span_coefficient: 5,
            }],
        );
        let (classes, assignment) = build_cost_classes(vec![a, b]);
        assert_eq!(classes.len(), 1);
        assert_eq!(assignment[0], assignment[1]);
    }

    #[test]
    fn test_different_span_coefficient_splits_class() {
        let a = CostClass::canonicalize(CallbackId(0), vec![]);
        let b = CostClass::canonicalize(
            CallbackId(0),
            vec![SpanTerm {
                dimension: DimensionIndex(0),
                transit_class: CallbackId(1),
                span_coefficient: 1,
            }],
        );
        let (classes, assignment) = build_cost_classes(vec![a, b]);
        assert_eq!(classes.len(), 2);
        assert_ne!(assignment[0], assignment[1]);
    }
}
