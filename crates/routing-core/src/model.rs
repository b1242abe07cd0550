//! Component C: the Routing Model. Owns the index manager, transit
//! registry, dimensions, disjunctions, pickup/delivery pairs, per-vehicle
//! cost parameters, and the `Close` procedure that derives cost/vehicle
//! classes and freezes the network.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::assignment::Assignment;
use crate::cost_class::{
    build_cost_classes, build_vehicle_classes, CostClass, CostClassIndex, DimensionIndex,
    DimensionVehicleProfile, SpanTerm, VehicleClass, VehicleClassIndex,
};
use crate::dimension::Dimension;
use crate::disjunction::{DisjunctionIndex, Disjunctions, NO_PENALTY};
use crate::error::{RoutingError, RoutingResult};
use crate::index_manager::IndexManager;
use crate::pickup_delivery::{PickupDeliveryPairs, PickupDeliveryPolicy};
use crate::transit::{CallbackId, TransitRegistry};
use tracing::{debug, info};

pub struct RoutingModel {
    manager: IndexManager,
    registry: TransitRegistry,
    dimensions: Vec<Dimension>,
    dimension_by_name: HashMap<String, DimensionIndex>,
    disjunctions: Disjunctions,
    pickup_delivery: PickupDeliveryPairs,
    arc_cost_evaluator_per_vehicle: Vec<Option<CallbackId>>,
    fixed_cost_per_vehicle: Vec<i64>,
    amortized_linear_per_vehicle: Vec<i64>,
    amortized_quadratic_per_vehicle: Vec<i64>,
    visit_type: HashMap<i64, i64>,
    type_incompatibilities: HashSet<(i64, i64)>,
    /// Indices not present default to "every vehicle allowed".
    allowed_vehicles: HashMap<i64, HashSet<usize>>,
    closed: bool,
    cost_classes: Vec<CostClass>,
    vehicle_to_cost_class: Vec<CostClassIndex>,
    vehicle_classes: Vec<VehicleClass>,
    vehicle_to_vehicle_class: Vec<VehicleClassIndex>,
    arc_cost_class_cache: RefCell<HashMap<(i64, i64, usize), i64>>,
}

fn incompatibility_key(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl RoutingModel {
    pub fn new(manager: IndexManager) -> Self {
        let num_vehicles = manager.num_vehicles();
        RoutingModel {
            manager,
            registry: TransitRegistry::new(),
            dimensions: Vec::new(),
            dimension_by_name: HashMap::new(),
            disjunctions: Disjunctions::default(),
            pickup_delivery: PickupDeliveryPairs::default(),
            arc_cost_evaluator_per_vehicle: vec![None; num_vehicles],
            fixed_cost_per_vehicle: vec![0; num_vehicles],
            amortized_linear_per_vehicle: vec![0; num_vehicles],
            amortized_quadratic_per_vehicle: vec![0; num_vehicles],
            visit_type: HashMap::new(),
            type_incompatibilities: HashSet::new(),
            allowed_vehicles: HashMap::new(),
            closed: false,
            cost_classes: Vec::new(),
            vehicle_to_cost_class: Vec::new(),
            vehicle_classes: Vec::new(),
            vehicle_to_vehicle_class: Vec::new(),
            arc_cost_class_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    pub fn registry(&self) -> &TransitRegistry {
        &self.registry
    }

    pub fn num_vehicles(&self) -> usize {
        self.manager.num_vehicles()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn require_open(&self) -> RoutingResult<()> {
        if self.closed {
            Err(RoutingError::AlreadyClosed)
        } else {
            Ok(())
        }
    }

    fn require_closed(&self) -> RoutingResult<()> {
        if self.closed {
            Ok(())
        } else {
            Err(RoutingError::NotClosed)
        }
    }

    // ---- Open-phase: transit callbacks -------------------------------

    pub fn register_unary_transit_callback(
        &mut self,
        f: impl Fn(i64) -> i64 + 'static,
    ) -> RoutingResult<CallbackId> {
        self.require_open()?;
        Ok(self.registry.register_unary(f))
    }

    pub fn register_transit_callback(
        &mut self,
        f: impl Fn(i64, i64) -> i64 + 'static,
    ) -> RoutingResult<CallbackId> {
        self.require_open()?;
        Ok(self.registry.register_binary(f))
    }

    pub fn register_state_dependent_transit_callback(
        &mut self,
        f: impl Fn(i64, i64, i64) -> i64 + 'static,
    ) -> RoutingResult<CallbackId> {
        self.require_open()?;
        Ok(self.registry.register_state_dependent(f))
    }

    // ---- Open-phase: dimensions ---------------------------------------

    fn insert_dimension(&mut self, dimension: Dimension) -> RoutingResult<DimensionIndex> {
        if self.dimension_by_name.contains_key(&dimension.name) {
            return Err(RoutingError::DuplicateDimension(dimension.name.clone()));
        }
        let index = dimension.index;
        self.dimension_by_name.insert(dimension.name.clone(), index);
        self.dimensions.push(dimension);
        Ok(index)
    }

    fn next_dimension_index(&self) -> DimensionIndex {
        DimensionIndex(self.dimensions.len())
    }

    /// Homogeneous overload: one evaluator and one capacity shared by every
    /// vehicle.
    pub fn add_dimension(
        &mut self,
        name: impl Into<String>,
        evaluator: CallbackId,
        capacity: i64,
        slack_max: i64,
    ) -> RoutingResult<DimensionIndex> {
        self.require_open()?;
        let n = self.num_vehicles();
        self.add_dimension_with_vehicle_transit_and_capacity(
            name,
            vec![evaluator; n],
            vec![capacity; n],
            slack_max,
        )
    }

    /// Per-vehicle transit evaluator, shared capacity.
    pub fn add_dimension_with_vehicle_transits(
        &mut self,
        name: impl Into<String>,
        evaluators: Vec<CallbackId>,
        capacity: i64,
        slack_max: i64,
    ) -> RoutingResult<DimensionIndex> {
        self.require_open()?;
        let n = evaluators.len();
        self.add_dimension_with_vehicle_transit_and_capacity(
            name,
            evaluators,
            vec![capacity; n],
            slack_max,
        )
    }

    /// Shared transit evaluator, per-vehicle capacity.
    pub fn add_dimension_with_vehicle_capacity(
        &mut self,
        name: impl Into<String>,
        evaluator: CallbackId,
        capacities: Vec<i64>,
        slack_max: i64,
    ) -> RoutingResult<DimensionIndex> {
        self.require_open()?;
        let n = capacities.len();
        self.add_dimension_with_vehicle_transit_and_capacity(
            name,
            vec![evaluator; n],
            capacities,
            slack_max,
        )
    }

    /// Fully per-vehicle overload; every other `add_dimension*` delegates
    /// here.
    pub fn add_dimension_with_vehicle_transit_and_capacity(
        &mut self,
        name: impl Into<String>,
        evaluators: Vec<CallbackId>,
        capacities: Vec<i64>,
        slack_max: i64,
    ) -> RoutingResult<DimensionIndex> {
        self.require_open()?;
        let name = name.into();
        if evaluators.len() != self.num_vehicles() || capacities.len() != self.num_vehicles() {
            return Err(RoutingError::InvalidParameter(format!(
                "dimension `{name}` vehicle-indexed vectors must have length {}",
                self.num_vehicles()
            )));
        }
        if capacities.iter().any(|&c| c < 0) {
            return Err(RoutingError::InvalidParameter(format!(
                "dimension `{name}` capacity must be non-negative"
            )));
        }
        let index = self.next_dimension_index();
        let n = self.num_vehicles();
        let dimension = Dimension::new(
            index,
            name,
            evaluators,
            capacities,
            vec![slack_max; n],
            None,
        );
        self.insert_dimension(dimension)
    }

    /// Dependent-dimension overload: `transit = f(parent.cumul(i))` via a
    /// state-dependent evaluator.
    pub fn add_dependent_dimension(
        &mut self,
        name: impl Into<String>,
        parent: &str,
        evaluators: Vec<CallbackId>,
        capacities: Vec<i64>,
        slack_max: i64,
    ) -> RoutingResult<DimensionIndex> {
        self.require_open()?;
        let name = name.into();
        let parent_index = self.dimension_index(parent)?;
        if evaluators.len() != self.num_vehicles() || capacities.len() != self.num_vehicles() {
            return Err(RoutingError::InvalidParameter(format!(
                "dimension `{name}` vehicle-indexed vectors must have length {}",
                self.num_vehicles()
            )));
        }
        let index = self.next_dimension_index();
        if parent_index == index {
            return Err(RoutingError::InvalidParameter(
                "a dimension cannot depend on itself except via a self-base".into(),
            ));
        }
        let n = self.num_vehicles();
        let dimension = Dimension::new(
            index,
            name,
            evaluators,
            capacities,
            vec![slack_max; n],
            Some(parent_index),
        );
        self.insert_dimension(dimension)
    }

    pub fn dimension_index(&self, name: &str) -> RoutingResult<DimensionIndex> {
        self.dimension_by_name
            .get(name)
            .copied()
            .ok_or_else(|| RoutingError::UnknownDimension(name.to_string()))
    }

    pub fn dimension(&self, name: &str) -> RoutingResult<&Dimension> {
        let index = self.dimension_index(name)?;
        Ok(&self.dimensions[index.0])
    }

    pub fn dimension_mut(&mut self, name: &str) -> RoutingResult<&mut Dimension> {
        let index = self.dimension_index(name)?;
        Ok(&mut self.dimensions[index.0])
    }

    pub fn dimension_at(&self, index: DimensionIndex) -> &Dimension {
        &self.dimensions[index.0]
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    // ---- Open-phase: disjunctions & pickup/delivery -------------------

    pub fn add_disjunction(
        &mut self,
        indices: Vec<i64>,
        penalty: i64,
        max_cardinality: usize,
    ) -> RoutingResult<DisjunctionIndex> {
        self.require_open()?;
        self.disjunctions.add(indices, penalty, max_cardinality)
    }

    pub fn disjunctions(&self) -> &Disjunctions {
        &self.disjunctions
    }

    pub fn add_pickup_and_delivery(&mut self, pickup: i64, delivery: i64) -> RoutingResult<usize> {
        self.require_open()?;
        Ok(self.pickup_delivery.add(pickup, delivery))
    }

    pub fn set_pickup_and_delivery_policy_of_vehicle(
        &mut self,
        vehicle: usize,
        policy: PickupDeliveryPolicy,
    ) -> RoutingResult<()> {
        self.require_open()?;
        self.pickup_delivery.set_vehicle_policy(vehicle, policy);
        Ok(())
    }

    pub fn add_pickup_to_delivery_limit(
        &mut self,
        pair_index: usize,
        max_cumul_difference: i64,
    ) -> RoutingResult<()> {
        self.require_open()?;
        self.pickup_delivery
            .add_limit(pair_index, max_cumul_difference);
        Ok(())
    }

    pub fn pickup_delivery_pairs(&self) -> &PickupDeliveryPairs {
        &self.pickup_delivery
    }

    // ---- Open-phase: per-vehicle cost parameters -----------------------

    pub fn set_arc_cost_evaluator_of_vehicle(
        &mut self,
        vehicle: usize,
        evaluator: CallbackId,
    ) -> RoutingResult<()> {
        self.require_open()?;
        self.arc_cost_evaluator_per_vehicle[vehicle] = Some(evaluator);
        Ok(())
    }

    pub fn set_arc_cost_evaluator_of_all_vehicles(
        &mut self,
        evaluator: CallbackId,
    ) -> RoutingResult<()> {
        self.require_open()?;
        for slot in &mut self.arc_cost_evaluator_per_vehicle {
            *slot = Some(evaluator);
        }
        Ok(())
    }

    pub fn set_fixed_cost_of_vehicle(&mut self, vehicle: usize, cost: i64) -> RoutingResult<()> {
        self.require_open()?;
        self.fixed_cost_per_vehicle[vehicle] = cost;
        Ok(())
    }

    pub fn set_amortized_cost_factors_of_vehicle(
        &mut self,
        vehicle: usize,
        linear: i64,
        quadratic: i64,
    ) -> RoutingResult<()> {
        self.require_open()?;
        self.amortized_linear_per_vehicle[vehicle] = linear;
        self.amortized_quadratic_per_vehicle[vehicle] = quadratic;
        Ok(())
    }

    pub fn set_visit_type(&mut self, index: i64, type_id: i64) -> RoutingResult<()> {
        self.require_open()?;
        self.visit_type.insert(index, type_id);
        Ok(())
    }

    pub fn add_type_incompatibility(&mut self, type_a: i64, type_b: i64) -> RoutingResult<()> {
        self.require_open()?;
        self.type_incompatibilities
            .insert(incompatibility_key(type_a, type_b));
        Ok(())
    }

    pub fn visit_type(&self, index: i64) -> i64 {
        self.visit_type.get(&index).copied().unwrap_or(0)
    }

    pub fn are_types_incompatible(&self, type_a: i64, type_b: i64) -> bool {
        self.type_incompatibilities
            .contains(&incompatibility_key(type_a, type_b))
    }

    pub fn set_allowed_vehicles_for_index(&mut self, index: i64, vehicles: HashSet<usize>) {
        self.allowed_vehicles.insert(index, vehicles);
    }

    pub fn is_vehicle_allowed(&self, index: i64, vehicle: usize) -> bool {
        self.allowed_vehicles
            .get(&index)
            .map(|set| set.contains(&vehicle))
            .unwrap_or(true)
    }

    // ---- Close -----------------------------------------------------------

    /// Idempotent: calling `close` on an already closed model is a no-op
    /// success.
    pub fn close(&mut self) -> RoutingResult<()> {
        if self.closed {
            debug!("close() called on an already-closed model, ignoring");
            return Ok(());
        }
        for v in 0..self.num_vehicles() {
            if self.arc_cost_evaluator_per_vehicle[v].is_none() {
                return Err(RoutingError::InvalidParameter(format!(
                    "vehicle {v} has no arc cost evaluator"
                )));
            }
        }
        for (_, disjunction) in self.disjunctions.iter() {
            for &index in &disjunction.indices {
                if index < 0 || index >= self.manager.num_indices() {
                    return Err(RoutingError::InvalidIndex(index));
                }
            }
        }

        // Step 1: cost classes, canonicalized.
        let per_vehicle_cost_classes: Vec<CostClass> = (0..self.num_vehicles())
            .map(|v| {
                let mut span_terms = Vec::new();
                for dimension in &self.dimensions {
                    let coefficient = dimension.span_cost_coefficient(v);
                    if coefficient != 0 {
                        span_terms.push(SpanTerm {
                            dimension: dimension.index,
                            transit_class: dimension.transit_evaluator(v),
                            span_coefficient: coefficient,
                        });
                    }
                }
                CostClass::canonicalize(self.arc_cost_evaluator_per_vehicle[v].unwrap(), span_terms)
            })
            .collect();
        let (cost_classes, vehicle_to_cost_class) = build_cost_classes(per_vehicle_cost_classes);

        // Step 2: vehicle classes, strictly finer than cost classes.
        let per_vehicle_vehicle_classes: Vec<VehicleClass> = (0..self.num_vehicles())
            .map(|v| {
                let dimension_profiles = self
                    .dimensions
                    .iter()
                    .map(|dimension| {
                        let (start_cumul_min, start_cumul_max) = dimension.start_cumul_bounds(v);
                        let (end_cumul_min, end_cumul_max) = dimension.end_cumul_bounds(v);
                        DimensionVehicleProfile {
                            dimension: dimension.index,
                            start_cumul_min,
                            start_cumul_max,
                            end_cumul_min,
                            end_cumul_max,
                            capacity: dimension.capacity(v),
                            evaluator_class: dimension.transit_evaluator(v),
                        }
                    })
                    .collect();
                VehicleClass {
                    cost_class: vehicle_to_cost_class[v],
                    fixed_cost: self.fixed_cost_per_vehicle[v],
                    start_node: self.manager.index_to_node(self.manager.start(v)).unwrap(),
                    end_node: self.manager.index_to_node(self.manager.end(v)).unwrap(),
                    dimension_profiles,
                    unvisitable_fingerprint: self.unvisitable_fingerprint(v),
                }
            })
            .collect();
        let (vehicle_classes, vehicle_to_vehicle_class) =
            build_vehicle_classes(per_vehicle_vehicle_classes);

        // Step 3: disjunction penalty subexpressions are evaluated lazily by
        // `compute_cost`; nothing to precompile without an external CP
        // solver's expression graph.
        // Step 4: the compiled global cost is likewise evaluated on demand
        // by `compute_cost`, which sums every cost term.
        // Step 5: freeze the network.
        self.cost_classes = cost_classes;
        self.vehicle_to_cost_class = vehicle_to_cost_class;
        self.vehicle_classes = vehicle_classes;
        self.vehicle_to_vehicle_class = vehicle_to_vehicle_class;
        self.registry.invalidate_caches();
        self.arc_cost_class_cache.borrow_mut().clear();
        self.closed = true;
        info!(
            vehicles = self.num_vehicles(),
            dimensions = self.dimensions.len(),
            cost_classes = self.cost_classes.len(),
            vehicle_classes = self.vehicle_classes.len(),
            "model closed"
        );
        Ok(())
    }

    fn unvisitable_fingerprint(&self, vehicle: usize) -> u64 {
        let mut unvisitable: Vec<i64> = self
            .allowed_vehicles
            .iter()
            .filter(|(index, vehicles)| {
                **index < self.manager.size()
                    && !self.manager.is_start(**index)
                    && !self.manager.is_end(**index)
                    && !vehicles.contains(&vehicle)
            })
            .map(|(&index, _)| index)
            .collect();
        unvisitable.sort_unstable();
        let mut hasher = DefaultHasher::new();
        unvisitable.hash(&mut hasher);
        hasher.finish()
    }

    pub fn cost_classes(&self) -> &[CostClass] {
        &self.cost_classes
    }

    pub fn cost_class_of_vehicle(&self, vehicle: usize) -> CostClassIndex {
        self.vehicle_to_cost_class[vehicle]
    }

    pub fn vehicle_classes(&self) -> &[VehicleClass] {
        &self.vehicle_classes
    }

    pub fn vehicle_class_of_vehicle(&self, vehicle: usize) -> VehicleClassIndex {
        self.vehicle_to_vehicle_class[vehicle]
    }

    /// True iff every vehicle shares one cost class — the precondition
    /// the homogeneous-cost shortcut path requires.
    pub fn costs_are_homogeneous_across_vehicles(&self) -> bool {
        self.vehicle_to_cost_class
            .iter()
            .all(|&c| c == self.vehicle_to_cost_class[0])
    }

    // ---- Cost evaluation ------------------------------------------------

    pub fn arc_cost_for_vehicle(&self, i: i64, j: i64, vehicle: i64) -> RoutingResult<i64> {
        self.require_closed()?;
        if vehicle < 0 {
            return Ok(0);
        }
        let vehicle = vehicle as usize;
        let class = self.vehicle_to_cost_class[vehicle];
        let mut cost = self.arc_cost_for_class(i, j, class)?;
        if i == self.manager.start(vehicle) {
            cost += self.fixed_cost_per_vehicle[vehicle];
        }
        Ok(cost)
    }

    pub fn arc_cost_for_class(&self, i: i64, j: i64, class: CostClassIndex) -> RoutingResult<i64> {
        self.require_closed()?;
        if let Some(&cached) = self.arc_cost_class_cache.borrow().get(&(i, j, class.0)) {
            return Ok(cached);
        }
        let cost_class = &self.cost_classes[class.0];
        let mut cost = self.registry.binary_transit(cost_class.arc_cost_evaluator, i, j);
        for term in &cost_class.span_terms {
            cost += term.span_coefficient * self.registry.binary_transit(term.transit_class, i, j);
        }
        self.arc_cost_class_cache
            .borrow_mut()
            .insert((i, j, class.0), cost);
        Ok(cost)
    }

    /// `used(v) · (linear(v) − quadratic(v) · length(v)²)`.
    pub fn amortized_cost(&self, vehicle: usize, route_length: i64, used: bool) -> i64 {
        if !used {
            return 0;
        }
        self.amortized_linear_per_vehicle[vehicle]
            - self.amortized_quadratic_per_vehicle[vehicle] * route_length * route_length
    }

    /// Recompute the objective independently of however it was
    /// accumulated during search, for a testable cost-reproducibility
    /// property and for reporting.
    pub fn compute_cost(&self, assignment: &Assignment) -> RoutingResult<i64> {
        self.require_closed()?;
        let mut total = 0i64;

        for vehicle in 0..self.num_vehicles() {
            let start = self.manager.start(vehicle);
            let end = self.manager.end(vehicle);
            let path = assignment
                .walk(start, end, self.manager.num_indices() as usize + 1)
                .ok_or_else(|| {
                    RoutingError::InvalidParameter(format!(
                        "vehicle {vehicle} route does not reach its end index"
                    ))
                })?;

            for window in path.windows(2) {
                total += self.arc_cost_for_vehicle(window[0], window[1], vehicle as i64)?;
            }

            // `next(start(v)) != end(v)` collapses, for a walked path, to
            // having any node between start and end.
            let used = path.len() > 2;
            let route_length = path.len().saturating_sub(2) as i64;
            total += self.amortized_cost(vehicle, route_length, used);

            for dimension in &self.dimensions {
                if dimension.span_cost_coefficient(vehicle) != 0 {
                    if let (Some(start_cumul), Some(end_cumul)) = (
                        assignment.cumul(dimension.index, start),
                        assignment.cumul(dimension.index, end),
                    ) {
                        total += dimension.span_cost(vehicle, start_cumul, end_cumul);
                    }
                }
                for &index in &path {
                    if let Some(cumul) = assignment.cumul(dimension.index, index) {
                        total += dimension.soft_upper_bound_cost(index, cumul);
                        total += dimension.soft_lower_bound_cost(index, cumul);
                        total += dimension.piecewise_cost(index, cumul);
                    }
                }
            }
        }

        for dimension in &self.dimensions {
            if dimension.global_span_cost_coefficient() != 0 {
                let starts: Vec<i64> = (0..self.num_vehicles())
                    .filter_map(|v| assignment.cumul(dimension.index, self.manager.start(v)))
                    .collect();
                let ends: Vec<i64> = (0..self.num_vehicles())
                    .filter_map(|v| assignment.cumul(dimension.index, self.manager.end(v)))
                    .collect();
                total += dimension.global_span_cost(&starts, &ends);
            }
        }

        for (_, disjunction) in self.disjunctions.iter() {
            if disjunction.penalty == NO_PENALTY {
                continue;
            }
            let inactive = disjunction
                .indices
                .iter()
                .filter(|&&index| assignment.active(index) == Some(false))
                .count();
            total += disjunction.penalty * inactive as i64;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsp4_model() -> RoutingModel {
        // c(i,j) = node(i) + node(j); the index<->node translation is out
        // of this library's scope, so the callback performs it itself by
        // closing over a manager clone.
        let manager = IndexManager::new(4, &[0], &[0]).unwrap();
        let translate = manager.clone();
        let mut model = RoutingModel::new(manager);
        let evaluator = model
            .register_transit_callback(move |i, j| {
                (translate.index_to_node(i).unwrap() + translate.index_to_node(j).unwrap()) as i64
            })
            .unwrap();
        model
            .set_arc_cost_evaluator_of_all_vehicles(evaluator)
            .unwrap();
        model
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut model = tsp4_model();
        model.close().unwrap();
        assert!(model.close().is_ok());
        assert!(model.is_closed());
    }

    #[test]
    fn test_mutation_after_close_is_rejected() {
        let mut model = tsp4_model();
        model.close().unwrap();
        let err = model
            .add_disjunction(vec![0], 10, 1)
            .expect_err("disjunctions cannot be added after close");
        assert_eq!(err, RoutingError::AlreadyClosed);
    }

    #[test]
    fn test_identical_vehicles_share_one_cost_class() {
        let manager = IndexManager::new(5, &[0, 0], &[0, 0]).unwrap();
        let mut model = RoutingModel::new(manager);
        let evaluator = model.register_transit_callback(|i, j| (i - j).abs()).unwrap();
        model.set_arc_cost_evaluator_of_all_vehicles(evaluator).unwrap();
        model.close().unwrap();
        assert_eq!(model.cost_classes().len(), 1);
        assert!(model.costs_are_homogeneous_across_vehicles());
    }

    #[test]
    fn test_arc_cost_for_vehicle_adds_fixed_cost_at_start() {
        let mut model = tsp4_model();
        model.set_fixed_cost_of_vehicle(0, 100).unwrap();
        model.close().unwrap();
        let manager = model.manager();
        let start = manager.start(0);
        let first_customer = manager.node_to_index(1).unwrap();
        let cost = model.arc_cost_for_vehicle(start, first_customer, 0).unwrap();
        assert_eq!(cost, (0 + 1) + 100);
        // node(start)=0, node(first_customer)=1 -> raw 1, plus fixed_cost.
    }

    #[test]
    fn test_compute_cost_matches_tsp4_optimal_route() {
        use crate::assignment::routes_to_assignment;

        let mut model = tsp4_model();
        model.close().unwrap();
        let assignment = routes_to_assignment(model.manager(), &[vec![1, 2, 3]]).unwrap();
        // c(i,j) = i+j along 0->1->2->3->0: 1 + 3 + 5 + 3 = 12.
        assert_eq!(model.compute_cost(&assignment).unwrap(), 12);
    }
}
