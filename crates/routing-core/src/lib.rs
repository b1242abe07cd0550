//! Routing Model, Dimension subsystem, disjunctions, pickup/delivery
//! coupling, and the Assignment type.

pub mod assignment;
pub mod cost_class;
pub mod dimension;
pub mod disjunction;
pub mod error;
pub mod index_manager;
pub mod model;
pub mod pickup_delivery;
pub mod transit;

pub use assignment::{assignment_to_routes, routes_to_assignment, Assignment, SerializedAssignment};
pub use cost_class::{
    CostClass, CostClassIndex, DimensionIndex, DimensionVehicleProfile, SpanTerm, VehicleClass,
    VehicleClassIndex,
};
pub use dimension::{Break, Dimension, PiecewiseLinearCost, SoftBound};
pub use disjunction::{Disjunction, DisjunctionIndex, Disjunctions, NO_PENALTY};
pub use error::{RoutingError, RoutingResult};
pub use index_manager::IndexManager;
pub use model::RoutingModel;
pub use pickup_delivery::{
    nests_correctly, PickupDeliveryPair, PickupDeliveryPairs, PickupDeliveryPolicy,
    PickupToDeliveryLimit,
};
pub use transit::{CallbackId, RangeFunction, TransitRegistry};

/// Terminal outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStatus {
    NotSolved,
    Success,
    Fail,
    FailTimeout,
    Invalid,
}

impl Default for RoutingStatus {
    fn default() -> Self {
        RoutingStatus::NotSolved
    }
}
