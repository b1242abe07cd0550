//! The cumul LP optimizer. Given a fixed route for one vehicle, resolves
//! every dimension slack that the chaining invariant leaves free,
//! minimizing soft-bound violation penalties and span cost — the same
//! linear system `Dimension::propagate_forward` walks greedily, but
//! solved optimally here via `good_lp`'s bundled `microlp` backend.

use good_lp::solvers::microlp::microlp;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel};
use routing_core::{Dimension, TransitRegistry};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CumulLpError {
    #[error("route must contain at least one node")]
    EmptyRoute,
    #[error("lp resolution failed: {0}")]
    Resolution(#[from] good_lp::ResolutionError),
    #[error("unknown dimension {0:?}")]
    DimensionNotFound(String),
}

#[derive(Debug, Clone)]
pub struct CumulSolution {
    /// Optimal cumul value at each position of `path`, ceil-rounded back
    /// to the integer domain (every dimension quantity here is a bounded
    /// integer).
    pub cumuls: Vec<i64>,
    /// Optimal slack consumed on each arc `path[k] -> path[k+1]`.
    pub slacks: Vec<i64>,
    /// Soft-bound and span cost at the optimum.
    pub cost: i64,
}

/// Solves for the cheapest feasible cumul/slack assignment along `path`
/// for `vehicle` under `dimension`'s bounds, soft bounds, and span cost.
pub fn optimize_route_cumuls(
    registry: &TransitRegistry,
    dimension: &Dimension,
    vehicle: usize,
    path: &[i64],
) -> Result<CumulSolution, CumulLpError> {
    if path.is_empty() {
        return Err(CumulLpError::EmptyRoute);
    }
    if path.len() == 1 {
        let (min, _) = dimension.start_cumul_bounds(vehicle);
        return Ok(CumulSolution {
            cumuls: vec![min],
            slacks: vec![],
            cost: 0,
        });
    }

    let mut vars = variables!();
    let n = path.len();

    let cumul_vars: Vec<_> = (0..n)
        .map(|k| {
            let (min, max) = if k == 0 {
                dimension.start_cumul_bounds(vehicle)
            } else if k == n - 1 {
                dimension.end_cumul_bounds(vehicle)
            } else {
                (0, dimension.capacity(vehicle))
            };
            vars.add(variable().min(min as f64).max(max as f64))
        })
        .collect();

    let slack_vars: Vec<_> = (0..n - 1)
        .map(|_| vars.add(variable().min(0.0).max(dimension.slack_max(vehicle) as f64)))
        .collect();

    let mut excess_upper = Vec::with_capacity(n);
    let mut excess_lower = Vec::with_capacity(n);
    for &node in path {
        excess_upper.push(
            dimension
                .soft_upper_bound_of(node)
                .map(|_| vars.add(variable().min(0.0))),
        );
        excess_lower.push(
            dimension
                .soft_lower_bound_of(node)
                .map(|_| vars.add(variable().min(0.0))),
        );
    }

    let mut objective: Expression = cumul_vars[0] * 0.0;
    for (k, &node) in path.iter().enumerate() {
        if let (Some(bound), Some(excess)) = (dimension.soft_upper_bound_of(node), excess_upper[k]) {
            objective += excess * (bound.coefficient as f64);
        }
        if let (Some(bound), Some(excess)) = (dimension.soft_lower_bound_of(node), excess_lower[k]) {
            objective += excess * (bound.coefficient as f64);
        }
    }
    let span_coefficient = dimension.span_cost_coefficient(vehicle) as f64;
    if span_coefficient != 0.0 {
        objective += (cumul_vars[n - 1] - cumul_vars[0]) * span_coefficient;
    }

    let objective_for_eval = objective.clone();
    let mut problem = vars.minimise(objective).using(microlp);

    for k in 0..n - 1 {
        let transit = dimension.transit(registry, vehicle, path[k], path[k + 1]) as f64;
        problem = problem.with(constraint!(
            cumul_vars[k + 1] == cumul_vars[k] + transit + slack_vars[k]
        ));
    }
    for (k, &node) in path.iter().enumerate() {
        if let (Some(bound), Some(excess)) = (dimension.soft_upper_bound_of(node), excess_upper[k]) {
            problem = problem.with(constraint!(cumul_vars[k] - excess <= bound.bound as f64));
        }
        if let (Some(bound), Some(excess)) = (dimension.soft_lower_bound_of(node), excess_lower[k]) {
            problem = problem.with(constraint!(bound.bound as f64 - cumul_vars[k] <= excess));
        }
    }

    debug!(vehicle, dimension = %dimension.name, route_len = n, "solving cumul LP");
    let solution = problem.solve()?;

    let cumuls: Vec<i64> = cumul_vars
        .iter()
        .map(|&v| solution.value(v).round() as i64)
        .collect();
    let slacks: Vec<i64> = slack_vars
        .iter()
        .map(|&v| solution.value(v).round() as i64)
        .collect();
    let cost = solution.eval(&objective_for_eval).round() as i64;

    Ok(CumulSolution { cumuls, slacks, cost })
}

/// Convenience entry point for callers already holding a closed
/// `RoutingModel`: looks up `dimension_name` and delegates to
/// `optimize_route_cumuls`.
pub fn optimize_dimension_for_vehicle(
    model: &routing_core::RoutingModel,
    dimension_name: &str,
    vehicle: usize,
    path: &[i64],
) -> Result<CumulSolution, CumulLpError> {
    let dimension = model
        .dimension(dimension_name)
        .map_err(|_| CumulLpError::DimensionNotFound(dimension_name.to_string()))?;
    optimize_route_cumuls(model.registry(), dimension, vehicle, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::{CallbackId, TransitRegistry};

    fn registry_with_constant_transit(value: i64) -> (TransitRegistry, CallbackId) {
        let mut registry = TransitRegistry::new();
        let id = registry.register_binary(move |_, _| value);
        (registry, id)
    }

    #[test]
    fn test_simple_chain_has_no_soft_bound_cost() {
        let (registry, callback) = registry_with_constant_transit(1);
        let mut dimension = Dimension::new(
            routing_core::DimensionIndex(0),
            "time",
            vec![callback],
            vec![100],
            vec![0],
            None,
        );
        dimension.set_span_cost_coefficient(0, 0);
        let result = optimize_route_cumuls(&registry, &dimension, 0, &[0, 1, 2, 3]).unwrap();
        assert_eq!(result.cost, 0);
        assert_eq!(result.cumuls.len(), 4);
        assert!(result.cumuls.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_soft_upper_bound_violation_is_penalized() {
        let (registry, callback) = registry_with_constant_transit(10);
        let mut dimension = Dimension::new(
            routing_core::DimensionIndex(0),
            "time",
            vec![callback],
            vec![1000],
            vec![0],
            None,
        );
        dimension.set_soft_upper_bound(2, 5, 3);
        let result = optimize_route_cumuls(&registry, &dimension, 0, &[0, 1, 2]).unwrap();
        assert!(result.cost > 0);
    }
}
