//! Register & memoize arc/unary/state-dependent transit functions.
//!
//! Three callback shapes are supported. Each registration returns a stable
//! `CallbackId`; binary and state-dependent callbacks are memoized per
//! `(i, j)` pair the first time they are evaluated, and the cache is only
//! cleared when the model is closed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub usize);

/// A materialized range function over a bounded integer domain: `f(x)` for
/// `x` in `[domain_min, domain_max]`, built lazily on first use of a given
/// `(i, j)` state-dependent pair.
#[derive(Clone)]
pub struct RangeFunction {
    domain_min: i64,
    table: Vec<i64>,
}

impl RangeFunction {
    pub fn from_closure(domain_min: i64, domain_max: i64, f: impl Fn(i64) -> i64) -> Self {
        debug_assert!(domain_max >= domain_min);
        let table = (domain_min..=domain_max).map(f).collect();
        RangeFunction { domain_min, table }
    }

    pub fn eval(&self, x: i64) -> i64 {
        let idx = (x - self.domain_min).clamp(0, self.table.len() as i64 - 1) as usize;
        self.table[idx]
    }

    /// The paired `f+id(x) = f(x) + x` evaluator used by some callers.
    pub fn eval_plus_identity(&self, x: i64) -> i64 {
        self.eval(x) + x
    }
}

impl fmt::Debug for RangeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeFunction")
            .field("domain_min", &self.domain_min)
            .field("len", &self.table.len())
            .finish()
    }
}

enum Callback {
    Unary(Box<dyn Fn(i64) -> i64>),
    Binary {
        f: Box<dyn Fn(i64, i64) -> i64>,
        cache: RefCell<HashMap<(i64, i64), i64>>,
    },
    StateDependent {
        f: Box<dyn Fn(i64, i64, i64) -> i64>,
        cache: RefCell<HashMap<(i64, i64), RangeFunction>>,
    },
}

/// Owns every registered transit callback for a `RoutingModel`.
#[derive(Default)]
pub struct TransitRegistry {
    callbacks: Vec<Callback>,
}

impl TransitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_unary(&mut self, f: impl Fn(i64) -> i64 + 'static) -> CallbackId {
        self.callbacks.push(Callback::Unary(Box::new(f)));
        CallbackId(self.callbacks.len() - 1)
    }

    pub fn register_binary(&mut self, f: impl Fn(i64, i64) -> i64 + 'static) -> CallbackId {
        self.callbacks.push(Callback::Binary {
            f: Box::new(f),
            cache: RefCell::new(HashMap::new()),
        });
        CallbackId(self.callbacks.len() - 1)
    }

    /// `f(i, j, parent_cumul) -> transit`. The returned id's
    /// `state_dependent_transit` additionally caches a `RangeFunction` per
    /// `(i, j)`, materialized once the caller supplies the parent cumul's
    /// bounded domain.
    pub fn register_state_dependent(
        &mut self,
        f: impl Fn(i64, i64, i64) -> i64 + 'static,
    ) -> CallbackId {
        self.callbacks.push(Callback::StateDependent {
            f: Box::new(f),
            cache: RefCell::new(HashMap::new()),
        });
        CallbackId(self.callbacks.len() - 1)
    }

    pub fn unary_transit(&self, id: CallbackId, i: i64) -> i64 {
        match &self.callbacks[id.0] {
            Callback::Unary(f) => f(i),
            _ => panic!("callback {} is not unary", id.0),
        }
    }

    pub fn binary_transit(&self, id: CallbackId, i: i64, j: i64) -> i64 {
        match &self.callbacks[id.0] {
            Callback::Binary { f, cache } => {
                if let Some(&v) = cache.borrow().get(&(i, j)) {
                    return v;
                }
                let v = f(i, j);
                cache.borrow_mut().insert((i, j), v);
                v
            }
            _ => panic!("callback {} is not binary", id.0),
        }
    }

    /// Evaluate the state-dependent transit for `(i, j)` at a given parent
    /// cumul value, materializing and caching the `RangeFunction` over
    /// `[domain_min, domain_max]` on first use of that pair.
    pub fn state_dependent_transit(
        &self,
        id: CallbackId,
        i: i64,
        j: i64,
        parent_cumul: i64,
        domain_min: i64,
        domain_max: i64,
    ) -> i64 {
        match &self.callbacks[id.0] {
            Callback::StateDependent { f, cache } => {
                if let Some(range_fn) = cache.borrow().get(&(i, j)) {
                    return range_fn.eval_plus_identity(parent_cumul);
                }
                let range_fn =
                    RangeFunction::from_closure(domain_min, domain_max, |x| f(i, j, x));
                let v = range_fn.eval_plus_identity(parent_cumul);
                cache.borrow_mut().insert((i, j), range_fn);
                v
            }
            _ => panic!("callback {} is not state-dependent", id.0),
        }
    }

    /// Clear all per-pair memoization — invoked once at `Close`.
    pub fn invalidate_caches(&self) {
        for cb in &self.callbacks {
            match cb {
                Callback::Binary { cache, .. } => cache.borrow_mut().clear(),
                Callback::StateDependent { cache, .. } => cache.borrow_mut().clear(),
                Callback::Unary(_) => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_transit_is_memoized() {
        let mut registry = TransitRegistry::new();
        let calls = std::cell::Cell::new(0);
        // SAFETY: tests are single-threaded, this just counts invocations.
        let id = registry.register_binary(move |i, j| {
            calls.set(calls.get() + 1);
            i + j
        });
        assert_eq!(registry.binary_transit(id, 1, 2), 3);
        assert_eq!(registry.binary_transit(id, 1, 2), 3);
        assert_eq!(registry.binary_transit(id, 2, 1), 3);
    }

    #[test]
    fn test_state_dependent_caches_range_function() {
        let mut registry = TransitRegistry::new();
        let id = registry.register_state_dependent(|_i, _j, parent_cumul| parent_cumul * 2);
        // f+id(x) = f(x) + x = 3x
        assert_eq!(registry.state_dependent_transit(id, 0, 1, 5, 0, 100), 15);
        assert_eq!(registry.state_dependent_transit(id, 0, 1, 10, 0, 100), 30);
    }

    #[test]
    fn test_unary_transit() {
        let mut registry = TransitRegistry::new();
        let id = registry.register_unary(|i| i * 10);
        assert_eq!(registry.unary_transit(id, 3), 30);
    }
}
