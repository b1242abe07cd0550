//! Pickup/delivery coupling: pairing, policy, and cumul limits between
//! a pickup and its delivery.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupDeliveryPolicy {
    /// No ordering constraint beyond same-vehicle and precedence.
    Any,
    /// Last pickup in, first delivery out (stack discipline).
    Lifo,
    /// First pickup in, first delivery out (queue discipline).
    Fifo,
}

impl Default for PickupDeliveryPolicy {
    fn default() -> Self {
        Self::Any
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PickupDeliveryPair {
    pub pickup: i64,
    pub delivery: i64,
}

/// A bound `L(pickup_alt, delivery_alt)` on `cumul(delivery) - cumul(pickup)`
/// for a dimension, installed as a redundant constraint once both
/// alternatives are selected on the same vehicle.
#[derive(Debug, Clone, Copy)]
pub struct PickupToDeliveryLimit {
    pub pair_index: usize,
    pub max_cumul_difference: i64,
}

#[derive(Debug, Default)]
pub struct PickupDeliveryPairs {
    pairs: Vec<PickupDeliveryPair>,
    policy_of_vehicle: std::collections::HashMap<usize, PickupDeliveryPolicy>,
    limits: Vec<PickupToDeliveryLimit>,
}

impl PickupDeliveryPairs {
    pub fn add(&mut self, pickup: i64, delivery: i64) -> usize {
        self.pairs.push(PickupDeliveryPair { pickup, delivery });
        self.pairs.len() - 1
    }

    pub fn set_vehicle_policy(&mut self, vehicle: usize, policy: PickupDeliveryPolicy) {
        self.policy_of_vehicle.insert(vehicle, policy);
    }

    pub fn policy_of_vehicle(&self, vehicle: usize) -> PickupDeliveryPolicy {
        self.policy_of_vehicle
            .get(&vehicle)
            .copied()
            .unwrap_or_default()
    }

    pub fn add_limit(&mut self, pair_index: usize, max_cumul_difference: i64) {
        self.limits.push(PickupToDeliveryLimit {
            pair_index,
            max_cumul_difference,
        });
    }

    pub fn limits(&self) -> &[PickupToDeliveryLimit] {
        &self.limits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PickupDeliveryPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> &PickupDeliveryPair {
        &self.pairs[index]
    }
}

/// Checks the LIFO/FIFO nesting law for a single vehicle's visited sequence
/// of pair legs, used both by the `PickupDelivery` filter and by tests below.
///
/// `sequence` lists, in route order, `(pair_index, is_pickup)` for every
/// pickup/delivery node visited by the vehicle.
pub fn nests_correctly(policy: PickupDeliveryPolicy, sequence: &[(usize, bool)]) -> bool {
    match policy {
        PickupDeliveryPolicy::Any => {
            // Only same-vehicle + precedence is required; precedence is
            // guaranteed by construction (pickup visited before its
            // delivery) elsewhere, so there is nothing extra to check here.
            true
        }
        PickupDeliveryPolicy::Lifo => {
            let mut open = Vec::new();
            for &(pair, is_pickup) in sequence {
                if is_pickup {
                    open.push(pair);
                } else {
                    if open.last() != Some(&pair) {
                        return false;
                    }
                    open.pop();
                }
            }
            open.is_empty()
        }
        PickupDeliveryPolicy::Fifo => {
            let mut open = std::collections::VecDeque::new();
            for &(pair, is_pickup) in sequence {
                if is_pickup {
                    open.push_back(pair);
                } else {
                    if open.front() != Some(&pair) {
                        return false;
                    }
                    open.pop_front();
                }
            }
            open.is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifo_accepts_nested_sequence() {
        // pairs (1,4)=0 (2,5)=1 (3,6)=2; accepted sequence 1,2,3,6,5,4
        let seq = [
            (0, true),
            (1, true),
            (2, true),
            (2, false),
            (1, false),
            (0, false),
        ];
        assert!(nests_correctly(PickupDeliveryPolicy::Lifo, &seq));
    }

    #[test]
    fn test_lifo_rejects_crossing_sequence() {
        // 1,2,4,3,6,5 -> delivery of pair0 happens before pair1/pair2 close
        let seq = [
            (0, true),
            (1, true),
            (0, false),
            (2, true),
            (2, false),
            (1, false),
        ];
        assert!(!nests_correctly(PickupDeliveryPolicy::Lifo, &seq));
    }

    #[test]
    fn test_fifo_requires_in_order_delivery() {
        let seq = [(0, true), (1, true), (0, false), (1, false)];
        assert!(nests_correctly(PickupDeliveryPolicy::Fifo, &seq));
        let bad = [(0, true), (1, true), (1, false), (0, false)];
        assert!(!nests_correctly(PickupDeliveryPolicy::Fifo, &bad));
    }
}
