//! Action Resolver.
//!
//! Turns computed weights into trading actions, limiting turnover:
//! positions grow only with an Accelerating phase, new positions open at a
//! fraction of their computed size, and expensive names are never bought.

use super::types::{Action, Pool, SecurityInput};

/// Resolved action and the weight to trade towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub action: Action,
    pub target_weight: f64,
}

impl Resolution {
    fn new(action: Action, target_weight: f64) -> Self {
        Self {
            action,
            target_weight,
        }
    }

    fn close(current_weight: f64) -> Self {
        let action = if current_weight > 0.0 {
            Action::Exit
        } else {
            Action::Hold
        };
        Self::new(action, 0.0)
    }
}

/// Glide path and rebalance band parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionResolver {
    initial_position_ratio: f64,
    rebalance_band: f64,
}

impl ActionResolver {
    pub fn new(initial_position_ratio: f64, rebalance_band: f64) -> Self {
        Self {
            initial_position_ratio,
            rebalance_band,
        }
    }

    /// Resolve one security. Rules are evaluated in order, first match wins.
    pub fn resolve(&self, security: &SecurityInput, pool: Pool, computed: f64) -> Resolution {
        let current = security.current_weight;

        if pool == Pool::Block {
            return Resolution::new(Action::Exit, 0.0);
        }
        if computed <= 0.0 || security.is_expensive() {
            return Resolution::close(current);
        }
        if security.is_decaying() && current > 0.0 {
            return Resolution::new(Action::LightReduce, computed);
        }
        if current <= 0.0 {
            return Resolution::new(Action::Build, computed * self.initial_position_ratio);
        }

        let diff = computed - current;
        let action = if diff > self.rebalance_band {
            if security.is_accelerating() {
                Action::Add
            } else {
                Action::Hold
            }
        } else if diff < -self.rebalance_band {
            Action::LightReduce
        } else {
            Action::Hold
        };

        Resolution::new(action, computed)
    }
}
