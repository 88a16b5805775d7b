//! Weighted reward selection
//!
//! Two algorithms sit behind [`WeightedSelector`]:
//!
//! - [`FixedBudgetCyclicDraw`] is the crate default. It shuffles the pool,
//!   then walks it cyclically subtracting weights from a fixed budget of 100
//!   and returns the entry that takes the budget to zero or below. This is
//!   not proportional to weight over the pool total: when a full pass sums
//!   to less than 100 the walk wraps, and when it sums to much more than 100
//!   only the front of the shuffled order is reachable. Existing crate
//!   configurations are tuned against this behaviour, so it is kept as is.
//! - [`NormalizedWeightedDraw`] picks with probability `weight / total`.

use crate::errors::DrawError;
use crate::reward::{Reward, RewardPool};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Starting budget of a fixed-budget walk
pub const DRAW_BUDGET: f64 = 100.0;

/// Last step index a fixed-budget walk may reach
pub const MAX_WALK_STEP: usize = i32::MAX as usize;

/// Passes over the pool beyond which a fixed-budget walk is worth a warning
pub const SLOW_WALK_PASSES: f64 = 1_000.0;

/// Which of a reward's two weights a draw uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightDimension {
    /// True odds, used for the reward the player receives
    Actual,
    /// Cosmetic odds, used for reveal filler entries
    Display,
}

impl WeightDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightDimension::Actual => "actual",
            WeightDimension::Display => "display",
        }
    }
}

impl fmt::Display for WeightDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draws one reward from a pool
pub trait WeightedSelector: Send + Sync {
    fn name(&self) -> &'static str;

    fn draw<'p>(
        &self,
        pool: &'p RewardPool,
        dimension: WeightDimension,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Reward, DrawError>;
}

/// Shuffle, then walk cyclically against a budget of [`DRAW_BUDGET`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedBudgetCyclicDraw;

impl FixedBudgetCyclicDraw {
    /// Full passes a walk needs to spend the budget, when a pass sums to a
    /// positive amount. Drives the cost of every draw from `pool`.
    pub fn passes_to_exhaust(pool: &RewardPool, dimension: WeightDimension) -> Option<f64> {
        let pass_total = pool.total_weight(dimension);
        (pass_total > 0.0).then(|| DRAW_BUDGET / pass_total)
    }
}

impl WeightedSelector for FixedBudgetCyclicDraw {
    fn name(&self) -> &'static str {
        "fixed-budget"
    }

    fn draw<'p>(
        &self,
        pool: &'p RewardPool,
        dimension: WeightDimension,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Reward, DrawError> {
        if pool.is_empty() {
            return Err(DrawError::PoolExhausted);
        }

        let mut order: Vec<&Reward> = pool.iter().collect();
        order.shuffle(rng);

        let len = order.len();
        let pass_total: f64 = order.iter().map(|r| r.weight_in(dimension)).sum();
        // Where a walk that never crosses zero stops
        let last = order[MAX_WALK_STEP % len];

        let mut budget = DRAW_BUDGET;
        for step in 0..=MAX_WALK_STEP {
            let current = order[step % len];
            budget -= current.weight_in(dimension);
            if budget <= 0.0 {
                return Ok(current);
            }

            // Later passes repeat this one from a budget no lower
            if step + 1 == len && !(pass_total > 0.0) {
                return Ok(last);
            }
        }

        Ok(last)
    }
}

/// Probability proportional to positive weight over the pool total
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedWeightedDraw;

impl WeightedSelector for NormalizedWeightedDraw {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn draw<'p>(
        &self,
        pool: &'p RewardPool,
        dimension: WeightDimension,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Reward, DrawError> {
        if pool.is_empty() {
            return Err(DrawError::PoolExhausted);
        }

        let weights: Vec<f64> = pool
            .iter()
            .map(|r| {
                let w = r.weight_in(dimension);
                if w.is_finite() && w > 0.0 {
                    w
                } else {
                    0.0
                }
            })
            .collect();

        let index = WeightedIndex::new(&weights)
            .map_err(|_| DrawError::NoPositiveWeight(dimension.as_str()))?;

        pool.get(index.sample(rng))
            .ok_or(DrawError::PoolExhausted)
    }
}

/// Selection algorithm named in a crate definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    #[default]
    FixedBudget,
    Normalized,
}

impl SelectionPolicy {
    pub fn selector(&self) -> Arc<dyn WeightedSelector> {
        match self {
            SelectionPolicy::FixedBudget => Arc::new(FixedBudgetCyclicDraw),
            SelectionPolicy::Normalized => Arc::new(NormalizedWeightedDraw),
        }
    }
}
