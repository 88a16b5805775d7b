//! Reward definitions and the immutable pool a crate draws from

use crate::config::RewardConfig;
use crate::selection::WeightDimension;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Row/column of a reward in the preview menu (1-based, opaque to the draw)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayPosition {
    pub row: u32,
    pub column: u32,
}

/// One entry of a reward pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    /// Weight used for the authoritative draw
    pub weight: f64,
    /// Weight used only for cosmetic reveal entries
    pub display_weight: f64,
    pub position: DisplayPosition,
    /// Item shown for this reward in menus and reveals
    pub display: String,
    /// Delivered to the player on grant; the engine never looks inside
    pub payload: serde_json::Value,
}

impl Reward {
    pub fn new(id: impl Into<String>, weight: f64, display_weight: f64) -> Self {
        let id = id.into();
        Self {
            display: id.clone(),
            id,
            weight,
            display_weight,
            position: DisplayPosition::default(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_position(mut self, row: u32, column: u32) -> Self {
        self.position = DisplayPosition { row, column };
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn weight_in(&self, dimension: WeightDimension) -> f64 {
        match dimension {
            WeightDimension::Actual => self.weight,
            WeightDimension::Display => self.display_weight,
        }
    }
}

impl From<&RewardConfig> for Reward {
    fn from(config: &RewardConfig) -> Self {
        Self {
            id: config.id.clone(),
            weight: config.weight.actual,
            display_weight: config.weight.display,
            position: DisplayPosition {
                row: config.display.row,
                column: config.display.column,
            },
            display: config
                .display
                .item
                .clone()
                .unwrap_or_else(|| config.id.clone()),
            payload: config.payload.clone(),
        }
    }
}

/// Ordered, immutable set of rewards
///
/// Cloning shares the same backing slice. Reloading a crate builds a new pool.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardPool {
    rewards: Arc<[Reward]>,
}

impl RewardPool {
    pub fn new(rewards: Vec<Reward>) -> Self {
        Self {
            rewards: rewards.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Reward> {
        self.rewards.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reward> {
        self.rewards.iter()
    }

    pub fn as_slice(&self) -> &[Reward] {
        &self.rewards
    }

    /// Sum of one full pass of weights in `dimension`
    pub fn total_weight(&self, dimension: WeightDimension) -> f64 {
        self.rewards.iter().map(|r| r.weight_in(dimension)).sum()
    }

    pub fn has_positive_weight(&self, dimension: WeightDimension) -> bool {
        self.rewards.iter().any(|r| r.weight_in(dimension) > 0.0)
    }
}

impl<'a> IntoIterator for &'a RewardPool {
    type Item = &'a Reward;
    type IntoIter = std::slice::Iter<'a, Reward>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
