//! Roll styles and reveal sequence construction
//!
//! A roll style is resolved from its id once, when a crate is built, and
//! decides how many cosmetic entries a reveal carries. The authoritative
//! reward is drawn separately from the cosmetic strip and is not required to
//! appear in it.

use crate::errors::DrawError;
use crate::reward::{Reward, RewardPool};
use crate::selection::{WeightDimension, WeightedSelector};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Cosmetic entries on a scroll strip: 36 scroll steps plus three so the
/// strip lines up with the centre slot
pub const SCROLL_COSMETIC_LEN: usize = 39;

/// Entries on the encircle ring
pub const ENCIRCLE_COSMETIC_LEN: usize = 8;

/// A reveal animation variant as far as the draw is concerned
pub trait RollStyle: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Number of display-weight picks the reveal needs
    fn cosmetic_len(&self) -> usize;
}

/// Styles shipped with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRollStyle {
    /// Horizontal strip that scrolls and slows onto the reward
    Scroll,
    /// Ring of items circling the player
    Encircle,
    /// No animation, the reward is shown straight away
    Instant,
}

impl BuiltinRollStyle {
    pub const ALL: [BuiltinRollStyle; 3] = [
        BuiltinRollStyle::Scroll,
        BuiltinRollStyle::Encircle,
        BuiltinRollStyle::Instant,
    ];
}

impl RollStyle for BuiltinRollStyle {
    fn id(&self) -> &str {
        match self {
            BuiltinRollStyle::Scroll => "scroll",
            BuiltinRollStyle::Encircle => "encircle",
            BuiltinRollStyle::Instant => "instant",
        }
    }

    fn cosmetic_len(&self) -> usize {
        match self {
            BuiltinRollStyle::Scroll => SCROLL_COSMETIC_LEN,
            BuiltinRollStyle::Encircle => ENCIRCLE_COSMETIC_LEN,
            BuiltinRollStyle::Instant => 0,
        }
    }
}

/// Registry of roll styles keyed by id
#[derive(Debug, Clone, Default)]
pub struct RollStyles {
    styles: HashMap<String, Arc<dyn RollStyle>>,
}

impl RollStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with every [`BuiltinRollStyle`]
    pub fn with_builtins() -> Self {
        let mut styles = Self::new();
        for style in BuiltinRollStyle::ALL {
            styles.register(Arc::new(style));
        }
        styles
    }

    /// Add a style, replacing and returning any style with the same id
    pub fn register(&mut self, style: Arc<dyn RollStyle>) -> Option<Arc<dyn RollStyle>> {
        self.styles.insert(style.id().to_string(), style)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RollStyle>> {
        self.styles.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.styles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Identity of one draw, used to match the animator's finish call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeId(pub Uuid);

impl OutcomeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OutcomeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one roll: the reward the player gets plus the reveal strip
#[derive(Debug, Clone, PartialEq)]
pub struct RollOutcome {
    pub id: OutcomeId,
    /// Id of the roll style that shaped `cosmetic`
    pub style: String,
    /// Drawn with actual weights
    pub reward: Reward,
    /// Drawn with display weights, in reveal order
    pub cosmetic: Vec<Reward>,
}

/// Builds [`RollOutcome`]s with a chosen selector
#[derive(Clone)]
pub struct RollSequenceBuilder {
    selector: Arc<dyn WeightedSelector>,
}

impl RollSequenceBuilder {
    pub fn new(selector: Arc<dyn WeightedSelector>) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &Arc<dyn WeightedSelector> {
        &self.selector
    }

    /// Cosmetic strip for `style`, then one independent actual draw
    pub fn build(
        &self,
        pool: &RewardPool,
        style: &dyn RollStyle,
        rng: &mut dyn RngCore,
    ) -> Result<RollOutcome, DrawError> {
        let cosmetic = self.sample(pool, style.cosmetic_len(), WeightDimension::Display, rng)?;
        let reward = self
            .selector
            .draw(pool, WeightDimension::Actual, rng)?
            .clone();

        Ok(RollOutcome {
            id: OutcomeId::new(),
            style: style.id().to_string(),
            reward,
            cosmetic,
        })
    }

    /// `amount` independent draws in `dimension`
    pub fn sample(
        &self,
        pool: &RewardPool,
        amount: usize,
        dimension: WeightDimension,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Reward>, DrawError> {
        let mut picks = Vec::with_capacity(amount);
        for _ in 0..amount {
            picks.push(self.selector.draw(pool, dimension, rng)?.clone());
        }
        Ok(picks)
    }
}

impl fmt::Debug for RollSequenceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollSequenceBuilder")
            .field("selector", &self.selector.name())
            .finish()
    }
}
