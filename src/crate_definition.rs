//! A crate built from its configuration
//!
//! Construction resolves everything that can be wrong with a definition (the
//! roll style above all) so a [`Crate`] that exists can always be opened.

use crate::config::{CrateConfig, FinishConfig, KeyGuiConfig};
use crate::errors::{ConfigurationError, CrateResult, DrawError};
use crate::ledger::balance_key;
use crate::reward::{DisplayPosition, Reward, RewardPool};
use crate::roll::{RollOutcome, RollSequenceBuilder, RollStyle, RollStyles};
use crate::selection::{
    FixedBudgetCyclicDraw, SelectionPolicy, WeightDimension, SLOW_WALK_PASSES,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Replaced by the player's balance in key menu lore
pub const KEYS_PLACEHOLDER: &str = "%keys%";

/// Particle path drawn around a placed crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleAnimation {
    Spiral,
    DoubleSpiral,
    Twirl,
    Circle,
}

impl ParticleAnimation {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "spiral" => Some(Self::Spiral),
            "double_spiral" => Some(Self::DoubleSpiral),
            "twirl" => Some(Self::Twirl),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }

    /// Like [`Self::from_id`] but unknown ids fall back to [`Self::Spiral`]
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_else(|| {
            if !id.is_empty() {
                tracing::warn!(animation = id, "Unknown particle animation, using spiral");
            }
            Self::Spiral
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleData {
    pub particle: String,
    pub animation: ParticleAnimation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hologram {
    pub lines: Vec<String>,
    pub height: f64,
}

/// One reward as shown in the preview menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub reward_id: String,
    pub display: String,
    pub position: DisplayPosition,
}

/// Read-only listing of a crate's pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewView {
    pub crate_id: String,
    pub title: String,
    pub rows: u32,
    pub mask_items: Vec<String>,
    pub mask_pattern: Vec<String>,
    pub entries: Vec<PreviewEntry>,
}

/// The crate's slot in the key menu, rendered for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySlotView {
    pub row: u32,
    pub column: u32,
    pub item: String,
    pub lore: Vec<String>,
}

/// A loot crate: pool, roll style and presentation
pub struct Crate {
    id: String,
    name: String,
    pool: RewardPool,
    roll_style: Arc<dyn RollStyle>,
    builder: RollSequenceBuilder,
    hologram: Hologram,
    particles: Vec<ParticleData>,
    preview: PreviewView,
    keygui: KeyGuiConfig,
    finish: FinishConfig,
}

impl Crate {
    /// Build a crate, failing on an unknown roll style
    pub fn from_config(config: &CrateConfig, styles: &RollStyles) -> CrateResult<Self> {
        config.validate()?;

        let roll_style = styles.get(&config.roll).ok_or_else(|| {
            ConfigurationError::UnknownRollStyle {
                crate_id: config.id.clone(),
                roll: config.roll.clone(),
            }
        })?;

        let pool = RewardPool::new(config.rewards.iter().map(Reward::from).collect());
        if !pool.has_positive_weight(WeightDimension::Actual) {
            tracing::warn!(
                crate_id = %config.id,
                rewards = pool.len(),
                "Crate has no reward with a positive weight"
            );
        }

        if config.selection == SelectionPolicy::FixedBudget {
            for dimension in [WeightDimension::Actual, WeightDimension::Display] {
                if let Some(passes) = slow_walk_passes(&pool, dimension) {
                    tracing::warn!(
                        crate_id = %config.id,
                        %dimension,
                        passes,
                        "Weights are so small that every draw walks the pool many times"
                    );
                }
            }
        }

        let particles = config
            .placed
            .particles
            .iter()
            .map(|p| ParticleData {
                particle: p.particle.to_ascii_uppercase(),
                animation: ParticleAnimation::resolve(&p.animation),
            })
            .collect();

        let preview = PreviewView {
            crate_id: config.id.clone(),
            title: config.preview.title.clone(),
            rows: config.preview.rows,
            mask_items: config.preview.mask.items.clone(),
            mask_pattern: config.preview.mask.pattern.clone(),
            entries: pool
                .iter()
                .map(|r| PreviewEntry {
                    reward_id: r.id.clone(),
                    display: r.display.clone(),
                    position: r.position,
                })
                .collect(),
        };

        tracing::debug!(
            crate_id = %config.id,
            roll = roll_style.id(),
            selection = ?config.selection,
            rewards = pool.len(),
            "Built crate"
        );

        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            pool,
            roll_style,
            builder: RollSequenceBuilder::new(config.selection.selector()),
            hologram: Hologram {
                lines: config.placed.hologram.lines.clone(),
                height: config.placed.hologram.height,
            },
            particles,
            preview,
            keygui: config.keygui.clone(),
            finish: config.finish.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &RewardPool {
        &self.pool
    }

    pub fn roll_style(&self) -> &Arc<dyn RollStyle> {
        &self.roll_style
    }

    pub fn hologram(&self) -> &Hologram {
        &self.hologram
    }

    pub fn particles(&self) -> &[ParticleData] {
        &self.particles
    }

    pub fn finish(&self) -> &FinishConfig {
        &self.finish
    }

    pub fn keygui(&self) -> &KeyGuiConfig {
        &self.keygui
    }

    /// Build one outcome with this crate's selector and roll style
    pub fn roll(&self, rng: &mut dyn RngCore) -> Result<RollOutcome, DrawError> {
        self.builder.build(&self.pool, self.roll_style.as_ref(), rng)
    }

    /// `amount` independent draws, for hosts that fill their own displays
    pub fn random_rewards(
        &self,
        amount: usize,
        dimension: WeightDimension,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Reward>, DrawError> {
        self.builder.sample(&self.pool, amount, dimension, rng)
    }

    pub fn preview_view(&self) -> &PreviewView {
        &self.preview
    }

    /// Key menu slot with `%keys%` filled in
    pub fn key_slot_view(&self, balance: i64) -> KeySlotView {
        let keys = balance.to_string();
        KeySlotView {
            row: self.keygui.row,
            column: self.keygui.column,
            item: self.keygui.item.clone(),
            lore: self
                .keygui
                .lore
                .iter()
                .map(|line| line.replace(KEYS_PLACEHOLDER, &keys))
                .collect(),
        }
    }

    /// Placeholder id exposing the balance (`<id>_keys`)
    pub fn keys_placeholder_id(&self) -> String {
        balance_key(&self.id)
    }
}

/// Passes a fixed-budget walk needs, when that is past [`SLOW_WALK_PASSES`]
pub fn slow_walk_passes(pool: &RewardPool, dimension: WeightDimension) -> Option<f64> {
    FixedBudgetCyclicDraw::passes_to_exhaust(pool, dimension)
        .filter(|passes| *passes > SLOW_WALK_PASSES)
}

impl fmt::Debug for Crate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crate")
            .field("id", &self.id)
            .field("roll", &self.roll_style.id())
            .field("rewards", &self.pool.len())
            .finish()
    }
}
