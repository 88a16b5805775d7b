//! Crate definitions and plugin settings
//!
//! Loaded from TOML. Keys are kebab-case so existing crate files carry over
//! (`no-key-velocity`, `right-click-message`, ...).

use crate::errors::{ConfigurationError, CrateError, CrateResult};
use crate::selection::SelectionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Largest preview menu height
pub const MAX_PREVIEW_ROWS: u32 = 6;

/// Top-level configuration: settings, messages and every crate
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CratesConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub lang: LangConfig,
    #[serde(default)]
    pub crates: Vec<CrateConfig>,
}

/// Plugin-wide settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Speed a player is pushed back with when bumping a crate without a key
    pub no_key_velocity: f64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            no_key_velocity: 1.5,
            log_level: "info".to_string(),
        }
    }
}

/// Player-facing messages
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LangConfig {
    /// Sent when a key check fails; `%crate%` becomes the crate name
    pub not_enough_keys: String,
}

impl Default for LangConfig {
    fn default() -> Self {
        Self {
            not_enough_keys: "You don't have a key for %crate%!".to_string(),
        }
    }
}

/// One crate definition
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrateConfig {
    pub id: String,
    pub name: String,
    /// Roll style id, resolved against the roll style registry
    pub roll: String,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub placed: PlacedConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub keygui: KeyGuiConfig,
    #[serde(default)]
    pub finish: FinishConfig,
    #[serde(default)]
    pub rewards: Vec<RewardConfig>,
}

/// Hologram and particles for a crate placed in the world
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlacedConfig {
    #[serde(default)]
    pub hologram: HologramConfig,
    #[serde(default)]
    pub particles: Vec<ParticleConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HologramConfig {
    pub lines: Vec<String>,
    pub height: f64,
}

impl Default for HologramConfig {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            height: 1.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParticleConfig {
    pub particle: String,
    #[serde(default)]
    pub animation: String,
}

/// Preview menu layout
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PreviewConfig {
    pub rows: u32,
    pub title: String,
    pub mask: MaskConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            rows: MAX_PREVIEW_ROWS,
            title: String::new(),
            mask: MaskConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MaskConfig {
    pub items: Vec<String>,
    pub pattern: Vec<String>,
}

/// The crate's slot in the key menu
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KeyGuiConfig {
    pub row: u32,
    pub column: u32,
    pub item: String,
    /// `%keys%` becomes the player's balance
    pub lore: Vec<String>,
    pub right_click_message: Vec<String>,
}

impl Default for KeyGuiConfig {
    fn default() -> Self {
        Self {
            row: 1,
            column: 1,
            item: "tripwire_hook".to_string(),
            lore: vec!["Keys: %keys%".to_string()],
            right_click_message: Vec::new(),
        }
    }
}

/// Effects played when a reveal completes
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FinishConfig {
    pub sounds: Vec<SoundConfig>,
    pub fireworks: Vec<FireworkConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoundConfig {
    pub sound: String,
    #[serde(default = "default_unit")]
    pub volume: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
}

fn default_unit() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FireworkConfig {
    pub power: u8,
    #[serde(rename = "type")]
    pub kind: String,
    pub colors: Vec<String>,
    pub fade_colors: Vec<String>,
    pub trail: bool,
    pub flicker: bool,
}

impl Default for FireworkConfig {
    fn default() -> Self {
        Self {
            power: 1,
            kind: "ball".to_string(),
            colors: Vec::new(),
            fade_colors: Vec::new(),
            trail: false,
            flicker: false,
        }
    }
}

/// One reward entry of a crate
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RewardConfig {
    pub id: String,
    pub weight: WeightConfig,
    #[serde(default)]
    pub display: RewardDisplayConfig,
    /// Handed to the reward granter untouched
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WeightConfig {
    pub actual: f64,
    pub display: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RewardDisplayConfig {
    pub row: u32,
    pub column: u32,
    pub item: Option<String>,
}

impl Default for RewardDisplayConfig {
    fn default() -> Self {
        Self {
            row: 1,
            column: 1,
            item: None,
        }
    }
}

impl CratesConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> CrateResult<Self> {
        let config: CratesConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> CrateResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CrateError::Configuration(ConfigurationError::LoadFailed(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn crate_config(&self, id: &str) -> Option<&CrateConfig> {
        self.crates.iter().find(|c| c.id == id)
    }

    /// Validate settings and every crate, rejecting duplicate crate ids
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.settings.no_key_velocity.is_finite() {
            return Err(ConfigurationError::InvalidValue {
                field: "settings.no-key-velocity".to_string(),
                value: self.settings.no_key_velocity.to_string(),
                reason: "must be finite".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for crate_config in &self.crates {
            crate_config.validate()?;
            if !seen.insert(crate_config.id.as_str()) {
                return Err(ConfigurationError::DuplicateCrate(crate_config.id.clone()));
            }
        }

        Ok(())
    }
}

impl CrateConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("crate id".to_string()));
        }

        if self.roll.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired(format!(
                "roll for crate '{}'",
                self.id
            )));
        }

        if self.preview.rows == 0 || self.preview.rows > MAX_PREVIEW_ROWS {
            return Err(ConfigurationError::InvalidValue {
                field: format!("{}.preview.rows", self.id),
                value: self.preview.rows.to_string(),
                reason: format!("must be between 1 and {}", MAX_PREVIEW_ROWS),
            });
        }

        let mut reward_ids = HashSet::new();
        for reward in &self.rewards {
            if !reward_ids.insert(reward.id.as_str()) {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "duplicate reward '{}' in crate '{}'",
                    reward.id, self.id
                )));
            }

            for (field, value) in [("actual", reward.weight.actual), ("display", reward.weight.display)] {
                if !value.is_finite() {
                    return Err(ConfigurationError::InvalidValue {
                        field: format!("{}.rewards.{}.weight.{}", self.id, reward.id, field),
                        value: value.to_string(),
                        reason: "must be finite".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
