//! Keycrate - key-gated loot crates
//!
//! A player spends a key to open a crate; the crate draws a reward from its
//! weighted pool, an external animator reveals it, and on completion the
//! reward is granted with sounds and fireworks. This crate holds the draw,
//! the reveal sequence, the key ledger and the open/finish flow. Rendering,
//! effects and persistence are host collaborators (see [`collaborators`]).
//!
//! ```no_run
//! use keycrate::{build_engines, CratesConfig, RollStyles};
//! # fn host() -> keycrate::Collaborators { unimplemented!() }
//!
//! let config = CratesConfig::load("crates.toml")?;
//! keycrate::logging::init_logging(&config.settings.log_level);
//! let engines = build_engines(&config, &RollStyles::with_builtins(), &host())?;
//! # Ok::<(), keycrate::CrateError>(())
//! ```

pub mod collaborators;
pub mod config;
pub mod crate_definition;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod logging;
pub mod reward;
pub mod roll;
pub mod selection;

pub use collaborators::{
    ClickKind, Collaborators, Effects, Location, MenuRenderer, Messenger, PlayerContext, PlayerId,
    RevealAnimator, RevealRequest, RewardGranter, Vector,
};
pub use config::{CrateConfig, CratesConfig, LangConfig, Settings};
pub use crate_definition::{Crate, KeySlotView, ParticleAnimation, PreviewView};
pub use engine::{build_engines, CrateEngine, DrawState, FinishStatus, OpenResult};
pub use errors::{ConfigurationError, CrateError, CrateResult, DrawError, EngineError};
pub use ledger::{InMemoryKeyStore, KeyLedger, KeyStore};
pub use reward::{DisplayPosition, Reward, RewardPool};
pub use roll::{BuiltinRollStyle, OutcomeId, RollOutcome, RollSequenceBuilder, RollStyle, RollStyles};
pub use selection::{
    FixedBudgetCyclicDraw, NormalizedWeightedDraw, SelectionPolicy, WeightDimension,
    WeightedSelector,
};
