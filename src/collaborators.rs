//! Host collaborator interfaces
//!
//! The engine never renders, plays effects or persists anything itself. Every
//! outward action goes through one of these traits so the host plugin (or a
//! test double) decides how it happens.

use crate::config::{FireworkConfig, SoundConfig};
use crate::crate_definition::PreviewView;
use crate::ledger::KeyStore;
use crate::reward::Reward;
use crate::roll::RollOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable player identity (the host's profile UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plain 3D vector used for repel velocities
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return Self::default();
        }
        self.scale(1.0 / len)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// A point in a named world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Vector pointing from `origin` to this location
    pub fn offset_from(&self, origin: &Location) -> Vector {
        Vector::new(self.x - origin.x, self.y - origin.y, self.z - origin.z)
    }
}

/// Online player as seen by the engine at the moment of an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerContext {
    pub id: PlayerId,
    pub name: String,
    pub location: Location,
}

/// Everything an animator needs to play one reveal
#[derive(Debug, Clone)]
pub struct RevealRequest {
    pub crate_id: String,
    pub player: PlayerContext,
    pub location: Location,
    pub outcome: RollOutcome,
}

/// Mouse button used on a menu slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    Left,
    Right,
}

/// Delivers formatted text to a player
pub trait Messenger: Send + Sync {
    fn send(&self, player: PlayerId, text: &str);
}

/// Plays a reveal and later calls [`crate::engine::CrateEngine::finish`]
///
/// Timing belongs to the animator. It may call `finish` from inside `begin`
/// (instant reveals), after a delay, or never (player left, server stopped).
pub trait RevealAnimator: Send + Sync {
    fn begin(&self, request: RevealRequest);
}

/// Sounds, fireworks and player knock-back
pub trait Effects: Send + Sync {
    fn play_sound(&self, sound: &SoundConfig, location: &Location);

    fn launch_firework(&self, firework: &FireworkConfig, location: &Location);

    /// Set the player's velocity
    fn push(&self, player: PlayerId, velocity: Vector);
}

/// Hands a reward payload to a player
pub trait RewardGranter: Send + Sync {
    fn grant(&self, player: PlayerId, reward: &Reward);
}

/// Opens read-only menus
pub trait MenuRenderer: Send + Sync {
    fn show_preview(&self, player: PlayerId, view: &PreviewView);
}

/// The full set of collaborators one engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KeyStore>,
    pub messenger: Arc<dyn Messenger>,
    pub animator: Arc<dyn RevealAnimator>,
    pub effects: Arc<dyn Effects>,
    pub granter: Arc<dyn RewardGranter>,
    pub menus: Arc<dyn MenuRenderer>,
}
