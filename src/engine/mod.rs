//! Open/reveal/finish orchestration for one crate
//!
//! ```text
//! open_with_key ─► KeyLedger::try_spend (check + debit) ─► Crate::roll
//!       │ (fail: message, abort)                                 │
//!       ▼                                                        ▼
//!   Aborted                              RevealAnimator::begin (host timing)
//!                                                                │
//!                         finish(outcome) ◄──────────────────────┘
//!                               │
//!                 RewardGranter::grant + sounds + fireworks
//! ```
//!
//! No lock is held while a collaborator runs, so an animator may call
//! [`CrateEngine::finish`] from inside `begin`.

pub mod pending;
pub mod state;

pub use pending::{PendingReveal, PendingReveals};
pub use state::{DrawEvent, DrawState};

use crate::collaborators::{ClickKind, Collaborators, Location, PlayerContext, PlayerId, RevealRequest};
use crate::config::{CratesConfig, LangConfig, Settings};
use crate::crate_definition::{Crate, KeySlotView};
use crate::errors::{ConfigurationError, CrateError, CrateResult};
use crate::ledger::KeyLedger;
use crate::roll::{OutcomeId, RollStyles};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// How an open attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenResult {
    /// A key was spent (or waived) and the reveal is running
    Revealing(OutcomeId),
    /// The key check failed; nothing changed
    Aborted,
}

impl OpenResult {
    pub fn outcome(&self) -> Option<OutcomeId> {
        match self {
            OpenResult::Revealing(id) => Some(*id),
            OpenResult::Aborted => None,
        }
    }
}

/// What a finish call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishStatus {
    Granted,
    /// Unknown or already finished outcome
    Ignored,
}

/// Crate plus the ledger bound to it; swapped as a unit on reload
#[derive(Clone)]
struct Binding {
    krate: Arc<Crate>,
    ledger: KeyLedger,
}

pub struct CrateEngine {
    binding: RwLock<Binding>,
    collaborators: Collaborators,
    no_key_velocity: f64,
    not_enough_keys: String,
    pending: PendingReveals,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl CrateEngine {
    pub fn new(
        krate: Crate,
        settings: &Settings,
        lang: &LangConfig,
        collaborators: Collaborators,
    ) -> Self {
        let binding = Self::bind(Arc::new(krate), &lang.not_enough_keys, &collaborators);
        Self {
            binding: RwLock::new(binding),
            collaborators,
            no_key_velocity: settings.no_key_velocity,
            not_enough_keys: lang.not_enough_keys.clone(),
            pending: PendingReveals::new(),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
        }
    }

    /// Replace the random source, e.g. with a seeded one
    pub fn with_rng(self, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
            ..self
        }
    }

    fn bind(krate: Arc<Crate>, not_enough_keys: &str, collaborators: &Collaborators) -> Binding {
        let ledger = KeyLedger::new(
            krate.id(),
            krate.name(),
            not_enough_keys,
            collaborators.store.clone(),
            collaborators.messenger.clone(),
        );
        Binding { krate, ledger }
    }

    fn binding(&self) -> Binding {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The crate as currently loaded
    pub fn crate_def(&self) -> Arc<Crate> {
        self.binding().krate
    }

    pub fn ledger(&self) -> KeyLedger {
        self.binding().ledger
    }

    /// Swap in a rebuilt crate. Running reveals finish with the old one.
    pub fn reload(&self, krate: Crate) -> CrateResult<()> {
        let current = self.crate_def();
        if krate.id() != current.id() {
            return Err(ConfigurationError::ValidationFailed(format!(
                "cannot reload crate '{}' as '{}'",
                current.id(),
                krate.id()
            ))
            .into());
        }

        let binding = Self::bind(Arc::new(krate), &self.not_enough_keys, &self.collaborators);
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) = binding;
        tracing::info!(crate_id = current.id(), "Reloaded crate");
        Ok(())
    }

    pub fn balance(&self, player: PlayerId) -> i64 {
        self.ledger().balance(player)
    }

    /// Give or take keys outside of an open
    pub fn adjust_keys(&self, player: PlayerId, delta: i64) -> i64 {
        self.ledger().adjust(player, delta)
    }

    /// Value of the `<id>_keys` placeholder
    pub fn keys_placeholder(&self, player: PlayerId) -> String {
        self.balance(player).to_string()
    }

    /// Player walked into a placed crate
    ///
    /// Without a key the player is pushed away from the crate at the
    /// configured speed.
    pub fn open_physical(
        &self,
        player: &PlayerContext,
        crate_location: &Location,
    ) -> CrateResult<OpenResult> {
        let binding = self.binding();
        let mut state = DrawState::Idle;

        if !binding.ledger.try_spend(player.id) {
            advance(&mut state, DrawEvent::KeysFailed)?;
            let velocity = player
                .location
                .offset_from(crate_location)
                .normalize()
                .scale(self.no_key_velocity);
            self.collaborators.effects.push(player.id, velocity);
            return Ok(OpenResult::Aborted);
        }

        self.roll_spent(&binding, state, player, crate_location.clone())
    }

    /// Open by spending one key; `location` defaults to the player's own
    pub fn open_with_key(
        &self,
        player: &PlayerContext,
        location: Option<&Location>,
    ) -> CrateResult<OpenResult> {
        let binding = self.binding();
        let mut state = DrawState::Idle;

        if !binding.ledger.try_spend(player.id) {
            advance(&mut state, DrawEvent::KeysFailed)?;
            return Ok(OpenResult::Aborted);
        }

        let location = location.unwrap_or(&player.location).clone();
        self.roll_spent(&binding, state, player, location)
    }

    /// Open without touching the ledger
    pub fn open_free(
        &self,
        player: &PlayerContext,
        location: Option<&Location>,
    ) -> CrateResult<OutcomeId> {
        let binding = self.binding();
        let mut state = DrawState::Idle;
        advance(&mut state, DrawEvent::KeysWaived)?;

        let location = location.unwrap_or(&player.location).clone();
        self.roll_and_reveal(&binding, state, player, location)
    }

    /// Roll after `try_spend` took the key; refunds it if the roll fails
    fn roll_spent(
        &self,
        binding: &Binding,
        mut state: DrawState,
        player: &PlayerContext,
        location: Location,
    ) -> CrateResult<OpenResult> {
        advance(&mut state, DrawEvent::KeysPassed)?;
        advance(&mut state, DrawEvent::Debited)?;

        match self.roll_and_reveal(binding, state, player, location) {
            Ok(id) => Ok(OpenResult::Revealing(id)),
            Err(err) => {
                // The draw never happened, so the key goes back
                binding.ledger.adjust(player.id, 1);
                tracing::warn!(
                    crate_id = binding.krate.id(),
                    player = %player.id,
                    error = %err,
                    "Roll failed after debit, key refunded"
                );
                Err(err)
            }
        }
    }

    fn roll_and_reveal(
        &self,
        binding: &Binding,
        mut state: DrawState,
        player: &PlayerContext,
        location: Location,
    ) -> CrateResult<OutcomeId> {
        let outcome = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            binding.krate.roll(&mut **rng)?
        };
        advance(&mut state, DrawEvent::Built)?;

        let id = outcome.id;
        self.pending.add(
            id,
            PendingReveal {
                player: player.clone(),
                location: location.clone(),
                reward: outcome.reward.clone(),
                source: binding.krate.clone(),
            },
        );
        advance(&mut state, DrawEvent::RevealStarted)?;

        tracing::debug!(
            crate_id = binding.krate.id(),
            outcome = %id,
            player = %player.id,
            style = %outcome.style,
            cosmetic = outcome.cosmetic.len(),
            "Starting reveal"
        );

        self.collaborators.animator.begin(RevealRequest {
            crate_id: binding.krate.id().to_string(),
            player: player.clone(),
            location,
            outcome,
        });

        Ok(id)
    }

    /// Complete a reveal: grant the reward and play finish effects.
    ///
    /// Only the first call for an outcome does anything.
    pub fn finish(&self, outcome: OutcomeId) -> FinishStatus {
        let Some(reveal) = self.pending.take(&outcome) else {
            tracing::debug!(%outcome, "Ignoring finish for unknown or finished outcome");
            return FinishStatus::Ignored;
        };

        let mut state = DrawState::Revealing;
        if let Err(err) = advance(&mut state, DrawEvent::Completed) {
            tracing::error!(%outcome, error = %err, "Finish out of order");
            return FinishStatus::Ignored;
        }

        let player = reveal.player.id;
        self.collaborators.granter.grant(player, &reveal.reward);

        let finish = reveal.source.finish();
        for sound in &finish.sounds {
            self.collaborators.effects.play_sound(sound, &reveal.location);
        }
        for firework in &finish.fireworks {
            self.collaborators.effects.launch_firework(firework, &reveal.location);
        }

        tracing::info!(
            crate_id = reveal.source.id(),
            %outcome,
            %player,
            reward = %reveal.reward.id,
            "Granted crate reward"
        );
        FinishStatus::Granted
    }

    /// Drop a pending reveal without granting anything
    pub fn abandon(&self, outcome: OutcomeId) -> bool {
        self.pending.take(&outcome).is_some()
    }

    /// Drop all of a player's pending reveals, e.g. when they quit.
    ///
    /// Keys spent on them are not refunded.
    pub fn abandon_player(&self, player: PlayerId) -> usize {
        let dropped = self.pending.remove_player(player);
        if dropped > 0 {
            tracing::debug!(%player, dropped, "Dropped pending reveals");
        }
        dropped
    }

    /// `Revealing` while the outcome waits for its finish call
    pub fn reveal_state(&self, outcome: &OutcomeId) -> Option<DrawState> {
        self.pending
            .is_pending(outcome)
            .then_some(DrawState::Revealing)
    }

    pub fn pending_reveals(&self) -> usize {
        self.pending.pending_count()
    }

    /// Show the pool; never touches balances
    pub fn preview(&self, player: PlayerId) {
        let krate = self.crate_def();
        self.collaborators
            .menus
            .show_preview(player, krate.preview_view());
    }

    /// Key menu slot for `player`
    pub fn key_slot(&self, player: PlayerId) -> KeySlotView {
        let binding = self.binding();
        binding.krate.key_slot_view(binding.ledger.balance(player))
    }

    /// Left click opens with a key, right click sends the crate's info lines
    pub fn click_key_slot(
        &self,
        player: &PlayerContext,
        click: ClickKind,
    ) -> CrateResult<Option<OpenResult>> {
        match click {
            ClickKind::Left => self.open_with_key(player, None).map(Some),
            ClickKind::Right => {
                let krate = self.crate_def();
                for line in &krate.keygui().right_click_message {
                    self.collaborators.messenger.send(player.id, line);
                }
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for CrateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrateEngine")
            .field("crate", &self.crate_def())
            .field("pending", &self.pending.pending_count())
            .finish()
    }
}

fn advance(state: &mut DrawState, event: DrawEvent) -> Result<(), CrateError> {
    let next = state.next(event)?;
    tracing::trace!(from = %state, %event, to = %next, "Draw transition");
    *state = next;
    Ok(())
}

/// Build one engine per configured crate, keyed by crate id
pub fn build_engines(
    config: &CratesConfig,
    styles: &RollStyles,
    collaborators: &Collaborators,
) -> CrateResult<HashMap<String, CrateEngine>> {
    config.validate()?;

    let mut engines = HashMap::with_capacity(config.crates.len());
    for crate_config in &config.crates {
        let krate = Crate::from_config(crate_config, styles)?;
        let engine = CrateEngine::new(krate, &config.settings, &config.lang, collaborators.clone());
        engines.insert(crate_config.id.clone(), engine);
    }

    tracing::info!(crates = engines.len(), "Loaded crates");
    Ok(engines)
}
