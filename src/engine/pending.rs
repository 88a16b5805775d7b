use crate::collaborators::{Location, PlayerContext, PlayerId};
use crate::crate_definition::Crate;
use crate::reward::Reward;
use crate::roll::OutcomeId;
use dashmap::DashMap;
use std::sync::Arc;

/// A reveal handed to the animator and not finished yet
#[derive(Debug, Clone)]
pub struct PendingReveal {
    pub player: PlayerContext,
    pub location: Location,
    pub reward: Reward,
    /// Crate as it was when the draw happened, so a reload mid-reveal
    /// still finishes with the original effects
    pub source: Arc<Crate>,
}

/// Reveals waiting for their finish call
///
/// Taking an entry removes it, which is what makes a second finish for the
/// same outcome a no-op.
#[derive(Debug, Default)]
pub struct PendingReveals {
    pending: DashMap<OutcomeId, PendingReveal>,
}

impl PendingReveals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: OutcomeId, reveal: PendingReveal) {
        self.pending.insert(id, reveal);
    }

    /// Remove and return the reveal, if still pending
    pub fn take(&self, id: &OutcomeId) -> Option<PendingReveal> {
        self.pending.remove(id).map(|(_, reveal)| reveal)
    }

    /// Drop every reveal belonging to `player`, returning how many went
    pub fn remove_player(&self, player: PlayerId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, reveal| reveal.player.id != player);
        before.saturating_sub(self.pending.len())
    }

    pub fn is_pending(&self, id: &OutcomeId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
