//! Lifecycle of a single draw

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a draw is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawState {
    Idle,
    KeyChecked,
    KeyDebited,
    RollBuilt,
    Revealing,
    Finished,
    Aborted,
}

/// What happened to move a draw forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawEvent {
    KeysPassed,
    KeysFailed,
    /// Opened without a key, e.g. by an admin
    KeysWaived,
    Debited,
    Built,
    RevealStarted,
    Completed,
}

impl DrawState {
    /// Next state after `event`, or an error for an illegal pair
    pub fn next(self, event: DrawEvent) -> Result<DrawState, EngineError> {
        use DrawEvent::*;
        use DrawState::*;

        match (self, event) {
            (Idle, KeysPassed) => Ok(KeyChecked),
            (Idle, KeysFailed) | (KeyChecked, KeysFailed) => Ok(Aborted),
            (Idle, KeysWaived) => Ok(KeyDebited),
            (KeyChecked, Debited) => Ok(KeyDebited),
            (KeyDebited, Built) => Ok(RollBuilt),
            (RollBuilt, RevealStarted) => Ok(Revealing),
            (Revealing, Completed) => Ok(Finished),
            (from, event) => Err(EngineError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DrawState::Finished | DrawState::Aborted)
    }
}

impl fmt::Display for DrawState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawState::Idle => "idle",
            DrawState::KeyChecked => "key_checked",
            DrawState::KeyDebited => "key_debited",
            DrawState::RollBuilt => "roll_built",
            DrawState::Revealing => "revealing",
            DrawState::Finished => "finished",
            DrawState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

impl fmt::Display for DrawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawEvent::KeysPassed => "keys_passed",
            DrawEvent::KeysFailed => "keys_failed",
            DrawEvent::KeysWaived => "keys_waived",
            DrawEvent::Debited => "debited",
            DrawEvent::Built => "built",
            DrawEvent::RevealStarted => "reveal_started",
            DrawEvent::Completed => "completed",
        };
        f.write_str(name)
    }
}
