//! Per-player key balances
//!
//! Balances live in the host's profile store and are reached through
//! [`KeyStore`]. The ledger never caches a value between calls.

use crate::collaborators::{Messenger, PlayerId};
use dashmap::DashMap;
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// Appended to a crate id to form its balance key
pub const KEY_SUFFIX: &str = "_keys";

/// Replaced by the crate name in the not-enough-keys message
pub const CRATE_PLACEHOLDER: &str = "%crate%";

/// Integer profile storage
pub trait KeyStore: Send + Sync {
    /// Stored value, 0 when absent
    fn read(&self, player: PlayerId, key: &str) -> i64;

    fn write(&self, player: PlayerId, key: &str, value: i64);

    /// Read-modify-write returning the stored value.
    ///
    /// The default is a plain read then write. Stores shared across threads
    /// should override it with a single atomic step per (player, key).
    fn update(&self, player: PlayerId, key: &str, apply: &dyn Fn(i64) -> i64) -> i64 {
        let value = apply(self.read(player, key));
        self.write(player, key, value);
        value
    }
}

/// Process-local store, mostly for tests and single-server hosts
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    values: DashMap<(PlayerId, String), i64>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn read(&self, player: PlayerId, key: &str) -> i64 {
        self.values
            .get(&(player, key.to_string()))
            .map(|v| *v)
            .unwrap_or(0)
    }

    fn write(&self, player: PlayerId, key: &str, value: i64) {
        self.values.insert((player, key.to_string()), value);
    }

    fn update(&self, player: PlayerId, key: &str, apply: &dyn Fn(i64) -> i64) -> i64 {
        let mut entry = self.values.entry((player, key.to_string())).or_insert(0);
        *entry = apply(*entry);
        *entry
    }
}

/// Key balance for one crate
#[derive(Clone)]
pub struct KeyLedger {
    key: String,
    not_enough_keys: String,
    store: Arc<dyn KeyStore>,
    messenger: Arc<dyn Messenger>,
}

impl KeyLedger {
    /// `not_enough_keys` is the message template; `%crate%` is filled with
    /// `crate_name` once, here
    pub fn new(
        crate_id: &str,
        crate_name: &str,
        not_enough_keys: &str,
        store: Arc<dyn KeyStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            key: balance_key(crate_id),
            not_enough_keys: not_enough_keys.replace(CRATE_PLACEHOLDER, crate_name),
            store,
            messenger,
        }
    }

    /// Profile key the balance is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn balance(&self, player: PlayerId) -> i64 {
        self.store.read(player, &self.key)
    }

    /// Add `delta` (either sign) and return the new balance. No floor.
    pub fn adjust(&self, player: PlayerId, delta: i64) -> i64 {
        let balance = self
            .store
            .update(player, &self.key, &|current: i64| current.saturating_add(delta));
        tracing::debug!(key = %self.key, %player, delta, balance, "Adjusted keys");
        balance
    }

    /// False exactly when the balance is zero, after telling the player.
    ///
    /// A negative balance passes; only an exact zero is refused.
    pub fn test(&self, player: PlayerId) -> bool {
        if self.balance(player) == 0 {
            self.messenger.send(player, &self.not_enough_keys);
            return false;
        }

        true
    }

    /// Check and debit one key in a single store update.
    ///
    /// Refuses, and tells the player, when the balance is zero at the moment
    /// of the update. Two concurrent calls on a balance of 1 spend it once.
    pub fn try_spend(&self, player: PlayerId) -> bool {
        // Zero needs no write at all
        if self.balance(player) == 0 {
            self.messenger.send(player, &self.not_enough_keys);
            return false;
        }

        let spent = Cell::new(false);
        let balance = self.store.update(player, &self.key, &|current: i64| {
            if current == 0 {
                spent.set(false);
                return current;
            }
            spent.set(true);
            current.saturating_sub(1)
        });

        if !spent.get() {
            self.messenger.send(player, &self.not_enough_keys);
            return false;
        }

        tracing::debug!(key = %self.key, %player, balance, "Spent key");
        true
    }
}

impl fmt::Debug for KeyLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLedger").field("key", &self.key).finish()
    }
}

/// Profile key holding a crate's balances
pub fn balance_key(crate_id: &str) -> String {
    format!("{}{}", crate_id, KEY_SUFFIX)
}
