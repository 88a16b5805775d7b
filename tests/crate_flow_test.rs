//! End-to-end open/reveal/finish flows against recording collaborators

use keycrate::config::{FireworkConfig, SoundConfig};
use keycrate::{
    build_engines, ClickKind, Collaborators, CrateEngine, CratesConfig, Effects, FinishStatus,
    InMemoryKeyStore, KeyStore, Location, MenuRenderer, Messenger, OpenResult, PlayerContext,
    PlayerId, PreviewView, RevealAnimator, RevealRequest, Reward, RewardGranter, RollStyles,
    Vector,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, OnceLock};

const CRATES: &str = r#"
[settings]
no-key-velocity = 1.5

[lang]
not-enough-keys = "You need a key to open %crate%"

[[crates]]
id = "demo"
name = "Demo Crate"
roll = "scroll"

[[crates.finish.sounds]]
sound = "entity_firework_rocket_blast"

[[crates.finish.fireworks]]
type = "ball_large"
colors = ["gold"]

[[crates.rewards]]
id = "A"
weight = { actual = 50.0, display = 10.0 }
display = { row = 2, column = 3 }
payload = { item = "a" }

[[crates.rewards]]
id = "B"
weight = { actual = 50.0, display = 90.0 }
display = { row = 2, column = 5 }
payload = { item = "b" }

[[crates]]
id = "instant"
name = "Instant Crate"
roll = "instant"

[[crates.rewards]]
id = "coin"
weight = { actual = 100.0, display = 100.0 }
"#;

/// Store that records every balance change as (before, after)
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryKeyStore,
    changes: Mutex<Vec<(i64, i64)>>,
}

impl KeyStore for RecordingStore {
    fn read(&self, player: PlayerId, key: &str) -> i64 {
        self.inner.read(player, key)
    }

    fn write(&self, player: PlayerId, key: &str, value: i64) {
        let before = self.inner.read(player, key);
        self.changes.lock().unwrap().push((before, value));
        self.inner.write(player, key, value);
    }

    fn update(&self, player: PlayerId, key: &str, apply: &dyn Fn(i64) -> i64) -> i64 {
        let before = self.inner.read(player, key);
        let after = self.inner.update(player, key, apply);
        self.changes.lock().unwrap().push((before, after));
        after
    }
}

/// Store whose first `gated` reads wait for each other, so concurrent opens
/// both see the same balance before either debits
struct GatedStore {
    inner: InMemoryKeyStore,
    gated: AtomicUsize,
    barrier: Barrier,
}

impl GatedStore {
    fn new(readers: usize) -> Self {
        Self {
            inner: InMemoryKeyStore::new(),
            gated: AtomicUsize::new(readers),
            barrier: Barrier::new(readers),
        }
    }
}

impl KeyStore for GatedStore {
    fn read(&self, player: PlayerId, key: &str) -> i64 {
        let value = self.inner.read(player, key);
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait();
        }
        value
    }

    fn write(&self, player: PlayerId, key: &str, value: i64) {
        self.inner.write(player, key, value);
    }

    fn update(&self, player: PlayerId, key: &str, apply: &dyn Fn(i64) -> i64) -> i64 {
        self.inner.update(player, key, apply)
    }
}

#[derive(Default)]
struct Host {
    messages: Mutex<Vec<(PlayerId, String)>>,
    reveals: Mutex<Vec<RevealRequest>>,
    grants: Mutex<Vec<(PlayerId, Reward)>>,
    sounds: Mutex<Vec<Location>>,
    fireworks: Mutex<Vec<Location>>,
    pushes: Mutex<Vec<Vector>>,
    previews: Mutex<Vec<PreviewView>>,
    /// Balance changes seen when each reveal started
    changes_at_reveal: Mutex<Vec<usize>>,
    store: OnceLock<Arc<RecordingStore>>,
    /// Engine to finish synchronously from inside `begin`, if set
    finish_inline: OnceLock<Arc<CrateEngine>>,
}

impl Messenger for Host {
    fn send(&self, player: PlayerId, text: &str) {
        self.messages.lock().unwrap().push((player, text.to_string()));
    }
}

impl RevealAnimator for Host {
    fn begin(&self, request: RevealRequest) {
        if let Some(store) = self.store.get() {
            let seen = store.changes.lock().unwrap().len();
            self.changes_at_reveal.lock().unwrap().push(seen);
        }
        let id = request.outcome.id;
        self.reveals.lock().unwrap().push(request);

        if let Some(engine) = self.finish_inline.get() {
            assert_eq!(engine.finish(id), FinishStatus::Granted);
        }
    }
}

impl Effects for Host {
    fn play_sound(&self, _sound: &SoundConfig, location: &Location) {
        self.sounds.lock().unwrap().push(location.clone());
    }

    fn launch_firework(&self, _firework: &FireworkConfig, location: &Location) {
        self.fireworks.lock().unwrap().push(location.clone());
    }

    fn push(&self, _player: PlayerId, velocity: Vector) {
        self.pushes.lock().unwrap().push(velocity);
    }
}

impl RewardGranter for Host {
    fn grant(&self, player: PlayerId, reward: &Reward) {
        self.grants.lock().unwrap().push((player, reward.clone()));
    }
}

impl MenuRenderer for Host {
    fn show_preview(&self, _player: PlayerId, view: &PreviewView) {
        self.previews.lock().unwrap().push(view.clone());
    }
}

struct Fixture {
    demo: Arc<CrateEngine>,
    instant: Arc<CrateEngine>,
    host: Arc<Host>,
    store: Arc<RecordingStore>,
}

fn fixture(seed: u64) -> Fixture {
    let host = Arc::new(Host::default());
    let store = Arc::new(RecordingStore::default());
    let _ = host.store.set(store.clone());

    let collaborators = Collaborators {
        store: store.clone(),
        messenger: host.clone(),
        animator: host.clone(),
        effects: host.clone(),
        granter: host.clone(),
        menus: host.clone(),
    };

    let config = CratesConfig::from_toml_str(CRATES).expect("config parses");
    let mut engines = build_engines(&config, &RollStyles::with_builtins(), &collaborators)
        .expect("engines build");

    let demo = engines.remove("demo").unwrap().with_rng(StdRng::seed_from_u64(seed));
    let instant = engines
        .remove("instant")
        .unwrap()
        .with_rng(StdRng::seed_from_u64(seed + 1));

    Fixture {
        demo: Arc::new(demo),
        instant: Arc::new(instant),
        host,
        store,
    }
}

fn player() -> PlayerContext {
    PlayerContext {
        id: PlayerId::new_random(),
        name: "steve".to_string(),
        location: Location::new("world", 5.0, 70.0, -2.0),
    }
}

#[test]
fn test_single_key_scenario() {
    let f = fixture(1);
    let steve = player();
    let crate_loc = Location::new("world", 0.0, 70.0, 0.0);
    f.demo.adjust_keys(steve.id, 1);

    let first = f.demo.open_with_key(&steve, Some(&crate_loc)).unwrap();
    let id = first.outcome().expect("first open reveals");
    assert_eq!(f.demo.balance(steve.id), 0);

    assert_eq!(f.demo.finish(id), FinishStatus::Granted);

    let grants = f.host.grants.lock().unwrap().clone();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].0, steve.id);
    assert!(grants[0].1.id == "A" || grants[0].1.id == "B");
    assert_eq!(grants[0].1.payload["item"], grants[0].1.id.to_lowercase());
    assert_eq!(*f.host.sounds.lock().unwrap(), vec![crate_loc.clone()]);
    assert_eq!(*f.host.fireworks.lock().unwrap(), vec![crate_loc.clone()]);

    // Second open: no key left
    let changes_before = f.store.changes.lock().unwrap().len();
    let second = f.demo.open_with_key(&steve, Some(&crate_loc)).unwrap();
    assert_eq!(second, OpenResult::Aborted);
    assert_eq!(f.demo.balance(steve.id), 0);
    assert_eq!(f.store.changes.lock().unwrap().len(), changes_before);
    assert_eq!(f.host.reveals.lock().unwrap().len(), 1);

    let messages = f.host.messages.lock().unwrap();
    assert_eq!(
        *messages,
        vec![(steve.id, "You need a key to open Demo Crate".to_string())]
    );
}

#[test]
fn test_zero_balance_never_adjusts() {
    let f = fixture(2);
    let steve = player();

    for _ in 0..5 {
        assert_eq!(f.demo.open_with_key(&steve, None).unwrap(), OpenResult::Aborted);
    }
    assert!(f.store.changes.lock().unwrap().is_empty());
    assert!(f.host.reveals.lock().unwrap().is_empty());
    assert_eq!(f.host.messages.lock().unwrap().len(), 5);
}

#[test]
fn test_one_debit_before_outcome() {
    let f = fixture(3);
    let steve = player();
    f.demo.adjust_keys(steve.id, 3);
    f.store.changes.lock().unwrap().clear();

    f.demo.open_with_key(&steve, None).unwrap();

    assert_eq!(*f.store.changes.lock().unwrap(), vec![(3, 2)]);
    // The debit was already recorded when the animator got the outcome
    assert_eq!(*f.host.changes_at_reveal.lock().unwrap(), vec![1]);
}

#[test]
fn test_negative_balance_still_opens() {
    let f = fixture(4);
    let steve = player();
    f.demo.adjust_keys(steve.id, -2);

    let result = f.demo.open_with_key(&steve, None).unwrap();
    assert!(matches!(result, OpenResult::Revealing(_)));
    assert_eq!(f.demo.balance(steve.id), -3);
}

#[test]
fn test_double_finish_grants_once() {
    let f = fixture(5);
    let steve = player();
    f.demo.adjust_keys(steve.id, 1);

    let id = f.demo.open_with_key(&steve, None).unwrap().outcome().unwrap();

    assert_eq!(f.demo.finish(id), FinishStatus::Granted);
    assert_eq!(f.demo.finish(id), FinishStatus::Ignored);
    assert_eq!(f.host.grants.lock().unwrap().len(), 1);
    assert_eq!(f.host.sounds.lock().unwrap().len(), 1);
    assert_eq!(f.host.fireworks.lock().unwrap().len(), 1);
    assert_eq!(f.demo.reveal_state(&id), None);
}

#[test]
fn test_finish_on_other_engine_is_ignored() {
    let f = fixture(6);
    let steve = player();
    f.demo.adjust_keys(steve.id, 1);

    let id = f.demo.open_with_key(&steve, None).unwrap().outcome().unwrap();
    assert_eq!(f.instant.finish(id), FinishStatus::Ignored);
    assert_eq!(f.demo.finish(id), FinishStatus::Granted);
}

#[test]
fn test_cosmetic_sequence_reaches_animator() {
    let f = fixture(7);
    let steve = player();
    f.demo.adjust_keys(steve.id, 1);

    f.demo.open_with_key(&steve, None).unwrap();

    let reveals = f.host.reveals.lock().unwrap();
    let request = &reveals[0];
    assert_eq!(request.crate_id, "demo");
    assert_eq!(request.outcome.style, "scroll");
    assert_eq!(request.outcome.cosmetic.len(), 39);
    assert!(request
        .outcome
        .cosmetic
        .iter()
        .all(|r| r.id == "A" || r.id == "B"));
}

#[test]
fn test_preview_never_touches_balance() {
    let f = fixture(8);
    let steve = player();
    f.demo.adjust_keys(steve.id, 2);
    f.store.changes.lock().unwrap().clear();

    for _ in 0..10 {
        f.demo.preview(steve.id);
    }

    assert_eq!(f.demo.balance(steve.id), 2);
    assert!(f.store.changes.lock().unwrap().is_empty());
    assert!(f.host.reveals.lock().unwrap().is_empty());

    let previews = f.host.previews.lock().unwrap();
    assert_eq!(previews.len(), 10);
    let ids: Vec<&str> = previews[0].entries.iter().map(|e| e.reward_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[test]
fn test_animator_can_finish_inline() {
    let f = fixture(9);
    let _ = f.host.finish_inline.set(f.instant.clone());
    let steve = player();
    f.instant.adjust_keys(steve.id, 1);

    let id = f.instant.open_with_key(&steve, None).unwrap().outcome().unwrap();

    assert!(f.host.reveals.lock().unwrap()[0].outcome.cosmetic.is_empty());
    assert_eq!(f.host.grants.lock().unwrap().len(), 1);
    assert_eq!(f.instant.finish(id), FinishStatus::Ignored);
    assert_eq!(f.instant.pending_reveals(), 0);
}

#[test]
fn test_reload_mid_reveal_keeps_outcome() {
    let f = fixture(10);
    let steve = player();
    f.demo.adjust_keys(steve.id, 1);

    let id = f.demo.open_with_key(&steve, None).unwrap().outcome().unwrap();
    let drawn = f.host.reveals.lock().unwrap()[0].outcome.reward.id.clone();

    let mut config = CratesConfig::from_toml_str(CRATES).unwrap();
    let demo = config.crates.iter_mut().find(|c| c.id == "demo").unwrap();
    demo.rewards.retain(|r| r.id == "C");
    demo.finish.sounds.clear();
    let reloaded = keycrate::Crate::from_config(demo, &RollStyles::with_builtins()).unwrap();
    f.demo.reload(reloaded).unwrap();
    assert!(f.demo.crate_def().pool().is_empty());

    assert_eq!(f.demo.finish(id), FinishStatus::Granted);
    assert_eq!(f.host.grants.lock().unwrap()[0].1.id, drawn);
    // Effects come from the crate as it was at open time
    assert_eq!(f.host.sounds.lock().unwrap().len(), 1);
}

#[test]
fn test_key_menu_and_placeholder() {
    let f = fixture(11);
    let steve = player();
    f.demo.adjust_keys(steve.id, 4);

    let slot = f.demo.key_slot(steve.id);
    assert_eq!(slot.lore, vec!["Keys: 4"]);
    assert_eq!(f.demo.crate_def().keys_placeholder_id(), "demo_keys");
    assert_eq!(f.demo.keys_placeholder(steve.id), "4");

    let opened = f.demo.click_key_slot(&steve, ClickKind::Left).unwrap();
    assert!(matches!(opened, Some(OpenResult::Revealing(_))));
    assert_eq!(f.demo.key_slot(steve.id).lore, vec!["Keys: 3"]);
}

#[test]
fn test_bump_without_key_pushes_away() {
    let f = fixture(12);
    let steve = PlayerContext {
        location: Location::new("world", 0.0, 70.0, 2.0),
        ..player()
    };
    let crate_loc = Location::new("world", 0.0, 70.0, 0.0);

    assert_eq!(f.demo.open_physical(&steve, &crate_loc).unwrap(), OpenResult::Aborted);
    assert_eq!(*f.host.pushes.lock().unwrap(), vec![Vector::new(0.0, 0.0, 1.5)]);
    assert!(f.store.changes.lock().unwrap().is_empty());
}

#[test]
fn test_unknown_roll_style_fails_whole_load() {
    let host = Arc::new(Host::default());
    let collaborators = Collaborators {
        store: Arc::new(InMemoryKeyStore::new()),
        messenger: host.clone(),
        animator: host.clone(),
        effects: host.clone(),
        granter: host.clone(),
        menus: host.clone(),
    };
    let config = CratesConfig::from_toml_str(&CRATES.replace("\"instant\"\n", "\"wheel\"\n"))
        .expect("syntax still valid");

    let err = build_engines(&config, &RollStyles::with_builtins(), &collaborators).unwrap_err();
    assert!(err.to_string().contains("wheel"));
}

#[test]
fn test_concurrent_opens_spend_one_key_once() {
    let host = Arc::new(Host::default());
    let store = Arc::new(GatedStore::new(2));
    let collaborators = Collaborators {
        store: store.clone(),
        messenger: host.clone(),
        animator: host.clone(),
        effects: host.clone(),
        granter: host.clone(),
        menus: host.clone(),
    };
    let config = CratesConfig::from_toml_str(CRATES).unwrap();
    let engine = build_engines(&config, &RollStyles::with_builtins(), &collaborators)
        .unwrap()
        .remove("demo")
        .unwrap()
        .with_rng(StdRng::seed_from_u64(13));

    let steve = player();
    engine.adjust_keys(steve.id, 1);

    let results: Vec<OpenResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| engine.open_with_key(&steve, None).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let revealed = results
        .iter()
        .filter(|r| matches!(r, OpenResult::Revealing(_)))
        .count();
    assert_eq!(revealed, 1);
    assert_eq!(engine.balance(steve.id), 0);
    assert_eq!(host.reveals.lock().unwrap().len(), 1);
    assert_eq!(host.messages.lock().unwrap().len(), 1);
}
