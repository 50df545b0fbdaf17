//! Token-keyed memory of who a returning visitor was and where they stood.

use std::collections::{BTreeMap, HashMap};

use hiroba_shared::position::Position;
use rand::Rng;

use super::name::{generate_name, spawn_position};

/// What the hub remembers about a token between connections.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub position: Position,
}

impl Identity {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            name: generate_name(rng),
            position: spawn_position(rng),
        }
    }
}

#[derive(Debug)]
struct Entry {
    identity: Identity,
    last_used: u64,
}

/// Identity memory bounded by a least-recently-used policy.
///
/// `capacity == 0` disables eviction. `recency` mirrors `entries`, keyed by
/// each entry's `last_used` tick, so the oldest token is always first.
#[derive(Debug)]
pub struct IdentityStore {
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    capacity: usize,
    tick: u64,
}

impl IdentityStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            capacity,
            tick: 0,
        }
    }

    /// Look up the identity behind `token`, creating and remembering a fresh
    /// one for unseen tokens. Anonymous callers get a fresh identity that is
    /// not remembered.
    pub fn resolve<R: Rng + ?Sized>(&mut self, token: Option<&str>, rng: &mut R) -> Identity {
        let Some(token) = token else {
            return Identity::random(rng);
        };

        if let Some(identity) = self.touch(token).map(|entry| entry.identity.clone()) {
            return identity;
        }

        let identity = Identity::random(rng);
        self.evict_if_full();
        let tick = self.next_tick();
        self.recency.insert(tick, token.to_string());
        self.entries.insert(
            token.to_string(),
            Entry {
                identity: identity.clone(),
                last_used: tick,
            },
        );
        identity
    }

    /// Store the last known position for a remembered token.
    ///
    /// Returns `false` if the token is unknown (never seen or evicted).
    pub fn remember(&mut self, token: &str, position: Position) -> bool {
        match self.touch(token) {
            Some(entry) => {
                entry.identity.position = Position::clamped(position.x, position.y);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, token: &str) -> Option<&Identity> {
        self.entries.get(token).map(|e| &e.identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Marks `token` as just used and returns its entry.
    fn touch(&mut self, token: &str) -> Option<&mut Entry> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(token)?;
        if let Some(key) = self.recency.remove(&entry.last_used) {
            self.recency.insert(tick, key);
        }
        entry.last_used = tick;
        Some(entry)
    }

    fn evict_if_full(&mut self) {
        if self.capacity == 0 || self.entries.len() < self.capacity {
            return;
        }
        if let Some((_, token)) = self.recency.pop_first() {
            self.entries.remove(&token);
            tracing::debug!("Evicted identity for least recently used token");
        }
    }
}
