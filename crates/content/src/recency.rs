//! Recently shown items, per user.

use breathwise_core::recommendation::Category;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Item ids shown to one user, grouped by category, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyState {
    shown: BTreeMap<Category, Vec<String>>,
}

impl RecencyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, category: Category, id: &str) -> bool {
        self.shown
            .get(&category)
            .is_some_and(|ids| ids.iter().any(|i| i == id))
    }

    pub fn record(&mut self, category: Category, id: impl Into<String>) {
        let id = id.into();
        let ids = self.shown.entry(category).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Forget everything shown in a category.
    pub fn reset(&mut self, category: Category) {
        self.shown.remove(&category);
    }

    pub fn shown(&self, category: Category) -> &[String] {
        self.shown.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

struct Slot {
    state: RecencyState,
    last_used: Instant,
}

/// Per-user recency states with idle expiry.
pub struct RecencyStore {
    states: DashMap<String, Slot>,
    idle_ttl: Duration,
}

impl RecencyStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            idle_ttl,
        }
    }

    /// Run `f` against a user's state, creating it if needed. The entry is
    /// locked for the duration of `f`, so `f` must not block.
    pub fn with_state<R>(&self, user: &str, f: impl FnOnce(&mut RecencyState) -> R) -> R {
        let mut slot = self.states.entry(user.to_string()).or_insert_with(|| Slot {
            state: RecencyState::new(),
            last_used: Instant::now(),
        });
        slot.last_used = Instant::now();
        f(&mut slot.state)
    }

    /// Run a fallible `f` against a copy of a user's state. The copy
    /// replaces the stored state only when `f` succeeds, so a failed
    /// request leaves the user's history as it was.
    pub fn try_with_state<T, E>(
        &self,
        user: &str,
        f: impl FnOnce(&mut RecencyState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut slot = self.states.entry(user.to_string()).or_insert_with(|| Slot {
            state: RecencyState::new(),
            last_used: Instant::now(),
        });
        slot.last_used = Instant::now();
        let mut working = slot.state.clone();
        let out = f(&mut working)?;
        slot.state = working;
        Ok(out)
    }

    /// A copy of a user's state, if any.
    pub fn get(&self, user: &str) -> Option<RecencyState> {
        self.states.get(user).map(|s| s.state.clone())
    }

    /// Drop states idle for longer than the configured TTL.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.states.len();
        self.states
            .retain(|_, slot| now.duration_since(slot.last_used) < self.idle_ttl);
        let removed = before.saturating_sub(self.states.len());
        if removed > 0 {
            debug!(removed, "Swept idle recency states");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
