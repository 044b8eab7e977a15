//! Session registry — one [`GameSession`] per external user id.
//!
//! The registry is the only structure shared between users. Each slot pairs
//! an async mutex around the session, which serialises that user's turns,
//! with a last-activity stamp used for idle eviction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use kokuhaku_core::{GameConfig, Roster};

use crate::session::GameSession;

/// A registered session and its activity stamp.
#[derive(Debug)]
pub struct SessionSlot {
    session: Mutex<GameSession>,
    last_active: parking_lot::Mutex<Instant>,
}

impl SessionSlot {
    fn new(session: GameSession) -> Self {
        Self {
            session: Mutex::new(session),
            last_active: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Wait for exclusive access to the session and mark it active.
    ///
    /// Holding the guard blocks eviction of this slot.
    pub async fn lock(&self) -> MutexGuard<'_, GameSession> {
        let guard = self.session.lock().await;
        self.touch();
        guard
    }

    /// Mark the slot active now.
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// When the slot was last used.
    #[must_use]
    pub fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active()) > timeout
    }
}

/// Concurrent map from user id to session slot.
#[derive(Debug)]
pub struct SessionRegistry {
    slots: DashMap<String, Arc<SessionSlot>>,
    config: Arc<GameConfig>,
    roster: Arc<Roster>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// Empty registry; new sessions share `config` and `roster`.
    #[must_use]
    pub fn new(config: Arc<GameConfig>, roster: Arc<Roster>) -> Self {
        let idle_timeout = Duration::from_secs(config.session.idle_timeout_secs);
        Self {
            slots: DashMap::new(),
            config,
            roster,
            idle_timeout,
        }
    }

    /// The slot for `user_id`, creating an uninitialized session if absent.
    pub fn get_or_create(&self, user_id: &str) -> Arc<SessionSlot> {
        let entry = self.slots.entry(user_id.to_string()).or_insert_with(|| {
            debug!(user = user_id, "Creating session");
            Arc::new(SessionSlot::new(GameSession::new(
                Arc::clone(&self.config),
                Arc::clone(&self.roster),
            )))
        });
        let slot = Arc::clone(entry.value());
        drop(entry);
        slot.touch();
        slot
    }

    /// The slot for `user_id`, if registered.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<Arc<SessionSlot>> {
        self.slots.get(user_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Unregister `user_id`. Holders of the slot keep their `Arc`.
    pub fn remove(&self, user_id: &str) -> Option<Arc<SessionSlot>> {
        self.slots.remove(user_id).map(|(_, slot)| slot)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remove sessions idle longer than the configured timeout.
    ///
    /// A slot whose session is locked (a turn in flight) is skipped even if
    /// its stamp is stale. Returns how many slots were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let timeout = self.idle_timeout;
        let candidates: Vec<String> = self
            .slots
            .iter()
            .filter(|entry| entry.value().is_idle(now, timeout))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for user_id in candidates {
            let removed = self.slots.remove_if(&user_id, |_, slot| {
                slot.is_idle(now, timeout) && slot.session.try_lock().is_ok()
            });
            if removed.is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            info!(evicted, remaining = self.slots.len(), "Evicted idle sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(GameConfig::default()), Arc::new(Roster::builtin()))
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let reg = registry();
        let a = reg.get_or_create("alice");
        let b = reg.get_or_create("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("bob").is_none());
    }

    #[test]
    fn remove_unregisters_the_slot() {
        let reg = registry();
        reg.get_or_create("alice");
        assert!(reg.remove("alice").is_some());
        assert!(reg.is_empty());
        assert!(reg.remove("alice").is_none());
    }

    #[test]
    fn fresh_sessions_are_not_evicted() {
        let reg = registry();
        reg.get_or_create("alice");
        assert_eq!(reg.evict_idle(Instant::now()), 0);
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let reg = registry();
        reg.get_or_create("alice");
        let later = Instant::now() + Duration::from_secs(3601);
        assert_eq!(reg.evict_idle(later), 1);
        assert!(reg.get("alice").is_none());
    }
}
