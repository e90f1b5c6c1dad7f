//! Conversation registry
//!
//! In-process lookup and lifecycle manager for conversations. Each entry sits
//! behind its own async mutex so messages for one key are serialized while
//! different keys proceed independently. The map itself is a `DashMap`, so a
//! lookup never waits on another key's handler.
//!
//! Eviction marks the entry as retired while holding its lock before the
//! entry leaves the map. A caller that raced the eviction and locks a retired
//! entry retries and gets a fresh conversation instead of a half-deleted one.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::utils::errors::Result;
use crate::utils::logging;
use super::context::{Conversation, ConversationKey, ConversationSnapshot};
use super::machine::ConversationState;

/// Default idle timeout
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: i64 = 30 * 60;

#[derive(Debug)]
struct Slot {
    conversation: Conversation,
    retired: bool,
}

type SharedSlot = Arc<Mutex<Slot>>;

/// Exclusive access to one conversation.
///
/// Holding the guard serializes every other caller for the same key.
pub struct ConversationGuard {
    slot: SharedSlot,
    guard: OwnedMutexGuard<Slot>,
}

impl Deref for ConversationGuard {
    type Target = Conversation;

    fn deref(&self) -> &Self::Target {
        &self.guard.conversation
    }
}

impl DerefMut for ConversationGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.conversation
    }
}

impl std::fmt::Debug for ConversationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationGuard")
            .field("conversation", &self.guard.conversation.summary())
            .finish()
    }
}

/// Aggregate counts for operational visibility.
///
/// Conversations held by an in-flight handler count towards `total`,
/// `by_tenant` and `busy`, but not `by_state`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub busy: usize,
    pub by_tenant: BTreeMap<String, usize>,
    pub by_state: BTreeMap<ConversationState, usize>,
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    pub remaining: usize,
    /// Entries skipped because a handler held them
    pub busy: usize,
}

/// Lookup and lifecycle manager for conversations
#[derive(Debug)]
pub struct ConversationRegistry {
    entries: DashMap<ConversationKey, SharedSlot>,
    timeout: Duration,
}

impl ConversationRegistry {
    /// Create a registry with the given idle timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the conversation for the key, creating an `Idle` one if absent.
    ///
    /// An existing conversation idle beyond the timeout is reset in place
    /// before being returned.
    pub async fn get_or_create(&self, tenant_id: &str, user_id: &str) -> ConversationGuard {
        let key = ConversationKey::new(tenant_id, user_id);

        loop {
            let slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| {
                    debug!(tenant_id = tenant_id, user_id = user_id, "Creating conversation");
                    Arc::new(Mutex::new(Slot {
                        conversation: Conversation::new(tenant_id, user_id),
                        retired: false,
                    }))
                })
                .clone();

            let mut guard = slot.clone().lock_owned().await;
            if guard.retired {
                continue;
            }

            if guard.conversation.is_expired(self.timeout) {
                info!(
                    tenant_id = tenant_id,
                    user_id = user_id,
                    state = %guard.conversation.state(),
                    "Conversation expired, resetting"
                );
                guard.conversation.reset_expired();
            }

            return ConversationGuard { slot, guard };
        }
    }

    /// Return the conversation for the key without creating one.
    ///
    /// Expired conversations are treated as absent.
    pub async fn get(&self, tenant_id: &str, user_id: &str) -> Option<ConversationGuard> {
        let key = ConversationKey::new(tenant_id, user_id);

        loop {
            let slot = self.entries.get(&key).map(|entry| entry.value().clone())?;

            let guard = slot.clone().lock_owned().await;
            if guard.retired {
                continue;
            }
            if guard.conversation.is_expired(self.timeout) {
                return None;
            }

            return Some(ConversationGuard { slot, guard });
        }
    }

    /// Delete the conversation for the key. Returns whether one existed.
    ///
    /// Waits for any handler holding the key; the entry stays in the map
    /// until then so no second conversation can be created for it. Must not
    /// be called while holding a guard for the same key; use
    /// [`ConversationRegistry::end_session`] from inside a handler.
    pub async fn remove(&self, tenant_id: &str, user_id: &str) -> bool {
        let key = ConversationKey::new(tenant_id, user_id);

        loop {
            let Some(slot) = self.entries.get(&key).map(|entry| entry.value().clone()) else {
                return false;
            };

            let mut entry = slot.lock().await;
            if entry.retired {
                continue;
            }
            entry.retired = true;
            self.entries.remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));

            debug!(tenant_id = tenant_id, user_id = user_id, "Conversation removed");
            return true;
        }
    }

    /// Delete the conversation held by `guard`
    pub fn end_session(&self, mut guard: ConversationGuard) {
        guard.guard.retired = true;
        let key = guard.guard.conversation.key().clone();
        self.entries.remove_if(&key, |_, slot| Arc::ptr_eq(slot, &guard.slot));
        debug!(tenant_id = %key.tenant_id, user_id = %key.user_id, "Session ended");
    }

    /// Evict every entry idle beyond the timeout
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Sweep against an explicit clock.
    ///
    /// Entries whose lock is held by an in-flight handler are skipped; they
    /// are active by definition.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let timeout = self.timeout;

        self.entries.retain(|_, slot| match slot.try_lock() {
            Ok(mut entry) => {
                if entry.conversation.is_expired_at(now, timeout) {
                    entry.retired = true;
                    report.evicted += 1;
                    false
                } else {
                    true
                }
            }
            Err(_) => {
                report.busy += 1;
                true
            }
        });

        report.remaining = self.entries.len();
        logging::log_sweep(report.evicted, report.remaining, report.busy);
        report
    }

    /// Aggregate counts by tenant and by state.
    ///
    /// Never waits on a handler: entries whose lock is held are counted as busy.
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();

        for (key, slot) in self.keyed_slots() {
            let state = match slot.try_lock() {
                Ok(entry) if entry.retired => continue,
                Ok(entry) => Some(entry.conversation.state()),
                Err(_) => None,
            };

            stats.total += 1;
            *stats.by_tenant.entry(key.tenant_id).or_insert(0) += 1;
            match state {
                Some(state) => *stats.by_state.entry(state).or_insert(0) += 1,
                None => stats.busy += 1,
            }
        }

        stats
    }

    /// Export every live conversation that no handler currently holds.
    ///
    /// Busy conversations are mid-message and are skipped.
    pub fn export_all(&self) -> Vec<ConversationSnapshot> {
        let mut snapshots = Vec::with_capacity(self.entries.len());
        let mut busy = 0;

        for slot in self.slots() {
            match slot.try_lock() {
                Ok(entry) if !entry.retired => snapshots.push(entry.conversation.export()),
                Ok(_) => {}
                Err(_) => busy += 1,
            }
        }

        if busy > 0 {
            warn!(busy = busy, exported = snapshots.len(), "Skipped busy conversations during export");
        }
        snapshots
    }

    /// Insert a conversation rebuilt from a snapshot, replacing any existing entry.
    ///
    /// Expired snapshots are skipped and reported as `Ok(false)`.
    pub async fn import(&self, snapshot: ConversationSnapshot) -> Result<bool> {
        let conversation = Conversation::import(snapshot)?;
        if conversation.is_expired(self.timeout) {
            debug!(key = %conversation.key(), "Skipping expired snapshot");
            return Ok(false);
        }

        let key = conversation.key().clone();
        let slot = Arc::new(Mutex::new(Slot {
            conversation,
            retired: false,
        }));

        loop {
            let previous = self.entries.get(&key).map(|entry| entry.value().clone());
            match previous {
                // Only the holder of a live slot's lock may take it out of the map
                Some(previous) => {
                    let mut entry = previous.lock().await;
                    if entry.retired {
                        continue;
                    }
                    entry.retired = true;
                    self.entries.insert(key, slot);
                    return Ok(true);
                }
                None => {
                    if let Entry::Vacant(vacant) = self.entries.entry(key.clone()) {
                        vacant.insert(slot);
                        return Ok(true);
                    }
                }
            }
        }
    }

    fn slots(&self) -> Vec<SharedSlot> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    fn keyed_slots(&self) -> Vec<(ConversationKey, SharedSlot)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECONDS))
    }
}

/// Registry owner with a background sweep task
#[derive(Debug)]
pub struct RegistryManager {
    registry: Arc<ConversationRegistry>,
    sweep_interval: StdDuration,
    sweep_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RegistryManager {
    pub fn new(registry: Arc<ConversationRegistry>, sweep_interval: StdDuration) -> Self {
        Self {
            registry,
            sweep_interval,
            sweep_handle: None,
        }
    }

    /// Start the periodic sweep task
    pub fn start_sweep(&mut self) {
        if self.sweep_handle.is_some() {
            warn!("Sweep task is already running");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let interval = self.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let report = registry.sweep();
                if report.busy > 0 && report.remaining == report.busy {
                    debug!(busy = report.busy, "Every remaining conversation was busy during sweep");
                }
            }
        });

        self.sweep_handle = Some(handle);
        info!("Started conversation sweep task with interval {:?}", self.sweep_interval);
    }

    /// Stop the periodic sweep task
    pub fn stop_sweep(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
            info!("Stopped conversation sweep task");
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep_handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Get reference to the registry
    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }
}

impl Drop for RegistryManager {
    fn drop(&mut self) {
        self.stop_sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::context::TransitionData;

    fn snapshot_idle_since(tenant: &str, user: &str, last_activity: DateTime<Utc>) -> ConversationSnapshot {
        let mut snapshot = Conversation::new(tenant, user).export();
        snapshot.last_activity = last_activity;
        snapshot
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_conversation() {
        let registry = ConversationRegistry::default();

        {
            let mut conversation = registry.get_or_create("shop", "1").await;
            conversation.transition(ConversationState::Greeting, TransitionData::none()).unwrap();
        }

        let conversation = registry.get_or_create("shop", "1").await;
        assert_eq!(conversation.state(), ConversationState::Greeting);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_same_user_different_tenants_are_distinct() {
        let registry = ConversationRegistry::default();
        drop(registry.get_or_create("shop-a", "1").await);
        drop(registry.get_or_create("shop-b", "1").await);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_conversation_reset_in_place() {
        let registry = ConversationRegistry::new(Duration::minutes(30));
        let mut snapshot = snapshot_idle_since("shop", "1", Utc::now());
        snapshot.state = ConversationState::Support;
        registry.import(snapshot).await.unwrap();

        // Age the entry past the timeout
        {
            let slot = registry.slots().pop().unwrap();
            let mut entry = slot.lock().await;
            let mut aged = entry.conversation.export();
            aged.last_activity = Utc::now() - Duration::minutes(31);
            entry.conversation = Conversation::import(aged).unwrap();
        }

        let conversation = registry.get_or_create("shop", "1").await;
        assert_eq!(conversation.state(), ConversationState::Idle);
        assert!(conversation.transition_log().last().unwrap().forced);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = ConversationRegistry::default();
        assert!(registry.get("shop", "1").await.is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = ConversationRegistry::default();
        drop(registry.get_or_create("shop", "1").await);

        assert!(registry.remove("shop", "1").await);
        assert!(!registry.remove("shop", "1").await);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_end_session_from_guard() {
        let registry = ConversationRegistry::default();
        let guard = registry.get_or_create("shop", "1").await;
        registry.end_session(guard);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_with_zero_timeout_evicts_older_entries() {
        let registry = ConversationRegistry::new(Duration::zero());
        let now = Utc::now();

        let mut old = Conversation::new("shop", "old").export();
        old.last_activity = now - Duration::milliseconds(1);
        let mut current = Conversation::new("shop", "current").export();
        current.last_activity = now;

        // Imports bypass the zero timeout check by inserting directly
        for snapshot in [old, current] {
            let conversation = Conversation::import(snapshot).unwrap();
            registry.entries.insert(
                conversation.key().clone(),
                Arc::new(Mutex::new(Slot { conversation, retired: false })),
            );
        }

        let report = registry.sweep_at(now);
        assert_eq!(report.evicted, 1);
        assert_eq!(report.remaining, 1);
        assert!(registry.entries.contains_key(&ConversationKey::new("shop", "current")));
    }

    #[tokio::test]
    async fn test_sweep_skips_busy_entries() {
        let registry = ConversationRegistry::default();
        let guard = registry.get_or_create("shop", "1").await;

        let report = registry.sweep_at(Utc::now() + Duration::hours(1));
        assert_eq!(report.evicted, 0);
        assert_eq!(report.busy, 1);
        drop(guard);

        let report = registry.sweep_at(Utc::now() + Duration::hours(1));
        assert_eq!(report.evicted, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_after_eviction_creates_fresh_conversation() {
        let registry = ConversationRegistry::default();
        {
            let mut conversation = registry.get_or_create("shop", "1").await;
            conversation.transition(ConversationState::Support, TransitionData::none()).unwrap();
        }

        // Hold a reference to the old slot as a racing caller would
        let stale = registry.slots().pop().unwrap();
        registry.sweep_at(Utc::now() + Duration::hours(1));
        assert!(stale.lock().await.retired);

        let conversation = registry.get_or_create("shop", "1").await;
        assert_eq!(conversation.state(), ConversationState::Idle);
        assert!(conversation.transition_log().is_empty());
    }

    #[tokio::test]
    async fn test_stats_group_by_tenant_and_state() {
        let registry = ConversationRegistry::default();
        for (tenant, user) in [("a", "1"), ("a", "2"), ("b", "1")] {
            drop(registry.get_or_create(tenant, user).await);
        }
        {
            let mut conversation = registry.get_or_create("a", "2").await;
            conversation.transition(ConversationState::Support, TransitionData::none()).unwrap();
        }

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_tenant.get("a"), Some(&2));
        assert_eq!(stats.by_tenant.get("b"), Some(&1));
        assert_eq!(stats.by_state.get(&ConversationState::Idle), Some(&2));
        assert_eq!(stats.by_state.get(&ConversationState::Support), Some(&1));
    }

    #[tokio::test]
    async fn test_export_and_import_all() {
        let registry = ConversationRegistry::default();
        drop(registry.get_or_create("shop", "1").await);
        drop(registry.get_or_create("shop", "2").await);

        let snapshots = registry.export_all();
        assert_eq!(snapshots.len(), 2);

        let restored = ConversationRegistry::default();
        for snapshot in snapshots {
            assert!(restored.import(snapshot).await.unwrap());
        }
        assert_eq!(restored.len(), 2);

        let stale = snapshot_idle_since("shop", "3", Utc::now() - Duration::hours(2));
        assert!(!restored.import(stale).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_waits_for_holder_and_blocks_new_guards() {
        let registry = Arc::new(ConversationRegistry::default());
        let mut held = registry.get_or_create("shop", "1").await;
        held.transition(ConversationState::Support, TransitionData::none()).unwrap();

        let remover = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.remove("shop", "1").await })
        };
        tokio::task::yield_now().await;

        // The key is still held, so no second guard may be handed out
        let second = tokio::time::timeout(StdDuration::from_millis(200), registry.get_or_create("shop", "1")).await;
        assert!(second.is_err());
        assert_eq!(registry.len(), 1);
        assert!(!remover.is_finished());

        drop(held);
        assert!(remover.await.unwrap());

        let conversation = registry.get_or_create("shop", "1").await;
        assert_eq!(conversation.state(), ConversationState::Idle);
        assert!(conversation.transition_log().is_empty());
    }

    #[tokio::test]
    async fn test_import_waits_for_holder_of_replaced_entry() {
        let registry = Arc::new(ConversationRegistry::default());
        let held = registry.get_or_create("shop", "1").await;

        let mut snapshot = Conversation::new("shop", "1").export();
        snapshot.state = ConversationState::Support;
        let importer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.import(snapshot).await })
        };
        tokio::task::yield_now().await;
        assert!(!importer.is_finished());

        drop(held);
        assert!(importer.await.unwrap().unwrap());

        let conversation = registry.get_or_create("shop", "1").await;
        assert_eq!(conversation.state(), ConversationState::Support);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_and_export_do_not_wait_on_busy_entries() {
        let registry = ConversationRegistry::default();
        drop(registry.get_or_create("shop", "1").await);
        let held = registry.get_or_create("shop", "2").await;

        let stats = registry.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.by_tenant.get("shop"), Some(&2));
        assert_eq!(stats.by_state.get(&ConversationState::Idle), Some(&1));

        let snapshots = registry.export_all();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].user_id, "1");

        drop(held);
        assert_eq!(registry.stats().busy, 0);
        assert_eq!(registry.export_all().len(), 2);
    }

    #[tokio::test]
    async fn test_manager_start_stop() {
        let registry = Arc::new(ConversationRegistry::default());
        let mut manager = RegistryManager::new(Arc::clone(&registry), StdDuration::from_millis(10));

        manager.start_sweep();
        assert!(manager.is_sweeping());
        manager.stop_sweep();
        assert!(!manager.is_sweeping());
    }
}
