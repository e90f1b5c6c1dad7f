//! Snapshot storage implementation
//!
//! This module persists conversation snapshots in Redis so a restarted or
//! replacement process can pick up sessions where the previous one left
//! them. The in-process registry stays authoritative while running; Redis
//! only carries state across the handoff.

use redis::AsyncCommands;
use tracing::{debug, error, info, warn};

use crate::config::RedisConfig;
use crate::utils::errors::Result;
use super::context::ConversationSnapshot;
use super::registry::ConversationRegistry;

/// Redis-based snapshot storage
#[derive(Clone)]
pub struct SnapshotStore {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,
    /// Redis configuration
    config: RedisConfig,
}

impl SnapshotStore {
    /// Create a new snapshot store
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// Save one snapshot with the configured TTL
    pub async fn save_snapshot(&self, snapshot: &ConversationSnapshot) -> Result<()> {
        let key = self.snapshot_key(&snapshot.tenant_id, &snapshot.user_id);
        let serialized = snapshot.to_json()?;

        let mut conn = self.connection_manager.clone();
        match conn.set_ex::<_, _, ()>(&key, serialized, self.config.ttl_seconds).await {
            Ok(_) => {
                debug!(key = %key, state = %snapshot.state, "Snapshot saved to Redis");
                Ok(())
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to save snapshot to Redis");
                Err(e.into())
            }
        }
    }

    /// Load one snapshot, if present
    pub async fn load_snapshot(&self, tenant_id: &str, user_id: &str) -> Result<Option<ConversationSnapshot>> {
        let key = self.snapshot_key(tenant_id, user_id);
        let mut conn = self.connection_manager.clone();

        let serialized: Option<String> = conn.get(&key).await?;
        match serialized {
            Some(data) => Ok(Some(ConversationSnapshot::from_json(&data)?)),
            None => {
                debug!(key = %key, "No snapshot found in Redis");
                Ok(None)
            }
        }
    }

    /// Delete one snapshot
    pub async fn delete_snapshot(&self, tenant_id: &str, user_id: &str) -> Result<()> {
        let key = self.snapshot_key(tenant_id, user_id);
        let mut conn = self.connection_manager.clone();

        let deleted: u32 = conn.del(&key).await?;
        debug!(key = %key, deleted = deleted, "Deleted snapshot");
        Ok(())
    }

    /// Persist every live conversation in the registry
    pub async fn persist_registry(&self, registry: &ConversationRegistry) -> Result<usize> {
        let snapshots = registry.export_all();
        for snapshot in &snapshots {
            self.save_snapshot(snapshot).await?;
        }

        info!("Persisted {} conversation snapshots", snapshots.len());
        Ok(snapshots.len())
    }

    /// Load every stored snapshot into the registry and remove it from Redis.
    ///
    /// Snapshots that fail to parse or validate are logged and dropped.
    pub async fn restore_registry(&self, registry: &ConversationRegistry) -> Result<usize> {
        let pattern = format!("{}snapshot:*", self.config.prefix);
        let mut conn = self.connection_manager.clone();
        let keys: Vec<String> = conn.keys(&pattern).await?;

        let mut restored = 0;
        for key in keys {
            let data: Option<String> = conn.get(&key).await?;
            let _: u32 = conn.del(&key).await?;

            let Some(data) = data else { continue };
            let snapshot = match ConversationSnapshot::from_json(&data) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable snapshot");
                    continue;
                }
            };

            match registry.import(snapshot).await {
                Ok(true) => restored += 1,
                Ok(false) => debug!(key = %key, "Discarding expired snapshot"),
                Err(e) => warn!(key = %key, error = %e, "Discarding invalid snapshot"),
            }
        }

        info!("Restored {} conversations from Redis", restored);
        Ok(restored)
    }

    fn snapshot_key(&self, tenant_id: &str, user_id: &str) -> String {
        format!("{}snapshot:{}:{}", self.config.prefix, tenant_id, user_id)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
