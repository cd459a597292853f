use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::db::{MetaStore, Scope};

/// Expiring named lock kept in the site scope of the meta store. A lock whose
/// expiry has passed counts as free, so a crashed holder blocks others for at
/// most one TTL.
pub struct SyncLock {
    meta: Arc<dyn MetaStore>,
    ttl: Duration,
}

impl SyncLock {
    pub fn new(meta: Arc<dyn MetaStore>, ttl: Duration) -> Self {
        Self { meta, ttl }
    }

    /// Returns false when another holder's lock has not expired yet.
    pub async fn try_acquire(&self, name: &str) -> Result<bool, sqlx::Error> {
        let now = Utc::now().timestamp();

        if let Some(expires_at) = self
            .meta
            .get(Scope::Site, name)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
        {
            if expires_at > now {
                debug!(lock = name, expires_at, "lock is held");
                return Ok(false);
            }
        }

        let expires_at = now + self.ttl.as_secs() as i64;
        self.meta.set(Scope::Site, name, &expires_at.to_string()).await?;
        Ok(true)
    }

    pub async fn release(&self, name: &str) -> Result<(), sqlx::Error> {
        self.meta.delete(Scope::Site, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryMetaStore;

    #[tokio::test]
    async fn test_second_acquire_is_refused_until_release() {
        let lock = SyncLock::new(Arc::new(MemoryMetaStore::new()), Duration::from_secs(60));

        assert!(lock.try_acquire("strapi_sync_admin_running").await.unwrap());
        assert!(!lock.try_acquire("strapi_sync_admin_running").await.unwrap());
        assert!(lock.try_acquire("strapi_sync_frontend_doc-1").await.unwrap());

        lock.release("strapi_sync_admin_running").await.unwrap();
        assert!(lock.try_acquire("strapi_sync_admin_running").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let meta = Arc::new(MemoryMetaStore::new());
        let stale = (Utc::now().timestamp() - 5).to_string();
        meta.set(Scope::Site, "strapi_sync_admin_running", &stale).await.unwrap();

        let lock = SyncLock::new(meta, Duration::from_secs(60));
        assert!(lock.try_acquire("strapi_sync_admin_running").await.unwrap());
    }
}
