use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-user async mutexes. Holding a user's guard serializes everything that
/// reads then writes that user's cart, coupon tracking or wallet.
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: i32) -> OwnedMutexGuard<()> {
        let slot = self.slot(user_id);
        slot.lock_owned().await
    }

    /// Locks several users at once, always in ascending id order.
    pub async fn lock_many(&self, user_ids: &[i32]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = user_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock(id).await);
        }
        guards
    }

    fn slot(&self, user_id: i32) -> Arc<AsyncMutex<()>> {
        // A poisoned map only means another thread panicked mid-insert; the map itself is intact.
        let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Nobody outside the map holds these, so they can go.
        map.retain(|id, slot| *id == user_id || Arc::strong_count(slot) > 1);
        map.entry(user_id).or_default().clone()
    }
}
