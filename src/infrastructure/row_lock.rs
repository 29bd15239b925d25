use crate::domain::ports::LockPolicy;
use crate::error::{Result, SpendError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Exclusive per-row locks for wallet mutations.
///
/// Backends that do not own a lock manager (the in-memory maps and the embedded RocksDB
/// instance, which only one process may open) route `lock_for_update` through this table.
#[derive(Default, Clone)]
pub struct RowLocks {
    rows: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    policy: LockPolicy,
}

impl RowLocks {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            rows: Arc::default(),
            policy,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Acquires the row lock for `id` according to the configured policy.
    pub async fn acquire(&self, id: Uuid) -> Result<OwnedMutexGuard<()>> {
        let row = {
            let mut rows = self.rows.lock().await;
            rows.entry(id).or_default().clone()
        };

        match self.policy {
            LockPolicy::NoWait => row
                .try_lock_owned()
                .map_err(|_| SpendError::LockContention(id)),
            LockPolicy::Wait { timeout } => tokio::time::timeout(timeout, row.lock_owned())
                .await
                .map_err(|_| SpendError::LockContention(id)),
        }
    }
}
