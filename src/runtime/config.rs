//! Tunables of the identity lookup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`IdentityStorageLookup`](crate::lookup::IdentityStorageLookup).
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
///
/// ```
/// use identity_lookup::runtime::LookupConfig;
///
/// let config = LookupConfig::default().with_worker_pool_size(8);
/// assert_eq!(config.worker_pool_size(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Number of identity workers. Fixed for the lifetime of a router.
    pub worker_pool_size: usize,
    /// Mailbox capacity of every worker and of the placement actor.
    pub mailbox_capacity: usize,
    /// Upper bound for a single `resolve` call.
    pub request_timeout_ms: u64,
    /// How often a worker re-resolves after a storage conflict.
    pub max_conflict_retries: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 50,
            mailbox_capacity: 32,
            request_timeout_ms: 5_000,
            max_conflict_retries: 3,
        }
    }
}

impl LookupConfig {
    pub fn with_worker_pool_size(mut self, worker_pool_size: usize) -> Self {
        self.worker_pool_size = worker_pool_size;
        self
    }

    pub fn with_mailbox_capacity(mut self, mailbox_capacity: usize) -> Self {
        self.mailbox_capacity = mailbox_capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_conflict_retries(mut self, max_conflict_retries: u32) -> Self {
        self.max_conflict_retries = max_conflict_retries;
        self
    }

    /// Pool size, at least 1.
    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size.max(1)
    }

    /// Mailbox capacity, at least 1.
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}
