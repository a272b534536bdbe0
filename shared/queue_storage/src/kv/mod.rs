//! Atomic key-value primitives
//!
//! Ticket numbering and FIFO ordering live here. Every operation is a single
//! server-side command (`INCR`, `RPUSH`, `LPOP`, `LREM`), never a
//! read-modify-write composed in application code, so concurrent
//! registrations and call-ups cannot duplicate numbers or lose list entries.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
mod redis;

use async_trait::async_trait;

pub use self::redis::RedisKv;
pub use error::{KvError, KvResult};

/// Narrow interface over the atomic store (Redis in production)
///
/// Keys are plain strings; list values are visit ids. TTLs are seconds.
#[async_trait]
pub trait AtomicKv: Send + Sync {
    /// Atomically increments `key` and (re)sets its expiry, returning the new
    /// value
    ///
    /// The expiry is applied on every increment, so a counter created just
    /// after midnight picks up the delta to the next midnight.
    async fn increment(&self, key: &str, ttl_secs: u64) -> KvResult<i64>;

    /// Appends `value` to the tail of the list at `key`
    async fn list_push(&self, key: &str, value: &str) -> KvResult<()>;

    /// Pops the head of the list at `key`, `None` when empty
    async fn list_pop(&self, key: &str) -> KvResult<Option<String>>;

    /// Length of the list at `key`
    async fn list_len(&self, key: &str) -> KvResult<u64>;

    /// 0-based position of `value` in the list at `key`, `None` when absent
    async fn list_position(&self, key: &str, value: &str) -> KvResult<Option<u64>>;

    /// Removes the first occurrence of `value` from the list at `key`
    ///
    /// Removing an absent value is not an error.
    async fn list_remove(&self, key: &str, value: &str) -> KvResult<()>;

    /// Reads the string value at `key`
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Writes `value` at `key` with an expiry
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()>;

    /// Deletes `key`
    async fn delete(&self, key: &str) -> KvResult<()>;
}

/// Key of the per-category, per-day ticket counter
#[must_use]
pub fn counter_key(category: common_types::QueueCategory, service_day: &str) -> String {
    format!("queue_no:{category}:{service_day}")
}

/// Key of the per-category FIFO list
#[must_use]
pub fn fifo_key(category: common_types::QueueCategory) -> String {
    format!("queue_list:{category}")
}

/// Key of the working-cache copy of one ticket
#[must_use]
pub fn ticket_cache_key(visit_id: &str, category: common_types::QueueCategory) -> String {
    format!("queue:{visit_id}:{category}")
}
