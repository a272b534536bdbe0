//! In-memory implementation of the atomic key-value interface
//!
//! Mirrors the single-command atomicity of the Redis implementation with one
//! mutex around the whole store. TTLs are recorded but never enforced; tests
//! that care about expiry assert on the recorded value.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AtomicKv, KvResult};

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    counters: HashMap<String, i64>,
    ttls: HashMap<String, u64>,
}

/// In-memory atomic store for tests
#[derive(Default)]
pub struct MemoryKv {
    inner: Mutex<Inner>,
}

impl MemoryKv {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The TTL most recently recorded for `key`, if any
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    pub fn recorded_ttl(&self, key: &str) -> Option<u64> {
        self.inner.lock().unwrap().ttls.get(key).copied()
    }
}

#[async_trait]
impl AtomicKv for MemoryKv {
    async fn increment(&self, key: &str, ttl_secs: u64) -> KvResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let value = inner.counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        let value = *value;
        inner.ttls.insert(key.to_string(), ttl_secs);
        Ok(value)
    }

    async fn list_push(&self, key: &str, value: &str) -> KvResult<()> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_pop(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .lists
            .get_mut(key)
            .and_then(VecDeque::pop_front))
    }

    async fn list_len(&self, key: &str) -> KvResult<u64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .lists
            .get(key)
            .map_or(0, |l| l.len() as u64))
    }

    async fn list_position(&self, key: &str, value: &str) -> KvResult<Option<u64>> {
        Ok(self.inner.lock().unwrap().lists.get(key).and_then(|l| {
            l.iter()
                .position(|v| v == value)
                .map(|p| p as u64)
        }))
    }

    async fn list_remove(&self, key: &str, value: &str) -> KvResult<()> {
        if let Some(list) = self.inner.lock().unwrap().lists.get_mut(key) {
            if let Some(pos) = list.iter().position(|v| v == value) {
                list.remove(pos);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.inner.lock().unwrap().values.get(key).cloned())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.values.insert(key.to_string(), value.to_string());
        inner.ttls.insert(key.to_string(), ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn increment_is_sequential_and_records_ttl() {
        let kv = MemoryKv::new();
        assert_eq!(kv.increment("queue_no:pharmacy:2024-03-07", 120).await.unwrap(), 1);
        assert_eq!(kv.increment("queue_no:pharmacy:2024-03-07", 90).await.unwrap(), 2);
        assert_eq!(kv.recorded_ttl("queue_no:pharmacy:2024-03-07"), Some(90));
    }

    #[tokio::test]
    async fn list_operations_preserve_fifo_order() {
        let kv = MemoryKv::new();
        kv.list_push("q", "V001").await.unwrap();
        kv.list_push("q", "V002").await.unwrap();
        kv.list_push("q", "V003").await.unwrap();

        assert_eq!(kv.list_len("q").await.unwrap(), 3);
        assert_eq!(kv.list_position("q", "V002").await.unwrap(), Some(1));

        kv.list_remove("q", "V002").await.unwrap();
        assert_eq!(kv.list_pop("q").await.unwrap(), Some("V001".to_string()));
        assert_eq!(kv.list_pop("q").await.unwrap(), Some("V003".to_string()));
        assert_eq!(kv.list_pop("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn removing_an_absent_value_is_a_no_op() {
        let kv = MemoryKv::new();
        kv.list_remove("q", "V404").await.unwrap();
        assert_eq!(kv.list_len("q").await.unwrap(), 0);
    }
}
