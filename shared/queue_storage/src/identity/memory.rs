//! In-memory identity registry for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{IdentityBinding, IdentityStore, IdentityStoreResult};

/// In-memory identity registry
#[derive(Default)]
pub struct MemoryIdentityStore {
    bindings: Mutex<HashMap<String, IdentityBinding>>,
}

impl MemoryIdentityStore {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding keyed by its MRN
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn insert(&self, binding: IdentityBinding) {
        self.bindings
            .lock()
            .unwrap()
            .insert(binding.mrn.clone(), binding);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_by_mrn(&self, mrn: &str) -> IdentityStoreResult<Option<IdentityBinding>> {
        Ok(self.bindings.lock().unwrap().get(mrn).cloned())
    }

    async fn get_by_citizen_id(
        &self,
        citizen_id: &str,
    ) -> IdentityStoreResult<Option<IdentityBinding>> {
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .values()
            .find(|b| b.citizen_id.as_deref() == Some(citizen_id))
            .cloned())
    }
}
