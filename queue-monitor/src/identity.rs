//! Identity resolution
//!
//! Maps a visit to a LINE user id through an ordered fallback chain, each
//! step attempted only when the one before it found nothing:
//!
//! 1. exact MRN lookup in the identity registry;
//! 2. the same lookup with the punctuation-stripped MRN (the HIS emits both
//!    `AB-1234` and `AB1234` for the same patient);
//! 3. when no MRN was supplied, fetch the visit's keys from the HIS and
//!    retry 1–2;
//! 4. lookup by the citizen id from that same fetch.
//!
//! No caching: every reconciliation pass re-resolves, so a registration
//! landing between polls takes effect on the next one.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::his::{RecordSource, SourceError};
use queue_storage::identity::{IdentityStore, IdentityStoreError};

/// Errors that can occur during identity resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The identity registry failed
    #[error(transparent)]
    Registry(#[from] IdentityStoreError),

    /// The HIS key fetch failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Strips punctuation and whitespace, uppercasing what remains
///
/// `AB-1234`, `ab 1234`, and `AB1234` all normalize to `AB1234`.
#[must_use]
pub fn normalize_mrn(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Resolves visits to LINE user ids
pub struct IdentityResolver {
    registry: Arc<dyn IdentityStore>,
    source: Arc<dyn RecordSource>,
}

impl IdentityResolver {
    /// Creates a resolver over the registry and the HIS seam
    #[must_use]
    pub fn new(registry: Arc<dyn IdentityStore>, source: Arc<dyn RecordSource>) -> Self {
        Self { registry, source }
    }

    /// Resolves a visit to a LINE user id, `None` after the whole chain
    /// comes up empty
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` when the registry or the HIS fails mid-chain;
    /// an error is not a `NotFound`.
    pub async fn resolve(
        &self,
        visit_id: &str,
        known_mrn: Option<&str>,
    ) -> Result<Option<String>, ResolveError> {
        if let Some(mrn) = known_mrn {
            if let Some(identity) = self.by_mrn_with_normalization(mrn).await? {
                return Ok(Some(identity));
            }
        }

        // The supplied key failed or was absent; ask the HIS for the
        // visit's keys and retry with those
        let Some(keys) = self.source.fetch_visit_keys(visit_id).await? else {
            debug!(visit_id, "HIS has no keys for this visit");
            return Ok(None);
        };

        if let Some(mrn) = keys.mrn.as_deref() {
            // Skip the retry when it would repeat the exact failed lookup
            if known_mrn != Some(mrn) {
                if let Some(identity) = self.by_mrn_with_normalization(mrn).await? {
                    return Ok(Some(identity));
                }
            }
        }

        if let Some(citizen_id) = keys.citizen_id.as_deref() {
            if let Some(binding) = self.registry.get_by_citizen_id(citizen_id).await? {
                return Ok(Some(binding.channel_identity));
            }
        }

        Ok(None)
    }

    /// Steps 1–2 of the chain: exact lookup, then normalized lookup
    async fn by_mrn_with_normalization(
        &self,
        mrn: &str,
    ) -> Result<Option<String>, ResolveError> {
        if let Some(binding) = self.registry.get_by_mrn(mrn).await? {
            return Ok(Some(binding.channel_identity));
        }

        let normalized = normalize_mrn(mrn);
        if normalized != mrn {
            if let Some(binding) = self.registry.get_by_mrn(&normalized).await? {
                return Ok(Some(binding.channel_identity));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::his::{DispenseRecord, SlotCall, SourceResult, VisitKeys};
    use queue_storage::identity::{memory::MemoryIdentityStore, IdentityBinding};

    struct KeysOnlySource {
        keys: Option<VisitKeys>,
    }

    #[async_trait]
    impl RecordSource for KeysOnlySource {
        async fn fetch_preparing_today(&self) -> SourceResult<Vec<DispenseRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_ready_today(&self) -> SourceResult<Vec<DispenseRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_payment_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
            Ok(Vec::new())
        }

        async fn fetch_pickup_calls_today(&self) -> SourceResult<Vec<SlotCall>> {
            Ok(Vec::new())
        }

        async fn fetch_visit_keys(&self, _visit_id: &str) -> SourceResult<Option<VisitKeys>> {
            Ok(self.keys.clone())
        }
    }

    fn binding(mrn: &str, citizen_id: Option<&str>, line_id: &str) -> IdentityBinding {
        IdentityBinding {
            mrn: mrn.to_string(),
            citizen_id: citizen_id.map(ToString::to_string),
            channel_identity: line_id.to_string(),
            created_at: 1_700_000_000,
        }
    }

    fn resolver(
        registry: Arc<MemoryIdentityStore>,
        keys: Option<VisitKeys>,
    ) -> IdentityResolver {
        IdentityResolver::new(registry, Arc::new(KeysOnlySource { keys }))
    }

    #[test]
    fn normalization_strips_punctuation_and_case_folds() {
        assert_eq!(normalize_mrn("AB-1234"), "AB1234");
        assert_eq!(normalize_mrn("ab 12/34"), "AB1234");
        assert_eq!(normalize_mrn("AB1234"), "AB1234");
    }

    #[tokio::test]
    async fn exact_mrn_match_wins_first() {
        let registry = Arc::new(MemoryIdentityStore::new());
        registry.insert(binding("AB-1234", None, "U111"));

        let resolver = resolver(registry, None);
        let identity = resolver.resolve("V001", Some("AB-1234")).await.unwrap();
        assert_eq!(identity.as_deref(), Some("U111"));
    }

    #[tokio::test]
    async fn punctuated_key_finds_stripped_registration() {
        // Registered without punctuation, looked up with it
        let registry = Arc::new(MemoryIdentityStore::new());
        registry.insert(binding("AB1234", None, "U222"));

        let resolver = resolver(registry, None);
        let identity = resolver.resolve("V001", Some("AB-1234")).await.unwrap();
        assert_eq!(identity.as_deref(), Some("U222"));
    }

    #[tokio::test]
    async fn missing_mrn_falls_back_to_the_his_keys() {
        let registry = Arc::new(MemoryIdentityStore::new());
        registry.insert(binding("CD5678", None, "U333"));

        let resolver = resolver(
            registry,
            Some(VisitKeys {
                visit_id: "V001".to_string(),
                mrn: Some("CD-5678".to_string()),
                citizen_id: None,
            }),
        );

        let identity = resolver.resolve("V001", None).await.unwrap();
        assert_eq!(identity.as_deref(), Some("U333"));
    }

    #[tokio::test]
    async fn citizen_id_is_the_last_resort() {
        let registry = Arc::new(MemoryIdentityStore::new());
        registry.insert(binding("ZZ9999", Some("1103700012345"), "U444"));

        let resolver = resolver(
            registry,
            Some(VisitKeys {
                visit_id: "V001".to_string(),
                mrn: Some("EF-0000".to_string()),
                citizen_id: Some("1103700012345".to_string()),
            }),
        );

        let identity = resolver.resolve("V001", Some("GH-1111")).await.unwrap();
        assert_eq!(identity.as_deref(), Some("U444"));
    }

    #[tokio::test]
    async fn exhausted_chain_is_none_not_an_error() {
        let registry = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(registry, None);

        let identity = resolver.resolve("V001", Some("AB-1234")).await.unwrap();
        assert_eq!(identity, None);
    }
}
