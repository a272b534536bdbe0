//! Recording push channel for tests

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{PushChannel, PushError, PushResult};

/// Push channel that records every send and can be told to fail
#[derive(Default)]
pub struct MockPushChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail_next: Mutex<bool>,
}

impl MockPushChannel {
    /// Creates a channel that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next send return an unconfirmed error
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_next_send(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    /// Everything sent so far, as `(channel_identity, text)` pairs
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of sends so far
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushChannel for MockPushChannel {
    async fn send(&self, channel_identity: &str, text: &str) -> PushResult<()> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(PushError::Unconfirmed {
                status: 500,
                body: "injected failure".to_string(),
            });
        }

        self.sent
            .lock()
            .unwrap()
            .push((channel_identity.to_string(), text.to_string()));
        Ok(())
    }
}
