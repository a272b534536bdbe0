//! Push-notification channel for the OPD queue system
//!
//! The only transport is the LINE Messaging API push endpoint. The channel
//! gives HTTP-level acknowledgment and nothing more; callers treat anything
//! short of a 2xx response as unconfirmed and retry on their own schedule.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

mod error;
/// LINE Messaging API client
pub mod line;
/// Patient-facing Thai message templates
pub mod messages;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use async_trait::async_trait;

pub use error::{PushError, PushResult};
pub use line::LineMessaging;

/// Outbound push channel
///
/// `Ok(())` means the channel acknowledged the send at the HTTP level. There
/// is no delivery receipt beyond that.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Pushes a text message to one recipient
    async fn send(&self, channel_identity: &str, text: &str) -> PushResult<()>;
}
