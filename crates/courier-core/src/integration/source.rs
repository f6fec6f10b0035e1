//! Inbound side of the transport boundary.

use async_trait::async_trait;

use crate::foundation::error::TransportResult;
use crate::foundation::update::Update;

/// Delivers updates for one bot identity in order.
///
/// A call returns the next batch of updates, possibly empty after a
/// long-poll timeout. The source is responsible for acknowledging updates it
/// has handed out so they are not delivered again.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Waits for the next batch of updates.
    async fn next_updates(&self) -> TransportResult<Vec<Update>>;
}
