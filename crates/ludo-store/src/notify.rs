//! # Change Feed
//!
//! Best-effort change notification keyed by entity table.
//!
//! ## Role
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Terminal A                              Terminal B                     │
//! │  ──────────                              ──────────                     │
//! │  finalize_sale() commits                 subscribed to the feed         │
//! │       │                                       ▲                         │
//! │       ▼                                       │                         │
//! │  feed.publish(Sales)  ────────────────────────┘                         │
//! │  feed.publish(Inventory)                 reloads its catalog view       │
//! │                                          and re-derives the ledger      │
//! │                                                                         │
//! │  Delivery is BEST-EFFORT. A slow or absent subscriber loses events;     │
//! │  correctness never depends on timely refresh - it rests solely on the   │
//! │  storage-level atomicity of the stock operations.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reconciliation on a received event is a pure recompute: reload the
//! affected table, re-run the ledger aggregation. No merging.

use tokio::sync::broadcast;

// =============================================================================
// Entity Tables
// =============================================================================

/// The tables a client may want to reload on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTable {
    Inventory,
    Sales,
    CashMoves,
    RegisterState,
    MembershipPrices,
}

/// A single change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: EntityTable,
}

// =============================================================================
// Change Feed
// =============================================================================

/// Broadcast channel for change notifications.
///
/// Cloning is cheap; every engine handle shares the same sender. Events
/// published with no subscribers are simply dropped.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Creates a new feed with a bounded backlog per subscriber.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        ChangeFeed { tx }
    }

    /// Subscribes to change events.
    ///
    /// A subscriber that falls more than the backlog behind receives a
    /// `Lagged` error and should do a full reload - which is the normal
    /// reconciliation path anyway.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publishes a change event. Best-effort: send errors (no subscribers)
    /// are ignored.
    pub fn publish(&self, table: EntityTable) {
        let _ = self.tx.send(ChangeEvent { table });
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(EntityTable::Sales);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, EntityTable::Sales);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let feed = ChangeFeed::new();
        // Must not error or panic
        feed.publish(EntityTable::Inventory);
    }
}
