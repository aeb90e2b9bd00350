//! Publish counters and the introspection snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free publish counters. Per-type subscriber counts are derived from
/// the subscription registry at snapshot time.
#[derive(Default)]
pub(crate) struct BrokerStats {
    published: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl BrokerStats {
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, subscribers_by_type: HashMap<String, usize>) -> StatsSnapshot {
        StatsSnapshot {
            messages_published: self.published.load(Ordering::Relaxed),
            messages_succeeded: self.succeeded.load(Ordering::Relaxed),
            messages_failed: self.failed.load(Ordering::Relaxed),
            total_subscribers: subscribers_by_type.values().sum(),
            subscribers_by_type,
        }
    }
}

/// Point-in-time view of broker activity.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Publishes accepted (including ones that later failed validation).
    pub messages_published: u64,
    /// Publishes that passed validation and processing.
    pub messages_succeeded: u64,
    /// Publishes rejected before fan-out.
    pub messages_failed: u64,
    /// Live subscriptions across all types.
    pub total_subscribers: usize,
    /// Live subscriptions per message type (types with none are omitted).
    pub subscribers_by_type: HashMap<String, usize>,
}
