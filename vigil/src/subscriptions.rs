//! Per-type subscriber lists and the fan-out snapshot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vigil_core::{MessageType, ProcessedMessage, VigilError};

/// Identifier handed to a subscriber for later unsubscription.
pub type SubscriptionId = Uuid;

/// A subscriber callback: invoked once per matching publish with the
/// processed message. Returning `Err` counts the delivery as failed; the
/// error is logged and never re-raised.
pub type SubscriberCallback =
    Arc<dyn Fn(&ProcessedMessage) -> Result<(), VigilError> + Send + Sync>;

/// A live subscription owned by the broker. The caller keeps only the id.
#[derive(Clone)]
pub struct SubscriptionInfo {
    /// Unique id handed back to the caller for unsubscribing.
    pub subscription_id: Uuid,
    /// The type this subscription listens on.
    pub message_type: MessageType,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
    callback: SubscriberCallback,
}

impl SubscriptionInfo {
    /// Invoke the callback with a processed message.
    pub fn invoke(&self, message: &ProcessedMessage) -> Result<(), VigilError> {
        (self.callback)(message)
    }
}

impl std::fmt::Debug for SubscriptionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionInfo")
            .field("subscription_id", &self.subscription_id)
            .field("message_type", &self.message_type)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered subscriber lists, one per message type.
///
/// One lock guards the whole registry. Fan-out never holds it across
/// subscriber invocations: `snapshot` clones the list under the lock and the
/// caller iterates after releasing it, so subscribers may unsubscribe (or new
/// ones subscribe) mid-publish without invalidating the iteration.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    subscribers: RwLock<HashMap<MessageType, Vec<SubscriptionInfo>>>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a subscription; returns its id.
    pub(crate) fn subscribe(
        &self,
        message_type: MessageType,
        callback: SubscriberCallback,
    ) -> Uuid {
        let info = SubscriptionInfo {
            subscription_id: Uuid::new_v4(),
            message_type: message_type.clone(),
            created_at: Utc::now(),
            callback,
        };
        let id = info.subscription_id;
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(message_type)
            .or_default()
            .push(info);
        id
    }

    /// Remove a subscription by id; idempotent.
    pub(crate) fn unsubscribe(&self, message_type: &str, subscription_id: Uuid) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = subscribers.get_mut(message_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.subscription_id != subscription_id);
        before != list.len()
    }

    /// Clone the current subscriber list for lock-free fan-out.
    pub(crate) fn snapshot(&self, message_type: &str) -> Vec<SubscriptionInfo> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscriber count, total or per-type.
    pub(crate) fn count(&self, message_type: Option<&str>) -> usize {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match message_type {
            Some(t) => subscribers.get(t).map_or(0, Vec::len),
            None => subscribers.values().map(Vec::len).sum(),
        }
    }

    /// Per-type subscriber counts for the statistics snapshot.
    pub(crate) fn counts_by_type(&self) -> HashMap<String, usize> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(t, list)| (t.as_str().to_string(), list.len()))
            .collect()
    }

    /// Drop every subscription; used by broker shutdown.
    pub(crate) fn clear(&self) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
