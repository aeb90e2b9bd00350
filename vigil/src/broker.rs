//! The process-singleton broker facade.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use vigil_core::{
    BrokerConfig, MessageData, MessageHandler, MessageType, Payload, ProcessedMessage,
    PublishResult, RoutingRepository, VigilError,
};

use crate::handlers::{AiAlertHandler, AngleHandler, DirectionHandler};
use crate::registry::TypeRegistry;
use crate::resolver::{AlertRoutingPolicy, CameraResolver, RoutingSnapshot};
use crate::stats::{BrokerStats, StatsSnapshot};
use crate::subscriptions::{SubscriptionInfo, SubscriptionRegistry};

static GLOBAL: OnceLock<Arc<Broker>> = OnceLock::new();

/// Builder for a [`Broker`].
///
/// `build()` registers the three built-in message types; if that bootstrap
/// fails the broker refuses to become ready and the error is returned. A
/// repository is optional: without one, resolution yields empty camera lists
/// and events still flow.
pub struct BrokerBuilder {
    cfg: BrokerConfig,
    repository: Option<Arc<dyn RoutingRepository>>,
    alert_policy: Option<Arc<dyn AlertRoutingPolicy>>,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: BrokerConfig::default(),
            repository: None,
            alert_policy: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: BrokerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Back the camera resolver with a routing repository.
    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn RoutingRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Install a site-specific alert routing policy on the resolver.
    #[must_use]
    pub fn alert_policy(mut self, policy: Arc<dyn AlertRoutingPolicy>) -> Self {
        self.alert_policy = Some(policy);
        self
    }

    /// Build the broker and register the built-in message types.
    ///
    /// # Errors
    /// Any failure to register a built-in handler; the broker is not usable
    /// in that case.
    pub fn build(self) -> Result<Broker, VigilError> {
        let resolver = self.repository.map(|repository| {
            let resolver =
                CameraResolver::new(repository, self.cfg.resolver.clone(), self.cfg.angle_wrap);
            let resolver = match self.alert_policy {
                Some(policy) => resolver.with_alert_policy(policy),
                None => resolver,
            };
            Arc::new(resolver)
        });

        let broker = Broker {
            cfg: self.cfg,
            registry: TypeRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
            resolver: RwLock::new(resolver),
            stats: BrokerStats::default(),
            terminated: AtomicBool::new(false),
        };

        let builtins: [Arc<dyn MessageHandler>; 3] = [
            Arc::new(DirectionHandler::new()),
            Arc::new(AngleHandler::new()),
            Arc::new(AiAlertHandler::new()),
        ];
        for handler in builtins {
            let message_type = handler.type_name().clone();
            broker.registry.register(&message_type, handler, false)?;
        }

        Ok(broker)
    }
}

/// The in-process typed pub/sub broker.
///
/// Composes the type registry, subscription registry, camera resolver, and
/// statistics behind the nine public operations. Thread-safe: any number of
/// publisher tasks may call [`publish`](Self::publish) concurrently.
///
/// Ordering: messages awaited in sequence by one publisher are observed by
/// each subscriber in that sequence; no ordering holds across publishers.
/// Within one publish, subscribers run in subscription (insertion) order.
///
/// The process normally holds exactly one broker, obtained via
/// [`Broker::global`]; construction goes through [`Broker::builder`], which
/// is also how tests and embedding hosts create isolated instances.
pub struct Broker {
    cfg: BrokerConfig,
    registry: TypeRegistry,
    subscriptions: SubscriptionRegistry,
    resolver: RwLock<Option<Arc<CameraResolver>>>,
    stats: BrokerStats,
    terminated: AtomicBool,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("cfg", &self.cfg)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl Broker {
    /// Start building a broker instance.
    #[must_use]
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::new()
    }

    /// The process-wide broker, built with defaults on first access.
    ///
    /// Call [`Broker::init_global`] first to install a configured instance.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| {
            let broker = Self::builder()
                .build()
                .expect("default bootstrap registers only valid built-in types");
            Arc::new(broker)
        }))
    }

    /// Install a configured broker as the process-wide instance.
    ///
    /// # Errors
    /// `AlreadyInitialized` if the global instance was already created,
    /// whether by an earlier call or by [`Broker::global`].
    pub fn init_global(broker: Self) -> Result<Arc<Self>, VigilError> {
        let broker = Arc::new(broker);
        GLOBAL
            .set(Arc::clone(&broker))
            .map_err(|_| VigilError::AlreadyInitialized)?;
        Ok(broker)
    }

    /// Register a handler for a message type.
    ///
    /// Override of an existing registration requires `allow_override` (or the
    /// config-wide flag); the type's subscriber list is preserved verbatim so
    /// extending a deployment never drops listeners.
    ///
    /// # Errors
    /// `TypeAlreadyRegistered`, `HandlerContract`, `InvalidArg` (malformed
    /// type name), or `BrokerShutDown`.
    pub fn register_message_type(
        &self,
        message_type: &str,
        handler: Arc<dyn MessageHandler>,
        allow_override: bool,
    ) -> Result<(), VigilError> {
        self.ensure_live()?;
        let message_type = MessageType::new(message_type)?;
        let allow = allow_override || self.cfg.allow_handler_override;
        self.registry.register(&message_type, handler, allow)?;
        info!(
            target: "vigil::broker",
            message_type = %message_type,
            allow_override = allow,
            "registered message type"
        );
        Ok(())
    }

    /// Remove the handler for a type. Existing subscribers are retained, but
    /// publishes and new subscriptions fail until the type is re-registered.
    ///
    /// # Errors
    /// `BrokerShutDown`.
    pub fn unregister_message_type(&self, message_type: &str) -> Result<bool, VigilError> {
        self.ensure_live()?;
        let removed = self.registry.unregister(message_type);
        if removed {
            info!(target: "vigil::broker", message_type, "unregistered message type");
        }
        Ok(removed)
    }

    /// Subscribe a callback to a registered type; returns the subscription id
    /// used for [`unsubscribe`](Self::unsubscribe).
    ///
    /// # Errors
    /// `TypeNotRegistered` or `BrokerShutDown`.
    pub fn subscribe<F>(&self, message_type: &str, callback: F) -> Result<Uuid, VigilError>
    where
        F: Fn(&ProcessedMessage) -> Result<(), VigilError> + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let Some(handler) = self.registry.get_handler(message_type) else {
            return Err(VigilError::type_not_registered(message_type));
        };
        let id = self
            .subscriptions
            .subscribe(handler.type_name().clone(), Arc::new(callback));
        debug!(
            target: "vigil::broker",
            message_type,
            subscription_id = %id,
            "subscribed"
        );
        Ok(id)
    }

    /// Remove a subscription by id. Idempotent; returns whether a removal
    /// occurred.
    pub fn unsubscribe(&self, message_type: &str, subscription_id: Uuid) -> bool {
        let removed = self.subscriptions.unsubscribe(message_type, subscription_id);
        if removed {
            debug!(
                target: "vigil::broker",
                message_type,
                subscription_id = %subscription_id,
                "unsubscribed"
            );
        }
        removed
    }

    /// Validate, normalize, camera-resolve, and fan a message out to every
    /// subscriber registered for its type.
    ///
    /// Never returns an error: validation failures, resolver degradation, and
    /// subscriber faults are all reported through the [`PublishResult`]
    /// (`success` reflects validation and processing only).
    pub async fn publish(&self, message_type: &str, payload: Payload) -> PublishResult {
        self.publish_with_hint(message_type, payload, None).await
    }

    /// [`publish`](Self::publish) with a producer hint carried on the
    /// delivered message, identifying the originating component in logs and
    /// stream envelopes.
    pub async fn publish_with_hint(
        &self,
        message_type: &str,
        payload: Payload,
        producer_hint: Option<String>,
    ) -> PublishResult {
        let started = Instant::now();
        let message_id = Uuid::new_v4();
        self.stats.record_published();

        if self.terminated.load(Ordering::SeqCst) {
            self.stats.record_failed();
            return Self::failure(message_id, vec![VigilError::BrokerShutDown.to_string()], started);
        }

        let Some(handler) = self.registry.get_handler(message_type) else {
            self.stats.record_failed();
            return Self::failure(
                message_id,
                vec![VigilError::type_not_registered(message_type).to_string()],
                started,
            );
        };

        let validation = handler.validate(&payload);
        if !validation.valid {
            self.stats.record_failed();
            error!(
                target: "vigil::broker",
                message_id = %message_id,
                message_type,
                errors = ?validation.errors,
                "validation failed; message not delivered"
            );
            return Self::failure(message_id, validation.errors, started);
        }
        for warning in &validation.warnings {
            debug!(
                target: "vigil::broker",
                message_id = %message_id,
                message_type,
                warning = %warning,
                "validation warning"
            );
        }

        let normalized = match handler.process(payload) {
            Ok(payload) => payload,
            Err(err) => {
                self.stats.record_failed();
                error!(
                    target: "vigil::broker",
                    message_id = %message_id,
                    message_type,
                    error = %err,
                    "normalization failed; message not delivered"
                );
                return Self::failure(message_id, vec![err.to_string()], started);
            }
        };

        let message = MessageData {
            message_id,
            message_type: handler.type_name().clone(),
            data: normalized,
            timestamp: Utc::now(),
            producer_hint,
        };

        let resolver = self.current_resolver();
        let cameras = match resolver {
            Some(resolver) => resolver.resolve(&message).await,
            None => Vec::new(),
        };

        let processed = ProcessedMessage {
            message,
            cameras,
            processing_time_ms: elapsed_ms(started),
            errors: Vec::new(),
        };

        let snapshot = self.subscriptions.snapshot(message_type);
        let (notified, failed) = Self::fan_out(&snapshot, &processed);
        self.stats.record_succeeded();

        PublishResult {
            success: true,
            message_id,
            subscribers_notified: notified,
            subscribers_failed: failed,
            errors: Vec::new(),
            duration_ms: elapsed_ms(started),
        }
    }

    /// Whether a handler is currently registered for the type.
    #[must_use]
    pub fn is_type_registered(&self, message_type: &str) -> bool {
        self.registry.is_registered(message_type)
    }

    /// All registered type names, sorted.
    #[must_use]
    pub fn list_types(&self) -> Vec<MessageType> {
        self.registry.list_types()
    }

    /// Subscriber count, per-type or total.
    #[must_use]
    pub fn subscriber_count(&self, message_type: Option<&str>) -> usize {
        self.subscriptions.count(message_type)
    }

    /// Snapshot of publish counters and per-type subscriber counts.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.subscriptions.counts_by_type())
    }

    /// Swap in a camera resolver (e.g. after the routing store comes up).
    pub fn set_resolver(&self, resolver: Arc<CameraResolver>) {
        *self
            .resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(resolver);
    }

    /// Drop the resolver's cached query results; the next resolutions re-read
    /// the repository. Call after cameras or ranges change upstream.
    pub fn invalidate_routing_cache(&self) {
        if let Some(resolver) = self.current_resolver() {
            resolver.invalidate();
        }
    }

    /// The full routing model, for the stream adapter's `current_state`
    /// event. Empty when no resolver is installed.
    pub async fn routing_snapshot(&self) -> RoutingSnapshot {
        match self.current_resolver() {
            Some(resolver) => resolver.snapshot().await,
            None => RoutingSnapshot {
                directions: std::collections::BTreeMap::new(),
                angle_ranges: Vec::new(),
            },
        }
    }

    /// Terminate the broker: clear every subscription, release the resolver,
    /// and reject all further operations with `BrokerShutDown`.
    ///
    /// # Errors
    /// `BrokerShutDown` if already terminated; shutdown runs at most once.
    pub fn shutdown(&self) -> Result<(), VigilError> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Err(VigilError::BrokerShutDown);
        }
        self.subscriptions.clear();
        *self
            .resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!(target: "vigil::broker", "broker shut down");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn current_resolver(&self) -> Option<Arc<CameraResolver>> {
        self.resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_live(&self) -> Result<(), VigilError> {
        if self.terminated.load(Ordering::SeqCst) {
            Err(VigilError::BrokerShutDown)
        } else {
            Ok(())
        }
    }

    // Iterates a snapshot taken outside any broker lock. A failing or
    // panicking callback is logged and counted; the iteration continues.
    fn fan_out(snapshot: &[SubscriptionInfo], processed: &ProcessedMessage) -> (usize, usize) {
        let mut notified = 0;
        let mut failed = 0;
        for subscription in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscription.invoke(processed)
            }));
            match outcome {
                Ok(Ok(())) => notified += 1,
                Ok(Err(err)) => {
                    failed += 1;
                    error!(
                        target: "vigil::broker",
                        subscription_id = %subscription.subscription_id,
                        message_id = %processed.message.message_id,
                        error = %err,
                        "subscriber callback failed"
                    );
                }
                Err(panic) => {
                    failed += 1;
                    error!(
                        target: "vigil::broker",
                        subscription_id = %subscription.subscription_id,
                        message_id = %processed.message.message_id,
                        panic = panic_message(&*panic),
                        "subscriber callback panicked"
                    );
                }
            }
        }
        (notified, failed)
    }

    fn failure(message_id: Uuid, errors: Vec<String>, started: Instant) -> PublishResult {
        PublishResult {
            success: false,
            message_id,
            subscribers_notified: 0,
            subscribers_failed: 0,
            errors,
            duration_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_counts_no_subscribers() {
        let result = Broker::failure(Uuid::new_v4(), vec!["bad".to_string()], Instant::now());
        assert!(!result.success);
        assert_eq!(result.subscribers_notified, 0);
        assert_eq!(result.subscribers_failed, 0);
        assert_eq!(result.errors, vec!["bad".to_string()]);
    }
}
