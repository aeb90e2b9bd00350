//! Maps processed messages to the cameras they should activate.
//!
//! Repository access goes through per-operation read-through caches with
//! single-flight coalescing, a bounded retry loop for transient failures,
//! and a last-known-good fallback so a degraded database never drops an
//! event: resolution degrades to stale data, then to an empty camera list.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use vigil_core::{
    AngleRange, AngleWrapMode, Camera, CameraDirection, MessageData, ResolverConfig,
    RoutingRepository, VigilError,
};

use crate::handlers;

/// Site-specific policy deciding which cameras an AI alert activates.
///
/// The default policy routes alerts to no cameras; installations that couple
/// alerts to the routing model install their own via
/// [`CameraResolver::with_alert_policy`].
#[async_trait]
pub trait AlertRoutingPolicy: Send + Sync {
    /// Cameras to activate for the given normalized alert message.
    async fn cameras_for_alert(&self, message: &MessageData) -> Result<Vec<Camera>, VigilError>;
}

/// The default alert policy: no camera coupling.
pub struct NoAlertRouting;

#[async_trait]
impl AlertRoutingPolicy for NoAlertRouting {
    async fn cameras_for_alert(&self, _message: &MessageData) -> Result<Vec<Camera>, VigilError> {
        Ok(Vec::new())
    }
}

/// One-shot view of the full routing model, emitted as `current_state` by the
/// stream adapter. Directions map to the online cameras covering them.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingSnapshot {
    /// Direction family name to the cameras covering it.
    pub directions: BTreeMap<String, Vec<Camera>>,
    /// Every enabled angle range.
    pub angle_ranges: Vec<AngleRange>,
}

// Cache key for the argument-less enabled-ranges query.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct RangesKey;

#[derive(Default)]
struct FallbackCache {
    by_direction: HashMap<CameraDirection, Vec<Camera>>,
    ranges: Option<Vec<AngleRange>>,
    by_id: HashMap<String, Option<Camera>>,
}

/// Resolves a processed message to the set of cameras it should activate.
pub struct CameraResolver {
    repository: Arc<dyn RoutingRepository>,
    cfg: ResolverConfig,
    wrap: AngleWrapMode,
    alert_policy: Arc<dyn AlertRoutingPolicy>,
    by_direction: Cache<CameraDirection, Arc<Vec<Camera>>>,
    ranges: Cache<RangesKey, Arc<Vec<AngleRange>>>,
    by_id: Cache<String, Arc<Option<Camera>>>,
    fallback: Mutex<FallbackCache>,
}

impl CameraResolver {
    /// Build a resolver over the given repository.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoutingRepository>,
        cfg: ResolverConfig,
        wrap: AngleWrapMode,
    ) -> Self {
        // moka rejects a zero TTL; clamp rather than disable the cache.
        let ttl = cfg.cache_ttl.max(Duration::from_millis(1));
        Self {
            repository,
            cfg,
            wrap,
            alert_policy: Arc::new(NoAlertRouting),
            by_direction: Cache::builder().max_capacity(16).time_to_live(ttl).build(),
            ranges: Cache::builder().max_capacity(4).time_to_live(ttl).build(),
            by_id: Cache::builder().max_capacity(1024).time_to_live(ttl).build(),
            fallback: Mutex::new(FallbackCache::default()),
        }
    }

    /// Install a site-specific alert routing policy.
    #[must_use]
    pub fn with_alert_policy(mut self, policy: Arc<dyn AlertRoutingPolicy>) -> Self {
        self.alert_policy = policy;
        self
    }

    /// Drop every cached query result; the next lookups hit the repository.
    ///
    /// The last-known-good fallback values are kept: they exist precisely for
    /// the case where the refreshed query fails.
    pub fn invalidate(&self) {
        self.by_direction.invalidate_all();
        self.ranges.invalidate_all();
        self.by_id.invalidate_all();
    }

    /// Cameras for a normalized message. Never fails: repository errors
    /// degrade to cached data or an empty list, and the event still flows.
    pub async fn resolve(&self, message: &MessageData) -> Vec<Camera> {
        match message.message_type.as_str() {
            handlers::DIRECTION_RESULT => self.resolve_direction(message).await,
            handlers::ANGLE_VALUE => self.resolve_angle(message).await,
            handlers::AI_ALERT => self.resolve_alert(message).await,
            _ => Vec::new(),
        }
    }

    /// Full routing model for the `current_state` envelope.
    pub async fn snapshot(&self) -> RoutingSnapshot {
        let mut directions = BTreeMap::new();
        for direction in CameraDirection::ALL {
            let mut cameras: Vec<Camera> = self
                .direction_cameras(direction)
                .await
                .into_iter()
                .filter(Camera::is_online)
                .collect();
            sort_cameras(&mut cameras);
            directions.insert(direction.as_str().to_string(), cameras);
        }
        RoutingSnapshot {
            directions,
            angle_ranges: self.enabled_ranges().await,
        }
    }

    async fn resolve_direction(&self, message: &MessageData) -> Vec<Camera> {
        let Some(direction) = message
            .data
            .get("command")
            .and_then(serde_json::Value::as_str)
            .and_then(direction_for_command)
        else {
            return Vec::new();
        };
        let mut cameras: Vec<Camera> = self
            .direction_cameras(direction)
            .await
            .into_iter()
            .filter(Camera::is_online)
            .collect();
        sort_cameras(&mut cameras);
        cameras
    }

    async fn resolve_angle(&self, message: &MessageData) -> Vec<Camera> {
        let Some(angle) = message.data.get("angle").and_then(serde_json::Value::as_f64) else {
            return Vec::new();
        };
        let normalized = self.wrap_angle(angle);

        // Union of camera ids over matching ranges, first-seen order.
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for range in self.enabled_ranges().await {
            if range.contains(normalized) {
                for id in range.camera_ids {
                    if seen.insert(id.clone()) {
                        ids.push(id);
                    }
                }
            }
        }

        let mut cameras = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(camera) = self.camera_by_id(id).await {
                cameras.push(camera);
            }
        }
        sort_cameras(&mut cameras);
        cameras
    }

    async fn resolve_alert(&self, message: &MessageData) -> Vec<Camera> {
        match self.alert_policy.cameras_for_alert(message).await {
            Ok(mut cameras) => {
                sort_cameras(&mut cameras);
                cameras
            }
            Err(err) => {
                warn!(
                    target: "vigil::resolver",
                    message_id = %message.message_id,
                    error = %err,
                    "alert routing policy failed; delivering with no cameras"
                );
                Vec::new()
            }
        }
    }

    fn wrap_angle(&self, angle: f64) -> f64 {
        match self.wrap {
            AngleWrapMode::Mod360 => angle.rem_euclid(360.0),
            _ => angle.rem_euclid(360.0),
        }
    }

    async fn direction_cameras(&self, direction: CameraDirection) -> Vec<Camera> {
        let loaded = self
            .by_direction
            .try_get_with(direction, async {
                let cameras = self
                    .with_retry("list_cameras_by_direction", || {
                        self.repository.list_cameras_by_direction(direction)
                    })
                    .await?;
                self.fallback_mut()
                    .by_direction
                    .insert(direction, cameras.clone());
                Ok::<_, VigilError>(Arc::new(cameras))
            })
            .await;
        match loaded {
            Ok(cameras) => (*cameras).clone(),
            Err(err) => {
                self.log_degraded("list_cameras_by_direction", &err);
                self.fallback_mut()
                    .by_direction
                    .get(&direction)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }

    async fn enabled_ranges(&self) -> Vec<AngleRange> {
        let loaded = self
            .ranges
            .try_get_with(RangesKey, async {
                let ranges = self
                    .with_retry("list_angle_ranges_enabled", || {
                        self.repository.list_angle_ranges_enabled()
                    })
                    .await?;
                self.fallback_mut().ranges = Some(ranges.clone());
                Ok::<_, VigilError>(Arc::new(ranges))
            })
            .await;
        match loaded {
            Ok(ranges) => (*ranges).clone(),
            Err(err) => {
                self.log_degraded("list_angle_ranges_enabled", &err);
                self.fallback_mut().ranges.clone().unwrap_or_default()
            }
        }
    }

    async fn camera_by_id(&self, id: String) -> Option<Camera> {
        let loaded = self
            .by_id
            .try_get_with(id.clone(), async {
                let camera = self
                    .with_retry("get_camera_by_id", || self.repository.get_camera_by_id(&id))
                    .await?;
                self.fallback_mut().by_id.insert(id.clone(), camera.clone());
                Ok::<_, VigilError>(Arc::new(camera))
            })
            .await;
        match loaded {
            Ok(camera) => (*camera).clone(),
            Err(err) => {
                self.log_degraded("get_camera_by_id", &err);
                self.fallback_mut().by_id.get(&id).cloned().flatten()
            }
        }
    }

    /// Run a repository call, retrying transient failures with exponential
    /// backoff (`initial * 2^attempt`) plus jitter, bounded by `max_retries`.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, VigilError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VigilError>>,
    {
        let initial_ms =
            u64::try_from(self.cfg.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.cfg.max_retries => {
                    let base = initial_ms.saturating_mul(1_u64 << attempt.min(62));
                    let delay = jittered(base, self.cfg.jitter_percent);
                    warn!(
                        target: "vigil::resolver",
                        event = "retry",
                        operation,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "transient repository failure; backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(
                        target: "vigil::resolver",
                        event = "exhausted",
                        operation,
                        attempts = attempt,
                        error = %err,
                        "repository call failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    fn log_degraded(&self, operation: &'static str, err: &Arc<VigilError>) {
        warn!(
            target: "vigil::resolver",
            event = "fallback",
            operation,
            error = %err,
            "serving last-known-good value after retry exhaustion"
        );
    }

    fn fallback_mut(&self) -> std::sync::MutexGuard<'_, FallbackCache> {
        self.fallback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map a normalized motion command onto its camera direction family.
#[must_use]
pub fn direction_for_command(command: &str) -> Option<CameraDirection> {
    match command {
        "forward" => Some(CameraDirection::Forward),
        "backward" => Some(CameraDirection::Backward),
        "turn_left" => Some(CameraDirection::Left),
        "turn_right" => Some(CameraDirection::Right),
        "stationary" => Some(CameraDirection::Idle),
        _ => None,
    }
}

// Deterministic output order: (name, id) ascending.
fn sort_cameras(cameras: &mut [Camera]) {
    cameras.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn jittered(base_ms: u64, jitter_percent: u8) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_family_mapping_is_total_over_builtin_commands() {
        assert_eq!(
            direction_for_command("forward"),
            Some(CameraDirection::Forward)
        );
        assert_eq!(
            direction_for_command("turn_left"),
            Some(CameraDirection::Left)
        );
        assert_eq!(
            direction_for_command("turn_right"),
            Some(CameraDirection::Right)
        );
        assert_eq!(
            direction_for_command("stationary"),
            Some(CameraDirection::Idle)
        );
        assert_eq!(
            direction_for_command("backward"),
            Some(CameraDirection::Backward)
        );
        assert_eq!(direction_for_command("sideways"), None);
    }

    #[test]
    fn jitter_stays_within_percentage_band() {
        for _ in 0..100 {
            let d = jittered(100, 20);
            assert!((100..120).contains(&d));
        }
        assert_eq!(jittered(100, 0), 100);
    }
}
