//! In-memory [`RoutingRepository`] double for tests and examples.
//!
//! Holds cameras and angle ranges in plain vectors and lets tests steer
//! failure behavior per operation: force transient errors (to exercise the
//! resolver's retry loop), fatal errors, or a bounded burst of transient
//! errors followed by recovery. Every backing call is counted so tests can
//! assert cache hits and single-flight coalescing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use vigil_core::{AngleRange, Camera, CameraDirection, RoutingRepository, VigilError};

pub mod fixtures;

/// Repository operations that can be steered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    /// `list_cameras_by_direction`
    CamerasByDirection,
    /// `list_angle_ranges_enabled`
    AngleRangesEnabled,
    /// `get_camera_by_id`
    CameraById,
}

/// Instruction for how an operation should behave on its next calls.
#[derive(Debug, Clone)]
pub enum RepoBehavior {
    /// Serve data from the in-memory store.
    Normal,
    /// Fail every call with a transient (retryable) error.
    Transient,
    /// Fail every call with a fatal (non-retryable) error.
    Fatal,
    /// Fail the next `n` calls transiently, then serve normally.
    TransientTimes(u32),
}

#[derive(Default)]
struct Store {
    cameras: Vec<Camera>,
    ranges: Vec<AngleRange>,
    behaviors: HashMap<RepoOp, RepoBehavior>,
}

/// Deterministic in-memory routing repository.
#[derive(Default)]
pub struct MockRepository {
    store: Mutex<Store>,
    calls_by_direction: AtomicUsize,
    calls_ranges: AtomicUsize,
    calls_by_id: AtomicUsize,
}

impl MockRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a camera (builder style).
    #[must_use]
    pub fn with_camera(self, camera: Camera) -> Self {
        self.store.lock().expect("mock store poisoned").cameras.push(camera);
        self
    }

    /// Add an angle range (builder style).
    #[must_use]
    pub fn with_range(self, range: AngleRange) -> Self {
        self.store.lock().expect("mock store poisoned").ranges.push(range);
        self
    }

    /// Replace the camera set at runtime.
    pub fn set_cameras(&self, cameras: Vec<Camera>) {
        self.store.lock().expect("mock store poisoned").cameras = cameras;
    }

    /// Replace the angle range set at runtime.
    pub fn set_ranges(&self, ranges: Vec<AngleRange>) {
        self.store.lock().expect("mock store poisoned").ranges = ranges;
    }

    /// Steer how an operation behaves from now on.
    pub fn set_behavior(&self, op: RepoOp, behavior: RepoBehavior) {
        self.store
            .lock()
            .expect("mock store poisoned")
            .behaviors
            .insert(op, behavior);
    }

    /// Number of backing calls observed for an operation.
    #[must_use]
    pub fn calls(&self, op: RepoOp) -> usize {
        self.counter(op).load(Ordering::SeqCst)
    }

    fn counter(&self, op: RepoOp) -> &AtomicUsize {
        match op {
            RepoOp::CamerasByDirection => &self.calls_by_direction,
            RepoOp::AngleRangesEnabled => &self.calls_ranges,
            RepoOp::CameraById => &self.calls_by_id,
        }
    }

    fn maybe_fail(&self, op: RepoOp, operation: &'static str) -> Result<(), VigilError> {
        self.counter(op).fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.lock().expect("mock store poisoned");
        let behavior = store.behaviors.get(&op).cloned();
        match behavior {
            None | Some(RepoBehavior::Normal) => Ok(()),
            Some(RepoBehavior::Transient) => Err(VigilError::repository_transient(
                operation,
                "forced transient failure",
            )),
            Some(RepoBehavior::Fatal) => {
                Err(VigilError::repository(operation, "forced fatal failure"))
            }
            Some(RepoBehavior::TransientTimes(0)) => {
                store.behaviors.insert(op, RepoBehavior::Normal);
                Ok(())
            }
            Some(RepoBehavior::TransientTimes(n)) => {
                store.behaviors.insert(op, RepoBehavior::TransientTimes(n - 1));
                Err(VigilError::repository_transient(
                    operation,
                    "forced transient failure",
                ))
            }
        }
    }
}

#[async_trait]
impl RoutingRepository for MockRepository {
    async fn list_cameras_by_direction(
        &self,
        direction: CameraDirection,
    ) -> Result<Vec<Camera>, VigilError> {
        self.maybe_fail(RepoOp::CamerasByDirection, "list_cameras_by_direction")?;
        let store = self.store.lock().expect("mock store poisoned");
        Ok(store
            .cameras
            .iter()
            .filter(|c| c.covers(direction))
            .cloned()
            .collect())
    }

    async fn list_angle_ranges_enabled(&self) -> Result<Vec<AngleRange>, VigilError> {
        self.maybe_fail(RepoOp::AngleRangesEnabled, "list_angle_ranges_enabled")?;
        let store = self.store.lock().expect("mock store poisoned");
        Ok(store.ranges.iter().filter(|r| r.enabled).cloned().collect())
    }

    async fn get_camera_by_id(&self, id: &str) -> Result<Option<Camera>, VigilError> {
        self.maybe_fail(RepoOp::CameraById, "get_camera_by_id")?;
        let store = self.store.lock().expect("mock store poisoned");
        Ok(store.cameras.iter().find(|c| c.id == id).cloned())
    }
}
