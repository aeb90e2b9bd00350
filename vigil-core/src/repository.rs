use async_trait::async_trait;

use crate::{AngleRange, Camera, CameraDirection, VigilError};

/// Narrow repository capability consumed by the camera resolver.
///
/// The persistence layer behind it is external; the core only reads. All
/// three operations are expected to be cheap point/list queries.
///
/// Error contract: connectivity and timeout failures must be raised as
/// [`VigilError::RepositoryTransient`] so the resolver's retry loop can
/// distinguish them from fatal faults; anything else short-circuits straight
/// to the fallback path.
#[async_trait]
pub trait RoutingRepository: Send + Sync {
    /// All cameras whose `directions` set contains the given family.
    async fn list_cameras_by_direction(
        &self,
        direction: CameraDirection,
    ) -> Result<Vec<Camera>, VigilError>;

    /// All enabled angle ranges.
    async fn list_angle_ranges_enabled(&self) -> Result<Vec<AngleRange>, VigilError>;

    /// Look up a single camera by id.
    async fn get_camera_by_id(&self, id: &str) -> Result<Option<Camera>, VigilError>;
}
