//! Canned cameras and angle ranges for deterministic examples and tests.

use vigil_core::{AngleRange, Camera, CameraDirection, CameraStatus};

/// Build a camera with an rtsp URL derived from its id.
#[must_use]
pub fn camera(
    id: &str,
    name: &str,
    status: CameraStatus,
    directions: &[CameraDirection],
) -> Camera {
    Camera {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("rtsp://cameras.local/{id}"),
        status,
        directions: directions.to_vec(),
    }
}

/// An online forward-facing camera named "Front Door".
#[must_use]
pub fn front_door() -> Camera {
    camera(
        "cam-front",
        "Front Door",
        CameraStatus::Online,
        &[CameraDirection::Forward],
    )
}

/// An online camera covering forward and left, named "Driveway".
#[must_use]
pub fn driveway() -> Camera {
    camera(
        "cam-drive",
        "Driveway",
        CameraStatus::Online,
        &[CameraDirection::Forward, CameraDirection::Left],
    )
}

/// An online backward-facing camera named "Garden".
#[must_use]
pub fn garden() -> Camera {
    camera(
        "cam-garden",
        "Garden",
        CameraStatus::Online,
        &[CameraDirection::Backward],
    )
}

/// An offline forward-facing camera named "Gate".
#[must_use]
pub fn gate_offline() -> Camera {
    camera(
        "cam-gate",
        "Gate",
        CameraStatus::Offline,
        &[CameraDirection::Forward],
    )
}

/// An enabled angle range covering `[min, max)` over the given camera ids.
#[must_use]
pub fn range(id: &str, name: &str, min: f64, max: f64, camera_ids: &[&str]) -> AngleRange {
    AngleRange::new(
        id,
        name,
        min,
        max,
        true,
        camera_ids.iter().map(|s| (*s).to_string()).collect(),
    )
    .expect("fixture range must satisfy 0 <= min < max <= 360")
}
