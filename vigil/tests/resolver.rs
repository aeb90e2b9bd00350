mod helpers;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use vigil::{
    AlertRoutingPolicy, Broker, Camera, CameraDirection, CameraStatus, MessageData,
    RoutingRepository, VigilError,
};
use vigil_mock::{MockRepository, RepoBehavior, RepoOp};

use crate::helpers::{broker_with, camera, counting_subscriber, fast_config, payload, range};

fn angle_fixture_repo() -> Arc<MockRepository> {
    Arc::new(
        MockRepository::new()
            .with_camera(camera("x", "Xenon", CameraStatus::Online, &[]))
            .with_camera(camera("y", "Yard", CameraStatus::Online, &[]))
            .with_range(range("r1", "east", 0.0, 90.0, &["x"]))
            .with_range(range("r2", "west", 270.0, 360.0, &["y"])),
    )
}

async fn resolved_names(broker: &Broker, message_type: &str, body: serde_json::Value) -> Vec<String> {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = broker
        .subscribe(message_type, move |msg| {
            let names: Vec<String> = msg.cameras.iter().map(|c| c.name.clone()).collect();
            sink.lock().unwrap().push(names);
            Ok(())
        })
        .unwrap();
    let result = broker.publish(message_type, payload(body)).await;
    assert!(result.success, "publish failed: {:?}", result.errors);
    broker.unsubscribe(message_type, id);
    let mut guard = seen.lock().unwrap();
    guard.pop().unwrap_or_default()
}

#[tokio::test]
async fn negative_angle_wraps_into_matching_range() {
    let broker = broker_with(angle_fixture_repo());
    let names = resolved_names(&broker, "angle_value", json!({"angle": -10.0})).await;
    assert_eq!(names, vec!["Yard".to_string()]);
}

#[tokio::test]
async fn wrap_boundaries_land_on_half_open_intervals() {
    let repo = Arc::new(
        MockRepository::new()
            .with_camera(camera("x", "Xenon", CameraStatus::Online, &[]))
            .with_range(range("south", "south", 180.0, 190.0, &["x"]))
            .with_range(range("north", "north", 0.0, 10.0, &["x"])),
    );
    let broker = broker_with(repo);

    // -180 wraps to 180, inside [180, 190).
    let names = resolved_names(&broker, "angle_value", json!({"angle": -180.0})).await;
    assert_eq!(names, vec!["Xenon".to_string()]);

    // 360 wraps to 0, inside [0, 10).
    let names = resolved_names(&broker, "angle_value", json!({"angle": 360.0})).await;
    assert_eq!(names, vec!["Xenon".to_string()]);
}

#[tokio::test]
async fn overlapping_ranges_union_without_duplicates() {
    let repo = Arc::new(
        MockRepository::new()
            .with_camera(camera("x", "Xenon", CameraStatus::Online, &[]))
            .with_camera(camera("y", "Yard", CameraStatus::Online, &[]))
            .with_range(range("wide", "wide", 0.0, 180.0, &["x", "y"]))
            .with_range(range("narrow", "narrow", 40.0, 50.0, &["y"])),
    );
    let broker = broker_with(repo);
    let names = resolved_names(&broker, "angle_value", json!({"angle": 45.0})).await;
    assert_eq!(names, vec!["Xenon".to_string(), "Yard".to_string()]);
}

#[tokio::test]
async fn angle_routing_keeps_offline_cameras_direction_routing_drops_them() {
    let repo = Arc::new(
        MockRepository::new()
            .with_camera(camera(
                "g",
                "Gate",
                CameraStatus::Offline,
                &[CameraDirection::Forward],
            ))
            .with_range(range("r", "east", 0.0, 90.0, &["g"])),
    );
    let broker = broker_with(repo);

    let names = resolved_names(&broker, "angle_value", json!({"angle": 30.0})).await;
    assert_eq!(names, vec!["Gate".to_string()]);

    let names = resolved_names(&broker, "direction_result", json!({"command": "forward"})).await;
    assert!(names.is_empty());
}

#[tokio::test]
async fn unknown_camera_ids_in_ranges_are_skipped() {
    let repo = Arc::new(
        MockRepository::new()
            .with_camera(camera("x", "Xenon", CameraStatus::Online, &[]))
            .with_range(range("r", "east", 0.0, 90.0, &["ghost", "x"])),
    );
    let broker = broker_with(repo);
    let names = resolved_names(&broker, "angle_value", json!({"angle": 10.0})).await;
    assert_eq!(names, vec!["Xenon".to_string()]);
}

#[tokio::test]
async fn transient_repository_failure_degrades_to_empty_cameras() {
    let repo = angle_fixture_repo();
    repo.set_behavior(RepoOp::CamerasByDirection, RepoBehavior::Transient);
    let broker = broker_with(Arc::clone(&repo));
    let (_, count) = counting_subscriber(&broker, "direction_result");

    let result = broker
        .publish("direction_result", payload(json!({"command": "forward"})))
        .await;

    assert!(result.success);
    assert_eq!(result.subscribers_notified, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    // Initial attempt plus three retries.
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 4);
}

#[tokio::test]
async fn recovery_within_retry_budget_serves_fresh_data() {
    let repo = Arc::new(
        MockRepository::new().with_camera(camera(
            "a",
            "Atrium",
            CameraStatus::Online,
            &[CameraDirection::Forward],
        )),
    );
    repo.set_behavior(RepoOp::CamerasByDirection, RepoBehavior::TransientTimes(2));
    let broker = broker_with(Arc::clone(&repo));

    let names = resolved_names(&broker, "direction_result", json!({"command": "forward"})).await;
    assert_eq!(names, vec!["Atrium".to_string()]);
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 3);
}

#[tokio::test]
async fn fallback_serves_last_known_good_after_invalidation() {
    let repo = Arc::new(
        MockRepository::new().with_camera(camera(
            "a",
            "Atrium",
            CameraStatus::Online,
            &[CameraDirection::Forward],
        )),
    );
    let broker = broker_with(Arc::clone(&repo));

    let names = resolved_names(&broker, "direction_result", json!({"command": "forward"})).await;
    assert_eq!(names, vec!["Atrium".to_string()]);

    // Repository goes dark; the cache is flushed so the next resolution must
    // go upstream, exhaust retries, and fall back to the stale value.
    repo.set_behavior(RepoOp::CamerasByDirection, RepoBehavior::Transient);
    broker.invalidate_routing_cache();

    let names = resolved_names(&broker, "direction_result", json!({"command": "forward"})).await;
    assert_eq!(names, vec!["Atrium".to_string()]);
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 1 + 4);
}

#[tokio::test]
async fn repeated_publishes_hit_the_query_cache() {
    let repo = angle_fixture_repo();
    let broker = broker_with(Arc::clone(&repo));

    for _ in 0..3 {
        broker
            .publish("direction_result", payload(json!({"command": "forward"})))
            .await;
    }
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 1);
}

#[tokio::test]
async fn cache_entries_expire_after_ttl() {
    let repo = angle_fixture_repo();
    let mut cfg = fast_config();
    cfg.resolver.cache_ttl = Duration::from_millis(50);
    let broker = Broker::builder()
        .repository(Arc::clone(&repo) as Arc<dyn RoutingRepository>)
        .config(cfg)
        .build()
        .unwrap();

    broker
        .publish("direction_result", payload(json!({"command": "forward"})))
        .await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    broker
        .publish("direction_result", payload(json!({"command": "forward"})))
        .await;

    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 2);
}

#[tokio::test]
async fn explicit_invalidation_forces_a_reload() {
    let repo = angle_fixture_repo();
    let broker = broker_with(Arc::clone(&repo));

    broker
        .publish("angle_value", payload(json!({"angle": 10.0})))
        .await;
    broker.invalidate_routing_cache();
    broker
        .publish("angle_value", payload(json!({"angle": 10.0})))
        .await;

    assert_eq!(repo.calls(RepoOp::AngleRangesEnabled), 2);
}

#[tokio::test]
async fn concurrent_first_lookups_coalesce_into_one_query() {
    let repo = angle_fixture_repo();
    let broker = Arc::new(broker_with(Arc::clone(&repo)));

    let publishes = (0..8).map(|_| {
        let broker = Arc::clone(&broker);
        async move {
            broker
                .publish("direction_result", payload(json!({"command": "forward"})))
                .await
        }
    });
    let results = futures::future::join_all(publishes).await;

    assert!(results.iter().all(|r| r.success));
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 1);
}

#[tokio::test]
async fn camera_order_is_deterministic_across_publishes() {
    let repo = Arc::new(
        MockRepository::new()
            .with_camera(camera("3", "Gamma", CameraStatus::Online, &[]))
            .with_camera(camera("1", "Alpha", CameraStatus::Online, &[]))
            .with_camera(camera("2", "Beta", CameraStatus::Online, &[]))
            .with_range(range("r", "all", 0.0, 360.0, &["3", "1", "2"])),
    );
    let broker = broker_with(repo);

    let first = resolved_names(&broker, "angle_value", json!({"angle": 123.4})).await;
    let second = resolved_names(&broker, "angle_value", json!({"angle": 123.4})).await;

    assert_eq!(first, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn ai_alerts_route_to_no_cameras_by_default() {
    let broker = broker_with(angle_fixture_repo());
    let names = resolved_names(
        &broker,
        "ai_alert",
        json!({"alert_type": "intrusion", "severity": "high"}),
    )
    .await;
    assert!(names.is_empty());
}

struct PinnedAlertPolicy(Camera);

#[async_trait]
impl AlertRoutingPolicy for PinnedAlertPolicy {
    async fn cameras_for_alert(&self, _message: &MessageData) -> Result<Vec<Camera>, VigilError> {
        Ok(vec![self.0.clone()])
    }
}

#[tokio::test]
async fn site_alert_policy_overrides_the_default() {
    let pinned = camera("p", "Perimeter", CameraStatus::Online, &[]);
    let broker = Broker::builder()
        .repository(angle_fixture_repo())
        .config(fast_config())
        .alert_policy(Arc::new(PinnedAlertPolicy(pinned)))
        .build()
        .unwrap();

    let names = resolved_names(
        &broker,
        "ai_alert",
        json!({"alert_type": "intrusion", "severity": "critical"}),
    )
    .await;
    assert_eq!(names, vec!["Perimeter".to_string()]);
}

#[tokio::test]
async fn fatal_repository_errors_skip_the_retry_loop() {
    let repo = angle_fixture_repo();
    repo.set_behavior(RepoOp::CamerasByDirection, RepoBehavior::Fatal);
    let broker = broker_with(Arc::clone(&repo));

    let result = broker
        .publish("direction_result", payload(json!({"command": "forward"})))
        .await;

    assert!(result.success);
    assert_eq!(repo.calls(RepoOp::CamerasByDirection), 1);
}
