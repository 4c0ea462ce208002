//! HTTP API tests against the full router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rig_device_hardware::api::create_router;
use rig_device_hardware::assembler::Assembler;
use rig_device_hardware::outbound::local::{
    InMemoryDeviceDirectory, RecordingNotifier, RecordingScalingClient,
};
use rig_device_hardware::outbound::Device;
use rig_device_hardware::scheduler::{DeviceLocks, Scheduler};
use rig_device_hardware::state::AppState;
use rig_device_hardware::store::HardwareStore;
use rig_hardware::Catalog;
use rig_id::{DeviceId, ServiceId, UserId};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    scaling: Arc<RecordingScalingClient>,
    device: Device,
    powered_off: Device,
}

fn app() -> TestApp {
    let store = Arc::new(HardwareStore::open_in_memory().unwrap());
    let locks = Arc::new(DeviceLocks::new());
    let scaling = Arc::new(RecordingScalingClient::new());
    let timeout = Duration::from_millis(200);

    let directory = Arc::new(InMemoryDeviceDirectory::new());
    let device = Device {
        id: DeviceId::new(),
        owner: UserId::new(),
        powered_on: true,
    };
    let powered_off = Device {
        id: DeviceId::new(),
        owner: device.owner,
        powered_on: false,
    };
    directory.insert(device.clone());
    directory.insert(powered_off.clone());

    let scheduler = Scheduler::new(
        store.clone(),
        locks.clone(),
        scaling.clone(),
        Arc::new(RecordingNotifier::new()),
        timeout,
    );
    let assembler = Assembler::new(
        Arc::new(Catalog::bundled().unwrap()),
        store.clone(),
        locks,
        None,
        timeout,
    );

    TestApp {
        router: create_router(AppState::new(store, directory, scheduler, assembler)),
        scaling,
        device,
        powered_off,
    }
}

fn starter_parts() -> Value {
    json!({
        "mainboard": "Zero MX One",
        "cpu": ["CoreOne A100"],
        "ram": ["Crossfire ZX100"],
        "disk": ["HDD Elements Zero"],
        "processorCooler": ["CPU Cooler Mini"],
        "powerPack": "Crossfire XSOne 250 Watt",
        "case": "Mini-ITX"
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "req_test")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn assemble(app: &TestApp) {
    let (status, body) = post(
        &app.router,
        "/v1/hardware/assemble",
        json!({
            "device_id": app.device.id,
            "user_id": app.device.owner,
            "parts": starter_parts(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_build_is_deterministic() {
    let app = app();

    let (status, first) = post(&app.router, "/v1/hardware/build", starter_parts()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["performance"]["cpu"], 800.0);
    assert_eq!(first["performance"]["network"], 1000.0);

    let (_, second) = post(&app.router, "/v1/hardware/build", starter_parts()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_build_reports_first_violation() {
    let app = app();
    let mut parts = starter_parts();
    parts["ram"] = json!(["Crossfire ZX100", "Crossfire ZX100"]);

    let (status, body) = post(&app.router, "/v1/hardware/build", parts).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "not_enough_ram_slots");
    assert_eq!(body["request_id"], "req_test");

    let mut parts = starter_parts();
    parts["cpu"] = json!(["CoreOne Z9"]);
    let (_, body) = post(&app.router, "/v1/hardware/build", parts).await;
    assert_eq!(body["code"], "element_cpu_not_found");
}

#[tokio::test]
async fn test_register_and_query() {
    let app = app();
    assemble(&app).await;
    let service_id = ServiceId::new();

    let (status, body) = post(
        &app.router,
        "/v1/hardware/register",
        json!({
            "device_id": app.device.id,
            "service_id": service_id,
            "user_id": app.device.owner,
            "cpu": 1600.0,
            "ram": 0.0,
            "gpu": 0.0,
            "disk": 0.0,
            "network": 500.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["service_id"], service_id.to_string());
    assert_eq!(body["cpu"], 800.0);
    assert_eq!(body["network"], 500.0);

    let uri = format!("/v1/hardware/devices/{}/resources", app.device.id);
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpu"], 1.0);
    assert_eq!(body["network"], 0.5);
    assert_eq!(body["ram"], 0.0);

    let uri = format!("/v1/hardware/services/{service_id}/usage");
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpu"], 800.0);

    let uri = format!("/v1/hardware/devices/{}/parts", app.device.id);
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 7);

    let (status, body) = post(
        &app.router,
        "/v1/hardware/stop",
        json!({
            "device_id": app.device.id,
            "service_id": service_id,
            "user_id": app.device.owner,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_scale_pushes_to_other_services() {
    let app = app();
    assemble(&app).await;
    let first = ServiceId::new();
    let second = ServiceId::new();

    for id in [first, second] {
        let (status, _) = post(
            &app.router,
            "/v1/hardware/register",
            json!({
                "device_id": app.device.id,
                "service_id": id,
                "user_id": app.device.owner,
                "cpu": 200.0, "ram": 0.0, "gpu": 0.0, "disk": 0.0, "network": 0.0,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    app.scaling.take_pushes();

    let (status, body) = post(
        &app.router,
        "/v1/hardware/scale",
        json!({
            "device_id": app.device.id,
            "service_id": second,
            "user_id": app.device.owner,
            "cpu": 1400.0, "ram": 0.0, "gpu": 0.0, "disk": 0.0, "network": 0.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpu"], 700.0);

    let pushes = app.scaling.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].service_id, first);
    assert_eq!(pushes[0].allocation.cpu, 100.0);
}

#[tokio::test]
async fn test_guards() {
    let app = app();
    assemble(&app).await;
    let demand = |device: &Device, user: UserId| {
        json!({
            "device_id": device.id,
            "service_id": ServiceId::new(),
            "user_id": user,
            "cpu": 1.0, "ram": 0.0, "gpu": 0.0, "disk": 0.0, "network": 0.0,
        })
    };

    let (status, body) = post(
        &app.router,
        "/v1/hardware/register",
        demand(&app.device, UserId::new()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");

    let (status, body) = post(
        &app.router,
        "/v1/hardware/register",
        demand(&app.powered_off, app.powered_off.owner),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "device_powered_off");

    let stranger = Device {
        id: DeviceId::new(),
        ..app.device.clone()
    };
    let (status, body) = post(
        &app.router,
        "/v1/hardware/register",
        demand(&stranger, stranger.owner),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "device_not_found");
}

#[tokio::test]
async fn test_assemble_twice_conflicts() {
    let app = app();
    assemble(&app).await;

    let (status, body) = post(
        &app.router,
        "/v1/hardware/assemble",
        json!({
            "device_id": app.device.id,
            "user_id": app.device.owner,
            "parts": starter_parts(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "hardware_already_assembled");
}

#[tokio::test]
async fn test_release_with_delete_allows_reassembly() {
    let app = app();
    assemble(&app).await;

    let (status, body) = post(
        &app.router,
        "/v1/hardware/release",
        json!({
            "device_id": app.device.id,
            "user_id": app.device.owner,
            "delete": true,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let uri = format!("/v1/hardware/devices/{}/resources", app.device.id);
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "device_not_found");

    assemble(&app).await;
}

#[tokio::test]
async fn test_malformed_requests_are_problems() {
    let app = app();

    let (status, body) = post(&app.router, "/v1/hardware/build", json!({"cpu": 3})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = get(&app.router, "/v1/hardware/devices/not-an-id/resources").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_path");

    let (status, body) = post(
        &app.router,
        "/v1/hardware/register",
        json!({
            "device_id": app.device.id,
            "service_id": ServiceId::new(),
            "user_id": app.device.owner,
            "cpu": -1.0, "ram": 0.0, "gpu": 0.0, "disk": 0.0, "network": 0.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_demand");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let (status, body) = get(&app.router, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["database"]["status"], "ok");

    let (status, body) = get(&app.router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "device-hardware");
}
