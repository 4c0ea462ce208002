//! Hardware API endpoints.
//!
//! Called by the service microservice to register, stop and rescale
//! services, and by the device microservice to build and assemble devices.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use rig_hardware::{PartSelection, Resources};
use rig_id::{DeviceId, ServiceId, UserId};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::request_context::{OrProblem, RequestContext};
use crate::guards::{can_access_device, device_exists, device_powered_on, GuardError};
use crate::model::InstalledPart;
use crate::outbound::Device;
use crate::scheduler::Allocation;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/build", post(build))
        .route("/assemble", post(assemble))
        .route("/register", post(register))
        .route("/stop", post(stop))
        .route("/scale", post(scale))
        .route("/release", post(release))
        .route("/devices/{device_id}/resources", get(device_resources))
        .route("/devices/{device_id}/parts", get(device_parts))
        .route("/services/{service_id}/usage", get(service_usage))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildResponse {
    pub success: bool,
    pub performance: Resources,
}

#[derive(Debug, Deserialize)]
pub struct AssembleRequest {
    pub device_id: DeviceId,
    pub user_id: UserId,
    pub parts: PartSelection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssembleResponse {
    pub device_id: DeviceId,
    pub performance: Resources,
}

/// Register and scale share a shape: the caller names the service and
/// lists its nominal demand inline.
#[derive(Debug, Deserialize)]
pub struct DemandRequest {
    pub device_id: DeviceId,
    pub service_id: ServiceId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub demand: Resources,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub service_id: ServiceId,
    #[serde(flatten)]
    pub delivered: Resources,
}

impl From<Allocation> for AllocationResponse {
    fn from(allocation: Allocation) -> Self {
        Self {
            service_id: allocation.service_id,
            delivered: allocation.delivered,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub device_id: DeviceId,
    pub service_id: ServiceId,
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub device_id: DeviceId,
    pub user_id: UserId,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub stopped_services: usize,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartsResponse {
    pub items: Vec<InstalledPart>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Load the device and check that `user_id` owns it.
async fn owned_device(
    state: &AppState,
    device_id: &DeviceId,
    user_id: &UserId,
) -> Result<Device, GuardError> {
    device_exists(state.directory(), device_id)
        .await
        .and_then(|device| can_access_device(device, user_id))
}

/// Validate a parts selection and return its capacity. Nothing is stored.
///
/// POST /v1/hardware/build
async fn build(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<PartSelection>, JsonRejection>,
) -> Result<Json<BuildResponse>, ApiError> {
    let Json(selection) = payload.or_problem(&ctx)?;
    let performance = state.assembler().preview(&selection).or_problem(&ctx)?;

    Ok(Json(BuildResponse {
        success: true,
        performance,
    }))
}

/// POST /v1/hardware/assemble
async fn assemble(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Result<Json<AssembleResponse>, ApiError> {
    let Json(req) = payload.or_problem(&ctx)?;
    let device = owned_device(&state, &req.device_id, &req.user_id)
        .await
        .or_problem(&ctx)?;

    let performance = state
        .assembler()
        .assemble(&device, &req.parts)
        .await
        .or_problem(&ctx)?;

    Ok(Json(AssembleResponse {
        device_id: device.id,
        performance,
    }))
}

/// POST /v1/hardware/register
async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<DemandRequest>, JsonRejection>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let Json(req) = payload.or_problem(&ctx)?;
    let device = owned_device(&state, &req.device_id, &req.user_id)
        .await
        .and_then(device_powered_on)
        .or_problem(&ctx)?;

    let allocation = state
        .scheduler()
        .register(&device, req.service_id, req.demand)
        .await
        .or_problem(&ctx)?;

    Ok(Json(allocation.into()))
}

/// POST /v1/hardware/stop
async fn stop(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<StopRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(req) = payload.or_problem(&ctx)?;
    let device = owned_device(&state, &req.device_id, &req.user_id)
        .await
        .or_problem(&ctx)?;

    state
        .scheduler()
        .stop(&device, req.service_id)
        .await
        .or_problem(&ctx)?;

    Ok(Json(OkResponse { ok: true }))
}

/// POST /v1/hardware/scale
async fn scale(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<DemandRequest>, JsonRejection>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let Json(req) = payload.or_problem(&ctx)?;
    let device = owned_device(&state, &req.device_id, &req.user_id)
        .await
        .or_problem(&ctx)?;

    let allocation = state
        .scheduler()
        .rescale(&device, req.service_id, req.demand)
        .await
        .or_problem(&ctx)?;

    Ok(Json(allocation.into()))
}

/// POST /v1/hardware/release
async fn release(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<ReleaseRequest>, JsonRejection>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let Json(req) = payload.or_problem(&ctx)?;
    let device = owned_device(&state, &req.device_id, &req.user_id)
        .await
        .or_problem(&ctx)?;

    let released = state
        .scheduler()
        .release(&device, req.delete)
        .await
        .or_problem(&ctx)?;

    Ok(Json(ReleaseResponse {
        stopped_services: released.stopped_services,
        deleted: released.deleted,
    }))
}

/// Utilization of each resource, in `[0, 1]`.
///
/// GET /v1/hardware/devices/{device_id}/resources
async fn device_resources(
    State(state): State<AppState>,
    ctx: RequestContext,
    device_id: Result<Path<DeviceId>, PathRejection>,
) -> Result<Json<Resources>, ApiError> {
    let Path(device_id) = device_id.or_problem(&ctx)?;
    let utilization = state
        .scheduler()
        .resources(&device_id)
        .await
        .or_problem(&ctx)?;
    Ok(Json(utilization))
}

/// GET /v1/hardware/devices/{device_id}/parts
async fn device_parts(
    State(state): State<AppState>,
    ctx: RequestContext,
    device_id: Result<Path<DeviceId>, PathRejection>,
) -> Result<Json<PartsResponse>, ApiError> {
    let Path(device_id) = device_id.or_problem(&ctx)?;
    let items = state.store().list_hardware(&device_id).or_problem(&ctx)?;
    if items.is_empty() {
        return Err(ApiError::not_found("device_not_found", "device has no hardware")
            .with_request_id(ctx.request_id));
    }
    Ok(Json(PartsResponse { items }))
}

/// Delivered allocation of a running service.
///
/// GET /v1/hardware/services/{service_id}/usage
async fn service_usage(
    State(state): State<AppState>,
    ctx: RequestContext,
    service_id: Result<Path<ServiceId>, PathRejection>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let Path(service_id) = service_id.or_problem(&ctx)?;
    let allocation = state
        .scheduler()
        .real_use(service_id)
        .await
        .or_problem(&ctx)?;
    Ok(Json(allocation.into()))
}
