use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rig_hardware::CompatibilityError;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::assembler::AssemblyError;
use crate::guards::GuardError;
use crate::scheduler::SchedulerError;
use crate::store::StoreError;

/// RFC 7807 problem details.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub code: String,
    pub request_id: String,
    pub retryable: bool,
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("https://rig.dev/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            code,
            request_id: "unknown".to_string(),
            retryable: false,
        }
    }

    fn set_request_id(&mut self, request_id: impl Into<String>) {
        let request_id = request_id.into();
        self.request_id = request_id.clone();
        if self.instance.is_none() {
            self.instance = Some(request_id);
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails::new(status, code, message));
        Self { status, problem }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, code, message)
    }

    pub fn unprocessable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    /// A sibling service failed or did not answer in time.
    pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::with_status(StatusCode::BAD_GATEWAY, code, message);
        err.problem.retryable = true;
        err
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.problem.set_request_id(request_id);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "Store operation failed");
        ApiError::internal(err.code(), "internal storage error")
    }
}

impl From<CompatibilityError> for ApiError {
    fn from(err: CompatibilityError) -> Self {
        ApiError::unprocessable(err.code(), "parts are not compatible")
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let code = err.code();
        match err {
            SchedulerError::DeviceNotFound
            | SchedulerError::ServiceNotRunning
            | SchedulerError::ServiceNotFound => ApiError::not_found(code, err.to_string()),
            SchedulerError::ServiceAlreadyRunning => ApiError::conflict(code, err.to_string()),
            SchedulerError::InvalidDemand => ApiError::bad_request(code, err.to_string()),
            SchedulerError::Store(e) => e.into(),
        }
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        let code = err.code();
        match err {
            GuardError::DeviceNotFound => ApiError::not_found(code, err.to_string()),
            GuardError::PermissionDenied => ApiError::forbidden(code, err.to_string()),
            GuardError::DevicePoweredOff => ApiError::conflict(code, err.to_string()),
            GuardError::Directory(e) => {
                error!(error = %e, "Device lookup failed");
                ApiError::bad_gateway(code, "device service unavailable")
            }
        }
    }
}

impl From<AssemblyError> for ApiError {
    fn from(err: AssemblyError) -> Self {
        let code = err.code();
        match err {
            AssemblyError::Incompatible(e) => e.into(),
            AssemblyError::DegenerateCapacity | AssemblyError::NotInInventory(_) => {
                ApiError::unprocessable(code, err.to_string())
            }
            AssemblyError::AlreadyAssembled => ApiError::conflict(code, err.to_string()),
            AssemblyError::Inventory(e) => {
                error!(error = %e, "Inventory call failed");
                ApiError::bad_gateway(code, "inventory service unavailable")
            }
            AssemblyError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("invalid_request", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request("invalid_path", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_hardware::PartCategory;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                SchedulerError::ServiceAlreadyRunning.into(),
                StatusCode::CONFLICT,
                "service_already_running",
            ),
            (
                SchedulerError::ServiceNotRunning.into(),
                StatusCode::NOT_FOUND,
                "service_not_running",
            ),
            (
                GuardError::PermissionDenied.into(),
                StatusCode::FORBIDDEN,
                "permission_denied",
            ),
            (
                AssemblyError::NotInInventory(PartCategory::PowerPack).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "powerPack_not_in_inventory",
            ),
            (
                CompatibilityError::ElementNotFound(PartCategory::Gpu).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "element_gpu_not_found",
            ),
            (
                StoreError::Poisoned.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status, status);
            assert_eq!(err.problem.code, code);
        }
    }

    #[test]
    fn test_request_id_fills_instance() {
        let err = ApiError::not_found("device_not_found", "gone").with_request_id("req_1");
        assert_eq!(err.problem.request_id, "req_1");
        assert_eq!(err.problem.instance.as_deref(), Some("req_1"));
    }

    #[test]
    fn test_bad_gateway_is_retryable() {
        let err = ApiError::bad_gateway("inventory_unavailable", "down");
        assert!(err.problem.retryable);
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }
}
