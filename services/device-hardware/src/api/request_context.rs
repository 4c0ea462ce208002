//! Request-scoped context extracted from HTTP requests.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rig_id::RequestId;

use crate::api::error::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| RequestId::new().to_string());

        Ok(Self { request_id })
    }
}

/// Attach the request id to any error convertible into an [`ApiError`].
pub trait OrProblem<T> {
    fn or_problem(self, ctx: &RequestContext) -> Result<T, ApiError>;
}

impl<T, E> OrProblem<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn or_problem(self, ctx: &RequestContext) -> Result<T, ApiError> {
        self.map_err(|e| e.into().with_request_id(ctx.request_id.clone()))
    }
}
