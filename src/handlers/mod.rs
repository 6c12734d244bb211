pub mod alerts;
pub mod audit;
pub mod auth;
pub mod users;

use axum::extract::{FromRequestParts, Path, Query, Request};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

const MAX_JSON_BODY: usize = 1024 * 1024;

/// Read and deserialize a JSON body from a raw request. Malformed JSON maps
/// to an `InvalidJson` envelope instead of a bare framework rejection.
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|_| ApiError::bad_request("Failed to read request body"))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::invalid_json(e.to_string()))
}

/// Extract a typed path parameter from a raw request.
pub(crate) async fn path_param<T>(request: Request) -> Result<T, ApiError>
where
    T: DeserializeOwned + Send,
{
    let (mut parts, _) = request.into_parts();
    let Path(value) = Path::<T>::from_request_parts(&mut parts, &())
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(value)
}

/// Extract typed query parameters from a raw request.
pub(crate) async fn query_params<T>(request: Request) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let (mut parts, _) = request.into_parts();
    let Query(value) = Query::<T>::from_request_parts(&mut parts, &())
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(value)
}
