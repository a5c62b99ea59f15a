//! Custom Axum extractors

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::Json;
use freshbites_core::ConnectionDescriptor;
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// `Json<T>` whose rejection is the failure envelope instead of plain text.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: rejection.body_text(),
            })?;
        Ok(Self(value))
    }
}

/// Connection descriptor body that may be absent.
///
/// An empty body, `null`, `{}` or a descriptor with every field unset
/// selects the default pool. Content type is not checked.
pub struct OptionalDescriptor(pub Option<ConnectionDescriptor>);

impl<S> FromRequest<S> for OptionalDescriptor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: rejection.body_text(),
            })?;

        Ok(Self(parse_descriptor(&bytes)?))
    }
}

fn parse_descriptor(bytes: &[u8]) -> Result<Option<ConnectionDescriptor>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let descriptor: Option<ConnectionDescriptor> =
        serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequest {
            message: format!("invalid connection descriptor: {}", e),
        })?;

    Ok(descriptor.filter(|d| !d.is_blank()))
}
