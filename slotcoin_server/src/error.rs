use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use slotcoin_shared::{ErrorBody, ErrorKind, ERROR_KIND_HEADER};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing bearer token")]
    Unauthorized,
    #[error("token rejected by identity provider")]
    Forbidden,
    #[error("no profile for this identity")]
    NotFound,
    #[error("balance {balance} is below the spin cost {cost}")]
    InsufficientFunds { balance: i64, cost: u32 },
    #[error("settlement failed: {0}")]
    Persistence(String),
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("profile already exists")]
    AlreadyExists,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::Forbidden => ErrorKind::Forbidden,
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            ApiError::Persistence(_) => ErrorKind::PersistenceError,
            ApiError::Unavailable(_) => ErrorKind::Unavailable,
            ApiError::Invalid(_) => ErrorKind::InvalidRequest,
            ApiError::AlreadyExists => ErrorKind::Conflict,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match &self {
            ApiError::Persistence(_) | ApiError::Unavailable(_) => {
                error!(kind = kind.as_str(), "{self}")
            }
            _ => debug!(kind = kind.as_str(), "{self}"),
        }
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = match self {
            ApiError::Unauthorized => (status, "Unauthorized").into_response(),
            ApiError::Forbidden => (status, "Invalid token").into_response(),
            ApiError::NotFound => (status, "Profile not found").into_response(),
            ApiError::InsufficientFunds { .. } => {
                (status, Json(ErrorBody::new("Not enough coins"))).into_response()
            }
            ApiError::Persistence(_) => (status, "Could not update coins").into_response(),
            ApiError::Unavailable(_) => (status, "Service unavailable").into_response(),
            ApiError::Invalid(_) => {
                (status, Json(ErrorBody::new("Missing required fields"))).into_response()
            }
            ApiError::AlreadyExists => {
                (status, Json(ErrorBody::new("Profile already exists"))).into_response()
            }
        };
        response.headers_mut().insert(
            ERROR_KIND_HEADER,
            HeaderValue::from_static(kind.as_str()),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ApiError::Unauthorized, 401),
            (ApiError::Forbidden, 403),
            (ApiError::NotFound, 404),
            (ApiError::InsufficientFunds { balance: 5, cost: 10 }, 400),
            (ApiError::Persistence("x".into()), 500),
            (ApiError::Unavailable("x".into()), 503),
            (ApiError::AlreadyExists, 409),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            let response = err.into_response();
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(
                response.headers().get(ERROR_KIND_HEADER).unwrap(),
                kind.as_str()
            );
        }
    }
}
