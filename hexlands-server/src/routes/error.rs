//! Error responses and request headers shared by the handlers

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hexlands_core::{ErrorClass, GameError, ParticipantId};
use tracing::debug;

/// Caller identity, trusted as given
pub const PARTICIPANT_HEADER: &str = "x-participant-id";
/// Client token for at-most-once mutations
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";
/// Set on responses served from the idempotency store
pub const REPLAY_HEADER: &str = "idempotent-replay";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL",
            message: message.into(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        let status = match (&err, err.class()) {
            (GameError::NotFound(_), _) => StatusCode::NOT_FOUND,
            (GameError::NotOwner { .. }, _) => StatusCode::FORBIDDEN,
            (GameError::Storage(_), _) => StatusCode::INTERNAL_SERVER_ERROR,
            (GameError::InvalidSlot(_), _) | (GameError::InvalidMap(_), _) => StatusCode::BAD_REQUEST,
            (_, ErrorClass::Timing) | (_, ErrorClass::Consistency) => StatusCode::CONFLICT,
            (_, ErrorClass::Rule) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorClass::Lookup) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(status = %self.status, code = self.code, message = %self.message, "request rejected");
        (
            self.status,
            Json(serde_json::json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}

/// Participant id from the identity header
pub fn caller(headers: &HeaderMap) -> Result<ParticipantId, ApiError> {
    let raw = headers
        .get(PARTICIPANT_HEADER)
        .ok_or_else(|| ApiError::bad_request(format!("missing {PARTICIPANT_HEADER} header")))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ApiError::bad_request(format!("malformed {PARTICIPANT_HEADER} header")))
}

/// Client idempotency token, if one was sent
pub fn idempotency_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GameError::NotYourTurn(2), StatusCode::CONFLICT),
            (GameError::IllegalMove("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (GameError::InvalidSlot(4), StatusCode::BAD_REQUEST),
            (GameError::SchemaMismatch { snapshot: 1, live: 2 }, StatusCode::CONFLICT),
            (GameError::NotFound("game 9".into()), StatusCode::NOT_FOUND),
            (GameError::InvalidMap("no tiles".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn test_caller_header() {
        let mut headers = HeaderMap::new();
        assert!(caller(&headers).is_err());
        headers.insert(PARTICIPANT_HEADER, "2".parse().unwrap());
        assert_eq!(caller(&headers).unwrap(), 2);
        headers.insert(PARTICIPANT_HEADER, "bob".parse().unwrap());
        assert_eq!(caller(&headers).unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
