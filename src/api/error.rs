use reqwest::StatusCode;
use thiserror::Error;

/// Progress endpoint errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        let msg = if message.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            message
        };

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(msg),
            StatusCode::FORBIDDEN => ApiError::Unauthorized(msg),
            StatusCode::NOT_FOUND => ApiError::NotFound(msg),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(msg),
            status if status.is_server_error() => ApiError::ServerError(msg),
            status if status.is_client_error() => ApiError::BadRequest(msg),
            _ => ApiError::Unknown(msg),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::NetworkError(_) | ApiError::ServerError(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        let error = ApiError::from_status(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
        assert!(matches!(error, ApiError::Unauthorized(_)));

        let error = ApiError::from_status(StatusCode::NOT_FOUND, String::new());
        assert_eq!(error.to_string(), "Resource not found: Not Found");

        let error = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad plan".to_string());
        assert!(matches!(error, ApiError::BadRequest(_)));

        let error = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert!(matches!(error, ApiError::ServerError(_)));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ApiError::NetworkError("reset".to_string()).is_retryable());
        assert!(ApiError::ServerError("503".to_string()).is_retryable());
        assert!(!ApiError::NotFound("plan".to_string()).is_retryable());
        assert!(!ApiError::Rejected("nope".to_string()).is_retryable());
    }
}
