//! Common error types

use thiserror::Error;

/// Common errors across Hermes
#[derive(Error, Debug)]
pub enum HermesError {
    // Authentication errors
    /// No credential on the request
    #[error("missing credentials")]
    MissingCredentials,

    /// API key did not match any user
    #[error("invalid api key")]
    InvalidApiKey,

    /// Internal service key did not match any configured entry
    #[error("invalid internal api key")]
    InvalidInternalKey,

    /// Session token did not match any session
    #[error("invalid token")]
    InvalidToken,

    /// User exists but is not active
    #[error("user is not active")]
    UserInactive,

    // Subscription / quota errors
    /// No active subscription for the user
    #[error("no active subscription found")]
    NoActiveSubscription,

    /// Subscription passed its expiry date
    #[error("subscription expired on {0}")]
    SubscriptionExpired(String),

    /// Connected-session cap reached
    #[error("session limit exceeded. Maximum allowed: {max}, current: {current}")]
    SessionLimitExceeded { max: i32, current: i64 },

    /// Per-subscription message cap reached
    #[error("message quota exceeded")]
    MessageQuotaExceeded,

    /// Scoped internal key used outside its source
    #[error("forbidden: {0}")]
    Forbidden(String),

    // Rate limiting
    /// Coarse window exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// IP is on the spam blocklist
    #[error("ip blocked due to spam")]
    IpBlocked,

    // Validation errors
    /// Malformed request
    #[error("validation error: {0}")]
    Validation(String),

    /// Image format the upstream cannot deliver
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// Bad `send_sync` / timezone input
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    // Resource errors
    /// Resource not found (generic)
    #[error("{0} not found")]
    NotFound(String),

    /// Conflicting state transition (e.g. deleting a processing campaign)
    #[error("conflict: {0}")]
    Conflict(String),

    // External service errors
    /// Upstream returned an error or unusable response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Upstream did not answer in time
    #[error("upstream timeout")]
    UpstreamTimeout,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    // Internal errors
    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl HermesError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::Validation(_)
            | Self::UnsupportedImageFormat(_)
            | Self::InvalidSchedule(_)
            | Self::Conflict(_) => 400,

            // 401 Unauthorized
            Self::MissingCredentials
            | Self::InvalidApiKey
            | Self::InvalidInternalKey
            | Self::InvalidToken => 401,

            // 403 Forbidden
            Self::UserInactive
            | Self::NoActiveSubscription
            | Self::SubscriptionExpired(_)
            | Self::SessionLimitExceeded { .. }
            | Self::MessageQuotaExceeded
            | Self::Forbidden(_) => 403,

            // 404 Not Found
            Self::NotFound(_) => 404,

            // 429 Too Many Requests
            Self::RateLimitExceeded | Self::IpBlocked => 429,

            // 502 Bad Gateway
            Self::Upstream(_) | Self::UpstreamTimeout => 502,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) | Self::Config(_) => 500,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::InvalidInternalKey => "INVALID_INTERNAL_KEY",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UserInactive => "USER_INACTIVE",
            Self::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            Self::SubscriptionExpired(_) => "SUBSCRIPTION_EXPIRED",
            Self::SessionLimitExceeded { .. } => "SESSION_LIMIT_EXCEEDED",
            Self::MessageQuotaExceeded => "MESSAGE_QUOTA_EXCEEDED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::IpBlocked => "IP_BLOCKED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnsupportedImageFormat(_) => "UNSUPPORTED_IMAGE_FORMAT",
            Self::InvalidSchedule(_) => "INVALID_SCHEDULE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type alias for Hermes operations
pub type HermesResult<T> = Result<T, HermesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_map_to_401() {
        assert_eq!(HermesError::MissingCredentials.status_code(), 401);
        assert_eq!(HermesError::InvalidToken.status_code(), 401);
    }

    #[test]
    fn test_quota_errors_map_to_403() {
        assert_eq!(HermesError::MessageQuotaExceeded.status_code(), 403);
        assert_eq!(
            HermesError::SessionLimitExceeded { max: 1, current: 1 }.status_code(),
            403
        );
        assert_eq!(
            HermesError::SubscriptionExpired("2025-01-01".into()).status_code(),
            403
        );
    }

    #[test]
    fn test_upstream_errors_map_to_502() {
        assert_eq!(HermesError::UpstreamTimeout.status_code(), 502);
        assert_eq!(HermesError::Upstream("boom".into()).status_code(), 502);
    }

    #[test]
    fn test_session_limit_message() {
        let err = HermesError::SessionLimitExceeded { max: 2, current: 2 };
        assert_eq!(
            err.to_string(),
            "session limit exceeded. Maximum allowed: 2, current: 2"
        );
    }
}
