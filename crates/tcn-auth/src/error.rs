//! Error types for TCN request signing and verification.
//!
//! All failures are represented by [`AuthError`]. Callers that need to tell
//! "cannot build the request" apart from "the request was rejected" use
//! [`AuthError::kind`].

/// Why a received request was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The authentication headers are missing or cannot be parsed.
    Malformed,
    /// The timestamp lies outside the configured tolerance window.
    Stale,
    /// No shared secret is registered for the presented API token.
    UnknownToken,
    /// The recomputed digest differs from the presented one.
    BadSignature,
}

impl Rejection {
    /// Stable lowercase name, used in logs and HTTP error bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Stale => "stale",
            Self::UnknownToken => "unknown_token",
            Self::BadSignature => "bad_signature",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid token, secret or marker. Fatal, never retried.
    Configuration,
    /// Input that cannot be represented in the canonical string or a header.
    Encoding,
    /// The verifier refused the request.
    Rejected(Rejection),
}

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The API token is empty or contains whitespace.
    #[error("Invalid API token")]
    InvalidApiToken,

    /// The shared secret is empty.
    #[error("Shared secret must not be empty")]
    EmptySecret,

    /// The service marker is empty or contains whitespace.
    #[error("Invalid service marker: {0:?}")]
    InvalidServiceMarker(String),

    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set to an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// A field of the signing input cannot be placed in the canonical string.
    #[error("Invalid signing input: {0}")]
    InvalidSigningInput(String),

    /// A computed header value is not a valid HTTP header value.
    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(&'static str),

    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The `Authorization` header uses a scheme other than the configured marker.
    #[error("Unsupported authorization scheme: {0}")]
    UnsupportedScheme(String),

    /// The `X-Timestamp` header is missing from the request.
    #[error("Missing X-Timestamp header")]
    MissingTimestamp,

    /// The `X-Timestamp` header is not a UTC timestamp.
    #[error("Invalid X-Timestamp header: {0}")]
    InvalidTimestamp(String),

    /// The request timestamp is outside the tolerance window.
    #[error("Request timestamp is outside the allowed window (skew {skew_secs}s, tolerance {tolerance_secs}s)")]
    RequestStale {
        /// Signed difference `now - timestamp`, in seconds.
        skew_secs: i64,
        /// The configured tolerance, in seconds.
        tolerance_secs: u64,
    },

    /// The API token was not found in the credential store.
    #[error("API token not found: {0}")]
    TokenNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
}

impl AuthError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidApiToken
            | Self::EmptySecret
            | Self::InvalidServiceMarker(_)
            | Self::MissingEnvVar(_)
            | Self::InvalidEnvVar { .. } => ErrorKind::Configuration,
            Self::InvalidSigningInput(_) | Self::InvalidHeaderValue(_) => ErrorKind::Encoding,
            Self::MissingAuthHeader
            | Self::InvalidAuthHeader
            | Self::UnsupportedScheme(_)
            | Self::MissingTimestamp
            | Self::InvalidTimestamp(_) => ErrorKind::Rejected(Rejection::Malformed),
            Self::RequestStale { .. } => ErrorKind::Rejected(Rejection::Stale),
            Self::TokenNotFound(_) => ErrorKind::Rejected(Rejection::UnknownToken),
            Self::SignatureDoesNotMatch => ErrorKind::Rejected(Rejection::BadSignature),
        }
    }

    /// The rejection reason, if this error came from verification.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self.kind() {
            ErrorKind::Rejected(rejection) => Some(rejection),
            ErrorKind::Configuration | ErrorKind::Encoding => None,
        }
    }

    /// Whether this error is a configuration problem on the signing side.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
