//! HMAC request signing for the TCN authentication scheme.
//!
//! Every request carries two headers:
//!
//! ```text
//! Authorization: TCN <api_token>:<digest>
//! X-Timestamp:   2024-01-01T00:00:00Z
//! ```
//!
//! where `digest` is `Base64(HMAC-SHA256(secret, METHOD+path+timestamp))`.
//! The path is percent-encoded per segment and lowercased, and the query
//! string is not signed.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tcn_auth::{
//!     ApiCredentials, RequestAuthenticator, SigningConfig, StaticCredentialProvider, Verifier,
//!     VerifierConfig,
//! };
//!
//! let credentials = ApiCredentials::new("client-a", "s3cr3t").unwrap();
//!
//! // Client side: sign an outgoing request.
//! let authenticator = RequestAuthenticator::new(SigningConfig::new(credentials.clone())).unwrap();
//! let mut request = http::Request::post("https://api.example.com/orders/42")
//!     .body(())
//!     .unwrap();
//! authenticator.authenticate(&mut request).unwrap();
//!
//! // Server side: verify it.
//! let provider = StaticCredentialProvider::from(&credentials);
//! let verifier = Verifier::new(Arc::new(provider), VerifierConfig::default());
//! let (parts, ()) = request.into_parts();
//! let verified = verifier.verify(&parts).unwrap();
//! assert_eq!(verified.api_token, "client-a");
//! ```
//!
//! # Modules
//!
//! - [`authenticator`] - Attaches `Authorization` and `X-Timestamp` to outgoing requests
//! - [`canonical`] - Canonical string and path normalization
//! - [`config`] - Signing and verification configuration
//! - [`credentials`] - API credentials and secret lookup
//! - [`error`] - Error types
//! - [`signer`] - HMAC-SHA256 digests
//! - [`template`] - Route templates with path variables
//! - [`timestamp`] - Request timestamps and the freshness window
//! - [`verifier`] - Server-side verification

pub mod authenticator;
pub mod canonical;
pub mod config;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod template;
pub mod timestamp;
pub mod verifier;

pub use authenticator::{RequestAuthenticator, SignableRequest, SignedHeaders, X_TIMESTAMP};
pub use canonical::{CanonicalString, canonical_path};
pub use config::{SigningConfig, VerifierConfig};
pub use credentials::{
    ApiCredentials, CredentialProvider, StaticCredentialProvider, parse_credential_list,
};
pub use error::{AuthError, ErrorKind, Rejection};
pub use signer::{SignatureDigest, sign};
pub use template::{PathVariables, RouteTemplate};
pub use timestamp::Timestamp;
pub use verifier::{VerifiedRequest, Verifier, parse_authorization_header};
