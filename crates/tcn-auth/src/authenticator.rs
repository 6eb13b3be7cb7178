//! Client-side request authentication.
//!
//! [`RequestAuthenticator`] attaches two headers to an outgoing request:
//!
//! ```text
//! Authorization: <marker> <api_token>:<base64 digest>
//! X-Timestamp:   2024-01-01T00:00:00Z
//! ```
//!
//! Only the header map is touched. Existing values of either header are
//! replaced, never duplicated, and every call computes a fresh timestamp and
//! digest, so re-authenticating a retried request is always safe.

use chrono::{DateTime, Utc};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::debug;

use crate::canonical::{CanonicalString, canonical_path};
use crate::config::{SigningConfig, validate_service_marker};
use crate::credentials::ApiCredentials;
use crate::error::AuthError;
use crate::signer::{SignatureDigest, sign};
use crate::timestamp::Timestamp;

/// Name of the freshness header.
pub const X_TIMESTAMP: HeaderName = HeaderName::from_static("x-timestamp");

/// Separator between the API token and the digest in `Authorization`.
pub const TOKEN_DIGEST_SEPARATOR: char = ':';

/// A request the authenticator can sign.
///
/// The request exposes its method and the absolute path it will be sent to,
/// and lends out its header map for the two authentication headers.
pub trait SignableRequest {
    /// The HTTP method.
    fn method(&self) -> &Method;
    /// The percent-encoded absolute path, optionally followed by a query.
    fn path(&self) -> &str;
    /// Mutable access to the request headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl<B> SignableRequest for http::Request<B> {
    fn method(&self) -> &Method {
        http::Request::method(self)
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        http::Request::headers_mut(self)
    }
}

impl SignableRequest for http::request::Parts {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

/// The header values produced for one signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Full `Authorization` header value.
    pub authorization: String,
    /// The timestamp that was signed and goes into `X-Timestamp`.
    pub timestamp: Timestamp,
    /// The digest embedded in `authorization`.
    pub digest: SignatureDigest,
}

impl SignedHeaders {
    /// Set (or replace) `Authorization` and `X-Timestamp` in `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeaderValue`] if a value contains bytes not
    /// allowed in an HTTP header.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let authorization = HeaderValue::from_str(&self.authorization)
            .map_err(|_| AuthError::InvalidHeaderValue("authorization"))?;
        let timestamp = HeaderValue::from_str(self.timestamp.as_str())
            .map_err(|_| AuthError::InvalidHeaderValue("x-timestamp"))?;

        headers.insert(AUTHORIZATION, authorization);
        headers.insert(X_TIMESTAMP, timestamp);
        Ok(())
    }
}

/// Signs outgoing requests with a fixed API token, secret and scheme marker.
///
/// # Examples
///
/// ```
/// use tcn_auth::authenticator::{RequestAuthenticator, X_TIMESTAMP};
/// use tcn_auth::credentials::ApiCredentials;
///
/// let credentials = ApiCredentials::new("client-a", "s3cr3t").unwrap();
/// let authenticator = RequestAuthenticator::with_marker(credentials, "TCN").unwrap();
///
/// let mut request = http::Request::post("https://api.example.com/orders/42")
///     .body(())
///     .unwrap();
/// authenticator.authenticate(&mut request).unwrap();
///
/// let auth = request.headers()["authorization"].to_str().unwrap();
/// assert!(auth.starts_with("TCN client-a:"));
/// assert!(request.headers().contains_key(X_TIMESTAMP));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    credentials: ApiCredentials,
    service_marker: String,
}

impl RequestAuthenticator {
    /// Create an authenticator from a signing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidServiceMarker`] if the marker is empty or
    /// contains whitespace or `:`.
    pub fn new(config: SigningConfig) -> Result<Self, AuthError> {
        Self::with_marker(config.credentials, config.service_marker)
    }

    /// Create an authenticator from credentials and an explicit marker.
    ///
    /// # Errors
    ///
    /// See [`RequestAuthenticator::new`].
    pub fn with_marker(
        credentials: ApiCredentials,
        service_marker: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let service_marker = service_marker.into();
        validate_service_marker(&service_marker)?;
        Ok(Self {
            credentials,
            service_marker,
        })
    }

    /// The API token requests are signed for.
    #[must_use]
    pub fn api_token(&self) -> &str {
        self.credentials.api_token()
    }

    /// The scheme marker.
    #[must_use]
    pub fn service_marker(&self) -> &str {
        &self.service_marker
    }

    /// Compute the header values for a request without touching it.
    ///
    /// # Errors
    ///
    /// Returns the canonicalization errors of [`CanonicalString::new`].
    pub fn sign_parts(
        &self,
        method: &str,
        path: &str,
        timestamp: Timestamp,
    ) -> Result<SignedHeaders, AuthError> {
        let path = canonical_path(path);
        let canonical = CanonicalString::new(method, &path, &timestamp)?;
        let digest = sign(&canonical, self.credentials.expose_secret())?;

        debug!(
            api_token = %self.credentials.api_token(),
            canonical = %canonical,
            "Signed request"
        );

        let authorization = format!(
            "{} {}{TOKEN_DIGEST_SEPARATOR}{digest}",
            self.service_marker,
            self.credentials.api_token()
        );

        Ok(SignedHeaders {
            authorization,
            timestamp,
            digest,
        })
    }

    /// Sign a method/path pair and write the headers into `headers`.
    ///
    /// This is the entry point for transports whose request type does not
    /// implement [`SignableRequest`].
    ///
    /// # Errors
    ///
    /// See [`RequestAuthenticator::sign_parts`] and [`SignedHeaders::apply`].
    pub fn authenticate_headers(
        &self,
        method: &Method,
        path: &str,
        headers: &mut HeaderMap,
    ) -> Result<SignedHeaders, AuthError> {
        self.authenticate_headers_at(method, path, headers, Utc::now())
    }

    /// Like [`RequestAuthenticator::authenticate_headers`], at a given instant.
    ///
    /// # Errors
    ///
    /// See [`RequestAuthenticator::authenticate_headers`].
    pub fn authenticate_headers_at(
        &self,
        method: &Method,
        path: &str,
        headers: &mut HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, AuthError> {
        let signed = self.sign_parts(method.as_str(), path, Timestamp::from_datetime(now))?;
        signed.apply(headers)?;
        Ok(signed)
    }

    /// Sign `request` with the current time and attach the headers.
    ///
    /// # Errors
    ///
    /// See [`RequestAuthenticator::authenticate_headers`].
    pub fn authenticate<R: SignableRequest + ?Sized>(
        &self,
        request: &mut R,
    ) -> Result<SignedHeaders, AuthError> {
        self.authenticate_at(request, Utc::now())
    }

    /// Sign `request` as of `now` and attach the headers.
    ///
    /// # Errors
    ///
    /// See [`RequestAuthenticator::authenticate_headers`].
    pub fn authenticate_at<R: SignableRequest + ?Sized>(
        &self,
        request: &mut R,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, AuthError> {
        let signed = self.sign_parts(
            request.method().as_str(),
            request.path(),
            Timestamp::from_datetime(now),
        )?;
        signed.apply(request.headers_mut())?;
        Ok(signed)
    }
}
