//! Server-side verification of TCN-signed requests.
//!
//! Verification follows a fixed sequence:
//!
//! 1. Parse `Authorization` (`<marker> <api_token>:<digest>`) and `X-Timestamp`.
//! 2. Reject the request as stale if the timestamp is further than the
//!    configured tolerance from now, in either direction.
//! 3. Resolve the shared secret for the API token.
//! 4. Rebuild the canonical string from the received method, the received
//!    path and the timestamp text exactly as sent.
//! 5. Recompute the digest and compare it in constant time.
//!
//! The main entry point is [`Verifier::verify`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::header::AUTHORIZATION;
use http::{HeaderMap, Method};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::authenticator::{TOKEN_DIGEST_SEPARATOR, X_TIMESTAMP};
use crate::canonical::CanonicalString;
use crate::config::VerifierConfig;
use crate::credentials::CredentialProvider;
use crate::error::AuthError;
use crate::signer::{SignatureDigest, sign};
use crate::timestamp::Timestamp;

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    /// The API token that signed the request.
    pub api_token: String,
    /// The signed timestamp.
    pub timestamp: Timestamp,
}

/// Parsed components of a TCN `Authorization` header.
#[derive(Debug, Clone)]
pub struct ParsedAuthorization {
    /// The scheme marker as sent.
    pub service_marker: String,
    /// The API token.
    pub api_token: String,
    /// The base64 digest.
    pub digest: SignatureDigest,
}

/// Parse an `Authorization` header value.
///
/// The marker is matched case-insensitively, as HTTP auth schemes are. The
/// digest is everything after the last `:`; base64 never contains one.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedScheme`] if the marker differs from
/// `expected_marker`, or [`AuthError::InvalidAuthHeader`] if the value is
/// otherwise malformed.
pub fn parse_authorization_header(
    header: &str,
    expected_marker: &str,
) -> Result<ParsedAuthorization, AuthError> {
    let (marker, credentials) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !marker.eq_ignore_ascii_case(expected_marker) {
        return Err(AuthError::UnsupportedScheme(marker.to_owned()));
    }

    let (api_token, digest) = credentials
        .trim()
        .rsplit_once(TOKEN_DIGEST_SEPARATOR)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if api_token.is_empty() || digest.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(ParsedAuthorization {
        service_marker: marker.to_owned(),
        api_token: api_token.to_owned(),
        digest: SignatureDigest::from_encoded(digest),
    })
}

/// Verifies TCN signatures against a credential store.
#[derive(Clone)]
pub struct Verifier {
    credential_provider: Arc<dyn CredentialProvider>,
    config: VerifierConfig,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("credential_provider", &"...")
            .field("config", &self.config)
            .finish()
    }
}

impl Verifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(credential_provider: Arc<dyn CredentialProvider>, config: VerifierConfig) -> Self {
        Self {
            credential_provider,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify request parts against the current time.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify_at`].
    pub fn verify(&self, parts: &http::request::Parts) -> Result<VerifiedRequest, AuthError> {
        self.verify_at(parts, Utc::now())
    }

    /// Verify request parts as of `now`.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify_headers_at`].
    pub fn verify_at(
        &self,
        parts: &http::request::Parts,
        now: DateTime<Utc>,
    ) -> Result<VerifiedRequest, AuthError> {
        self.verify_headers_at(&parts.method, parts.uri.path(), &parts.headers, now)
    }

    /// Verify a method, path and header map as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if:
    /// - `Authorization` or `X-Timestamp` is missing or malformed
    /// - the timestamp is outside the tolerance window
    /// - the API token is unknown
    /// - the signature does not match
    pub fn verify_headers_at(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<VerifiedRequest, AuthError> {
        let auth_header = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;
        let parsed = parse_authorization_header(auth_header, &self.config.service_marker)?;

        let timestamp_header = headers
            .get(X_TIMESTAMP)
            .ok_or(AuthError::MissingTimestamp)?
            .to_str()
            .map_err(|_| AuthError::InvalidTimestamp("<non-ascii>".to_owned()))?;
        let timestamp = Timestamp::parse(timestamp_header)?;

        debug!(
            api_token = %parsed.api_token,
            timestamp = %timestamp,
            %method,
            path,
            "Verifying TCN signature"
        );

        if !timestamp.is_fresh(now, self.config.tolerance()) {
            let skew_secs = timestamp.skew(now).num_seconds();
            debug!(api_token = %parsed.api_token, skew_secs, "Request timestamp outside window");
            return Err(AuthError::RequestStale {
                skew_secs,
                tolerance_secs: self.config.timestamp_tolerance_secs,
            });
        }

        let secret = self.credential_provider.get_secret(&parsed.api_token)?;

        let canonical = CanonicalString::new(method.as_str(), path, &timestamp)?;
        debug!(canonical = %canonical, "Rebuilt canonical string");

        let expected = sign(&canonical, secret.expose_secret())?;

        if expected.verify(&parsed.digest) {
            debug!(api_token = %parsed.api_token, "Signature verification succeeded");
            Ok(VerifiedRequest {
                api_token: parsed.api_token,
                timestamp,
            })
        } else {
            debug!(
                api_token = %parsed.api_token,
                provided = %parsed.digest,
                "Signature mismatch"
            );
            Err(AuthError::SignatureDoesNotMatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::authenticator::RequestAuthenticator;
    use crate::credentials::{ApiCredentials, StaticCredentialProvider};
    use crate::error::Rejection;

    const TEST_TOKEN: &str = "client-a";
    const TEST_SECRET: &str = "s3cr3t";

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn verifier() -> Verifier {
        let provider =
            StaticCredentialProvider::new(vec![(TEST_TOKEN.to_owned(), TEST_SECRET.to_owned())])
            .unwrap();
        Verifier::new(Arc::new(provider), VerifierConfig::default())
    }

    fn authenticator(token: &str, secret: &str) -> RequestAuthenticator {
        RequestAuthenticator::with_marker(ApiCredentials::new(token, secret).unwrap(), "TCN")
            .unwrap()
    }

    fn signed_parts(method: &str, uri: &str, at: DateTime<Utc>) -> http::request::Parts {
        let (mut parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        authenticator(TEST_TOKEN, TEST_SECRET)
            .authenticate_at(&mut parts, at)
            .unwrap();
        parts
    }

    fn replace_char_at(digest: &str, index: usize) -> String {
        digest
            .char_indices()
            .map(|(i, c)| match (i == index, c) {
                (true, 'A') => 'B',
                (true, _) => 'A',
                (false, c) => c,
            })
            .collect()
    }

    /// Headers as produced by a client that signs the path exactly as sent,
    /// lower-cased.
    fn legacy_signed_parts(path: &str, timestamp: &str) -> http::request::Parts {
        let canonical = CanonicalString::from_parts("GET", &path.to_lowercase(), timestamp);
        let digest = sign(&canonical, TEST_SECRET).unwrap();
        let (parts, ()) = http::Request::builder()
            .method("GET")
            .uri(format!("http://localhost{path}"))
            .header(AUTHORIZATION, format!("TCN {TEST_TOKEN}:{}", digest.as_str()))
            .header(X_TIMESTAMP, timestamp)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_should_parse_authorization_header() {
        let parsed = parse_authorization_header(
            "TCN client-a:ExtPCFNKic+60uks3wSzEWhVrOV5ZlZ0EP7Lo6q0wu8=",
            "TCN",
        )
        .unwrap();
        assert_eq!(parsed.service_marker, "TCN");
        assert_eq!(parsed.api_token, "client-a");
        assert_eq!(
            parsed.digest.as_str(),
            "ExtPCFNKic+60uks3wSzEWhVrOV5ZlZ0EP7Lo6q0wu8="
        );
    }

    #[test]
    fn test_should_reject_malformed_authorization_headers() {
        assert!(matches!(
            parse_authorization_header("Bearer abc", "TCN"),
            Err(AuthError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_authorization_header("TCN", "TCN"),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            parse_authorization_header("TCN client-a", "TCN"),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            parse_authorization_header("TCN :digest", "TCN"),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            parse_authorization_header("TCN client-a:", "TCN"),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn test_should_match_marker_case_insensitively() {
        assert!(parse_authorization_header("tcn client-a:abc=", "TCN").is_ok());
    }

    #[test]
    fn test_should_accept_signed_request() {
        let parts = signed_parts("POST", "http://localhost/orders/42", new_year());
        let verified = verifier().verify_at(&parts, new_year()).unwrap();
        assert_eq!(verified.api_token, TEST_TOKEN);
        assert_eq!(verified.timestamp.as_str(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_should_reject_digest_altered_at_any_position() {
        let verifier = verifier();
        let parts = signed_parts("POST", "http://localhost/orders/42", new_year());
        let header = parts.headers[AUTHORIZATION].to_str().unwrap().to_owned();
        let (prefix, digest) = header.rsplit_once(':').unwrap();

        for index in 0..digest.len() {
            let mut tampered = signed_parts("POST", "http://localhost/orders/42", new_year());
            let value = format!("{prefix}:{}", replace_char_at(digest, index));
            tampered.headers.insert(AUTHORIZATION, value.parse().unwrap());

            let result = verifier.verify_at(&tampered, new_year());
            assert!(
                matches!(result, Err(AuthError::SignatureDoesNotMatch)),
                "digest position {index}"
            );
        }
    }

    #[test]
    fn test_should_accept_paths_signed_as_sent() {
        let verifier = verifier();
        for path in [
            "/search/a%2Bb",
            "/users/me%40example.com",
            "/t/a%3Ab",
            "/rest/sites/workinghours/urgent%20si",
            "/Files/A%2FB",
        ] {
            let parts = legacy_signed_parts(path, "2024-01-01T00:00:00Z");
            assert!(
                verifier.verify_at(&parts, new_year()).is_ok(),
                "path {path}"
            );
        }
    }

    #[test]
    fn test_should_not_accept_raw_character_for_reserved_escape() {
        let mut parts = legacy_signed_parts("/search/a%2Bb", "2024-01-01T00:00:00Z");
        parts.uri = "http://localhost/search/a+b".parse().unwrap();
        assert!(matches!(
            verifier().verify_at(&parts, new_year()),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_reject_tampered_method_path_or_timestamp() {
        let verifier = verifier();

        let mut parts = signed_parts("GET", "http://localhost/users/1", new_year());
        parts.method = Method::DELETE;
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::SignatureDoesNotMatch)
        ));

        let mut parts = signed_parts("GET", "http://localhost/users/1", new_year());
        parts.uri = "http://localhost/users/2".parse().unwrap();
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::SignatureDoesNotMatch)
        ));

        let mut parts = signed_parts("GET", "http://localhost/users/1", new_year());
        parts
            .headers
            .insert(X_TIMESTAMP, "2024-01-01T00:00:01Z".parse().unwrap());
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_compare_paths_case_insensitively() {
        let mut parts = signed_parts("GET", "http://localhost/Users/1", new_year());
        parts.uri = "http://localhost/users/1".parse().unwrap();
        assert!(verifier().verify_at(&parts, new_year()).is_ok());
    }

    #[test]
    fn test_should_ignore_query_string() {
        let mut parts = signed_parts("GET", "http://localhost/orders?page=1", new_year());
        parts.uri = "http://localhost/orders?page=2".parse().unwrap();
        assert!(verifier().verify_at(&parts, new_year()).is_ok());
    }

    #[test]
    fn test_should_accept_timestamp_at_window_edge() {
        let verifier = verifier();
        let parts = signed_parts("GET", "http://localhost/users/1", new_year());

        assert!(
            verifier
                .verify_at(&parts, new_year() + TimeDelta::seconds(300))
                .is_ok()
        );
        assert!(
            verifier
                .verify_at(&parts, new_year() - TimeDelta::seconds(300))
                .is_ok()
        );
    }

    #[test]
    fn test_should_reject_timestamp_one_second_beyond_window() {
        let verifier = verifier();
        let parts = signed_parts("GET", "http://localhost/users/1", new_year());

        let late = verifier
            .verify_at(&parts, new_year() + TimeDelta::seconds(301))
            .unwrap_err();
        assert!(matches!(
            late,
            AuthError::RequestStale {
                skew_secs: 301,
                tolerance_secs: 300
            }
        ));

        let early = verifier
            .verify_at(&parts, new_year() - TimeDelta::seconds(301))
            .unwrap_err();
        assert_eq!(early.rejection(), Some(Rejection::Stale));
    }

    #[test]
    fn test_should_honor_configured_tolerance() {
        let provider =
            StaticCredentialProvider::new(vec![(TEST_TOKEN.to_owned(), TEST_SECRET.to_owned())])
            .unwrap();
        let config = VerifierConfig::builder().timestamp_tolerance_secs(10).build();
        let verifier = Verifier::new(Arc::new(provider), config);
        let parts = signed_parts("GET", "http://localhost/", new_year());

        assert!(
            verifier
                .verify_at(&parts, new_year() + TimeDelta::seconds(10))
                .is_ok()
        );
        assert!(
            verifier
                .verify_at(&parts, new_year() + TimeDelta::seconds(11))
                .is_err()
        );
    }

    #[test]
    fn test_should_reject_unknown_token_even_with_valid_digest() {
        let (mut parts, ()) = http::Request::post("http://localhost/orders/42")
            .body(())
            .unwrap()
            .into_parts();
        // Correctly signed with the right secret, but the token is not registered.
        authenticator("client-b", TEST_SECRET)
            .authenticate_at(&mut parts, new_year())
            .unwrap();

        let err = verifier().verify_at(&parts, new_year()).unwrap_err();
        assert!(matches!(err, AuthError::TokenNotFound(ref t) if t == "client-b"));
        assert_eq!(err.rejection(), Some(Rejection::UnknownToken));
    }

    #[test]
    fn test_should_reject_missing_headers() {
        let verifier = verifier();

        let (parts, ()) = http::Request::get("http://localhost/")
            .body(())
            .unwrap()
            .into_parts();
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::MissingAuthHeader)
        ));

        let mut parts = signed_parts("GET", "http://localhost/", new_year());
        parts.headers.remove(X_TIMESTAMP);
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::MissingTimestamp)
        ));

        let mut parts = signed_parts("GET", "http://localhost/", new_year());
        parts
            .headers
            .insert(X_TIMESTAMP, "not-a-time".parse().unwrap());
        assert!(matches!(
            verifier.verify_at(&parts, new_year()),
            Err(AuthError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_should_reject_other_marker() {
        let (mut parts, ()) = http::Request::get("http://localhost/")
            .body(())
            .unwrap()
            .into_parts();
        RequestAuthenticator::with_marker(ApiCredentials::new(TEST_TOKEN, TEST_SECRET).unwrap(), "ACME")
            .unwrap()
            .authenticate_at(&mut parts, new_year())
            .unwrap();

        assert!(matches!(
            verifier().verify_at(&parts, new_year()),
            Err(AuthError::UnsupportedScheme(ref m)) if m == "ACME"
        ));
    }

    #[test]
    fn test_should_accept_fractional_timestamp_from_scripting_client() {
        // Scripting clients send millisecond ISO strings and sign that exact text.
        let text = "2024-01-01T00:00:00.123Z";
        let ts = Timestamp::parse(text).unwrap();
        let canonical = CanonicalString::new("GET", "/users/1", &ts).unwrap();
        let digest = sign(&canonical, TEST_SECRET).unwrap();

        let (parts, ()) = http::Request::get("http://localhost/users/1")
            .header(AUTHORIZATION, format!("TCN {TEST_TOKEN}:{digest}"))
            .header(X_TIMESTAMP, text)
            .body(())
            .unwrap()
            .into_parts();

        assert!(verifier().verify_at(&parts, new_year()).is_ok());
    }

    #[test]
    fn test_should_verify_against_wall_clock() {
        let parts = signed_parts("GET", "http://localhost/users/1", Utc::now());
        assert!(verifier().verify(&parts).is_ok());
    }
}
