//! HMAC-SHA256 digest computation.
//!
//! ```text
//! Digest = Base64(HMAC-SHA256(UTF-8(secret), UTF-8(canonical string)))
//! ```
//!
//! Base64 uses the standard alphabet with padding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::canonical::CanonicalString;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// A base64-encoded HMAC-SHA256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDigest(String);

impl SignatureDigest {
    /// Wrap a digest received over the wire.
    #[must_use]
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare two digests in constant time.
    #[must_use]
    pub fn verify(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::fmt::Display for SignatureDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sign a canonical string with the shared secret.
///
/// # Errors
///
/// Returns [`AuthError::EmptySecret`] if `secret` is empty.
///
/// # Examples
///
/// ```
/// use tcn_auth::canonical::CanonicalString;
/// use tcn_auth::signer::sign;
/// use tcn_auth::timestamp::Timestamp;
///
/// let ts = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
/// let canonical = CanonicalString::new("POST", "/orders/42", &ts).unwrap();
/// let digest = sign(&canonical, "s3cr3t").unwrap();
/// assert_eq!(digest.as_str(), "ExtPCFNKic+60uks3wSzEWhVrOV5ZlZ0EP7Lo6q0wu8=");
/// ```
pub fn sign(canonical: &CanonicalString, secret: &str) -> Result<SignatureDigest, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }
    Ok(SignatureDigest(BASE64.encode(hmac_sha256(
        secret.as_bytes(),
        canonical.as_bytes(),
    )?)))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::EmptySecret)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
