//! Canonical string construction.
//!
//! The string that gets signed is three fields joined by a literal `+`:
//!
//! ```text
//! METHOD+canonical-path+timestamp
//! ```
//!
//! The method is upper-cased. The path is the percent-encoded absolute path
//! the transport sends, normalized segment by segment and then lower-cased in
//! its entirety. Query strings never take part. The timestamp is copied
//! verbatim.
//!
//! Fields are not escaped. The method and the timestamp are required to be
//! free of `+`, so the first and last separators are always the field
//! boundaries even when the path itself contains `+`.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::error::AuthError;
use crate::timestamp::Timestamp;

/// Separator between the three canonical fields.
pub const FIELD_SEPARATOR: char = '+';

/// Characters percent-encoded inside a single path segment.
///
/// This is the WHATWG path-segment set plus `%`: exactly what an HTTP client
/// escapes when it puts a segment on the wire. Non-ASCII bytes are always
/// encoded.
pub(crate) const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The exact string that is fed to the HMAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalString(String);

impl CanonicalString {
    /// Build the canonical string from a method, a request path and a timestamp.
    ///
    /// `path` is canonicalized with [`canonical_path`]; callers that already
    /// hold a canonical path get the same result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSigningInput`] if the method is empty or
    /// contains `+`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tcn_auth::canonical::CanonicalString;
    /// use tcn_auth::timestamp::Timestamp;
    ///
    /// let ts = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
    /// let canonical = CanonicalString::new("post", "/Orders/42", &ts).unwrap();
    /// assert_eq!(canonical.as_str(), "POST+/orders/42+2024-01-01T00:00:00Z");
    /// ```
    pub fn new(method: &str, path: &str, timestamp: &Timestamp) -> Result<Self, AuthError> {
        let method = canonical_method(method)?;
        let path = canonical_path(path);
        Ok(Self::from_parts(&method, &path, timestamp.as_str()))
    }

    /// Join already-canonical fields without further processing.
    #[must_use]
    pub(crate) fn from_parts(method: &str, path: &str, timestamp: &str) -> Self {
        Self(format!(
            "{method}{FIELD_SEPARATOR}{path}{FIELD_SEPARATOR}{timestamp}"
        ))
    }

    /// The canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical string as the bytes that get signed.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for CanonicalString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upper-case an HTTP method for signing.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSigningInput`] for an empty method or one that
/// contains the field separator.
pub fn canonical_method(method: &str) -> Result<String, AuthError> {
    if method.is_empty() || method.contains(FIELD_SEPARATOR) {
        return Err(AuthError::InvalidSigningInput(format!(
            "method {method:?} cannot be signed"
        )));
    }
    Ok(method.to_ascii_uppercase())
}

/// Build the canonical form of a request path.
///
/// Empty paths become `/` and anything after `?` is dropped. Escapes of
/// unreserved characters are decoded (`%41` signs as `a`), every other
/// escape is kept as sent (`%2B` stays `%2b`), and raw characters the
/// transport would escape are percent-encoded. The result is then
/// ASCII-lower-cased.
///
/// # Examples
///
/// ```
/// use tcn_auth::canonical::canonical_path;
///
/// assert_eq!(canonical_path("/Users/1"), "/users/1");
/// assert_eq!(canonical_path(""), "/");
/// assert_eq!(canonical_path("/a/urgent si?x=1"), "/a/urgent%20si");
/// assert_eq!(canonical_path("/search/a%2Bb"), "/search/a%2bb");
/// ```
#[must_use]
pub fn canonical_path(path: &str) -> String {
    let path = path.split_once('?').map_or(path, |(p, _)| p);

    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    let mut canonical = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        canonical.push('/');
    }

    let mut first = true;
    for segment in path.split('/') {
        if !first {
            canonical.push('/');
        }
        first = false;
        canonical.push_str(&normalize_segment(segment));
    }

    canonical.make_ascii_lowercase();
    canonical
}

/// Bring a single path segment into the form the transport sends.
///
/// A `%` that does not start a valid escape is itself encoded as `%25`.
pub(crate) fn normalize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(pos) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..pos], PATH_SEGMENT_ENCODE_SET));
        let escape = &rest[pos..];

        match escape.get(1..3).and_then(decode_hex_pair) {
            Some(byte) if is_unreserved(byte) => {
                out.push(char::from(byte));
                rest = &escape[3..];
            }
            Some(_) => {
                out.push_str(&escape[..3]);
                rest = &escape[3..];
            }
            None => {
                out.push_str("%25");
                rest = &escape[1..];
            }
        }
    }

    out.extend(utf8_percent_encode(rest, PATH_SEGMENT_ENCODE_SET));
    out
}

fn decode_hex_pair(hex: &str) -> Option<u8> {
    if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        None
    }
}

/// RFC 3986 unreserved characters: `ALPHA DIGIT - . _ ~`.
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}
