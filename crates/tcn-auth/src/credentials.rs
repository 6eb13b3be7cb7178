//! API credentials and secret lookup.
//!
//! The signing side holds one [`ApiCredentials`] pair. The verifying side
//! resolves secrets by API token through a [`CredentialProvider`]. Secrets are
//! wrapped in [`SecretString`] so they never show up in `Debug` output and are
//! zeroed on drop.
//!
//! A verifier loads its table with [`StaticCredentialProvider::from_env`]:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `TCN_CREDENTIALS` | Comma-separated `token:secret` pairs |
//! | `TCN_API_TOKEN` / `TCN_API_SECRET` | Single pair, used when `TCN_CREDENTIALS` is unset |

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};

use crate::config::required_env;
use crate::error::AuthError;

/// Environment variable holding the verifier's credential table.
pub const CREDENTIALS_ENV: &str = "TCN_CREDENTIALS";

/// The public API token and shared secret a client signs with.
#[derive(Clone)]
pub struct ApiCredentials {
    api_token: String,
    api_secret: SecretString,
}

impl ApiCredentials {
    /// Create credentials from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidApiToken`] if the token is empty or contains
    /// whitespace, or [`AuthError::EmptySecret`] if the secret is empty.
    pub fn new(
        api_token: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let api_token = api_token.into();
        let api_secret = api_secret.into();

        if api_token.is_empty() || api_token.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidApiToken);
        }
        if api_secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }

        Ok(Self {
            api_token,
            api_secret: SecretString::from(api_secret),
        })
    }

    /// The API token (public, safe to log).
    #[must_use]
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Expose the secret for signing. Never log the return value.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_token", &self.api_token)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Trait for looking up shared secrets by API token.
///
/// Implementations may back this with a database, configuration file,
/// or any other credential store. Lookups happen on every verified request
/// and must not block on writes.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the shared secret for the given API token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenNotFound`] if the token is not recognized.
    fn get_secret(&self, api_token: &str) -> Result<SecretString, AuthError>;
}

/// A simple in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use secrecy::ExposeSecret;
/// use tcn_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("client-a".to_owned(), "s3cr3t".to_owned()),
/// ])
/// .unwrap();
///
/// let secret = provider.get_secret("client-a").unwrap();
/// assert_eq!(secret.expose_secret(), "s3cr3t");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, SecretString>,
}

impl StaticCredentialProvider {
    /// Create a provider from an iterable of `(api_token, secret)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`ApiCredentials::new`] for the first
    /// pair with an unusable token or an empty secret.
    pub fn new(
        credentials: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, AuthError> {
        let credentials = credentials
            .into_iter()
            .map(|(token, secret)| ApiCredentials::new(token, secret))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_credentials(credentials))
    }

    /// Create a provider from already validated credentials.
    #[must_use]
    pub fn from_credentials(credentials: impl IntoIterator<Item = ApiCredentials>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|c| (c.api_token, c.api_secret))
                .collect(),
        }
    }

    /// Load the credential table from environment variables.
    ///
    /// `TCN_CREDENTIALS` takes precedence. Without it, the single pair in
    /// `TCN_API_TOKEN` and `TCN_API_SECRET` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingEnvVar`] if neither source is set, or the
    /// errors of [`parse_credential_list`] and [`ApiCredentials::new`].
    pub fn from_env() -> Result<Self, AuthError> {
        if let Ok(list) = std::env::var(CREDENTIALS_ENV) {
            return Ok(Self::from_credentials(parse_credential_list(&list)?));
        }
        let api_token = required_env("TCN_API_TOKEN")?;
        let api_secret = required_env("TCN_API_SECRET")?;
        Ok(Self::from_credentials([ApiCredentials::new(
            api_token, api_secret,
        )?]))
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl From<&ApiCredentials> for StaticCredentialProvider {
    fn from(credentials: &ApiCredentials) -> Self {
        Self::from_credentials([credentials.clone()])
    }
}

/// Parse a comma-separated list of `token:secret` pairs.
///
/// Each entry is split on its first `:`, so secrets may contain colons.
/// Whitespace around entries is ignored and empty entries are skipped.
///
/// # Errors
///
/// Returns [`AuthError::InvalidEnvVar`] for an entry without `:` or an empty
/// list, a duplicate token, or the validation errors of
/// [`ApiCredentials::new`]. Secrets never appear in the error.
///
/// # Examples
///
/// ```
/// use tcn_auth::credentials::parse_credential_list;
///
/// let creds = parse_credential_list("client-a:s3cr3t, client-b:p:w").unwrap();
/// assert_eq!(creds[1].api_token(), "client-b");
/// assert_eq!(creds[1].expose_secret(), "p:w");
/// ```
pub fn parse_credential_list(list: &str) -> Result<Vec<ApiCredentials>, AuthError> {
    let invalid = |value: String| AuthError::InvalidEnvVar {
        name: CREDENTIALS_ENV.to_owned(),
        value,
    };

    let mut credentials: Vec<ApiCredentials> = Vec::new();
    for (index, entry) in list.split(',').map(str::trim).enumerate() {
        if entry.is_empty() {
            continue;
        }
        let (token, secret) = entry
            .split_once(':')
            .ok_or_else(|| invalid(format!("entry {index} is not token:secret")))?;
        let creds = ApiCredentials::new(token.trim(), secret)?;
        if credentials.iter().any(|c| c.api_token == creds.api_token) {
            return Err(invalid(format!("duplicate token {}", creds.api_token)));
        }
        credentials.push(creds);
    }

    if credentials.is_empty() {
        return Err(invalid("no credentials".to_owned()));
    }
    Ok(credentials)
}

impl std::fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("tokens", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret(&self, api_token: &str) -> Result<SecretString, AuthError> {
        self.credentials
            .get(api_token)
            .cloned()
            .ok_or_else(|| AuthError::TokenNotFound(api_token.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_return_secret_for_known_token() {
        let provider =
            StaticCredentialProvider::new(vec![("token".to_owned(), "secret".to_owned())])
                .unwrap();

        let result = provider.get_secret("token");
        assert_eq!(result.unwrap().expose_secret(), "secret");
    }

    #[test]
    fn test_should_return_error_for_unknown_token() {
        let provider = StaticCredentialProvider::new(vec![]).unwrap();

        let result = provider.get_secret("UNKNOWN");
        assert!(matches!(result, Err(AuthError::TokenNotFound(_))));
        assert!(provider.is_empty());
    }

    #[test]
    fn test_should_validate_credentials() {
        assert!(matches!(
            ApiCredentials::new("", "secret"),
            Err(AuthError::InvalidApiToken)
        ));
        assert!(matches!(
            ApiCredentials::new("my token", "secret"),
            Err(AuthError::InvalidApiToken)
        ));
        assert!(matches!(
            ApiCredentials::new("token", ""),
            Err(AuthError::EmptySecret)
        ));
    }

    #[test]
    fn test_should_reject_unusable_pairs_at_construction() {
        let result = StaticCredentialProvider::new(vec![
            ("client-a".to_owned(), "s3cr3t".to_owned()),
            ("client-b".to_owned(), String::new()),
        ]);
        assert!(matches!(result, Err(AuthError::EmptySecret)));

        let result = StaticCredentialProvider::new(vec![(String::new(), "s3cr3t".to_owned())]);
        assert!(matches!(result, Err(AuthError::InvalidApiToken)));
    }

    #[test]
    fn test_should_parse_credential_table() {
        let creds = parse_credential_list(" client-a:s3cr3t ,client-b:with:colons,").unwrap();
        let provider = StaticCredentialProvider::from_credentials(creds);

        assert_eq!(provider.len(), 2);
        assert_eq!(provider.get_secret("client-a").unwrap().expose_secret(), "s3cr3t");
        assert_eq!(
            provider.get_secret("client-b").unwrap().expose_secret(),
            "with:colons"
        );
    }

    #[test]
    fn test_should_reject_malformed_credential_table() {
        assert!(matches!(
            parse_credential_list("client-a"),
            Err(AuthError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            parse_credential_list("client-a:"),
            Err(AuthError::EmptySecret)
        ));
        assert!(matches!(
            parse_credential_list(":s3cr3t"),
            Err(AuthError::InvalidApiToken)
        ));
        assert!(matches!(
            parse_credential_list(" , "),
            Err(AuthError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            parse_credential_list("client-a:one,client-a:two"),
            Err(AuthError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn test_should_keep_secret_out_of_table_errors() {
        let err = parse_credential_list("client-a:s3cr3t,broken-entry-topsecret").unwrap_err();
        assert!(!err.to_string().contains("topsecret"));
        assert!(!err.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let creds = ApiCredentials::new("my_api_token", "super_secret_key").unwrap();
        let debug_str = format!("{creds:?}");

        assert!(debug_str.contains("my_api_token"));
        assert!(!debug_str.contains("super_secret_key"));
        assert!(debug_str.contains("[REDACTED]"));

        let provider = StaticCredentialProvider::from(&creds);
        let debug_str = format!("{provider:?}");
        assert!(debug_str.contains("my_api_token"));
        assert!(!debug_str.contains("super_secret_key"));
    }
}
