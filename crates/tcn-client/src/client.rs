//! Signing HTTP client built on reqwest.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tcn_auth::{PathVariables, RequestAuthenticator, RouteTemplate, SigningConfig};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::response::ApiResponse;

/// HTTP client that signs every request attempt with TCN headers.
///
/// Request paths are resolved against the base URL the way a browser
/// resolves links: with a base of `https://api.example.com/v1/`, the path
/// `orders/42` becomes `/v1/orders/42` while `/orders/42` replaces the base
/// path entirely.
///
/// # Examples
///
/// ```no_run
/// use tcn_auth::{ApiCredentials, SigningConfig};
/// use tcn_client::{ClientConfig, SignedClient};
///
/// # async fn run() -> Result<(), tcn_client::ClientError> {
/// let signing = SigningConfig::new(ApiCredentials::new("client-a", "s3cr3t")?);
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com/".to_owned())
///     .build();
/// let client = SignedClient::new(config, signing)?;
///
/// let response = client.get::<serde_json::Value>("orders/42").await?;
/// println!("{} {:?}", response.status, response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SignedClient {
    http: Client,
    base_url: Url,
    authenticator: RequestAuthenticator,
    max_retries: u32,
}

impl SignedClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for an unparseable base URL,
    /// [`ClientError::Auth`] for invalid signing configuration, or
    /// [`ClientError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, signing: SigningConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let authenticator = RequestAuthenticator::new(signing)?;
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            base_url,
            authenticator,
            max_retries: config.max_retries,
        })
    }

    /// The base URL paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the result is not a valid URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Render a route template and resolve it against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the result is not a valid URL.
    pub fn resolve_route(
        &self,
        template: &RouteTemplate,
        variables: &PathVariables,
    ) -> Result<Url, ClientError> {
        let path = template.render(variables);
        self.resolve(&path)
    }

    /// Send a signed `GET`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ClientError> {
        self.send(Method::GET, self.resolve(path)?, None).await
    }

    /// Send a signed `POST` with a JSON body.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.send(Method::POST, self.resolve(path)?, Some(body)).await
    }

    /// Send a signed `PUT` with a JSON body.
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.send(Method::PUT, self.resolve(path)?, Some(body)).await
    }

    /// Send a signed `DELETE`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.send(Method::DELETE, self.resolve(path)?, None).await
    }

    /// Send a signed request with an optional JSON body.
    ///
    /// Every attempt gets a fresh timestamp and digest. Connect failures and
    /// timeouts are retried up to the configured limit.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] if signing fails, or
    /// [`ClientError::Transport`] once retries are exhausted.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<ApiResponse<T>, ClientError> {
        let mut attempt = 0;
        loop {
            let request = self.signed_request(&method, &url, body.clone())?;
            debug!(%method, %url, attempt, "sending signed request");

            match self.execute(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(%method, %url, attempt, error = %err, "retrying request");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Build a request and attach `Authorization` and `X-Timestamp`.
    fn signed_request(
        &self,
        method: &Method,
        url: &Url,
        body: Option<Bytes>,
    ) -> Result<reqwest::Request, ClientError> {
        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }
        let mut request = builder.build()?;

        self.authenticator
            .authenticate_headers(method, url.path(), request.headers_mut())?;
        Ok(request)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<ApiResponse<T>, ClientError> {
        let response = self.http.execute(request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%status, len = bytes.len(), "received response");
        Ok(ApiResponse::from_raw(status, &bytes))
    }
}
