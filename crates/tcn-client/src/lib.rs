//! Typed HTTP client that signs every request with TCN headers.
//!
//! [`SignedClient`] wraps a `reqwest::Client`. Each call:
//!
//! 1. resolves the path against the configured base URL,
//! 2. serializes the JSON body (for `POST`/`PUT`),
//! 3. signs the request with a fresh timestamp,
//! 4. decodes the response into an [`ApiResponse`].
//!
//! Signing failures surface as [`ClientError::Auth`] and network failures as
//! [`ClientError::Transport`]. A server rejection is an ordinary response
//! with status `401`.

pub mod client;
pub mod config;
pub mod error;
pub mod response;

pub use client::SignedClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use response::ApiResponse;
