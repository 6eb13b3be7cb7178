//! TCN Auth Server - a gateway that verifies TCN-signed requests.
//!
//! Every request except the health check must carry valid `Authorization`
//! and `X-Timestamp` headers. Verified requests are answered with a JSON
//! description of the caller; rejected ones get `401` and a JSON reason.
//!
//! # Usage
//!
//! ```text
//! TCN_CREDENTIALS=client-a:s3cr3t,client-b:hunter2 tcn-auth-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `HEALTH_PATH` | `/health` | Unsigned health endpoint |
//! | `TCN_CREDENTIALS` | *(unset)* | Accepted `token:secret` pairs, comma-separated |
//! | `TCN_API_TOKEN` | *(unset)* | Single accepted token, when `TCN_CREDENTIALS` is unset |
//! | `TCN_API_SECRET` | *(unset)* | Secret for `TCN_API_TOKEN` |
//! | `TCN_SERVICE_MARKER` | `TCN` | Expected scheme marker |
//! | `TCN_TIMESTAMP_TOLERANCE_SECS` | `300` | Allowed clock skew |
//! | `DRAIN_TIMEOUT_SECS` | `30` | Grace period for open requests on shutdown |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tcn_auth::{StaticCredentialProvider, Verifier, VerifierConfig};
use tcn_auth_http::{AuthenticatedHandler, EchoHandler, GatewayConfig, GatewayService};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pick the log filter: a non-empty `RUST_LOG` wins over `LOG_LEVEL`.
fn log_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter> {
    let directives = rust_log.filter(|v| !v.trim().is_empty()).unwrap_or(log_level);
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter: {directives}"))
}

fn init_tracing(log_level: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), log_level)?)
        .with_target(true)
        .init();
    Ok(())
}

/// Build the verifier and gateway settings from the environment.
fn build_gateway_config(server: &ServerConfig) -> Result<GatewayConfig> {
    let provider =
        StaticCredentialProvider::from_env().context("failed to load TCN credential table")?;
    let verifier_config =
        VerifierConfig::from_env().context("failed to load verifier configuration")?;

    info!(
        accepted_tokens = provider.len(),
        service_marker = %verifier_config.service_marker,
        timestamp_tolerance_secs = verifier_config.timestamp_tolerance_secs,
        "loaded credential table"
    );

    let verifier = Verifier::new(Arc::new(provider), verifier_config);
    let mut config = GatewayConfig::new(verifier);
    config.health_path.clone_from(&server.health_path);
    Ok(config)
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM from the container runtime.
///
/// A signal source that cannot be installed never fires; the other one still
/// stops the gateway.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received, no longer accepting signed requests"),
        () = terminate => info!("SIGTERM received, no longer accepting signed requests"),
    }
}

/// Accept connections until `shutdown` resolves, then give in-flight
/// verifications up to `drain_timeout` to answer.
async fn serve<H: AuthenticatedHandler>(
    listener: TcpListener,
    service: GatewayService<H>,
    shutdown: impl Future<Output = ()>,
    drain_timeout: Duration,
) -> Result<()> {
    let open_connections = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let conn = http
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = open_connections.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%peer_addr, error = %e, "gateway connection closed with error");
            }
        });
    }

    // The listener is dropped here, so new clients are refused while open
    // connections finish their current request.
    drop(listener);
    if tokio::time::timeout(drain_timeout, open_connections.shutdown())
        .await
        .is_err()
    {
        warn!(
            drain_timeout_secs = drain_timeout.as_secs(),
            "gave up waiting for open gateway connections"
        );
    } else {
        info!("gateway connections closed");
    }

    Ok(())
}

/// Probe the running gateway's health endpoint.
async fn run_health_check(addr: &str, health_path: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET {health_path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let config = ServerConfig::from_env();
        let healthy = run_health_check(&config.probe_addr(), &config.health_path)
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = ServerConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        health_path = %config.health_path,
        version = VERSION,
        "starting TCN auth server",
    );

    let gateway_config = build_gateway_config(&config)?;
    let service = GatewayService::new(EchoHandler, gateway_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, shutdown_signal(), config.drain_timeout()).await
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;
    use tracing::level_filters::LevelFilter;

    use super::*;

    fn test_service() -> GatewayService<EchoHandler> {
        let provider =
            StaticCredentialProvider::new(vec![("client-a".to_owned(), "s3cr3t".to_owned())])
                .unwrap();
        let verifier = Verifier::new(Arc::new(provider), VerifierConfig::default());
        GatewayService::new(EchoHandler, GatewayConfig::new(verifier))
    }

    async fn spawn_gateway() -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            test_service(),
            async move {
                let _ = stopped.await;
            },
            Duration::from_secs(5),
        ));
        (addr, stop, server)
    }

    #[tokio::test]
    async fn test_should_pass_health_check_against_running_gateway() {
        let (addr, stop, server) = spawn_gateway().await;

        run_health_check(&addr, "/health").await.unwrap();

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_should_fail_health_check_on_signed_path() {
        let (addr, stop, server) = spawn_gateway().await;

        // Anything but the health path needs a signature and answers 401.
        assert!(run_health_check(&addr, "/orders").await.is_err());

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_should_refuse_connections_after_shutdown() {
        let (addr, stop, server) = spawn_gateway().await;

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert!(run_health_check(&addr, "/health").await.is_err());
    }

    #[test]
    fn test_should_prefer_rust_log_over_log_level() {
        let filter = log_filter(Some("tcn_auth=debug"), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(Some("  "), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(None, "info").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_should_reject_unparseable_log_level() {
        assert!(log_filter(None, "tcn_auth=loudest").is_err());
    }
}
