// Framework bootstrap for the session server runtime.

use crate::domain::SessionVerifier;
use crate::frameworks::config;
use crate::interface_adapters::clients::AuthClient;
use crate::interface_adapters::http::{health_handler, not_found_handler};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::arena_tick_task;
use crate::use_cases::{HubSettings, SessionHub};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Routes for the public surface: the player WebSocket and a health probe.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Shared hub plus the arena ticker that drives it.
pub fn build_state(verifier: Arc<dyn SessionVerifier>, settings: HubSettings) -> Arc<AppState> {
    let hub = SessionHub::new(settings.clone()).shared();
    tokio::spawn(arena_tick_task(hub.clone(), settings.tick_interval));

    Arc::new(AppState {
        hub,
        verifier,
        settings,
    })
}

/// Serves on `listener` with an explicit verifier and pacing.
pub async fn serve(
    listener: tokio::net::TcpListener,
    verifier: Arc<dyn SessionVerifier>,
    settings: HubSettings,
) -> Result<()> {
    let address = listener.local_addr()?;
    let app = app(build_state(verifier, settings));

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

/// Serves on `listener`, verifying sessions against the configured auth service.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let auth_base_url = config::auth_service_url();
    let auth_verify_timeout = config::auth_verify_timeout();
    let auth_client = AuthClient::new(auth_base_url.clone(), auth_verify_timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize auth client: {e}")))?;
    tracing::debug!(
        auth_base_url = %auth_base_url,
        auth_verify_timeout_ms = auth_verify_timeout.as_millis(),
        "auth client configured"
    );

    serve(listener, Arc::new(auth_client), config::hub_settings()).await
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::bind_addr(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::clients::MemorySessions;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let verifier = Arc::new(MemorySessions::new(Duration::from_secs(60)));
        app(build_state(verifier, config::hub_settings()))
    }

    #[tokio::test]
    async fn when_health_is_requested_then_status_is_ok() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn when_route_is_unknown_then_json_not_found() {
        let response = test_app()
            .oneshot(Request::get("/lobbies").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"not found"}"#);
    }

    #[tokio::test]
    async fn when_ws_is_requested_without_upgrade_then_rejected() {
        let response = test_app()
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
