//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID injection
//! 2. Request/response tracing
//! 3. Timeout enforcement
//! 4. Authentication, per route group
//! 5. Handler execution
//!
//! `/healthz` is never authenticated and `/v1/debug/private` always is.
//! Management and invocation routes are authenticated only when
//! [`RouteProtection`](crate::RouteProtection) says so; unprotected groups
//! never look at `Authorization`.

use std::{future::Future, net::SocketAddr};

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use webhookd_auth::AuthGate;

use crate::{
    handlers,
    middleware::{auth::authenticate, request_id::inject_request_id},
    AppState,
};

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use webhookd_api::{create_router, AppState, Config};
///
/// let state = AppState::from_config(&Config::default()).expect("state");
/// let app = create_router(state);
/// // Serve the app...
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/healthz", get(handlers::health_check));

    let management_routes = Router::new()
        .route("/v1/webhooks", post(handlers::create_webhook))
        .route("/v1/webhooks/{id}", delete(handlers::deactivate_webhook))
        .route("/v1/debug/routes", get(handlers::list_routes));
    let management_routes = if state.protection.management {
        guarded(management_routes, state.auth.clone())
    } else {
        management_routes
    };

    let invocation_routes = Router::new().route(
        "/v1/hooks/{id}",
        get(handlers::invoke_hook)
            .post(handlers::invoke_hook)
            .put(handlers::invoke_hook)
            .patch(handlers::invoke_hook)
            .delete(handlers::invoke_hook)
            .options(handlers::invoke_hook),
    );
    let invocation_routes = if state.protection.invocation {
        guarded(invocation_routes, state.auth.clone())
    } else {
        invocation_routes
    };

    let private_routes = guarded(
        Router::new().route("/v1/debug/private", get(handlers::private_message)),
        state.auth.clone(),
    );

    Router::new()
        .merge(health_routes)
        .merge(management_routes)
        .merge(invocation_routes)
        .merge(private_routes)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

fn guarded(routes: Router<AppState>, gate: AuthGate) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(gate, authenticate))
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns `std::io::Error` if the listener fails.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Binds to the specified address and serves requests until a shutdown
/// signal is received.
///
/// # Errors
///
/// Returns `std::io::Error` if the port is already in use or the listener
/// fails.
///
/// # Example
///
/// ```no_run
/// use webhookd_api::{start_server, AppState, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::load()?;
///     let state = AppState::from_config(&config)?;
///
///     start_server(state, config.parse_server_addr()?).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    serve(listener, app, shutdown_signal()).await
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
