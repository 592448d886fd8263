//! Agora API Gateway
//!
//! The HTTP surface of the paper-review service.
//! Handles:
//! - Principal resolution from bearer tokens
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use agora_common::{
    auth::SessionVerifier,
    config::AppConfig,
    db::{DbPool, Repository},
    metrics,
};
use axum::{
    extract::FromRef,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub verifier: Arc<SessionVerifier>,
}

impl AppState {
    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

impl FromRef<AppState> for Arc<SessionVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting Agora API Gateway v{}",
        agora_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install()?;
        info!(%metrics_addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    let verifier = Arc::new(SessionVerifier::from_config(&config.auth, &config.identity)?);

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let state = AppState {
        config: config.clone(),
        db,
        verifier,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // In-flight requests get `shutdown_timeout` to drain once the signal arrives
    let drain = config.shutdown_timeout();
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    });

    tokio::select! {
        result = std::future::IntoFuture::into_future(server) => result?,
        _ = async {
            match signalled_rx.await {
                Ok(()) => tokio::time::sleep(drain).await,
                Err(_) => std::future::pending::<()>().await,
            }
        } => {
            tracing::warn!(timeout_secs = drain.as_secs(), "Drain timeout elapsed, dropping open connections");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Identity & reference data
        .route("/profiles", post(handlers::profiles::register_profile))
        .route("/categories", get(handlers::categories::list_categories))

        // Paper workflow
        .route(
            "/papers",
            get(handlers::papers::list_papers).post(handlers::papers::create_paper),
        )
        .route("/papers/{id}", get(handlers::papers::get_paper))
        .route("/papers/{id}/transitions", post(handlers::papers::transition_paper))

        // Review assignments
        .route(
            "/papers/{id}/reviewers",
            get(handlers::reviews::list_reviewers).post(handlers::reviews::assign_reviewers),
        )
        .route("/assignments", get(handlers::reviews::my_assignments))
        .route("/assignments/{id}", delete(handlers::reviews::remove_assignment))
        .route("/assignments/{id}/complete", post(handlers::reviews::complete_assignment))
        .route(
            "/papers/{id}/reviews",
            get(handlers::reviews::list_reviews).post(handlers::reviews::submit_review),
        )
        .route("/papers/{id}/potential-reviewers", get(handlers::reviews::potential_reviewers))

        // Likes & trending
        .route("/papers/trending", get(handlers::engagement::trending_papers))
        .route(
            "/papers/{id}/likes",
            get(handlers::engagement::get_likes)
                .post(handlers::engagement::like_paper)
                .delete(handlers::engagement::unlike_paper),
        )

        // Notifications
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/read", post(handlers::notifications::mark_all_read))
        .route("/notifications/{id}/read", post(handlers::notifications::mark_read))

        // Discussion
        .route(
            "/papers/{id}/feedback",
            get(handlers::discussion::list_feedback).post(handlers::discussion::create_feedback),
        )
        .route(
            "/papers/{id}/comments",
            get(handlers::discussion::list_comments).post(handlers::discussion::create_comment),
        )
        .route("/comments/{id}", delete(handlers::discussion::delete_comment))

        // Shared links, managed
        .route(
            "/papers/{id}/shared-links",
            get(handlers::shared_links::list_links).post(handlers::shared_links::create_link),
        )
        .route(
            "/shared-links/{id}",
            patch(handlers::shared_links::update_link).delete(handlers::shared_links::delete_link),
        )

        // Shared links, consumed
        .route("/shared/{access_key}", get(handlers::shared_links::view_shared))
        .route("/shared/{access_key}/download", get(handlers::shared_links::download_shared))
        .route(
            "/shared/{access_key}/comments",
            get(handlers::shared_links::list_guest_comments)
                .post(handlers::shared_links::create_guest_comment),
        );

    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests));

    let limits = &state.config.rate_limit;
    if limits.enabled {
        if let Some(limiter) = middleware::rate_limit::create_rate_limiter(limits.requests_per_second, limits.burst) {
            app = app.layer(axum::middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit::rate_limit_middleware,
            ));
        }
    }

    app.layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
