use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use lazy_static::lazy_static;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, recruiter, seeker, users};

lazy_static! {
    static ref STARTED_AT: Instant = Instant::now();
}

pub fn build_app(state: AppState) -> Router {
    // Touch the uptime clock so it counts from boot, not the first probe.
    let _ = STARTED_AT.elapsed();
    let cors = cors_layer(&state);

    let api = Router::new()
        .route("/", get(|| async { "Welcome to Hirelane API" }))
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/recruiter", recruiter::router(state.clone()))
        .nest("/job-seeker", seeker::router(state.clone()));

    Router::new()
        .route("/", get(|| async { "Welcome to Hirelane" }))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// When a frontend origin is configured the browser needs credentialed CORS;
/// otherwise stay permissive for local tooling.
fn cors_layer(state: &AppState) -> CorsLayer {
    match state.config.frontend_url.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
            Err(_) => {
                tracing::warn!(origin, "FRONTEND_URL is not a valid origin, CORS left permissive");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp,
        "uptime": STARTED_AT.elapsed().as_secs_f64(),
        "environment": state.config.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
