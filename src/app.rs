use std::net::SocketAddr;

use axum::{
    extract::State,
    http::Uri,
    middleware::map_response_with_state,
    response::Response,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, error::{self, AppError}, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router(state.clone()))
                .route("/health", get(|| async { "ok" })),
        )
        .fallback(unmatched_route)
        .layer(map_response_with_state(state.clone(), render_errors))
        .with_state(state)
        .layer(CorsLayer::permissive())
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

async fn unmatched_route(uri: Uri) -> AppError {
    AppError::NotFound(format!("Can't find {uri} on this server!"))
}

/// Centralized error rendering. Errors carry their facts in an extension;
/// in development mode the production-safe body is swapped for the verbose
/// one. Production responses pass through untouched.
async fn render_errors(State(state): State<AppState>, res: Response) -> Response {
    if state.config.env.is_production() {
        return res;
    }
    if let Some(details) = res.extensions().get::<error::ErrorDetails>() {
        return error::render_verbose(details);
    }
    res
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
