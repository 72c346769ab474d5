pub mod auth;
pub mod documents;
pub mod handlers;

pub use handlers::*;

use crate::db::DocumentRepository;
use crate::models::DocumentType;
use crate::service::{DocumentRenderer, SessionStore};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<DocumentRenderer>,
    pub repository: Arc<dyn DocumentRepository>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(renderer: DocumentRenderer, repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            repository,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

/// 构建路由
///
/// `/health` 和 `/api/auth/login` 公开, 其余 `/api/*` 需要 Bearer 令牌。
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/generate-pdf", post(handlers::generate_pdf))
        .route("/api/generate-pdf/download", post(handlers::download_pdf))
        .route("/api/auth/logout", post(auth::logout))
        .nest("/api/estimates", documents::routes(DocumentType::Estimate))
        .nest("/api/orders", documents::routes(DocumentType::Order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_requests)))
        .with_state(state)
}

/// 访问日志
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    tracing::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
