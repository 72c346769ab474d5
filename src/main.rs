use std::sync::Arc;
use trading_docs::{build_router, AppConfig, AppState, DocumentRenderer, InMemoryRepository, PdfEngine};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 渲染引擎 (字体在启动时加载, 失败直接退出)
    let engine = PdfEngine::from_config(&config.render).map_err(|e| {
        error!("Render engine unavailable: {}", e);
        e
    })?;
    let renderer = DocumentRenderer::new(Arc::new(engine), &config.render, config.company.clone());
    let repository = Arc::new(InMemoryRepository::seeded());

    let app = build_router(AppState::new(renderer, repository));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/auth/login              - Issue session token");
    info!("  POST   /api/auth/logout             - Revoke session token");
    info!("  POST   /api/generate-pdf            - Render estimate/order (base64 JSON)");
    info!("  POST   /api/generate-pdf/download   - Render estimate/order (attachment)");
    info!("  GET    /api/estimates | /api/orders - List stored documents");
    info!("  POST   /api/estimates | /api/orders - Store a document");
    info!("  GET    /api/{{estimates,orders}}/:id - Fetch a document");
    info!("  DELETE /api/{{estimates,orders}}/:id - Delete a document");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
