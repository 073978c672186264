use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use invoice_lifecycle_rust::api::{handlers, AppState};
use invoice_lifecycle_rust::{create_pool, AppConfig, CsvExporter, InvoiceService};
use tower::ServiceBuilder;
use tracing::info;
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
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    // 装配服务
    let state = AppState {
        invoices: Arc::new(InvoiceService::new(pool.clone(), &config.app)?),
        exporter: Arc::new(CsvExporter::new(pool.clone())),
        pool,
    };

    // 构建路由
    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/invoices", post(handlers::create_invoice))
        .route(
            "/api/invoices/:id/paid-status",
            put(handlers::update_paid_status),
        )
        .route("/api/invoices/:id/archive", post(handlers::toggle_archive))
        .route(
            "/api/invoices/archive-old",
            post(handlers::archive_old_invoices),
        )
        .route(
            "/api/invoices/export/csv",
            get(handlers::export_invoices_csv),
        )
        .route("/api/audit-logs", get(handlers::list_audit_logs))
        .layer(ServiceBuilder::new())
        .with_state(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/invoices                  - 创建发票");
    info!("  PUT  /api/invoices/:id/paid-status  - 更新付款状态");
    info!("  POST /api/invoices/:id/archive      - 归档开关");
    info!("  POST /api/invoices/archive-old      - 归档超龄未付款发票");
    info!("  GET  /api/invoices/export/csv       - 流式导出 CSV");
    info!("  GET  /api/audit-logs                - 审计日志查询");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
