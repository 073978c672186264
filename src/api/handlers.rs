use axum::{
    body::Body,
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::api::AppState;
use crate::error::DocumentError;
use crate::models::audit::AuditLogFilter;
use crate::models::export::ExportFilter;
use crate::models::invoice::{NewInvoice, PaidStatus};
use crate::service::archive;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
}

fn error_response(err: DocumentError) -> Response {
    let status = match &err {
        DocumentError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DocumentError::AllocationConflict => StatusCode::CONFLICT,
        DocumentError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ApiError {
        success: false,
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 创建发票 (装配主表/明细/税费/自定义字段, 单事务)
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<NewInvoice>,
) -> Response {
    match state.invoices.create_invoice(payload).await {
        Ok(invoice) => (StatusCode::CREATED, Json(invoice)).into_response(),
        Err(e) => {
            tracing::error!("创建发票失败: {}", e);
            error_response(e)
        }
    }
}

/// 付款状态更新请求: 操作人由调用方显式传入
#[derive(Debug, Deserialize)]
pub struct UpdatePaidStatusRequest {
    pub paid_status: PaidStatus,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePaidStatusResponse {
    pub success: bool,
    /// 本次更新是否构成真实迁移并写入审计
    pub audit_recorded: bool,
}

/// 更新付款状态, 真实迁移时同事务写入审计记录
pub async fn update_paid_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
    Json(req): Json<UpdatePaidStatusRequest>,
) -> Response {
    match state
        .invoices
        .update_paid_status(invoice_id, req.paid_status, req.user_id)
        .await
    {
        Ok(recorded) => Json(UpdatePaidStatusResponse {
            success: true,
            audit_recorded: recorded,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// 归档开关
pub async fn toggle_archive(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Response {
    match state.invoices.toggle_archive(invoice_id).await {
        Ok(invoice) => Json(invoice).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ArchiveOldRequest {
    /// 归档阈值 (天), 缺省 60
    pub days: Option<i64>,
}

/// 归档超龄未付款发票 (尽力而为批处理)
pub async fn archive_old_invoices(
    State(state): State<AppState>,
    Json(req): Json<ArchiveOldRequest>,
) -> Response {
    let days = req.days.unwrap_or(60);
    match archive::archive_old_invoices(&state.pool, days).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// 审计日志查询 (过滤/排序/分页)
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditLogFilter>,
) -> Response {
    match crate::db::queries_audit::list_audit_logs(&state.pool, &filter).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => error_response(DocumentError::Persistence(e)),
    }
}

/// 流式导出 CSV: 后台任务逐页写入管道, 响应体边生成边传输
pub async fn export_invoices_csv(
    State(state): State<AppState>,
    Query(filter): Query<ExportFilter>,
) -> Response {
    let (mut writer, reader) = tokio::io::duplex(16 * 1024);

    let exporter = state.exporter.clone();
    tokio::spawn(async move {
        if let Err(e) = exporter.export(filter, &mut writer).await {
            // 已写出的行保持已交付, 流在此处中断
            tracing::error!("CSV 导出中断: {}", e);
        }
    });

    let stream = futures::stream::unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; 8 * 1024];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok::<_, std::io::Error>(buf), reader))
            }
            Err(e) => Some((Err(e), reader)),
        }
    });

    let filename = format!("invoices_{}.csv", Utc::now().format("%Y-%m-%d_%H-%M-%S"));
    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    (headers, Body::from_stream(stream)).into_response()
}
