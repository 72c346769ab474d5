use crate::api::AppState;
use crate::error::{AppError, InputError, RenderStage};
use crate::models::Document;
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// PDF 生成响应体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfResponse {
    pub success: bool,
    pub data: String,
    pub content_type: &'static str,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 解析 `{ type, ...fields }` 请求体, 在获取任何渲染资源之前完成
pub fn parse_document(payload: Result<Json<Value>, JsonRejection>) -> Result<Document, AppError> {
    let Json(value) = payload.map_err(|rejection| {
        tracing::warn!(stage = %RenderStage::Parse, "Rejected request body: {}", rejection.body_text());
        InputError::Malformed(rejection.body_text())
    })?;

    Document::from_request(value).map_err(|e| {
        tracing::warn!(stage = %RenderStage::Parse, error = %e, "Invalid document request");
        AppError::from(e)
    })
}

/// 生成 PDF, 以 base64 返回
pub async fn generate_pdf(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GeneratePdfResponse>, AppError> {
    let document = parse_document(payload)?;
    let pdf = state.renderer.render(&document).await?;
    let data = pdf.to_base64();

    Ok(Json(GeneratePdfResponse {
        success: true,
        data,
        content_type: PDF_CONTENT_TYPE,
    }))
}

/// 生成 PDF, 直接返回文件下载
pub async fn download_pdf(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let document = parse_document(payload)?;
    let pdf = state.renderer.render(&document).await?;

    let filename = format!("{}-{}.pdf", pdf.document_type, Utc::now().timestamp_millis());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| {
            tracing::error!(doc_type = %pdf.document_type, stage = %RenderStage::Encode, error = %e, "Invalid download header");
            AppError::Encoding(e.to_string())
        })?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
        (header::CONTENT_DISPOSITION, disposition),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
    ];
    Ok((headers, pdf.bytes).into_response())
}
