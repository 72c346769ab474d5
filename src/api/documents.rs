use crate::api::AppState;
use crate::db::DocumentRecord;
use crate::error::{AppError, InputError};
use crate::models::{Document, DocumentType};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    routing::get,
    Router,
};
use serde_json::{Map, Value};

/// 某一类单据的 CRUD 路由, 挂在 `/api/estimates` 或 `/api/orders` 下
pub fn routes(doc_type: DocumentType) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| list_documents(state, doc_type)).post(
                move |State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>| {
                    create_document(state, doc_type, payload)
                },
            ),
        )
        .route(
            "/:id",
            get(move |State(state): State<AppState>, Path(id): Path<String>| {
                get_document(state, doc_type, id)
            })
            .delete(move |State(state): State<AppState>, Path(id): Path<String>| {
                delete_document(state, doc_type, id)
            }),
        )
}

/// `{ "success": true, <key>: <value> }`
fn envelope(key: &str, value: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(key.to_string(), value);
    Json(Value::Object(body))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Encoding(e.to_string()))
}

fn not_found(doc_type: DocumentType, id: &str) -> AppError {
    AppError::NotFound(format!("{} {}", doc_type, id))
}

pub async fn list_documents(state: AppState, doc_type: DocumentType) -> Result<Json<Value>, AppError> {
    let records: Vec<DocumentRecord> = state.repository.list(doc_type);
    tracing::debug!(doc_type = %doc_type, "Listing {} records", records.len());
    Ok(envelope(doc_type.plural(), to_value(&records)?))
}

pub async fn create_document(
    state: AppState,
    doc_type: DocumentType,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(value) = payload.map_err(|rejection| InputError::Malformed(rejection.body_text()))?;
    let document = Document::from_fields(doc_type, value)?;
    let record = state.repository.create(document);
    Ok(envelope(doc_type.as_str(), to_value(&record)?))
}

pub async fn get_document(
    state: AppState,
    doc_type: DocumentType,
    id: String,
) -> Result<Json<Value>, AppError> {
    let record = state
        .repository
        .get(doc_type, &id)
        .ok_or_else(|| not_found(doc_type, &id))?;
    Ok(envelope(doc_type.as_str(), to_value(&record)?))
}

pub async fn delete_document(
    state: AppState,
    doc_type: DocumentType,
    id: String,
) -> Result<Json<Value>, AppError> {
    if !state.repository.delete(doc_type, &id) {
        return Err(not_found(doc_type, &id));
    }
    tracing::info!(doc_type = %doc_type, "Deleted {}", id);
    Ok(envelope("id", Value::String(id)))
}
