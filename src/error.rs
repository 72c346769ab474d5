use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 请求输入错误 (4xx, 不会影响进程)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("missing document type: expected \"estimate\" or \"order\"")]
    MissingType,

    #[error("invalid document type {0}: expected \"estimate\" or \"order\"")]
    InvalidType(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("ユーザー名とパスワードを入力してください。")]
    MissingCredentials,
}

/// 渲染引擎错误 (启动失败 / 绘制失败 / 超时)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("render engine failed to start: {0}")]
    Launch(String),

    #[error("rasterize failed: {0}")]
    Rasterize(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("render exceeded time budget of {0:?}")]
    Timeout(Duration),

    #[error("render cancelled")]
    Cancelled,

    #[error("render engine produced an empty document")]
    EmptyOutput,

    #[error("render worker aborted: {0}")]
    Aborted(String),
}

/// 渲染流程所处阶段 (用于日志定位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Parse,
    Layout,
    Launch,
    Rasterize,
    Encode,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Parse => "parse",
            RenderStage::Layout => "layout",
            RenderStage::Launch => "launch",
            RenderStage::Rasterize => "rasterize",
            RenderStage::Encode => "encode",
        };
        f.write_str(name)
    }
}

impl EngineError {
    /// 错误发生的阶段
    pub fn stage(&self) -> RenderStage {
        match self {
            EngineError::Launch(_) | EngineError::Font(_) => RenderStage::Launch,
            _ => RenderStage::Rasterize,
        }
    }
}

/// 请求边界统一错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("PDF generation failed: {0}")]
    RenderEngine(#[from] EngineError),

    #[error("failed to encode PDF: {0}")]
    Encoding(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("authentication required")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::RenderEngine(_) | AppError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::from(InputError::MissingType).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(EngineError::Timeout(Duration::from_secs(30))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Encoding("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_engine_error_stage() {
        assert_eq!(EngineError::Launch("x".into()).stage(), RenderStage::Launch);
        assert_eq!(EngineError::Cancelled.stage(), RenderStage::Rasterize);
    }

    #[test]
    fn test_messages_are_descriptive() {
        let msg = AppError::from(InputError::InvalidType("invoice".into())).to_string();
        assert!(msg.contains("invoice"));
        let msg = AppError::from(EngineError::Launch("no font".into())).to_string();
        assert!(msg.starts_with("PDF generation failed"));
    }
}
