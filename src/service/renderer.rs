use crate::config::{CompanyProfile, RenderConfig};
use crate::error::{AppError, EngineError, RenderStage};
use crate::models::{Document, DocumentType, Totals};
use crate::service::engine::{CancelToken, RenderEngine, SessionTracker};
use crate::service::layout::{build_layout, DocumentLayout, LayoutSettings};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub document_type: DocumentType,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub row_count: usize,
    pub totals: Totals,
}

impl RenderedPdf {
    /// 供 JSON 传输的 base64 编码 (字节已由 `render` 保证非空)
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// 单据渲染服务
///
/// 无共享可变状态: 每次渲染独立启动一个引擎会话, 并在限定时间内完成。
pub struct DocumentRenderer {
    engine: Arc<dyn RenderEngine>,
    settings: LayoutSettings,
    timeout: Duration,
    tracker: SessionTracker,
}

impl DocumentRenderer {
    pub fn new(engine: Arc<dyn RenderEngine>, config: &RenderConfig, company: CompanyProfile) -> Self {
        Self {
            engine,
            settings: LayoutSettings {
                min_rows: config.min_rows,
                company,
            },
            timeout: Duration::from_secs(config.timeout_secs),
            tracker: SessionTracker::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 当前未释放的会话数
    pub fn active_sessions(&self) -> usize {
        self.tracker.active()
    }

    /// 累计尝试启动的会话数
    pub fn sessions_launched(&self) -> usize {
        self.tracker.launched()
    }

    /// 重新计算合计并生成版面
    pub fn layout(&self, document: &Document) -> DocumentLayout {
        build_layout(document, &self.settings)
    }

    /// 渲染为 PDF; 失败时不返回任何部分结果
    pub async fn render(&self, document: &Document) -> Result<RenderedPdf, AppError> {
        let doc_type = document.document_type();
        let started = Instant::now();
        info!(doc_type = %doc_type, items = document.items.len(), "Starting PDF generation");

        let cancel = CancelToken::new();
        // 超时或请求被丢弃时通知工作线程尽快退出
        let _cancel_on_exit = cancel.drop_guard();

        // 版面构建同样计入时限, 放在阻塞线程里执行
        let engine = Arc::clone(&self.engine);
        let tracker = self.tracker.clone();
        let settings = self.settings.clone();
        let job_document = document.clone();
        let job_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let layout = build_layout(&job_document, &settings);
            tracing::debug!(
                doc_type = %doc_type,
                stage = %RenderStage::Layout,
                pages = layout.page_count(),
                rows = layout.row_count(),
                "Layout built"
            );
            job_cancel.check()?;

            let mut session = tracker.acquire(engine.as_ref())?;
            let bytes = session.rasterize(&layout, &job_cancel)?;
            Ok::<_, EngineError>((layout, bytes))
        });

        let outcome = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::Aborted(join_err.to_string())),
            Err(_) => {
                cancel.cancel();
                Err(EngineError::Timeout(self.timeout))
            }
        };

        let (layout, bytes) = match outcome {
            Ok((_, bytes)) if bytes.is_empty() => {
                error!(doc_type = %doc_type, stage = %RenderStage::Rasterize, "Generated PDF is empty");
                return Err(EngineError::EmptyOutput.into());
            }
            Ok(done) => done,
            Err(e) => {
                error!(doc_type = %doc_type, stage = %e.stage(), error = %e, "PDF generation failed");
                return Err(e.into());
            }
        };

        info!(
            doc_type = %doc_type,
            pages = layout.page_count(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF generated successfully"
        );

        Ok(RenderedPdf {
            document_type: doc_type,
            page_count: layout.page_count(),
            row_count: layout.row_count(),
            totals: layout.totals,
            bytes,
        })
    }

    /// 渲染并编码为 base64
    pub async fn render_base64(&self, document: &Document) -> Result<String, AppError> {
        Ok(self.render(document).await?.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use crate::service::pdf::PdfEngine;
    use serde_json::json;

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::new(
            Arc::new(PdfEngine::builtin()),
            &RenderConfig::default(),
            CompanyProfile::default(),
        )
    }

    fn widget_estimate() -> Document {
        let mut doc = Document::from_request(json!({ "type": "estimate", "clientName": "Widget Co" })).unwrap();
        doc.items = vec![LineItem::new("Widget", "10", "500")];
        doc
    }

    #[tokio::test]
    async fn test_render_widget_estimate() {
        let renderer = renderer();
        let pdf = renderer.render(&widget_estimate()).await.unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.page_count, 1);
        assert_eq!(pdf.row_count, 8);
        assert_eq!(pdf.totals.total, bigdecimal::BigDecimal::from(5500));
        assert_eq!(renderer.active_sessions(), 0);
        assert_eq!(renderer.sessions_launched(), 1);
    }

    #[tokio::test]
    async fn test_base64_decodes_back_to_pdf() {
        let encoded = renderer().render_base64(&widget_estimate()).await.unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert!(decoded.starts_with(b"%PDF"));
    }
}
