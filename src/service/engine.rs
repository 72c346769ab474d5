//! 渲染引擎抽象: 每个请求独占一个会话, 任何退出路径都会释放

use crate::error::EngineError;
use crate::service::layout::DocumentLayout;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 渲染引擎: 负责启动会话
pub trait RenderEngine: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// 启动一个独立的渲染会话
    fn launch(&self) -> Result<Box<dyn RenderSession>, EngineError>;
}

/// 单次渲染会话
pub trait RenderSession: Send {
    /// 把版面绘制为 PDF 字节; 应在页与页之间检查取消标记
    fn rasterize(&mut self, layout: &DocumentLayout, cancel: &CancelToken)
        -> Result<Vec<u8>, EngineError>;

    /// 释放会话持有的资源
    fn close(&mut self) {}
}

/// 取消标记
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 已取消时返回错误, 便于在绘制循环中用 `?` 提前退出
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 离开作用域时自动取消
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// 会话计数: 当前活跃数与累计启动数
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active: Arc<AtomicUsize>,
    launched: Arc<AtomicUsize>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// 启动会话并登记, 返回的守卫在 drop 时关闭会话
    pub fn acquire(&self, engine: &dyn RenderEngine) -> Result<SessionGuard, EngineError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        let session = engine.launch()?;
        self.active.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Render session acquired from engine {}", engine.name());
        Ok(SessionGuard {
            session,
            active: Arc::clone(&self.active),
        })
    }
}

/// 会话守卫
pub struct SessionGuard {
    session: Box<dyn RenderSession>,
    active: Arc<AtomicUsize>,
}

impl SessionGuard {
    pub fn rasterize(
        &mut self,
        layout: &DocumentLayout,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EngineError> {
        self.session.rasterize(layout, cancel)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("Render session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSession;

    impl RenderSession for NoopSession {
        fn rasterize(&mut self, _: &DocumentLayout, cancel: &CancelToken) -> Result<Vec<u8>, EngineError> {
            cancel.check()?;
            Ok(b"%PDF-1.3".to_vec())
        }
    }

    struct NoopEngine;

    impl RenderEngine for NoopEngine {
        fn name(&self) -> &str {
            "noop"
        }

        fn launch(&self) -> Result<Box<dyn RenderSession>, EngineError> {
            Ok(Box::new(NoopSession))
        }
    }

    struct BrokenEngine;

    impl RenderEngine for BrokenEngine {
        fn name(&self) -> &str {
            "broken"
        }

        fn launch(&self) -> Result<Box<dyn RenderSession>, EngineError> {
            Err(EngineError::Launch("no display".into()))
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let tracker = SessionTracker::new();
        {
            let _guard = tracker.acquire(&NoopEngine).unwrap();
            assert_eq!(tracker.active(), 1);
        }
        assert_eq!(tracker.active(), 0);
        assert_eq!(tracker.launched(), 1);
    }

    #[test]
    fn test_failed_launch_is_not_active() {
        let tracker = SessionTracker::new();
        assert!(tracker.acquire(&BrokenEngine).is_err());
        assert_eq!(tracker.active(), 0);
        assert_eq!(tracker.launched(), 1);
    }

    #[test]
    fn test_cancel_on_drop() {
        let token = CancelToken::new();
        {
            let _guard = token.drop_guard();
            assert!(token.check().is_ok());
        }
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(EngineError::Cancelled));
    }
}
