pub mod calculator;
pub mod engine;
pub mod layout;
pub mod pdf;
pub mod renderer;
pub mod session;

pub use calculator::calculate;
pub use engine::{CancelToken, RenderEngine, RenderSession, SessionTracker};
pub use layout::{build_layout, DocumentLayout, LayoutSettings};
pub use pdf::PdfEngine;
pub use renderer::{DocumentRenderer, RenderedPdf};
pub use session::{Session, SessionStore};
