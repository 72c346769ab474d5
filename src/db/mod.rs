pub mod repository;

pub use repository::{DocumentRecord, DocumentRepository, DocumentStatus, InMemoryRepository};
