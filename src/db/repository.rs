use crate::models::{
    format_document_number, format_issue_date, parse_document_number, Document, DocumentKind,
    DocumentType, LineItem, Totals,
};
use crate::service::calculate;
use chrono::{DateTime, Local, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// 单据状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentStatus {
    #[serde(rename = "下書き")]
    Draft,
    #[serde(rename = "発行済み")]
    Issued,
    #[serde(rename = "承認待ち")]
    PendingApproval,
}

/// 已保存的单据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(flatten)]
    pub document: Document,
    pub status: DocumentStatus,
    pub totals: Totals,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn id(&self) -> &str {
        self.document.id.as_deref().unwrap_or_default()
    }
}

/// 单据仓库接口
pub trait DocumentRepository: Send + Sync {
    /// 按创建顺序列出
    fn list(&self, doc_type: DocumentType) -> Vec<DocumentRecord>;

    /// 保存单据: 分配 id, 缺编号时生成编号, 重新计算合计
    fn create(&self, document: Document) -> DocumentRecord;

    fn get(&self, doc_type: DocumentType, id: &str) -> Option<DocumentRecord>;

    fn delete(&self, doc_type: DocumentType, id: &str) -> bool;
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<DocumentType, IndexMap<String, DocumentRecord>>,
    // (类型, 日期) -> 当日已发的序号
    sequences: HashMap<(DocumentType, NaiveDate), u32>,
}

/// 内存仓库 (进程退出即丢失)
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带两条示例见积书
    pub fn seeded() -> Self {
        let repo = Self::new();
        let samples = [
            ("2025/03/28", "EST-20250328-001", "山田商事", "ステンレスボルト M8", 250, 500, DocumentStatus::Issued),
            ("2025/03/25", "EST-20250325-002", "鈴木物産", "アルミフレーム 30x30", 157, 500, DocumentStatus::PendingApproval),
        ];
        for (date, number, client, product, qty, price, status) in samples {
            let document = Document {
                id: None,
                document_number: number.to_string(),
                date: date.to_string(),
                counterparty_name: client.to_string(),
                counterparty_address: String::new(),
                delivery_location: String::new(),
                payment_method: String::new(),
                items: vec![LineItem::new(product, i64::from(qty), i64::from(price))],
                notes: String::new(),
                kind: DocumentKind::Estimate {
                    valid_until: String::new(),
                    lead_time: String::new(),
                },
            };
            let mut record = repo.create(document);
            record.status = status;
            repo.replace(record);
        }
        repo
    }

    /// 指定"今天"创建, 便于测试编号
    pub fn create_on(&self, mut document: Document, today: NaiveDate) -> DocumentRecord {
        let doc_type = document.document_type();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let issue_date = NaiveDate::parse_from_str(document.date.trim(), "%Y/%m/%d").ok();
        if issue_date.is_none() {
            document.date = format_issue_date(today);
        }
        let supplied = document.document_number.trim().to_string();
        match parse_document_number(doc_type, &supplied) {
            Some((date, seq)) => {
                // 保留客户端编号, 并让当日序号越过它, 避免之后生成重复编号
                let last = inner.sequences.entry((doc_type, date)).or_insert(0);
                *last = (*last).max(seq);
                document.document_number = supplied;
            }
            None => {
                if !supplied.is_empty() {
                    tracing::warn!(doc_type = %doc_type, "Replacing malformed document number {:?}", supplied);
                }
                let date = issue_date.unwrap_or(today);
                let seq = inner.sequences.entry((doc_type, date)).or_insert(0);
                *seq += 1;
                document.document_number = format_document_number(doc_type, date, *seq);
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        document.id = Some(id.clone());
        let record = DocumentRecord {
            totals: calculate(&document.items).totals,
            document,
            status: DocumentStatus::Draft,
            created_at: Utc::now(),
        };

        inner
            .records
            .entry(doc_type)
            .or_default()
            .insert(id, record.clone());
        tracing::info!(
            "Stored {} {} ({} items)",
            doc_type,
            record.document.document_number,
            record.document.items.len()
        );
        record
    }

    fn replace(&self, record: DocumentRecord) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let doc_type = record.document.document_type();
        inner
            .records
            .entry(doc_type)
            .or_default()
            .insert(record.id().to_string(), record);
    }
}

impl DocumentRepository for InMemoryRepository {
    fn list(&self, doc_type: DocumentType) -> Vec<DocumentRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .records
            .get(&doc_type)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn create(&self, document: Document) -> DocumentRecord {
        self.create_on(document, Local::now().date_naive())
    }

    fn get(&self, doc_type: DocumentType, id: &str) -> Option<DocumentRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.get(&doc_type)?.get(id).cloned()
    }

    fn delete(&self, doc_type: DocumentType, id: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .records
            .get_mut(&doc_type)
            .and_then(|records| records.shift_remove(id))
            .is_some()
    }
}
