use crate::error::InputError;
use crate::models::LineItem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 单据类型判别值 (请求体里的 `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Estimate,
    Order,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Estimate => "estimate",
            DocumentType::Order => "order",
        }
    }

    /// 列表响应里的集合名
    pub fn plural(&self) -> &'static str {
        match self {
            DocumentType::Estimate => "estimates",
            DocumentType::Order => "orders",
        }
    }

    /// 单据编号前缀
    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentType::Estimate => "EST",
            DocumentType::Order => "ORD",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estimate" => Ok(DocumentType::Estimate),
            "order" => Ok(DocumentType::Order),
            other => Err(InputError::InvalidType(other.to_string())),
        }
    }
}

/// 单据类型专有字段
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentKind {
    #[serde(rename_all = "camelCase")]
    Estimate {
        valid_until: String,
        lead_time: String,
    },
    #[serde(rename_all = "camelCase")]
    Order { requested_delivery_date: String },
}

impl DocumentKind {
    pub fn document_type(&self) -> DocumentType {
        match self {
            DocumentKind::Estimate { .. } => DocumentType::Estimate,
            DocumentKind::Order { .. } => DocumentType::Order,
        }
    }
}

/// 见积书 / 发注书
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_number: String,
    pub date: String,
    pub counterparty_name: String,
    pub counterparty_address: String,
    pub delivery_location: String,
    pub payment_method: String,
    pub items: Vec<LineItem>,
    pub notes: String,
    #[serde(flatten)]
    pub kind: DocumentKind,
}

impl Document {
    pub fn document_type(&self) -> DocumentType {
        self.kind.document_type()
    }

    /// 解析 `{ type, ...fields }` 形式的请求体
    pub fn from_request(value: serde_json::Value) -> Result<Self, InputError> {
        let doc_type = match value.get("type") {
            None | Some(serde_json::Value::Null) => return Err(InputError::MissingType),
            Some(serde_json::Value::String(s)) => s.parse::<DocumentType>()?,
            Some(other) => return Err(InputError::InvalidType(other.to_string())),
        };
        Self::from_fields(doc_type, value)
    }

    /// 已知类型时解析其余字段
    pub fn from_fields(doc_type: DocumentType, value: serde_json::Value) -> Result<Self, InputError> {
        if !value.is_object() {
            return Err(InputError::Malformed("request body must be a JSON object".to_string()));
        }
        let payload: DocumentPayload = serde_json::from_value(value)
            .map_err(|e| InputError::Malformed(e.to_string()))?;
        Ok(payload.into_document(doc_type))
    }
}

/// 线上格式: 兼容表单原有的字段名
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "estimateNumber", alias = "orderNumber")]
    document_number: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "clientName", alias = "supplierName")]
    counterparty_name: Option<String>,
    #[serde(default, alias = "clientAddress", alias = "supplierAddress")]
    counterparty_address: Option<String>,
    #[serde(default)]
    delivery_location: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default)]
    lead_time: Option<String>,
    #[serde(default)]
    requested_delivery_date: Option<String>,
    // 缺失或 null 视为空列表; 非数组则是输入错误
    #[serde(default)]
    items: Option<Vec<LineItem>>,
    #[serde(default)]
    notes: Option<String>,
}

impl DocumentPayload {
    fn into_document(self, doc_type: DocumentType) -> Document {
        let kind = match doc_type {
            DocumentType::Estimate => DocumentKind::Estimate {
                valid_until: self.valid_until.unwrap_or_default(),
                lead_time: self.lead_time.unwrap_or_default(),
            },
            DocumentType::Order => DocumentKind::Order {
                requested_delivery_date: self.requested_delivery_date.unwrap_or_default(),
            },
        };

        Document {
            id: self.id,
            document_number: self.document_number.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            counterparty_name: self.counterparty_name.unwrap_or_default(),
            counterparty_address: self.counterparty_address.unwrap_or_default(),
            delivery_location: self.delivery_location.unwrap_or_default(),
            payment_method: self.payment_method.unwrap_or_default(),
            items: self.items.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            kind,
        }
    }
}

/// 生成单据编号: `EST-YYYYMMDD-NNN` / `ORD-YYYYMMDD-NNN`
///
/// 序号至少三位, 当日超过 999 张时自然扩展为四位以上, 不会回绕。
pub fn format_document_number(doc_type: DocumentType, date: NaiveDate, seq: u32) -> String {
    format!("{}-{}-{:03}", doc_type.number_prefix(), date.format("%Y%m%d"), seq)
}

/// 解析单据编号, 返回 (日期, 序号); 格式不符时为 None
pub fn parse_document_number(doc_type: DocumentType, number: &str) -> Option<(NaiveDate, u32)> {
    let mut parts = number.split('-');
    let (Some(prefix), Some(date), Some(seq), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    if prefix != doc_type.number_prefix()
        || date.len() != 8
        || seq.len() < 3
        || !seq.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let seq = seq.parse().ok()?;
    Some((date, seq))
}

/// 发行日格式 YYYY/MM/DD
pub fn format_issue_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_estimate_with_form_field_names() {
        let doc = Document::from_request(json!({
            "type": "estimate",
            "estimateNumber": "EST-20250328-001",
            "date": "2025/03/28",
            "clientName": "山田商事",
            "clientAddress": "東京都千代田区",
            "validUntil": "2025/04/27",
            "items": [{ "productName": "Widget", "quantity": "10", "unitPrice": "500" }]
        }))
        .unwrap();

        assert_eq!(doc.document_type(), DocumentType::Estimate);
        assert_eq!(doc.document_number, "EST-20250328-001");
        assert_eq!(doc.counterparty_name, "山田商事");
        assert_eq!(doc.items.len(), 1);
        match doc.kind {
            DocumentKind::Estimate { valid_until, .. } => assert_eq!(valid_until, "2025/04/27"),
            _ => panic!("expected estimate"),
        }
    }

    #[test]
    fn test_parse_order_with_supplier_fields() {
        let doc = Document::from_request(json!({
            "type": "order",
            "orderNumber": "ORD-20250401-007",
            "supplierName": "鈴木物産",
            "requestedDeliveryDate": "2025/04/15"
        }))
        .unwrap();
        assert_eq!(doc.document_type(), DocumentType::Order);
        assert_eq!(doc.counterparty_name, "鈴木物産");
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_missing_and_null_items_are_empty() {
        let doc = Document::from_request(json!({ "type": "order", "items": null })).unwrap();
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_items_not_array_is_input_error() {
        let err = Document::from_request(json!({ "type": "order", "items": "nope" })).unwrap_err();
        assert!(matches!(err, InputError::Malformed(_)));
    }

    #[test]
    fn test_invalid_and_missing_type() {
        let err = Document::from_request(json!({ "type": "invoice" })).unwrap_err();
        assert!(matches!(err, InputError::InvalidType(ref t) if t == "invoice"));

        let err = Document::from_request(json!({ "clientName": "x" })).unwrap_err();
        assert!(matches!(err, InputError::MissingType));

        let err = Document::from_request(json!({ "type": 3 })).unwrap_err();
        assert!(matches!(err, InputError::InvalidType(_)));
    }

    #[test]
    fn test_document_numbers() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
        let number = format_document_number(DocumentType::Estimate, date, 1);
        assert_eq!(number, "EST-20250328-001");
        assert_eq!(parse_document_number(DocumentType::Estimate, &number), Some((date, 1)));
        assert_eq!(parse_document_number(DocumentType::Order, &number), None);
        assert_eq!(parse_document_number(DocumentType::Order, "ORD-2025032-001"), None);
        assert_eq!(parse_document_number(DocumentType::Order, "ORD-20251399-001"), None);
        assert_eq!(parse_document_number(DocumentType::Order, "ORD-20250328-01"), None);
        assert_eq!(parse_document_number(DocumentType::Order, "ORD-20250328-0x1"), None);
        assert_eq!(format_issue_date(date), "2025/03/28");
    }

    #[test]
    fn test_document_number_widens_past_999() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
        assert_eq!(format_document_number(DocumentType::Order, date, 999), "ORD-20250328-999");
        let number = format_document_number(DocumentType::Order, date, 1000);
        assert_eq!(number, "ORD-20250328-1000");
        assert_eq!(parse_document_number(DocumentType::Order, &number), Some((date, 1000)));
    }

    #[test]
    fn test_document_serializes_with_type_tag() {
        let doc = Document::from_request(json!({ "type": "order", "supplierName": "A" })).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "order");
        assert_eq!(value["counterpartyName"], "A");
        assert_eq!(value["requestedDeliveryDate"], "");
    }
}
