//! 单据版面: 把单据记录整理成可直接绘制的结构 (标题, 各区块, 分页后的明细行)

use crate::config::CompanyProfile;
use crate::models::{Document, DocumentKind, DocumentType, LineAmount, LineItem, Totals};
use crate::service::calculator::{self, TAX_RATE_PERCENT};
use bigdecimal::{BigDecimal, Zero};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 8.0;

pub const ROW_HEIGHT_MM: f32 = 6.5;
pub const TABLE_HEADER_HEIGHT_MM: f32 = 7.0;
/// 首页明细表表头上沿 (页眉, 合计框, 条件栏之下)
pub const FIRST_PAGE_TABLE_TOP_MM: f32 = 171.0;
/// 续页明细表表头上沿
pub const CONTINUATION_TABLE_TOP_MM: f32 = 275.0;
pub const FOOTER_RESERVE_MM: f32 = 14.0;
pub const SUMMARY_HEIGHT_MM: f32 = 3.0 * ROW_HEIGHT_MM + 4.0;
pub const NOTES_BASE_MM: f32 = 10.0;
pub const NOTE_LINE_MM: f32 = 4.5;
/// 备注每行最多字符数
pub const NOTE_WRAP_CHARS: usize = 60;

/// 列定义: 表头文字, 宽度占比 (%), 对齐
pub const COLUMNS: [Column; 7] = [
    Column { title: "No.", width_pct: 5.0, align: Align::Center },
    Column { title: "商品コード", width_pct: 12.0, align: Align::Center },
    Column { title: "品名・摘要", width_pct: 28.0, align: Align::Left },
    Column { title: "数量", width_pct: 10.0, align: Align::Center },
    Column { title: "単位", width_pct: 10.0, align: Align::Center },
    Column { title: "単価(円)", width_pct: 15.0, align: Align::Right },
    Column { title: "金額(円)", width_pct: 20.0, align: Align::Right },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub width_pct: f32,
    pub align: Align,
}

/// 明细表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub number: usize,
    pub cells: [String; 7],
    /// 补足最少行数用的空行
    pub blank: bool,
}

/// 一页上的明细行
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutPage {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

/// 合计行 (小计 / 消费税 / 合计金额); emphasized 的行用深色底
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub document_type: DocumentType,
    pub title: &'static str,
    pub issue_line: String,
    pub number_line: String,
    pub counterparty_name: String,
    pub counterparty_address: Option<String>,
    pub company_name: String,
    pub company_lines: Vec<String>,
    pub total_box: LabeledValue,
    pub info_grid: Vec<LabeledValue>,
    pub message: Vec<String>,
    pub pages: Vec<LayoutPage>,
    pub summary: Vec<SummaryRow>,
    pub notes: Vec<String>,
    pub footer: Vec<String>,
    pub totals: Totals,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }

    /// 续页标题
    pub fn continuation_title(&self) -> String {
        format!("{}（続き）", self.title)
    }
}

/// 版面参数
#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub min_rows: usize,
    pub company: CompanyProfile,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            min_rows: 8,
            company: CompanyProfile::default(),
        }
    }
}

/// 按单据类型区分的固定文言
struct Wording {
    title: &'static str,
    number_label: &'static str,
    total_label: &'static str,
    message: &'static str,
    footer_subject: &'static str,
}

fn wording(doc_type: DocumentType) -> Wording {
    match doc_type {
        DocumentType::Estimate => Wording {
            title: "見積書",
            number_label: "見積番号",
            total_label: "お見積金額",
            message: "下記の通りお見積り申し上げます。ご検討のほど、よろしくお願い申し上げます。",
            footer_subject: "本見積書",
        },
        DocumentType::Order => Wording {
            title: "発注書",
            number_label: "発注番号",
            total_label: "ご発注金額",
            message: "下記の通り発注申し上げます。よろしくお願い申し上げます。",
            footer_subject: "本発注書",
        },
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// 条件栏 (按单据类型不同)
fn info_grid(document: &Document) -> Vec<LabeledValue> {
    let entry = |label: &str, value: String| LabeledValue {
        label: label.to_string(),
        value,
    };
    let payment = entry("お支払条件", or_default(&document.payment_method, "銀行振込"));

    match &document.kind {
        DocumentKind::Estimate {
            valid_until,
            lead_time,
        } => vec![
            entry("有効期限", or_default(valid_until, "発行日より30日間")),
            entry("納期", or_default(lead_time, "2週間")),
            payment,
            entry("納品場所", or_default(&document.delivery_location, "お客様指定場所")),
        ],
        DocumentKind::Order {
            requested_delivery_date,
        } => vec![
            entry("希望納期", or_default(requested_delivery_date, "別途ご相談")),
            payment,
            entry("納品場所", or_default(&document.delivery_location, "弊社指定場所")),
        ],
    }
}

/// 构建版面
///
/// 合计一律在这里重新计算, 不使用客户端传来的金额。
pub fn build_layout(document: &Document, settings: &LayoutSettings) -> DocumentLayout {
    let doc_type = document.document_type();
    let words = wording(doc_type);
    let calc = calculator::calculate(&document.items);
    let company = &settings.company;

    let mut rows: Vec<TableRow> = document
        .items
        .iter()
        .zip(calc.lines.iter())
        .enumerate()
        .map(|(idx, (item, line))| item_row(idx + 1, item, line))
        .collect();
    let filled = rows.len();
    for number in filled + 1..=settings.min_rows.max(filled) {
        rows.push(blank_row(number));
    }

    let notes = wrap_notes(&document.notes, NOTE_WRAP_CHARS);
    let pages = paginate(rows, notes.len());

    let totals = calc.totals;
    let summary = vec![
        SummaryRow {
            label: "小計".to_string(),
            value: format_amount(&totals.subtotal),
            emphasized: false,
        },
        SummaryRow {
            label: format!("消費税 ({}%)", TAX_RATE_PERCENT),
            value: format_amount(&totals.tax),
            emphasized: false,
        },
        SummaryRow {
            label: "合計金額".to_string(),
            value: format_amount(&totals.total),
            emphasized: true,
        },
    ];

    let counterparty_address = Some(document.counterparty_address.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    DocumentLayout {
        document_type: doc_type,
        title: words.title,
        issue_line: format!("発行日: {}", document.date),
        number_line: format!("{}: {}", words.number_label, document.document_number),
        counterparty_name: format!("{} 御中", document.counterparty_name),
        counterparty_address,
        company_name: company.name.clone(),
        company_lines: vec![
            company.postal_address.clone(),
            format!("TEL: {} / FAX: {}", company.phone, company.fax),
            format!("Email: {}", company.email),
        ],
        total_box: LabeledValue {
            label: words.total_label.to_string(),
            value: format!("¥ {} (税込)", format_amount(&totals.total)),
        },
        info_grid: info_grid(document),
        message: vec![
            "平素は格別のお引き立てを賜り、誠にありがとうございます。".to_string(),
            words.message.to_string(),
        ],
        pages,
        summary,
        notes,
        footer: vec![
            format!("{}に関するお問い合わせは下記までお願いいたします", words.footer_subject),
            format!("{} TEL: {} / Email: {}", company.name, company.phone, company.email),
        ],
        totals,
    }
}

fn item_row(number: usize, item: &LineItem, line: &LineAmount) -> TableRow {
    TableRow {
        number,
        cells: [
            number.to_string(),
            item.product_code.clone().unwrap_or_default(),
            item.product_name.clone(),
            format_number(&line.quantity),
            item.display_unit().to_string(),
            format_number(&line.unit_price),
            format_amount(&line.amount),
        ],
        blank: false,
    }
}

fn blank_row(number: usize) -> TableRow {
    TableRow {
        number,
        cells: [
            number.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
        blank: true,
    }
}

/// 可容纳的行数
fn capacity(table_top: f32, reserve: f32) -> usize {
    let available = table_top - TABLE_HEADER_HEIGHT_MM - MARGIN_MM - FOOTER_RESERVE_MM - reserve;
    if available <= 0.0 {
        0
    } else {
        (available / ROW_HEIGHT_MM).floor() as usize
    }
}

/// 末页需要为合计, 备注预留的高度
pub fn closing_reserve(note_lines: usize) -> f32 {
    SUMMARY_HEIGHT_MM + NOTES_BASE_MM + NOTE_LINE_MM * note_lines.max(1) as f32
}

/// 分页: 行按每页容量依次排布, 末页需留出合计与备注的空间
pub fn paginate(rows: Vec<TableRow>, note_lines: usize) -> Vec<LayoutPage> {
    let reserve = closing_reserve(note_lines);
    let mut pages = Vec::new();
    let mut rest = rows;
    let mut first = true;

    loop {
        let top = if first {
            FIRST_PAGE_TABLE_TOP_MM
        } else {
            CONTINUATION_TABLE_TOP_MM
        };

        if rest.len() <= capacity(top, reserve) {
            pages.push(LayoutPage { rows: rest });
            return pages;
        }

        let take = capacity(top, 0.0).max(1).min(rest.len());
        let tail = rest.split_off(take);
        pages.push(LayoutPage { rows: rest });
        rest = tail;
        first = false;
    }
}

/// 备注换行: 保留原有换行, 过长的行按字符数折行
pub fn wrap_notes(notes: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in notes.trim_end().lines() {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

/// 金额格式: 取整到日元, 千分位, 无小数
pub fn format_amount(value: &BigDecimal) -> String {
    let whole = value.round(0).with_scale(0);
    group_thousands(&whole.to_string())
}

/// 数量/单价格式: 整数带千分位, 有小数时保留小数部分
pub fn format_number(value: &BigDecimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    if value.with_scale(0) == *value {
        return group_thousands(&value.with_scale(0).to_string());
    }
    let text = value.normalized().to_string();
    match text.split_once('.') {
        Some((int_part, frac_part)) => format!("{}.{}", group_thousands(int_part), frac_part),
        None => text,
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{}{}", sign, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn estimate(items: Vec<LineItem>) -> Document {
        let mut doc = Document::from_request(json!({
            "type": "estimate",
            "estimateNumber": "EST-20250328-001",
            "date": "2025/03/28",
            "clientName": "山田商事"
        }))
        .unwrap();
        doc.items = items;
        doc
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(&dec("0")), "0");
        assert_eq!(format_amount(&dec("999")), "999");
        assert_eq!(format_amount(&dec("1000")), "1,000");
        assert_eq!(format_amount(&dec("1234567")), "1,234,567");
        assert_eq!(format_amount(&dec("-125000")), "-125,000");
        assert_eq!(format_amount(&dec("5500.00")), "5,500");
    }

    #[test]
    fn test_format_number_keeps_fraction() {
        assert_eq!(format_number(&dec("10")), "10");
        assert_eq!(format_number(&dec("1500")), "1,500");
        assert_eq!(format_number(&dec("1.50")), "1.5");
        assert_eq!(format_number(&dec("12345.25")), "12,345.25");
    }

    #[test]
    fn test_short_list_is_padded_to_min_rows() {
        let layout = build_layout(&estimate(vec![LineItem::new("Widget", "10", "500")]), &LayoutSettings::default());
        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.row_count(), 8);
        let rows = &layout.pages[0].rows;
        assert!(!rows[0].blank);
        assert_eq!(rows[0].cells[6], "5,000");
        assert!(rows[1..].iter().all(|r| r.blank));
        assert_eq!(rows[7].number, 8);
        assert_eq!(layout.total_box.value, "¥ 5,500 (税込)");
    }

    #[test]
    fn test_summary_rows() {
        let layout = build_layout(&estimate(vec![LineItem::new("Widget", "10", "500")]), &LayoutSettings::default());
        let values: Vec<_> = layout.summary.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["5,000", "500", "5,500"]);
        assert_eq!(layout.summary[1].label, "消費税 (10%)");
        assert!(layout.summary[2].emphasized);
    }

    #[test]
    fn test_long_list_overflows_to_more_pages() {
        let items: Vec<_> = (0..60).map(|i| LineItem::new(format!("item {}", i), "1", "100")).collect();
        let layout = build_layout(&estimate(items), &LayoutSettings::default());
        assert_eq!(layout.row_count(), 60);
        assert!(layout.page_count() >= 2);
        let numbers: Vec<_> = layout.pages.iter().flat_map(|p| p.rows.iter().map(|r| r.number)).collect();
        assert_eq!(numbers, (1..=60).collect::<Vec<_>>());
    }

    #[test]
    fn test_pagination_leaves_room_for_summary() {
        let full = capacity(FIRST_PAGE_TABLE_TOP_MM, 0.0);
        let closing = capacity(FIRST_PAGE_TABLE_TOP_MM, closing_reserve(1));
        assert!(closing < full);

        let rows: Vec<_> = (1..=closing).map(blank_row).collect();
        assert_eq!(paginate(rows, 1).len(), 1);

        // 首页放得下行但放不下合计时, 合计落到新的一页
        let rows: Vec<_> = (1..=full).map(blank_row).collect();
        let pages = paginate(rows, 1);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows.len(), full);
        assert!(pages[1].rows.is_empty());
    }

    #[test]
    fn test_order_info_grid_and_wording() {
        let doc = Document::from_request(json!({
            "type": "order",
            "supplierName": "鈴木物産",
            "requestedDeliveryDate": "2025/04/15",
            "paymentMethod": ""
        }))
        .unwrap();
        let layout = build_layout(&doc, &LayoutSettings::default());
        assert_eq!(layout.title, "発注書");
        assert_eq!(layout.counterparty_name, "鈴木物産 御中");
        assert!(layout.counterparty_address.is_none());
        let labels: Vec<_> = layout.info_grid.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["希望納期", "お支払条件", "納品場所"]);
        assert_eq!(layout.info_grid[0].value, "2025/04/15");
        assert_eq!(layout.info_grid[1].value, "銀行振込");
    }

    #[test]
    fn test_estimate_info_grid_defaults() {
        let layout = build_layout(&estimate(vec![]), &LayoutSettings::default());
        let grid: Vec<_> = layout
            .info_grid
            .iter()
            .map(|e| (e.label.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            grid,
            vec![
                ("有効期限", "発行日より30日間"),
                ("納期", "2週間"),
                ("お支払条件", "銀行振込"),
                ("納品場所", "お客様指定場所"),
            ]
        );
        assert_eq!(layout.number_line, "見積番号: EST-20250328-001");
    }

    #[test]
    fn test_wrap_notes() {
        assert!(wrap_notes("", 10).is_empty());
        assert_eq!(wrap_notes("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_notes("あいうえおかきくけこさ", 5), vec!["あいうえお", "かきくけこ", "さ"]);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let doc = estimate(vec![LineItem::new("Widget", "10", "500").with_code("W-1")]);
        let a = build_layout(&doc, &LayoutSettings::default());
        let b = build_layout(&doc, &LayoutSettings::default());
        assert_eq!(a, b);
    }
}
