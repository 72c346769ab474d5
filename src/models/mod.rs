pub mod document;
pub mod line_item;
pub mod totals;

pub use document::{
    format_document_number, format_issue_date, parse_document_number, Document, DocumentKind,
    DocumentType,
};
pub use line_item::{
    parse_numeric, LineItem, NumericInput, DEFAULT_UNIT, MAX_NUMERIC_DIGITS, MAX_NUMERIC_EXPONENT,
};
pub use totals::{Calculation, LineAmount, Totals};
