//! printpdf 直接绘制的渲染引擎

use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::service::engine::{CancelToken, RenderEngine, RenderSession};
use crate::service::layout::{
    Align, DocumentLayout, LayoutPage, COLUMNS, CONTINUATION_TABLE_TOP_MM,
    FIRST_PAGE_TABLE_TOP_MM, MARGIN_MM, NOTE_LINE_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    ROW_HEIGHT_MM, TABLE_HEADER_HEIGHT_MM,
};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use std::io::{BufWriter, Cursor};
use std::sync::Arc;

const CONTENT_LEFT: f32 = MARGIN_MM;
const CONTENT_RIGHT: f32 = PAGE_WIDTH_MM - MARGIN_MM;
const CONTENT_WIDTH: f32 = CONTENT_RIGHT - CONTENT_LEFT;
const PT_TO_MM: f32 = 0.3528;

// 配色
const INK: f32 = 0.2; // #333
const SHADE: f32 = 0.96; // #f5f5f5
const RULE: f32 = 0.87; // #ddd
const BORDER: f32 = 0.8; // #ccc
const MUTED: f32 = 0.4; // #666

/// 基于 printpdf 的引擎
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    font: Option<Arc<Vec<u8>>>,
}

impl PdfEngine {
    /// 使用内置 Helvetica (无日文字形, 仅供测试与纯英数版面)
    pub fn builtin() -> Self {
        Self { font: None }
    }

    /// 使用外部字体文件
    pub fn with_font_bytes(bytes: Vec<u8>) -> Self {
        Self {
            font: Some(Arc::new(bytes)),
        }
    }

    /// 服务端引擎: 必须配置带日文字形的字体, 内置 Helvetica 无法显示日文
    pub fn from_config(config: &RenderConfig) -> Result<Self, EngineError> {
        let path = config.font_path.as_deref().ok_or_else(|| {
            EngineError::Font(
                "RENDER_FONT_PATH is not set: a TrueType/OpenType font with Japanese glyphs is required"
                    .to_string(),
            )
        })?;
        let bytes = std::fs::read(path)
            .map_err(|e| EngineError::Font(format!("failed to read font {}: {}", path, e)))?;
        if bytes.is_empty() {
            return Err(EngineError::Font(format!("font file {} is empty", path)));
        }
        tracing::info!("Loaded render font {} ({} bytes)", path, bytes.len());
        Ok(Self::with_font_bytes(bytes))
    }
}

impl RenderEngine for PdfEngine {
    fn name(&self) -> &str {
        "printpdf"
    }

    fn launch(&self) -> Result<Box<dyn RenderSession>, EngineError> {
        Ok(Box::new(PdfSession {
            font: self.font.clone(),
        }))
    }
}

/// 单次绘制会话; 文档对象只在 rasterize 内部存在
pub struct PdfSession {
    font: Option<Arc<Vec<u8>>>,
}

impl RenderSession for PdfSession {
    fn rasterize(
        &mut self,
        layout: &DocumentLayout,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EngineError> {
        let (doc, page1, layer1) = PdfDocument::new(
            layout.title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let (regular, bold) = self.load_fonts(&doc)?;

        let page_total = layout.page_count();
        for (idx, page) in layout.pages.iter().enumerate() {
            cancel.check()?;

            let layer = if idx == 0 {
                doc.get_page(page1).get_layer(layer1)
            } else {
                let (p, l) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                doc.get_page(p).get_layer(l)
            };
            let painter = Painter {
                layer,
                regular: regular.clone(),
                bold: bold.clone(),
            };

            let table_top = if idx == 0 {
                draw_first_page_header(&painter, layout);
                FIRST_PAGE_TABLE_TOP_MM
            } else {
                draw_continuation_header(&painter, layout);
                CONTINUATION_TABLE_TOP_MM
            };

            let rows_bottom = draw_table(&painter, page, table_top);
            if idx + 1 == page_total {
                let summary_bottom = draw_summary(&painter, layout, rows_bottom - 1.0);
                draw_notes(&painter, layout, summary_bottom - 4.0);
            }
            draw_footer(&painter, layout, idx + 1, page_total);
        }

        cancel.check()?;
        let mut writer = BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer)
            .map_err(|e| EngineError::Rasterize(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| EngineError::Rasterize(e.to_string()))
    }
}

impl PdfSession {
    fn load_fonts(
        &self,
        doc: &PdfDocumentReference,
    ) -> Result<(IndirectFontRef, IndirectFontRef), EngineError> {
        match &self.font {
            Some(bytes) => {
                // 外部字体只有一个字重, 粗体复用同一字体
                let font = doc
                    .add_external_font(Cursor::new(bytes.as_slice()))
                    .map_err(|e| EngineError::Font(e.to_string()))?;
                Ok((font.clone(), font))
            }
            None => {
                let regular = doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|e| EngineError::Font(e.to_string()))?;
                let bold = doc
                    .add_builtin_font(BuiltinFont::HelveticaBold)
                    .map_err(|e| EngineError::Font(e.to_string()))?;
                Ok((regular, bold))
            }
        }
    }
}

/// 估算文字宽度 (mm): 半角约 0.55em, 全角 1em
pub fn text_width_mm(text: &str, size: f32) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.55 } else { 1.0 })
        .sum();
    em * size * PT_TO_MM
}

/// 超出宽度时截断并加省略号
pub fn fit_text(text: &str, size: f32, width: f32) -> String {
    if text_width_mm(text, size) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if text_width_mm(&out, size) + text_width_mm("…", size) > width {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}

fn gray(level: f32) -> Color {
    Color::Rgb(Rgb::new(level, level, level, None))
}

struct Painter {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Painter {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        if text.is_empty() {
            return;
        }
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    /// 在 [left, left+width] 内按对齐方式放置文字
    fn text_in(&self, text: &str, size: f32, left: f32, width: f32, align: Align, y: f32, bold: bool) {
        let padding = 1.5;
        let text = fit_text(text, size, width - 2.0 * padding);
        let w = text_width_mm(&text, size);
        let x = match align {
            Align::Left => left + padding,
            Align::Center => left + (width - w) / 2.0,
            Align::Right => left + width - padding - w,
        };
        self.text(&text, size, x, y, bold);
    }

    fn text_right(&self, text: &str, size: f32, right: f32, y: f32, bold: bool) {
        let x = right - text_width_mm(text, size);
        self.text(text, size, x, y, bold);
    }

    fn text_center(&self, text: &str, size: f32, center: f32, y: f32, bold: bool) {
        let x = center - text_width_mm(text, size) / 2.0;
        self.text(text, size, x, y, bold);
    }

    fn ink(&self, level: f32) {
        self.layer.set_fill_color(gray(level));
    }

    fn fill_rect(&self, x1: f32, y1: f32, x2: f32, y2: f32, level: f32) {
        self.layer.set_fill_color(gray(level));
        self.layer
            .add_rect(Rect::new(Mm(x1), Mm(y1), Mm(x2), Mm(y2)).with_mode(PaintMode::Fill));
    }

    fn stroke_rect(&self, x1: f32, y1: f32, x2: f32, y2: f32, level: f32, thickness: f32) {
        self.layer.set_outline_color(gray(level));
        self.layer.set_outline_thickness(thickness);
        self.layer
            .add_rect(Rect::new(Mm(x1), Mm(y1), Mm(x2), Mm(y2)).with_mode(PaintMode::Stroke));
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32, level: f32, thickness: f32) {
        self.layer.set_outline_color(gray(level));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }
}

/// 首页页眉: 标题, 编号, 客户, 本公司, 合计框, 条件栏, 问候语
fn draw_first_page_header(p: &Painter, layout: &DocumentLayout) {
    let center = PAGE_WIDTH_MM / 2.0;

    p.ink(0.0);
    p.text_center(layout.title, 18.0, center, 281.0, true);
    p.line(center - 20.0, 278.0, center + 20.0, 278.0, 0.0, 0.8);

    p.ink(INK);
    p.text(&layout.issue_line, 9.0, CONTENT_LEFT, 270.0, false);
    p.text(&layout.number_line, 9.0, CONTENT_LEFT, 265.0, false);

    // 客户
    p.fill_rect(CONTENT_LEFT, 238.0, 95.0, 259.0, SHADE);
    p.stroke_rect(CONTENT_LEFT, 238.0, 95.0, 259.0, BORDER, 0.5);
    p.ink(INK);
    p.text(&fit_text(&layout.counterparty_name, 11.0, 84.0), 11.0, CONTENT_LEFT + 3.0, 251.0, true);
    if let Some(address) = &layout.counterparty_address {
        p.text(&fit_text(address, 8.5, 84.0), 8.5, CONTENT_LEFT + 3.0, 244.5, false);
    }

    // 本公司
    p.text_right(&layout.company_name, 12.0, CONTENT_RIGHT, 270.0, true);
    for (i, line) in layout.company_lines.iter().enumerate() {
        p.text_right(line, 8.0, CONTENT_RIGHT, 265.0 - 4.0 * i as f32, false);
    }
    p.stroke_rect(CONTENT_RIGHT - 20.0, 232.0, CONTENT_RIGHT, 252.0, 0.6, 0.5);
    p.ink(0.6);
    p.text_center("印", 10.0, CONTENT_RIGHT - 10.0, 240.5, false);

    // 合计框
    p.fill_rect(CONTENT_LEFT, 214.0, CONTENT_RIGHT, 225.0, SHADE);
    p.stroke_rect(CONTENT_LEFT, 214.0, CONTENT_RIGHT, 225.0, 0.0, 0.8);
    p.ink(0.0);
    p.text(&layout.total_box.label, 11.0, CONTENT_LEFT + 3.0, 218.0, true);
    p.text_right(&layout.total_box.value, 13.0, CONTENT_RIGHT - 3.0, 218.0, true);

    // 条件栏: 两列
    p.fill_rect(CONTENT_LEFT, 189.0, CONTENT_RIGHT, 209.0, SHADE);
    p.line(CONTENT_LEFT + 0.5, 189.0, CONTENT_LEFT + 0.5, 209.0, INK, 3.0);
    p.ink(INK);
    for (i, entry) in layout.info_grid.iter().enumerate() {
        let x = if i % 2 == 0 { 12.0 } else { 107.0 };
        let y = 202.0 - 8.0 * (i / 2) as f32;
        let label = format!("{}:", entry.label);
        p.text(&label, 8.5, x, y, true);
        let value_x = x + text_width_mm(&label, 8.5) + 2.0;
        p.text(&fit_text(&entry.value, 8.5, 93.0 - (value_x - x)), 8.5, value_x, y, false);
    }

    for (i, line) in layout.message.iter().enumerate() {
        p.text(line, 8.5, CONTENT_LEFT, 183.0 - 4.5 * i as f32, false);
    }
}

fn draw_continuation_header(p: &Painter, layout: &DocumentLayout) {
    p.ink(0.0);
    let heading = format!("{}  {}", layout.continuation_title(), layout.number_line);
    p.text(&heading, 11.0, CONTENT_LEFT, 282.0, true);
}

/// 明细表, 返回最后一行的下沿
fn draw_table(p: &Painter, page: &LayoutPage, table_top: f32) -> f32 {
    let header_bottom = table_top - TABLE_HEADER_HEIGHT_MM;
    p.fill_rect(CONTENT_LEFT, header_bottom, CONTENT_RIGHT, table_top, INK);
    p.ink(1.0);
    let mut x = CONTENT_LEFT;
    for col in COLUMNS.iter() {
        let width = CONTENT_WIDTH * col.width_pct / 100.0;
        p.text_in(col.title, 8.5, x, width, col.align, header_bottom + 2.3, false);
        x += width;
    }

    let mut y = header_bottom;
    for (i, row) in page.rows.iter().enumerate() {
        let bottom = y - ROW_HEIGHT_MM;
        if i % 2 == 1 {
            p.fill_rect(CONTENT_LEFT, bottom, CONTENT_RIGHT, y, SHADE);
        }
        p.line(CONTENT_LEFT, bottom, CONTENT_RIGHT, bottom, RULE, 0.5);

        p.ink(INK);
        let mut x = CONTENT_LEFT;
        for (col, cell) in COLUMNS.iter().zip(row.cells.iter()) {
            let width = CONTENT_WIDTH * col.width_pct / 100.0;
            p.text_in(cell, 8.5, x, width, col.align, bottom + 2.0, false);
            x += width;
        }
        y = bottom;
    }
    y
}

/// 小计 / 消费税 / 合计金额, 返回下沿
fn draw_summary(p: &Painter, layout: &DocumentLayout, top: f32) -> f32 {
    let amount_width = CONTENT_WIDTH * COLUMNS[6].width_pct / 100.0;
    let amount_left = CONTENT_RIGHT - amount_width;

    let mut y = top;
    for row in &layout.summary {
        let bottom = y - ROW_HEIGHT_MM;
        let (bg, fg) = if row.emphasized { (INK, 1.0) } else { (SHADE, INK) };
        p.fill_rect(CONTENT_LEFT, bottom, CONTENT_RIGHT, y, bg);
        p.ink(fg);
        p.text_right(&row.label, 8.5, amount_left - 2.0, bottom + 2.0, true);
        p.text_in(&row.value, 8.5, amount_left, amount_width, Align::Right, bottom + 2.0, true);
        y = bottom;
    }
    y
}

fn draw_notes(p: &Painter, layout: &DocumentLayout, top: f32) {
    p.ink(INK);
    let title_y = top - 4.0;
    p.text("備考", 9.0, CONTENT_LEFT, title_y, true);
    p.line(CONTENT_LEFT, title_y - 1.2, CONTENT_LEFT + 9.0, title_y - 1.2, INK, 0.5);

    for (i, line) in layout.notes.iter().enumerate() {
        p.text(line, 8.5, CONTENT_LEFT, title_y - NOTE_LINE_MM * (i + 1) as f32 - 1.0, false);
    }
}

fn draw_footer(p: &Painter, layout: &DocumentLayout, page_no: usize, page_total: usize) {
    let center = PAGE_WIDTH_MM / 2.0;
    let rule_y = MARGIN_MM + 10.0;
    p.line(CONTENT_LEFT, rule_y, CONTENT_RIGHT, rule_y, RULE, 0.5);

    p.ink(MUTED);
    for (i, line) in layout.footer.iter().enumerate() {
        p.text_center(line, 7.0, center, rule_y - 4.0 - 3.5 * i as f32, false);
    }
    p.text_right(
        &format!("{} / {}", page_no, page_total),
        7.0,
        CONTENT_RIGHT,
        rule_y - 4.0,
        false,
    );
}
