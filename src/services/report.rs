use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, models::trip::Trip};

pub const REPORT_TITLE: &str = "AI Insights Report";
pub const EMPTY_REPORT_LINE: &str = "No insights available.";

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");
/// Characters per body line before wrapping, tuned for 11pt Helvetica on A4.
const WRAP_COLUMNS: usize = 90;

/// Single-column A4 document: a centered bold title on every page, then the
/// body lines top to bottom, spilling onto new pages as needed.
pub struct PdfReport {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    regular_font_id: Ref,
    bold_font_id: Ref,
    page_refs: Vec<Ref>,
    next_id: i32,

    page_w: f32,
    page_h: f32,
    margin: f32,
    line_h: f32,
    font_size: f32,
    title_font_size: f32,
}

impl Default for PdfReport {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfReport {
    pub fn new() -> Self {
        let mut pdf = Pdf::new();
        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let regular_font_id = Ref::new(3);
        let bold_font_id = Ref::new(4);

        pdf.type1_font(regular_font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_font_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        Self {
            pdf,
            catalog_id,
            pages_id,
            regular_font_id,
            bold_font_id,
            page_refs: Vec::new(),
            next_id: 5,

            page_w: 595.0,
            page_h: 842.0,
            margin: 50.0,
            line_h: 16.0,
            font_size: 11.0,
            title_font_size: 16.0,
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = self.next_id;
        self.next_id += 1;
        Ref::new(id)
    }

    /// Registers a page and returns its content id with the cursor below the title.
    fn new_page(&mut self, title: &str) -> (Ref, Content, f32) {
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();
        self.page_refs.push(page_id);

        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, self.page_w, self.page_h))
            .contents(content_id);
        let mut resources = page.resources();
        resources
            .fonts()
            .pair(REGULAR_FONT, self.regular_font_id)
            .pair(BOLD_FONT, self.bold_font_id);
        drop(resources);
        drop(page);

        let mut content = Content::new();
        let title_y = self.page_h - self.margin;
        let title_w = approx_text_width(title, self.title_font_size);
        let title_x = ((self.page_w - title_w) / 2.0).max(self.margin);
        draw_text(&mut content, BOLD_FONT, self.title_font_size, title_x, title_y, title);

        (content_id, content, title_y - 2.0 * self.line_h)
    }

    fn finish_page(&mut self, content_id: Ref, content: Content) {
        self.pdf.stream(content_id, &content.finish());
    }

    /// Lays out `lines` below `title`. An empty slice renders the placeholder line.
    pub fn write_lines(&mut self, title: &str, lines: &[String]) {
        let placeholder = [EMPTY_REPORT_LINE.to_string()];
        let lines = if lines.is_empty() { &placeholder[..] } else { lines };

        let (mut content_id, mut content, mut y) = self.new_page(title);
        for line in lines {
            for piece in textwrap::wrap(line, WRAP_COLUMNS) {
                if y < self.margin {
                    self.finish_page(content_id, content);
                    (content_id, content, y) = self.new_page(title);
                }
                draw_text(&mut content, REGULAR_FONT, self.font_size, self.margin, y, &piece);
                y -= self.line_h;
            }
        }
        self.finish_page(content_id, content);
    }

    pub fn page_count(&self) -> usize {
        self.page_refs.len()
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        let mut pages = self.pdf.pages(self.pages_id);
        pages.count(self.page_refs.len() as i32);
        pages.kids(self.page_refs.iter().copied());
        drop(pages);
        self.pdf.finish()
    }
}

fn draw_text(content: &mut Content, font: Name, size: f32, x: f32, y: f32, text: &str) {
    content.begin_text();
    content.set_font(font, size);
    content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
    content.show(Str(&win_ansi(text)));
    content.end_text();
}

/// Encodes `text` for the standard fonts' WinAnsi encoding. Characters it
/// cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}

/// Helvetica averages a bit over half an em per glyph.
fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.55
}

/// Renders `insights` into PDF bytes.
pub fn render(insights: &[String]) -> Vec<u8> {
    let mut report = PdfReport::new();
    report.write_lines(REPORT_TITLE, insights);
    report.finish()
}

pub fn insights(trips: &[Trip]) -> Vec<String> {
    trips.iter().map(Trip::insight_line).collect()
}

/// Produces report files in a scratch directory and hands back their bytes.
#[derive(Clone)]
pub struct ReportService {
    dir: Arc<PathBuf>,
}

impl ReportService {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the rendered report to a temporary file, reads it back and
    /// removes the file again.
    pub async fn generate(&self, insights: &[String]) -> Result<Vec<u8>, AppError> {
        fs::create_dir_all(self.dir()).await?;
        let suffix = Uuid::new_v4().simple().to_string();
        let path = self.dir().join(format!("ai_report_{}.pdf", &suffix[..6]));

        fs::write(&path, render(insights)).await?;
        let bytes = fs::read(&path).await?;
        if let Err(err) = fs::remove_file(&path).await {
            warn!("could not remove temporary report {}: {err}", path.display());
        }
        debug!("generated report with {} insight line(s)", insights.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn empty_input_renders_placeholder() {
        let bytes = render(&[]);
        assert!(bytes.starts_with(b"%PDF"));
        let body = text(&bytes);
        assert!(body.contains(EMPTY_REPORT_LINE));
        assert!(body.contains(REPORT_TITLE));
    }

    #[test]
    fn long_reports_spill_onto_more_pages() {
        let lines: Vec<String> = (1..=120).map(|i| format!("insight number {i}")).collect();
        let mut report = PdfReport::new();
        report.write_lines(REPORT_TITLE, &lines);
        assert!(report.page_count() >= 3);
        let body = text(&report.finish());
        assert!(body.contains("insight number 1)"));
        assert!(body.contains("insight number 120"));
    }

    #[test]
    fn long_lines_are_wrapped() {
        let line = "word ".repeat(60);
        let mut report = PdfReport::new();
        report.write_lines(REPORT_TITLE, &[line]);
        assert_eq!(report.page_count(), 1);
        let body = text(&report.finish());
        assert!(body.matches("(word").count() >= 2);
    }

    #[test]
    fn accented_names_use_win_ansi_bytes() {
        assert_eq!(win_ansi("José – Łódź"), b"Jos\xe9 \x96 ?\xf3d?".to_vec());

        let bytes = render(&["Trip ID 1 by José".to_string()]);
        assert!(!bytes.windows(2).any(|w| w == "é".as_bytes()));
        assert!(text(&bytes).contains("WinAnsiEncoding"));
    }

    #[tokio::test]
    async fn service_cleans_up_its_temporary_file() {
        let dir = TempDir::new().unwrap();
        let service = ReportService::new(dir.path().join("reports"));
        let bytes = service
            .generate(&["Trip ID 1 by Asha".to_string()])
            .await
            .unwrap();
        assert!(text(&bytes).contains("Trip ID 1 by Asha"));
        let leftovers = std::fs::read_dir(service.dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
