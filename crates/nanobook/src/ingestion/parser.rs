//! Multi-format document loader

use calamine::Reader;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::FileType;

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// SHA-256 of the content
    pub content_hash: String,
    /// Total pages, slides or sheets (if applicable)
    pub total_pages: Option<u32>,
    /// Page-level content
    pub pages: Vec<PageContent>,
}

impl ParsedDocument {
    fn new(
        file_type: FileType,
        content: String,
        total_pages: Option<u32>,
        pages: Vec<PageContent>,
    ) -> Self {
        Self {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages,
            pages,
        }
    }

    /// Single-page document
    fn single(file_type: FileType, content: String) -> Self {
        let pages = vec![PageContent {
            page_number: 1,
            content: content.clone(),
            char_offset: 0,
        }];
        Self::new(file_type, content, None, pages)
    }
}

/// Content from a single page, slide, sheet or CSV row
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset in the full document content
    pub char_offset: usize,
}

/// Accumulates pages into one document text, tracking char offsets
#[derive(Default)]
struct PageCollector {
    content: String,
    char_len: usize,
    pages: Vec<PageContent>,
}

impl PageCollector {
    fn push(&mut self, page_number: u32, text: String) {
        if !self.content.is_empty() {
            self.content.push_str("\n\n");
            self.char_len += 2;
        }
        let char_offset = self.char_len;
        self.char_len += text.chars().count();
        self.content.push_str(&text);
        self.pages.push(PageContent {
            page_number,
            content: text,
            char_offset,
        });
    }

    fn finish(self, file_type: FileType, total_pages: Option<u32>) -> ParsedDocument {
        ParsedDocument::new(file_type, self.content, total_pages, self.pages)
    }
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    ///
    /// Legacy `.doc`/`.ppt` files must be converted first (see `LegacyConverter`).
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename);

        let parsed = match file_type {
            FileType::Txt => Ok(ParsedDocument::single(FileType::Txt, decode_text(data))),
            FileType::Markdown => Self::parse_markdown(data),
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Pptx => Self::parse_pptx(filename, data),
            FileType::Html => Self::parse_html(filename, data),
            FileType::Csv => Self::parse_csv(filename, data),
            FileType::Xlsx | FileType::Xls => Self::parse_spreadsheet(filename, data, file_type),
            FileType::Doc | FileType::Ppt => Err(Error::UnsupportedFileType(format!(
                "{} must be converted before parsing",
                file_type.display_name()
            ))),
            FileType::Unknown => Err(Error::UnsupportedFileType(filename.to_string())),
        }?;

        if parsed.content.trim().is_empty() {
            return Err(Error::file_parse(filename, "No text content could be extracted"));
        }

        Ok(parsed)
    }

    /// Render markdown to plain text
    fn parse_markdown(data: &[u8]) -> Result<ParsedDocument> {
        use pulldown_cmark::{Event, Parser, TagEnd};

        let source = decode_text(data);
        let mut content = String::new();

        for event in Parser::new(&source) {
            match event {
                Event::Text(text) | Event::Code(text) => content.push_str(&text),
                Event::SoftBreak => content.push(' '),
                Event::HardBreak => content.push('\n'),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::CodeBlock)
                | Event::End(TagEnd::Table) => content.push_str("\n\n"),
                Event::End(TagEnd::Item) | Event::End(TagEnd::TableRow) => content.push('\n'),
                Event::End(TagEnd::TableCell) => content.push(' '),
                _ => {}
            }
        }

        Ok(ParsedDocument::single(FileType::Markdown, content.trim().to_string()))
    }

    /// Parse PDF document, one page entry per PDF page where possible
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let pdf = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;
        let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
        let total_pages = Some(page_numbers.len() as u32);

        let mut collector = PageCollector::default();
        for page_number in &page_numbers {
            match pdf.extract_text(&[*page_number]) {
                Ok(text) => {
                    let text = clean_lines(&text);
                    if !text.is_empty() {
                        collector.push(*page_number, text);
                    }
                }
                Err(e) => tracing::debug!("No text on page {} of {}: {}", page_number, filename, e),
            }
        }

        if !collector.content.trim().is_empty() {
            return Ok(collector.finish(FileType::Pdf, total_pages));
        }

        // lopdf cannot decode every font encoding; pdf-extract handles more of them
        tracing::warn!("Per-page extraction found no text in {}, trying pdf-extract", filename);
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut parsed = ParsedDocument::single(FileType::Pdf, clean_lines(&text));
        parsed.total_pages = total_pages;
        Ok(parsed)
    }

    /// Parse DOCX document: body paragraphs (hyperlink text included) and tables row by row
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    push_docx_runs(&p.children, &mut content);
                    content.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => push_docx_table(table, &mut content),
                _ => {}
            }
        }

        Ok(ParsedDocument::single(FileType::Docx, content))
    }

    /// Parse PowerPoint presentation (.pptx), one page entry per slide
    fn parse_pptx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        use std::io::Read;

        let cursor = std::io::Cursor::new(data);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let slide_number = |name: &str| {
            name.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
        };

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_by_key(|(n, _)| *n);
        let total_slides = slides.len() as u32;

        let mut collector = PageCollector::default();
        for (number, name) in slides {
            let mut xml = String::new();
            let read = archive
                .by_name(&name)
                .map_err(|e| e.to_string())
                .and_then(|mut file| file.read_to_string(&mut xml).map_err(|e| e.to_string()));

            if let Err(e) = read {
                tracing::debug!("Skipping {} in {}: {}", name, filename, e);
                continue;
            }

            let text = extract_text_from_pptx_xml(&xml);
            if !text.is_empty() {
                collector.push(number, text);
            }
        }

        Ok(collector.finish(FileType::Pptx, Some(total_slides)))
    }

    /// Parse HTML document (visible body text)
    fn parse_html(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let html = decode_text(data);
        let document = scraper::Html::parse_document(&html);

        let body_selector = scraper::Selector::parse("body")
            .map_err(|e| Error::file_parse(filename, format!("Invalid selector: {:?}", e)))?;
        let skip_selector = scraper::Selector::parse("script, style, noscript")
            .map_err(|e| Error::file_parse(filename, format!("Invalid selector: {:?}", e)))?;

        let skipped: Vec<String> = document
            .select(&skip_selector)
            .map(|el| el.text().collect::<String>())
            .filter(|t| !t.trim().is_empty())
            .collect();

        let mut content = String::new();
        if let Some(body) = document.select(&body_selector).next() {
            for text in body.text() {
                let trimmed = text.trim();
                if trimmed.is_empty() || skipped.iter().any(|s| s.trim() == trimmed) {
                    continue;
                }
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&collapse_whitespace(trimmed));
            }
        }

        Ok(ParsedDocument::single(FileType::Html, content))
    }

    /// Parse CSV file, one page entry per row rendered as `header: value` lines
    fn parse_csv(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::file_parse(filename, e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut collector = PageCollector::default();
        for (row, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!("Skipping malformed row {} in {}: {}", row + 1, filename, e);
                    continue;
                }
            };

            let text = record
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let header = headers.get(i).map(String::as_str).unwrap_or("");
                    format!("{}: {}", header, value.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");

            if !text.trim().is_empty() {
                collector.push(row as u32 + 1, text);
            }
        }

        Ok(collector.finish(FileType::Csv, None))
    }

    /// Parse Excel spreadsheet (.xlsx or .xls), one page entry per sheet
    fn parse_spreadsheet(
        filename: &str,
        data: &[u8],
        file_type: FileType,
    ) -> Result<ParsedDocument> {
        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut collector = PageCollector::default();
        let mut sheet_number = 0u32;

        for sheet_name in workbook.sheet_names().to_vec() {
            sheet_number += 1;

            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::debug!("Skipping sheet {} in {}: {}", sheet_name, filename, e);
                    continue;
                }
            };

            let mut sheet_content = format!("Sheet: {}\n", sheet_name);
            for row in range.rows() {
                let row_text: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.to_string(),
                        _ => String::new(),
                    })
                    .collect();

                if !row_text.iter().all(|s| s.is_empty()) {
                    sheet_content.push_str(&row_text.join(" | "));
                    sheet_content.push('\n');
                }
            }

            collector.push(sheet_number, sheet_content.trim_end().to_string());
        }

        Ok(collector.finish(file_type, Some(sheet_number)))
    }
}

/// Extract text from PowerPoint slide XML (`<a:t>` runs, one line per paragraph)
fn extract_text_from_pptx_xml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_element = true,
            Ok(Event::Text(e)) if in_text_element => {
                if let Ok(text) = e.unescape() {
                    if !current_line.is_empty() {
                        current_line.push(' ');
                    }
                    current_line.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" if !current_line.is_empty() => lines.push(std::mem::take(&mut current_line)),
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines.join("\n")
}

/// Decode bytes as UTF-8, replacing invalid sequences and stripping a BOM
/// Append the run text of a paragraph, descending into hyperlinks
fn push_docx_runs(children: &[docx_rs::ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        out.push_str(&t.text);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => push_docx_runs(&link.children, out),
            _ => {}
        }
    }
}

/// Append a table as one line per row with cells separated by ` | `
#[allow(irrefutable_let_patterns)]
fn push_docx_table(table: &docx_rs::Table, out: &mut String) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row else {
            continue;
        };

        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };

            let mut cell_text = String::new();
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => {
                        if !cell_text.is_empty() {
                            cell_text.push(' ');
                        }
                        push_docx_runs(&p.children, &mut cell_text);
                    }
                    docx_rs::TableCellContent::Table(nested) => {
                        cell_text.push('\n');
                        push_docx_table(nested, &mut cell_text);
                    }
                    _ => {}
                }
            }

            let cell_text = cell_text.trim();
            if !cell_text.is_empty() {
                cells.push(cell_text.to_string());
            }
        }

        if !cells.is_empty() {
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
    }
}

fn decode_text(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.trim_start_matches('\u{feff}').to_string()
}

/// Trim lines, drop empty ones and NUL characters
fn clean_lines(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    use std::sync::OnceLock;

    static WHITESPACE: OnceLock<regex::Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| regex::Regex::new(r"\s+").expect("valid regex"));
    re.replace_all(text, " ").into_owned()
}

/// Hash content for document records
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
