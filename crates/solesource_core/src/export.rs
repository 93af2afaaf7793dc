//! Export artifacts: plain text and a paginated PDF document.
//!
//! Rendering is pure; delivering an artifact goes through a [`Downloader`].

use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const TEXT_MEDIA_TYPE: &str = "text/plain";
pub const DOCUMENT_MEDIA_TYPE: &str = "application/pdf";

// US Letter in points.
const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN: u32 = 54;
const FOOTER_Y: u32 = 36;
const FOOTER_FONT_SIZE: u32 = 9;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid document layout: {0}")]
    InvalidLayout(String),

    #[error("invalid artifact filename {0:?}")]
    InvalidFilename(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An exported byte blob ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub filename: String,
    pub media_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Page geometry for [`render_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLayout {
    /// Maximum characters per line before wrapping.
    pub width: usize,
    pub lines_per_page: usize,
    pub font_size: u32,
    pub leading: u32,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            width: 90,
            lines_per_page: 48,
            font_size: 10,
            leading: 14,
        }
    }
}

impl DocumentLayout {
    fn validate(&self) -> Result<(), ExportError> {
        if self.width == 0 {
            return Err(ExportError::InvalidLayout("width must be positive".into()));
        }
        if self.lines_per_page == 0 {
            return Err(ExportError::InvalidLayout(
                "lines_per_page must be positive".into(),
            ));
        }
        let body_height = self.leading as usize * (self.lines_per_page - 1) + self.font_size as usize;
        if body_height > (PAGE_HEIGHT - 2 * MARGIN) as usize {
            return Err(ExportError::InvalidLayout(format!(
                "{} lines at {}pt leading do not fit on a page",
                self.lines_per_page, self.leading
            )));
        }
        Ok(())
    }
}

/// Join lines with `\n` plus a trailing newline.
pub fn render_text(lines: &[String], filename: &str) -> Artifact {
    let mut text = lines.join("\n");
    text.push('\n');
    Artifact {
        filename: filename.to_string(),
        media_type: TEXT_MEDIA_TYPE,
        bytes: text.into_bytes(),
    }
}

/// Wrap, paginate and emit a PDF 1.4 document with a "Page N of M" footer.
pub fn render_document(
    lines: &[String],
    layout: &DocumentLayout,
    filename: &str,
) -> Result<Artifact, ExportError> {
    layout.validate()?;

    let wrapped: Vec<String> = lines
        .iter()
        .flat_map(|line| wrap_line(line, layout.width))
        .collect();
    let pages = paginate(&wrapped, layout.lines_per_page);
    debug!(
        lines = lines.len(),
        wrapped = wrapped.len(),
        pages = pages.len(),
        "rendering document"
    );

    Ok(Artifact {
        filename: filename.to_string(),
        media_type: DOCUMENT_MEDIA_TYPE,
        bytes: write_pdf(&pages, layout),
    })
}

/// Word-wrap one line to `width` characters, keeping its leading indent on
/// continuation lines. Words longer than the line are split.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut indent: String = line.chars().take_while(|c| *c == ' ').collect();
    if indent.len() * 2 >= width {
        indent.clear();
    }

    let mut out = Vec::new();
    let mut current = indent.clone();
    let mut has_word = false;

    for word in line.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        loop {
            let used = current.chars().count();
            let separator = usize::from(has_word);
            if used + separator + chars.len() <= width {
                if has_word {
                    current.push(' ');
                }
                current.extend(chars.iter());
                has_word = true;
                break;
            }
            if has_word {
                out.push(std::mem::replace(&mut current, indent.clone()));
                has_word = false;
                continue;
            }
            let rest = chars.split_off(width - used);
            current.extend(chars.iter());
            out.push(std::mem::replace(&mut current, indent.clone()));
            chars = rest;
            if chars.is_empty() {
                break;
            }
        }
    }

    if has_word {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Split lines into pages. Always yields at least one page.
pub fn paginate(lines: &[String], lines_per_page: usize) -> Vec<Vec<String>> {
    if lines.is_empty() {
        return vec![Vec::new()];
    }
    lines
        .chunks(lines_per_page.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

// ============================================================================
// PDF writer
// ============================================================================

/// Object numbers: 1 catalog, 2 page tree, 3 font, then a page object and
/// its content stream for each page.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &str) {
        self.offsets.push(self.buf.len());
        let id = self.offsets.len();
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, content: &str) {
        self.object(&format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, xref_offset
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn write_pdf(pages: &[Vec<String>], layout: &DocumentLayout) -> Vec<u8> {
    let page_count = pages.len();
    let page_id = |index: usize| 4 + 2 * index;

    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut pdf = PdfWriter::new();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids, page_count
    ));
    pdf.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>");

    for (index, page) in pages.iter().enumerate() {
        pdf.object(&format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id(index) + 1
        ));
        pdf.stream(&page_content(page, index + 1, page_count, layout));
    }

    pdf.finish()
}

fn page_content(lines: &[String], number: usize, total: usize, layout: &DocumentLayout) -> String {
    let top = PAGE_HEIGHT - MARGIN - layout.font_size;
    let mut content = format!(
        "BT\n/F1 {} Tf\n{} TL\n{} {} Td\n",
        layout.font_size, layout.leading, MARGIN, top
    );
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            content.push_str("T*\n");
        }
        let _ = writeln!(content, "({}) Tj", escape_pdf_text(line));
    }
    content.push_str("ET\n");

    let footer = format!("Page {} of {}", number, total);
    // Helvetica digits and letters average about half an em.
    let footer_width = footer.len() as u32 * FOOTER_FONT_SIZE / 2;
    let _ = write!(
        content,
        "BT\n/F1 {} Tf\n{} {} Td\n({}) Tj\nET",
        FOOTER_FONT_SIZE,
        (PAGE_WIDTH - footer_width) / 2,
        FOOTER_Y,
        footer
    );
    content
}

/// Escape a string literal for a content stream. Non-ASCII characters that
/// WinAnsiEncoding covers become octal escapes; anything else becomes `?`.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push(' '),
            ' '..='~' => out.push(c),
            _ => match win_ansi_byte(c) {
                Some(byte) => {
                    let _ = write!(out, "\\{:03o}", byte);
                }
                None => out.push('?'),
            },
        }
    }
    out
}

/// WinAnsiEncoding code for a non-ASCII character.
fn win_ansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

// ============================================================================
// Delivery
// ============================================================================

/// Hands an artifact to the user.
pub trait Downloader {
    /// Deliver the artifact, returning where it ended up.
    fn download(&self, artifact: &Artifact) -> Result<PathBuf, ExportError>;
}

/// Writes artifacts into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FsDownloader {
    dir: PathBuf,
}

impl FsDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for FsDownloader {
    fn download(&self, artifact: &Artifact) -> Result<PathBuf, ExportError> {
        validate_filename(&artifact.filename)?;

        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(&artifact.filename);
        fs::write(&path, &artifact.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            media_type = artifact.media_type,
            bytes = artifact.len(),
            "artifact written"
        );
        Ok(path)
    }
}

fn validate_filename(filename: &str) -> Result<(), ExportError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.contains('\0');
    if invalid {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_text_adds_trailing_newline() {
        let artifact = render_text(&lines(&["a", "", "b"]), "report.txt");
        assert_eq!(artifact.bytes, b"a\n\nb\n");
        assert_eq!(artifact.media_type, "text/plain");
        assert_eq!(artifact.filename, "report.txt");
    }

    #[test]
    fn test_wrap_short_line_untouched() {
        assert_eq!(wrap_line("  - short", 20), vec!["  - short"]);
        assert_eq!(wrap_line("", 20), vec![""]);
    }

    #[test]
    fn test_wrap_keeps_indent() {
        let wrapped = wrap_line("    alpha beta gamma delta", 14);
        assert_eq!(wrapped, vec!["    alpha beta", "    gamma", "    delta"]);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 14));
    }

    #[test]
    fn test_wrap_splits_long_word() {
        let wrapped = wrap_line("abcdefghijkl", 5);
        assert_eq!(wrapped, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_paginate() {
        let input = lines(&["1", "2", "3", "4", "5"]);
        let pages = paginate(&input, 2);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], vec!["5"]);
        assert_eq!(paginate(&[], 10).len(), 1);
    }

    #[test]
    fn test_escape_pdf_text() {
        assert_eq!(escape_pdf_text(r"a(b)c\d"), r"a\(b\)c\\d");
        assert_eq!(escape_pdf_text("caf\u{e9}"), r"caf\351");
        // Outside WinAnsi.
        assert_eq!(escape_pdf_text("\u{3a9}"), "?");
    }

    #[test]
    fn test_document_keeps_latin1_text() {
        let artifact = render_document(
            &lines(&["Office of Purchasing \u{2013} Caf\u{e9} \u{a7}4"]),
            &DocumentLayout::default(),
            "report.pdf",
        )
        .unwrap();
        let pdf = String::from_utf8_lossy(&artifact.bytes);
        assert!(pdf.contains(r"(Office of Purchasing \226 Caf\351 \2474) Tj"));
        assert!(!pdf.contains("Caf?"));
    }

    #[test]
    fn test_render_document_rejects_bad_layout() {
        let layout = DocumentLayout {
            lines_per_page: 0,
            ..DocumentLayout::default()
        };
        let err = render_document(&lines(&["x"]), &layout, "r.pdf").unwrap_err();
        assert!(matches!(err, ExportError::InvalidLayout(_)));

        let layout = DocumentLayout {
            lines_per_page: 500,
            ..DocumentLayout::default()
        };
        assert!(render_document(&lines(&["x"]), &layout, "r.pdf").is_err());
    }

    #[test]
    fn test_render_document_structure() {
        let input: Vec<String> = (0..100).map(|i| format!("Line {}", i)).collect();
        let layout = DocumentLayout {
            lines_per_page: 40,
            ..DocumentLayout::default()
        };
        let artifact = render_document(&input, &layout, "report.pdf").unwrap();
        assert_eq!(artifact.media_type, "application/pdf");

        let text = String::from_utf8_lossy(&artifact.bytes);
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Count 3"));
        assert!(text.contains("(Page 1 of 3) Tj"));
        assert!(text.contains("(Page 3 of 3) Tj"));
        assert!(text.contains("(Line 99) Tj"));
        assert!(text.contains("/BaseFont /Helvetica"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let artifact =
            render_document(&lines(&["Hello (world)"]), &DocumentLayout::default(), "r.pdf")
                .unwrap();
        let bytes = &artifact.bytes;
        let text = String::from_utf8_lossy(bytes);

        let start = text.rfind("startxref\n").unwrap() + "startxref\n".len();
        let xref_offset: usize = text[start..].lines().next().unwrap().parse().unwrap();
        assert!(bytes[xref_offset..].starts_with(b"xref\n"));

        let xref = std::str::from_utf8(&bytes[xref_offset..]).unwrap();
        let entries: Vec<usize> = xref
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 5);
        for (index, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", index + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
        assert!(text.contains(r"(Hello \(world\)) Tj"));
    }

    #[test]
    fn test_fs_downloader_writes_file() {
        let dir = TempDir::new().unwrap();
        let downloader = FsDownloader::new(dir.path().join("exports"));
        let artifact = render_text(&lines(&["done"]), "report.txt");

        let path = downloader.download(&artifact).unwrap();
        assert_eq!(path, dir.path().join("exports").join("report.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"done\n");
    }

    #[test]
    fn test_fs_downloader_rejects_path_in_filename() {
        let dir = TempDir::new().unwrap();
        let downloader = FsDownloader::new(dir.path());
        let artifact = render_text(&lines(&["x"]), "../escape.txt");
        let err = downloader.download(&artifact).unwrap_err();
        assert!(matches!(err, ExportError::InvalidFilename(_)));
    }
}
