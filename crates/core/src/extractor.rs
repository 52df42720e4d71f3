use crate::error::ExtractionError;
use lopdf::Document;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";
const DOCX_TOKENS: &str = concat!(
    r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>",
    r"|<w:tab\s*/>|<w:br\s*/>|<w:cr\s*/>",
    r"|</w:p>|<w:p\s*/>",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" | "doc" => Ok(DocumentFormat::Docx),
            "" => Err(ExtractionError::UnsupportedFormat("(none)".to_string())),
            other => Err(ExtractionError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Reads PDF and Word documents from disk, picking the reader by extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl DocumentExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let text = match DocumentFormat::from_path(path)? {
            DocumentFormat::Pdf => extract_pdf_text(path)?,
            DocumentFormat::Docx => extract_docx_text(path)?,
        };

        if text.is_empty() {
            return Err(ExtractionError::EmptyDocument(path.display().to_string()));
        }
        Ok(text)
    }
}

/// Page texts joined by newlines, trimmed.
pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    let document =
        Document::load(path).map_err(|error| ExtractionError::PdfParse(error.to_string()))?;

    let mut text = String::new();
    for page_no in document.get_pages().keys() {
        let page = document
            .extract_text(&[*page_no])
            .map_err(|error| ExtractionError::PdfParse(error.to_string()))?;
        text.push_str(&page);
        text.push('\n');
    }

    Ok(text.trim().to_string())
}

/// Paragraph texts of the main document part joined by newlines, trimmed.
pub fn extract_docx_text(path: &Path) -> Result<String, ExtractionError> {
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|error| ExtractionError::DocxParse(error.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|error| ExtractionError::DocxParse(format!("{DOCX_BODY}: {error}")))?
        .read_to_string(&mut xml)?;

    docx_xml_to_text(&xml)
}

fn docx_xml_to_text(xml: &str) -> Result<String, ExtractionError> {
    static TOKEN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let token = TOKEN
        .get_or_init(|| Regex::new(DOCX_TOKENS))
        .as_ref()
        .map_err(|error| ExtractionError::DocxParse(error.to_string()))?;

    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for capture in token.captures_iter(xml) {
        if let Some(run) = capture.get(1) {
            current.push_str(&unescape_xml(run.as_str()));
            continue;
        }

        let tag = capture.get(0).map(|m| m.as_str()).unwrap_or_default();
        if tag.starts_with("<w:tab") {
            current.push('\t');
        } else if tag.starts_with("<w:br") || tag.starts_with("<w:cr") {
            current.push('\n');
        } else {
            paragraphs.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n").trim().to_string())
}

fn unescape_xml(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
