use crate::error::ExtractionError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";

// Upper bound on the inflated body part, guards against zip bombs.
const MAX_DOCX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Picks the format from the upload's filename suffix.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".pdf") {
            Some(DocumentFormat::Pdf)
        } else if filename.ends_with(".docx") {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// Extracts the plain text of a document, in reading order.
///
/// Fails with [`ExtractionError::Empty`] when the document parses but holds
/// nothing but whitespace.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Docx => extract_docx(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    tracing::debug!(
        format = format.as_str(),
        chars = text.chars().count(),
        "extracted document text"
    );
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some structurally valid but broken files
    // (e.g. a page drawing with a font it never declares).
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| {
        tracing::warn!("pdf parser panicked on upload");
        ExtractionError::Pdf("malformed PDF".to_string())
    })?
    .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY)
        .map_err(|e| ExtractionError::Docx(format!("{}: {}", DOCX_BODY, e)))?;

    let xml = read_bounded(entry, MAX_DOCX_BODY_BYTES)?;
    docx_body_text(&xml)
}

/// Reads at most `limit` bytes of UTF-8; anything longer is rejected, not cut.
fn read_bounded(reader: impl Read, limit: u64) -> Result<String, ExtractionError> {
    let mut buf = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    if buf.len() as u64 > limit {
        return Err(ExtractionError::Docx("document body too large".to_string()));
    }

    String::from_utf8(buf).map_err(|e| ExtractionError::Docx(e.to_string()))
}

/// Collects `w:t` runs; each `w:p` paragraph ends a line.
fn docx_body_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_run_text = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let run = t
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(e.to_string()))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(text)
}
