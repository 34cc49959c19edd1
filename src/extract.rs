//! Plain-text extraction for the document formats the pipeline accepts.
//!
//! Text-like files are read directly with lossy UTF-8 decoding. PDF and DOCX
//! go through dedicated parsers. Anything else falls back to a lossy read,
//! which may yield an empty string for binary formats.

use std::path::Path;
use thiserror::Error;

/// Errors from document text extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be read from disk.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
    /// The PDF parser rejected the file.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The DOCX parser rejected the file.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Extract readable text from a downloaded document.
///
/// Dispatch is by file extension, matched case-insensitively. An empty
/// result is not an error; callers decide whether to proceed.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let text = match ext.as_deref() {
        Some("txt" | "md" | "csv" | "log") => read_lossy(path)?,
        Some("pdf") => extract_pdf(path)?,
        Some("docx") => extract_docx(path)?,
        _ => read_lossy(path)?,
    };

    tracing::debug!(
        bytes = text.len(),
        path = %path.display(),
        "Extracted document text"
    );
    Ok(text)
}

fn read_lossy(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    // pdf-extract panics on some malformed fonts.
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    }));
    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(ExtractError::Pdf(error.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked on malformed input".into())),
    }
}

fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let doc = docx_rs::read_docx(&bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut lines = Vec::new();
    for child in doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                lines.push(paragraph_text(&paragraph));
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(row) = row;
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|cell| {
                            let docx_rs::TableRowChild::TableCell(cell) = cell;
                            cell.children
                                .iter()
                                .map(|content| match content {
                                    docx_rs::TableCellContent::Paragraph(paragraph) => {
                                        paragraph_text(paragraph)
                                    }
                                    _ => String::new(),
                                })
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .collect();
                    lines.push(cells.join(" | "));
                }
            }
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, &mut text),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for nested in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = nested {
                        push_run_text(run, &mut text);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run_text(run: &docx_rs::Run, output: &mut String) {
    for child in &run.children {
        if let docx_rs::RunChild::Text(text) = child {
            output.push_str(&text.text);
        }
    }
}
