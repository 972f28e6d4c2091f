//! Plain-text extraction from uploaded documents.
//!
//! PDFs are read in-process with `pdf-extract`. Scanned PDFs (no text layer) can optionally be
//! rasterized with `pdftoppm` and run through `tesseract`; both tools must be on `PATH`. DOCX
//! files are zip archives whose `word/document.xml` carries paragraph runs.

pub(crate) mod docx;
mod ocr;
mod pdf;

use std::path::Path;
use thiserror::Error;

/// Extensions accepted for upload and extraction.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File extension is outside the supported set.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// PDF text layer could not be decoded.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// Word document could not be opened or parsed.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    /// Required external OCR tool is not installed.
    #[error("External tool not found: {0}")]
    ToolNotFound(String),
    /// External OCR tool ran but failed.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    /// Reading the source file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Method used to obtain the text of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Embedded PDF text layer.
    PdfText,
    /// Tesseract OCR over rasterized pages.
    Ocr,
    /// Paragraph runs from a Word document.
    Docx,
}

/// Normalized text plus the method that produced it.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Normalized document text.
    pub text: String,
    /// Extraction path taken.
    pub method: ExtractionMethod,
}

/// Text extractor with an optional OCR fallback for scanned PDFs.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    ocr_enabled: bool,
    ocr_language: String,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self {
            ocr_enabled: false,
            ocr_language: "eng".to_string(),
        }
    }
}

impl TextExtractor {
    /// Create an extractor without OCR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the OCR fallback.
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.ocr_enabled = enabled;
        self
    }

    /// Set the Tesseract language code.
    pub fn with_language(mut self, language: &str) -> Self {
        self.ocr_language = language.to_string();
        self
    }

    /// Extract and normalize the text of `path`, dispatching on its extension.
    ///
    /// This performs blocking file and process I/O; async callers should run it on a blocking
    /// thread.
    pub fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let extension = file_extension(path);
        match extension.as_str() {
            "pdf" => self.extract_pdf(path),
            "docx" | "doc" => {
                let bytes = std::fs::read(path)?;
                let text = docx::extract_docx_text(&bytes)?;
                Ok(ExtractedText {
                    text: normalize_text(&text),
                    method: ExtractionMethod::Docx,
                })
            }
            _ => Err(ExtractionError::UnsupportedFileType(format!(".{extension}"))),
        }
    }

    fn extract_pdf(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let bytes = std::fs::read(path)?;
        match pdf::extract_pdf_text(&bytes) {
            Ok(text) if !text.trim().is_empty() || !self.ocr_enabled => Ok(ExtractedText {
                text: normalize_text(&text),
                method: ExtractionMethod::PdfText,
            }),
            Ok(_) => {
                tracing::info!(path = %path.display(), "PDF has no text layer; running OCR");
                self.ocr(path)
            }
            Err(error) if self.ocr_enabled => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "PDF text extraction failed; running OCR"
                );
                self.ocr(path)
            }
            Err(error) => Err(error),
        }
    }

    fn ocr(&self, path: &Path) -> Result<ExtractedText, ExtractionError> {
        let text = ocr::ocr_pdf(path, &self.ocr_language)?;
        Ok(ExtractedText {
            text: normalize_text(&text),
            method: ExtractionMethod::Ocr,
        })
    }
}

/// Extract text from `path` with the default extractor (no OCR).
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    TextExtractor::new().extract(path).map(|extracted| extracted.text)
}

/// Whether a file name carries one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_extension(file_name: &str) -> bool {
    let extension = file_extension(Path::new(file_name));
    SUPPORTED_EXTENSIONS.contains(&extension.as_str())
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Replace ligatures and typographic punctuation, strip control artifacts, and drop blank lines.
pub fn normalize_text(text: &str) -> String {
    let replaced = text
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace(['\u{0}', '\u{FEFF}'], "");

    replaced
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
