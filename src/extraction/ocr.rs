use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use tempfile::TempDir;

use super::ExtractionError;

const PDFTOPPM: &str = "pdftoppm (install poppler-utils)";
const TESSERACT: &str = "tesseract (install tesseract-ocr)";

/// Rasterize every page of `path` at 300 DPI and OCR the images in page order.
///
/// Pages that fail OCR are logged and skipped; the call fails only when no images were produced
/// or a required tool is missing.
pub(super) fn ocr_pdf(path: &Path, language: &str) -> Result<String, ExtractionError> {
    let temp_dir = TempDir::new()?;
    let prefix = temp_dir.path().join("page");

    let status = Command::new("pdftoppm")
        .args(["-png", "-r", "300"])
        .arg(path)
        .arg(&prefix)
        .status();
    check_status(status, PDFTOPPM, "pdftoppm failed to convert PDF")?;

    let images = page_images(temp_dir.path())?;
    if images.is_empty() {
        return Err(ExtractionError::ExtractionFailed(
            "No images generated from PDF".to_string(),
        ));
    }

    let mut pages = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        match run_tesseract(image, language) {
            Ok(text) => pages.push(text),
            Err(error @ ExtractionError::ToolNotFound(_)) => return Err(error),
            Err(error) => {
                tracing::warn!(page = index + 1, error = %error, "OCR failed for page");
            }
        }
    }

    Ok(pages.join("\n"))
}

// pdftoppm zero-pads page numbers to the width of the page count, so lexical order is page order.
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    images.sort();
    Ok(images)
}

fn run_tesseract(image: &Path, language: &str) -> Result<String, ExtractionError> {
    let output = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .args(["-l", language])
        .output();
    handle_output(output, TESSERACT, "tesseract failed")
}

fn handle_output(
    result: std::io::Result<Output>,
    tool: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => Err(ExtractionError::ExtractionFailed(format!(
            "{error_prefix}: {}",
            String::from_utf8_lossy(&output.stderr)
        ))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool.to_string()))
        }
        Err(error) => Err(ExtractionError::Io(error)),
    }
}

fn check_status(
    result: std::io::Result<ExitStatus>,
    tool: &str,
    error_message: &str,
) -> Result<(), ExtractionError> {
    match result {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => Err(ExtractionError::ExtractionFailed(error_message.to_string())),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool.to_string()))
        }
        Err(error) => Err(ExtractionError::Io(error)),
    }
}
