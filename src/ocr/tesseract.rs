/*!
 * Tesseract-based OCR engine.
 *
 * Pages are rasterized with poppler's pdftoppm, then recognized by the
 * tesseract CLI in TSV mode so word confidences come back alongside the text.
 * Both tools are external processes; the per-page time budget is enforced by
 * the caller.
 */

use async_trait::async_trait;
use log::{debug, error};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

use super::{OcrEngine, OcrText};
use crate::app_config::OcrConfig;
use crate::errors::OcrError;

/// OCR engine backed by the system tesseract install
#[derive(Debug)]
pub struct TesseractOcr {
    command: String,
    renderer: String,
    language: String,
    dpi: u32,
    render_dir: TempDir,
}

impl TesseractOcr {
    /// Engine with default binaries and language
    pub fn new() -> Result<Self, OcrError> {
        Self::from_config(&OcrConfig::default())
    }

    /// Engine configured from the application OCR settings
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let render_dir = TempDir::new()
            .map_err(|e| OcrError::Render(format!("failed to create render directory: {}", e)))?;

        Ok(TesseractOcr {
            command: config.tesseract_command.clone(),
            renderer: config.renderer_command.clone(),
            language: config.language.clone(),
            dpi: config.dpi,
            render_dir,
        })
    }

    /// Recognize text in an already rendered page image
    pub async fn recognize_image(&self, image: &Path) -> Result<OcrText, OcrError> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language, "--psm", "3", "tsv"])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    OcrError::Unavailable(self.command.clone())
                } else {
                    OcrError::Launch(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("OCR process failed: {}", stderr.trim());
            return Err(OcrError::Recognition(stderr.trim().to_string()));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv))
    }

    // Rasterize one page into a PNG inside the engine's render directory
    async fn render_page(&self, source: &Path, page_index: usize) -> Result<PathBuf, OcrError> {
        let page_number = page_index + 1; // pdftoppm pages are 1-based
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page");
        let prefix = self
            .render_dir
            .path()
            .join(format!("{}-{:05}", stem, page_number));

        let output = Command::new(&self.renderer)
            .args([
                "-png",
                "-r",
                &self.dpi.to_string(),
                "-f",
                &page_number.to_string(),
                "-l",
                &page_number.to_string(),
                "-singlefile",
            ])
            .arg(source)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    OcrError::Unavailable(self.renderer.clone())
                } else {
                    OcrError::Render(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Render(format!(
                "renderer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let image = prefix.with_extension("png");
        if !image.is_file() {
            return Err(OcrError::Render(format!(
                "renderer produced no image for page {}",
                page_number
            )));
        }
        Ok(image)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        &self.command
    }

    async fn recognize_page(&self, source: &Path, page_index: usize) -> Result<OcrText, OcrError> {
        let image = self.render_page(source, page_index).await?;
        debug!("Rendered page {} to {:?}", page_index, image.file_name().unwrap_or_default());
        self.recognize_image(&image).await
    }

    async fn is_available(&self) -> bool {
        let tesseract_ok = Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .is_ok();
        let renderer_ok = Command::new(&self.renderer).arg("-v").output().await.is_ok();
        tesseract_ok && renderer_ok
    }
}

// Parse tesseract TSV output into text plus a mean word confidence.
// Columns: level page block par line word left top width height conf text
fn parse_tsv(tsv: &str) -> OcrText {
    let mut text = String::new();
    let mut confidences: Vec<f32> = Vec::new();
    let mut current_line: Option<(u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        // level 5 rows are words
        if columns[0] != "5" {
            continue;
        }

        let word = columns[11].trim();
        if word.is_empty() {
            continue;
        }

        let line_key = (
            columns[2].parse().unwrap_or(0),
            columns[3].parse().unwrap_or(0),
            columns[4].parse().unwrap_or(0),
        );
        match current_line {
            Some(previous) if previous == line_key => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line_key);
        text.push_str(word);

        if let Ok(confidence) = columns[10].parse::<f32>() {
            if confidence >= 0.0 {
                confidences.push(confidence);
            }
        }
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        (confidences.iter().sum::<f32>() / confidences.len() as f32 / 100.0).clamp(0.0, 1.0)
    };

    OcrText { text, confidence }
}
