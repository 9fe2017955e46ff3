/*!
 * Application configuration for paysplit.
 *
 * Configuration is loaded from a JSON file and covers the four concerns of a
 * split run: name matching, page text extraction (including the OCR fallback),
 * output handling and attachment pairing. Every field has a sensible default
 * so a partial configuration file is enough.
 */

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Log level for application logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Name matching configuration
// @field: thresholds are scores in 0.0..=1.0, strategies below their threshold emit nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Score at or above which a strategy stops the pipeline early
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f32,

    /// Minimum similarity for the proximity strategy
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f32,

    /// Minimum similarity for the synonym strategy, stricter than proximity
    #[serde(default = "default_synonym_threshold")]
    pub synonym_threshold: f32,

    /// Whether the proximity strategy runs at all
    #[serde(default = "default_enable_proximity")]
    pub enable_proximity: bool,

    /// Whether the synonym strategy runs, disabled unless explicitly requested
    #[serde(default)]
    pub enable_synonyms: bool,

    /// Optional JSON file with interchangeable name token groups
    #[serde(default)]
    pub synonym_dictionary: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            high_confidence_threshold: default_high_confidence_threshold(),
            proximity_threshold: default_proximity_threshold(),
            synonym_threshold: default_synonym_threshold(),
            enable_proximity: default_enable_proximity(),
            enable_synonyms: false,
            synonym_dictionary: None,
        }
    }
}

/// OCR fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Whether the OCR fallback is used for pages with an unusable text layer
    #[serde(default = "default_ocr_enabled")]
    pub enabled: bool,

    /// Language hint passed to the OCR engine
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Per-page time budget for the OCR fallback
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,

    /// Rasterization resolution in dots per inch
    #[serde(default = "default_ocr_dpi")]
    pub dpi: u32,

    /// OCR engine executable
    #[serde(default = "default_tesseract_command")]
    pub tesseract_command: String,

    /// Page-to-image renderer executable
    #[serde(default = "default_renderer_command")]
    pub renderer_command: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            enabled: default_ocr_enabled(),
            language: default_ocr_language(),
            timeout_secs: default_ocr_timeout_secs(),
            dpi: default_ocr_dpi(),
            tesseract_command: default_tesseract_command(),
            renderer_command: default_renderer_command(),
        }
    }
}

/// Page text extraction configuration
// @field: min_text_len and min_distinct_letters form the usability predicate
// that decides when a native text layer is trusted over OCR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for a usable native text layer
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    /// Minimum count of distinct letters for a usable native text layer
    #[serde(default = "default_min_distinct_letters")]
    pub min_distinct_letters: usize,

    /// Upper bound on pages extracted concurrently
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,

    /// Whether per-page extraction results are cached for the run
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// OCR fallback settings
    #[serde(default)]
    pub ocr: OcrConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            min_text_len: default_min_text_len(),
            min_distinct_letters: default_min_distinct_letters(),
            max_concurrent_pages: default_max_concurrent_pages(),
            cache_enabled: default_cache_enabled(),
            ocr: OcrConfig::default(),
        }
    }
}

/// Output handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for audit logs
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Whether the source document is copied aside before a run
    #[serde(default)]
    pub backup_enabled: bool,

    /// Directory for source backups
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            logs_dir: default_logs_dir(),
            backup_enabled: false,
            backup_dir: default_backup_dir(),
        }
    }
}

/// Attachment pairing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Allowed attachment extensions, compared case-insensitively without the dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        AttachmentConfig {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Main configuration structure for the application
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Name matching settings
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Page text extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Output handling settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Attachment pairing settings
    #[serde(default)]
    pub attachments: AttachmentConfig,

    /// Log level for application logging
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Config {
    /// Validate the configuration
    // @returns: Ok(()) if the configuration is valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("high_confidence_threshold", self.matching.high_confidence_threshold),
            ("proximity_threshold", self.matching.proximity_threshold),
            ("synonym_threshold", self.matching.synonym_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be between 0.0 and 1.0, got {}", name, value));
            }
        }

        if self.matching.proximity_threshold > self.matching.high_confidence_threshold {
            return Err(anyhow!(
                "proximity_threshold ({}) cannot exceed high_confidence_threshold ({})",
                self.matching.proximity_threshold,
                self.matching.high_confidence_threshold
            ));
        }

        if let Some(path) = &self.matching.synonym_dictionary {
            if self.matching.enable_synonyms && !path.exists() {
                return Err(anyhow!("Synonym dictionary not found: {:?}", path));
            }
        }

        if self.extraction.min_text_len == 0 {
            return Err(anyhow!("min_text_len must be at least 1"));
        }

        if self.extraction.max_concurrent_pages == 0 {
            return Err(anyhow!("max_concurrent_pages must be at least 1"));
        }

        if self.extraction.ocr.enabled {
            if self.extraction.ocr.timeout_secs == 0 {
                return Err(anyhow!("OCR timeout_secs must be at least 1"));
            }
            if !(72..=1200).contains(&self.extraction.ocr.dpi) {
                return Err(anyhow!(
                    "OCR dpi must be between 72 and 1200, got {}",
                    self.extraction.ocr.dpi
                ));
            }
            if self.extraction.ocr.language.trim().is_empty() {
                return Err(anyhow!("OCR language must not be empty"));
            }
        }

        if self.attachments.allowed_extensions.is_empty() {
            return Err(anyhow!("allowed_extensions must not be empty"));
        }
        for ext in &self.attachments.allowed_extensions {
            if ext.trim().is_empty() || ext.contains('.') {
                return Err(anyhow!("Invalid attachment extension: '{}'", ext));
            }
        }

        Ok(())
    }
}

// Default value functions for matching

fn default_high_confidence_threshold() -> f32 {
    0.95
}

fn default_proximity_threshold() -> f32 {
    0.85
}

fn default_synonym_threshold() -> f32 {
    0.90
}

fn default_enable_proximity() -> bool {
    true
}

// Default value functions for extraction

fn default_min_text_len() -> usize {
    50
}

fn default_min_distinct_letters() -> usize {
    8
}

fn default_max_concurrent_pages() -> usize {
    4
}

fn default_cache_enabled() -> bool {
    true
}

// Default value functions for OCR

fn default_ocr_enabled() -> bool {
    true
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    30
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_tesseract_command() -> String {
    "tesseract".to_string()
}

fn default_renderer_command() -> String {
    "pdftoppm".to_string()
}

// Default value functions for output

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backup")
}

// Default value functions for attachments

fn default_allowed_extensions() -> Vec<String> {
    vec![
        "doc".to_string(),
        "pdf".to_string(),
        "xls".to_string(),
        "xlsx".to_string(),
    ]
}
