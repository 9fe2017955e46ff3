/*!
 * Tests for application configuration functionality
 */

use std::str::FromStr;
use paysplit::app_config::{Config, LogLevel};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    // Matching thresholds
    assert_eq!(config.matching.high_confidence_threshold, 0.95); // default_high_confidence_threshold()
    assert_eq!(config.matching.proximity_threshold, 0.85); // default_proximity_threshold()
    assert_eq!(config.matching.synonym_threshold, 0.90); // default_synonym_threshold()
    assert!(config.matching.enable_proximity);
    assert!(!config.matching.enable_synonyms);
    assert!(config.matching.synonym_dictionary.is_none());

    // Extraction and OCR
    assert_eq!(config.extraction.min_text_len, 50); // default_min_text_len()
    assert_eq!(config.extraction.min_distinct_letters, 8); // default_min_distinct_letters()
    assert_eq!(config.extraction.max_concurrent_pages, 4); // default_max_concurrent_pages()
    assert!(config.extraction.cache_enabled);
    assert!(config.extraction.ocr.enabled);
    assert_eq!(config.extraction.ocr.language, "eng");
    assert_eq!(config.extraction.ocr.timeout_secs, 30);
    assert_eq!(config.extraction.ocr.dpi, 300);
    assert_eq!(config.extraction.ocr.tesseract_command, "tesseract");
    assert_eq!(config.extraction.ocr.renderer_command, "pdftoppm");

    // Attachment whitelist
    assert_eq!(
        config.attachments.allowed_extensions,
        vec!["doc", "pdf", "xls", "xlsx"]
    );

    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation over a range of edits
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    // Start with a valid config
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Threshold outside 0..=1
    config.matching.high_confidence_threshold = 1.5;
    assert!(config.validate().is_err());
    config.matching.high_confidence_threshold = 0.95;

    // Proximity threshold above the high-confidence cutoff
    config.matching.proximity_threshold = 0.97;
    assert!(config.validate().is_err());
    config.matching.proximity_threshold = 0.85;

    // Extraction limits must be positive
    config.extraction.min_text_len = 0;
    assert!(config.validate().is_err());
    config.extraction.min_text_len = 50;

    config.extraction.max_concurrent_pages = 0;
    assert!(config.validate().is_err());
    config.extraction.max_concurrent_pages = 4;

    // OCR limits only apply while OCR is enabled
    config.extraction.ocr.timeout_secs = 0;
    assert!(config.validate().is_err());
    config.extraction.ocr.enabled = false;
    assert!(config.validate().is_ok());
    config.extraction.ocr.enabled = true;
    config.extraction.ocr.timeout_secs = 30;

    config.extraction.ocr.dpi = 24;
    assert!(config.validate().is_err());
    config.extraction.ocr.dpi = 300;

    // Attachment whitelist must be non-empty bare extensions
    config.attachments.allowed_extensions.clear();
    assert!(config.validate().is_err());
    config.attachments.allowed_extensions = vec![".pdf".to_string()];
    assert!(config.validate().is_err());
    config.attachments.allowed_extensions = vec!["pdf".to_string()];
    assert!(config.validate().is_ok());
}

/// Test that a partial JSON file falls back to defaults for missing fields
#[test]
fn test_config_fromJson_withPartialFile_shouldUseDefaults() {
    let json = r#"{
        "matching": { "proximity_threshold": 0.8 },
        "extraction": { "ocr": { "language": "por" } }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.matching.proximity_threshold, 0.8);
    assert_eq!(config.matching.high_confidence_threshold, 0.95);
    assert_eq!(config.extraction.ocr.language, "por");
    assert_eq!(config.extraction.ocr.timeout_secs, 30);
    assert_eq!(config.extraction.min_text_len, 50);
}

/// Test that an empty JSON object deserializes to the default configuration
#[test]
fn test_config_fromJson_withEmptyObject_shouldMatchDefaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    let defaults = Config::default();

    assert_eq!(config.matching.high_confidence_threshold, defaults.matching.high_confidence_threshold);
    assert_eq!(config.extraction.max_concurrent_pages, defaults.extraction.max_concurrent_pages);
    assert_eq!(config.attachments.allowed_extensions, defaults.attachments.allowed_extensions);
    assert_eq!(config.log_level, defaults.log_level);
}

/// Test serialization round trip
#[test]
fn test_config_serialization_shouldRoundTrip() {
    let mut config = Config::default();
    config.matching.enable_synonyms = true;
    config.extraction.ocr.dpi = 600;
    config.log_level = LogLevel::Debug;

    let json = serde_json::to_string_pretty(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();

    assert!(restored.matching.enable_synonyms);
    assert_eq!(restored.extraction.ocr.dpi, 600);
    assert_eq!(restored.log_level, LogLevel::Debug);
}

/// Test log level parsing from strings
#[test]
fn test_logLevel_fromStr_shouldParseKnownLevels() {
    assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
    assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warn);
    assert_eq!(LogLevel::from_str("Info").unwrap(), LogLevel::Info);
    assert_eq!(LogLevel::from_str("debug").unwrap(), LogLevel::Debug);
    assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
    assert!(LogLevel::from_str("verbose").is_err());
}

/// Test log level display formatting
#[test]
fn test_logLevel_display_shouldUseLowercaseNames() {
    assert_eq!(LogLevel::Error.to_string(), "error");
    assert_eq!(LogLevel::Info.to_string(), "info");
    assert_eq!(LogLevel::Trace.to_string(), "trace");
}
