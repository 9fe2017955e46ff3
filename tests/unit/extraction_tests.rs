/*!
 * Tests for page text extraction with the OCR fallback
 */

use std::sync::Arc;
use anyhow::Result;
use paysplit::app_config::ExtractionConfig;
use paysplit::app_controller::CancelFlag;
use paysplit::errors::ExtractionError;
use paysplit::extraction::{ExtractionMethod, PageExtractor};
use paysplit::ocr::MockOcr;
use paysplit::pdf_document::SourceDocument;
use crate::common;
use crate::common::fixtures;

/// Test that a page with a solid text layer never touches OCR
#[tokio::test]
async fn test_extractPage_withNativeTextLayer_shouldUseNativePath() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(
        temp_dir.path(),
        "batch.pdf",
        &[&fixtures::paystub_text("Maria Silva")],
    )?;
    let doc = SourceDocument::open(&path).await?;

    let mock = MockOcr::working();
    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(mock.clone()));

    let extracted = extractor.extract_page(&doc, 0).await?;

    assert_eq!(extracted.method, ExtractionMethod::Native);
    assert!(extracted.text.contains("Maria Silva"));
    assert!(extracted.confidence.is_none());
    assert_eq!(mock.calls(), 0);

    Ok(())
}

/// Test that a page without a text layer falls back to OCR
#[tokio::test]
async fn test_extractPage_withEmptyTextLayer_shouldFallBackToOcr() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "scan.pdf", &[""])?;
    let doc = SourceDocument::open(&path).await?;

    let mock = MockOcr::working().with_page_text(0, "Recibo de Maria Silva, junho", 0.92);
    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(mock.clone()));

    let extracted = extractor.extract_page(&doc, 0).await?;

    assert_eq!(extracted.method, ExtractionMethod::Ocr);
    assert_eq!(extracted.text, "Recibo de Maria Silva, junho");
    assert_eq!(extracted.confidence, Some(0.92));
    assert_eq!(mock.calls(), 1);

    Ok(())
}

/// Test that an empty page errors out when OCR is disabled
#[tokio::test]
async fn test_extractPage_withEmptyPageAndOcrDisabled_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "scan.pdf", &[""])?;
    let doc = SourceDocument::open(&path).await?;

    let mut config = ExtractionConfig::default();
    config.ocr.enabled = false;
    let extractor = PageExtractor::new(config, Arc::new(MockOcr::working()));

    let error = extractor.extract_page(&doc, 0).await.unwrap_err();
    assert!(matches!(error, ExtractionError::EmptyText { page: 0 }));
    assert_eq!(error.reason_code(), "empty_text");

    Ok(())
}

/// Test that thin but present text passes through when OCR is disabled
#[tokio::test]
async fn test_extractPage_withThinTextAndOcrDisabled_shouldPassTextThrough() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "thin.pdf", &["Maria Silva"])?;
    let doc = SourceDocument::open(&path).await?;

    let mut config = ExtractionConfig::default();
    config.ocr.enabled = false;
    let extractor = PageExtractor::new(config, Arc::new(MockOcr::working()));

    let extracted = extractor.extract_page(&doc, 0).await?;

    assert_eq!(extracted.method, ExtractionMethod::Native);
    assert!(extracted.text.contains("Maria Silva"));

    Ok(())
}

/// Test that a repeated extraction is served from the cache, not OCR
#[tokio::test]
async fn test_extractPage_calledTwice_shouldServeSecondCallFromCache() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "scan.pdf", &[""])?;
    let doc = SourceDocument::open(&path).await?;

    let mock = MockOcr::working().with_page_text(0, "Recibo de Joao Souza", 0.88);
    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(mock.clone()));

    let first = extractor.extract_page(&doc, 0).await?;
    let second = extractor.extract_page(&doc, 0).await?;

    assert_eq!(first.text, second.text);
    assert_eq!(mock.calls(), 1);

    let (hits, _, _) = extractor.cache_stats();
    assert_eq!(hits, 1);

    Ok(())
}

/// Test that an OCR failure is confined to its page
#[tokio::test]
async fn test_extractPage_withFailingOcr_shouldReturnPageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "scan.pdf", &[""])?;
    let doc = SourceDocument::open(&path).await?;

    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(MockOcr::failing()));

    let error = extractor.extract_page(&doc, 0).await.unwrap_err();
    assert!(matches!(error, ExtractionError::Ocr { page: 0, .. }));
    assert_eq!(error.page(), 0);
    assert_eq!(error.reason_code(), "ocr");

    Ok(())
}

/// Test that a hung OCR engine hits the per-page time budget
#[tokio::test]
async fn test_extractPage_withSlowOcr_shouldTimeOut() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = fixtures::build_batch_pdf(temp_dir.path(), "scan.pdf", &[""])?;
    let doc = SourceDocument::open(&path).await?;

    let mut config = ExtractionConfig::default();
    config.ocr.timeout_secs = 1;
    let extractor = PageExtractor::new(config, Arc::new(MockOcr::slow(5_000)));

    let error = extractor.extract_page(&doc, 0).await.unwrap_err();
    assert!(matches!(
        error,
        ExtractionError::Timeout { page: 0, timeout_secs: 1 }
    ));
    assert_eq!(error.reason_code(), "timeout");

    Ok(())
}

/// Test a mixed batch: native pages, an OCR page, outcomes in source order
#[tokio::test]
async fn test_extractBatch_withMixedPages_shouldReturnOrderedOutcomes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let maria = fixtures::paystub_text("Maria Silva");
    let joao = fixtures::paystub_text("Joao Souza");
    let path = fixtures::build_batch_pdf(temp_dir.path(), "batch.pdf", &[&maria, "", &joao])?;
    let doc = Arc::new(SourceDocument::open(&path).await?);

    let mock = MockOcr::working().with_page_text(1, "Recibo de Fernanda Lima", 0.9);
    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(mock));

    let (outcomes, cancelled) = extractor
        .extract_batch(Arc::clone(&doc), CancelFlag::new(), |_, _| {})
        .await;

    assert!(!cancelled);
    assert_eq!(outcomes.len(), 3);
    let methods: Vec<ExtractionMethod> = outcomes
        .iter()
        .map(|o| o.outcome.as_ref().unwrap().method)
        .collect();
    assert_eq!(
        methods,
        vec![ExtractionMethod::Native, ExtractionMethod::Ocr, ExtractionMethod::Native]
    );
    let indexes: Vec<usize> = outcomes.iter().map(|o| o.page_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);

    Ok(())
}

/// Test that a batch started after cancellation attempts no pages
#[tokio::test]
async fn test_extractBatch_whenPreCancelled_shouldAttemptNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let text = fixtures::paystub_text("Maria Silva");
    let path = fixtures::build_batch_pdf(temp_dir.path(), "batch.pdf", &[&text, &text])?;
    let doc = Arc::new(SourceDocument::open(&path).await?);

    let extractor = PageExtractor::new(ExtractionConfig::default(), Arc::new(MockOcr::working()));

    let cancel = CancelFlag::new();
    cancel.cancel();
    let (outcomes, cancelled) = extractor
        .extract_batch(Arc::clone(&doc), cancel, |_, _| {})
        .await;

    assert!(cancelled);
    assert!(outcomes.is_empty());

    Ok(())
}

/// Test the pre-flight OCR availability check
#[tokio::test]
async fn test_ensureOcrAvailable_withMissingEngine_shouldFailFast() -> Result<()> {
    let extractor = PageExtractor::new(
        ExtractionConfig::default(),
        Arc::new(MockOcr::unavailable()),
    );
    let error = extractor.ensure_ocr_available().await.unwrap_err();
    assert!(error.is_fatal());

    // with OCR disabled the same engine is never probed
    let mut config = ExtractionConfig::default();
    config.ocr.enabled = false;
    let extractor = PageExtractor::new(config, Arc::new(MockOcr::unavailable()));
    assert!(extractor.ensure_ocr_available().await.is_ok());

    Ok(())
}
