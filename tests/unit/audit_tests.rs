/*!
 * Tests for the unmatched-page audit log
 */

use std::fs;
use std::path::Path;
use anyhow::Result;
use paysplit::audit::UnmatchedLogger;
use paysplit::matching::resolver::{UnmatchedEntry, UnmatchedReason};
use paysplit::splitter::RunPeriod;
use crate::common;

/// Test that the logger writes under the configured logs directory
#[test]
fn test_path_shouldPointAtUnmatchedLogInLogsDir() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let logger = UnmatchedLogger::new(temp_dir.path());

    assert_eq!(logger.path().parent().unwrap(), temp_dir.path());
    assert_eq!(logger.path().file_name().unwrap(), "unmatched.log");

    Ok(())
}

/// Test that every audit line carries a timestamp prefix
#[test]
fn test_logRun_shouldTimestampEveryLine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let logger = UnmatchedLogger::new(temp_dir.path());
    let entries = vec![UnmatchedEntry {
        page_index: 3,
        reason: UnmatchedReason::NoMatch,
        candidate: None,
        detail: None,
    }];

    logger.log_run("a1b2c3d4e5", Path::new("batch.pdf"), RunPeriod::new(2025, 6)?, &entries)?;

    let content = fs::read_to_string(logger.path())?;
    assert!(content.lines().count() >= 2);
    assert!(content.lines().all(|l| l.starts_with('[')));

    Ok(())
}

/// Test that an ambiguous page produces one line per tied candidate
#[test]
fn test_logRun_withAmbiguousPage_shouldWriteOneLinePerCandidate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let logger = UnmatchedLogger::new(temp_dir.path());
    let entries = vec![
        UnmatchedEntry {
            page_index: 4,
            reason: UnmatchedReason::Ambiguous,
            candidate: Some("Ana Souza".to_string()),
            detail: Some("exact score=1.00".to_string()),
        },
        UnmatchedEntry {
            page_index: 4,
            reason: UnmatchedReason::Ambiguous,
            candidate: Some("Ana Souza Lima".to_string()),
            detail: Some("exact score=1.00".to_string()),
        },
    ];

    logger.log_run("ffee1122", Path::new("batch.pdf"), RunPeriod::new(2025, 6)?, &entries)?;

    let content = fs::read_to_string(logger.path())?;
    let page_lines: Vec<&str> = content.lines().filter(|l| l.contains("page=4")).collect();
    assert_eq!(page_lines.len(), 2);
    assert!(content.contains("candidate=Ana Souza"));
    assert!(content.contains("candidate=Ana Souza Lima"));

    Ok(())
}

/// Test that the audit log carries identifiers and reasons, not page text
#[test]
fn test_logRun_shouldNotContainAnythingBeyondEntryFields() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let logger = UnmatchedLogger::new(temp_dir.path());
    let entries = vec![UnmatchedEntry {
        page_index: 0,
        reason: UnmatchedReason::ExtractionFailed,
        candidate: None,
        detail: Some("timeout".to_string()),
    }];

    logger.log_run("00aa11bb", Path::new("folha_junho.pdf"), RunPeriod::new(2025, 6)?, &entries)?;

    let content = fs::read_to_string(logger.path())?;
    for line in content.lines() {
        // strip the timestamp, keep the structured payload
        let payload = line.splitn(2, "] ").nth(1).unwrap_or(line);
        assert!(payload.starts_with("run=00aa11bb"), "unexpected line: {}", line);
    }
    assert!(content.contains("reason=extraction_failed"));
    assert!(content.contains("candidate=-"));

    Ok(())
}
