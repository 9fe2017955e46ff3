/*!
 * Whole-document page range resolution.
 *
 * Resolution is the synchronization point of a run: every page must be
 * assessed before any range is final, because a page that matches two
 * recipients equally disqualifies itself for both of them. The output
 * partitions the document exactly: each page lands either in one recipient's
 * range or in the unmatched list, never both, never dropped.
 */

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::PageMatches;

/// All pages assigned to one recipient, merged and in source order
#[derive(Debug, Clone, PartialEq)]
pub struct PageRange {
    /// Registry id of the recipient
    pub recipient_id: i64,
    /// Display name of the recipient
    pub recipient_name: String,
    /// Zero-based page indexes in ascending order, not necessarily contiguous
    pub pages: Vec<usize>,
}

/// Why a page could not be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedReason {
    /// No strategy produced an accepted result
    NoMatch,
    /// Two or more recipients tied for the page
    Ambiguous,
    /// Neither native text nor OCR yielded usable text
    ExtractionFailed,
}

impl UnmatchedReason {
    /// Short name for audit lines
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchedReason::NoMatch => "no_match",
            UnmatchedReason::Ambiguous => "ambiguous",
            UnmatchedReason::ExtractionFailed => "extraction_failed",
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit record for a page that was not assigned
#[derive(Debug, Clone)]
pub struct UnmatchedEntry {
    /// Zero-based page index
    pub page_index: usize,
    /// Why the page was not assigned
    pub reason: UnmatchedReason,
    /// The recipient name involved, when one is known
    pub candidate: Option<String>,
    /// Extra context such as an extraction failure code, never page content
    pub detail: Option<String>,
}

/// State of one page entering resolution
#[derive(Debug, Clone)]
pub enum PageStatus {
    /// Text was extracted and matched
    Assessed(PageMatches),
    /// Extraction failed, the page carries no match information
    ExtractionFailed {
        /// Zero-based page index
        page_index: usize,
        /// Failure reason code
        reason: String,
    },
}

impl PageStatus {
    /// The page this status belongs to
    pub fn page_index(&self) -> usize {
        match self {
            PageStatus::Assessed(matches) => matches.page_index,
            PageStatus::ExtractionFailed { page_index, .. } => *page_index,
        }
    }
}

/// Resolved assignment of every page in a document
#[derive(Debug, Clone, Default)]
pub struct ResolvedPlan {
    /// One range per recipient that matched at least one page
    pub ranges: Vec<PageRange>,
    /// Audit entries for pages excluded from every range
    pub unmatched: Vec<UnmatchedEntry>,
}

impl ResolvedPlan {
    /// Number of pages assigned to some recipient
    pub fn matched_page_count(&self) -> usize {
        self.ranges.iter().map(|r| r.pages.len()).sum()
    }

    /// Number of distinct unmatched pages
    // @returns: an ambiguous page counts once even though it produces one
    // audit entry per tied recipient
    pub fn unmatched_page_count(&self) -> usize {
        self.unmatched
            .iter()
            .map(|e| e.page_index)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Range assigned to a recipient, if any
    pub fn range_for(&self, recipient_id: i64) -> Option<&PageRange> {
        self.ranges.iter().find(|r| r.recipient_id == recipient_id)
    }

    /// Check that ranges and unmatched entries partition the document exactly
    pub fn verify_partition(&self, page_count: usize) -> bool {
        let mut seen = BTreeSet::new();
        for range in &self.ranges {
            for &page in &range.pages {
                if page >= page_count || !seen.insert(page) {
                    return false;
                }
            }
        }
        for entry in &self.unmatched {
            if entry.page_index >= page_count {
                return false;
            }
            // multiple entries per ambiguous page are expected
            seen.insert(entry.page_index);
        }
        seen.len() == page_count
    }
}

/// Turns per-page match results into per-recipient page ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRangeResolver;

impl PageRangeResolver {
    /// Create a resolver
    pub fn new() -> Self {
        PageRangeResolver
    }

    /// Resolve every page of a document into ranges and unmatched entries
    pub fn resolve(&self, page_count: usize, statuses: &[PageStatus]) -> ResolvedPlan {
        let by_page: BTreeMap<usize, &PageStatus> = statuses
            .iter()
            .map(|status| (status.page_index(), status))
            .collect();

        // recipient id -> (name, pages); BTreeMap keeps range order deterministic
        let mut assignments: BTreeMap<i64, (String, Vec<usize>)> = BTreeMap::new();
        let mut unmatched: Vec<UnmatchedEntry> = Vec::new();

        for page_index in 0..page_count {
            match by_page.get(&page_index) {
                None => {
                    // a page the caller never handed over cannot be assigned
                    warn!("Page {} reached resolution without a status", page_index);
                    unmatched.push(UnmatchedEntry {
                        page_index,
                        reason: UnmatchedReason::ExtractionFailed,
                        candidate: None,
                        detail: Some("not_processed".to_string()),
                    });
                }
                Some(PageStatus::ExtractionFailed { reason, .. }) => {
                    unmatched.push(UnmatchedEntry {
                        page_index,
                        reason: UnmatchedReason::ExtractionFailed,
                        candidate: None,
                        detail: Some(reason.clone()),
                    });
                }
                Some(PageStatus::Assessed(matches)) => {
                    let leaders = matches.tied_leaders();
                    match leaders.len() {
                        0 => {
                            let candidate = matches
                                .best_rejected
                                .as_ref()
                                .map(|(name, _)| name.clone());
                            let detail = matches
                                .best_rejected
                                .as_ref()
                                .map(|(_, score)| format!("best_score={:.2}", score));
                            unmatched.push(UnmatchedEntry {
                                page_index,
                                reason: UnmatchedReason::NoMatch,
                                candidate,
                                detail,
                            });
                        }
                        1 => {
                            let winner = leaders[0];
                            debug!(
                                "Page {} assigned to '{}' via {} ({:.2})",
                                page_index, winner.recipient_name, winner.strategy, winner.score
                            );
                            assignments
                                .entry(winner.recipient_id)
                                .or_insert_with(|| (winner.recipient_name.clone(), Vec::new()))
                                .1
                                .push(page_index);
                        }
                        _ => {
                            // a tie poisons the page for every contender
                            warn!(
                                "Page {} is ambiguous between {} recipients, excluding it from all ranges",
                                page_index,
                                leaders.len()
                            );
                            for leader in leaders {
                                unmatched.push(UnmatchedEntry {
                                    page_index,
                                    reason: UnmatchedReason::Ambiguous,
                                    candidate: Some(leader.recipient_name.clone()),
                                    detail: Some(format!(
                                        "{} score={:.2}",
                                        leader.strategy, leader.score
                                    )),
                                });
                            }
                        }
                    }
                }
            }
        }

        let ranges = assignments
            .into_iter()
            .map(|(recipient_id, (recipient_name, pages))| PageRange {
                recipient_id,
                recipient_name,
                pages,
            })
            .collect();

        ResolvedPlan { ranges, unmatched }
    }
}
