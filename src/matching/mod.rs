/*!
 * Recipient name matching.
 *
 * Strategies run in a fixed precedence order over each page's extracted text:
 * exact normalized containment first, then token-window proximity, then the
 * opt-in synonym expansion. A strategy that produces a high-confidence hit
 * stops the pipeline, but every hit found by that strategy is kept so that
 * two recipients matching the same page equally stay visible as a tie.
 */

pub mod fuzzy;
pub mod normalize;
pub mod resolver;
pub mod synonyms;

use log::debug;
use std::cmp::Ordering;
use std::fmt;

use crate::app_config::MatchingConfig;
use crate::registry::RegistrySnapshot;
use normalize::{normalize, tokenize};
use synonyms::SynonymDictionary;

/// Score gap below which two results count as tied
pub const SCORE_EPSILON: f32 = 1e-6;

/// How a match was found, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStrategy {
    /// Normalized full-name substring containment
    Exact,
    /// Token-window edit-distance similarity
    Proximity,
    /// Proximity over synonym-expanded name variants
    Synonym,
}

impl MatchStrategy {
    /// Short name for logs and audit lines
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Proximity => "proximity",
            MatchStrategy::Synonym => "synonym",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recipient hit on a page
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Registry id of the matched recipient
    pub recipient_id: i64,
    /// Display name of the matched recipient
    pub recipient_name: String,
    /// Strategy that produced the hit
    pub strategy: MatchStrategy,
    /// Similarity score in 0.0..=1.0
    pub score: f32,
    /// The normalized page text the name matched against
    pub matched_text: String,
}

/// All hits for one page, ranked by strategy precedence then score
#[derive(Debug, Clone)]
pub struct PageMatches {
    /// Zero-based page index
    pub page_index: usize,
    /// Ranked results, best first
    pub results: Vec<MatchResult>,
    /// Best candidate that stayed below its threshold, kept for audit context
    pub best_rejected: Option<(String, f32)>,
}

impl PageMatches {
    /// Build a ranked result set
    pub fn new(
        page_index: usize,
        mut results: Vec<MatchResult>,
        best_rejected: Option<(String, f32)>,
    ) -> Self {
        results.sort_by(|a, b| {
            a.strategy
                .cmp(&b.strategy)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        });
        PageMatches {
            page_index,
            results,
            best_rejected,
        }
    }

    /// The best-ranked result, if any
    pub fn top(&self) -> Option<&MatchResult> {
        self.results.first()
    }

    /// Distinct recipients tied for first place
    // @returns: more than one entry only when the leading strategy scored
    // two different recipients within SCORE_EPSILON of each other
    pub fn tied_leaders(&self) -> Vec<&MatchResult> {
        let Some(top) = self.results.first() else {
            return Vec::new();
        };

        let mut leaders: Vec<&MatchResult> = vec![top];
        for result in &self.results[1..] {
            if result.strategy != top.strategy {
                break;
            }
            if (top.score - result.score).abs() > SCORE_EPSILON {
                break;
            }
            if leaders.iter().all(|l| l.recipient_id != result.recipient_id) {
                leaders.push(result);
            }
        }
        leaders
    }

    /// Whether the page cannot be assigned to a single recipient
    pub fn is_ambiguous(&self) -> bool {
        self.tied_leaders().len() > 1
    }
}

// Precomputed matching material for one registry recipient
#[derive(Debug, Clone)]
struct CandidateName {
    recipient_id: i64,
    display_name: String,
    normalized: String,
    proximity_variants: Vec<Vec<String>>,
    synonym_variants: Vec<Vec<String>>,
}

/// Matches page text against an immutable registry snapshot
#[derive(Debug, Clone)]
pub struct NameMatcher {
    config: MatchingConfig,
    candidates: Vec<CandidateName>,
}

impl NameMatcher {
    /// Build a matcher over the active recipients of a snapshot
    pub fn new(
        snapshot: &RegistrySnapshot,
        config: MatchingConfig,
        dictionary: SynonymDictionary,
    ) -> Self {
        let mut candidates = Vec::new();

        for recipient in snapshot.active() {
            let normalized = normalize(&recipient.name);
            if normalized.is_empty() {
                continue;
            }
            let tokens = tokenize(&recipient.name);

            let mut proximity_variants = vec![tokens.clone()];
            if tokens.len() >= 3 {
                // middle names are the usual casualty of degraded scans
                let first_last = vec![tokens[0].clone(), tokens[tokens.len() - 1].clone()];
                proximity_variants.push(first_last);
            }

            let mut synonym_variants = Vec::new();
            if config.enable_synonyms {
                synonym_variants.extend(dictionary.expand(&tokens));
                for alias in &recipient.aliases {
                    let alias_tokens = tokenize(alias);
                    if !alias_tokens.is_empty() {
                        synonym_variants.push(alias_tokens);
                    }
                }
            }

            candidates.push(CandidateName {
                recipient_id: recipient.id,
                display_name: recipient.name.clone(),
                normalized,
                proximity_variants,
                synonym_variants,
            });
        }

        NameMatcher { config, candidates }
    }

    /// Number of recipients the matcher scans for
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Match one page of extracted text against every candidate
    pub fn match_page(&self, page_index: usize, text: &str) -> PageMatches {
        let normalized_page = normalize(text);
        if normalized_page.is_empty() {
            return PageMatches::new(page_index, Vec::new(), None);
        }

        let mut results: Vec<MatchResult> = Vec::new();
        let mut best_rejected: Option<(String, f32)> = None;

        // exact containment
        for candidate in &self.candidates {
            if normalized_page.contains(&candidate.normalized) {
                results.push(MatchResult {
                    recipient_id: candidate.recipient_id,
                    recipient_name: candidate.display_name.clone(),
                    strategy: MatchStrategy::Exact,
                    score: 1.0,
                    matched_text: candidate.normalized.clone(),
                });
            }
        }

        let page_tokens: Vec<String> = normalized_page
            .split_whitespace()
            .map(|t| t.to_string())
            .collect();

        if !self.reached_high_confidence(&results) && self.config.enable_proximity {
            for candidate in &self.candidates {
                let (score, window) =
                    Self::best_variant(&page_tokens, &candidate.proximity_variants);
                if score >= self.config.proximity_threshold {
                    results.push(MatchResult {
                        recipient_id: candidate.recipient_id,
                        recipient_name: candidate.display_name.clone(),
                        strategy: MatchStrategy::Proximity,
                        score,
                        matched_text: window,
                    });
                } else {
                    Self::note_rejected(&mut best_rejected, &candidate.display_name, score);
                }
            }
        }

        if !self.reached_high_confidence(&results) && self.config.enable_synonyms {
            for candidate in &self.candidates {
                if candidate.synonym_variants.is_empty() {
                    continue;
                }
                let (score, window) =
                    Self::best_variant(&page_tokens, &candidate.synonym_variants);
                if score >= self.config.synonym_threshold {
                    debug!(
                        "Synonym match for '{}' on page {} (score {:.2})",
                        candidate.display_name, page_index, score
                    );
                    results.push(MatchResult {
                        recipient_id: candidate.recipient_id,
                        recipient_name: candidate.display_name.clone(),
                        strategy: MatchStrategy::Synonym,
                        score,
                        matched_text: window,
                    });
                } else {
                    Self::note_rejected(&mut best_rejected, &candidate.display_name, score);
                }
            }
        }

        PageMatches::new(page_index, results, best_rejected)
    }

    fn reached_high_confidence(&self, results: &[MatchResult]) -> bool {
        results
            .iter()
            .any(|r| r.score >= self.config.high_confidence_threshold)
    }

    fn best_variant(page_tokens: &[String], variants: &[Vec<String>]) -> (f32, String) {
        let mut best_score = 0.0f32;
        let mut best_text = String::new();
        for variant in variants {
            let (score, window) = fuzzy::best_window(page_tokens, variant);
            if score > best_score {
                best_score = score;
                best_text = window;
                if best_score >= 1.0 {
                    break;
                }
            }
        }
        (best_score, best_text)
    }

    fn note_rejected(best_rejected: &mut Option<(String, f32)>, name: &str, score: f32) {
        if score <= 0.0 {
            return;
        }
        let replace = match best_rejected {
            Some((_, existing)) => score > *existing,
            None => true,
        };
        if replace {
            *best_rejected = Some((name.to_string(), score));
        }
    }
}
