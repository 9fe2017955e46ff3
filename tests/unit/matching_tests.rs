/*!
 * Tests for recipient name matching
 */

use anyhow::Result;
use rand::seq::SliceRandom;
use paysplit::app_config::MatchingConfig;
use paysplit::matching::fuzzy;
use paysplit::matching::normalize::{normalize, tokenize};
use paysplit::matching::synonyms::SynonymDictionary;
use paysplit::matching::{MatchStrategy, NameMatcher};
use paysplit::registry::{RecipientRecord, RegistrySnapshot};
use crate::common;

fn default_matcher(names: &[&str]) -> NameMatcher {
    let snapshot = RegistrySnapshot::from_names(names);
    NameMatcher::new(&snapshot, MatchingConfig::default(), SynonymDictionary::new())
}

/// Test that normalization folds a formatted paystub line completely
#[test]
fn test_normalize_withFormattedPaystubLine_shouldFoldEverything() {
    assert_eq!(
        normalize("Nome:  JOSÉ  DA  CONCEIÇÃO-NETO"),
        "nome jose da conceicao neto"
    );
}

/// Test that tokenization splits on every separator class
#[test]
fn test_tokenize_withSeparators_shouldSplitIntoNormalizedTokens() {
    assert_eq!(
        tokenize("Silva, Maria (Depto. RH)"),
        vec!["silva", "maria", "depto", "rh"]
    );
}

/// Test similarity on the kind of single-letter damage OCR produces
#[test]
fn test_similarity_withOcrStyleTypo_shouldStayHigh() {
    // 'l' read for 'i' is a classic raster confusion
    let score = fuzzy::similarity("marla silva", "maria silva");
    assert!(score > 0.85 && score < 1.0, "score was {}", score);
}

/// Test that strategy ordering follows precedence
#[test]
fn test_matchStrategy_ordering_shouldFollowPrecedence() {
    assert!(MatchStrategy::Exact < MatchStrategy::Proximity);
    assert!(MatchStrategy::Proximity < MatchStrategy::Synonym);
}

/// Test that the right recipient wins among many candidates
#[test]
fn test_matchPage_withManyCandidates_shouldFindTheNamedOne() {
    let matcher = default_matcher(&[
        "Maria Silva",
        "Joao Souza",
        "Ana Beatriz Costa",
        "Carlos Pereira",
        "Beatriz Ramos",
        "Paulo Henrique Dias",
    ]);

    let matches = matcher.match_page(0, "Holerite mensal de CARLOS PEREIRA, competencia junho");

    let top = matches.top().unwrap();
    assert_eq!(top.recipient_name, "Carlos Pereira");
    assert_eq!(top.strategy, MatchStrategy::Exact);
    assert!(!matches.is_ambiguous());
}

/// Test that a high-confidence exact hit stops the strategy pipeline
#[test]
fn test_matchPage_withExactHit_shouldNotRunProximity() {
    let matcher = default_matcher(&["Ana Silva", "Ana Silveira"]);

    let matches = matcher.match_page(0, "Pagamento para Ana Silva, junho de 2025");

    // only the exact hit, no proximity results for the near-by surname
    assert_eq!(matches.results.len(), 1);
    assert_eq!(matches.results[0].strategy, MatchStrategy::Exact);
    assert_eq!(matches.results[0].recipient_name, "Ana Silva");
}

/// Test proximity recovery from OCR-damaged page text
#[test]
fn test_matchPage_withDamagedName_shouldRecoverViaProximity() {
    let matcher = default_matcher(&["Maria Silva", "Joao Souza"]);

    let matches = matcher.match_page(0, "Recibo de pagamento MARlA SILVA competencia junho");

    let top = matches.top().unwrap();
    assert_eq!(top.strategy, MatchStrategy::Proximity);
    assert_eq!(top.recipient_name, "Maria Silva");
    assert!(top.score >= 0.85, "score was {}", top.score);
}

/// Test that a registry alias matches through the synonym strategy
#[test]
fn test_matchPage_withRegistryAlias_shouldMatchViaSynonym() {
    let mut record = RecipientRecord::named(1, "Jose Carlos Almeida");
    record.aliases.push("Ze Carlos".to_string());
    let snapshot = RegistrySnapshot::new(vec![record]);

    let config = MatchingConfig {
        enable_synonyms: true,
        ..MatchingConfig::default()
    };
    let matcher = NameMatcher::new(&snapshot, config, SynonymDictionary::new());

    let matches = matcher.match_page(0, "Holerite de Ze Carlos referente a junho");

    let top = matches.top().unwrap();
    assert_eq!(top.strategy, MatchStrategy::Synonym);
    assert_eq!(top.recipient_name, "Jose Carlos Almeida");
}

/// Test that aliases stay inert while the synonym strategy is disabled
#[test]
fn test_matchPage_withRegistryAliasAndSynonymsOff_shouldNotMatch() {
    let mut record = RecipientRecord::named(1, "Jose Carlos Almeida");
    record.aliases.push("Ze Carlos".to_string());
    let snapshot = RegistrySnapshot::new(vec![record]);

    let matcher = NameMatcher::new(
        &snapshot,
        MatchingConfig::default(),
        SynonymDictionary::new(),
    );

    let matches = matcher.match_page(0, "Holerite de Ze Carlos referente a junho");
    assert!(matches.results.is_empty());
}

/// Test loading a synonym dictionary from its JSON file format
#[test]
fn test_synonymDictionary_load_withJsonFile_shouldBuildGroups() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "synonyms.json",
        r#"[["robert", "bob"], ["jose", "ze", "zeca"]]"#,
    )?;

    let dictionary = SynonymDictionary::load(&path)?;
    assert_eq!(dictionary.len(), 2);

    let mut alts = dictionary.alternatives("ze");
    alts.sort();
    assert_eq!(alts, vec!["jose", "zeca"]);

    Ok(())
}

/// Test that a malformed synonym file is rejected
#[test]
fn test_synonymDictionary_load_withMalformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "synonyms.json",
        r#"{"robert": "bob"}"#,
    )?;

    assert!(SynonymDictionary::load(&path).is_err());

    Ok(())
}

/// Test that registry ordering does not change which recipient wins
#[test]
fn test_matchPage_withShuffledRegistry_shouldPickSameRecipient() {
    let mut names = vec![
        "Maria Silva",
        "Joao Souza",
        "Ana Beatriz Costa",
        "Carlos Pereira",
        "Beatriz Ramos",
        "Paulo Henrique Dias",
        "Fernanda Lima",
        "Ricardo Alves",
    ];
    let page_text = "Comprovante de pagamento de Ana Beatriz Costa, junho 2025";

    let baseline = default_matcher(&names);
    let expected = baseline.match_page(0, page_text).top().unwrap().recipient_name.clone();

    let mut rng = rand::rng();
    for _ in 0..5 {
        names.shuffle(&mut rng);
        let matcher = default_matcher(&names);
        let matches = matcher.match_page(0, page_text);
        assert_eq!(matches.top().unwrap().recipient_name, expected);
        assert!(!matches.is_ambiguous());
    }
}
