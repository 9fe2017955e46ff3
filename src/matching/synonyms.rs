/*!
 * Synonym dictionary for the opt-in alias strategy.
 *
 * Holds groups of interchangeable name tokens, typically nicknames, loaded
 * from a JSON array of arrays such as `[["robert", "bob"], ["william", "bill"]]`.
 * Expansion rewrites a name's tokens through their groups so "Bob Johnson" can
 * stand in for a registered "Robert Johnson".
 */

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::normalize::normalize;

// Expansion is combinatorial across tokens, so cap the variants per name
const MAX_VARIANTS: usize = 32;

/// Groups of interchangeable name tokens
#[derive(Debug, Clone, Default)]
pub struct SynonymDictionary {
    groups: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl SynonymDictionary {
    /// Empty dictionary, expands nothing
    pub fn new() -> Self {
        SynonymDictionary::default()
    }

    /// Build a dictionary from token groups, normalizing every entry
    pub fn from_groups<S: AsRef<str>>(groups: &[Vec<S>]) -> Self {
        let mut dictionary = SynonymDictionary::new();
        for group in groups {
            let tokens: Vec<&str> = group.iter().map(|t| t.as_ref()).collect();
            dictionary.add_group(&tokens);
        }
        dictionary
    }

    /// Load a dictionary from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open synonym dictionary: {:?}", path))?;
        let reader = BufReader::new(file);
        let groups: Vec<Vec<String>> = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse synonym dictionary: {:?}", path))?;

        let borrowed: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.iter().map(|t| t.as_str()).collect())
            .collect();
        Ok(Self::from_groups(&borrowed))
    }

    /// Add one group of interchangeable tokens
    pub fn add_group(&mut self, tokens: &[&str]) {
        let normalized: Vec<String> = tokens
            .iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .collect();
        if normalized.len() < 2 {
            return;
        }

        let group_index = self.groups.len();
        for token in &normalized {
            self.index.entry(token.clone()).or_insert(group_index);
        }
        self.groups.push(normalized);
    }

    /// Group members interchangeable with a token, excluding the token itself
    pub fn alternatives(&self, token: &str) -> Vec<&str> {
        match self.index.get(token) {
            Some(&group_index) => self.groups[group_index]
                .iter()
                .filter(|t| t.as_str() != token)
                .map(|t| t.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Rewrite a token sequence through the dictionary
    // @returns: variants with at least one token substituted, never the input itself
    pub fn expand(&self, tokens: &[String]) -> Vec<Vec<String>> {
        let mut variants: Vec<Vec<String>> = vec![tokens.to_vec()];

        for (position, token) in tokens.iter().enumerate() {
            let alternatives = self.alternatives(token);
            if alternatives.is_empty() {
                continue;
            }

            let mut substituted = Vec::new();
            for variant in &variants {
                for alternative in &alternatives {
                    let mut next = variant.clone();
                    next[position] = (*alternative).to_string();
                    substituted.push(next);
                    if variants.len() + substituted.len() > MAX_VARIANTS {
                        break;
                    }
                }
            }
            variants.extend(substituted);
            if variants.len() > MAX_VARIANTS {
                variants.truncate(MAX_VARIANTS);
                break;
            }
        }

        // index 0 is the unmodified input
        variants.remove(0);
        variants
    }

    /// Number of groups in the dictionary
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the dictionary has no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
