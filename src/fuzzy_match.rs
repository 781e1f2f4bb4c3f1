//! Fuzzy title matching module
//!
//! This module maps a free-text title scraped from the streaming site onto one
//! of several catalog candidates. Titles differ between the two sources by
//! punctuation, locale and transliteration, so candidates are scored by
//! approximate string similarity against every name variant they carry and
//! weak matches are rejected by a tunable threshold.

use strsim::normalized_levenshtein;
use thiserror::Error;

/// Default minimum similarity a candidate needs to be accepted (0.0-1.0)
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Errors that can occur while matching a title against candidates
#[derive(Debug, Error)]
pub enum MatchError {
    /// No candidate cleared the similarity threshold
    #[error("No catalog entry matches '{query}' (best score {best_score:.2}, threshold {threshold:.2})")]
    NotFound {
        query: String,
        best_score: f64,
        threshold: f64,
    },
}

/// Anything that can be matched by its set of name variants.
pub trait Keywords {
    /// All name variants of this candidate, in preference order
    fn keywords(&self) -> &[String];
}

/// Scores how similar a query is to a single keyword.
///
/// Implementations must return a value in `0.0..=1.0`, where `1.0` is a
/// perfect match, and must be deterministic.
pub trait Similarity: Send + Sync {
    /// Returns the similarity between `query` and `keyword`
    fn score(&self, query: &str, keyword: &str) -> f64;
}

/// Default similarity for anime titles
///
/// Both strings are normalized (lowercased, punctuation folded into spaces,
/// whitespace collapsed) and compared with normalized Levenshtein similarity.
/// When the two are of comparable length, the shorter one is also slid over
/// the longer one, so "One Piece Sub Indo" still lines up with "One Piece".
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleSimilarity;

/// Penalty applied to partial (windowed) matches so an exact full match
/// always ranks above a substring match
const PARTIAL_MATCH_WEIGHT: f64 = 0.95;

impl Similarity for TitleSimilarity {
    fn score(&self, query: &str, keyword: &str) -> f64 {
        let query = normalize_title(query);
        let keyword = normalize_title(keyword);

        if query.is_empty() || keyword.is_empty() {
            return 0.0;
        }

        let full = normalized_levenshtein(&query, &keyword);
        let partial = partial_similarity(&query, &keyword) * PARTIAL_MATCH_WEIGHT;

        full.max(partial)
    }
}

/// Best similarity of the shorter string against any equally long window of
/// the longer one
///
/// Only applies when the shorter string covers at least half of the longer
/// one; otherwise short synonyms like "K" would match nearly everything.
fn partial_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.len() * 2 < long.len() {
        return 0.0;
    }

    let short: String = short.iter().collect();

    long.windows(short.chars().count())
        .map(|window| normalized_levenshtein(&short, &window.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

/// Normalizes a title for comparison
///
/// Lowercases, replaces every non-alphanumeric character with a space and
/// collapses runs of whitespace. Non-latin scripts are kept as they are.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A candidate that cleared the threshold, with its score
#[derive(Debug, Clone, Copy)]
pub struct ScoredMatch<'a, T> {
    /// The winning candidate
    pub candidate: &'a T,
    /// Position of the candidate in the input slice
    pub index: usize,
    /// Best similarity across the candidate's keywords
    pub score: f64,
}

/// Resolves a free-text query to the best-matching candidate
#[derive(Debug, Clone)]
pub struct FuzzyResolver<S = TitleSimilarity> {
    similarity: S,
    threshold: f64,
}

impl Default for FuzzyResolver<TitleSimilarity> {
    fn default() -> Self {
        Self::new(TitleSimilarity, DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl FuzzyResolver<TitleSimilarity> {
    /// Creates a resolver using the default title similarity and the given threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(TitleSimilarity, threshold)
    }
}

impl<S: Similarity> FuzzyResolver<S> {
    /// Creates a resolver with a custom similarity function
    ///
    /// # Arguments
    ///
    /// * `similarity` - The scoring function applied to each keyword
    /// * `threshold` - Minimum similarity (0.0-1.0) a candidate needs; clamped into range
    pub fn new(similarity: S, threshold: f64) -> Self {
        Self {
            similarity,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Returns the configured rejection threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores a candidate as the best similarity across all its keywords
    pub fn score<T: Keywords>(&self, query: &str, candidate: &T) -> f64 {
        candidate
            .keywords()
            .iter()
            .map(|keyword| self.similarity.score(query, keyword))
            .fold(0.0, f64::max)
    }

    /// Returns the best-matching candidate for the query
    ///
    /// Candidates are ranked by score; on equal scores the one that comes
    /// first in `candidates` wins, so identical inputs always produce the same
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::NotFound` if `candidates` is empty or no candidate
    /// reaches the threshold.
    pub fn resolve<'a, T: Keywords>(
        &self,
        query: &str,
        candidates: &'a [T],
    ) -> Result<ScoredMatch<'a, T>, MatchError> {
        let mut best: Option<ScoredMatch<'a, T>> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let score = self.score(query, candidate);

            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(ScoredMatch {
                    candidate,
                    index,
                    score,
                });
            }
        }

        match best {
            Some(found) if found.score >= self.threshold => {
                tracing::debug!(query, index = found.index, score = found.score, "fuzzy match");
                Ok(found)
            }
            other => Err(MatchError::NotFound {
                query: query.to_string(),
                best_score: other.map_or(0.0, |m| m.score),
                threshold: self.threshold,
            }),
        }
    }
}
