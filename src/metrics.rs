//! Automatic text metrics for candidate summaries.
//!
//! - overlap: ROUGE-L F-measure over stemmed lowercase tokens
//! - word count: number of `\w+` runs, so punctuation never glues words together
//! - readability: Flesch reading ease over sentence/word/syllable counts

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("Invalid word regex"));

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid token separator regex"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("Invalid sentence end regex"));

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

/// Tokens of this length or shorter are compared unstemmed.
const MIN_STEM_LEN: usize = 3;

/// Scores for one candidate against its reference.
///
/// Serialized with the short keys used in result logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextScores {
    /// ROUGE-L F-measure in [0, 1].
    #[serde(rename = "rouge_l_f")]
    pub overlap_f: f64,
    #[serde(rename = "words")]
    pub word_count: usize,
    /// Flesch reading ease; higher reads easier, can be negative.
    #[serde(rename = "flesch")]
    pub readability: f64,
}

/// Score `candidate` against `reference`.
pub fn score(reference: &str, candidate: &str) -> TextScores {
    TextScores {
        overlap_f: rouge_l_f(reference, candidate),
        word_count: word_count(candidate),
        readability: flesch_reading_ease(candidate),
    }
}

/// Count maximal `\w+` runs ("hi, there!" has 2 words).
pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count()
}

// =============================================================================
// ROUGE-L
// =============================================================================

fn rouge_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_ALNUM
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(|tok| {
            if tok.len() > MIN_STEM_LEN {
                STEMMER.stem(tok).into_owned()
            } else {
                tok.to_string()
            }
        })
        .collect()
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Single rolling row over `b`.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// ROUGE-L F-measure between reference and candidate.
pub fn rouge_l_f(reference: &str, candidate: &str) -> f64 {
    let ref_tokens = rouge_tokens(reference);
    let cand_tokens = rouge_tokens(candidate);
    if ref_tokens.is_empty() || cand_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_len(&ref_tokens, &cand_tokens) as f64;
    let precision = lcs / cand_tokens.len() as f64;
    let recall = lcs / ref_tokens.len() as f64;
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

// =============================================================================
// Readability
// =============================================================================

fn sentence_count(text: &str) -> usize {
    let count = SENTENCE_END
        .split(text)
        .filter(|segment| WORD.is_match(segment))
        .count();
    count.max(1)
}

/// Vowel-group heuristic with silent trailing `e`; every word has at least one.
pub fn syllable_count(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut groups = 0usize;
    let mut in_vowel = false;
    for c in lower.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !in_vowel {
            groups += 1;
        }
        in_vowel = vowel;
    }
    if groups > 1 && lower.ends_with('e') && !lower.ends_with("le") && !lower.ends_with("ee") {
        groups -= 1;
    }
    groups.max(1)
}

/// Flesch reading ease, rounded to two decimals. Text without words scores 0.
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return 0.0;
    }
    let n_words = words.len() as f64;
    let n_sentences = sentence_count(text) as f64;
    let n_syllables: usize = words.iter().map(|w| syllable_count(w)).sum();

    let score = 206.835 - 1.015 * (n_words / n_sentences) - 84.6 * (n_syllables as f64 / n_words);
    (score * 100.0).round() / 100.0
}
