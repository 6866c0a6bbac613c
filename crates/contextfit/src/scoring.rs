//! Sentence Scoring Module
//!
//! Pure heuristics used to rank sentences for extractive summaries and to
//! pick key points. Nothing here depends on a tokenizer.
//!
//! # Score Composition
//!
//! | Signal | Contribution |
//! |--------|--------------|
//! | Length | `min(chars / 100, 1.0)`, x1.5 for 50-200 chars |
//! | High-tier word | +3.0 each |
//! | Medium-tier word | +2.0 each |
//! | Structural word | +1.5 each |
//! | Context keyword | +5.0 each |
//! | Contains a digit | +1.0 |
//! | Ends with `?` | +2.0 |

use crate::text::{contains_digit, split_sentences, word_count};

pub const HIGH_IMPORTANCE_WORDS: &[&str] = &[
    "important",
    "critical",
    "essential",
    "key",
    "main",
    "primary",
    "significant",
    "major",
    "fundamental",
    "core",
    "vital",
    "crucial",
];

pub const MEDIUM_IMPORTANCE_WORDS: &[&str] = &[
    "notable",
    "relevant",
    "useful",
    "valuable",
    "interesting",
    "worth",
    "consider",
    "note",
    "observe",
    "mention",
];

pub const STRUCTURAL_WORDS: &[&str] = &[
    "first",
    "second",
    "third",
    "finally",
    "conclusion",
    "summary",
    "overview",
    "introduction",
    "background",
];

const HIGH_IMPORTANCE_WEIGHT: f64 = 3.0;
const MEDIUM_IMPORTANCE_WEIGHT: f64 = 2.0;
const STRUCTURAL_WEIGHT: f64 = 1.5;
const CONTEXT_KEYWORD_WEIGHT: f64 = 5.0;
const DIGIT_BONUS: f64 = 1.0;
const QUESTION_BONUS: f64 = 2.0;

/// Sentence length range (characters) that earns the length multiplier
const SWEET_SPOT_CHARS: std::ops::RangeInclusive<usize> = 50..=200;
const SWEET_SPOT_MULTIPLIER: f64 = 1.5;

/// Word limit for the short capitalized-statement key point rule
const SHORT_STATEMENT_WORDS: usize = 15;

fn tier_score(lower: &str, vocabulary: &[&str], weight: f64) -> f64 {
    vocabulary
        .iter()
        .filter(|word| lower.contains(**word))
        .count() as f64
        * weight
}

/// Importance score for one sentence. Deterministic and side-effect free.
pub fn score_sentence(sentence: &str, context_keywords: &[String]) -> f64 {
    let chars = sentence.chars().count();
    let lower = sentence.to_lowercase();

    let mut score = (chars as f64 / 100.0).min(1.0);
    if SWEET_SPOT_CHARS.contains(&chars) {
        score *= SWEET_SPOT_MULTIPLIER;
    }

    score += tier_score(&lower, HIGH_IMPORTANCE_WORDS, HIGH_IMPORTANCE_WEIGHT);
    score += tier_score(&lower, MEDIUM_IMPORTANCE_WORDS, MEDIUM_IMPORTANCE_WEIGHT);
    score += tier_score(&lower, STRUCTURAL_WORDS, STRUCTURAL_WEIGHT);

    score += context_keywords
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
        .count() as f64
        * CONTEXT_KEYWORD_WEIGHT;

    if contains_digit(sentence) {
        score += DIGIT_BONUS;
    }
    if sentence.trim_end().ends_with('?') {
        score += QUESTION_BONUS;
    }

    score
}

fn is_key_point(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    if HIGH_IMPORTANCE_WORDS.iter().any(|w| lower.contains(w)) {
        return true;
    }
    if sentence.trim_end().ends_with(':') {
        return true;
    }
    word_count(sentence) <= SHORT_STATEMENT_WORDS && sentence.chars().any(char::is_uppercase)
}

/// Salient sentences in document order, at most `max_points`.
///
/// Lines are split first so heading-like lines ending in `:` stand alone.
pub fn extract_key_points(content: &str, max_points: usize) -> Vec<String> {
    content
        .lines()
        .flat_map(split_sentences)
        .filter(|s| is_key_point(s))
        .take(max_points)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_component() {
        // 10 chars, outside the sweet spot
        assert!((score_sentence("abcdefghij", &[]) - 0.1).abs() < 1e-9);
        // 100 chars, inside the sweet spot
        let sentence = "a".repeat(100);
        assert!((score_sentence(&sentence, &[]) - 1.5).abs() < 1e-9);
        // very long sentences cap at 1.0 without the multiplier
        let long = "a".repeat(400);
        assert!((score_sentence(&long, &[]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_bonuses() {
        let base = score_sentence("plain words", &[]);
        assert!((score_sentence("plain critical", &[]) - score_sentence("plain abcdefgh", &[]) - 3.0).abs() < 1e-9);
        assert!(score_sentence("a useful note", &[]) > base);
        assert!(score_sentence("finally done", &[]) > score_sentence("finalxy done", &[]));
    }

    #[test]
    fn test_context_keywords_dominate_vocabulary() {
        let keywords = vec!["latency".to_string()];
        let with_keyword = score_sentence("the latency rose", &keywords);
        let with_high = score_sentence("the critical rose", &keywords);
        assert!(with_keyword > with_high);
    }

    #[test]
    fn test_digit_and_question_bonus() {
        let plain = score_sentence("abcd", &[]);
        assert!((score_sentence("abc1", &[]) - plain - 1.0).abs() < 1e-9);
        assert!((score_sentence("abc?", &[]) - plain - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_deterministic() {
        let keywords = vec!["cache".to_string()];
        let sentence = "The main cache is important in 2024?";
        assert_eq!(score_sentence(sentence, &keywords), score_sentence(sentence, &keywords));
    }

    #[test]
    fn test_key_point_rules() {
        let content = "this is a critical finding.\n\
                       the following items are listed:\n\
                       Alice joined the team. \
                       this lowercase sentence has no signal at all in it.";
        let points = extract_key_points(content, 10);
        assert_eq!(
            points,
            vec![
                "this is a critical finding.",
                "the following items are listed:",
                "Alice joined the team."
            ]
        );
    }

    #[test]
    fn test_key_point_cap() {
        let content = "Key point here. ".repeat(30);
        assert_eq!(extract_key_points(&content, 10).len(), 10);
        assert!(extract_key_points("", 10).is_empty());
    }
}
