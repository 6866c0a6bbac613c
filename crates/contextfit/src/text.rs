//! Text Segmentation Module
//!
//! Boundary detection shared by the chunker and the summarizer: paragraphs,
//! sentences, structural section headers, and word windows. Also hosts
//! keyword inference for keyword-focused summaries.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Blank-line paragraph separator
static PARAGRAPH_BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("Invalid paragraph regex"));

/// Terminal punctuation followed by whitespace
static SENTENCE_END_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("Invalid sentence regex"));

/// Markdown headers, numbered headings, and all-caps labels
static SECTION_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6}\s+.+|\d+\.?\s+.+|[A-Z][A-Z\s]+:)$").expect("Invalid header regex")
});

static KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]{4,}\b").expect("Invalid keyword regex"));

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
        "did", "will", "would", "could", "should", "may", "might", "can", "this", "that",
        "these", "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
        "them",
    ]
    .into_iter()
    .collect()
});

/// Split on blank lines, dropping empty blocks. Paragraphs are trimmed.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK_REGEX
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split into sentences at terminal punctuation followed by whitespace.
///
/// Punctuation stays attached to its sentence. Trailing text without
/// terminal punctuation forms the final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END_REGEX.find_iter(text) {
        let punct_end = m.start() + m.as_str().trim_end().len();
        if let Some(sentence) = text.get(start..punct_end) {
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
        }
        start = m.end();
    }

    if let Some(rest) = text.get(start..) {
        let rest = rest.trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }

    sentences
}

pub fn is_section_header(line: &str) -> bool {
    SECTION_HEADER_REGEX.is_match(line.trim())
}

/// Split into sections that each start at a header line.
///
/// Text before the first header forms its own section. Whitespace-only
/// sections are dropped.
pub fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_section_header(line) && !current.is_empty() {
            push_section(&mut sections, &current);
            current.clear();
        }
        current.push(line);
    }
    push_section(&mut sections, &current);

    sections
}

fn push_section(sections: &mut Vec<String>, lines: &[&str]) {
    let section = lines.join("\n");
    let section = section.trim();
    if !section.is_empty() {
        sections.push(section.to_string());
    }
}

pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn contains_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Infer topic keywords from `text`.
///
/// Lowercase alphabetic words of four or more letters, minus stopwords,
/// ranked by frequency with ties broken by first appearance.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for (position, m) in KEYWORD_REGEX.find_iter(&lower).enumerate() {
        let word = m.as_str();
        if STOPWORDS.contains(word) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(max_keywords)
        .map(|(word, _, _)| word.to_string())
        .collect()
}

/// Case-insensitive substring match against any keyword.
pub fn contains_any_keyword(sentence: &str, keywords: &[String]) -> bool {
    let lower = sentence.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| lower.contains(&k.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paragraphs() {
        let text = "First para.\nstill first.\n\n  \n\nSecond para.\n \nThird.";
        assert_eq!(
            split_paragraphs(text),
            vec!["First para.\nstill first.", "Second para.", "Third."]
        );
        assert!(split_paragraphs("  \n\n ").is_empty());
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let text = "One here. Two there!  Three?? Four without end";
        assert_eq!(
            split_sentences(text),
            vec!["One here.", "Two there!", "Three??", "Four without end"]
        );
    }

    #[test]
    fn test_split_sentences_no_split_inside_numbers() {
        assert_eq!(split_sentences("Version 3.5 shipped. Done."), vec!["Version 3.5 shipped.", "Done."]);
    }

    #[test]
    fn test_split_sentences_multibyte() {
        assert_eq!(split_sentences("Café ouvert. Très bien."), vec!["Café ouvert.", "Très bien."]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_section_headers() {
        assert!(is_section_header("# Title"));
        assert!(is_section_header("### Deep header"));
        assert!(is_section_header("2. Methods"));
        assert!(is_section_header("10 Results"));
        assert!(is_section_header("SUMMARY OF FINDINGS:"));
        assert!(!is_section_header("Regular sentence."));
        assert!(!is_section_header("#hashtag"));
    }

    #[test]
    fn test_split_sections() {
        let text = "Preamble text.\n# One\nBody one.\n\n# Two\nBody two.";
        let sections = split_sections(text);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], "Preamble text.");
        assert_eq!(sections[1], "# One\nBody one.");
        assert_eq!(sections[2], "# Two\nBody two.");
    }

    #[test]
    fn test_extract_keywords_ranking() {
        let text = "Database indexing matters. The database schema and indexing plan. Database!";
        let keywords = extract_keywords(text, 3);
        assert_eq!(keywords, vec!["database", "indexing", "matters"]);
    }

    #[test]
    fn test_extract_keywords_skips_short_words_and_cap() {
        let keywords = extract_keywords("cat dog were being them alpha beta gamma", 2);
        assert_eq!(keywords, vec!["alpha", "beta"]);
        assert!(extract_keywords("", 5).is_empty());
    }

    #[test]
    fn test_contains_any_keyword() {
        let keywords = vec!["Latency".to_string()];
        assert!(contains_any_keyword("p99 latency doubled", &keywords));
        assert!(!contains_any_keyword("throughput is fine", &keywords));
        assert!(!contains_any_keyword("anything", &[String::new()]));
    }
}
