//! RAKE keyword scoring
//!
//! Rapid Automatic Keyword Extraction: candidate phrases are runs of words
//! between punctuation and stopwords. Each word scores degree/frequency over
//! all candidate occurrences; a phrase scores the sum of its words.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::logic::error::Result;

static SENTENCE_DELIMITERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\[\]\n.!?,;:\t\-"()'\u{2019}\u{2013}]"#).expect("valid sentence pattern")
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_+/]+").expect("valid word pattern"));

/// Built-in stopword list
pub const DEFAULT_STOPWORDS: &str = include_str!("../../../data/stopwords.txt");

#[derive(Debug, Clone)]
pub struct Rake {
    stopwords: HashSet<String>,
}

impl Rake {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a plain stopword list: one word per line, `#` starts a comment line
    pub fn from_list(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let rake = Self::from_list(&text);
        log::debug!("Loaded {} stopwords from {}", rake.len(), path.display());
        Ok(rake)
    }

    pub fn with_defaults() -> Self {
        Self::from_list(DEFAULT_STOPWORDS)
    }

    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    /// Score every distinct candidate phrase, highest first.
    /// Ties keep first-appearance order.
    pub fn run(&self, text: &str) -> Vec<(String, f64)> {
        let phrases = self.candidate_phrases(text);
        let scores = word_scores(&phrases);

        let mut seen = HashSet::new();
        let mut ranked: Vec<(String, f64)> = Vec::new();
        for phrase in &phrases {
            let joined = phrase.join(" ");
            if !seen.insert(joined.clone()) {
                continue;
            }
            let score = phrase
                .iter()
                .filter_map(|w| scores.get(w.as_str()))
                .sum::<f64>();
            ranked.push((joined, score));
        }

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Candidate phrases (lower-cased words), in text order, duplicates kept
    fn candidate_phrases(&self, text: &str) -> Vec<Vec<String>> {
        let mut phrases = Vec::new();

        for sentence in SENTENCE_DELIMITERS.split(text) {
            let mut current: Vec<String> = Vec::new();
            for word in WORD.find_iter(sentence) {
                let word = word.as_str().to_lowercase();
                if self.stopwords.contains(&word) {
                    if !current.is_empty() {
                        phrases.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(word);
                }
            }
            if !current.is_empty() {
                phrases.push(current);
            }
        }

        phrases
    }
}

/// Degree/frequency score per word; numeric tokens are not scored
fn word_scores(phrases: &[Vec<String>]) -> HashMap<&str, f64> {
    let mut frequency: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();

    for phrase in phrases {
        let scored: Vec<&str> = phrase
            .iter()
            .map(String::as_str)
            .filter(|w| w.parse::<f64>().is_err())
            .collect();
        let phrase_degree = scored.len().saturating_sub(1) as f64;

        for word in scored {
            *frequency.entry(word).or_insert(0.0) += 1.0;
            *degree.entry(word).or_insert(0.0) += phrase_degree;
        }
    }

    frequency
        .iter()
        .map(|(word, freq)| {
            let deg = degree.get(word).copied().unwrap_or(0.0) + freq;
            (*word, deg / freq)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rake() -> Rake {
        Rake::new(["a", "the", "in", "of", "allows", "to", "via", "and"])
    }

    #[test]
    fn test_candidate_phrases_split_on_stopwords_and_punctuation() {
        let phrases = rake().candidate_phrases("Buffer overflow in the image parser allows code execution.");
        let joined: Vec<String> = phrases.iter().map(|p| p.join(" ")).collect();
        assert_eq!(joined, vec!["buffer overflow", "image parser", "code execution"]);
    }

    #[test]
    fn test_single_words_score_one() {
        let ranked = rake().run("Overflow in the parser.");
        assert!(ranked.iter().all(|(_, score)| (*score - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_multi_word_phrases_rank_first() {
        let ranked = rake().run("Heap based buffer overflow in parser; parser crash.");
        assert_eq!(ranked[0].0, "heap based buffer overflow");
        assert!((ranked[0].1 - 16.0).abs() < 1e-9);
        // "parser crash": parser (deg 1+2=3, freq 2 -> 1.5) + crash (2)
        let parser_crash = ranked.iter().find(|(p, _)| p == "parser crash").unwrap();
        assert!((parser_crash.1 - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_phrases_reported_once() {
        let ranked = rake().run("remote code execution. remote code execution.");
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_numbers_are_kept_in_phrases_but_unscored() {
        let ranked = rake().run("Apache Struts 2 remote code");
        assert_eq!(ranked[0].0, "apache struts 2 remote code");
    }

    #[test]
    fn test_default_stopwords_loaded() {
        let rake = Rake::with_defaults();
        assert!(rake.len() > 100);
        assert!(rake.stopwords.contains("the"));
        assert!(!rake.stopwords.contains("overflow"));
    }
}
