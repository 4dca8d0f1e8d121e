//! Keyword exception table
//!
//! Hand-curated corrections applied after automatic extraction. Rows are
//! `type,match[,replacement]` where type `m` is an exact match and `c` a
//! substring match. A rule without replacement drops the keyword.
//! Rules are tried in table order; the first match wins.

use std::io;
use std::path::Path;

use crate::logic::error::Result;

/// Built-in exception table
pub const DEFAULT_EXCEPTIONS: &str = include_str!("../../../data/exceptions.csv");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionRule {
    Exact {
        pattern: String,
        replacement: Option<String>,
    },
    Contains {
        pattern: String,
        replacement: Option<String>,
    },
}

/// Outcome of testing one rule against one keyword
enum RuleMatch {
    Skip,
    Drop,
    Replace(String),
}

impl ExceptionRule {
    fn check(&self, keyword: &str) -> RuleMatch {
        match self {
            ExceptionRule::Exact { pattern, replacement } if keyword == pattern.as_str() => match replacement {
                Some(r) => RuleMatch::Replace(r.clone()),
                None => RuleMatch::Drop,
            },
            ExceptionRule::Contains { pattern, replacement } if keyword.contains(pattern.as_str()) => {
                match replacement {
                    Some(r) => RuleMatch::Replace(keyword.replace(pattern.as_str(), r)),
                    None => RuleMatch::Drop,
                }
            }
            _ => RuleMatch::Skip,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExceptionTable {
    rules: Vec<ExceptionRule>,
}

impl ExceptionTable {
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut rules = Vec::new();
        for (line, row) in csv_reader.records().enumerate() {
            let row = row?;
            if let Some(rule) = parse_rule(&row, line + 1) {
                rules.push(rule);
            }
        }

        Ok(Self { rules })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        log::debug!("Loaded {} exception rules from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn with_defaults() -> Result<Self> {
        Self::from_reader(DEFAULT_EXCEPTIONS.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Normalize one keyword; `None` means it was dropped
    pub fn apply(&self, keyword: &str) -> Option<String> {
        let lowered = keyword.to_lowercase();

        for rule in &self.rules {
            match rule.check(&lowered) {
                RuleMatch::Skip => continue,
                RuleMatch::Drop => return None,
                RuleMatch::Replace(replaced) => {
                    let collapsed = collapse_spaces(&replaced);
                    return if collapsed.is_empty() { None } else { Some(collapsed) };
                }
            }
        }

        Some(lowered)
    }

    /// Normalize a keyword sequence, preserving order
    pub fn normalize<I, S>(&self, keywords: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keywords
            .into_iter()
            .filter_map(|k| self.apply(k.as_ref()))
            .collect()
    }
}

fn parse_rule(row: &csv::StringRecord, line: usize) -> Option<ExceptionRule> {
    if row.len() < 2 || row.len() > 3 {
        log::warn!("Exception table line {}: expected 2 or 3 columns, got {}", line, row.len());
        return None;
    }

    let pattern = row[1].to_lowercase();
    if pattern.is_empty() {
        log::warn!("Exception table line {}: empty match string", line);
        return None;
    }
    let replacement = row.get(2).map(str::to_lowercase);

    match row[0].to_lowercase().as_str() {
        "m" => Some(ExceptionRule::Exact { pattern, replacement }),
        "c" => Some(ExceptionRule::Contains { pattern, replacement }),
        other => {
            log::warn!("Exception table line {}: unknown rule type '{}'", line, other);
            None
        }
    }
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
