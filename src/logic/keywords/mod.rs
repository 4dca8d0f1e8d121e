//! Keywords Module - Description keyword extraction
//!
//! Two stages: RAKE scoring picks salient multi-word phrases from free text,
//! then the exception table drops or rewrites domain noise.

pub mod exceptions;
pub mod rake;


use exceptions::ExceptionTable;
use rake::Rake;

use std::path::Path;

use crate::logic::config::PipelineConfig;
use crate::logic::error::Result;

/// Phrases must score strictly above this to be kept
pub const MIN_PHRASE_SCORE: f64 = 1.0;

pub const STOPWORDS_FILE: &str = "stopwords.txt";
pub const EXCEPTIONS_FILE: &str = "exceptions.csv";

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    rake: Rake,
    exceptions: ExceptionTable,
}

impl KeywordExtractor {
    pub fn new(rake: Rake, exceptions: ExceptionTable) -> Self {
        Self { rake, exceptions }
    }

    /// Built-in stopwords and exception table
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Rake::with_defaults(), ExceptionTable::with_defaults()?))
    }

    /// Load `stopwords.txt` and `exceptions.csv` from a directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let rake = Rake::from_path(&dir.join(STOPWORDS_FILE))?;
        let exceptions = ExceptionTable::from_path(&dir.join(EXCEPTIONS_FILE))?;
        Ok(Self::new(rake, exceptions))
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => {
                log::info!("Using keyword data from {}", dir.display());
                Self::from_dir(dir)
            }
            None => Self::with_defaults(),
        }
    }

    /// Extract normalized keywords from a description, highest scoring first
    pub fn extract(&self, text: &str) -> Vec<String> {
        let phrases = self
            .rake
            .run(text)
            .into_iter()
            .filter(|(_, score)| *score > MIN_PHRASE_SCORE)
            .map(|(phrase, _)| phrase);

        self.exceptions.normalize(phrases)
    }
}
