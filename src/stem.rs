use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};

use crate::error::{BrainError, Result};

/// Snowball stemmer used to conflate reply pivots ("running" and "runs" both reach
/// tokens learned as "run").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stemmer {
    English,
}

impl Stemmer {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Stemmer::English),
            _ => Err(BrainError::UnknownStemmer {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stemmer::English => "english",
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            Stemmer::English => Algorithm::English,
        }
    }

    /// Stem of the lowercased `word`.
    pub fn stem(&self, word: &str) -> String {
        let word = word.to_lowercase();
        rust_stemmers::Stemmer::create(self.algorithm())
            .stem(&word)
            .into_owned()
    }
}
