//! Text tokenizers. Both emit a single `" "` token wherever whitespace separates two
//! other tokens; the learner treats that token as the space marker.

use regex::Regex;

use crate::error::{BrainError, Result};

pub const SPACE: &str = " ";

pub trait Tokenizer {
    /// Name stored in the brain's `tokenizer` info key.
    fn name(&self) -> &'static str;

    fn split(&self, text: &str) -> Vec<String>;
}

/// Case-preserving tokenizer: URLs, words (with apostrophes and hyphens), runs of
/// punctuation, and whitespace collapsed to one space token.
pub struct CobeTokenizer {
    pattern: Regex,
}

impl CobeTokenizer {
    pub fn new() -> Self {
        let pattern = Regex::new(r"\w+:\S+|[\w'-]+|[^\w\s][^\w]*[^\w\s]|[^\w\s]|\s+")
            .expect("cobe token pattern is valid");
        Self { pattern }
    }
}

impl Default for CobeTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for CobeTokenizer {
    fn name(&self) -> &'static str {
        "Cobe"
    }

    fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        self.pattern
            .find_iter(text)
            .map(|m| {
                let token = m.as_str();
                if token.chars().all(char::is_whitespace) {
                    SPACE.to_string()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }
}

/// MegaHAL-compatible tokenizer: uppercases input and alternates between word and
/// non-word runs. Input that doesn't end in `.`, `!` or `?` gets a trailing `.`.
pub struct MegaHalTokenizer {
    pattern: Regex,
}

impl MegaHalTokenizer {
    pub fn new() -> Self {
        let pattern =
            Regex::new(r"[A-Z0-9']+|[^A-Z0-9']+").expect("megahal token pattern is valid");
        Self { pattern }
    }
}

impl Default for MegaHalTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for MegaHalTokenizer {
    fn name(&self) -> &'static str {
        "MegaHAL"
    }

    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut phrase = text.to_uppercase();
        if !phrase.ends_with(['.', '!', '?']) {
            phrase.push('.');
        }

        self.pattern
            .find_iter(&phrase)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Resolve a tokenizer from the name stored in brain metadata (case-insensitive).
pub fn tokenizer_by_name(name: &str) -> Result<Box<dyn Tokenizer>> {
    match name.to_ascii_lowercase().as_str() {
        "cobe" => Ok(Box::new(CobeTokenizer::new())),
        "megahal" => Ok(Box::new(MegaHalTokenizer::new())),
        _ => Err(BrainError::UnknownTokenizer {
            name: name.to_string(),
        }),
    }
}

/// Whether a token carries at least one word character.
pub fn is_word_token(token: &str) -> bool {
    token.chars().any(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cobe_splits_words_and_spaces() {
        let tok = CobeTokenizer::new();
        assert_eq!(
            tok.split("this is a test"),
            vec!["this", " ", "is", " ", "a", " ", "test"]
        );
    }

    #[test]
    fn cobe_collapses_whitespace_and_trims() {
        let tok = CobeTokenizer::new();
        assert_eq!(tok.split("  hello \t\n world  "), vec!["hello", " ", "world"]);
        assert!(tok.split("   ").is_empty());
        assert!(tok.split("").is_empty());
    }

    #[test]
    fn cobe_keeps_urls_and_punctuation_runs() {
        let tok = CobeTokenizer::new();
        assert_eq!(
            tok.split("see http://example.com/a?b now?!"),
            vec!["see", " ", "http://example.com/a?b", " ", "now", "?!"]
        );
        assert_eq!(tok.split("don't stop-now."), vec!["don't", " ", "stop-now", "."]);
    }

    #[test]
    fn megahal_uppercases_and_terminates() {
        let tok = MegaHalTokenizer::new();
        assert_eq!(tok.split("hello world"), vec!["HELLO", " ", "WORLD", "."]);
        assert_eq!(tok.split("hi, you!"), vec!["HI", ", ", "YOU", "!"]);
    }

    #[test]
    fn lookup_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(tokenizer_by_name("COBE").map(|t| t.name()).ok(), Some("Cobe"));
        assert_eq!(tokenizer_by_name("megahal").map(|t| t.name()).ok(), Some("MegaHAL"));
        assert!(matches!(
            tokenizer_by_name("nope"),
            Err(BrainError::UnknownTokenizer { .. })
        ));
    }

    #[test]
    fn word_tokens() {
        assert!(is_word_token("cobe"));
        assert!(is_word_token("it's"));
        assert!(!is_word_token("?!"));
        assert!(!is_word_token(" "));
    }
}
