//! Free-text normalization into index terms.
//!
//! Lowercases, blanks out everything that is not a word character or
//! whitespace, splits on whitespace, and drops short tokens and stop words.
//! No stemming: partial matches are handled by the scorer's prefix rule.

/// Tokens of this many bytes or fewer are discarded.
const MIN_TOKEN_LEN: usize = 2;

/// Common English function words that carry no retrieval signal.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "been", "were", "being", "his", "him", "she", "they",
    "them", "their", "theirs", "there", "then", "than", "that", "this", "these", "those", "what",
    "which", "who", "whom", "whose", "when", "where", "why", "how", "with", "within", "without",
    "from", "into", "onto", "upon", "about", "above", "below", "over", "under", "again",
    "further", "once", "here", "each", "both", "few", "more", "most", "other", "some", "such",
    "only", "own", "same", "too", "very", "just", "also", "will", "would", "should", "could",
    "shall", "may", "might", "must", "does", "did", "doing", "your", "yours", "its", "ours",
    "myself", "yourself", "itself",
];

/// Split `text` into normalized, meaningful terms.
///
/// Never fails; empty or punctuation-only input yields an empty vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if is_word_char(c) || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|t| t.len() > MIN_TOKEN_LEN)
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenize() {
        assert_eq!(
            tokenize("Designed a Rust-based API gateway!"),
            vec!["designed", "rust", "based", "api", "gateway"]
        );
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t ").is_empty());
        assert!(tokenize("?!... --- ***").is_empty());
    }

    #[test]
    fn test_short_tokens_dropped() {
        assert_eq!(tokenize("a an to of go led"), vec!["led"]);
    }

    #[test]
    fn test_stop_words_dropped() {
        assert!(tokenize("What would you have with them?").is_empty());
        assert_eq!(tokenize("the team and the project"), vec!["team", "project"]);
    }

    #[test]
    fn test_underscore_and_digits_are_word_chars() {
        assert_eq!(tokenize("snake_case v2024 #42"), vec!["snake_case", "v2024"]);
    }

    #[test]
    fn test_non_ascii_is_separator() {
        assert_eq!(tokenize("café résumé"), vec!["caf", "sum"]);
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        assert_eq!(
            tokenize("deploy deploy rollback deploy"),
            vec!["deploy", "deploy", "rollback", "deploy"]
        );
    }

    #[test]
    fn test_stop_word_list_is_lowercase_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for w in STOP_WORDS {
            assert_eq!(*w, w.to_lowercase());
            assert!(seen.insert(*w), "duplicate stop word: {}", w);
        }
    }
}
