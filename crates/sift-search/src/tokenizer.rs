//! Lexical tokenizer shared by the sparse index's query and document paths.
//!
//! Terms are maximal runs of alphanumerics and underscores, case-folded;
//! every other character is a separator. Query and corpus must be tokenized
//! identically or BM25 statistics drift, so this is the only tokenizer in
//! the crate. No stemming: "cats" and "cat" are distinct terms.

/// Tokenize text into lowercased terms.
///
/// # Example
///
/// ```
/// use sift_search::tokenizer::tokenize;
///
/// let tokens = tokenize("The cat_2 sat, on the mat!");
/// assert_eq!(tokens, vec!["the", "cat_2", "sat", "on", "the", "mat"]);
/// ```
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order.
///
/// Used for query-term iteration where each distinct term contributes once
/// to document-frequency statistics.
///
/// # Example
///
/// ```
/// use sift_search::tokenizer::tokenize_unique;
///
/// let tokens = tokenize_unique("cat CAT dog cat");
/// assert_eq!(tokens, vec!["cat", "dog"]);
/// ```
#[must_use]
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tokenize_basic() {
        let tokens = tokenize("Hello, World!");
        assert_eq!(tokens, vec!["hello", "world"]);
    }

    #[test]
    fn tokenize_keeps_underscores_and_digits() {
        let tokens = tokenize("snake_case var2 x");
        assert_eq!(tokens, vec!["snake_case", "var2", "x"]);
    }

    #[test]
    fn tokenize_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn tokenize_only_separators() {
        assert!(tokenize("...---!!!").is_empty());
    }

    #[test]
    fn tokenize_plural_is_a_distinct_term() {
        // No stemming: "cats" and "cat" do not match each other.
        assert_eq!(tokenize("cats"), vec!["cats"]);
    }

    #[test]
    fn tokenize_unique_preserves_order() {
        let tokens = tokenize_unique("apple banana apple cherry");
        assert_eq!(tokens, vec!["apple", "banana", "cherry"]);
    }

    proptest! {
        #[test]
        fn tokens_never_contain_separators(text in ".{0,200}") {
            for token in tokenize(&text) {
                prop_assert!(!token.is_empty());
                prop_assert!(token.chars().all(|c| c.is_alphanumeric() || c == '_'));
            }
        }

        #[test]
        fn tokenize_is_case_insensitive(text in "[A-Za-z0-9_ ]{0,100}") {
            prop_assert_eq!(tokenize(&text), tokenize(&text.to_uppercase()));
        }

        #[test]
        fn unique_is_subset_with_no_duplicates(text in ".{0,200}") {
            let unique = tokenize_unique(&text);
            let mut seen = std::collections::HashSet::new();
            for token in &unique {
                prop_assert!(seen.insert(token.clone()), "duplicate token {token}");
            }
            let all: std::collections::HashSet<_> = tokenize(&text).into_iter().collect();
            prop_assert_eq!(seen, all);
        }
    }
}
