//! Identifier quoting/escaping and name-pattern matching at the catalog boundary (§4.2).
//!
//! All user-supplied strings are quoted/escaped here before they ever reach the
//! embedded store; the catalog never concatenates untrusted text into a query. Names
//! containing non-ASCII codepoints or a quoting character are rejected outright as
//! [`PolyplaneError::InvalidIdentifier`] rather than silently escaped, per the
//! resolution of the "Open Questions" note in `spec.md` §9.

use crate::error::{PolyplaneError, Result};

/// Quote a validated identifier for storage-boundary SQL, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Reject identifiers that are not legal ASCII or that carry a quoting character;
/// legal ASCII identifiers are passed through unchanged (validation only, no mutation).
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(PolyplaneError::InvalidIdentifier("empty identifier".into()));
    }
    if !name.is_ascii() {
        return Err(PolyplaneError::InvalidIdentifier(format!(
            "non-ASCII identifier: {name}"
        )));
    }
    if name.contains(['"', '\'', '\\']) {
        return Err(PolyplaneError::InvalidIdentifier(format!(
            "quoting character in identifier: {name}"
        )));
    }
    Ok(name)
}

/// Fold case for lookup/storage when `case_sensitive` is false, matching uniformly
/// across both paths per §3.
pub fn fold_case(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// A SQL-`LIKE`-style glob: `%` matches any run of characters, `_` matches exactly one.
/// Matching never concatenates the pattern into a storage query — it is evaluated
/// in-process against names already fetched by exact surrogate-id lookup.
#[derive(Debug, Clone)]
pub struct NamePattern {
    pattern: String,
}

impl NamePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn any() -> Self {
        Self::new("%")
    }

    pub fn matches(&self, candidate: &str) -> bool {
        like_match(&self.pattern, candidate)
    }
}

pub fn like_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    like_match_rec(&pattern, &candidate)
}

fn like_match_rec(pattern: &[char], candidate: &[char]) -> bool {
    match pattern.first() {
        None => candidate.is_empty(),
        Some('%') => {
            like_match_rec(&pattern[1..], candidate)
                || (!candidate.is_empty() && like_match_rec(pattern, &candidate[1..]))
        }
        Some('_') => !candidate.is_empty() && like_match_rec(&pattern[1..], &candidate[1..]),
        Some(c) => {
            candidate.first() == Some(c) && like_match_rec(&pattern[1..], &candidate[1..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("emp\"loyee"), "\"emp\"\"loyee\"");
    }

    #[test]
    fn validate_identifier_rejects_non_ascii() {
        assert!(validate_identifier("tàble").is_err());
    }

    #[test]
    fn validate_identifier_rejects_quote_characters() {
        assert!(validate_identifier("a\"b").is_err());
        assert!(validate_identifier("a'b").is_err());
    }

    #[test]
    fn validate_identifier_accepts_legal_ascii() {
        assert_eq!(validate_identifier("employee").unwrap(), "employee");
    }

    #[test]
    fn like_match_supports_wildcards() {
        assert!(like_match("emp%", "employee"));
        assert!(like_match("e_p", "emp"));
        assert!(!like_match("e_p", "employee"));
        assert!(like_match("%", "anything"));
        assert!(!like_match("emp", "employee"));
    }

    #[test]
    fn fold_case_only_lowercases_when_case_insensitive() {
        assert_eq!(fold_case("Employee", true), "Employee");
        assert_eq!(fold_case("Employee", false), "employee");
    }
}
