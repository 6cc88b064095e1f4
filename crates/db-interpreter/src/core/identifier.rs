//! Identifier quoting, truncation and literal escaping.
//!
//! Every dialect renders identifiers through these helpers so escaping and
//! length limits behave the same way everywhere.
//!
//! # Truncation
//!
//! Names longer than a dialect's identifier limit are cut to the first
//! `max_len` characters. Two names sharing that prefix collide; the collision
//! is accepted and surfaces as a duplicate-object error on the target.

use crate::error::{InterpretError, Result};

/// Hard upper bound for identifiers supplied through configuration.
const MAX_CONFIG_IDENTIFIER_LENGTH: usize = 128;

/// Opening and closing quote characters of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteChars {
    pub open: char,
    pub close: char,
}

/// MySQL backticks.
pub const BACKTICKS: QuoteChars = QuoteChars {
    open: '`',
    close: '`',
};

/// ANSI double quotes (PostgreSQL).
pub const DOUBLE_QUOTES: QuoteChars = QuoteChars {
    open: '"',
    close: '"',
};

/// SQL Server brackets.
pub const BRACKETS: QuoteChars = QuoteChars {
    open: '[',
    close: ']',
};

/// Validate an identifier supplied by configuration (schema/owner names).
///
/// Catalog names are never validated; they are quoted as-is.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(InterpretError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(InterpretError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_CONFIG_IDENTIFIER_LENGTH {
        return Err(InterpretError::Config(format!(
            "Identifier exceeds maximum length of {} characters: {:?}",
            MAX_CONFIG_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote an identifier, doubling any embedded closing quote character.
pub fn quote_with(name: &str, quotes: QuoteChars) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push(quotes.open);
    for ch in name.chars() {
        if ch == quotes.close {
            escaped.push(ch);
        }
        escaped.push(ch);
    }
    escaped.push(quotes.close);
    escaped
}

/// Cut a name to at most `max_len` characters. `0` disables the limit.
pub fn truncate_identifier(name: &str, max_len: usize) -> String {
    if max_len == 0 || name.chars().count() <= max_len {
        return name.to_string();
    }
    name.chars().take(max_len).collect()
}

/// Index names may not contain `-` on every engine; normalize them first.
pub fn normalize_index_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Escape text for use inside a single-quoted SQL string literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Render an `IN (...)` list of string literals.
pub fn in_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", escape_literal(n)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("dbo").is_ok());
        assert!(validate_identifier("sales_2024").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("bad\0name").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        assert!(validate_identifier(&"a".repeat(129)).is_err());
        assert!(validate_identifier(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_quote_escapes_closing_char() {
        assert_eq!(quote_with("users", BACKTICKS), "`users`");
        assert_eq!(quote_with("table`name", BACKTICKS), "`table``name`");
        assert_eq!(quote_with("table\"name", DOUBLE_QUOTES), "\"table\"\"name\"");
        assert_eq!(quote_with("table]name", BRACKETS), "[table]]name]");
        // Opening bracket is not special inside brackets.
        assert_eq!(quote_with("a[b", BRACKETS), "[a[b]");
    }

    #[test]
    fn test_quote_injection_stays_inside_identifier() {
        let quoted = quote_with("users`; DROP TABLE x; --", BACKTICKS);
        assert_eq!(quoted, "`users``; DROP TABLE x; --`");
    }

    #[test]
    fn test_truncate_65_chars_to_64() {
        let name = "x".repeat(65);
        let truncated = truncate_identifier(&name, 64);
        assert_eq!(truncated.len(), 64);
        assert_eq!(truncated, name[..64]);
    }

    #[test]
    fn test_truncate_collision_is_not_corrected() {
        let prefix = "fk_orders_customers_".repeat(4);
        let a = format!("{}_alpha", &prefix[..64]);
        let b = format!("{}_beta", &prefix[..64]);
        assert_ne!(a, b);
        assert_eq!(truncate_identifier(&a, 64), truncate_identifier(&b, 64));
    }

    #[test]
    fn test_truncate_short_and_unlimited() {
        assert_eq!(truncate_identifier("orders", 64), "orders");
        assert_eq!(truncate_identifier(&"y".repeat(300), 0).len(), 300);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let name = "é".repeat(70);
        assert_eq!(truncate_identifier(&name, 64).chars().count(), 64);
    }

    #[test]
    fn test_normalize_index_name() {
        assert_eq!(normalize_index_name("ix-orders-code"), "ix_orders_code");
    }

    #[test]
    fn test_in_list_escapes() {
        let list = in_list(&["orders".to_string(), "o'neil".to_string()]);
        assert_eq!(list, "'orders','o''neil'");
    }
}
