//! SQL utility functions

use std::sync::LazyLock;

use regex::Regex;

/// Plain or table-qualified identifier (`column` or `table.column`)
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier regex is valid")
});

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Use this when building LIKE patterns from user input to prevent
/// unintended pattern matching. Patterns built this way must be rendered
/// with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use sieve_server::utils::sql::escape_like_pattern;
///
/// let user_input = "100% match_test";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Check that a catalog-declared name can be embedded in SQL text verbatim
///
/// Only catalog declarations are checked here; client input never reaches
/// SQL text and is always bound as a parameter.
pub fn is_safe_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}
