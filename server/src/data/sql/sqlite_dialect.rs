//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn like_ci(&self, expr: &str, pattern: &str, negated: bool) -> String {
        // SQLite LIKE is already case-insensitive for ASCII
        let op = if negated { "NOT LIKE" } else { "LIKE" };
        format!("{} {} {} ESCAPE '\\'", expr, op, pattern)
    }

    fn to_local_time(&self, expr: &str, zone: &str) -> String {
        // No IANA zone support, the zone value is applied as a datetime modifier
        format!("datetime({}, {})", expr, zone)
    }

    fn supports_named_zones(&self) -> bool {
        // datetime() yields NULL for a zone name
        false
    }

    fn cast_to_time(&self, expr: &str) -> String {
        format!("time({})", expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.placeholder(1), "?");
        assert_eq!(dialect.placeholder(5), "?");
    }

    #[test]
    fn test_like_ci() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.like_ci("name", "?", false), r"name LIKE ? ESCAPE '\'");
        assert_eq!(
            dialect.like_ci("name", "?", true),
            r"name NOT LIKE ? ESCAPE '\'"
        );
    }

    #[test]
    fn test_to_local_time() {
        let dialect = SqliteDialect;
        assert_eq!(
            dialect.to_local_time("started_at", "?"),
            "datetime(started_at, ?)"
        );
    }

    #[test]
    fn test_no_named_zones() {
        assert!(!SqliteDialect.supports_named_zones());
    }

    #[test]
    fn test_cast_to_time() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.cast_to_time("started_at"), "time(started_at)");
    }
}
