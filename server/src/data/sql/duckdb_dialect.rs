//! DuckDB SQL dialect implementation

use super::SqlDialect;

/// DuckDB SQL dialect
pub struct DuckdbDialect;

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn like_ci(&self, expr: &str, pattern: &str, negated: bool) -> String {
        let op = if negated { "NOT ILIKE" } else { "ILIKE" };
        format!("{} {} {} ESCAPE '\\'", expr, op, pattern)
    }

    fn to_local_time(&self, expr: &str, zone: &str) -> String {
        format!("timezone({}, {})", zone, expr)
    }

    fn zone_precedes_timestamp(&self) -> bool {
        true
    }

    fn cast_to_time(&self, expr: &str) -> String {
        format!("CAST({} AS TIME)", expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = DuckdbDialect;
        assert_eq!(dialect.placeholder(3), "?");
    }

    #[test]
    fn test_to_local_time() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.to_local_time("started_at", "?"),
            "timezone(?, started_at)"
        );
    }

    #[test]
    fn test_like_ci_negated() {
        let dialect = DuckdbDialect;
        assert_eq!(
            dialect.like_ci("title", "?", true),
            r"title NOT ILIKE ? ESCAPE '\'"
        );
    }
}
