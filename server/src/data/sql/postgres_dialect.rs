//! PostgreSQL SQL dialect implementation

use super::SqlDialect;

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn like_ci(&self, expr: &str, pattern: &str, negated: bool) -> String {
        let op = if negated { "NOT ILIKE" } else { "ILIKE" };
        format!("{} {} {} ESCAPE '\\'", expr, op, pattern)
    }

    fn to_local_time(&self, expr: &str, zone: &str) -> String {
        format!("({} AT TIME ZONE {})", expr, zone)
    }

    fn cast_to_time(&self, expr: &str) -> String {
        format!("CAST({} AS TIME)", expr)
    }
}
