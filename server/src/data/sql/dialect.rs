//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for generating database-specific SQL syntax.

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1)
/// - Case-insensitive pattern matching
/// - Timezone conversion
/// - Time-of-day casts
/// - Limit/offset clauses
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite/DuckDB: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Generate a case-insensitive LIKE match against an escaped pattern
    ///
    /// The pattern is always escaped with backslashes, so every dialect
    /// renders `ESCAPE '\'`.
    ///
    /// - PostgreSQL/DuckDB: `col ILIKE ? ESCAPE '\'`
    /// - SQLite: `col LIKE ? ESCAPE '\'` (LIKE is case-insensitive for ASCII)
    fn like_ci(&self, expr: &str, pattern: &str, negated: bool) -> String;

    /// Convert a UTC timestamp expression to wall-clock time in a zone
    ///
    /// - PostgreSQL: `(expr AT TIME ZONE zone)`
    /// - DuckDB: `timezone(zone, expr)`
    /// - SQLite: `datetime(expr, zone)` (zone must be an offset modifier such as '+02:00')
    fn to_local_time(&self, expr: &str, zone: &str) -> String;

    /// Whether `to_local_time` accepts IANA zone names such as `Europe/Berlin`
    fn supports_named_zones(&self) -> bool {
        true
    }

    /// Whether `to_local_time` renders the zone before the timestamp
    ///
    /// Operands are bound in text order so positional placeholders line up.
    fn zone_precedes_timestamp(&self) -> bool {
        false
    }

    /// Cast a timestamp expression (or time literal) to a time of day
    ///
    /// - PostgreSQL/DuckDB: `CAST(expr AS TIME)`
    /// - SQLite: `time(expr)`
    fn cast_to_time(&self, expr: &str) -> String;

    /// Generate LIMIT/OFFSET clause
    ///
    /// Most databases use `LIMIT x OFFSET y`, but syntax may vary.
    fn limit_offset(&self, limit: u32, offset: u64) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }
}
