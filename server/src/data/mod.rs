//! Data layer
//!
//! - `filters` - Filter-query compiler: catalogs, parsing, SQL generation
//! - `sql` - SQL dialects (PostgreSQL, SQLite, DuckDB)

pub mod filters;
pub mod sql;
