//! Filter-query compiler
//!
//! Compiles declarative, nested client filters into parameterized SQL:
//!
//! - `catalog` - per-resource allow-list of fields, types and operators
//! - `parser` - JSON request → validated condition tree
//! - `expressions` - `local_time` / `time_of_day` field rewrites
//! - `compiler` - condition tree → predicates, registering joins once
//! - `sort` - ORDER BY and LIMIT/OFFSET directives
//! - `convenience` - query-parameter shortcuts ANDed with the filter
//! - `query` - final `CompiledQuery` and SQL rendering
//!
//! ## Usage
//!
//! ```no_run
//! use sieve_server::data::filters::{
//!     BaseQuery, FieldCatalog, FieldDescriptor, ParseLimits, ValueType, compile_request,
//! };
//! use sieve_server::data::sql::Backend;
//!
//! let catalog = FieldCatalog::builder("calls", "calls")
//!     .field(FieldDescriptor::new("duration_seconds", "duration_seconds", ValueType::Integer))
//!     .build()
//!     .unwrap();
//! let request = serde_json::json!({
//!     "filter": {"duration_seconds": {"range": {"interval": "30..600"}}},
//!     "sort": {"order_by": "duration_seconds", "direction": "desc"}
//! });
//! let base = BaseQuery::from_table("calls").scope_eq("account_id", 42);
//! let query = compile_request(&catalog, base, &request, &Default::default(), &ParseLimits::default())
//!     .unwrap();
//! let (sql, params) = query.to_sql(Backend::Postgres.dialect()).unwrap();
//! ```

mod builder;
mod catalog;
mod compiler;
mod convenience;
mod declaration;
mod error;
mod expressions;
mod operators;
mod parser;
mod predicate;
mod query;
mod sort;
mod types;

#[cfg(test)]
mod tests;

pub use builder::{BaseQuery, JoinKind, JoinSpec, QueryBuilder};
pub use catalog::{
    CatalogRegistry, FieldCatalog, FieldCatalogBuilder, FieldDescriptor, TimezoneSource,
    ValueType,
};
pub use compiler::ConditionCompiler;
pub use convenience::{ConvenienceFilters, SearchShortcut, Shortcut};
pub use declaration::{
    CatalogDeclaration, CatalogDefaults, FieldDeclaration, SortDeclaration, TimezoneDeclaration,
};
pub use error::{CatalogError, FilterError, RangeDefect};
pub use expressions::{
    EXPRESSION_SEPARATOR, Expression, ExpressionFunction, LocalTime, TimeOfDay, chain_type,
    expression_names, split_field_key,
};
pub use operators::Operator;
pub use parser::{FilterRequest, ParseLimits, parse_filters, parse_request};
pub use predicate::{CompareOp, Predicate, SqlExpr, SqlParams, SqlValue, render_conjunction};
pub use query::{CompiledQuery, ProjectedColumn, compile_parsed, compile_request};
pub use sort::{
    OrderBy, Paging, PagingSpec, SortDirection, SortKey, compile_order, default_page, parse_sort,
    validate_page,
};
pub use types::{
    CombinatorKind, ConditionTree, FieldCondition, FilterTree, Operand, OperatorCondition,
};
