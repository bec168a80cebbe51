//! Expression functions
//!
//! Named, type-checked rewrites applied to a field reference (and the value it
//! is compared with) before the comparison is compiled. A field key selects a
//! chain with a colon prefix: `time_of_day:local_time:started_at` compares
//! `time_of_day(local_time(started_at))`.

use std::fmt;

use super::builder::QueryBuilder;
use super::catalog::{FieldCatalog, FieldDescriptor, ValueType};
use super::error::FilterError;
use super::predicate::SqlExpr;
use crate::data::sql::SqlDialect;

/// Separator between expression names and the field name in a condition key
pub const EXPRESSION_SEPARATOR: char = ':';

/// A rewrite usable inside a field condition
pub trait ExpressionFunction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Type produced when applied to `input`, or `None` if unsupported
    fn validate_type(&self, input: ValueType) -> Option<ValueType>;

    /// Rewrite the compared field reference
    fn transform_field(&self, field: SqlExpr, catalog: &FieldCatalog) -> SqlExpr;

    /// Rewrite an operand; `is_last` is set for the outermost expression only
    fn transform_value(&self, value: SqlExpr, _is_last: bool) -> SqlExpr {
        value
    }

    /// Register whatever the rewritten reference needs (must be idempotent)
    fn transform_query(&self, _query: &mut QueryBuilder, _catalog: &FieldCatalog) {}

    /// Whether `dialect` can render the rewritten reference
    fn supported_by(&self, _dialect: &dyn SqlDialect) -> bool {
        true
    }
}

/// UTC timestamp → wall-clock time in the resource's timezone
pub struct LocalTime;

impl ExpressionFunction for LocalTime {
    fn name(&self) -> &'static str {
        "local_time"
    }

    fn validate_type(&self, input: ValueType) -> Option<ValueType> {
        (input == ValueType::Datetime).then_some(ValueType::Datetime)
    }

    fn transform_field(&self, field: SqlExpr, catalog: &FieldCatalog) -> SqlExpr {
        SqlExpr::LocalTime {
            expr: Box::new(field),
            zone: Box::new(catalog.timezone().zone_expr()),
        }
    }

    fn transform_query(&self, query: &mut QueryBuilder, catalog: &FieldCatalog) {
        if let Some(join) = catalog.timezone().join() {
            query.add_join(join);
        }
    }

    // Zones are IANA names, bound or read from the timezone join
    fn supported_by(&self, dialect: &dyn SqlDialect) -> bool {
        dialect.supports_named_zones()
    }
}

/// Timestamp → time of day; literals are cast the same way
pub struct TimeOfDay;

impl ExpressionFunction for TimeOfDay {
    fn name(&self) -> &'static str {
        "time_of_day"
    }

    fn validate_type(&self, input: ValueType) -> Option<ValueType> {
        (input == ValueType::Datetime).then_some(ValueType::Time)
    }

    fn transform_field(&self, field: SqlExpr, _catalog: &FieldCatalog) -> SqlExpr {
        SqlExpr::TimeOfDay(Box::new(field))
    }

    fn transform_value(&self, value: SqlExpr, is_last: bool) -> SqlExpr {
        if is_last {
            SqlExpr::TimeOfDay(Box::new(value))
        } else {
            value
        }
    }
}

static EXPRESSIONS: &[&dyn ExpressionFunction] = &[&LocalTime, &TimeOfDay];

/// Handle to a registered expression function
#[derive(Clone, Copy)]
pub struct Expression(&'static dyn ExpressionFunction);

impl Expression {
    /// Look up a registered expression by name
    pub fn resolve(name: &str) -> Result<Self, FilterError> {
        EXPRESSIONS
            .iter()
            .find(|e| e.name() == name)
            .map(|e| Self(*e))
            .ok_or_else(|| FilterError::UnrecognizedExpression(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn function(&self) -> &'static dyn ExpressionFunction {
        self.0
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.name()).finish()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// Names of every registered expression
pub fn expression_names() -> impl Iterator<Item = &'static str> {
    EXPRESSIONS.iter().map(|e| e.name())
}

/// Type `field` has after `expressions` are applied in order
pub fn chain_type(
    field: &FieldDescriptor,
    expressions: &[Expression],
) -> Result<ValueType, FilterError> {
    expressions
        .iter()
        .try_fold(field.value_type(), |value_type, expression| {
            expression
                .function()
                .validate_type(value_type)
                .ok_or_else(|| FilterError::IncompatibleExpression {
                    expression: expression.name().to_string(),
                    field: field.name().to_string(),
                    value_type,
                })
        })
}

/// Split `a:b:field` into the field name and the expression chain in
/// application order (`b` first).
pub fn split_field_key(key: &str) -> Result<(&str, Vec<Expression>), FilterError> {
    let mut parts: Vec<&str> = key.split(EXPRESSION_SEPARATOR).collect();
    let field = parts.pop().unwrap_or_default();
    let expressions = parts
        .into_iter()
        .rev()
        .map(Expression::resolve)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((field, expressions))
}
