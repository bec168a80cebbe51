//! Predicate expression tree
//!
//! The lowered form of a condition tree. Rendering produces SQL with
//! dialect placeholders and collects the bound values in order.

use std::fmt;

use serde::Serialize;

use crate::data::sql::SqlDialect;

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for SqlValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug, Default)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    /// Bind a value and return the placeholder that refers to it
    pub fn bind(&mut self, dialect: &dyn SqlDialect, value: SqlValue) -> String {
        self.values.push(value);
        dialect.placeholder(self.values.len())
    }
}

/// A scalar expression on either side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// A catalog-declared column reference
    Column(String),
    /// A bound value
    Param(SqlValue),
    /// UTC timestamp converted to wall-clock time in `zone`
    LocalTime {
        expr: Box<SqlExpr>,
        zone: Box<SqlExpr>,
    },
    /// Timestamp or literal cast to a time of day
    TimeOfDay(Box<SqlExpr>),
}

impl SqlExpr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn param(value: impl Into<SqlValue>) -> Self {
        Self::Param(value.into())
    }

    /// Prefix a bare column with `qualifier`; qualified columns stay as is
    pub fn qualify(&mut self, qualifier: &str) {
        match self {
            Self::Column(name) if !name.contains('.') => {
                *name = format!("{}.{}", qualifier, name);
            }
            Self::Column(_) | Self::Param(_) => {}
            Self::LocalTime { expr, zone } => {
                expr.qualify(qualifier);
                zone.qualify(qualifier);
            }
            Self::TimeOfDay(expr) => expr.qualify(qualifier),
        }
    }

    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        match self {
            Self::Column(name) => name.clone(),
            Self::Param(value) => params.bind(dialect, value.clone()),
            Self::LocalTime { expr, zone } => {
                let (expr, zone) = if dialect.zone_precedes_timestamp() {
                    let zone = zone.to_sql(dialect, params);
                    (expr.to_sql(dialect, params), zone)
                } else {
                    let expr = expr.to_sql(dialect, params);
                    (expr, zone.to_sql(dialect, params))
                };
                dialect.to_local_time(&expr, &zone)
            }
            Self::TimeOfDay(expr) => {
                let expr = expr.to_sql(dialect, params);
                dialect.cast_to_time(&expr)
            }
        }
    }
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
        }
    }
}

/// Boolean predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        left: SqlExpr,
        op: CompareOp,
        right: SqlExpr,
    },
    InList {
        expr: SqlExpr,
        values: Vec<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: SqlExpr,
        low: SqlExpr,
        high: SqlExpr,
    },
    /// Case-insensitive match against an already escaped pattern
    Like {
        expr: SqlExpr,
        pattern: SqlExpr,
        negated: bool,
    },
    IsNull {
        expr: SqlExpr,
        negated: bool,
    },
    Const(bool),
}

impl Predicate {
    /// Conjunction; a single predicate is returned as is, an empty list is TRUE
    pub fn and(mut predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            0 => Self::Const(true),
            1 => predicates.remove(0),
            _ => Self::And(predicates),
        }
    }

    /// Disjunction; a single predicate is returned as is, an empty list is FALSE
    pub fn or(mut predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            0 => Self::Const(false),
            1 => predicates.remove(0),
            _ => Self::Or(predicates),
        }
    }

    pub fn not(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    pub fn compare(left: SqlExpr, op: CompareOp, right: SqlExpr) -> Self {
        Self::Compare { left, op, right }
    }

    /// Qualify every bare column reference in the tree
    pub fn qualify_columns(&mut self, qualifier: &str) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.qualify_columns(qualifier);
                }
            }
            Self::Not(inner) => inner.qualify_columns(qualifier),
            Self::Compare { left, right, .. } => {
                left.qualify(qualifier);
                right.qualify(qualifier);
            }
            Self::InList { expr, values, .. } => {
                expr.qualify(qualifier);
                for value in values {
                    value.qualify(qualifier);
                }
            }
            Self::Between { expr, low, high } => {
                expr.qualify(qualifier);
                low.qualify(qualifier);
                high.qualify(qualifier);
            }
            Self::Like { expr, pattern, .. } => {
                expr.qualify(qualifier);
                pattern.qualify(qualifier);
            }
            Self::IsNull { expr, .. } => expr.qualify(qualifier),
            Self::Const(_) => {}
        }
    }

    /// Render as a nested operand: groups are parenthesized
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        self.render(dialect, params, true)
    }

    fn render(&self, dialect: &dyn SqlDialect, params: &mut SqlParams, nested: bool) -> String {
        match self {
            Self::And(children) => render_group(children, " AND ", dialect, params, nested),
            Self::Or(children) => render_group(children, " OR ", dialect, params, nested),
            Self::Not(inner) => format!("NOT ({})", inner.render(dialect, params, false)),
            Self::Compare { left, op, right } => {
                let left = left.to_sql(dialect, params);
                let right = right.to_sql(dialect, params);
                format!("{} {} {}", left, op.as_sql(), right)
            }
            Self::InList {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Self::Const(*negated).render(dialect, params, nested);
                }
                let expr = expr.to_sql(dialect, params);
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| v.to_sql(dialect, params))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", expr, op, placeholders.join(", "))
            }
            Self::Between { expr, low, high } => {
                let expr = expr.to_sql(dialect, params);
                let low = low.to_sql(dialect, params);
                let high = high.to_sql(dialect, params);
                format!("{} BETWEEN {} AND {}", expr, low, high)
            }
            Self::Like {
                expr,
                pattern,
                negated,
            } => {
                let expr = expr.to_sql(dialect, params);
                let pattern = pattern.to_sql(dialect, params);
                dialect.like_ci(&expr, &pattern, *negated)
            }
            Self::IsNull { expr, negated } => {
                let expr = expr.to_sql(dialect, params);
                if *negated {
                    format!("{} IS NOT NULL", expr)
                } else {
                    format!("{} IS NULL", expr)
                }
            }
            Self::Const(true) => "1=1".to_string(),
            Self::Const(false) => "1=0".to_string(),
        }
    }
}

fn render_group(
    children: &[Predicate],
    separator: &str,
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
    nested: bool,
) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|c| c.render(dialect, params, true))
        .collect();
    let joined = parts.join(separator);
    if nested {
        format!("({})", joined)
    } else {
        joined
    }
}

/// Render a top-level conjunction (a WHERE clause body) without outer parentheses
pub fn render_conjunction(
    predicates: &[Predicate],
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
) -> String {
    predicates
        .iter()
        .map(|p| p.to_sql(dialect, params))
        .collect::<Vec<_>>()
        .join(" AND ")
}
