//! Query assembly
//!
//! Combines the caller's base query with the compiled filter, ordering,
//! paging and projection into one immutable `CompiledQuery`.

use serde_json::{Map, Value};

use super::builder::{BaseQuery, JoinSpec, QueryBuilder};
use super::catalog::FieldCatalog;
use super::compiler::{ConditionCompiler, field_reference};
use super::error::FilterError;
use super::expressions::Expression;
use super::parser::{FilterRequest, ParseLimits, parse_request};
use super::predicate::{Predicate, SqlExpr, SqlParams};
use super::sort::{OrderBy, Paging, compile_order};
use crate::data::sql::SqlDialect;

/// An output column selected by logical name
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
    pub expr: SqlExpr,
    pub name: String,
}

/// A fully lowered query, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    base: BaseQuery,
    joins: Vec<JoinSpec>,
    conditions: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    paging: Paging,
    projection: Option<Vec<ProjectedColumn>>,
    expressions: Vec<Expression>,
}

impl CompiledQuery {
    pub fn base(&self) -> &BaseQuery {
        &self.base
    }

    /// Joins added during compilation (the base query's own joins excluded)
    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    /// Top-level filter predicates, ANDed after the base query's scopes
    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    /// The filter as a single predicate, if there is one
    pub fn predicate(&self) -> Option<Predicate> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(Predicate::and(self.conditions.clone()))
        }
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> u32 {
        self.paging.limit
    }

    pub fn offset(&self) -> u64 {
        self.paging.offset
    }

    pub fn projection(&self) -> Option<&[ProjectedColumn]> {
        self.projection.as_deref()
    }

    /// Expressions the filter applies, in first-use order
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Render SQL text with dialect placeholders and the values they bind
    ///
    /// Fails when the filter uses an expression `dialect` cannot render.
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> Result<(String, SqlParams), FilterError> {
        if let Some(expression) = self
            .expressions
            .iter()
            .find(|e| !e.function().supported_by(dialect))
        {
            return Err(FilterError::UnsupportedExpression {
                expression: expression.name().to_string(),
                dialect: dialect.name().to_string(),
            });
        }

        let mut params = SqlParams::default();

        let select = match &self.projection {
            Some(columns) => columns
                .iter()
                .map(|c| {
                    let expr = c.expr.to_sql(dialect, &mut params);
                    if expr == c.name || expr.ends_with(&format!(".{}", c.name)) {
                        expr
                    } else {
                        format!("{} AS {}", expr, c.name)
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
            None => self.base.select_list().join(", "),
        };

        let mut sql = format!("SELECT {} FROM {}", select, self.base.from_sql());

        for join in self.base.joins().iter().chain(&self.joins) {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        let filters: Vec<String> = self
            .base
            .scopes()
            .iter()
            .chain(&self.conditions)
            .map(|p| p.to_sql(dialect, &mut params))
            .collect();
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.expr.to_sql(dialect, &mut params), o.direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        sql.push(' ');
        sql.push_str(&dialect.limit_offset(self.paging.limit, self.paging.offset));

        Ok((sql, params))
    }
}

/// Parse and compile a filter request against `base`
///
/// `params` carries the resource's convenience parameters (query string),
/// which are ANDed with the filter.
pub fn compile_request(
    catalog: &FieldCatalog,
    base: BaseQuery,
    request: &Value,
    params: &Map<String, Value>,
    limits: &ParseLimits,
) -> Result<CompiledQuery, FilterError> {
    let request = parse_request(request, catalog, limits)?;
    compile_parsed(catalog, base, request, params)
}

/// Compile an already parsed request
pub fn compile_parsed(
    catalog: &FieldCatalog,
    base: BaseQuery,
    mut request: FilterRequest,
    params: &Map<String, Value>,
) -> Result<CompiledQuery, FilterError> {
    if let Some(group) = catalog.convenience().to_condition(catalog, params)? {
        request.filter.conditions.push(group);
    }

    let mut query = QueryBuilder::new(base);
    let mut conditions = ConditionCompiler::new(catalog, &mut query).compile_tree(&request.filter)?;

    let sort = request.sort.as_deref().unwrap_or(catalog.default_sort());
    let mut order_by = compile_order(sort, catalog, &mut query)?;

    let mut projection = match &request.fields {
        Some(names) => Some(
            names
                .iter()
                .map(|name| {
                    let field = catalog.lookup(name)?;
                    Ok(ProjectedColumn {
                        expr: field_reference(field, catalog, &mut query),
                        name: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>, FilterError>>()?,
        ),
        None => None,
    };

    let paging = request.paging.resolve(catalog.default_items());
    let (mut base, joins, expressions) = query.into_parts();

    // Catalog columns belong to the base table; once joins are added a bare
    // name may also exist on a joined table.
    if !joins.is_empty() {
        let qualifier = base.qualifier().to_string();
        base.qualify_scopes();
        for predicate in &mut conditions {
            predicate.qualify_columns(&qualifier);
        }
        for order in &mut order_by {
            order.expr.qualify(&qualifier);
        }
        for column in projection.iter_mut().flatten() {
            column.expr.qualify(&qualifier);
        }
    }

    tracing::debug!(
        resource = %catalog.resource(),
        conditions = request.filter.field_count(),
        joins = joins.len(),
        limit = paging.limit,
        offset = paging.offset,
        "Compiled filter request"
    );

    Ok(CompiledQuery {
        base,
        joins,
        conditions,
        order_by,
        paging,
        projection,
        expressions,
    })
}
