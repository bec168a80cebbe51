//! Query builder
//!
//! Holds the caller-supplied base query and the registry of auxiliary joins
//! added while compiling. Joins are keyed by a stable id so that each one is
//! added at most once per query.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::expressions::Expression;
use super::predicate::{CompareOp, Predicate, SqlExpr, SqlValue};

/// Join type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
}

impl JoinKind {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// An equi-join: `<kind> table [AS alias] ON qualifier.column = references`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSpec {
    /// Stable identifier used for de-duplication
    pub id: String,
    #[serde(default)]
    pub kind: JoinKind,
    pub table: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Column on the joined table
    pub column: String,
    /// Column on the query side it must equal
    pub references: String,
}

impl JoinSpec {
    pub fn left(
        id: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        references: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: JoinKind::Left,
            table: table.into(),
            alias: None,
            column: column.into(),
            references: references.into(),
        }
    }

    pub fn inner(
        id: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        references: impl Into<String>,
    ) -> Self {
        Self {
            kind: JoinKind::Inner,
            ..Self::left(id, table, column, references)
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name the joined table is referred to by
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Names embedded verbatim in SQL text
    pub(crate) fn identifiers(&self) -> Vec<&str> {
        let mut names = vec![self.table.as_str(), self.column.as_str(), self.references.as_str()];
        if let Some(alias) = &self.alias {
            names.push(alias);
        }
        names
    }

    pub fn to_sql(&self) -> String {
        let target = match &self.alias {
            Some(alias) => format!("{} AS {}", self.table, alias),
            None => self.table.clone(),
        };
        format!(
            "{} {} ON {}.{} = {}",
            self.kind.as_sql(),
            target,
            self.qualifier(),
            self.column,
            self.references
        )
    }
}

/// The externally supplied, already scoped query a filter is compiled onto
///
/// Scopes are rendered first in the WHERE clause and are never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseQuery {
    table: String,
    alias: Option<String>,
    select: Vec<String>,
    joins: Vec<JoinSpec>,
    scopes: Vec<Predicate>,
}

impl BaseQuery {
    /// Select every column of `table`
    pub fn from_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            select: vec![format!("{}.*", table)],
            table,
            alias: None,
            joins: Vec::new(),
            scopes: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.select = vec![format!("{}.*", alias)];
        self.alias = Some(alias);
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    pub fn scope(mut self, predicate: Predicate) -> Self {
        self.scopes.push(predicate);
        self
    }

    pub fn scope_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.scope(Predicate::compare(
            SqlExpr::column(column),
            CompareOp::Eq,
            SqlExpr::param(value),
        ))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name the base table's columns are referred to by
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn select_list(&self) -> &[String] {
        &self.select
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn scopes(&self) -> &[Predicate] {
        &self.scopes
    }

    /// Prefix bare scope columns with the base qualifier. Scopes of a query
    /// with its own joins are left untouched, their bare names may point
    /// at a joined table.
    pub(crate) fn qualify_scopes(&mut self) {
        if !self.joins.is_empty() {
            return;
        }
        let qualifier = self.qualifier().to_string();
        for scope in &mut self.scopes {
            scope.qualify_columns(&qualifier);
        }
    }

    pub(crate) fn from_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.table, alias),
            None => self.table.clone(),
        }
    }
}

/// In-progress query: the base query plus auxiliary joins registered by id
#[derive(Debug)]
pub struct QueryBuilder {
    base: BaseQuery,
    joins: Vec<JoinSpec>,
    join_ids: FxHashSet<String>,
    expressions: Vec<Expression>,
}

impl QueryBuilder {
    pub fn new(base: BaseQuery) -> Self {
        let join_ids = base.joins.iter().map(|j| j.id.clone()).collect();
        Self {
            base,
            joins: Vec::new(),
            join_ids,
            expressions: Vec::new(),
        }
    }

    /// Register a join unless one with the same id is already present.
    /// Returns whether the join was added.
    pub fn add_join(&mut self, join: &JoinSpec) -> bool {
        if self.join_ids.contains(&join.id) {
            return false;
        }
        tracing::trace!(join = %join.id, table = %join.table, "Registered auxiliary join");
        self.join_ids.insert(join.id.clone());
        self.joins.push(join.clone());
        true
    }

    pub fn has_join(&self, id: &str) -> bool {
        self.join_ids.contains(id)
    }

    /// Record an expression used by a compiled condition
    pub fn use_expression(&mut self, expression: Expression) {
        if !self.expressions.contains(&expression) {
            self.expressions.push(expression);
        }
    }

    /// Expressions in first-use order
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn base(&self) -> &BaseQuery {
        &self.base
    }

    /// Auxiliary joins in registration order
    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn into_parts(self) -> (BaseQuery, Vec<JoinSpec>, Vec<Expression>) {
        (self.base, self.joins, self.expressions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timezone_join() -> JoinSpec {
        JoinSpec::left(
            "local_timezone",
            "account_settings",
            "account_id",
            "calls.account_id",
        )
        .with_alias("local_tz")
    }

    #[test]
    fn join_to_sql_with_alias() {
        assert_eq!(
            timezone_join().to_sql(),
            "LEFT JOIN account_settings AS local_tz ON local_tz.account_id = calls.account_id"
        );
    }

    #[test]
    fn inner_join_without_alias() {
        let join = JoinSpec::inner("agent", "agents", "id", "calls.agent_id");
        assert_eq!(join.qualifier(), "agents");
        assert_eq!(
            join.to_sql(),
            "INNER JOIN agents ON agents.id = calls.agent_id"
        );
    }

    #[test]
    fn add_join_is_idempotent_by_id() {
        let mut query = QueryBuilder::new(BaseQuery::from_table("calls"));

        assert!(query.add_join(&timezone_join()));
        assert!(!query.add_join(&timezone_join()));
        assert!(query.has_join("local_timezone"));
        assert_eq!(query.joins().len(), 1);
    }

    #[test]
    fn base_query_joins_are_not_duplicated() {
        let base = BaseQuery::from_table("calls").join(timezone_join());
        let mut query = QueryBuilder::new(base);

        assert!(!query.add_join(&timezone_join()));
        assert!(query.joins().is_empty());
        assert_eq!(query.base().joins().len(), 1);
    }

    #[test]
    fn base_query_defaults_and_alias() {
        let base = BaseQuery::from_table("calls");
        assert_eq!(base.select_list(), ["calls.*"]);
        assert_eq!(base.from_sql(), "calls");

        let aliased = BaseQuery::from_table("calls").with_alias("c");
        assert_eq!(aliased.select_list(), ["c.*"]);
        assert_eq!(aliased.from_sql(), "calls AS c");
        assert_eq!(aliased.table(), "calls");
    }

    #[test]
    fn expressions_recorded_once() {
        let mut query = QueryBuilder::new(BaseQuery::from_table("calls"));
        let local_time = Expression::resolve("local_time").unwrap();
        let time_of_day = Expression::resolve("time_of_day").unwrap();

        query.use_expression(local_time);
        query.use_expression(time_of_day);
        query.use_expression(local_time);

        assert_eq!(query.expressions(), [local_time, time_of_day]);
    }

    #[test]
    fn qualify_scopes_only_without_base_joins() {
        let mut base = BaseQuery::from_table("calls")
            .with_alias("c")
            .scope_eq("account_id", 1)
            .scope_eq("c.region", "eu");
        base.qualify_scopes();
        assert_eq!(
            base.scopes()[0],
            Predicate::compare(SqlExpr::column("c.account_id"), CompareOp::Eq, SqlExpr::param(1))
        );
        assert_eq!(
            base.scopes()[1],
            Predicate::compare(SqlExpr::column("c.region"), CompareOp::Eq, SqlExpr::param("eu"))
        );

        let mut joined = BaseQuery::from_table("calls")
            .join(timezone_join())
            .scope_eq("time_zone", "UTC");
        joined.qualify_scopes();
        assert_eq!(
            joined.scopes()[0],
            Predicate::compare(SqlExpr::column("time_zone"), CompareOp::Eq, SqlExpr::param("UTC"))
        );
    }

    #[test]
    fn scope_eq_builds_equality() {
        let base = BaseQuery::from_table("calls").scope_eq("account_id", 42);
        assert_eq!(
            base.scopes(),
            [Predicate::compare(
                SqlExpr::column("account_id"),
                CompareOp::Eq,
                SqlExpr::param(42)
            )]
        );
    }
}
