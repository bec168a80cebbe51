//! Condition compiler
//!
//! Lowers a validated condition tree into predicates over the query being
//! built. Expression rewrites are applied here and any join they (or an
//! association field) need is registered on the `QueryBuilder`.

use super::builder::QueryBuilder;
use super::catalog::{FieldCatalog, FieldDescriptor};
use super::error::FilterError;
use super::expressions::{Expression, chain_type};
use super::operators::Operator;
use super::predicate::{CompareOp, Predicate, SqlExpr, SqlValue};
use super::types::{CombinatorKind, ConditionTree, FieldCondition, FilterTree, Operand};
use crate::utils::sql::escape_like_pattern;

/// Column reference of a field, joining its association on first use
pub(crate) fn field_reference(
    field: &FieldDescriptor,
    catalog: &FieldCatalog,
    query: &mut QueryBuilder,
) -> SqlExpr {
    if let Some(join) = field.association().and_then(|id| catalog.association(id)) {
        query.add_join(join);
    }
    field.column_expr()
}

/// Compiles condition trees against one catalog and one in-progress query
pub struct ConditionCompiler<'a> {
    catalog: &'a FieldCatalog,
    query: &'a mut QueryBuilder,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(catalog: &'a FieldCatalog, query: &'a mut QueryBuilder) -> Self {
        Self { catalog, query }
    }

    /// Compile the root conjunction; one predicate per top-level condition
    pub fn compile_tree(&mut self, tree: &FilterTree) -> Result<Vec<Predicate>, FilterError> {
        tree.conditions.iter().map(|node| self.compile(node)).collect()
    }

    pub fn compile(&mut self, node: &ConditionTree) -> Result<Predicate, FilterError> {
        match node {
            ConditionTree::Combinator { kind, children } => {
                let compiled = children
                    .iter()
                    .map(|child| self.compile(child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match kind {
                    CombinatorKind::And => Predicate::and(compiled),
                    CombinatorKind::Or => Predicate::or(compiled),
                    CombinatorKind::Not => Predicate::not(Predicate::and(compiled)),
                })
            }
            ConditionTree::Field(condition) => self.compile_field(condition),
        }
    }

    fn compile_field(&mut self, condition: &FieldCondition) -> Result<Predicate, FilterError> {
        let field = self.catalog.lookup(&condition.field)?;
        let value_type = chain_type(field, &condition.expressions)?;

        let mut column = field_reference(field, self.catalog, self.query);
        for expression in &condition.expressions {
            let function = expression.function();
            column = function.transform_field(column, self.catalog);
            function.transform_query(self.query, self.catalog);
            self.query.use_expression(*expression);
        }

        let binder = ValueBinder {
            expressions: &condition.expressions,
        };
        let fragments = condition
            .operators
            .iter()
            .map(|op| {
                if !field.allows(op.operator) || !value_type.allows(op.operator) {
                    return Err(FilterError::DisallowedOperator {
                        field: field.name().to_string(),
                        operator: op.operator.to_string(),
                    });
                }
                lower(field.name(), &column, op.operator, &op.operand, &binder)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Predicate::and(fragments))
    }
}

/// Binds operands, reshaping them through the terminal expression
struct ValueBinder<'a> {
    expressions: &'a [Expression],
}

impl ValueBinder<'_> {
    fn bind(&self, value: &SqlValue) -> SqlExpr {
        let last = self.expressions.len().saturating_sub(1);
        self.expressions
            .iter()
            .enumerate()
            .fold(SqlExpr::Param(value.clone()), |expr, (i, expression)| {
                expression.function().transform_value(expr, i == last)
            })
    }
}

fn lower(
    name: &str,
    column: &SqlExpr,
    operator: Operator,
    operand: &Operand,
    binder: &ValueBinder<'_>,
) -> Result<Predicate, FilterError> {
    let compare = |op: CompareOp, value: &SqlValue| {
        Predicate::compare(column.clone(), op, binder.bind(value))
    };
    let like = |pattern: String, negated: bool| Predicate::Like {
        expr: column.clone(),
        pattern: binder.bind(&SqlValue::Text(pattern)),
        negated,
    };

    let predicate = match (operator, operand) {
        (Operator::Eq | Operator::NotEq, Operand::Value(SqlValue::Null)) => Predicate::IsNull {
            expr: column.clone(),
            negated: operator == Operator::NotEq,
        },
        (Operator::Eq, Operand::Value(v)) => compare(CompareOp::Eq, v),
        (Operator::NotEq, Operand::Value(v)) => compare(CompareOp::NotEq, v),
        (Operator::LessThan, Operand::Value(v)) => compare(CompareOp::Lt, v),
        (Operator::GreaterThan, Operand::Value(v)) => compare(CompareOp::Gt, v),
        (Operator::LessThanOrEqual, Operand::Value(v)) => compare(CompareOp::Lte, v),
        (Operator::GreaterThanOrEqual, Operand::Value(v)) => compare(CompareOp::Gte, v),
        (Operator::In | Operator::NotIn, Operand::List(values)) => Predicate::InList {
            expr: column.clone(),
            values: values.iter().map(|v| binder.bind(v)).collect(),
            negated: operator == Operator::NotIn,
        },
        (Operator::Range, Operand::Range { from, to }) => Predicate::And(vec![
            compare(CompareOp::Gte, from),
            compare(CompareOp::Lt, to),
        ]),
        (Operator::Range, Operand::Interval { low, high }) => Predicate::Between {
            expr: column.clone(),
            low: binder.bind(low),
            high: binder.bind(high),
        },
        (Operator::Contains, Operand::Pattern(s)) => {
            like(format!("%{}%", escape_like_pattern(s)), false)
        }
        (Operator::StartsWith, Operand::Pattern(s)) => {
            like(format!("{}%", escape_like_pattern(s)), false)
        }
        (Operator::EndsWith, Operand::Pattern(s)) => {
            like(format!("%{}", escape_like_pattern(s)), false)
        }
        (Operator::DoesNotContain, Operand::Pattern(s)) => {
            like(format!("%{}%", escape_like_pattern(s)), true)
        }
        (Operator::Null, Operand::Null(is_null)) => Predicate::IsNull {
            expr: column.clone(),
            negated: !is_null,
        },
        (operator, _) => {
            return Err(FilterError::invalid_value(
                name,
                format!("operand does not fit operator '{}'", operator),
            ));
        }
    };

    Ok(predicate)
}
