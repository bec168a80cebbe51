//! Convenience filters
//!
//! Simple named query parameters declared per resource: equality shortcuts
//! (`?status=completed`) and one partial-match search across several string
//! fields (`?q=smith`). They are lowered into the same condition nodes the
//! parser produces and ANDed with the primary filter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::FieldCatalog;
use super::error::FilterError;
use super::operators::Operator;
use super::parser::Coercion;
use super::types::{ConditionTree, FieldCondition, Operand};

/// Equality shortcut: `param` filters `field`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Shortcut {
    pub param: String,
    pub field: String,
}

/// Case-insensitive substring search across `fields`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchShortcut {
    pub param: String,
    pub fields: Vec<String>,
}

/// Convenience parameters declared for a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvenienceFilters {
    pub shortcuts: Vec<Shortcut>,
    pub search: Option<SearchShortcut>,
}

impl ConvenienceFilters {
    /// Declared parameter names, shortcuts first
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.shortcuts
            .iter()
            .map(|s| s.param.as_str())
            .chain(self.search.iter().map(|s| s.param.as_str()))
    }

    /// Lower the supplied parameters into one condition node
    ///
    /// Shortcuts are visited in declaration order, then the search. Absent or
    /// empty parameters are skipped and undeclared ones ignored. Returns `None`
    /// when nothing applies.
    pub fn to_condition(
        &self,
        catalog: &FieldCatalog,
        params: &Map<String, Value>,
    ) -> Result<Option<ConditionTree>, FilterError> {
        let mut nodes = Vec::new();

        for shortcut in &self.shortcuts {
            let Some(value) = params.get(&shortcut.param).filter(|v| !is_blank(v)) else {
                continue;
            };
            nodes.push(equality(catalog, &shortcut.field, value)?);
        }

        if let Some(search) = &self.search
            && let Some(value) = params.get(&search.param).filter(|v| !is_blank(v))
        {
            let term = value.as_str().ok_or_else(|| {
                FilterError::invalid_value(&search.param, "search term must be a string")
            })?;
            let mut matches: Vec<ConditionTree> = search
                .fields
                .iter()
                .map(|field| {
                    FieldCondition::new(field.as_str())
                        .with(Operator::Contains, Operand::Pattern(term.to_string()))
                        .into()
                })
                .collect();
            nodes.push(if matches.len() == 1 {
                matches.remove(0)
            } else {
                ConditionTree::or(matches)
            });
        }

        tracing::trace!(conditions = nodes.len(), "Applied convenience filters");

        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(ConditionTree::and(nodes)),
        })
    }
}

/// `eq` for a scalar, `in` for an array
fn equality(catalog: &FieldCatalog, name: &str, value: &Value) -> Result<ConditionTree, FilterError> {
    let field = catalog.lookup(name)?;
    let coercion = Coercion::new(field, field.value_type());

    let (operator, operand) = match value {
        Value::Array(items) => (
            Operator::In,
            Operand::List(
                items
                    .iter()
                    .map(|item| coercion.param(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        ),
        scalar => (Operator::Eq, Operand::Value(coercion.param(scalar)?)),
    };

    if !field.allows(operator) {
        return Err(FilterError::DisallowedOperator {
            field: name.to_string(),
            operator: operator.to_string(),
        });
    }

    Ok(FieldCondition::new(name).with(operator, operand).into())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
