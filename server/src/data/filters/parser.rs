//! Filter parsing
//!
//! Parses JSON filter requests into validated condition trees. Every field,
//! operator, expression and operand is checked against the resource catalog
//! here; the compiler only ever sees trees that passed validation.

use serde_json::{Map, Value};

use super::catalog::{FieldCatalog, FieldDescriptor, ValueType};
use super::error::{FilterError, RangeDefect};
use super::expressions::{chain_type, split_field_key};
use super::operators::Operator;
use super::predicate::SqlValue;
use super::sort::{PagingSpec, SortKey, parse_sort};
use super::types::{
    CombinatorKind, ConditionTree, FieldCondition, FilterTree, Operand, OperatorCondition,
};
use crate::core::constants::{DEFAULT_MAX_FILTER_DEPTH, MAX_FILTER_JSON_SIZE};
use crate::utils::time::{is_date_literal, is_datetime_literal, is_time_literal};

/// Size and nesting limits applied while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum number of nested combinators
    pub max_depth: usize,
    /// Maximum size of raw request JSON in bytes
    pub max_request_bytes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_FILTER_DEPTH,
            max_request_bytes: MAX_FILTER_JSON_SIZE,
        }
    }
}

/// A parsed filter request
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub filter: FilterTree,
    /// `None` when the request carries no `sort` (catalog default applies)
    pub sort: Option<Vec<SortKey>>,
    pub paging: PagingSpec,
    /// Logical names to project; `None` selects the base query's columns
    pub fields: Option<Vec<String>>,
}

/// Parse a filter request from raw JSON text
///
/// Validates the JSON size before deserializing.
pub fn parse_filters(
    json_str: &str,
    catalog: &FieldCatalog,
    limits: &ParseLimits,
) -> Result<FilterRequest, FilterError> {
    if json_str.len() > limits.max_request_bytes {
        return Err(FilterError::RequestTooLarge {
            max_bytes: limits.max_request_bytes,
        });
    }

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| FilterError::malformed(format!("invalid JSON: {}", e)))?;

    parse_request(&value, catalog, limits)
}

/// Parse an already deserialized filter request
pub fn parse_request(
    value: &Value,
    catalog: &FieldCatalog,
    limits: &ParseLimits,
) -> Result<FilterRequest, FilterError> {
    let request = value
        .as_object()
        .ok_or_else(|| FilterError::malformed("request must be a JSON object"))?;

    if let Some(key) = request
        .keys()
        .find(|k| !matches!(k.as_str(), "filter" | "sort" | "paging" | "fields"))
    {
        return Err(FilterError::malformed(format!(
            "unknown key '{}' (expected filter, sort, paging, fields)",
            key
        )));
    }

    let filter = match request.get("filter") {
        Some(Value::Object(map)) => Parser { catalog, limits }.parse_root(map)?,
        Some(_) => return Err(FilterError::malformed("'filter' must be an object")),
        None => return Err(FilterError::malformed("missing required key 'filter'")),
    };

    let sort = match request.get("sort") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_sort(value, catalog)?),
    };

    let paging = match request.get("paging") {
        None | Some(Value::Null) => PagingSpec::default(),
        Some(value) => PagingSpec::parse(value)?,
    };

    let fields = match request.get("fields") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_projection(value, catalog)?),
    };

    Ok(FilterRequest {
        filter,
        sort,
        paging,
        fields,
    })
}

fn parse_projection(value: &Value, catalog: &FieldCatalog) -> Result<Vec<String>, FilterError> {
    let names = value
        .as_array()
        .filter(|names| !names.is_empty())
        .ok_or_else(|| FilterError::malformed("'fields' must be a non-empty array of names"))?;

    names
        .iter()
        .map(|name| {
            let name = name
                .as_str()
                .ok_or_else(|| FilterError::malformed("'fields' entries must be strings"))?;
            catalog.lookup(name)?;
            Ok(name.to_string())
        })
        .collect()
}

struct Parser<'a> {
    catalog: &'a FieldCatalog,
    limits: &'a ParseLimits,
}

impl Parser<'_> {
    fn parse_root(&self, map: &Map<String, Value>) -> Result<FilterTree, FilterError> {
        Ok(FilterTree {
            conditions: self.parse_map(map, 0)?,
        })
    }

    /// One node per key, in key order
    fn parse_map(
        &self,
        map: &Map<String, Value>,
        depth: usize,
    ) -> Result<Vec<ConditionTree>, FilterError> {
        map.iter()
            .map(|(key, value)| match CombinatorKind::parse(key) {
                Some(kind) => self.parse_combinator(kind, value, depth + 1),
                None if value.is_array() => Err(FilterError::UnrecognizedCombinator(key.clone())),
                None => self.parse_field(key, value).map(ConditionTree::Field),
            })
            .collect()
    }

    fn parse_combinator(
        &self,
        kind: CombinatorKind,
        value: &Value,
        depth: usize,
    ) -> Result<ConditionTree, FilterError> {
        if depth > self.limits.max_depth {
            return Err(FilterError::FilterTooDeep(self.limits.max_depth));
        }

        let entries = value.as_array().ok_or_else(|| {
            FilterError::malformed(format!("'{}' must be an array of conditions", kind.as_str()))
        })?;
        if entries.len() < 2 {
            return Err(FilterError::CombinatorArity(entries.len()));
        }

        let children = entries
            .iter()
            .map(|entry| self.parse_entry(kind, entry, depth))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConditionTree::Combinator { kind, children })
    }

    /// A combinator entry; several keys form an implicit AND group
    fn parse_entry(
        &self,
        kind: CombinatorKind,
        entry: &Value,
        depth: usize,
    ) -> Result<ConditionTree, FilterError> {
        let map = entry.as_object().ok_or_else(|| {
            FilterError::malformed(format!("'{}' entries must be objects", kind.as_str()))
        })?;
        if map.is_empty() {
            return Err(FilterError::EmptyCondition(kind.as_str().to_string()));
        }

        let mut nodes = self.parse_map(map, depth)?;
        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else {
            Ok(ConditionTree::and(nodes))
        }
    }

    fn parse_field(&self, key: &str, value: &Value) -> Result<FieldCondition, FilterError> {
        let (name, expressions) = split_field_key(key)?;
        let field = self.catalog.lookup(name)?;

        let value_type = chain_type(field, &expressions)?;

        let hash = value.as_object().ok_or_else(|| {
            FilterError::malformed(format!("condition for '{}' must be an object of operators", key))
        })?;
        if hash.is_empty() {
            return Err(FilterError::EmptyCondition(key.to_string()));
        }

        let coercion = Coercion::new(field, value_type);
        let operators = hash
            .iter()
            .map(|(op_name, operand)| {
                let operator = Operator::parse(op_name)
                    .ok_or_else(|| FilterError::UnrecognizedOperator(op_name.clone()))?;
                if !field.allows(operator) || !value_type.allows(operator) {
                    return Err(FilterError::DisallowedOperator {
                        field: name.to_string(),
                        operator: op_name.clone(),
                    });
                }
                Ok(OperatorCondition {
                    operator,
                    operand: coercion.operand(operator, operand)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FieldCondition {
            field: name.to_string(),
            expressions,
            operators,
        })
    }
}

/// Converts client values to bound values of a field's effective type
pub(crate) struct Coercion<'a> {
    field: &'a FieldDescriptor,
    value_type: ValueType,
}

impl<'a> Coercion<'a> {
    pub(crate) fn new(field: &'a FieldDescriptor, value_type: ValueType) -> Self {
        Self { field, value_type }
    }

    fn invalid(&self, message: impl Into<String>) -> FilterError {
        FilterError::invalid_value(self.field.name(), message)
    }

    /// Operand of `operator`, shaped and typed
    fn operand(&self, operator: Operator, value: &Value) -> Result<Operand, FilterError> {
        match operator {
            Operator::Eq | Operator::NotEq if value.is_null() => Ok(Operand::Value(SqlValue::Null)),
            Operator::In | Operator::NotIn => {
                let items = value.as_array().ok_or_else(|| {
                    self.invalid(format!("'{}' expects an array of values", operator))
                })?;
                Ok(Operand::List(self.list(items)?))
            }
            Operator::Range => self.range(value),
            Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::DoesNotContain => value
                .as_str()
                .map(|s| Operand::Pattern(s.to_string()))
                .ok_or_else(|| self.invalid(format!("'{}' expects a string", operator))),
            Operator::Null => value
                .as_bool()
                .map(Operand::Null)
                .ok_or_else(|| self.invalid("'null' expects true or false")),
            _ => Ok(Operand::Value(self.value(value)?)),
        }
    }

    fn list(&self, items: &[Value]) -> Result<Vec<SqlValue>, FilterError> {
        items.iter().map(|item| self.value(item)).collect()
    }

    /// A query parameter value: strings are read as text of the field type
    pub(crate) fn param(&self, value: &Value) -> Result<SqlValue, FilterError> {
        match value {
            Value::String(s) => self.text(s),
            other => self.value(other),
        }
    }

    fn range(&self, value: &Value) -> Result<Operand, FilterError> {
        let name = self.field.name();
        let map = value
            .as_object()
            .ok_or_else(|| FilterError::malformed_range(name, RangeDefect::Neither))?;

        if let Some(key) = map
            .keys()
            .find(|k| !matches!(k.as_str(), "from" | "to" | "interval"))
        {
            return Err(FilterError::malformed_range(
                name,
                RangeDefect::UnknownKey(key.clone()),
            ));
        }

        match (map.get("from"), map.get("to"), map.get("interval")) {
            (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => Err(FilterError::malformed_range(
                name,
                RangeDefect::BothBoundsAndInterval,
            )),
            (Some(from), Some(to), None) => Ok(Operand::Range {
                from: self.value(from)?,
                to: self.value(to)?,
            }),
            (Some(_), None, None) => Err(FilterError::malformed_range(name, RangeDefect::MissingTo)),
            (None, Some(_), None) => {
                Err(FilterError::malformed_range(name, RangeDefect::MissingFrom))
            }
            (None, None, Some(interval)) => self.interval(interval),
            (None, None, None) => Err(FilterError::malformed_range(name, RangeDefect::Neither)),
        }
    }

    /// `"low..high"` or `[low, high]`
    fn interval(&self, value: &Value) -> Result<Operand, FilterError> {
        let bad = || FilterError::malformed_range(self.field.name(), RangeDefect::BadInterval);
        let (low, high) = match value {
            Value::String(s) => {
                let (low, high) = s.split_once("..").ok_or_else(bad)?;
                let (low, high) = (low.trim(), high.trim());
                if low.is_empty() || high.is_empty() {
                    return Err(bad());
                }
                (self.text(low)?, self.text(high)?)
            }
            Value::Array(bounds) if bounds.len() == 2 => {
                (self.value(&bounds[0])?, self.value(&bounds[1])?)
            }
            _ => return Err(bad()),
        };
        Ok(Operand::Interval { low, high })
    }

    /// A JSON scalar of the effective type
    fn value(&self, value: &Value) -> Result<SqlValue, FilterError> {
        match (self.value_type, value) {
            (ValueType::Integer, Value::Number(n)) => n
                .as_i64()
                .map(SqlValue::Integer)
                .ok_or_else(|| self.invalid(format!("{} is not an integer", n))),
            (ValueType::Float, Value::Number(n)) => n
                .as_f64()
                .map(SqlValue::Float)
                .ok_or_else(|| self.invalid(format!("{} is not a number", n))),
            (ValueType::Boolean, Value::Bool(b)) => Ok(SqlValue::Bool(*b)),
            (ValueType::Integer | ValueType::Float | ValueType::Boolean, _) => {
                Err(self.invalid(format!("expected a {} value", self.value_type)))
            }
            (_, Value::String(s)) => self.text(s),
            _ => Err(self.invalid(format!("expected a {} value", self.value_type))),
        }
    }

    /// A textual value (interval bound or query parameter) of the effective type
    fn text(&self, s: &str) -> Result<SqlValue, FilterError> {
        let valid = match self.value_type {
            ValueType::Integer => {
                return s
                    .parse::<i64>()
                    .map(SqlValue::Integer)
                    .map_err(|_| self.invalid(format!("'{}' is not an integer", s)));
            }
            ValueType::Float => {
                return s
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .map(SqlValue::Float)
                    .ok_or_else(|| self.invalid(format!("'{}' is not a number", s)));
            }
            ValueType::Boolean => {
                return match s {
                    "true" => Ok(SqlValue::Bool(true)),
                    "false" => Ok(SqlValue::Bool(false)),
                    _ => Err(self.invalid(format!("'{}' is not a boolean", s))),
                };
            }
            ValueType::Enum => {
                if !self.field.values().iter().any(|v| v == s) {
                    return Err(self.invalid(format!(
                        "'{}' is not one of: {}",
                        s,
                        self.field.values().join(", ")
                    )));
                }
                true
            }
            ValueType::String => true,
            ValueType::Datetime => is_datetime_literal(s),
            ValueType::Date => is_date_literal(s),
            ValueType::Time => is_time_literal(s),
        };

        if valid {
            Ok(SqlValue::Text(s.to_string()))
        } else {
            Err(self.invalid(format!("'{}' is not a valid {}", s, self.value_type)))
        }
    }
}
