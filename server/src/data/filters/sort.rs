//! Sort and paging directives

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::builder::QueryBuilder;
use super::catalog::FieldCatalog;
use super::compiler::field_reference;
use super::error::FilterError;
use super::predicate::SqlExpr;
use crate::core::constants::MAX_PAGE_ITEMS;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `asc` / `desc` (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(FilterError::InvalidSortDirection(s.to_string())),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// A validated sort directive on a logical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// A lowered ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SortEntry {
    order_by: String,
    #[serde(default)]
    direction: Option<String>,
}

/// Parse a `sort` value: one `{order_by, direction}` object or an array of them
pub fn parse_sort(value: &Value, catalog: &FieldCatalog) -> Result<Vec<SortKey>, FilterError> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => {
            return Err(FilterError::malformed(
                "'sort' must be an object or an array of objects",
            ));
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            let entry: SortEntry = serde_json::from_value(entry.clone())
                .map_err(|e| FilterError::malformed(format!("invalid sort entry: {}", e)))?;
            let field = catalog.lookup(&entry.order_by)?;
            if !field.is_sortable() {
                return Err(FilterError::UnsortableField(entry.order_by));
            }
            let direction = match entry.direction.as_deref() {
                Some(direction) => SortDirection::parse(direction)?,
                None => SortDirection::default(),
            };
            Ok(SortKey {
                field: entry.order_by,
                direction,
            })
        })
        .collect()
}

/// Lower sort keys to ORDER BY items, joining associations as needed
pub fn compile_order(
    keys: &[SortKey],
    catalog: &FieldCatalog,
    query: &mut QueryBuilder,
) -> Result<Vec<OrderBy>, FilterError> {
    keys.iter()
        .map(|key| {
            let field = catalog.lookup(&key.field)?;
            Ok(OrderBy {
                expr: field_reference(field, catalog, query),
                direction: key.direction,
            })
        })
        .collect()
}

pub fn default_page() -> u32 {
    1
}

/// Validator function for page parameter
pub fn validate_page(page: u32) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::new("page_min").with_message("page must be >= 1".into()));
    }
    Ok(())
}

/// Raw `paging` directive
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PagingSpec {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,
    #[serde(default)]
    #[validate(range(min = 1, max = 500, message = "items must be between 1 and 500"))]
    pub items: Option<u32>,
}

impl Default for PagingSpec {
    fn default() -> Self {
        Self {
            page: default_page(),
            items: None,
        }
    }
}

/// Resolved LIMIT/OFFSET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub limit: u32,
    pub offset: u64,
}

impl PagingSpec {
    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        let spec: PagingSpec = serde_json::from_value(value.clone())
            .map_err(|e| FilterError::InvalidPaging(e.to_string()))?;
        spec.validate()
            .map_err(|e| FilterError::InvalidPaging(format_validation_errors(&e)))?;
        Ok(spec)
    }

    /// `offset = (page - 1) * items`, falling back to `default_items`
    pub fn resolve(&self, default_items: u32) -> Paging {
        let limit = self.items.unwrap_or(default_items).min(MAX_PAGE_ITEMS);
        Paging {
            limit,
            offset: u64::from(self.page.saturating_sub(1)) * u64::from(limit),
        }
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
