//! Field catalogs
//!
//! A catalog is the per-resource allow-list of filterable fields. It is built
//! and validated once, then shared read-only; nothing outside a catalog can
//! reach generated SQL as an identifier.

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::builder::JoinSpec;
use super::convenience::{ConvenienceFilters, SearchShortcut, Shortcut};
use super::error::{CatalogError, FilterError};
use super::operators::Operator;
use super::predicate::SqlExpr;
use super::sort::{SortDirection, SortKey};
use crate::core::constants::{DEFAULT_PAGE_ITEMS, MAX_PAGE_ITEMS};
use crate::utils::sql::is_safe_identifier;

/// Declared value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
    Date,
    Time,
    Enum,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Enum => "enum",
        }
    }

    /// Types with a total order (comparisons and ranges apply)
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Datetime | Self::Date | Self::Time
        )
    }

    /// Whether `op` is meaningful for values of this type
    pub fn allows(&self, op: Operator) -> bool {
        if op.is_pattern() {
            return *self == Self::String;
        }
        if op.requires_ordering() {
            return self.is_ordered();
        }
        match self {
            Self::Boolean => matches!(op, Operator::Eq | Operator::NotEq | Operator::Null),
            _ => true,
        }
    }

    /// Every operator legal for this type, in canonical order
    pub fn legal_operators(&self) -> Vec<Operator> {
        Operator::ALL
            .into_iter()
            .filter(|op| self.allows(*op))
            .collect()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A filterable field of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    column: String,
    value_type: ValueType,
    operators: Vec<Operator>,
    partial_match: bool,
    sortable: bool,
    association: Option<String>,
    values: Vec<String>,
}

impl FieldDescriptor {
    /// A sortable field accepting every operator legal for `value_type`
    pub fn new(name: impl Into<String>, column: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            value_type,
            operators: value_type.legal_operators(),
            partial_match: false,
            sortable: true,
            association: None,
            values: Vec::new(),
        }
    }

    /// Restrict the accepted operators
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }

    /// Allowed values of an enum field
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Eligible for the search shortcut
    pub fn partial_match(mut self) -> Self {
        self.partial_match = true;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Column lives on an associated table joined on demand
    pub fn via(mut self, association: impl Into<String>) -> Self {
        self.association = Some(association.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn allows(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }

    pub fn is_partial_match(&self) -> bool {
        self.partial_match
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn association(&self) -> Option<&str> {
        self.association.as_deref()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn column_expr(&self) -> SqlExpr {
        SqlExpr::column(self.column.clone())
    }
}

/// Where the zone used by `local_time` comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TimezoneSource {
    /// Per-row zone name read from `column` of an auxiliary join
    Joined { join: JoinSpec, column: String },
    /// One zone for every row, bound as a parameter
    Fixed(Tz),
}

impl Default for TimezoneSource {
    fn default() -> Self {
        Self::Fixed(chrono_tz::UTC)
    }
}

impl TimezoneSource {
    /// Join that must be present for `zone_expr` to resolve
    pub fn join(&self) -> Option<&JoinSpec> {
        match self {
            Self::Joined { join, .. } => Some(join),
            Self::Fixed(_) => None,
        }
    }

    pub fn zone_expr(&self) -> SqlExpr {
        match self {
            Self::Joined { join, column } => {
                SqlExpr::column(format!("{}.{}", join.qualifier(), column))
            }
            Self::Fixed(tz) => SqlExpr::param(tz.name()),
        }
    }
}

/// Immutable schema of one resource
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    resource: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    index: FxHashMap<String, usize>,
    associations: FxHashMap<String, JoinSpec>,
    timezone: TimezoneSource,
    default_sort: Vec<SortKey>,
    default_items: u32,
    convenience: ConvenienceFilters,
}

impl FieldCatalog {
    pub fn builder(resource: impl Into<String>, table: impl Into<String>) -> FieldCatalogBuilder {
        FieldCatalogBuilder {
            resource: resource.into(),
            table: table.into(),
            fields: Vec::new(),
            associations: Vec::new(),
            timezone: TimezoneSource::default(),
            default_sort: Vec::new(),
            default_items: DEFAULT_PAGE_ITEMS,
            convenience: ConvenienceFilters::default(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Resolve a logical field name (case-sensitive)
    pub fn lookup(&self, name: &str) -> Result<&FieldDescriptor, FilterError> {
        self.index
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| FilterError::UnrecognizedField(name.to_string()))
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn association(&self, id: &str) -> Option<&JoinSpec> {
        self.associations.get(id)
    }

    pub fn timezone(&self) -> &TimezoneSource {
        &self.timezone
    }

    pub fn default_sort(&self) -> &[SortKey] {
        &self.default_sort
    }

    pub fn default_items(&self) -> u32 {
        self.default_items
    }

    pub fn convenience(&self) -> &ConvenienceFilters {
        &self.convenience
    }
}

/// Accumulates a catalog declaration; `build` validates it as a whole
#[derive(Debug)]
pub struct FieldCatalogBuilder {
    resource: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    associations: Vec<JoinSpec>,
    timezone: TimezoneSource,
    default_sort: Vec<SortKey>,
    default_items: u32,
    convenience: ConvenienceFilters,
}

impl FieldCatalogBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn association(mut self, join: JoinSpec) -> Self {
        self.associations.push(join);
        self
    }

    pub fn timezone(mut self, timezone: TimezoneSource) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn default_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.default_sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn default_items(mut self, items: u32) -> Self {
        self.default_items = items;
        self
    }

    /// Equality shortcut: query parameter `param` filters `field`
    pub fn shortcut(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.convenience.shortcuts.push(Shortcut {
            param: param.into(),
            field: field.into(),
        });
        self
    }

    /// Partial-match search across `fields`
    pub fn search<I, S>(mut self, param: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.convenience.search = Some(SearchShortcut {
            param: param.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn build(self) -> Result<FieldCatalog, CatalogError> {
        let resource = self.resource;
        let invalid = |message: String| CatalogError::Invalid {
            resource: resource.clone(),
            message,
        };
        let check_identifier = |identifier: &str| {
            if is_safe_identifier(identifier) {
                Ok(())
            } else {
                Err(CatalogError::InvalidIdentifier {
                    resource: resource.clone(),
                    identifier: identifier.to_string(),
                })
            }
        };

        if resource.is_empty() {
            return Err(invalid("resource name is empty".to_string()));
        }
        check_identifier(&self.table)?;

        let mut associations = FxHashMap::default();
        for join in self.associations {
            for identifier in join.identifiers() {
                check_identifier(identifier)?;
            }
            if associations.contains_key(&join.id) {
                return Err(invalid(format!("association '{}' is declared twice", join.id)));
            }
            associations.insert(join.id.clone(), join);
        }

        if let TimezoneSource::Joined { join, column } = &self.timezone {
            for identifier in join.identifiers() {
                check_identifier(identifier)?;
            }
            check_identifier(column)?;
        }

        let mut index = FxHashMap::default();
        for (i, field) in self.fields.iter().enumerate() {
            // Logical names double as condition keys, so they must not collide
            // with combinators or the expression prefix separator.
            if !is_safe_identifier(&field.name)
                || field.name.contains('.')
                || matches!(field.name.as_str(), "and" | "or" | "not")
            {
                return Err(invalid(format!("invalid field name '{}'", field.name)));
            }
            check_identifier(&field.column)?;
            if index.insert(field.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateField {
                    resource: resource.clone(),
                    field: field.name.clone(),
                });
            }
            if let Some(op) = field.operators.iter().find(|op| !field.value_type.allows(**op)) {
                return Err(CatalogError::IllegalOperator {
                    resource: resource.clone(),
                    field: field.name.clone(),
                    operator: op.to_string(),
                    value_type: field.value_type,
                });
            }
            if let Some(association) = &field.association
                && !associations.contains_key(association)
            {
                return Err(CatalogError::UnknownAssociation {
                    resource: resource.clone(),
                    field: field.name.clone(),
                    association: association.clone(),
                });
            }
            match field.value_type {
                ValueType::Enum if field.values.is_empty() => {
                    return Err(invalid(format!(
                        "enum field '{}' declares no values",
                        field.name
                    )));
                }
                ValueType::Enum => {}
                _ if !field.values.is_empty() => {
                    return Err(invalid(format!(
                        "only enum fields may declare values, '{}' is {}",
                        field.name, field.value_type
                    )));
                }
                _ => {}
            }
            if field.partial_match && field.value_type != ValueType::String {
                return Err(invalid(format!(
                    "partial match requires a string field, '{}' is {}",
                    field.name, field.value_type
                )));
            }
        }

        let find = |name: &str| index.get(name).map(|&i| &self.fields[i]);

        for shortcut in &self.convenience.shortcuts {
            if find(&shortcut.field).is_none() {
                return Err(invalid(format!(
                    "shortcut '{}' references unknown field '{}'",
                    shortcut.param, shortcut.field
                )));
            }
        }
        if let Some(search) = &self.convenience.search {
            if search.fields.is_empty() {
                return Err(invalid(format!("search '{}' lists no fields", search.param)));
            }
            for name in &search.fields {
                match find(name) {
                    Some(field) if field.partial_match && field.allows(Operator::Contains) => {}
                    Some(_) => {
                        return Err(invalid(format!(
                            "search field '{}' is not partial-match eligible",
                            name
                        )));
                    }
                    None => {
                        return Err(invalid(format!(
                            "search '{}' references unknown field '{}'",
                            search.param, name
                        )));
                    }
                }
            }
        }
        for key in &self.default_sort {
            match find(&key.field) {
                Some(field) if field.sortable => {}
                _ => {
                    return Err(invalid(format!(
                        "default sort field '{}' is unknown or unsortable",
                        key.field
                    )));
                }
            }
        }
        if !(1..=MAX_PAGE_ITEMS).contains(&self.default_items) {
            return Err(invalid(format!(
                "default items must be between 1 and {}",
                MAX_PAGE_ITEMS
            )));
        }

        Ok(FieldCatalog {
            resource,
            table: self.table,
            fields: self.fields,
            index,
            associations,
            timezone: self.timezone,
            default_sort: self.default_sort,
            default_items: self.default_items,
            convenience: self.convenience,
        })
    }
}

/// Read-only set of catalogs keyed by resource name
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    catalogs: FxHashMap<String, Arc<FieldCatalog>>,
}

impl CatalogRegistry {
    pub fn build(catalogs: impl IntoIterator<Item = FieldCatalog>) -> Result<Self, CatalogError> {
        let mut registry = FxHashMap::default();
        for catalog in catalogs {
            let resource = catalog.resource.clone();
            if registry.insert(resource.clone(), Arc::new(catalog)).is_some() {
                return Err(CatalogError::DuplicateResource(resource));
            }
        }
        tracing::debug!(resources = registry.len(), "Field catalogs registered");
        Ok(Self {
            catalogs: registry,
        })
    }

    pub fn catalog(&self, resource: &str) -> Result<&Arc<FieldCatalog>, FilterError> {
        self.catalogs
            .get(resource)
            .ok_or_else(|| FilterError::UnrecognizedResource(resource.to_string()))
    }

    pub fn lookup(&self, resource: &str, name: &str) -> Result<&FieldDescriptor, FilterError> {
        self.catalog(resource)?.lookup(name)
    }

    /// Registered resource names, sorted
    pub fn resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls() -> FieldCatalogBuilder {
        FieldCatalog::builder("calls", "calls")
            .field(FieldDescriptor::new("id", "id", ValueType::Integer))
            .field(FieldDescriptor::new("notes", "notes", ValueType::String).partial_match())
            .field(
                FieldDescriptor::new("agent_name", "agents.name", ValueType::String)
                    .partial_match()
                    .via("agent"),
            )
            .association(JoinSpec::left("agent", "agents", "id", "calls.agent_id"))
    }

    #[test]
    fn test_value_type_operator_legality() {
        assert!(ValueType::Integer.allows(Operator::Range));
        assert!(ValueType::Time.allows(Operator::LessThan));
        assert!(!ValueType::Integer.allows(Operator::Contains));
        assert!(!ValueType::String.allows(Operator::GreaterThan));
        assert!(ValueType::String.allows(Operator::DoesNotContain));
        assert!(!ValueType::Boolean.allows(Operator::In));
        assert!(ValueType::Boolean.allows(Operator::Null));
        assert!(!ValueType::Enum.allows(Operator::StartsWith));
        assert!(ValueType::Enum.allows(Operator::NotIn));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let catalog = calls().build().unwrap();

        assert_eq!(catalog.lookup("notes").unwrap().column(), "notes");
        assert_eq!(
            catalog.lookup("Notes"),
            Err(FilterError::UnrecognizedField("Notes".to_string()))
        );
    }

    #[test]
    fn test_default_operators_follow_type() {
        let catalog = calls().build().unwrap();
        let id = catalog.lookup("id").unwrap();

        assert!(id.allows(Operator::GreaterThanOrEqual));
        assert!(!id.allows(Operator::Contains));
        assert_eq!(id.operators(), ValueType::Integer.legal_operators());
    }

    #[test]
    fn test_build_rejects_illegal_operator() {
        let err = calls()
            .field(
                FieldDescriptor::new("recording", "recording", ValueType::Boolean)
                    .with_operators([Operator::Eq, Operator::Contains]),
            )
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::IllegalOperator { ref operator, value_type: ValueType::Boolean, .. }
                if operator == "contains"
        ));
    }

    #[test]
    fn test_build_rejects_unsafe_column() {
        let err = calls()
            .field(FieldDescriptor::new("evil", "notes; DROP TABLE calls", ValueType::String))
            .build()
            .unwrap_err();

        assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_and_reserved_names() {
        let duplicate = calls()
            .field(FieldDescriptor::new("id", "other_id", ValueType::Integer))
            .build()
            .unwrap_err();
        assert!(matches!(duplicate, CatalogError::DuplicateField { ref field, .. } if field == "id"));

        let reserved = calls()
            .field(FieldDescriptor::new("not", "not_col", ValueType::Integer))
            .build()
            .unwrap_err();
        assert!(matches!(reserved, CatalogError::Invalid { .. }));
    }

    #[test]
    fn test_build_rejects_unknown_association() {
        let err = FieldCatalog::builder("calls", "calls")
            .field(FieldDescriptor::new("agent_name", "agents.name", ValueType::String).via("agent"))
            .build()
            .unwrap_err();

        assert!(matches!(err, CatalogError::UnknownAssociation { ref association, .. } if association == "agent"));
    }

    #[test]
    fn test_build_validates_enum_values_and_search() {
        let no_values = calls()
            .field(FieldDescriptor::new("status", "status", ValueType::Enum))
            .build();
        assert!(no_values.is_err());

        let bad_search = calls().search("q", ["id"]).build();
        assert!(bad_search.is_err());

        let good_search = calls().search("q", ["notes", "agent_name"]).build();
        assert!(good_search.is_ok());
    }

    #[test]
    fn test_build_validates_default_sort() {
        let unsortable = calls()
            .field(FieldDescriptor::new("body", "body", ValueType::String).unsortable())
            .default_sort("body", SortDirection::Asc)
            .build();
        assert!(unsortable.is_err());

        let catalog = calls()
            .default_sort("id", SortDirection::Desc)
            .build()
            .unwrap();
        assert_eq!(catalog.default_sort()[0].field, "id");
    }

    #[test]
    fn test_timezone_zone_expr() {
        let fixed = TimezoneSource::Fixed(chrono_tz::Europe::Berlin);
        assert_eq!(fixed.zone_expr(), SqlExpr::param("Europe/Berlin"));
        assert!(fixed.join().is_none());

        let joined = TimezoneSource::Joined {
            join: JoinSpec::left("local_timezone", "account_settings", "account_id", "calls.account_id")
                .with_alias("local_tz"),
            column: "time_zone".to_string(),
        };
        assert_eq!(joined.zone_expr(), SqlExpr::column("local_tz.time_zone"));
        assert_eq!(joined.join().map(|j| j.id.as_str()), Some("local_timezone"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CatalogRegistry::build([calls().build().unwrap()]).unwrap();

        assert_eq!(registry.resources(), vec!["calls"]);
        assert_eq!(registry.lookup("calls", "id").unwrap().name(), "id");
        assert_eq!(
            registry.lookup("contacts", "id"),
            Err(FilterError::UnrecognizedResource("contacts".to_string()))
        );
        assert_eq!(
            registry.lookup("calls", "secret"),
            Err(FilterError::UnrecognizedField("secret".to_string()))
        );
    }

    #[test]
    fn test_registry_rejects_duplicate_resource() {
        let err = CatalogRegistry::build([calls().build().unwrap(), calls().build().unwrap()])
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateResource("calls".to_string()));
    }
}
