//! Catalog declarations
//!
//! Serializable form of a field catalog, as found in the config file.
//! Declarations are converted and validated once at startup.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::builder::JoinSpec;
use super::catalog::{FieldCatalog, FieldDescriptor, TimezoneSource, ValueType};
use super::convenience::{SearchShortcut, Shortcut};
use super::error::CatalogError;
use super::operators::Operator;
use super::sort::SortDirection;
use crate::core::constants::DEFAULT_PAGE_ITEMS;
use crate::utils::time::parse_timezone;

fn default_true() -> bool {
    true
}

/// Settings applied to declarations that leave them out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogDefaults {
    pub timezone: Tz,
    pub default_items: u32,
}

impl Default for CatalogDefaults {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            default_items: DEFAULT_PAGE_ITEMS,
        }
    }
}

/// One filterable field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub name: String,
    /// Physical column; defaults to `name`
    #[serde(default)]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Accepted operators; defaults to every operator legal for the type
    #[serde(default)]
    pub operators: Option<Vec<String>>,
    #[serde(default)]
    pub partial_match: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default)]
    pub association: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Timezone used by `local_time`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "lowercase", deny_unknown_fields)]
pub enum TimezoneDeclaration {
    Fixed { zone: String },
    Joined { join: JoinSpec, column: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SortDeclaration {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A resource catalog as declared in configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDeclaration {
    pub resource: String,
    pub table: String,
    pub fields: Vec<FieldDeclaration>,
    #[serde(default)]
    pub associations: Vec<JoinSpec>,
    #[serde(default)]
    pub timezone: Option<TimezoneDeclaration>,
    #[serde(default)]
    pub default_sort: Vec<SortDeclaration>,
    #[serde(default)]
    pub default_items: Option<u32>,
    #[serde(default)]
    pub shortcuts: Vec<Shortcut>,
    #[serde(default)]
    pub search: Option<SearchShortcut>,
}

impl CatalogDeclaration {
    /// Build and validate the catalog
    pub fn into_catalog(self, defaults: &CatalogDefaults) -> Result<FieldCatalog, CatalogError> {
        let resource = self.resource;
        let invalid = |message: String| CatalogError::Invalid {
            resource: resource.clone(),
            message,
        };

        let timezone = match self.timezone {
            None => TimezoneSource::Fixed(defaults.timezone),
            Some(TimezoneDeclaration::Fixed { zone }) => TimezoneSource::Fixed(
                parse_timezone(&zone).ok_or_else(|| invalid(format!("unknown timezone '{}'", zone)))?,
            ),
            Some(TimezoneDeclaration::Joined { join, column }) => {
                TimezoneSource::Joined { join, column }
            }
        };

        let mut fields = Vec::with_capacity(self.fields.len());
        for decl in self.fields {
            let column = decl.column.unwrap_or_else(|| decl.name.clone());
            let mut field = FieldDescriptor::new(decl.name, column, decl.value_type)
                .with_values(decl.values);
            if let Some(names) = decl.operators {
                let operators = names
                    .iter()
                    .map(|name| {
                        Operator::parse(name).ok_or_else(|| {
                            invalid(format!("field '{}': unknown operator '{}'", field.name(), name))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                field = field.with_operators(operators);
            }
            if decl.partial_match {
                field = field.partial_match();
            }
            if !decl.sortable {
                field = field.unsortable();
            }
            if let Some(association) = decl.association {
                field = field.via(association);
            }
            fields.push(field);
        }

        let mut builder = FieldCatalog::builder(resource.clone(), self.table)
            .timezone(timezone)
            .default_items(self.default_items.unwrap_or(defaults.default_items));
        for field in fields {
            builder = builder.field(field);
        }
        for join in self.associations {
            builder = builder.association(join);
        }
        for sort in self.default_sort {
            builder = builder.default_sort(sort.field, sort.direction);
        }
        for shortcut in self.shortcuts {
            builder = builder.shortcut(shortcut.param, shortcut.field);
        }
        if let Some(search) = self.search {
            builder = builder.search(search.param, search.fields);
        }

        builder.build()
    }
}
