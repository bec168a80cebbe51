//! Filter error types
//!
//! Every failure is raised while parsing or compiling, before any query runs.
//! Messages are meant to be shown to API clients verbatim.

use std::fmt;

use thiserror::Error;

use super::catalog::ValueType;

/// Why a `range` operand was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeDefect {
    MissingFrom,
    MissingTo,
    BothBoundsAndInterval,
    Neither,
    UnknownKey(String),
    BadInterval,
}

impl fmt::Display for RangeDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFrom => write!(f, "'to' was given without 'from'"),
            Self::MissingTo => write!(f, "'from' was given without 'to'"),
            Self::BothBoundsAndInterval => {
                write!(f, "use either 'from'/'to' or 'interval', not both")
            }
            Self::Neither => write!(f, "expected either 'from'/'to' or 'interval'"),
            Self::UnknownKey(key) => write!(f, "unknown key '{}'", key),
            Self::BadInterval => write!(
                f,
                "'interval' must be a \"start..end\" string or a [start, end] pair"
            ),
        }
    }
}

/// Errors raised while parsing or compiling a filter request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unrecognized field: {0}")]
    UnrecognizedField(String),

    #[error("Unrecognized operator: {0}")]
    UnrecognizedOperator(String),

    #[error("Unrecognized combinator: {0}")]
    UnrecognizedCombinator(String),

    #[error("Combinator requires at least 2 conditions, got {0}")]
    CombinatorArity(usize),

    #[error("Condition for '{0}' has no operators")]
    EmptyCondition(String),

    #[error("Malformed range for '{field}': {defect}")]
    MalformedRange { field: String, defect: RangeDefect },

    #[error("Expression '{expression}' cannot be applied to {value_type} field '{field}'")]
    IncompatibleExpression {
        expression: String,
        field: String,
        value_type: ValueType,
    },

    #[error("Unrecognized expression: {0}")]
    UnrecognizedExpression(String),

    #[error("Expression '{expression}' is not supported by the {dialect} backend")]
    UnsupportedExpression { expression: String, dialect: String },

    #[error("Unrecognized resource: {0}")]
    UnrecognizedResource(String),

    #[error("Operator '{operator}' is not allowed on field '{field}'")]
    DisallowedOperator { field: String, operator: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Cannot sort by field: {0}")]
    UnsortableField(String),

    #[error("Invalid sort direction '{0}'. Use 'asc' or 'desc'")]
    InvalidSortDirection(String),

    #[error("Invalid paging: {0}")]
    InvalidPaging(String),

    #[error("Malformed filter request: {0}")]
    MalformedRequest(String),

    #[error("Filter request exceeds maximum size of {max_bytes} bytes")]
    RequestTooLarge { max_bytes: usize },

    #[error("Filter nesting exceeds maximum depth of {0}")]
    FilterTooDeep(usize),
}

impl FilterError {
    pub(crate) fn malformed_range(field: &str, defect: RangeDefect) -> Self {
        Self::MalformedRange {
            field: field.to_string(),
            defect,
        }
    }

    pub(crate) fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnrecognizedField(_) => "UNRECOGNIZED_FIELD",
            Self::UnrecognizedOperator(_) => "UNRECOGNIZED_OPERATOR",
            Self::UnrecognizedCombinator(_) => "UNRECOGNIZED_COMBINATOR",
            Self::CombinatorArity(_) => "COMBINATOR_ARITY",
            Self::EmptyCondition(_) => "EMPTY_CONDITION",
            Self::MalformedRange { .. } => "MALFORMED_RANGE",
            Self::IncompatibleExpression { .. } => "INCOMPATIBLE_EXPRESSION",
            Self::UnrecognizedExpression(_) => "UNRECOGNIZED_EXPRESSION",
            Self::UnsupportedExpression { .. } => "UNSUPPORTED_EXPRESSION",
            Self::UnrecognizedResource(_) => "UNRECOGNIZED_RESOURCE",
            Self::DisallowedOperator { .. } => "DISALLOWED_OPERATOR",
            Self::InvalidValue { .. } => "INVALID_FILTER_VALUE",
            Self::UnsortableField(_) => "UNSORTABLE_FIELD",
            Self::InvalidSortDirection(_) => "INVALID_SORT_DIRECTION",
            Self::InvalidPaging(_) => "INVALID_PAGING",
            Self::MalformedRequest(_) => "MALFORMED_FILTER",
            Self::RequestTooLarge { .. } => "FILTER_TOO_LARGE",
            Self::FilterTooDeep(_) => "FILTER_TOO_DEEP",
        }
    }
}

/// Errors raised while registering a resource catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Resource '{resource}': invalid identifier '{identifier}'")]
    InvalidIdentifier {
        resource: String,
        identifier: String,
    },

    #[error("Resource '{resource}': field '{field}' is declared twice")]
    DuplicateField { resource: String, field: String },

    #[error("Resource '{resource}': operator '{operator}' is not legal for {value_type} field '{field}'")]
    IllegalOperator {
        resource: String,
        field: String,
        operator: String,
        value_type: ValueType,
    },

    #[error("Resource '{resource}': field '{field}' references unknown association '{association}'")]
    UnknownAssociation {
        resource: String,
        field: String,
        association: String,
    },

    #[error("Resource '{resource}': {message}")]
    Invalid { resource: String, message: String },

    #[error("Resource '{0}' is registered twice")]
    DuplicateResource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_includes_count() {
        let err = FilterError::CombinatorArity(1);
        assert_eq!(
            err.to_string(),
            "Combinator requires at least 2 conditions, got 1"
        );
        assert_eq!(err.code(), "COMBINATOR_ARITY");
    }

    #[test]
    fn range_defects_have_distinct_messages() {
        let defects = [
            RangeDefect::MissingFrom,
            RangeDefect::MissingTo,
            RangeDefect::BothBoundsAndInterval,
            RangeDefect::Neither,
        ];
        let messages: Vec<String> = defects
            .into_iter()
            .map(|d| FilterError::malformed_range("started_at", d).to_string())
            .collect();
        for (i, a) in messages.iter().enumerate() {
            assert!(a.starts_with("Malformed range for 'started_at': "));
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn incompatible_expression_names_type() {
        let err = FilterError::IncompatibleExpression {
            expression: "local_time".to_string(),
            field: "duration_seconds".to_string(),
            value_type: ValueType::Integer,
        };
        assert_eq!(
            err.to_string(),
            "Expression 'local_time' cannot be applied to integer field 'duration_seconds'"
        );
    }
}
