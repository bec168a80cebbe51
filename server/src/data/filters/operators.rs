//! Operator vocabulary
//!
//! The fixed set of operator names accepted inside a field condition-hash.

use std::fmt;

/// A field-level operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    In,
    NotIn,
    Range,
    Contains,
    StartsWith,
    EndsWith,
    DoesNotContain,
    Null,
}

impl Operator {
    /// Every operator, in canonical order
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::LessThanOrEqual,
        Operator::GreaterThanOrEqual,
        Operator::In,
        Operator::NotIn,
        Operator::Range,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::DoesNotContain,
        Operator::Null,
    ];

    /// Resolve an operator name, including its aliases
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "eq" | "equal" => Self::Eq,
            "not_eq" => Self::NotEq,
            "less_than" => Self::LessThan,
            "greater_than" => Self::GreaterThan,
            "less_than_or_equal" | "lteq" => Self::LessThanOrEqual,
            "greater_than_or_equal" | "gteq" => Self::GreaterThanOrEqual,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "range" => Self::Range,
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "does_not_contain" => Self::DoesNotContain,
            "null" => Self::Null,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::NotEq => "not_eq",
            Self::LessThan => "less_than",
            Self::GreaterThan => "greater_than",
            Self::LessThanOrEqual => "lteq",
            Self::GreaterThanOrEqual => "gteq",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Range => "range",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::DoesNotContain => "does_not_contain",
            Self::Null => "null",
        }
    }

    /// Comparison and range operators, legal only on ordered types
    pub fn requires_ordering(&self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::GreaterThan
                | Self::LessThanOrEqual
                | Self::GreaterThanOrEqual
                | Self::Range
        )
    }

    /// Pattern-match operators, legal only on string fields
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::StartsWith | Self::EndsWith | Self::DoesNotContain
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
