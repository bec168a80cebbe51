//! Condition tree types
//!
//! The validated, typed form of a filter. Produced by the parser and by the
//! convenience adapter, consumed by the compiler. Carries no SQL.

use super::expressions::Expression;
use super::operators::Operator;
use super::predicate::SqlValue;

/// Boolean grouping kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    And,
    Or,
    /// Negation of the conjunction of the children
    Not,
}

impl CombinatorKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

/// Operand of a single operator, already checked against the field type
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Scalar for comparisons; `SqlValue::Null` for `eq: null` / `not_eq: null`
    Value(SqlValue),
    List(Vec<SqlValue>),
    /// Half-open `[from, to)`
    Range { from: SqlValue, to: SqlValue },
    /// Inclusive `BETWEEN low AND high`
    Interval { low: SqlValue, high: SqlValue },
    /// Raw (unescaped) text for pattern operators
    Pattern(String),
    /// `null: true` matches NULL, `null: false` matches NOT NULL
    Null(bool),
}

/// One `operator: operand` entry of a condition-hash
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCondition {
    pub operator: Operator,
    pub operand: Operand,
}

/// All operators applied to one logical field (ANDed)
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    /// Expression chain in application order (innermost first)
    pub expressions: Vec<Expression>,
    pub operators: Vec<OperatorCondition>,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expressions: Vec::new(),
            operators: Vec::new(),
        }
    }

    pub fn with(mut self, operator: Operator, operand: Operand) -> Self {
        self.operators.push(OperatorCondition { operator, operand });
        self
    }

    pub fn through(mut self, expression: Expression) -> Self {
        self.expressions.push(expression);
        self
    }
}

/// Recursive condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionTree {
    Combinator {
        kind: CombinatorKind,
        children: Vec<ConditionTree>,
    },
    Field(FieldCondition),
}

impl ConditionTree {
    pub fn and(children: Vec<ConditionTree>) -> Self {
        Self::Combinator {
            kind: CombinatorKind::And,
            children,
        }
    }

    pub fn or(children: Vec<ConditionTree>) -> Self {
        Self::Combinator {
            kind: CombinatorKind::Or,
            children,
        }
    }

    pub fn not(children: Vec<ConditionTree>) -> Self {
        Self::Combinator {
            kind: CombinatorKind::Not,
            children,
        }
    }

    /// Number of field conditions in the subtree
    pub fn field_count(&self) -> usize {
        match self {
            Self::Combinator { children, .. } => children.iter().map(Self::field_count).sum(),
            Self::Field(_) => 1,
        }
    }
}

impl From<FieldCondition> for ConditionTree {
    fn from(condition: FieldCondition) -> Self {
        Self::Field(condition)
    }
}

/// Root of a filter: an implicit conjunction of top-level conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    pub conditions: Vec<ConditionTree>,
}

impl FilterTree {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.conditions.iter().map(ConditionTree::field_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinator_names() {
        assert_eq!(CombinatorKind::parse("and"), Some(CombinatorKind::And));
        assert_eq!(CombinatorKind::parse("not"), Some(CombinatorKind::Not));
        assert_eq!(CombinatorKind::parse("AND"), None);
        assert_eq!(CombinatorKind::parse("xor"), None);
        assert_eq!(CombinatorKind::Or.as_str(), "or");
    }

    #[test]
    fn test_field_count_walks_nested_groups() {
        let eq = |field: &str| {
            ConditionTree::from(
                FieldCondition::new(field).with(Operator::Eq, Operand::Value(SqlValue::from(1))),
            )
        };
        let tree = FilterTree {
            conditions: vec![
                eq("a"),
                ConditionTree::or(vec![eq("b"), ConditionTree::not(vec![eq("c"), eq("d")])]),
            ],
        };

        assert_eq!(tree.field_count(), 4);
        assert!(!tree.is_empty());
        assert!(FilterTree::default().is_empty());
    }
}
