//! Row selection: predicates, iteration order and query options
//!
//! A [`Predicate`] is an ordered list of per-column constraints. Each
//! constraint either requires an exact value or accepts any value from a
//! list; a row matches when it satisfies every constraint.

use crate::{TableError, ValidationError, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requirement placed on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    /// Equal to
    Eq(Value),
    /// Equal to any of the listed values
    In(Vec<Value>),
}

impl Constraint {
    /// Values whose index buckets satisfy this constraint.
    pub fn values(&self) -> &[Value] {
        match self {
            Constraint::Eq(value) => std::slice::from_ref(value),
            Constraint::In(values) => values,
        }
    }

    /// Whether a cell holding `value` satisfies this constraint.
    pub fn accepts(&self, value: &Value) -> bool {
        self.values().contains(value)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Eq(value) => write!(f, "= {}", value),
            Constraint::In(values) => {
                write!(f, "in [")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Conjunction of column constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    constraints: Vec<(String, Constraint)>,
}

impl Predicate {
    /// Empty predicate, matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicate with a single equality constraint.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(column, value)
    }

    /// Predicate with a single membership constraint.
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new().and_in(column, values)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints
            .push((column.into(), Constraint::Eq(value.into())));
        self
    }

    pub fn and_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.constraints.push((column.into(), Constraint::In(values)));
        self
    }

    pub fn push(&mut self, column: impl Into<String>, constraint: Constraint) {
        self.constraints.push((column.into(), constraint));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints
            .iter()
            .map(|(column, constraint)| (column.as_str(), constraint))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|(column, _)| column.as_str())
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, (column, constraint)) in self.constraints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", column, constraint)?;
        }
        write!(f, "}}")
    }
}

/// JSON objects become predicates: arrays are membership constraints,
/// scalars are equality constraints.
impl TryFrom<serde_json::Value> for Predicate {
    type Error = ValidationError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(map) = value else {
            return Err(ValidationError::InvalidPredicate {
                reason: "expected a JSON object".to_string(),
            });
        };

        let mut predicate = Predicate::new();
        for (column, cell) in map {
            let constraint = match cell {
                serde_json::Value::Array(items) => Constraint::In(
                    items
                        .into_iter()
                        .map(Value::try_from)
                        .collect::<Result<_, _>>()?,
                ),
                scalar => Constraint::Eq(Value::try_from(scalar)?),
            };
            predicate.push(column, constraint);
        }
        Ok(predicate)
    }
}

/// Iteration order for full-table scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Implementation-defined but stable within one call
    #[default]
    Unordered,
    Ascending,
    Descending,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Unordered => "unordered",
            Order::Ascending => "ascending",
            Order::Descending => "descending",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Order {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unordered" | "none" | "false" => Ok(Order::Unordered),
            "ascending" | "asc" => Ok(Order::Ascending),
            "descending" | "desc" => Ok(Order::Descending),
            _ => Err(TableError::InvalidOrder {
                token: s.to_string(),
            }),
        }
    }
}

/// Leniency switches for find, delete and update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Skip constraints on columns the table does not have instead of failing.
    pub ignore_unknown_columns: bool,
    /// Let delete succeed with a count of zero instead of failing.
    pub allow_no_match: bool,
}

impl QueryOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            ignore_unknown_columns: true,
            allow_no_match: true,
        }
    }

    pub fn ignore_unknown_columns(mut self) -> Self {
        self.ignore_unknown_columns = true;
        self
    }

    pub fn allow_no_match(mut self) -> Self {
        self.allow_no_match = true;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_constraint_order() {
        let p = Predicate::eq("a", 1).and_in("b", [2, 3]).and_eq("a", 4);
        let columns: Vec<&str> = p.columns().collect();
        assert_eq!(columns, vec!["a", "b", "a"]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_constraint_accepts() {
        assert!(Constraint::Eq(Value::Int(1)).accepts(&Value::Int(1)));
        assert!(!Constraint::Eq(Value::Int(1)).accepts(&Value::Null));
        let any = Constraint::In(vec![Value::Null, Value::Int(2)]);
        assert!(any.accepts(&Value::Null));
        assert!(!Constraint::In(vec![]).accepts(&Value::Null));
    }

    #[test]
    fn test_predicate_from_json() {
        let p = Predicate::try_from(serde_json::json!({"name": "a", "id": [7, 8]})).unwrap();
        let parts: Vec<(&str, &Constraint)> = p.iter().collect();
        assert!(parts.contains(&("name", &Constraint::Eq(Value::from("a")))));
        assert!(parts.contains(&(
            "id",
            &Constraint::In(vec![Value::Int(7), Value::Int(8)])
        )));

        let err = Predicate::try_from(serde_json::json!("name")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPredicate { .. }));
    }

    #[test]
    fn test_predicate_display() {
        let p = Predicate::eq("name", "a").and_in("id", [1, 3]);
        assert_eq!(p.to_string(), "{name = \"a\", id in [1, 3]}");
        assert_eq!(Predicate::new().to_string(), "{}");
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("ascending".parse::<Order>().unwrap(), Order::Ascending);
        assert_eq!("DESC".parse::<Order>().unwrap(), Order::Descending);
        assert_eq!("false".parse::<Order>().unwrap(), Order::Unordered);

        let err = "sideways".parse::<Order>().unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidOrder {
                token: "sideways".to_string()
            }
        );
    }

    #[test]
    fn test_query_options_presets() {
        assert!(!QueryOptions::strict().ignore_unknown_columns);
        assert!(!QueryOptions::strict().allow_no_match);
        assert!(QueryOptions::lenient().ignore_unknown_columns);
        assert!(QueryOptions::strict().allow_no_match().allow_no_match);
    }
}
