//! Report filter tree.
//!
//! Filters are a three-level mapping `table → column → operator` whose leaves
//! are [`FilterCondition`] records. All populated operator fields of a
//! condition apply together (AND semantics).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Leaf of the filter tree.
///
/// Each field is an ordered list of untyped values. Empty lists are omitted
/// on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equals: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub greater_than: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub greater_or_equal: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub less_than: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub less_or_equal: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub between: Vec<Value>,
    #[serde(default, rename = "in", skip_serializing_if = "Vec::is_empty")]
    pub in_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<Value>,
}

impl FilterCondition {
    /// Condition matching any of `values`.
    pub fn equals(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            equals: values.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Condition matching the closed range `[low, high]`.
    pub fn between(low: Value, high: Value) -> Self {
        Self {
            between: vec![low, high],
            ..Default::default()
        }
    }

    /// True when no operator field carries a value.
    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
            && self.greater_than.is_empty()
            && self.greater_or_equal.is_empty()
            && self.less_than.is_empty()
            && self.less_or_equal.is_empty()
            && self.between.is_empty()
            && self.in_values.is_empty()
            && self.not_in.is_empty()
    }
}

/// `column → operator → condition`.
pub type ColumnFilters = BTreeMap<String, BTreeMap<String, FilterCondition>>;

/// Filter tree attached to a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportFilters(BTreeMap<String, ColumnFilters>);

impl ReportFilters {
    /// Creates an empty filter tree.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a condition, creating the intermediate levels as needed.
    pub fn with_condition(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        operator: impl Into<String>,
        condition: FilterCondition,
    ) -> Self {
        self.0
            .entry(table.into())
            .or_default()
            .entry(column.into())
            .or_default()
            .insert(operator.into(), condition);
        self
    }

    /// Returns the conditions declared for a table, if any.
    pub fn table(&self, table: &str) -> Option<&ColumnFilters> {
        self.0.get(table)
    }

    /// Iterates over `(table, column, operator, condition)` leaves.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &str, &str, &FilterCondition)> {
        self.0.iter().flat_map(|(table, columns)| {
            columns.iter().flat_map(move |(column, operators)| {
                operators.iter().map(move |(operator, condition)| {
                    (table.as_str(), column.as_str(), operator.as_str(), condition)
                })
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates the tree for the constructor path.
    ///
    /// # Errors
    ///
    /// - `InvalidFilters` if a key is blank, a condition has no values, or a
    ///   `between` list does not hold exactly two bounds
    pub fn validate(&self) -> Result<(), DomainError> {
        for (table, column, operator, condition) in self.leaves() {
            let path = format!("filters.{}.{}.{}", table, column, operator);
            if table.trim().is_empty() || column.trim().is_empty() || operator.trim().is_empty() {
                return Err(DomainError::new(
                    ErrorCode::InvalidFilters,
                    "Filter keys cannot be blank",
                )
                .with_field(path, "blank key"));
            }
            if condition.is_empty() {
                return Err(DomainError::new(
                    ErrorCode::InvalidFilters,
                    format!("Filter condition at '{}' has no values", path),
                )
                .with_field(path, "empty condition"));
            }
            if !condition.between.is_empty() && condition.between.len() != 2 {
                return Err(DomainError::new(
                    ErrorCode::InvalidFilters,
                    format!("Filter 'between' at '{}' needs exactly two bounds", path),
                )
                .with_field(path, "between needs two values"));
            }
        }
        Ok(())
    }
}
