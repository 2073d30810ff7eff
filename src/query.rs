//! Condition model and the condition-to-SQL compiler.
//!
//! [`compile`] is pure: it turns a [`Query`] into a [`Clause`] (fragment text
//! plus positional parameters) and never touches storage. Values always bind
//! as `?` placeholders. Column names and operator keys appear literally in
//! the clause text, since identifiers cannot be parameterized in SQL. Do not
//! pass attacker-controlled column names.

use crate::error::{Result, StoreError};
use crate::value::Value;

/// A single column condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = ?`
    Equal(Value),
    /// Ordered operator/scalar pairs, one fragment each. Operator keys are
    /// drawn from the closed set `gt`, `lt`, `gte`, `lte`, `ne`; anything
    /// else fails compilation with [`StoreError::UnknownOperator`].
    Compare(Vec<(String, Value)>),
    /// `column IN (?, ?, ...)`. An empty list compiles to `IN ()`, which
    /// SQLite accepts and which matches no row.
    In(Vec<Value>),
}

impl Filter {
    pub fn equal(value: impl Into<Value>) -> Self {
        Filter::Equal(value.into())
    }

    /// Single operator/scalar pair, e.g. `Filter::compare("gte", 18)`.
    pub fn compare(operator: &str, value: impl Into<Value>) -> Self {
        Filter::Compare(vec![(operator.to_string(), value.into())])
    }

    pub fn one_of(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Filter::In(values.into_iter().map(Into::into).collect())
    }

    pub fn greater_than(value: impl Into<Value>) -> Self {
        Self::compare("gt", value)
    }

    pub fn less_than(value: impl Into<Value>) -> Self {
        Self::compare("lt", value)
    }

    pub fn greater_or_equal(value: impl Into<Value>) -> Self {
        Self::compare("gte", value)
    }

    pub fn less_or_equal(value: impl Into<Value>) -> Self {
        Self::compare("lte", value)
    }

    pub fn not_equal(value: impl Into<Value>) -> Self {
        Self::compare("ne", value)
    }
}

/// Query conditions for composable, immutable queries.
///
/// Conditions keep their insertion order; the compiled clause and its
/// parameters follow that order. Setting a filter for a column that is
/// already present replaces the filter in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    conditions: Vec<(String, Filter)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, column: &str, filter: Filter) -> Self {
        match self.conditions.iter_mut().find(|(c, _)| c == column) {
            Some(entry) => entry.1 = filter,
            None => self.conditions.push((column.to_string(), filter)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.conditions.iter().map(|(c, f)| (c.as_str(), f))
    }
}

/// A compiled WHERE clause: fragment text joined with `AND`, paired with the
/// positional parameters for its `?` placeholders.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Clause {
    pub text: String,
    pub params: Vec<Value>,
}

impl Clause {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The clause with a leading ` WHERE `, or nothing at all when empty.
    pub fn as_where(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.text)
        }
    }
}

fn operator_symbol(key: &str) -> Result<&'static str> {
    match key {
        "gt" => Ok(">"),
        "lt" => Ok("<"),
        "gte" => Ok(">="),
        "lte" => Ok("<="),
        "ne" => Ok("!="),
        other => Err(StoreError::UnknownOperator(other.to_string())),
    }
}

/// Compile a [`Query`] into a [`Clause`].
///
/// An empty query compiles to an empty clause; no `WHERE` keyword is emitted
/// for it.
pub fn compile(query: &Query) -> Result<Clause> {
    let mut fragments = Vec::new();
    let mut params = Vec::new();
    for (column, filter) in query.iter() {
        match filter {
            Filter::Equal(value) => {
                fragments.push(format!("{column} = ?"));
                params.push(value.clone());
            }
            Filter::Compare(pairs) => {
                for (key, value) in pairs {
                    let symbol = operator_symbol(key)?;
                    fragments.push(format!("{column} {symbol} ?"));
                    params.push(value.clone());
                }
            }
            Filter::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                fragments.push(format!("{column} IN ({placeholders})"));
                params.extend(values.iter().cloned());
            }
        }
    }
    Ok(Clause {
        text: fragments.join(" AND "),
        params,
    })
}
