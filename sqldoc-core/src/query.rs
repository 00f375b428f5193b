//! Filter queries over a collection's attribute index.
//!
//! A [`Query`] is an ordered list of [`Comparison`]s, each joined to the previous one by
//! a [`Conjunction`], plus an optional [`Sort`], pagination and the [`IndexKind`] the
//! match starts from.
//!
//! # Query Building
//!
//! ```ignore
//! use sqldoc::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("name", "ada"))
//!     .and(Filter::gt("age", 18))
//!     .or(Filter::eq("admin", true))
//!     .sort("age", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Queries as data
//!
//! Every type here deserializes with serde, so a query can also be described as JSON:
//!
//! ```ignore
//! let query: Query = serde_json::from_value(json!({
//!     "comparisons": [
//!         { "conjunction": "WHERE", "field": "name", "op": "=", "value": "ada" },
//!         { "conjunction": "AND", "field": "age", "op": ">", "value": 18 }
//!     ],
//!     "sort": { "field": "age", "direction": "DESC" },
//!     "limit": 10
//! }))?;
//! ```

use std::{fmt, str::FromStr};

use bson::Bson;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{error::DocumentStoreError, index::IndexKind};

/// Keyword joining a comparison to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conjunction {
    #[serde(rename = "WHERE", alias = "where")]
    Where,
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::Where => "WHERE",
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

impl FromStr for Conjunction {
    type Err = DocumentStoreError;

    fn from_str(keyword: &str) -> Result<Self, Self::Err> {
        match keyword.to_ascii_uppercase().as_str() {
            "WHERE" => Ok(Conjunction::Where),
            "AND" => Ok(Conjunction::And),
            "OR" => Ok(Conjunction::Or),
            _ => Err(DocumentStoreError::InvalidQuery(format!("unknown keyword '{keyword}'"))),
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldOp {
    /// Equal to.
    #[serde(rename = "=")]
    Eq,
    /// Not equal to.
    #[serde(rename = "<>", alias = "!=")]
    Ne,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Greater than or equal to.
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal to.
    #[serde(rename = "<=")]
    Lte,
}

impl FieldOp {
    /// Relational token for the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            FieldOp::Eq => "=",
            FieldOp::Ne => "<>",
            FieldOp::Gt => ">",
            FieldOp::Lt => "<",
            FieldOp::Gte => ">=",
            FieldOp::Lte => "<=",
        }
    }
}

impl FromStr for FieldOp {
    type Err = DocumentStoreError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "=" => Ok(FieldOp::Eq),
            "<>" | "!=" => Ok(FieldOp::Ne),
            ">" => Ok(FieldOp::Gt),
            "<" => Ok(FieldOp::Lt),
            ">=" => Ok(FieldOp::Gte),
            "<=" => Ok(FieldOp::Lte),
            _ => Err(DocumentStoreError::InvalidQuery(format!("unknown comparator '{token}'"))),
        }
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One comparison of a filter.
///
/// Any part may be missing; a comparison without a conjunction, field or operator is
/// skipped when the query is visited.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Comparison {
    pub conjunction: Option<Conjunction>,
    pub field: Option<String>,
    pub op: Option<FieldOp>,
    pub value: Bson,
}

impl Comparison {
    /// Creates a complete comparison.
    pub fn new(
        conjunction: Conjunction,
        field: impl Into<String>,
        op: FieldOp,
        value: impl Into<Bson>,
    ) -> Self {
        Self {
            conjunction: Some(conjunction),
            field: Some(field.into()),
            op: Some(op),
            value: value.into(),
        }
    }

    /// Replaces the conjunction.
    pub fn with_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = Some(conjunction);
        self
    }

    /// Returns the conjunction, field and operator if all are present.
    pub fn parts(&self) -> Option<(Conjunction, &str, FieldOp)> {
        match (self.conjunction, self.field.as_deref(), self.op) {
            (Some(conjunction), Some(field), Some(op)) if !field.is_empty() => {
                Some((conjunction, field, op))
            }
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.parts().is_some()
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    /// Descending order.
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordering of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// The property to sort by.
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A filter over one collection.
///
/// Use [`QueryBuilder`] for ergonomic construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Query {
    /// Comparisons in evaluation order.
    pub comparisons: Vec<Comparison>,
    /// Result ordering. Defaults to first-write order.
    pub sort: Option<Sort>,
    /// Number of matches to skip.
    pub offset: Option<usize>,
    /// Maximum number of matches to return.
    pub limit: Option<usize>,
    /// Index rows the match starts from.
    pub index_kind: IndexKind,
}

impl Query {
    /// Creates an empty query. It matches every document, in first-write order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Constructors for comparisons without a conjunction.
///
/// The conjunction is filled in by [`QueryBuilder::filter`], [`QueryBuilder::and`] or
/// [`QueryBuilder::or`].
pub struct Filter;

impl Filter {
    fn comparison(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Comparison {
        Comparison {
            conjunction: None,
            field: Some(field.into()),
            op: Some(op),
            value: value.into(),
        }
    }

    /// Creates an equality comparison.
    ///
    /// Matches documents where the property equals `value`. A null value matches
    /// properties stored as null.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Eq, value)
    }

    /// Creates a not-equal comparison.
    ///
    /// Matches documents that have the property with a different value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Ne, value)
    }

    /// Creates a greater-than comparison.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Gt, value)
    }

    /// Creates a greater-than-or-equal comparison.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Gte, value)
    }

    /// Creates a less-than comparison.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Lt, value)
    }

    /// Creates a less-than-or-equal comparison.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Comparison {
        Self::comparison(field, FieldOp::Lte, value)
    }

    /// Matches documents whose property is null.
    pub fn is_null(field: impl Into<String>) -> Comparison {
        Self::comparison(field, FieldOp::Eq, Bson::Null)
    }
}

/// Fluent builder for [`Query`].
///
/// Comparisons are kept in the order they are added.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a comparison with the `WHERE` keyword.
    pub fn filter(self, comparison: Comparison) -> Self {
        self.comparison(comparison.with_conjunction(Conjunction::Where))
    }

    /// Adds a comparison joined with `AND`.
    pub fn and(self, comparison: Comparison) -> Self {
        self.comparison(comparison.with_conjunction(Conjunction::And))
    }

    /// Adds a comparison joined with `OR`.
    pub fn or(self, comparison: Comparison) -> Self {
        self.comparison(comparison.with_conjunction(Conjunction::Or))
    }

    /// Adds a comparison as given.
    pub fn comparison(mut self, comparison: Comparison) -> Self {
        self.query.comparisons.push(comparison);
        self
    }

    /// Sets the maximum number of documents to return.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of documents to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of matches to skip. An offset works without a limit.
    ///
    /// # Arguments
    ///
    /// * `offset` - The number of matches to skip
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Orders the results by a property or a metadata field.
    ///
    /// Documents lacking the property are kept and sort as null.
    ///
    /// # Arguments
    ///
    /// * `field` - The property to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Selects which index rows the match starts from.
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.query.index_kind = kind;
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a [`Query`] in order.
///
/// [`visit_query`](QueryVisitor::visit_query) hands every complete comparison to
/// [`visit_comparison`](QueryVisitor::visit_comparison), skips incomplete ones with a
/// warning, then visits the sort and finishes.
pub trait QueryVisitor: Sized {
    type Output;
    type Error: Into<DocumentStoreError>;

    /// Called once per complete comparison, in query order.
    fn visit_comparison(
        &mut self,
        conjunction: Conjunction,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<(), Self::Error>;

    /// Called after all comparisons when the query has a sort.
    fn visit_sort(&mut self, sort: &Sort) -> Result<(), Self::Error>;

    /// Produces the output once the whole query has been visited.
    fn finish(self, query: &Query) -> Result<Self::Output, Self::Error>;

    fn visit_query(mut self, query: &Query) -> Result<Self::Output, Self::Error> {
        for comparison in &query.comparisons {
            match comparison.parts() {
                Some((conjunction, field, op)) => {
                    self.visit_comparison(conjunction, field, op, &comparison.value)?
                }
                None => warn!("skipping incomplete comparison {comparison:?}"),
            }
        }

        if let Some(sort) = &query.sort {
            self.visit_sort(sort)?;
        }

        self.finish(query)
    }
}
