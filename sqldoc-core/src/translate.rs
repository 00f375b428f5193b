//! Compiles a [`Query`] into join, condition, ordering and limit fragments.
//!
//! Every distinct non-metadata property gets one `INNER JOIN` against the index table
//! under a positional alias (`p1`, `p2`, ...). Metadata properties compare against the
//! current committed primary row (`doc`) directly. The rendered statements select
//! matching ids only; documents are re-read by id afterwards.

use bson::Bson;

use crate::{
    connector::SqlValue,
    document::is_reserved,
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexKind,
    query::{Conjunction, FieldOp, Query, QueryVisitor, Sort, SortDirection},
    statement::{Statement, Tables, Template},
};

const DEFAULT_SORT_KEY: &str = "doc.origin";

/// Generated SQL fragments and their parameters.
///
/// Parameters bind in the order joins, index type, conditions, limit, matching the
/// placeholders of the filtered templates.
///
/// # Example
///
/// ```ignore
/// let query = Query::builder().filter(Filter::eq("name", "ada")).build();
/// let fragments = FilterTranslator::translate(&tables, &query)?;
///
/// assert_eq!(fragments.conditions, " AND (p1.value = ?)");
/// let ids = connector.query(&fragments.fetch_statement(&tables))?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fragments {
    /// One ` INNER JOIN` per filtered property, plus a ` LEFT JOIN` for an otherwise
    /// unreferenced sort property.
    pub joins: String,
    /// Index type and property name for each join, two per join.
    pub join_params: Vec<SqlValue>,
    /// ` AND (...)` wrapping the comparison chain, or empty.
    pub conditions: String,
    pub condition_params: Vec<SqlValue>,
    /// Column the results are ordered by, `doc.origin` unless a sort is given.
    pub sort_key: String,
    pub direction: SortDirection,
    /// ` LIMIT ? OFFSET ?`, ` LIMIT -1 OFFSET ?` or empty.
    pub limit: String,
    pub limit_params: Vec<SqlValue>,
    /// Index rows the match starts from.
    pub index_kind: IndexKind,
}

impl Fragments {
    fn render(&self, tables: &Tables, template: Template) -> String {
        let mut substitutions = tables.substitutions();
        substitutions.extend([
            ("joins", self.joins.as_str()),
            ("conditions", self.conditions.as_str()),
            ("sort_key", self.sort_key.as_str()),
            ("direction", self.direction.as_sql()),
            ("limit", self.limit.as_str()),
        ]);

        template.render(&substitutions)
    }

    fn base_params(&self) -> Vec<SqlValue> {
        self.join_params
            .iter()
            .cloned()
            .chain(std::iter::once(SqlValue::from(self.index_kind.as_str())))
            .chain(self.condition_params.iter().cloned())
            .collect()
    }

    /// Statement selecting `(id, sort_key)` for every match, ordered and paginated.
    pub fn fetch_statement(&self, tables: &Tables) -> Statement {
        Statement::new(self.render(tables, Template::FilteredFetch))
            .bind_all(self.base_params())
            .bind_all(self.limit_params.iter().cloned())
    }

    /// Statement counting every match, ignoring pagination.
    pub fn count_statement(&self, tables: &Tables) -> Statement {
        Statement::new(self.render(tables, Template::FilteredCount))
            .bind_all(self.base_params())
    }
}

/// [`QueryVisitor`] producing [`Fragments`] for one collection.
#[derive(Debug)]
pub struct FilterTranslator<'t> {
    tables: &'t Tables,
    aliases: Vec<(String, String)>,
    joins: String,
    join_params: Vec<SqlValue>,
    chain: String,
    condition_params: Vec<SqlValue>,
    sort_key: Option<String>,
    direction: SortDirection,
}

impl<'t> FilterTranslator<'t> {
    /// Creates a translator with no joins and the default ordering.
    pub fn new(tables: &'t Tables) -> Self {
        Self {
            tables,
            aliases: Vec::new(),
            joins: String::new(),
            join_params: Vec::new(),
            chain: String::new(),
            condition_params: Vec::new(),
            sort_key: None,
            direction: SortDirection::Asc,
        }
    }

    /// Translates `query` against `tables`.
    ///
    /// # Arguments
    ///
    /// * `tables` - Tables of the collection being queried
    /// * `query` - The query; incomplete comparisons are skipped
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if a comparison value is a nested
    /// document, an array or another non-scalar type.
    pub fn translate(tables: &'t Tables, query: &Query) -> DocumentStoreResult<Fragments> {
        Self::new(tables).visit_query(query)
    }

    fn alias(&self, field: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(property, _)| property == field)
            .map(|(_, alias)| alias.as_str())
    }

    fn join(&mut self, kind: &str, field: &str) -> String {
        let alias = format!("p{}", self.aliases.len() + 1);
        self.joins.push_str(&format!(
            " {kind} JOIN {index} AS {alias} ON {alias}.id = base.id \
             AND {alias}.type = ? AND {alias}.property = ?",
            index = self.tables.index(),
        ));
        self.join_params.push(SqlValue::from(IndexKind::Value.as_str()));
        self.join_params.push(SqlValue::from(field));
        self.aliases.push((field.to_string(), alias.clone()));

        alias
    }

    /// Column holding `field`, joining the index table once per property.
    fn column(&mut self, field: &str, kind: &str) -> String {
        if is_reserved(field) {
            return format!("doc.{field}");
        }

        let alias = match self.alias(field) {
            Some(alias) => alias.to_string(),
            None => self.join(kind, field),
        };

        format!("{alias}.value")
    }

    fn predicate(
        &mut self,
        column: &str,
        metadata: bool,
        op: FieldOp,
        value: &Bson,
    ) -> DocumentStoreResult<String> {
        let token = op.as_sql();

        let (expression, param) = match value {
            Bson::Null => {
                let predicate = match op {
                    FieldOp::Eq => format!("{column} IS NULL"),
                    FieldOp::Ne => format!("{column} IS NOT NULL"),
                    _ => format!("{column} {token} NULL"),
                };
                return Ok(predicate);
            }
            Bson::Int32(value) => (cast(column, metadata, "INTEGER"), SqlValue::from(*value)),
            Bson::Int64(value) => (cast(column, metadata, "INTEGER"), SqlValue::from(*value)),
            Bson::Double(value) => (cast(column, metadata, "REAL"), SqlValue::from(*value)),
            Bson::Boolean(value) => (column.to_string(), SqlValue::from(*value)),
            Bson::String(value) => (column.to_string(), SqlValue::from(value)),
            other => {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "cannot compare against {:?} value",
                    other.element_type()
                )));
            }
        };

        self.condition_params.push(param);
        Ok(format!("{expression} {token} ?"))
    }
}

fn cast(column: &str, metadata: bool, affinity: &str) -> String {
    if metadata {
        column.to_string()
    } else {
        format!("CAST({column} AS {affinity})")
    }
}

impl QueryVisitor for FilterTranslator<'_> {
    type Output = Fragments;
    type Error = DocumentStoreError;

    fn visit_comparison(
        &mut self,
        conjunction: Conjunction,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<(), Self::Error> {
        let column = self.column(field, "INNER");
        let predicate = self.predicate(&column, is_reserved(field), op, value)?;

        if !self.chain.is_empty() {
            let connective = match conjunction {
                Conjunction::Or => "OR",
                Conjunction::Where | Conjunction::And => "AND",
            };
            self.chain.push_str(&format!(" {connective} "));
        }
        self.chain.push_str(&predicate);

        Ok(())
    }

    fn visit_sort(&mut self, sort: &Sort) -> Result<(), Self::Error> {
        self.sort_key = Some(self.column(&sort.field, "LEFT"));
        self.direction = sort.direction;

        Ok(())
    }

    fn finish(self, query: &Query) -> Result<Self::Output, Self::Error> {
        let conditions = if self.chain.is_empty() {
            String::new()
        } else {
            format!(" AND ({})", self.chain)
        };

        let to_param = |count: usize| SqlValue::Integer(i64::try_from(count).unwrap_or(i64::MAX));
        let (limit, limit_params) = match (query.limit, query.offset) {
            (Some(limit), offset) => (
                " LIMIT ? OFFSET ?".to_string(),
                vec![to_param(limit), to_param(offset.unwrap_or(0))],
            ),
            (None, Some(offset)) => (" LIMIT -1 OFFSET ?".to_string(), vec![to_param(offset)]),
            (None, None) => (String::new(), Vec::new()),
        };

        Ok(Fragments {
            joins: self.joins,
            join_params: self.join_params,
            conditions,
            condition_params: self.condition_params,
            sort_key: self.sort_key.unwrap_or_else(|| DEFAULT_SORT_KEY.to_string()),
            direction: self.direction,
            limit,
            limit_params,
            index_kind: query.index_kind,
        })
    }
}
