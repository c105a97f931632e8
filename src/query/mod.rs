pub mod schema;

use rusqlite::types::Value;

use crate::error::Result;
pub use schema::{ColumnRef, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
}

/// A SELECT over one base table that filters extend with joins and WHERE terms.
///
/// Predicates are ANDed in the order they were added. Values are never spliced
/// into the SQL text: call [`SelectQuery::bind`] to get a `?N` placeholder and
/// put that in the predicate instead.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    schema: Schema,
    joins: Vec<Join>,
    predicates: Vec<String>,
    params: Vec<Value>,
}

impl SelectQuery {
    pub fn new(schema: Schema) -> Self {
        SelectQuery {
            schema,
            joins: Vec::new(),
            predicates: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn base_table(&self) -> &str {
        self.schema.base_table()
    }

    /// Resolve a logical field name against this query's schema.
    pub fn apply_relation(&self, name: &str) -> Result<ColumnRef> {
        self.schema.resolve(name)
    }

    /// Add a parameter and return its placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    /// Append a conjunctive WHERE term.
    pub fn where_clause(&mut self, predicate: impl Into<String>) -> &mut Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn inner_join(&mut self, table: &str, on: impl Into<String>) -> &mut Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.to_string(),
            alias: None,
            on: on.into(),
        });
        self
    }

    pub fn left_join(&mut self, table: &str, on: impl Into<String>, alias: &str) -> &mut Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.to_string(),
            alias: Some(alias.to_string()),
            on: on.into(),
        });
        self
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Render the SQL text. Placeholders are numbered in bind order.
    pub fn to_sql(&self) -> String {
        let base = self.schema.base_table();
        let mut sql = format!("SELECT DISTINCT {base}.* FROM {base}");

        for join in &self.joins {
            sql.push('\n');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            sql.push_str(&join.table);
            if let Some(ref alias) = join.alias {
                sql.push_str(" AS ");
                sql.push_str(alias);
            }
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        if !self.predicates.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&self.predicates.join(" AND "));
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> SelectQuery {
        SelectQuery::new(
            Schema::new("orders")
                .field("ID", "orders", "id")
                .field("Status", "orders", "status"),
        )
    }

    #[test]
    fn bare_query_selects_base_table() {
        assert_eq!(orders().to_sql(), "SELECT DISTINCT orders.* FROM orders");
    }

    #[test]
    fn placeholders_follow_bind_order() {
        let mut q = orders();
        let first = q.bind("Paid".to_string());
        let second = q.bind(10_i64);
        assert_eq!(first, "?1");
        assert_eq!(second, "?2");
        assert_eq!(
            q.params(),
            &[Value::Text("Paid".into()), Value::Integer(10)]
        );
    }

    #[test]
    fn renders_joins_and_predicates_in_order() {
        let mut q = orders();
        q.left_join("payments", "payment.order_id = orders.id", "payment")
            .inner_join("members", "members.id = orders.member_id");
        let p = q.bind("Paid".to_string());
        q.where_clause(format!("orders.status = {p}"))
            .where_clause("payment.id IS NULL");

        assert_eq!(
            q.to_sql(),
            "SELECT DISTINCT orders.* FROM orders\n\
             LEFT JOIN payments AS payment ON payment.order_id = orders.id\n\
             INNER JOIN members ON members.id = orders.member_id\n\
             WHERE orders.status = ?1 AND payment.id IS NULL"
        );
    }

    #[test]
    fn apply_relation_uses_schema() {
        let q = orders();
        assert_eq!(q.apply_relation("Status").unwrap().to_string(), "orders.status");
        assert!(q.apply_relation("Nope").is_err());
    }
}
