pub mod schema;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::query::SelectQuery;

/// A shop database, used to validate assembled queries against real tables.
pub struct Database {
    pub conn: Connection,
    pub path: Option<PathBuf>,
}

impl Database {
    /// Open an existing shop database. Missing shop tables are created.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Database not found: {}", path.display());
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_schema(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Scratch database holding only the shop schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_schema(&conn)?;
        Ok(Database { conn, path: None })
    }

    /// Where queries are checked, for messages.
    pub fn location(&self) -> String {
        match self.path {
            Some(ref path) => path.display().to_string(),
            None => "in-memory shop schema".to_string(),
        }
    }

    /// Prepare (but do not run) the query and make sure every placeholder is bound.
    pub fn check(&self, query: &SelectQuery) -> Result<()> {
        let sql = query.to_sql();
        let stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Query does not prepare:\n{sql}"))?;

        let expected = stmt.parameter_count();
        let bound = query.params().len();
        if expected != bound {
            bail!("Query expects {expected} parameters but {bound} are bound:\n{sql}");
        }

        debug!(parameters = bound, "query prepared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::Model;

    #[test]
    fn check_accepts_bound_query() {
        let db = Database::open_in_memory().unwrap();
        let mut q = SelectQuery::new(Model::Orders.schema());
        let p = q.bind("Paid".to_string());
        q.where_clause(format!("orders.status = {p}"));
        db.check(&q).unwrap();
    }

    #[test]
    fn check_rejects_unbound_placeholder() {
        let db = Database::open_in_memory().unwrap();
        let mut q = SelectQuery::new(Model::Orders.schema());
        q.where_clause("orders.status = ?1");
        let err = db.check(&q).unwrap_err();
        assert!(err.to_string().contains("expects 1 parameters but 0"));
    }

    #[test]
    fn check_rejects_unknown_table() {
        let db = Database::open_in_memory().unwrap();
        let mut q = SelectQuery::new(Model::Orders.schema());
        q.inner_join("invoices", "invoices.order_id = orders.id");
        assert!(db.check(&q).is_err());
    }

    #[test]
    fn open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Database::open(&dir.path().join("missing.db")).is_err());
    }

    #[test]
    fn location_names_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (body TEXT);")
            .unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.location(), path.display().to_string());
        assert_eq!(Database::open_in_memory().unwrap().location(), "in-memory shop schema");
    }
}
