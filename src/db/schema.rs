use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::query::Schema;

/// Searchable admin models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Orders,
    Products,
}

impl Model {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "orders" | "order" => Some(Model::Orders),
            "products" | "product" => Some(Model::Products),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Model::Orders => "orders",
            Model::Products => "products",
        }
    }

    /// Field map used to resolve search field names for this model.
    ///
    /// `HasPayment` and `Category` are not columns of their own: they resolve
    /// to the row id that the payment/category joins hang off.
    pub fn schema(self) -> Schema {
        match self {
            Model::Orders => Schema::new("orders")
                .field("ID", "orders", "id")
                .field("Status", "orders", "status")
                .field("Email", "orders", "member_email")
                .field("HasPayment", "orders", "id"),
            Model::Products => Schema::new("products")
                .field("ID", "products", "id")
                .field("Title", "products", "title")
                .field("Status", "products", "status")
                .field("Category", "products", "id"),
        }
    }
}

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL DEFAULT 'Cart',
            member_email TEXT NOT NULL DEFAULT '',
            total REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        -- At most one payment per order
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL UNIQUE REFERENCES orders(id) ON DELETE CASCADE,
            amount REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'Pending'
        );

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Draft',
            price REAL NOT NULL DEFAULT 0
        );

        -- Published (live) copy of each category page
        CREATE TABLE IF NOT EXISTS category_live (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_categories (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES category_live(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, category_id)
        );

        CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
        CREATE INDEX IF NOT EXISTS idx_products_status ON products(status);
        CREATE INDEX IF NOT EXISTS idx_product_categories_category ON product_categories(category_id);
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_parse_loosely() {
        assert_eq!(Model::from_str("Orders"), Some(Model::Orders));
        assert_eq!(Model::from_str("product"), Some(Model::Products));
        assert_eq!(Model::from_str("members"), None);
    }

    #[test]
    fn every_mapped_column_exists() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        for model in [Model::Orders, Model::Products] {
            let schema = model.schema();
            for name in schema.field_names() {
                let col = schema.resolve(name).unwrap();
                conn.prepare(&format!("SELECT {col} FROM {}", col.table))
                    .unwrap_or_else(|e| panic!("{name} -> {col}: {e}"));
            }
        }
    }
}
