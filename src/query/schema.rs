use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FilterError, Result};

/// A concrete `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        ColumnRef {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Field map for one searchable model: logical field name -> column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    base_table: String,
    fields: BTreeMap<String, ColumnRef>,
}

impl Schema {
    pub fn new(base_table: &str) -> Self {
        Schema {
            base_table: base_table.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Register a field. Builder-style so schemas read as a table.
    pub fn field(mut self, name: &str, table: &str, column: &str) -> Self {
        self.fields
            .insert(name.to_string(), ColumnRef::new(table, column));
        self
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Resolve a logical field name. Field names are matched exactly.
    pub fn resolve(&self, name: &str) -> Result<ColumnRef> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| FilterError::Resolution {
                field: name.to_string(),
                table: self.base_table.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_field() {
        let schema = Schema::new("orders").field("Status", "orders", "status");
        let col = schema.resolve("Status").unwrap();
        assert_eq!(col.to_string(), "orders.status");
    }

    #[test]
    fn unknown_field_is_a_resolution_error() {
        let schema = Schema::new("orders").field("Status", "orders", "status");
        let err = schema.resolve("status").unwrap_err();
        assert_eq!(
            err,
            FilterError::Resolution {
                field: "status".into(),
                table: "orders".into(),
            }
        );
    }
}
