//! Table metadata lookup
//!
//! When a provider is attached, every base table added to a FROM chain is
//! looked up; unknown tables fail immediately and qualified column
//! references are checked against the table's column list.

use crate::ast::{Ident, TableRef};
use std::collections::HashMap;
use std::fmt::Debug;

/// Columns of a known table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table: TableRef,
    pub columns: Vec<Ident>,
}

impl TableDescriptor {
    pub fn new(table: impl Into<TableRef>, columns: Vec<impl Into<Ident>>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_column(&self, column: &Ident) -> bool {
        self.columns.contains(column)
    }
}

/// Source of table descriptors consulted while building
pub trait MetadataProvider: Debug + Send + Sync {
    fn lookup_table(&self, table: &TableRef) -> Option<TableDescriptor>;
}

/// A fixed catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: HashMap<TableRef, TableDescriptor>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_table(mut self, table: impl Into<TableRef>, columns: Vec<impl Into<Ident>>) -> Self {
        self.register(TableDescriptor::new(table, columns));
        self
    }

    pub fn register(&mut self, descriptor: TableDescriptor) {
        self.tables.insert(descriptor.table.clone(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl MetadataProvider for InMemoryCatalog {
    fn lookup_table(&self, table: &TableRef) -> Option<TableDescriptor> {
        if let Some(found) = self.tables.get(table) {
            return Some(found.clone());
        }
        // An unqualified reference matches a single schema-qualified entry.
        if table.schema.is_none() {
            let mut matches = self.tables.values().filter(|d| d.table.name == table.name);
            let first = matches.next()?;
            if matches.next().is_none() {
                return Some(first.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_and_unqualified() {
        let catalog = InMemoryCatalog::new()
            .with_table("shop.orders", vec!["id", "user_id"])
            .with_table("users", vec!["id", "name"]);

        let users = catalog.lookup_table(&TableRef::new("users")).unwrap();
        assert!(users.has_column(&Ident::new("name")));

        let orders = catalog.lookup_table(&TableRef::new("orders")).unwrap();
        assert_eq!(orders.table, TableRef::qualified("shop", "orders"));

        assert!(catalog.lookup_table(&TableRef::new("missing")).is_none());
    }

    #[test]
    fn test_ambiguous_unqualified_lookup() {
        let catalog = InMemoryCatalog::new()
            .with_table("a.items", vec!["id"])
            .with_table("b.items", vec!["id"]);
        assert!(catalog.lookup_table(&TableRef::new("items")).is_none());
        assert!(catalog
            .lookup_table(&TableRef::qualified("a", "items"))
            .is_some());
    }
}
