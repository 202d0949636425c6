//! Common Table Expression (CTE) support

use super::expr::Ident;
use super::stmt::Query;

/// A Common Table Expression (CTE) in a WITH clause
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// Name of the CTE
    pub name: Ident,
    /// Column list: WITH cte(col1, col2) AS (...); empty when omitted
    pub columns: Vec<Ident>,
    /// The query that defines the CTE
    pub query: Box<Query>,
}

impl Cte {
    pub fn new(name: impl Into<Ident>, query: Query) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            query: Box::new(query),
        }
    }

    /// Add column aliases to the CTE
    pub fn with_columns(mut self, columns: Vec<impl Into<Ident>>) -> Self {
        self.columns = columns.into_iter().map(|c| c.into()).collect();
        self
    }
}

/// A WITH clause: one or more CTEs, optionally RECURSIVE
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithClause {
    pub recursive: bool,
    pub ctes: Vec<Cte>,
}

impl WithClause {
    pub fn new(ctes: Vec<Cte>) -> Self {
        Self {
            recursive: false,
            ctes,
        }
    }

    pub fn recursive(ctes: Vec<Cte>) -> Self {
        Self {
            recursive: true,
            ctes,
        }
    }

    pub fn get(&self, name: &Ident) -> Option<&Cte> {
        self.ctes.iter().find(|c| &c.name == name)
    }
}
