//! SQL Abstract Syntax Tree (AST) module
//!
//! This module provides a type-safe representation of SQL statements that
//! the builders in [`crate::builder`] assemble and freeze. The nodes are
//! plain data: they can also be constructed directly and rendered without
//! going through a builder.
//!
//! # Architecture
//!
//! The AST is built from several components:
//!
//! - [`expr`]: SQL expressions (columns, literals, operators, functions)
//! - [`table`]: table references and the tabular block chain of FROM
//! - [`stmt`]: SQL statements (SELECT, INSERT/REPLACE, UPDATE, DELETE)
//! - [`cte`]: Common Table Expressions (WITH clauses)
//! - [`params`]: host values and batch parameter rows
//! - [`render`]: SQL string generation
//!
//! # Example
//!
//! ```rust
//! use stmtcraft::ast::*;
//! use stmtcraft::Dialect;
//!
//! let stmt = SelectStmt::columns(vec![SelectColumn::star()])
//!     .with_from(vec![TabularBlock::new(
//!         JoinKind::None,
//!         TabularItem::Table(TableRef::new("users")),
//!         Some(Ident::new("u")),
//!     )])
//!     .with_where(Expr::qualified_column("u", "id").eq(Expr::value(1)));
//!
//! let (sql, params) = render(&Stmt::Query(Query::simple(stmt)), Dialect::mysql8()).unwrap();
//! assert_eq!(sql, "select * from `users` as `u` where `u`.`id` = ?");
//! assert_eq!(params.len(), 1);
//! ```

mod cte;
mod expr;
mod params;
mod render;
mod stmt;
mod table;

// Re-export all public types
pub use cte::*;
pub use expr::*;
pub use params::*;
pub use render::*;
pub use stmt::*;
pub use table::*;

#[cfg(test)]
mod tests;
