//! Stepwise, scope-checked construction of SQL statement ASTs
//!
//! `stmtcraft` builds SELECT, INSERT/REPLACE, UPDATE and DELETE statements
//! through fluent builders whose stage types admit only the clauses that
//! may legally come next. Table aliases and CTE names are tracked on an
//! explicit context stack, so every reference is resolved while the
//! statement is being built rather than when it reaches the database.
//!
//! # Architecture
//!
//! - [`builder`]: stage-typed builders, the context stack and the
//!   accumulator that freezes a finished statement
//! - [`ast`]: the statement tree and the reference SQL renderer
//! - [`metadata`]: optional table catalog used to validate references
//! - [`dialect`], [`config`], [`telemetry`]: rendering targets, settings
//!   and logging
//!
//! # Example
//!
//! ```rust
//! use stmtcraft::prelude::*;
//!
//! let stmt = Statements::new()
//!     .query()
//!     .select([SelectColumn::expr(Expr::qualified_column("u", "name"))])?
//!     .from(("users", "u"))?
//!     .left_join(("orders", "o"))?
//!     .on([Expr::qualified_column("o", "user_id").eq(Expr::qualified_column("u", "id"))])?
//!     .r#where(Expr::qualified_column("u", "id").eq(Expr::value(7)))?
//!     .prepare()?;
//!
//! let rendered = stmt.render(&RenderConfig::default())?;
//! assert_eq!(
//!     rendered.sql,
//!     "select `u`.`name` from `users` as `u` \
//!      left join `orders` as `o` on `o`.`user_id` = `u`.`id` \
//!      where `u`.`id` = ?"
//! );
//! assert_eq!(rendered.params, vec![ParamValue::Integer(7)]);
//! # Ok::<(), BuildError>(())
//! ```

pub mod ast;
pub mod builder;
pub mod config;
pub mod dialect;
pub mod error;
pub mod metadata;
pub mod telemetry;

pub use config::RenderConfig;
pub use dialect::{Dialect, MySqlVersion};
pub use error::{BuildError, BuildResult, ErrorKind};

/// The types most statements need
pub mod prelude {
    pub use crate::ast::{
        BatchRow, Expr, Ident, OrderByExpr, ParamValue, Query, RenderedSql, SelectColumn,
        TableRef, TableSource,
    };
    pub use crate::builder::{Statement, Statements};
    pub use crate::config::RenderConfig;
    pub use crate::dialect::Dialect;
    pub use crate::error::{BuildError, BuildResult};
    pub use crate::metadata::{InMemoryCatalog, MetadataProvider};
}
