//! Stage-typed statement builders
//!
//! [`Statements`] opens a top-level build. Each call returns a builder
//! whose stage type only offers the clauses that may legally come next,
//! so statements are written in SQL order:
//!
//! ```rust
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::{Expr, OrderByExpr, SelectColumn};
//!
//! let stmt = Statements::new()
//!     .query()
//!     .select([SelectColumn::expr(Expr::qualified_column("a", "id"))])?
//!     .from(("t", "a"))?
//!     .r#where(Expr::qualified_column("a", "id").eq(Expr::int(1)))?
//!     .order_by([OrderByExpr::new(Expr::qualified_column("a", "id"))])?
//!     .limit(10)?
//!     .prepare()?;
//! assert_eq!(stmt.kind_name(), "query");
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```
//!
//! Clauses out of order are not expressible. WHERE cannot precede FROM:
//!
//! ```compile_fail
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::{Expr, SelectColumn};
//!
//! let _ = Statements::new()
//!     .query()
//!     .select([SelectColumn::star()])?
//!     .r#where(Expr::int(1))?;
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```
//!
//! The select list cannot be extended once filtering started:
//!
//! ```compile_fail
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::{Expr, SelectColumn};
//!
//! let _ = Statements::new()
//!     .query()
//!     .select([SelectColumn::star()])?
//!     .from("t")?
//!     .r#where(Expr::int(1))?
//!     .select([SelectColumn::star()])?;
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```
//!
//! A query with a trailing ORDER BY cannot be a left set operand without
//! brackets:
//!
//! ```compile_fail
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::{Expr, OrderByExpr, SelectColumn};
//!
//! let _ = Statements::new()
//!     .query()
//!     .select([SelectColumn::star()])?
//!     .from("t")?
//!     .order_by([OrderByExpr::new(Expr::column("id"))])?
//!     .union(|q| q.select([SelectColumn::star()])?.from("u")?.as_query())?;
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```
//!
//! A join that needs a predicate cannot be finished without one:
//!
//! ```compile_fail
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::SelectColumn;
//!
//! let _ = Statements::new()
//!     .query()
//!     .select([SelectColumn::star()])?
//!     .from(("t", "a"))?
//!     .left_join(("u", "b"))?
//!     .prepare()?;
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```
//!
//! An UPDATE needs its SET list before WHERE:
//!
//! ```compile_fail
//! use stmtcraft::builder::Statements;
//! use stmtcraft::ast::Expr;
//!
//! let _ = Statements::new()
//!     .update()
//!     .table("t")?
//!     .r#where(Expr::int(1))?;
//! # Ok::<(), stmtcraft::BuildError>(())
//! ```

mod accumulator;
mod context;
mod core;
mod cte;
mod delete;
mod insert;
mod nested;
mod query;
mod set_op;
mod stage;
mod update;

pub use accumulator::{
    BuildMode, ClauseAccumulator, DeleteKind, InsertKind, NestedKind, QueryKind, SelectKind,
    Statement, StatementKind, UpdateKind,
};
pub use context::{AliasTarget, ContextStack, CriteriaContext, CteInfo, ScopeId, ScopeKind};
pub use self::core::{ExprScope, StatementBuilder};
pub use cte::{CteDeclaration, WithBuilder};
pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use nested::NestedJoinBuilder;
pub use query::SelectBuilder;
pub use set_op::SetQueryBuilder;
pub use stage::*;
pub use update::UpdateBuilder;

use crate::ast::{InsertStmt, InsertVerb, SelectStmt, TableRef};
use crate::error::{BuildError, BuildResult};
use crate::metadata::MetadataProvider;
use std::sync::Arc;

/// Entry point for top-level statements
///
/// Each call opens a fresh context stack owned by the returned builder.
/// A metadata provider, when attached, is shared by every statement
/// opened from this value.
#[derive(Debug, Clone, Default)]
pub struct Statements {
    metadata: Option<Arc<dyn MetadataProvider>>,
}

impl Statements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate base tables and qualified columns against `metadata`.
    pub fn with_metadata(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            metadata: Some(metadata),
        }
    }

    fn open<K: StatementKind>(&self, mode: BuildMode) -> StatementBuilder<'static, K, Start> {
        StatementBuilder::open(self.metadata.clone(), ClauseAccumulator::new(mode))
    }

    pub fn query(&self) -> SelectBuilder<'static, Start> {
        self.open(BuildMode::Simple)
    }

    /// SELECT rendered once per parameter row
    pub fn batch_query(&self) -> SelectBuilder<'static, Start> {
        self.open(BuildMode::Batch)
    }

    /// Start a new build cycle on a cleared query accumulator.
    pub fn query_from(
        &self,
        acc: ClauseAccumulator<QueryKind>,
    ) -> BuildResult<SelectBuilder<'static, Start>> {
        if acc.is_prepared() {
            return Err(BuildError::AlreadyPrepared { kind: QueryKind::NAME });
        }
        let acc = acc.retype::<SelectKind>(|_| SelectStmt::default());
        Ok(StatementBuilder::open(self.metadata.clone(), acc))
    }

    pub fn insert_into(
        &self,
        table: impl Into<TableRef>,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        self.insert_with(BuildMode::Simple, InsertVerb::Insert, table.into())
    }

    pub fn replace_into(
        &self,
        table: impl Into<TableRef>,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        self.insert_with(BuildMode::Simple, InsertVerb::Replace, table.into())
    }

    pub fn batch_insert_into(
        &self,
        table: impl Into<TableRef>,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        self.insert_with(BuildMode::Batch, InsertVerb::Insert, table.into())
    }

    pub fn batch_replace_into(
        &self,
        table: impl Into<TableRef>,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        self.insert_with(BuildMode::Batch, InsertVerb::Replace, table.into())
    }

    /// Start a new build cycle on a cleared insert accumulator.
    pub fn insert_from(
        &self,
        acc: ClauseAccumulator<InsertKind>,
        verb: InsertVerb,
        table: impl Into<TableRef>,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        if acc.is_prepared() {
            return Err(BuildError::AlreadyPrepared { kind: InsertKind::NAME });
        }
        let acc = acc.retype::<InsertKind>(|_| InsertStmt::default());
        StatementBuilder::open(self.metadata.clone(), acc)
            .target(verb, table.into())
            .map(StatementBuilder::into_stage)
    }

    fn insert_with(
        &self,
        mode: BuildMode,
        verb: InsertVerb,
        table: TableRef,
    ) -> BuildResult<InsertBuilder<'static, InsertTarget>> {
        self.open::<InsertKind>(mode)
            .target(verb, table)
            .map(StatementBuilder::into_stage)
    }

    pub fn update(&self) -> UpdateBuilder<'static, Start> {
        self.open(BuildMode::Simple)
    }

    pub fn batch_update(&self) -> UpdateBuilder<'static, Start> {
        self.open(BuildMode::Batch)
    }

    pub fn delete(&self) -> DeleteBuilder<'static, Start> {
        self.open(BuildMode::Simple)
    }

    pub fn batch_delete(&self) -> DeleteBuilder<'static, Start> {
        self.open(BuildMode::Batch)
    }
}
