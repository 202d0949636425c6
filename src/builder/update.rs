//! UPDATE construction
//!
//! The table list reuses the FROM block chain, so joins, derived tables
//! and index hints work as they do in SELECT. A statement with more than
//! one block is a multi-table update and cannot take ORDER BY or LIMIT.

use super::accumulator::{Statement, UpdateKind};
use super::core::{ExprScope, HasBlocks, HasFilter, HasHints, HasOrdering, StatementBuilder};
use super::cte::WithBuilder;
use super::stage::{
    Assigned, CanPreface, CanSet, CanUpdateFinish, CanUpdateLimit, CanUpdateOrder, Filtered,
    FromTable, Limited, Ordered, Start, WithDone,
};
use crate::ast::{
    Assignment, ColumnRef, Expr, Hint, JoinKind, Limit, OrderByExpr, TableSource, TabularBlock,
    UpdateModifier, UpdateStmt,
};
use crate::error::{BuildError, BuildResult};

pub type UpdateBuilder<'s, S> = StatementBuilder<'s, UpdateKind, S>;

impl HasBlocks for UpdateKind {
    fn blocks_mut(node: &mut UpdateStmt) -> &mut Vec<TabularBlock> {
        &mut node.tables
    }
}

impl HasFilter for UpdateKind {
    fn where_mut(node: &mut UpdateStmt) -> &mut Vec<Expr> {
        &mut node.where_clause
    }
}

impl HasOrdering for UpdateKind {
    fn order_by_mut(node: &mut UpdateStmt) -> &mut Vec<OrderByExpr> {
        &mut node.order_by
    }

    fn limit_mut(node: &mut UpdateStmt) -> &mut Option<Limit> {
        &mut node.limit
    }
}

impl HasHints for UpdateKind {
    fn hints_mut(node: &mut UpdateStmt) -> &mut Vec<Hint> {
        &mut node.hints
    }
}

impl<'s> UpdateBuilder<'s, Start> {
    pub fn with<F>(mut self, f: F) -> BuildResult<UpdateBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(false, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }

    pub fn with_recursive<F>(mut self, f: F) -> BuildResult<UpdateBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(true, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }
}

impl<'s, S: CanPreface> UpdateBuilder<'s, S> {
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.push_hint(Hint::new(hint));
        self
    }

    pub fn modifier(mut self, modifier: UpdateModifier) -> Self {
        let modifiers = &mut self.node().modifiers;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
        self
    }

    /// First (or only) table to update
    pub fn table(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<UpdateBuilder<'s, FromTable>> {
        self.add_table(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }
}

impl<'s, S> UpdateBuilder<'s, S> {
    fn push_assignment(&mut self, column: ColumnRef, value: Expr) -> BuildResult<()> {
        self.ensure_active()?;
        self.stack.check_column(&column)?;
        self.stack.check_expr(&value)?;
        self.node().assignments.push(Assignment { column, value });
        Ok(())
    }

    fn single_table_only(&self, clause: &'static str) -> BuildResult<()> {
        if self.acc.node().is_multi_table() {
            return Err(BuildError::stage(clause, "not allowed on multi-table update"));
        }
        Ok(())
    }
}

impl<'s, S: CanSet> UpdateBuilder<'s, S> {
    /// `set col = value`
    pub fn set(
        mut self,
        column: impl Into<ColumnRef>,
        value: Expr,
    ) -> BuildResult<UpdateBuilder<'s, Assigned>> {
        self.push_assignment(column.into(), value)?;
        Ok(self.into_stage())
    }
}

impl<'s> UpdateBuilder<'s, Assigned> {
    pub fn set(mut self, column: impl Into<ColumnRef>, value: Expr) -> BuildResult<Self> {
        self.push_assignment(column.into(), value)?;
        Ok(self)
    }

    pub fn set_if(self, column: impl Into<ColumnRef>, value: Option<Expr>) -> BuildResult<Self> {
        match value {
            Some(v) => self.set(column, v),
            None => Ok(self),
        }
    }

    pub fn r#where(mut self, predicate: Expr) -> BuildResult<UpdateBuilder<'s, Filtered>> {
        self.push_where(predicate)?;
        Ok(self.into_stage())
    }

    pub fn where_if(mut self, predicate: Option<Expr>) -> BuildResult<UpdateBuilder<'s, Filtered>> {
        if let Some(p) = predicate {
            self.push_where(p)?;
        }
        Ok(self.into_stage())
    }

    pub fn where_with<F>(mut self, f: F) -> BuildResult<UpdateBuilder<'s, Filtered>>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        self.push_where_with(f)?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanUpdateOrder> UpdateBuilder<'s, S> {
    /// Single-table updates only
    pub fn order_by<I>(mut self, items: I) -> BuildResult<UpdateBuilder<'s, Ordered>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        self.single_table_only("order by")?;
        self.push_order_by(items.into_iter().map(Into::into).collect())?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanUpdateLimit> UpdateBuilder<'s, S> {
    /// Single-table updates only
    pub fn limit(mut self, row_count: u64) -> BuildResult<UpdateBuilder<'s, Limited>> {
        self.single_table_only("limit")?;
        self.put_limit(Limit::new(row_count))?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanUpdateFinish> UpdateBuilder<'s, S> {
    pub fn prepare(self) -> BuildResult<Statement<UpdateKind>> {
        self.ensure_active()?;
        self.finalize()
    }
}
