//! DELETE construction
//!
//! `delete from t ...` names one table and may take ORDER BY / LIMIT.
//! `delete a, b from ...` lists target aliases first, then a full block
//! chain; every target must be bound by that chain when prepared.

use super::accumulator::{DeleteKind, Statement};
use super::core::{ExprScope, HasBlocks, HasFilter, HasHints, HasOrdering, StatementBuilder};
use super::cte::WithBuilder;
use super::stage::{
    CanDeleteFinish, CanDeleteLimit, CanDeleteOrder, CanDeleteWhere, CanPreface, DeleteTarget,
    DeleteTargets, Filtered, FromTable, Limited, Ordered, Start, WithDone,
};
use crate::ast::{
    DeleteModifier, DeleteStmt, Expr, Hint, Ident, JoinKind, Limit, OrderByExpr, TableSource,
    TabularBlock,
};
use crate::error::{BuildError, BuildResult};

pub type DeleteBuilder<'s, S> = StatementBuilder<'s, DeleteKind, S>;

impl HasBlocks for DeleteKind {
    fn blocks_mut(node: &mut DeleteStmt) -> &mut Vec<TabularBlock> {
        &mut node.from
    }
}

impl HasFilter for DeleteKind {
    fn where_mut(node: &mut DeleteStmt) -> &mut Vec<Expr> {
        &mut node.where_clause
    }
}

impl HasOrdering for DeleteKind {
    fn order_by_mut(node: &mut DeleteStmt) -> &mut Vec<OrderByExpr> {
        &mut node.order_by
    }

    fn limit_mut(node: &mut DeleteStmt) -> &mut Option<Limit> {
        &mut node.limit
    }
}

impl HasHints for DeleteKind {
    fn hints_mut(node: &mut DeleteStmt) -> &mut Vec<Hint> {
        &mut node.hints
    }
}

impl<'s> DeleteBuilder<'s, Start> {
    pub fn with<F>(mut self, f: F) -> BuildResult<DeleteBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(false, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }

    pub fn with_recursive<F>(mut self, f: F) -> BuildResult<DeleteBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(true, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }
}

impl<'s, S: CanPreface> DeleteBuilder<'s, S> {
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.push_hint(Hint::new(hint));
        self
    }

    pub fn modifier(mut self, modifier: DeleteModifier) -> Self {
        let modifiers = &mut self.node().modifiers;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
        self
    }

    /// Single-table form
    pub fn from(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<DeleteBuilder<'s, DeleteTarget>> {
        self.add_table(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }

    /// Multi-table form; the aliases are checked once FROM is complete.
    pub fn targets<I>(mut self, aliases: I) -> BuildResult<DeleteBuilder<'s, DeleteTargets>>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.ensure_active()?;
        let aliases: Vec<Ident> = aliases.into_iter().map(Into::into).collect();
        if aliases.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "delete" });
        }
        self.node().targets = aliases;
        Ok(self.into_stage())
    }
}

impl<'s> DeleteBuilder<'s, DeleteTargets> {
    pub fn from(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<DeleteBuilder<'s, FromTable>> {
        self.add_table(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }
}

impl<'s, S> DeleteBuilder<'s, S> {
    fn single_table_only(&self, clause: &'static str) -> BuildResult<()> {
        if self.acc.node().is_multi_table() {
            return Err(BuildError::stage(clause, "not allowed on multi-table delete"));
        }
        Ok(())
    }
}

impl<'s, S: CanDeleteWhere> DeleteBuilder<'s, S> {
    pub fn r#where(mut self, predicate: Expr) -> BuildResult<DeleteBuilder<'s, Filtered>> {
        self.push_where(predicate)?;
        Ok(self.into_stage())
    }

    pub fn where_if(mut self, predicate: Option<Expr>) -> BuildResult<DeleteBuilder<'s, Filtered>> {
        if let Some(p) = predicate {
            self.push_where(p)?;
        }
        Ok(self.into_stage())
    }

    pub fn where_with<F>(mut self, f: F) -> BuildResult<DeleteBuilder<'s, Filtered>>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        self.push_where_with(f)?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanDeleteOrder> DeleteBuilder<'s, S> {
    /// Single-table deletes only
    pub fn order_by<I>(mut self, items: I) -> BuildResult<DeleteBuilder<'s, Ordered>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        self.single_table_only("order by")?;
        self.push_order_by(items.into_iter().map(Into::into).collect())?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanDeleteLimit> DeleteBuilder<'s, S> {
    /// Single-table deletes only
    pub fn limit(mut self, row_count: u64) -> BuildResult<DeleteBuilder<'s, Limited>> {
        self.single_table_only("limit")?;
        self.put_limit(Limit::new(row_count))?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanDeleteFinish> DeleteBuilder<'s, S> {
    pub fn prepare(self) -> BuildResult<Statement<DeleteKind>> {
        self.ensure_active()?;
        for target in &self.acc.node().targets {
            self.stack.resolve_alias(target)?;
        }
        self.finalize()
    }
}
