//! Parenthesized join groups
//!
//! A nested group is built in its own scope with the same join vocabulary
//! as a FROM clause. When the group closes, its aliases are merged into
//! the enclosing scope so later predicates can reference them.

use super::accumulator::NestedKind;
use super::core::StatementBuilder;
use super::query::SelectBuilder;
use super::stage::{CanJoin, FromTable, Joined, Start};
use crate::ast::{Ident, JoinKind, NestedJoin, Query, TableSource};
use crate::error::BuildResult;

pub type NestedJoinBuilder<'s, S> = StatementBuilder<'s, NestedKind, S>;

impl<'s> NestedJoinBuilder<'s, Start> {
    /// First table of the group
    pub fn table(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<NestedJoinBuilder<'s, FromTable>> {
        self.add_table(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }

    pub fn derived<F>(
        mut self,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<NestedJoinBuilder<'s, Joined>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.add_derived(JoinKind::None, alias.into(), false, f)?;
        Ok(self.into_stage())
    }

    pub fn cte(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<NestedJoinBuilder<'s, Joined>> {
        self.add_cte_ref(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }

    pub fn nested<F>(mut self, f: F) -> BuildResult<NestedJoinBuilder<'s, Joined>>
    where
        F: FnOnce(NestedJoinBuilder<'_, Start>) -> BuildResult<NestedJoin>,
    {
        self.add_nested(JoinKind::None, f)?;
        Ok(self.into_stage())
    }
}

impl<S: CanJoin> NestedJoinBuilder<'_, S> {
    /// Finish the group. The enclosing builder merges its aliases.
    pub fn close(self) -> BuildResult<NestedJoin> {
        self.ensure_active()?;
        let group = self.acc.into_node();
        crate::ast::validate_chain(&group.blocks)?;
        Ok(group)
    }
}
