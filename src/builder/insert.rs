//! INSERT and REPLACE construction
//!
//! A statement takes its rows from exactly one source: VALUES rows, a SET
//! assignment list or a sub-select. The stage types keep the first two
//! apart once one is chosen; the accumulator rejects any mix that reaches
//! it anyway.

use super::accumulator::{InsertKind, Statement};
use super::context::{AliasTarget, ScopeKind};
use super::core::{HasHints, StatementBuilder};
use super::query::SelectBuilder;
use super::stage::{
    CanInsertFinish, CanInsertSource, CanOnDuplicate, InsertAssigned, InsertColumns,
    InsertDuplicate, InsertRows, InsertSelected, InsertTarget, Start,
};
use crate::ast::{
    Assignment, ColumnRef, Expr, Hint, Ident, InsertModifier, InsertStmt, InsertVerb, Query,
    TableRef,
};
use crate::error::{BuildError, BuildResult};
use tracing::debug;

pub type InsertBuilder<'s, S> = StatementBuilder<'s, InsertKind, S>;

impl HasHints for InsertKind {
    fn hints_mut(node: &mut InsertStmt) -> &mut Vec<Hint> {
        &mut node.hints
    }
}

impl<'s, S> InsertBuilder<'s, S> {
    /// Record the target and bind its name in the statement scope.
    pub(crate) fn target(mut self, verb: InsertVerb, table: TableRef) -> BuildResult<Self> {
        self.ensure_active()?;
        let columns = self.stack.table_columns(&table)?;
        self.stack.register_alias(
            self.scope,
            table.name.clone(),
            AliasTarget::Table {
                table: table.clone(),
                columns,
            },
        )?;
        let node = self.node();
        node.verb = verb;
        node.table = Some(table);
        Ok(self)
    }

    fn target_name(&self) -> BuildResult<Ident> {
        self.acc
            .node()
            .table
            .as_ref()
            .map(|t| t.name.clone())
            .ok_or_else(|| BuildError::stage("insert", "no target table"))
    }

    /// Unqualified columns are checked against the target table.
    fn check_target_column(&self, column: &ColumnRef) -> BuildResult<()> {
        match &column.table_alias {
            Some(_) => self.stack.check_column(column),
            None => self
                .stack
                .check_column(&ColumnRef::qualified(self.target_name()?, column.column.clone())),
        }
    }

    fn checked_assignment(&self, column: ColumnRef, value: Expr) -> BuildResult<Assignment> {
        self.ensure_active()?;
        self.check_target_column(&column)?;
        self.stack.check_expr(&value)?;
        Ok(Assignment { column, value })
    }

    fn push_values(&mut self, row: Vec<Expr>) -> BuildResult<()> {
        self.check_all(&row)?;
        self.node().push_row(row)
    }
}

impl<'s> InsertBuilder<'s, InsertTarget> {
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.push_hint(Hint::new(hint));
        self
    }

    pub fn modifier(mut self, modifier: InsertModifier) -> Self {
        let modifiers = &mut self.node().modifiers;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
        self
    }

    pub fn ignore(self) -> Self {
        self.modifier(InsertModifier::Ignore)
    }

    pub fn partition<I>(mut self, names: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let names: Vec<Ident> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(BuildError::EmptyClauseList {
                clause: "partition",
            });
        }
        self.node().partitions.extend(names);
        Ok(self)
    }

    /// Explicit column list; every VALUES row must match its width.
    pub fn columns<I>(mut self, columns: I) -> BuildResult<InsertBuilder<'s, InsertColumns>>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.ensure_active()?;
        let columns: Vec<Ident> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "columns" });
        }
        for column in &columns {
            self.check_target_column(&ColumnRef::new(column.clone()))?;
        }
        self.node().columns = columns;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanInsertSource> InsertBuilder<'s, S> {
    /// First VALUES row
    pub fn values(
        mut self,
        row: impl IntoIterator<Item = Expr>,
    ) -> BuildResult<InsertBuilder<'s, InsertRows>> {
        self.push_values(row.into_iter().collect())?;
        Ok(self.into_stage())
    }

    pub fn values_rows<R>(mut self, rows: R) -> BuildResult<InsertBuilder<'s, InsertRows>>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = Expr>,
    {
        let mut count = 0;
        for row in rows {
            self.push_values(row.into_iter().collect())?;
            count += 1;
        }
        if count == 0 {
            return Err(BuildError::EmptyClauseList { clause: "values" });
        }
        Ok(self.into_stage())
    }

    /// `set col = value`
    pub fn set(
        mut self,
        column: impl Into<ColumnRef>,
        value: Expr,
    ) -> BuildResult<InsertBuilder<'s, InsertAssigned>> {
        let assignment = self.checked_assignment(column.into(), value)?;
        self.node().push_assignment(assignment)?;
        Ok(self.into_stage())
    }

    /// `insert ... select`; the query is built in its own scope.
    pub fn select_query<F>(mut self, f: F) -> BuildResult<InsertBuilder<'s, InsertSelected>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.ensure_active()?;
        let query = self.stack.with_child(ScopeKind::Subquery, |stack, id| {
            f(StatementBuilder::nested_in(stack, id))
        })?;
        self.node().set_query(query)?;
        Ok(self.into_stage())
    }
}

impl<'s> InsertBuilder<'s, InsertRows> {
    pub fn values(mut self, row: impl IntoIterator<Item = Expr>) -> BuildResult<Self> {
        self.push_values(row.into_iter().collect())?;
        Ok(self)
    }

    pub fn values_rows<R>(mut self, rows: R) -> BuildResult<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = Expr>,
    {
        for row in rows {
            self.push_values(row.into_iter().collect())?;
        }
        Ok(self)
    }
}

impl<'s> InsertBuilder<'s, InsertAssigned> {
    pub fn set(mut self, column: impl Into<ColumnRef>, value: Expr) -> BuildResult<Self> {
        let assignment = self.checked_assignment(column.into(), value)?;
        self.node().push_assignment(assignment)?;
        Ok(self)
    }

    pub fn set_if(self, column: impl Into<ColumnRef>, value: Option<Expr>) -> BuildResult<Self> {
        match value {
            Some(v) => self.set(column, v),
            None => Ok(self),
        }
    }
}

impl<'s, S: CanOnDuplicate> InsertBuilder<'s, S> {
    /// `on duplicate key update col = value, ...`
    pub fn on_duplicate_key_update<I, C>(
        mut self,
        assignments: I,
    ) -> BuildResult<InsertBuilder<'s, InsertDuplicate>>
    where
        I: IntoIterator<Item = (C, Expr)>,
        C: Into<ColumnRef>,
    {
        if self.acc.node().verb == InsertVerb::Replace {
            return Err(BuildError::stage(
                "on duplicate key update",
                "not allowed on replace",
            ));
        }
        let mut list = Vec::new();
        for (column, value) in assignments {
            list.push(self.checked_assignment(column.into(), value)?);
        }
        if list.is_empty() {
            return Err(BuildError::EmptyClauseList {
                clause: "on duplicate key update",
            });
        }
        self.node().on_duplicate.extend(list);
        Ok(self.into_stage())
    }
}

impl<'s, S: CanInsertFinish> InsertBuilder<'s, S> {
    pub fn prepare(self) -> BuildResult<Statement<InsertKind>> {
        self.ensure_active()?;
        let node = self.acc.node();
        debug!(
            verb = node.verb.as_sql(),
            source = node.source.as_ref().map_or("none", |s| s.name()),
            "insert finished"
        );
        self.finalize()
    }
}
