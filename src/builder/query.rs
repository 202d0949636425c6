//! SELECT construction
//!
//! Clauses are accepted in SQL order. Qualified column references are
//! checked against the visible scopes as each clause is added, except
//! the select list: it is checked when the query is finished, once the
//! FROM clause has bound every alias.

use super::accumulator::{QueryKind, SelectKind, Statement};
use super::core::{ExprScope, HasBlocks, HasFilter, HasHints, HasOrdering, StatementBuilder};
use super::cte::WithBuilder;
use super::nested::NestedJoinBuilder;
use super::set_op::SetQueryBuilder;
use super::stage::{
    CanBracket, CanFinish, CanGroupBy, CanHaving, CanInto, CanLimit, CanLock, CanOrderBy,
    CanPreface, CanProject, CanSetOp, CanWhere, CanWindow, Filtered, FromTable, GroupRolled,
    Grouped, Having, IntoVars, Joined, Limited, Locked, OrderRolled, Ordered, Projected,
    SetOpen, Start, WithDone, Windowed,
};
use crate::ast::{
    Expr, Hint, Ident, JoinKind, Limit, LockClause, LockStrength, LockWait, NamedWindow,
    NestedJoin, OrderByExpr, Query, SelectColumn, SelectModifier, SelectStmt, SetOperator,
    TableSource, TabularBlock, WindowSpec,
};
use crate::error::{BuildError, BuildResult};
use tracing::{debug, warn};

/// Builder for a simple SELECT
pub type SelectBuilder<'s, S> = StatementBuilder<'s, SelectKind, S>;

impl HasBlocks for SelectKind {
    fn blocks_mut(node: &mut SelectStmt) -> &mut Vec<TabularBlock> {
        &mut node.from
    }
}

impl HasFilter for SelectKind {
    fn where_mut(node: &mut SelectStmt) -> &mut Vec<Expr> {
        &mut node.where_clause
    }
}

impl HasOrdering for SelectKind {
    fn order_by_mut(node: &mut SelectStmt) -> &mut Vec<OrderByExpr> {
        &mut node.order_by
    }

    fn limit_mut(node: &mut SelectStmt) -> &mut Option<Limit> {
        &mut node.limit
    }
}

impl HasHints for SelectKind {
    fn hints_mut(node: &mut SelectStmt) -> &mut Vec<Hint> {
        &mut node.hints
    }
}

impl<'s> SelectBuilder<'s, Start> {
    /// `with name as (...), ...`
    pub fn with<F>(mut self, f: F) -> BuildResult<SelectBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(false, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }

    /// `with recursive ...`; each CTE may reference itself
    pub fn with_recursive<F>(mut self, f: F) -> BuildResult<SelectBuilder<'s, WithDone>>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        let clause = self.build_with(true, f)?;
        self.node().with = Some(clause);
        Ok(self.into_stage())
    }
}

impl<'s, S: CanPreface> SelectBuilder<'s, S> {
    /// Optimizer hint comment, `/*+ ... */`
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.push_hint(Hint::new(hint));
        self
    }

    pub fn hint_since(mut self, hint: Hint) -> Self {
        self.push_hint(hint);
        self
    }

    /// Repeated modifiers are recorded once.
    pub fn modifier(mut self, modifier: SelectModifier) -> Self {
        let modifiers = &mut self.node().modifiers;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
        self
    }

    pub fn distinct(self) -> Self {
        self.modifier(SelectModifier::Distinct)
    }
}

impl<'s, S: CanProject> SelectBuilder<'s, S> {
    /// Append to the select list
    pub fn select<I>(mut self, items: I) -> BuildResult<SelectBuilder<'s, Projected>>
    where
        I: IntoIterator,
        I::Item: Into<SelectColumn>,
    {
        self.ensure_active()?;
        let items: Vec<SelectColumn> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "select" });
        }
        self.node().columns.extend(items);
        Ok(self.into_stage())
    }

    /// Append a select-list entry that may contain subqueries. It is built
    /// when the query is finished, so it can reference any FROM alias.
    pub fn select_with<F>(mut self, f: F) -> BuildResult<SelectBuilder<'s, Projected>>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<SelectColumn> + 's,
    {
        self.ensure_active()?;
        let position = self.acc.node().columns.len() + self.deferred.len();
        self.deferred.push((position, Box::new(f)));
        Ok(self.into_stage())
    }
}

impl<'s> SelectBuilder<'s, Projected> {
    pub fn from(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<SelectBuilder<'s, FromTable>> {
        self.add_table(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }

    /// `from (select ...) as alias`
    pub fn from_derived<F>(
        mut self,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<SelectBuilder<'s, Joined>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.add_derived(JoinKind::None, alias.into(), false, f)?;
        Ok(self.into_stage())
    }

    pub fn from_cte(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<SelectBuilder<'s, Joined>> {
        self.add_cte_ref(JoinKind::None, source.into())?;
        Ok(self.into_stage())
    }

    /// `from (a join b on ...)`
    pub fn from_nested<F>(mut self, f: F) -> BuildResult<SelectBuilder<'s, Joined>>
    where
        F: FnOnce(NestedJoinBuilder<'_, Start>) -> BuildResult<NestedJoin>,
    {
        self.add_nested(JoinKind::None, f)?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanWhere> SelectBuilder<'s, S> {
    pub fn r#where(mut self, predicate: Expr) -> BuildResult<SelectBuilder<'s, Filtered>> {
        self.push_where(predicate)?;
        Ok(self.into_stage())
    }

    /// Several AND-ed predicates at once
    pub fn where_all(
        mut self,
        predicates: impl IntoIterator<Item = Expr>,
    ) -> BuildResult<SelectBuilder<'s, Filtered>> {
        self.push_where_all(predicates.into_iter().collect())?;
        Ok(self.into_stage())
    }

    /// WHERE only when `predicate` is present
    pub fn where_if(mut self, predicate: Option<Expr>) -> BuildResult<SelectBuilder<'s, Filtered>> {
        if let Some(p) = predicate {
            self.push_where(p)?;
        }
        Ok(self.into_stage())
    }

    pub fn where_with<F>(mut self, f: F) -> BuildResult<SelectBuilder<'s, Filtered>>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        self.push_where_with(f)?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanGroupBy> SelectBuilder<'s, S> {
    pub fn group_by<I>(mut self, items: I) -> BuildResult<SelectBuilder<'s, Grouped>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        let items: Vec<OrderByExpr> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "group by" });
        }
        self.check_all(items.iter().map(|o| &o.expr))?;
        self.node().group_by.extend(items);
        Ok(self.into_stage())
    }

    /// GROUP BY, or nothing when `items` is empty
    pub fn group_by_if<I>(self, items: I) -> BuildResult<SelectBuilder<'s, Grouped>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        let items: Vec<OrderByExpr> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Ok(self.into_stage());
        }
        self.group_by(items)
    }
}

impl<'s> SelectBuilder<'s, Grouped> {
    pub fn with_rollup(mut self) -> BuildResult<SelectBuilder<'s, GroupRolled>> {
        self.ensure_active()?;
        if self.acc.node().group_by.is_empty() {
            return Err(BuildError::stage("with rollup", "no group by items"));
        }
        self.node().group_with_rollup = true;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanHaving> SelectBuilder<'s, S> {
    /// HAVING without a GROUP BY list is dropped.
    pub fn having(mut self, predicate: Expr) -> BuildResult<SelectBuilder<'s, Having>> {
        self.check(&predicate)?;
        if self.acc.node().group_by.is_empty() {
            warn!(scope = %self.scope, "having without group by dropped");
        } else {
            self.node().having.push(predicate);
        }
        Ok(self.into_stage())
    }

    pub fn having_if(self, predicate: Option<Expr>) -> BuildResult<SelectBuilder<'s, Having>> {
        match predicate {
            Some(p) => self.having(p),
            None => Ok(self.into_stage()),
        }
    }
}

impl<'s> SelectBuilder<'s, Having> {
    pub fn and_having(mut self, predicate: Expr) -> BuildResult<Self> {
        self.check(&predicate)?;
        if !self.acc.node().group_by.is_empty() {
            self.node().having.push(predicate);
        }
        Ok(self)
    }
}

impl<'s, S: CanWindow> SelectBuilder<'s, S> {
    /// Named window, `window name as (spec)`
    pub fn window(
        mut self,
        name: impl Into<Ident>,
        spec: WindowSpec,
    ) -> BuildResult<SelectBuilder<'s, Windowed>> {
        let name = name.into();
        self.check_all(spec.exprs())?;
        let windows = &mut self.node().windows;
        if windows.iter().any(|w| w.name == name) {
            return Err(BuildError::stage(
                "window",
                format!("window `{name}` defined twice"),
            ));
        }
        windows.push(NamedWindow { name, spec });
        Ok(self.into_stage())
    }
}

impl<'s, S: CanOrderBy> SelectBuilder<'s, S> {
    pub fn order_by<I>(mut self, items: I) -> BuildResult<SelectBuilder<'s, Ordered>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        self.push_order_by(items.into_iter().map(Into::into).collect())?;
        Ok(self.into_stage())
    }

    /// ORDER BY, or nothing when `items` is empty
    pub fn order_by_if<I>(self, items: I) -> BuildResult<SelectBuilder<'s, Ordered>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        let items: Vec<OrderByExpr> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Ok(self.into_stage());
        }
        self.order_by(items)
    }
}

impl<'s> SelectBuilder<'s, Ordered> {
    pub fn with_rollup(mut self) -> BuildResult<SelectBuilder<'s, OrderRolled>> {
        self.ensure_active()?;
        if self.acc.node().order_by.is_empty() {
            return Err(BuildError::stage("with rollup", "no order by items"));
        }
        self.node().order_with_rollup = true;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanLimit> SelectBuilder<'s, S> {
    pub fn limit(mut self, row_count: u64) -> BuildResult<SelectBuilder<'s, Limited>> {
        self.put_limit(Limit::new(row_count))?;
        Ok(self.into_stage())
    }

    pub fn limit_offset(
        mut self,
        offset: u64,
        row_count: u64,
    ) -> BuildResult<SelectBuilder<'s, Limited>> {
        self.put_limit(Limit::with_offset(offset, row_count))?;
        Ok(self.into_stage())
    }

    pub fn limit_if(mut self, row_count: Option<u64>) -> BuildResult<SelectBuilder<'s, Limited>> {
        if let Some(n) = row_count {
            self.put_limit(Limit::new(n))?;
        }
        Ok(self.into_stage())
    }
}

impl<'s, S: CanLock> SelectBuilder<'s, S> {
    /// Set the locking clause; a later call replaces an earlier one.
    pub fn lock(mut self, clause: LockClause) -> BuildResult<SelectBuilder<'s, Locked>> {
        self.ensure_active()?;
        let scope = self.scope;
        if let Some(old) = self.node().lock.replace(clause) {
            debug!(scope = %scope, old = old.strength.as_sql(), "lock clause replaced");
        }
        Ok(self.into_stage())
    }

    pub fn for_update(self) -> BuildResult<SelectBuilder<'s, Locked>> {
        self.lock(LockClause::new(LockStrength::ForUpdate))
    }

    pub fn for_share(self) -> BuildResult<SelectBuilder<'s, Locked>> {
        self.lock(LockClause::new(LockStrength::ForShare))
    }

    pub fn lock_in_share_mode(self) -> BuildResult<SelectBuilder<'s, Locked>> {
        self.lock(LockClause::new(LockStrength::LockInShareMode))
    }
}

impl<'s> SelectBuilder<'s, Locked> {
    fn lock_mut(&mut self, clause: &'static str) -> BuildResult<&mut LockClause> {
        self.ensure_active()?;
        match self.node().lock.as_mut() {
            Some(lock) if lock.strength != LockStrength::LockInShareMode => Ok(lock),
            _ => Err(BuildError::stage(clause, "requires for update or for share")),
        }
    }

    /// `of a, b`; each name must be a visible alias
    pub fn of<I>(mut self, aliases: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let aliases: Vec<Ident> = aliases.into_iter().map(Into::into).collect();
        if aliases.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "of" });
        }
        for alias in &aliases {
            self.stack.resolve_alias(alias)?;
        }
        self.lock_mut("of")?.of.extend(aliases);
        Ok(self)
    }

    pub fn nowait(mut self) -> BuildResult<Self> {
        self.lock_mut("nowait")?.wait = Some(LockWait::NoWait);
        Ok(self)
    }

    pub fn skip_locked(mut self) -> BuildResult<Self> {
        self.lock_mut("skip locked")?.wait = Some(LockWait::SkipLocked);
        Ok(self)
    }
}

impl<'s, S: CanInto> SelectBuilder<'s, S> {
    /// `into @a, @b`
    pub fn into_vars<I>(mut self, vars: I) -> BuildResult<SelectBuilder<'s, IntoVars>>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.ensure_active()?;
        let vars: Vec<Ident> = vars.into_iter().map(Into::into).collect();
        if vars.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "into" });
        }
        self.node().into_vars = vars;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanSetOp> SelectBuilder<'s, S> {
    pub fn union<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.set_op(SetOperator::Union, f)
    }

    pub fn union_all<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.set_op(SetOperator::UnionAll, f)
    }

    pub fn union_distinct<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.set_op(SetOperator::UnionDistinct, f)
    }

    /// Finish this query as the left operand and build the right one in a
    /// fresh scope.
    pub fn set_op<F>(mut self, op: SetOperator, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.finish_simple()?;
        self.map_kind::<QueryKind, SetOpen>(Query::simple)
            .combine(op, f)
    }
}

impl<'s, S: CanBracket> SelectBuilder<'s, S> {
    /// Wrap the query so far in parentheses
    pub fn bracket(mut self) -> BuildResult<SetQueryBuilder<'s, SetOpen>> {
        self.finish_simple()?;
        self.map_kind::<QueryKind, SetOpen>(Query::simple).wrap()
    }
}

impl<'s, S: CanFinish> SelectBuilder<'s, S> {
    /// Validate, pop this builder's scope and freeze.
    pub fn prepare(mut self) -> BuildResult<Statement<QueryKind>> {
        self.finish_simple()?;
        self.map_kind::<QueryKind, S>(Query::simple).finalize()
    }

    /// Validate and hand the query to the enclosing builder. The scope is
    /// popped by whoever opened it.
    pub fn as_query(mut self) -> BuildResult<Query> {
        self.finish_simple()?;
        Ok(Query::simple(self.acc.into_node()))
    }
}

impl<S> SelectBuilder<'_, S> {
    fn resolve_deferred(&mut self) -> BuildResult<()> {
        let mut deferred = std::mem::take(&mut self.deferred);
        deferred.sort_by_key(|(position, _)| *position);
        for (position, build) in deferred {
            let column = build(&mut ExprScope::new(&mut *self.stack))?;
            let columns = &mut self.acc.node_mut().columns;
            let at = position.min(columns.len());
            columns.insert(at, column);
        }
        Ok(())
    }

    fn finish_simple(&mut self) -> BuildResult<()> {
        self.ensure_active()?;
        self.resolve_deferred()?;
        let node = self.acc.node();
        for column in &node.columns {
            match column {
                SelectColumn::Expr { expr, .. } => self.stack.check_expr(expr)?,
                SelectColumn::QualifiedStar { table } => {
                    self.stack.resolve_alias(table)?;
                }
                SelectColumn::Star => {}
            }
        }
        node.validate()?;
        debug!(
            scope = %self.scope,
            columns = node.columns.len(),
            blocks = node.from.len(),
            "select finished"
        );
        Ok(())
    }
}
