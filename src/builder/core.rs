//! The generic stage-typed builder and the block chain machinery shared by
//! every statement kind that has a FROM-like table list.

use super::accumulator::{ClauseAccumulator, NestedKind, Statement, StatementKind};
use super::context::{AliasTarget, ContextStack, ScopeId, ScopeKind};
use super::nested::NestedJoinBuilder;
use super::query::SelectBuilder;
use super::stage::{
    CanIndexHint, CanJoin, CanOn, Filtered, FromTable, JoinOn, JoinTableOn, Joined, Start,
};
use crate::ast::{
    BatchRow, Expr, Hint, Ident, IndexHint, IndexHintAction, IndexHintScope, JoinConstraint,
    JoinKind, Limit, NestedJoin, OrderByExpr, Query, SelectColumn, TableSource, TabularBlock,
    TabularItem,
};
use crate::error::{BuildError, BuildResult};
use crate::metadata::MetadataProvider;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, debug_span, trace};

/// The context stack a builder works on: its own for a top-level
/// statement, borrowed from the parent for a sub-statement.
pub(crate) enum StackHandle<'s> {
    Owned(Box<ContextStack>),
    Borrowed(&'s mut ContextStack),
}

impl Deref for StackHandle<'_> {
    type Target = ContextStack;

    fn deref(&self) -> &ContextStack {
        match self {
            Self::Owned(stack) => stack,
            Self::Borrowed(stack) => stack,
        }
    }
}

impl DerefMut for StackHandle<'_> {
    fn deref_mut(&mut self) -> &mut ContextStack {
        match self {
            Self::Owned(stack) => stack,
            Self::Borrowed(stack) => stack,
        }
    }
}

/// A statement under construction, at stage `S`
pub struct StatementBuilder<'s, K: StatementKind, S> {
    pub(crate) stack: StackHandle<'s>,
    pub(crate) scope: ScopeId,
    pub(crate) acc: ClauseAccumulator<K>,
    /// Set by a skipped conditional join; the next ON/USING and index hints are dropped
    pub(crate) skip_constraint: bool,
    /// Select-list entries resolved at prepare, once every FROM alias is bound
    pub(crate) deferred: Vec<DeferredColumn<'s>>,
    _stage: PhantomData<S>,
}

/// A select-list entry built lazily, with its position in the list
pub(crate) type DeferredColumn<'s> = (
    usize,
    Box<dyn FnOnce(&mut ExprScope<'_>) -> BuildResult<SelectColumn> + 's>,
);

impl<K: StatementKind> StatementBuilder<'static, K, Start> {
    /// Open a top-level statement with its own context stack.
    pub(crate) fn open(
        metadata: Option<Arc<dyn MetadataProvider>>,
        acc: ClauseAccumulator<K>,
    ) -> Self {
        let mut stack = Box::new(ContextStack::with_metadata(metadata));
        let scope = stack.push(ScopeKind::Statement);
        Self::from_parts(StackHandle::Owned(stack), scope, acc)
    }
}

impl<'s, K: StatementKind, S> StatementBuilder<'s, K, S> {
    pub(crate) fn from_parts(
        stack: StackHandle<'s>,
        scope: ScopeId,
        acc: ClauseAccumulator<K>,
    ) -> Self {
        Self {
            stack,
            scope,
            acc,
            skip_constraint: false,
            deferred: Vec::new(),
            _stage: PhantomData,
        }
    }

    /// Builder for a sub-statement living in `scope` of a borrowed stack.
    pub(crate) fn nested_in(stack: &'s mut ContextStack, scope: ScopeId) -> Self {
        Self::from_parts(StackHandle::Borrowed(stack), scope, ClauseAccumulator::sub())
    }

    /// Move the accumulator to another statement kind; pending deferred
    /// entries must already be resolved.
    pub(crate) fn map_kind<K2: StatementKind, T>(
        self,
        f: impl FnOnce(K::Node) -> K2::Node,
    ) -> StatementBuilder<'s, K2, T> {
        StatementBuilder::from_parts(self.stack, self.scope, self.acc.retype(f))
    }

    pub(crate) fn into_stage<T>(self) -> StatementBuilder<'s, K, T> {
        StatementBuilder {
            stack: self.stack,
            scope: self.scope,
            acc: self.acc,
            skip_constraint: self.skip_constraint,
            deferred: self.deferred,
            _stage: PhantomData,
        }
    }

    pub(crate) fn ensure_active(&self) -> BuildResult<()> {
        self.stack.assert_active(self.scope)
    }

    pub(crate) fn node(&mut self) -> &mut K::Node {
        self.acc.node_mut()
    }

    /// Check that this builder's scope is active and `expr` resolves.
    pub(crate) fn check(&self, expr: &Expr) -> BuildResult<()> {
        self.ensure_active()?;
        self.stack.check_expr(expr)
    }

    pub(crate) fn check_all<'e>(&self, exprs: impl IntoIterator<Item = &'e Expr>) -> BuildResult<()> {
        self.ensure_active()?;
        self.stack.check_exprs(exprs)
    }

    /// Build an expression that may contain subqueries.
    pub(crate) fn build_expr<F>(&mut self, f: F) -> BuildResult<Expr>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        self.ensure_active()?;
        let expr = f(&mut ExprScope {
            stack: &mut *self.stack,
        })?;
        self.stack.check_expr(&expr)?;
        Ok(expr)
    }

    /// Pop this builder's scope and hand back the accumulator.
    pub(crate) fn release(self) -> BuildResult<ClauseAccumulator<K>> {
        let Self {
            mut stack,
            scope,
            acc,
            ..
        } = self;
        stack.pop_scope(scope)?;
        Ok(acc)
    }

    /// Release and freeze.
    pub(crate) fn finalize(self) -> BuildResult<Statement<K>> {
        let span = debug_span!(
            target: "stmtcraft.prepare",
            "prepare",
            kind = K::NAME,
            scope = %self.scope
        );
        let _guard = span.enter();
        self.release()?.freeze()
    }

    pub fn scope_id(&self) -> ScopeId {
        self.scope
    }

    pub fn context(&self) -> &ContextStack {
        &self.stack
    }

    pub fn accumulator(&self) -> &ClauseAccumulator<K> {
        &self.acc
    }

    /// Attach the batch parameter list.
    pub fn param_list(mut self, rows: Vec<BatchRow>) -> BuildResult<Self> {
        self.acc.set_param_list(rows)?;
        Ok(self)
    }
}

/// Kinds that own a chain of tabular blocks
pub trait HasBlocks: StatementKind {
    fn blocks_mut(node: &mut Self::Node) -> &mut Vec<TabularBlock>;
}

impl HasBlocks for NestedKind {
    fn blocks_mut(node: &mut NestedJoin) -> &mut Vec<TabularBlock> {
        &mut node.blocks
    }
}

/// Kinds with a WHERE clause
pub trait HasFilter: StatementKind {
    fn where_mut(node: &mut Self::Node) -> &mut Vec<Expr>;
}

/// Kinds with ORDER BY and LIMIT
pub trait HasOrdering: StatementKind {
    fn order_by_mut(node: &mut Self::Node) -> &mut Vec<OrderByExpr>;
    fn limit_mut(node: &mut Self::Node) -> &mut Option<Limit>;
}

/// Kinds that carry optimizer hints
pub trait HasHints: StatementKind {
    fn hints_mut(node: &mut Self::Node) -> &mut Vec<Hint>;
}

fn predicate_join(kind: JoinKind) -> BuildResult<()> {
    if kind.requires_predicate() {
        Ok(())
    } else {
        Err(BuildError::IllegalClauseForJoinKind {
            clause: "on",
            join: kind.as_sql(),
        })
    }
}

fn cte_name(source: &TableSource) -> BuildResult<Ident> {
    if source.table.schema.is_some() {
        return Err(BuildError::UnknownCte {
            name: source.table.to_string(),
        });
    }
    Ok(source.table.name.clone())
}

// =============================================================================
// Filter, ordering and hint internals
// =============================================================================

impl<'s, K: HasFilter, S> StatementBuilder<'s, K, S> {
    pub(crate) fn push_where(&mut self, predicate: Expr) -> BuildResult<()> {
        self.check(&predicate)?;
        K::where_mut(self.acc.node_mut()).push(predicate);
        Ok(())
    }

    pub(crate) fn push_where_all(&mut self, predicates: Vec<Expr>) -> BuildResult<()> {
        if predicates.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "where" });
        }
        self.check_all(&predicates)?;
        K::where_mut(self.acc.node_mut()).extend(predicates);
        Ok(())
    }

    pub(crate) fn push_where_with<F>(&mut self, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        let predicate = self.build_expr(f)?;
        K::where_mut(self.acc.node_mut()).push(predicate);
        Ok(())
    }
}

impl<'s, K: HasFilter> StatementBuilder<'s, K, Filtered> {
    /// Another AND-ed WHERE predicate
    pub fn and(mut self, predicate: Expr) -> BuildResult<Self> {
        self.push_where(predicate)?;
        Ok(self)
    }

    pub fn and_if(self, predicate: Option<Expr>) -> BuildResult<Self> {
        match predicate {
            Some(p) => self.and(p),
            None => Ok(self),
        }
    }

    pub fn and_with<F>(mut self, f: F) -> BuildResult<Self>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        self.push_where_with(f)?;
        Ok(self)
    }
}

impl<'s, K: HasOrdering, S> StatementBuilder<'s, K, S> {
    pub(crate) fn push_order_by(&mut self, items: Vec<OrderByExpr>) -> BuildResult<()> {
        if items.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "order by" });
        }
        self.check_all(items.iter().map(|o| &o.expr))?;
        K::order_by_mut(self.acc.node_mut()).extend(items);
        Ok(())
    }

    pub(crate) fn put_limit(&mut self, limit: Limit) -> BuildResult<()> {
        self.ensure_active()?;
        let slot = K::limit_mut(self.acc.node_mut());
        if let Some(old) = slot.replace(limit) {
            debug!(scope = %self.scope, ?old, ?limit, "limit replaced");
        }
        Ok(())
    }
}

impl<'s, K: HasHints, S> StatementBuilder<'s, K, S> {
    pub(crate) fn push_hint(&mut self, hint: Hint) {
        K::hints_mut(self.acc.node_mut()).push(hint);
    }
}

// =============================================================================
// Block chain internals
// =============================================================================

impl<'s, K: HasBlocks, S> StatementBuilder<'s, K, S> {
    fn push_block(&mut self, block: TabularBlock) {
        trace!(
            scope = %self.scope,
            join = block.join.as_sql(),
            block = %block.label(),
            "append block"
        );
        K::blocks_mut(self.acc.node_mut()).push(block);
        self.skip_constraint = false;
    }

    fn last_block_mut(&mut self, clause: &'static str) -> BuildResult<&mut TabularBlock> {
        K::blocks_mut(self.acc.node_mut())
            .last_mut()
            .ok_or_else(|| BuildError::stage(clause, "no table to attach to"))
    }

    pub(crate) fn add_table(&mut self, join: JoinKind, source: TableSource) -> BuildResult<()> {
        self.ensure_active()?;
        let columns = self.stack.table_columns(&source.table)?;
        let binding = source.binding();
        self.stack.register_alias(
            self.scope,
            binding,
            AliasTarget::Table {
                table: source.table.clone(),
                columns,
            },
        )?;
        self.push_block(TabularBlock::new(
            join,
            TabularItem::Table(source.table),
            source.alias,
        ));
        Ok(())
    }

    pub(crate) fn add_derived<F>(
        &mut self,
        join: JoinKind,
        alias: Ident,
        lateral: bool,
        f: F,
    ) -> BuildResult<()>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.ensure_active()?;
        let query = self
            .stack
            .with_child(ScopeKind::Derived { lateral }, |stack, id| {
                f(StatementBuilder::nested_in(stack, id))
            })?;
        self.stack
            .register_alias(self.scope, alias.clone(), AliasTarget::Derived)?;
        self.push_block(TabularBlock::new(
            join,
            TabularItem::Derived {
                query: Box::new(query),
                lateral,
            },
            Some(alias),
        ));
        Ok(())
    }

    pub(crate) fn add_cte_ref(&mut self, join: JoinKind, source: TableSource) -> BuildResult<()> {
        self.ensure_active()?;
        let name = cte_name(&source)?;
        let info = self.stack.resolve_cte(&name)?;
        let columns = (!info.columns.is_empty()).then(|| info.columns.clone());
        self.stack.register_alias(
            self.scope,
            source.binding(),
            AliasTarget::Cte {
                name: name.clone(),
                columns,
            },
        )?;
        self.push_block(TabularBlock::new(join, TabularItem::CteRef(name), source.alias));
        Ok(())
    }

    pub(crate) fn add_nested<F>(&mut self, join: JoinKind, f: F) -> BuildResult<()>
    where
        F: FnOnce(NestedJoinBuilder<'_, Start>) -> BuildResult<NestedJoin>,
    {
        self.ensure_active()?;
        let group = self
            .stack
            .with_child_merging(ScopeKind::NestedJoin, |stack, id| {
                f(StatementBuilder::nested_in(stack, id))
            })?;
        self.push_block(TabularBlock::new(join, TabularItem::Nested(group), None));
        Ok(())
    }

    pub(crate) fn attach_constraint(&mut self, constraint: JoinConstraint) -> BuildResult<()> {
        if self.skip_constraint {
            debug!(scope = %self.scope, "join was skipped; dropping its constraint");
            self.skip_constraint = false;
            return Ok(());
        }
        self.ensure_active()?;
        match &constraint {
            JoinConstraint::On(preds) if preds.is_empty() => {
                return Err(BuildError::EmptyClauseList { clause: "on" })
            }
            JoinConstraint::Using(cols) if cols.is_empty() => {
                return Err(BuildError::EmptyClauseList { clause: "using" })
            }
            JoinConstraint::On(preds) => self.stack.check_exprs(preds)?,
            JoinConstraint::Using(_) => {}
        }
        let block = self.last_block_mut("on")?;
        if !block.join.requires_predicate() {
            return Err(BuildError::IllegalClauseForJoinKind {
                clause: "on",
                join: block.join.as_sql(),
            });
        }
        block.constraint = Some(constraint);
        Ok(())
    }

    pub(crate) fn add_index_hint(&mut self, hint: IndexHint) -> BuildResult<()> {
        if self.skip_constraint {
            return Ok(());
        }
        if hint.indexes.is_empty() && hint.action != IndexHintAction::Use {
            return Err(BuildError::EmptyClauseList {
                clause: hint.action.as_sql(),
            });
        }
        let block = self.last_block_mut("index hint")?;
        if !matches!(block.item, TabularItem::Table(_)) {
            return Err(BuildError::stage(
                "index hint",
                "index hints apply to base tables only",
            ));
        }
        block.index_hints.push(hint);
        Ok(())
    }

    pub(crate) fn add_partitions(&mut self, names: Vec<Ident>) -> BuildResult<()> {
        if self.skip_constraint {
            return Ok(());
        }
        if names.is_empty() {
            return Err(BuildError::EmptyClauseList {
                clause: "partition",
            });
        }
        let block = self.last_block_mut("partition")?;
        if !matches!(block.item, TabularItem::Table(_)) {
            return Err(BuildError::stage(
                "partition",
                "partitions apply to base tables only",
            ));
        }
        block.partitions.extend(names);
        Ok(())
    }
}

// =============================================================================
// Public join family
// =============================================================================

impl<'s, K: HasBlocks, S: CanJoin> StatementBuilder<'s, K, S> {
    fn join_table(
        mut self,
        kind: JoinKind,
        source: TableSource,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        self.add_table(kind, source)?;
        Ok(self.into_stage())
    }

    /// `join t [as a]`; ON or USING must follow
    pub fn join(
        self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        self.join_table(JoinKind::Join, source.into())
    }

    pub fn left_join(
        self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        self.join_table(JoinKind::Left, source.into())
    }

    pub fn right_join(
        self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        self.join_table(JoinKind::Right, source.into())
    }

    pub fn full_join(
        self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        self.join_table(JoinKind::Full, source.into())
    }

    pub fn cross_join(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, FromTable>> {
        self.add_table(JoinKind::Cross, source.into())?;
        Ok(self.into_stage())
    }

    /// MySQL `straight_join`, without a predicate
    pub fn straight_join(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, FromTable>> {
        self.add_table(JoinKind::Straight, source.into())?;
        Ok(self.into_stage())
    }

    /// Join only when `source` is present. A skipped join also skips the
    /// ON/USING and index hints that follow it.
    pub fn join_if(
        mut self,
        kind: JoinKind,
        source: Option<impl Into<TableSource>>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinTableOn>> {
        predicate_join(kind)?;
        match source {
            Some(source) => self.join_table(kind, source.into()),
            None => {
                debug!(scope = %self.scope, join = kind.as_sql(), "conditional join skipped");
                self.skip_constraint = true;
                Ok(self.into_stage())
            }
        }
    }

    pub fn cross_join_if(
        self,
        source: Option<impl Into<TableSource>>,
    ) -> BuildResult<StatementBuilder<'s, K, FromTable>> {
        match source {
            Some(source) => self.cross_join(source),
            None => {
                debug!(scope = %self.scope, "conditional cross join skipped");
                let mut next = self.into_stage::<FromTable>();
                next.skip_constraint = true;
                Ok(next)
            }
        }
    }

    /// Join a derived table built in its own scope
    pub fn join_derived<F>(
        mut self,
        kind: JoinKind,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<StatementBuilder<'s, K, JoinOn>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        predicate_join(kind)?;
        self.add_derived(kind, alias.into(), false, f)?;
        Ok(self.into_stage())
    }

    /// Join a LATERAL derived table, which may reference earlier blocks
    pub fn join_lateral<F>(
        mut self,
        kind: JoinKind,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<StatementBuilder<'s, K, JoinOn>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        predicate_join(kind)?;
        self.add_derived(kind, alias.into(), true, f)?;
        Ok(self.into_stage())
    }

    pub fn cross_join_derived<F>(
        mut self,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<StatementBuilder<'s, K, Joined>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.add_derived(JoinKind::Cross, alias.into(), false, f)?;
        Ok(self.into_stage())
    }

    pub fn cross_join_lateral<F>(
        mut self,
        alias: impl Into<Ident>,
        f: F,
    ) -> BuildResult<StatementBuilder<'s, K, Joined>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.add_derived(JoinKind::Cross, alias.into(), true, f)?;
        Ok(self.into_stage())
    }

    /// Join a CTE visible from this scope
    pub fn join_cte(
        mut self,
        kind: JoinKind,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, JoinOn>> {
        predicate_join(kind)?;
        self.add_cte_ref(kind, source.into())?;
        Ok(self.into_stage())
    }

    pub fn cross_join_cte(
        mut self,
        source: impl Into<TableSource>,
    ) -> BuildResult<StatementBuilder<'s, K, Joined>> {
        self.add_cte_ref(JoinKind::Cross, source.into())?;
        Ok(self.into_stage())
    }

    /// Join a parenthesized group of blocks
    pub fn join_nested<F>(
        mut self,
        kind: JoinKind,
        f: F,
    ) -> BuildResult<StatementBuilder<'s, K, JoinOn>>
    where
        F: FnOnce(NestedJoinBuilder<'_, Start>) -> BuildResult<NestedJoin>,
    {
        predicate_join(kind)?;
        self.add_nested(kind, f)?;
        Ok(self.into_stage())
    }

    pub fn cross_join_nested<F>(mut self, f: F) -> BuildResult<StatementBuilder<'s, K, Joined>>
    where
        F: FnOnce(NestedJoinBuilder<'_, Start>) -> BuildResult<NestedJoin>,
    {
        self.add_nested(JoinKind::Cross, f)?;
        Ok(self.into_stage())
    }
}

impl<'s, K: HasBlocks, S: CanOn> StatementBuilder<'s, K, S> {
    /// AND-ed join predicates
    pub fn on(
        mut self,
        predicates: impl IntoIterator<Item = Expr>,
    ) -> BuildResult<StatementBuilder<'s, K, Joined>> {
        self.attach_constraint(JoinConstraint::On(predicates.into_iter().collect()))?;
        Ok(self.into_stage())
    }

    /// ON with a predicate that may contain subqueries
    pub fn on_with<F>(mut self, f: F) -> BuildResult<StatementBuilder<'s, K, Joined>>
    where
        F: FnOnce(&mut ExprScope<'_>) -> BuildResult<Expr>,
    {
        if self.skip_constraint {
            self.skip_constraint = false;
            return Ok(self.into_stage());
        }
        let predicate = self.build_expr(f)?;
        self.attach_constraint(JoinConstraint::On(vec![predicate]))?;
        Ok(self.into_stage())
    }

    /// ON only when `predicate` is present. Leaving a predicate join
    /// without ON fails at prepare.
    pub fn on_if(mut self, predicate: Option<Expr>) -> BuildResult<StatementBuilder<'s, K, Joined>> {
        match predicate {
            Some(p) => self.on([p]),
            None => {
                debug!(scope = %self.scope, "conditional on skipped");
                self.skip_constraint = false;
                Ok(self.into_stage())
            }
        }
    }

    pub fn using<I>(mut self, columns: I) -> BuildResult<StatementBuilder<'s, K, Joined>>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.attach_constraint(JoinConstraint::Using(
            columns.into_iter().map(Into::into).collect(),
        ))?;
        Ok(self.into_stage())
    }
}

impl<'s, K: HasBlocks, S: CanIndexHint> StatementBuilder<'s, K, S> {
    pub fn index_hint(mut self, hint: IndexHint) -> BuildResult<Self> {
        self.add_index_hint(hint)?;
        Ok(self)
    }

    fn hint_with<I>(
        self,
        action: IndexHintAction,
        scope: Option<IndexHintScope>,
        indexes: I,
    ) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.index_hint(IndexHint {
            action,
            scope,
            indexes: indexes.into_iter().map(Into::into).collect(),
        })
    }

    pub fn use_index<I>(self, indexes: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.hint_with(IndexHintAction::Use, None, indexes)
    }

    pub fn ignore_index<I>(self, indexes: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.hint_with(IndexHintAction::Ignore, None, indexes)
    }

    pub fn force_index<I>(self, indexes: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.hint_with(IndexHintAction::Force, None, indexes)
    }

    pub fn force_index_for<I>(self, scope: IndexHintScope, indexes: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.hint_with(IndexHintAction::Force, Some(scope), indexes)
    }

    pub fn partition<I>(mut self, names: I) -> BuildResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.add_partitions(names.into_iter().map(Into::into).collect())?;
        Ok(self)
    }
}

/// Handle for building subqueries inside an expression
///
/// Each subquery gets a child scope of the builder that handed out the
/// `ExprScope`, so it may reference the enclosing statement's aliases.
pub struct ExprScope<'a> {
    stack: &'a mut ContextStack,
}

impl<'a> ExprScope<'a> {
    pub(crate) fn new(stack: &'a mut ContextStack) -> Self {
        Self { stack }
    }

    pub fn subquery<F>(&mut self, f: F) -> BuildResult<Query>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.stack.with_child(ScopeKind::Subquery, |stack, id| {
            f(StatementBuilder::nested_in(stack, id))
        })
    }

    pub fn exists<F>(&mut self, f: F) -> BuildResult<Expr>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        Ok(Expr::exists(self.subquery(f)?))
    }

    pub fn not_exists<F>(&mut self, f: F) -> BuildResult<Expr>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        Ok(Expr::Exists {
            subquery: Box::new(self.subquery(f)?),
            negated: true,
        })
    }

    pub fn in_subquery<F>(&mut self, expr: Expr, f: F) -> BuildResult<Expr>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        Ok(expr.in_subquery(self.subquery(f)?))
    }

    pub fn scalar<F>(&mut self, f: F) -> BuildResult<Expr>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        Ok(Expr::scalar(self.subquery(f)?))
    }

    pub fn context(&self) -> &ContextStack {
        &*self.stack
    }
}
