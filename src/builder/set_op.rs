//! Set operations and bracketed queries
//!
//! The left operand is finished before the operator is applied; its
//! aliases are retired so trailing ORDER BY / LIMIT of the composite
//! cannot reach into either operand. The right operand is built in its
//! own scope, which still sees the statement's CTEs. Bracketing a query
//! also retires the CTEs of its own WITH.

use super::accumulator::{QueryKind, Statement};
use super::context::ScopeKind;
use super::core::StatementBuilder;
use super::query::SelectBuilder;
use super::stage::{CanSetCombine, CanSetFinish, SetLimited, SetOpen, SetOrdered, Start};
use crate::ast::{Limit, OrderByExpr, Query, SetOperator};
use crate::error::{BuildError, BuildResult};
use tracing::debug;

/// Builder over a composite or bracketed query
pub type SetQueryBuilder<'s, S> = StatementBuilder<'s, QueryKind, S>;

impl<'s, S> SetQueryBuilder<'s, S> {
    pub(crate) fn combine<F>(mut self, op: SetOperator, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.ensure_active()?;
        self.stack.retire_aliases(self.scope)?;
        let right = self.stack.with_child(ScopeKind::SetOperand, |stack, id| {
            f(StatementBuilder::nested_in(stack, id))
        })?;
        let left = std::mem::take(self.node());
        *self.node() = Query::compose(left, op, right);
        debug!(scope = %self.scope, op = op.as_sql(), "set operation");
        Ok(self.into_stage())
    }

    pub(crate) fn wrap(mut self) -> BuildResult<SetQueryBuilder<'s, SetOpen>> {
        self.ensure_active()?;
        self.stack.retire_aliases(self.scope)?;
        let inner = std::mem::take(self.node());
        // a WITH inside the brackets ends there
        if let Some(with) = inner.leading_with() {
            self.stack
                .retire_ctes(self.scope, with.ctes.iter().map(|cte| &cte.name))?;
        }
        *self.node() = Query::bracket(inner);
        Ok(self.into_stage())
    }

    fn trailing(&mut self) -> BuildResult<(&mut Vec<OrderByExpr>, &mut Option<Limit>)> {
        self.acc
            .node_mut()
            .trailing_mut()
            .ok_or_else(|| BuildError::stage("order by / limit", "query is not composite"))
    }

    fn set_order_by(&mut self, items: Vec<OrderByExpr>) -> BuildResult<()> {
        if items.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "order by" });
        }
        self.check_all(items.iter().map(|o| &o.expr))?;
        self.trailing()?.0.extend(items);
        Ok(())
    }

    fn set_limit(&mut self, limit: Limit) -> BuildResult<()> {
        self.ensure_active()?;
        *self.trailing()?.1 = Some(limit);
        Ok(())
    }
}

impl<'s, S: CanSetCombine> SetQueryBuilder<'s, S> {
    pub fn union<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.combine(SetOperator::Union, f)
    }

    pub fn union_all<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.combine(SetOperator::UnionAll, f)
    }

    pub fn union_distinct<F>(self, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.combine(SetOperator::UnionDistinct, f)
    }

    pub fn set_op<F>(self, op: SetOperator, f: F) -> BuildResult<SetQueryBuilder<'s, SetOpen>>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        self.combine(op, f)
    }

    /// ORDER BY of the whole composite
    pub fn order_by<I>(mut self, items: I) -> BuildResult<SetQueryBuilder<'s, SetOrdered>>
    where
        I: IntoIterator,
        I::Item: Into<OrderByExpr>,
    {
        self.set_order_by(items.into_iter().map(Into::into).collect())?;
        Ok(self.into_stage())
    }

    pub fn limit(mut self, row_count: u64) -> BuildResult<SetQueryBuilder<'s, SetLimited>> {
        self.set_limit(Limit::new(row_count))?;
        Ok(self.into_stage())
    }

    pub fn limit_offset(
        mut self,
        offset: u64,
        row_count: u64,
    ) -> BuildResult<SetQueryBuilder<'s, SetLimited>> {
        self.set_limit(Limit::with_offset(offset, row_count))?;
        Ok(self.into_stage())
    }
}

impl<'s> SetQueryBuilder<'s, SetOrdered> {
    pub fn limit(mut self, row_count: u64) -> BuildResult<SetQueryBuilder<'s, SetLimited>> {
        self.set_limit(Limit::new(row_count))?;
        Ok(self.into_stage())
    }

    pub fn limit_offset(
        mut self,
        offset: u64,
        row_count: u64,
    ) -> BuildResult<SetQueryBuilder<'s, SetLimited>> {
        self.set_limit(Limit::with_offset(offset, row_count))?;
        Ok(self.into_stage())
    }
}

impl<'s, S: CanSetFinish> SetQueryBuilder<'s, S> {
    /// Wrap everything so far in parentheses; the result can be combined
    /// or given its own ORDER BY / LIMIT.
    pub fn bracket(self) -> BuildResult<SetQueryBuilder<'s, SetOpen>> {
        self.wrap()
    }

    pub fn prepare(self) -> BuildResult<Statement<QueryKind>> {
        self.ensure_active()?;
        self.finalize()
    }

    pub fn as_query(self) -> BuildResult<Query> {
        self.ensure_active()?;
        let query = self.acc.into_node();
        query.validate()?;
        Ok(query)
    }
}
