//! Clause accumulator and finalizer
//!
//! A [`ClauseAccumulator`] owns the AST node under construction together
//! with its lifecycle: building, then prepared (frozen). Preparing runs the
//! kind's structural checks once; a prepared accumulator rejects mutation
//! until it is cleared.

use crate::ast::{
    BatchRow, DeleteStmt, InsertStmt, NestedJoin, Query, Render, RenderedSql, SelectStmt,
    SqlRenderer, UpdateStmt,
};
use crate::config::RenderConfig;
use crate::error::{BuildError, BuildResult};
use crate::telemetry::{self, RenderTimer};
use std::fmt::Debug;
use tracing::debug;

/// One kind of statement the builder can produce
pub trait StatementKind: Sized + Debug + 'static {
    type Node: Debug + Clone + Default + PartialEq;

    /// Name used in errors and logs
    const NAME: &'static str;

    /// Whether a prepared statement of this kind may be cleared and reused
    const REUSABLE: bool;

    fn validate(node: &Self::Node) -> BuildResult<()>;
}

/// Simple SELECT while it is being built
#[derive(Debug, Clone, Copy)]
pub struct SelectKind;

/// Any finished SELECT-shaped query
#[derive(Debug, Clone, Copy)]
pub struct QueryKind;

#[derive(Debug, Clone, Copy)]
pub struct InsertKind;

#[derive(Debug, Clone, Copy)]
pub struct UpdateKind;

#[derive(Debug, Clone, Copy)]
pub struct DeleteKind;

/// Parenthesized join group
#[derive(Debug, Clone, Copy)]
pub struct NestedKind;

impl StatementKind for SelectKind {
    type Node = SelectStmt;
    const NAME: &'static str = "select";
    const REUSABLE: bool = false;

    fn validate(node: &SelectStmt) -> BuildResult<()> {
        node.validate()
    }
}

impl StatementKind for QueryKind {
    type Node = Query;
    const NAME: &'static str = "query";
    const REUSABLE: bool = true;

    fn validate(node: &Query) -> BuildResult<()> {
        node.validate()
    }
}

impl StatementKind for InsertKind {
    type Node = InsertStmt;
    const NAME: &'static str = "insert";
    const REUSABLE: bool = true;

    fn validate(node: &InsertStmt) -> BuildResult<()> {
        node.validate()
    }
}

impl StatementKind for UpdateKind {
    type Node = UpdateStmt;
    const NAME: &'static str = "update";
    const REUSABLE: bool = false;

    fn validate(node: &UpdateStmt) -> BuildResult<()> {
        node.validate()
    }
}

impl StatementKind for DeleteKind {
    type Node = DeleteStmt;
    const NAME: &'static str = "delete";
    const REUSABLE: bool = false;

    fn validate(node: &DeleteStmt) -> BuildResult<()> {
        node.validate()
    }
}

impl StatementKind for NestedKind {
    type Node = NestedJoin;
    const NAME: &'static str = "nested join";
    const REUSABLE: bool = false;

    fn validate(node: &NestedJoin) -> BuildResult<()> {
        if node.blocks.is_empty() {
            return Err(BuildError::EmptyClauseList {
                clause: "nested join",
            });
        }
        crate::ast::validate_chain(&node.blocks)
    }
}

/// Whether a statement renders once or once per parameter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Simple,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Building,
    Prepared,
}

/// The AST node under construction plus its lifecycle state
#[derive(Debug, Clone)]
pub struct ClauseAccumulator<K: StatementKind> {
    node: K::Node,
    mode: BuildMode,
    param_list: Option<Vec<BatchRow>>,
    /// Top-level statements may be reused; sub-statements never
    primary: bool,
    lifecycle: Lifecycle,
}

impl<K: StatementKind> ClauseAccumulator<K> {
    pub fn new(mode: BuildMode) -> Self {
        Self::from_node(K::Node::default(), mode)
    }

    pub fn from_node(node: K::Node, mode: BuildMode) -> Self {
        Self {
            node,
            mode,
            param_list: None,
            primary: true,
            lifecycle: Lifecycle::Building,
        }
    }

    /// Accumulator for a statement nested inside another
    pub(crate) fn sub() -> Self {
        Self {
            primary: false,
            ..Self::new(BuildMode::Simple)
        }
    }

    pub fn node(&self) -> &K::Node {
        &self.node
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_prepared(&self) -> bool {
        self.lifecycle == Lifecycle::Prepared
    }

    pub fn param_list(&self) -> Option<&[BatchRow]> {
        self.param_list.as_deref()
    }

    /// Mutable access to the node; fails once prepared.
    pub fn edit(&mut self) -> BuildResult<&mut K::Node> {
        if self.is_prepared() {
            return Err(BuildError::StatementFrozen { kind: K::NAME });
        }
        Ok(&mut self.node)
    }

    /// Builders only hold accumulators that are still building.
    pub(crate) fn node_mut(&mut self) -> &mut K::Node {
        &mut self.node
    }

    pub fn set_param_list(&mut self, rows: Vec<BatchRow>) -> BuildResult<()> {
        if self.is_prepared() {
            return Err(BuildError::StatementFrozen { kind: K::NAME });
        }
        if self.mode != BuildMode::Batch {
            return Err(BuildError::NotBatchStatement { kind: K::NAME });
        }
        self.param_list = Some(rows);
        Ok(())
    }

    pub fn validate(&self) -> BuildResult<()> {
        K::validate(&self.node)?;
        if self.mode == BuildMode::Batch && self.param_list.as_ref().map_or(true, Vec::is_empty) {
            return Err(BuildError::MissingBatchParams { kind: K::NAME });
        }
        Ok(())
    }

    /// Run final checks and freeze.
    pub fn prepare(&mut self) -> BuildResult<()> {
        if self.is_prepared() {
            return Err(BuildError::AlreadyPrepared { kind: K::NAME });
        }
        self.validate()?;
        self.lifecycle = Lifecycle::Prepared;
        debug!(
            kind = K::NAME,
            mode = ?self.mode,
            rows = self.param_list.as_ref().map_or(0, Vec::len),
            "statement prepared"
        );
        Ok(())
    }

    /// Reset to an empty, unprepared node.
    pub fn clear(&mut self) -> BuildResult<()> {
        if !K::REUSABLE || !self.primary || self.mode == BuildMode::Batch {
            return Err(BuildError::ClearNotSupported { kind: K::NAME });
        }
        self.node = K::Node::default();
        self.param_list = None;
        self.lifecycle = Lifecycle::Building;
        debug!(kind = K::NAME, "statement cleared");
        Ok(())
    }

    /// Prepare if needed and wrap as a read-only statement.
    pub fn freeze(mut self) -> BuildResult<Statement<K>> {
        if !self.is_prepared() {
            self.prepare()?;
        }
        Ok(Statement { acc: self })
    }

    pub(crate) fn into_node(self) -> K::Node {
        self.node
    }

    /// Carry mode, parameters and primacy over to another kind.
    pub(crate) fn retype<K2: StatementKind>(
        self,
        f: impl FnOnce(K::Node) -> K2::Node,
    ) -> ClauseAccumulator<K2> {
        ClauseAccumulator {
            node: f(self.node),
            mode: self.mode,
            param_list: self.param_list,
            primary: self.primary,
            lifecycle: Lifecycle::Building,
        }
    }
}

/// A prepared, read-only statement
#[derive(Debug, Clone)]
pub struct Statement<K: StatementKind> {
    acc: ClauseAccumulator<K>,
}

impl<K: StatementKind> Statement<K> {
    pub fn node(&self) -> &K::Node {
        self.acc.node()
    }

    pub fn mode(&self) -> BuildMode {
        self.acc.mode()
    }

    pub fn param_list(&self) -> Option<&[BatchRow]> {
        self.acc.param_list()
    }

    pub fn kind_name(&self) -> &'static str {
        K::NAME
    }

    pub fn is_sub_statement(&self) -> bool {
        !self.acc.is_primary()
    }

    /// Unfreeze into an empty accumulator for reuse.
    pub fn clear(self) -> BuildResult<ClauseAccumulator<K>> {
        let mut acc = self.acc;
        acc.clear()?;
        Ok(acc)
    }

    pub fn into_node(self) -> K::Node {
        self.acc.into_node()
    }
}

impl<K: StatementKind> Statement<K>
where
    K::Node: Render,
{
    /// Render to SQL. Batch statements get one placeholder group per
    /// parameter row.
    pub fn render(&self, config: &RenderConfig) -> BuildResult<RenderedSql> {
        let timer = RenderTimer::new(config.log_level, K::NAME);
        telemetry::log_ast(config.log_level, self.node());

        let result = self.render_inner(config);
        match &result {
            Ok(rendered) => {
                telemetry::log_rendered(config.log_level, K::NAME, rendered);
                timer.success();
            }
            Err(e) => timer.failure(&e.to_string()),
        }
        result
    }

    fn render_inner(&self, config: &RenderConfig) -> BuildResult<RenderedSql> {
        let mut renderer = if config.pretty {
            SqlRenderer::pretty(config.dialect)
        } else {
            SqlRenderer::new(config.dialect)
        };
        self.node().render(&mut renderer)?;
        let (sql, params) = renderer.into_parts();
        let rows = match self.mode() {
            BuildMode::Simple => None,
            BuildMode::Batch => Some(
                self.param_list()
                    .ok_or(BuildError::MissingBatchParams { kind: K::NAME })?,
            ),
        };
        RenderedSql::bind(sql, &params, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, SelectColumn};

    fn select_one() -> Query {
        Query::simple(SelectStmt::columns(vec![SelectColumn::expr(Expr::int(1))]))
    }

    #[test]
    fn test_prepare_twice_fails() {
        let mut acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Simple);
        acc.prepare().unwrap();
        assert_eq!(
            acc.prepare(),
            Err(BuildError::AlreadyPrepared { kind: "query" })
        );
    }

    #[test]
    fn test_prepared_accumulator_is_frozen() {
        let mut acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Simple);
        assert!(acc.edit().is_ok());
        acc.prepare().unwrap();
        assert_eq!(
            acc.edit().unwrap_err(),
            BuildError::StatementFrozen { kind: "query" }
        );
    }

    #[test]
    fn test_clear_resets_and_allows_prepare_again() {
        let mut acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Simple);
        acc.prepare().unwrap();
        acc.clear().unwrap();
        assert!(!acc.is_prepared());
        assert_eq!(acc.node(), &Query::default());

        *acc.edit().unwrap() = select_one();
        assert!(acc.prepare().is_ok());
    }

    #[test]
    fn test_clear_not_supported() {
        let mut update = ClauseAccumulator::<UpdateKind>::new(BuildMode::Simple);
        assert_eq!(
            update.clear(),
            Err(BuildError::ClearNotSupported { kind: "update" })
        );

        let mut sub = ClauseAccumulator::<QueryKind>::sub();
        assert!(sub.clear().is_err());

        let mut batch = ClauseAccumulator::<QueryKind>::new(BuildMode::Batch);
        assert!(batch.clear().is_err());
    }

    #[test]
    fn test_batch_requires_param_list() {
        let mut acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Batch);
        assert_eq!(
            acc.prepare(),
            Err(BuildError::MissingBatchParams { kind: "query" })
        );

        acc.set_param_list(vec![BatchRow::new().with("id", 1)]).unwrap();
        assert!(acc.prepare().is_ok());
    }

    #[test]
    fn test_param_list_on_simple_statement() {
        let mut acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Simple);
        assert_eq!(
            acc.set_param_list(vec![]),
            Err(BuildError::NotBatchStatement { kind: "query" })
        );
    }

    #[test]
    fn test_statement_clear_round_trip() {
        let acc = ClauseAccumulator::<QueryKind>::from_node(select_one(), BuildMode::Simple);
        let stmt = acc.freeze().unwrap();
        assert_eq!(stmt.kind_name(), "query");
        let acc = stmt.clear().unwrap();
        assert!(!acc.is_prepared());
    }
}
