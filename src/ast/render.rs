//! SQL string rendering
//!
//! This module converts AST nodes to SQL strings. It is the only place
//! in the crate where SQL text is produced.
//!
//! # Architecture
//!
//! - [`Render`] trait: implemented by the statement nodes and expressions
//! - [`SqlRenderer`]: the rendering context that handles output buffering,
//!   identifier quoting, placeholder collection and dialect checks
//!
//! Host values never appear in the SQL text. Every [`Expr::Value`] and
//! [`Expr::NamedParam`] becomes a `?` placeholder and is recorded in the
//! renderer's [`ParamCollector`] in output order.
//!
//! Constructs the target [`Dialect`] cannot express fail with
//! [`BuildError::DialectUnsupported`]; nothing is silently dropped.

use super::cte::{Cte, WithClause};
use super::expr::*;
use super::params::{BatchRow, ParamCollector, ParamValue};
use super::stmt::*;
use super::table::*;
use crate::dialect::{Dialect, MySqlVersion};
use crate::error::{BuildError, BuildResult};

// =============================================================================
// Render Trait
// =============================================================================

/// Trait for AST nodes that can be rendered to SQL.
///
/// # Example
///
/// ```rust
/// use stmtcraft::ast::{Expr, Render, SqlRenderer};
/// use stmtcraft::Dialect;
///
/// let mut renderer = SqlRenderer::new(Dialect::mysql8());
/// Expr::int(42).render(&mut renderer).unwrap();
/// assert_eq!(renderer.into_sql(), "42");
/// ```
pub trait Render {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()>;
}

impl Render for Stmt {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        match self {
            Stmt::Query(q) => renderer.render_query(q),
            Stmt::Insert(s) => renderer.render_insert(s),
            Stmt::Update(s) => renderer.render_update(s),
            Stmt::Delete(s) => renderer.render_delete(s),
        }
    }
}

impl Render for Query {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_query(self)
    }
}

impl Render for SelectStmt {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_select(self)
    }
}

impl Render for InsertStmt {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_insert(self)
    }
}

impl Render for UpdateStmt {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_update(self)
    }
}

impl Render for DeleteStmt {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_delete(self)
    }
}

impl Render for Expr {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.render_expr(self)
    }
}

impl Render for Ident {
    fn render(&self, renderer: &mut SqlRenderer) -> BuildResult<()> {
        renderer.write_ident(self);
        Ok(())
    }
}

/// SQL text plus the values for its `?` placeholders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedSql {
    pub sql: String,
    /// Placeholder values of a simple statement, in output order
    pub params: Vec<ParamValue>,
    /// One placeholder group per parameter row of a batch statement
    pub batches: Vec<Vec<ParamValue>>,
}

impl RenderedSql {
    /// Bind `collector` once, or once per row when `rows` is given.
    pub fn bind(
        sql: String,
        collector: &ParamCollector,
        rows: Option<&[BatchRow]>,
    ) -> BuildResult<Self> {
        match rows {
            None => Ok(Self {
                sql,
                params: collector.bind(None, 0)?,
                batches: Vec::new(),
            }),
            Some(rows) => {
                let batches = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| collector.bind(Some(row), i))
                    .collect::<BuildResult<Vec<_>>>()?;
                Ok(Self {
                    sql,
                    params: Vec::new(),
                    batches,
                })
            }
        }
    }
}

// =============================================================================
// Constants
// =============================================================================

/// Default buffer capacity for simple statements
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Buffer capacity for statements with CTEs or set operations
const LARGE_BUFFER_CAPACITY: usize = 4096;

/// MySQL accepts optimizer hint comments from this version on
const HINTS_SINCE: MySqlVersion = MySqlVersion::V5_7_7;

/// SQL renderer with optional pretty-printing
pub struct SqlRenderer {
    output: String,
    indent_level: usize,
    pretty: bool,
    dialect: Dialect,
    params: ParamCollector,
}

impl SqlRenderer {
    /// Create a new renderer with compact output
    pub fn new(dialect: Dialect) -> Self {
        Self::with_capacity(dialect, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(dialect: Dialect, capacity: usize) -> Self {
        Self {
            output: String::with_capacity(capacity),
            indent_level: 0,
            pretty: false,
            dialect,
            params: ParamCollector::new(),
        }
    }

    /// Create a new renderer with pretty-printed output
    pub fn pretty(dialect: Dialect) -> Self {
        Self {
            pretty: true,
            ..Self::new(dialect)
        }
    }

    /// Estimate buffer capacity from statement shape
    pub fn estimate_capacity(stmt: &Stmt) -> usize {
        let large = match stmt {
            Stmt::Query(Query::Simple(s)) => s.with.is_some(),
            Stmt::Query(_) => true,
            Stmt::Insert(s) => matches!(s.source, Some(InsertSource::Query(_))),
            Stmt::Update(s) => s.with.is_some(),
            Stmt::Delete(s) => s.with.is_some(),
        };
        if large {
            LARGE_BUFFER_CAPACITY
        } else {
            DEFAULT_BUFFER_CAPACITY
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn params(&self) -> &ParamCollector {
        &self.params
    }

    /// Take ownership of the rendered SQL string
    pub fn into_sql(self) -> String {
        self.output
    }

    /// SQL text plus the placeholders in output order
    pub fn into_parts(self) -> (String, ParamCollector) {
        (self.output, self.params)
    }

    // =========================================================================
    // Dialect gates
    // =========================================================================

    fn unsupported(&self, feature: impl Into<String>) -> BuildError {
        BuildError::unsupported(feature, self.dialect)
    }

    /// Fail unless the target is MySQL
    fn mysql_only(&self, feature: &str) -> BuildResult<()> {
        if self.dialect.is_mysql() {
            Ok(())
        } else {
            Err(self.unsupported(feature))
        }
    }

    /// Fail on MySQL older than `min`; other dialects pass
    fn since(&self, feature: &str, min: MySqlVersion) -> BuildResult<()> {
        match self.dialect.mysql_version() {
            Some(v) if v < min => Err(self.unsupported(format!("{feature} (needs MySQL {min})"))),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Statement rendering
    // =========================================================================

    fn render_query(&mut self, query: &Query) -> BuildResult<()> {
        match query {
            Query::Simple(s) => self.render_select(s),
            Query::Composite(c) => {
                self.render_operand(&c.left)?;
                self.newline();
                self.write(c.op.as_sql());
                self.newline();
                self.render_operand(&c.right)?;
                self.render_trailing(&c.order_by, c.limit)
            }
            Query::Bracketed(b) => {
                self.render_bracketed(&b.inner)?;
                self.render_trailing(&b.order_by, b.limit)
            }
        }
    }

    /// A set-operation operand; one carrying its own trailing clauses is
    /// bracketed so they stay attached to it.
    fn render_operand(&mut self, query: &Query) -> BuildResult<()> {
        if query.has_trailing_clauses() && !query.is_bracketed() {
            self.render_bracketed(query)
        } else {
            self.render_query(query)
        }
    }

    fn render_bracketed(&mut self, query: &Query) -> BuildResult<()> {
        self.write("(");
        self.indent();
        self.newline_tight();
        self.render_query(query)?;
        self.dedent();
        self.newline_tight();
        self.write(")");
        Ok(())
    }

    fn render_trailing(&mut self, order_by: &[OrderByExpr], limit: Option<Limit>) -> BuildResult<()> {
        if !order_by.is_empty() {
            self.newline();
            self.write("order by ");
            self.render_order_by(order_by)?;
        }
        if let Some(limit) = limit {
            self.newline();
            self.render_limit(limit);
        }
        Ok(())
    }

    fn render_select(&mut self, stmt: &SelectStmt) -> BuildResult<()> {
        if let Some(with) = &stmt.with {
            self.render_with(with)?;
        }
        self.write("select");
        self.render_hints(&stmt.hints)?;
        for modifier in &stmt.modifiers {
            if !modifier.is_standard() {
                self.mysql_only(modifier.as_sql())?;
            }
            self.write(" ");
            self.write(modifier.as_sql());
        }
        self.write(" ");
        self.render_select_columns(&stmt.columns)?;

        if !stmt.into_vars.is_empty() {
            self.mysql_only("select into variables")?;
            self.write(" into ");
            self.render_variables(&stmt.into_vars);
        }

        if !stmt.from.is_empty() {
            self.newline();
            self.write("from ");
            self.render_blocks(&stmt.from)?;
        }

        if !stmt.where_clause.is_empty() {
            self.newline();
            self.write("where ");
            self.render_conjunction(&stmt.where_clause)?;
        }

        if !stmt.group_by.is_empty() {
            self.newline();
            self.write("group by ");
            self.render_order_by(&stmt.group_by)?;
            if stmt.group_with_rollup {
                self.mysql_only("with rollup")?;
                self.write(" with rollup");
            }
        }

        if !stmt.having.is_empty() {
            self.newline();
            self.write("having ");
            self.render_conjunction(&stmt.having)?;
        }

        if !stmt.windows.is_empty() {
            self.since("window", MySqlVersion::V8_0_2)?;
            self.newline();
            self.write("window ");
            for (i, window) in stmt.windows.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.write_ident(&window.name);
                self.write(" as ");
                self.render_window_spec(&window.spec)?;
            }
        }

        if !stmt.order_by.is_empty() {
            self.newline();
            self.write("order by ");
            self.render_order_by(&stmt.order_by)?;
            if stmt.order_with_rollup {
                self.mysql_only("with rollup")?;
                self.write(" with rollup");
            }
        }

        if let Some(limit) = stmt.limit {
            self.newline();
            self.render_limit(limit);
        }

        if let Some(lock) = &stmt.lock {
            self.newline();
            self.render_lock(lock)?;
        }
        Ok(())
    }

    fn render_insert(&mut self, stmt: &InsertStmt) -> BuildResult<()> {
        let table = stmt
            .table
            .as_ref()
            .ok_or_else(|| BuildError::stage("insert", "no target table"))?;
        if stmt.verb == InsertVerb::Replace {
            self.mysql_only("replace")?;
        }
        self.write(stmt.verb.as_sql());
        self.render_hints(&stmt.hints)?;
        for modifier in &stmt.modifiers {
            self.mysql_only(modifier.as_sql())?;
            self.write(" ");
            self.write(modifier.as_sql());
        }
        self.write(" into ");
        self.render_table_name(table);
        self.render_partitions(&stmt.partitions)?;

        if !stmt.columns.is_empty() {
            self.write(" (");
            self.render_ident_list(&stmt.columns);
            self.write(")");
        }

        self.newline();
        match &stmt.source {
            None => return Err(BuildError::MissingInsertMode),
            Some(InsertSource::Values(rows)) => {
                self.write("values ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write("(");
                    self.render_expr_list(row)?;
                    self.write(")");
                }
            }
            Some(InsertSource::Assignments(list)) => {
                self.mysql_only("insert ... set")?;
                self.write("set ");
                self.render_assignments(list)?;
            }
            Some(InsertSource::Query(query)) => self.render_query(query)?,
        }

        if !stmt.on_duplicate.is_empty() {
            self.mysql_only("on duplicate key update")?;
            self.newline();
            self.write("on duplicate key update ");
            self.render_assignments(&stmt.on_duplicate)?;
        }
        Ok(())
    }

    fn render_update(&mut self, stmt: &UpdateStmt) -> BuildResult<()> {
        if let Some(with) = &stmt.with {
            self.render_with(with)?;
        }
        self.write("update");
        self.render_hints(&stmt.hints)?;
        for modifier in &stmt.modifiers {
            self.mysql_only(modifier.as_sql())?;
            self.write(" ");
            self.write(modifier.as_sql());
        }
        self.write(" ");
        if stmt.is_multi_table() {
            self.mysql_only("multi-table update")?;
        }
        self.render_blocks(&stmt.tables)?;

        self.newline();
        self.write("set ");
        self.render_assignments(&stmt.assignments)?;

        if !stmt.where_clause.is_empty() {
            self.newline();
            self.write("where ");
            self.render_conjunction(&stmt.where_clause)?;
        }
        if !stmt.order_by.is_empty() || stmt.limit.is_some() {
            self.mysql_only("order by / limit in update")?;
        }
        self.render_trailing(&stmt.order_by, stmt.limit)
    }

    fn render_delete(&mut self, stmt: &DeleteStmt) -> BuildResult<()> {
        if let Some(with) = &stmt.with {
            self.render_with(with)?;
        }
        self.write("delete");
        self.render_hints(&stmt.hints)?;
        for modifier in &stmt.modifiers {
            self.mysql_only(modifier.as_sql())?;
            self.write(" ");
            self.write(modifier.as_sql());
        }
        if stmt.is_multi_table() {
            self.mysql_only("multi-table delete")?;
            self.write(" ");
            self.render_ident_list(&stmt.targets);
        }
        self.write(" from ");
        self.render_blocks(&stmt.from)?;

        if !stmt.where_clause.is_empty() {
            self.newline();
            self.write("where ");
            self.render_conjunction(&stmt.where_clause)?;
        }
        if !stmt.order_by.is_empty() || stmt.limit.is_some() {
            self.mysql_only("order by / limit in delete")?;
        }
        self.render_trailing(&stmt.order_by, stmt.limit)
    }

    // =========================================================================
    // CTE rendering
    // =========================================================================

    fn render_with(&mut self, with: &WithClause) -> BuildResult<()> {
        if with.ctes.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "with" });
        }
        self.since("with", MySqlVersion::V8_0_1)?;
        self.write(if with.recursive {
            "with recursive "
        } else {
            "with "
        });
        for (i, cte) in with.ctes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_cte(cte)?;
        }
        self.newline();
        Ok(())
    }

    fn render_cte(&mut self, cte: &Cte) -> BuildResult<()> {
        self.write_ident(&cte.name);
        if !cte.columns.is_empty() {
            self.write("(");
            self.render_ident_list(&cte.columns);
            self.write(")");
        }
        self.write(" as ");
        self.render_bracketed(&cte.query)
    }

    // =========================================================================
    // FROM clause rendering
    // =========================================================================

    fn render_blocks(&mut self, blocks: &[TabularBlock]) -> BuildResult<()> {
        for (i, block) in blocks.iter().enumerate() {
            match block.join {
                JoinKind::None if i == 0 => {}
                JoinKind::None => self.write(", "),
                kind => {
                    match kind {
                        JoinKind::Full if self.dialect.is_mysql() => {
                            return Err(self.unsupported("full join"))
                        }
                        JoinKind::Straight => self.mysql_only("straight_join")?,
                        _ => {}
                    }
                    self.newline();
                    self.write(kind.as_sql());
                    self.write(" ");
                }
            }
            self.render_block(block)?;
        }
        Ok(())
    }

    fn render_block(&mut self, block: &TabularBlock) -> BuildResult<()> {
        match &block.item {
            TabularItem::Table(table) => {
                self.render_table_name(table);
                self.render_partitions(&block.partitions)?;
                self.render_alias(block.alias.as_ref());
                for hint in &block.index_hints {
                    self.render_index_hint(hint)?;
                }
            }
            TabularItem::Derived { query, lateral } => {
                if *lateral {
                    self.since("lateral", MySqlVersion::V8_0_14)?;
                    self.write("lateral ");
                }
                self.render_bracketed(query)?;
                self.render_alias(block.alias.as_ref());
            }
            TabularItem::CteRef(name) => {
                self.write_ident(name);
                self.render_alias(block.alias.as_ref());
            }
            TabularItem::Nested(group) => {
                self.write("(");
                self.render_blocks(&group.blocks)?;
                self.write(")");
            }
        }

        match &block.constraint {
            None => {}
            Some(JoinConstraint::On(predicates)) => {
                self.write(" on ");
                self.render_conjunction(predicates)?;
            }
            Some(JoinConstraint::Using(columns)) => {
                self.write(" using (");
                self.render_ident_list(columns);
                self.write(")");
            }
        }
        Ok(())
    }

    fn render_alias(&mut self, alias: Option<&Ident>) {
        if let Some(alias) = alias {
            self.write(" as ");
            self.write_ident(alias);
        }
    }

    fn render_partitions(&mut self, partitions: &[Ident]) -> BuildResult<()> {
        if partitions.is_empty() {
            return Ok(());
        }
        self.mysql_only("partition")?;
        self.write(" partition (");
        self.render_ident_list(partitions);
        self.write(")");
        Ok(())
    }

    fn render_index_hint(&mut self, hint: &IndexHint) -> BuildResult<()> {
        self.mysql_only(hint.action.as_sql())?;
        self.write(" ");
        self.write(hint.action.as_sql());
        if let Some(scope) = hint.scope {
            self.write(" ");
            self.write(scope.as_sql());
        }
        self.write(" (");
        self.render_ident_list(&hint.indexes);
        self.write(")");
        Ok(())
    }

    // =========================================================================
    // Expression rendering
    // =========================================================================

    fn render_expr(&mut self, expr: &Expr) -> BuildResult<()> {
        match expr {
            Expr::Column(col) => {
                if let Some(table) = &col.table_alias {
                    self.write_ident(table);
                    self.write(".");
                }
                self.write_ident(&col.column);
            }

            Expr::Literal(lit) => self.render_literal(lit),

            Expr::Value(value) => {
                self.params.add(value.clone());
                self.write("?");
            }

            Expr::NamedParam(name) => {
                self.params.add_named(name.clone());
                self.write("?");
            }

            Expr::Wildcard => self.write("*"),

            Expr::BinaryOp { left, op, right } => {
                if op.is_mysql_only() {
                    self.mysql_only(op.as_sql())?;
                }
                let prec = precedence(*op);
                self.render_operand_expr(left, prec, false)?;
                self.write(" ");
                self.write(op.as_sql());
                self.write(" ");
                self.render_operand_expr(right, prec, true)?;
            }

            Expr::UnaryOp { op, expr } => {
                self.write(op.as_sql());
                if *op == UnaryOperator::Not {
                    self.write(" ");
                }
                self.write("(");
                self.render_expr(expr)?;
                self.write(")");
            }

            Expr::Function(call) => self.render_function_call(call)?,

            Expr::Case(case) => self.render_case(case)?,

            Expr::Subquery(query) => self.render_bracketed(query)?,

            Expr::IsNull { expr, negated } => {
                self.render_expr(expr)?;
                self.write(if *negated { " is not null" } else { " is null" });
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    return Err(BuildError::EmptyClauseList { clause: "in" });
                }
                self.render_expr(expr)?;
                self.write(if *negated { " not in (" } else { " in (" });
                self.render_expr_list(list)?;
                self.write(")");
            }

            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                self.render_expr(expr)?;
                self.write(if *negated { " not in " } else { " in " });
                self.render_bracketed(subquery)?;
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.render_expr(expr)?;
                self.write(if *negated { " not between " } else { " between " });
                self.render_expr(low)?;
                self.write(" and ");
                self.render_expr(high)?;
            }

            Expr::Exists { subquery, negated } => {
                if *negated {
                    self.write("not ");
                }
                self.write("exists ");
                self.render_bracketed(subquery)?;
            }

            Expr::Nested(inner) => {
                self.write("(");
                self.render_expr(inner)?;
                self.write(")");
            }

            Expr::Row(exprs) => {
                self.write("(");
                self.render_expr_list(exprs)?;
                self.write(")");
            }
        }
        Ok(())
    }

    /// Parenthesize a binary operand that binds looser than its parent.
    fn render_operand_expr(&mut self, expr: &Expr, parent: u8, right: bool) -> BuildResult<()> {
        let wrap = match expr {
            Expr::BinaryOp { op, .. } => {
                let child = precedence(*op);
                child < parent || (right && child == parent)
            }
            _ => false,
        };
        if wrap {
            self.write("(");
            self.render_expr(expr)?;
            self.write(")");
            Ok(())
        } else {
            self.render_expr(expr)
        }
    }

    /// AND-ed predicate list
    fn render_conjunction(&mut self, predicates: &[Expr]) -> BuildResult<()> {
        let and = precedence(BinaryOperator::And);
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                self.write(" and ");
            }
            if predicates.len() > 1 {
                self.render_operand_expr(predicate, and, i > 0)?;
            } else {
                self.render_expr(predicate)?;
            }
        }
        Ok(())
    }

    fn render_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Null => self.write("null"),
            Literal::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Literal::Integer(n) => self.output.push_str(&n.to_string()),
            Literal::Float(f) => self.output.push_str(&f.to_string()),
            Literal::String(s) => self.write_literal(s),
            Literal::Default => self.write("default"),
        }
    }

    fn render_function_call(&mut self, call: &FunctionCall) -> BuildResult<()> {
        self.write_function_name(&call.name);
        self.write("(");
        if call.distinct {
            self.write("distinct ");
        }
        self.render_expr_list(&call.args)?;
        self.write(")");

        match &call.over {
            None => {}
            Some(Over::Named(name)) => {
                self.since("window functions", MySqlVersion::V8_0_2)?;
                self.write(" over ");
                self.write_ident(name);
            }
            Some(Over::Spec(spec)) => {
                self.since("window functions", MySqlVersion::V8_0_2)?;
                self.write(" over ");
                self.render_window_spec(spec)?;
            }
        }
        Ok(())
    }

    fn render_window_spec(&mut self, spec: &WindowSpec) -> BuildResult<()> {
        self.write("(");
        let mut sep = false;
        if let Some(base) = &spec.base {
            self.write_ident(base);
            sep = true;
        }
        if !spec.partition_by.is_empty() {
            if sep {
                self.write(" ");
            }
            self.write("partition by ");
            self.render_expr_list(&spec.partition_by)?;
            sep = true;
        }
        if !spec.order_by.is_empty() {
            if sep {
                self.write(" ");
            }
            self.write("order by ");
            self.render_order_by(&spec.order_by)?;
            sep = true;
        }
        if let Some(frame) = &spec.frame {
            if sep {
                self.write(" ");
            }
            self.write(frame.units.as_sql());
            self.write(" ");
            match frame.end {
                Some(end) => {
                    self.write("between ");
                    self.render_frame_bound(frame.start);
                    self.write(" and ");
                    self.render_frame_bound(end);
                }
                None => self.render_frame_bound(frame.start),
            }
        }
        self.write(")");
        Ok(())
    }

    fn render_frame_bound(&mut self, bound: FrameBound) {
        match bound {
            FrameBound::UnboundedPreceding => self.write("unbounded preceding"),
            FrameBound::Preceding(n) => {
                self.output.push_str(&n.to_string());
                self.write(" preceding");
            }
            FrameBound::CurrentRow => self.write("current row"),
            FrameBound::Following(n) => {
                self.output.push_str(&n.to_string());
                self.write(" following");
            }
            FrameBound::UnboundedFollowing => self.write("unbounded following"),
        }
    }

    fn render_case(&mut self, case: &CaseExpr) -> BuildResult<()> {
        self.write("case");

        if let Some(operand) = &case.operand {
            self.write(" ");
            self.render_expr(operand)?;
        }

        for (when_expr, then_expr) in &case.when_clauses {
            self.write(" when ");
            self.render_expr(when_expr)?;
            self.write(" then ");
            self.render_expr(then_expr)?;
        }

        if let Some(else_clause) = &case.else_clause {
            self.write(" else ");
            self.render_expr(else_clause)?;
        }

        self.write(" end");
        Ok(())
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn render_hints(&mut self, hints: &[Hint]) -> BuildResult<()> {
        if hints.is_empty() {
            return Ok(());
        }
        self.mysql_only("optimizer hints")?;
        for hint in hints {
            self.since("optimizer hints", hint.min_version.unwrap_or(HINTS_SINCE))?;
            // the text must not end the comment it is placed in
            if hint.text.contains("*/") {
                return Err(BuildError::stage(
                    "optimizer hints",
                    format!("hint text may not contain `*/`: {:?}", hint.text),
                ));
            }
        }
        self.write(" /*+ ");
        for (i, hint) in hints.iter().enumerate() {
            if i > 0 {
                self.write(" ");
            }
            self.write(&hint.text);
        }
        self.write(" */");
        Ok(())
    }

    fn render_lock(&mut self, lock: &LockClause) -> BuildResult<()> {
        if lock.strength == LockStrength::LockInShareMode {
            self.mysql_only(lock.strength.as_sql())?;
        }
        if let Some(min) = lock.required_version() {
            self.since(lock.strength.as_sql(), min)?;
        }
        self.write(lock.strength.as_sql());
        if !lock.of.is_empty() {
            self.write(" of ");
            self.render_ident_list(&lock.of);
        }
        if let Some(wait) = lock.wait {
            self.write(" ");
            self.write(wait.as_sql());
        }
        Ok(())
    }

    fn render_limit(&mut self, limit: Limit) {
        self.write("limit ");
        match (limit.offset, self.dialect) {
            (None, _) => self.output.push_str(&limit.row_count.to_string()),
            (Some(offset), Dialect::MySql(_)) => {
                self.output
                    .push_str(&format!("{}, {}", offset, limit.row_count));
            }
            (Some(offset), Dialect::Standard) => {
                self.output
                    .push_str(&format!("{} offset {}", limit.row_count, offset));
            }
        }
    }

    fn render_select_columns(&mut self, columns: &[SelectColumn]) -> BuildResult<()> {
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match col {
                SelectColumn::Expr { expr, alias } => {
                    self.render_expr(expr)?;
                    if let Some(alias) = alias {
                        self.write(" as ");
                        self.write_ident(alias);
                    }
                }
                SelectColumn::Star => self.write("*"),
                SelectColumn::QualifiedStar { table } => {
                    self.write_ident(table);
                    self.write(".*");
                }
            }
        }
        Ok(())
    }

    fn render_assignments(&mut self, assignments: &[Assignment]) -> BuildResult<()> {
        for (i, assignment) in assignments.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if let Some(table) = &assignment.column.table_alias {
                self.write_ident(table);
                self.write(".");
            }
            self.write_ident(&assignment.column.column);
            self.write(" = ");
            self.render_expr(&assignment.value)?;
        }
        Ok(())
    }

    fn render_expr_list(&mut self, exprs: &[Expr]) -> BuildResult<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(expr)?;
        }
        Ok(())
    }

    fn render_ident_list(&mut self, idents: &[Ident]) {
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_ident(ident);
        }
    }

    /// `@a, @b`
    fn render_variables(&mut self, vars: &[Ident]) {
        for (i, var) in vars.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write("@");
            self.write_ident(var);
        }
    }

    fn render_order_by(&mut self, order_by: &[OrderByExpr]) -> BuildResult<()> {
        for (i, ob) in order_by.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(&ob.expr)?;
            if let Some(dir) = &ob.direction {
                self.write(" ");
                self.write(dir.as_sql());
            }
        }
        Ok(())
    }

    fn render_table_name(&mut self, table: &TableRef) {
        if let Some(schema) = &table.schema {
            self.write_ident(schema);
            self.write(".");
        }
        self.write_ident(&table.name);
    }

    // =========================================================================
    // Low-level output methods
    // =========================================================================

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub(crate) fn write_ident(&mut self, ident: &Ident) {
        let quote = match self.dialect {
            Dialect::MySql(_) => '`',
            Dialect::Standard => '"',
        };
        self.output.push(quote);
        for c in ident.as_str().chars() {
            if c == quote {
                self.output.push(quote);
            }
            self.output.push(c);
        }
        self.output.push(quote);
    }

    /// Built-in function names are written bare; anything else is quoted.
    fn write_function_name(&mut self, name: &Ident) {
        let bare = !name.as_str().is_empty()
            && name
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if bare {
            self.write(name.as_str());
        } else {
            self.write_ident(name);
        }
    }

    pub(crate) fn write_literal(&mut self, s: &str) {
        self.output.push('\'');
        for c in s.chars() {
            match c {
                '\'' => self.output.push_str("''"),
                '\\' if self.dialect.is_mysql() => self.output.push_str("\\\\"),
                c => self.output.push(c),
            }
        }
        self.output.push('\'');
    }

    fn newline(&mut self) {
        if self.pretty {
            self.output.push('\n');
            for _ in 0..self.indent_level {
                self.output.push_str("    ");
            }
        } else {
            self.output.push(' ');
        }
    }

    /// Line break in pretty mode, nothing in compact mode
    fn newline_tight(&mut self) {
        if self.pretty {
            self.newline();
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

fn precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator::*;
    match op {
        Or => 1,
        Xor => 2,
        And => 3,
        Eq | NullSafeEq | NotEq | Lt | LtEq | Gt | GtEq | Like | NotLike | RegExp => 4,
        BitOr => 5,
        BitAnd => 6,
        ShiftLeft | ShiftRight => 7,
        Add | Sub => 8,
        Mul | Div | IntDiv | Mod => 9,
        BitXor => 10,
    }
}

// =========================================================================
// Convenience functions
// =========================================================================

/// Render a statement to a compact SQL string and its placeholders
pub fn render(stmt: &Stmt, dialect: Dialect) -> BuildResult<(String, ParamCollector)> {
    let capacity = SqlRenderer::estimate_capacity(stmt);
    let mut renderer = SqlRenderer::with_capacity(dialect, capacity);
    stmt.render(&mut renderer)?;
    Ok(renderer.into_parts())
}

/// Render a statement to a pretty-printed SQL string
pub fn render_pretty(stmt: &Stmt, dialect: Dialect) -> BuildResult<String> {
    let mut renderer = SqlRenderer::pretty(dialect);
    stmt.render(&mut renderer)?;
    Ok(renderer.into_sql())
}

/// Render just an expression
pub fn render_expr(expr: &Expr, dialect: Dialect) -> BuildResult<String> {
    let mut renderer = SqlRenderer::new(dialect);
    renderer.render_expr(expr)?;
    Ok(renderer.into_sql())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn mysql(stmt: &Stmt) -> String {
        render(stmt, Dialect::mysql8()).unwrap().0
    }

    fn users() -> TabularBlock {
        TabularBlock::new(
            JoinKind::None,
            TabularItem::Table(TableRef::new("users")),
            Some(Ident::new("u")),
        )
    }

    #[test]
    fn test_render_simple_select() {
        let stmt = SelectStmt::columns(vec![SelectColumn::star()]).with_from(vec![users()]);
        assert_eq!(
            mysql(&Stmt::Query(Query::simple(stmt))),
            "select * from `users` as `u`"
        );
    }

    #[test]
    fn test_render_values_become_placeholders() {
        let stmt = SelectStmt::columns(vec![SelectColumn::expr(Expr::qualified_column("u", "id"))])
            .with_from(vec![users()])
            .with_where(Expr::qualified_column("u", "name").eq(Expr::value("alice")));

        let (sql, params) = render(&Stmt::Query(Query::simple(stmt)), Dialect::mysql8()).unwrap();
        assert_eq!(
            sql,
            "select `u`.`id` from `users` as `u` where `u`.`name` = ?"
        );
        assert_eq!(params.len(), 1);
        assert!(!params.has_named());
    }

    #[test]
    fn test_standard_quotes_with_double_quotes() {
        let sql = render_expr(&Expr::qualified_column("t", "a\"b"), Dialect::Standard).unwrap();
        assert_eq!(sql, "\"t\".\"a\"\"b\"");
    }

    #[test]
    fn test_ident_quoting() {
        let mut renderer = SqlRenderer::new(Dialect::mysql8());
        renderer.write_ident(&Ident::new("user`name"));
        assert_eq!(renderer.into_sql(), "`user``name`");
    }

    #[test]
    fn test_string_literal_escaping() {
        let mut renderer = SqlRenderer::new(Dialect::mysql8());
        renderer.write_literal("it's a \\ test");
        assert_eq!(renderer.into_sql(), "'it''s a \\\\ test'");

        let mut renderer = SqlRenderer::new(Dialect::Standard);
        renderer.write_literal("a\\b");
        assert_eq!(renderer.into_sql(), "'a\\b'");
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)).or(Expr::column("c").eq(Expr::int(3))));
        assert_eq!(
            render_expr(&expr, Dialect::mysql8()).unwrap(),
            "`a` = 1 and (`b` = 2 or `c` = 3)"
        );
    }

    #[test]
    fn test_where_list_wraps_disjunctions() {
        let stmt = SelectStmt {
            columns: vec![SelectColumn::star()],
            from: vec![users()],
            where_clause: vec![
                Expr::column("a").eq(Expr::int(1)),
                Expr::column("b").eq(Expr::int(2)).or(Expr::column("c").eq(Expr::int(3))),
            ],
            ..Default::default()
        };
        let sql = mysql(&Stmt::Query(Query::simple(stmt)));
        assert!(sql.ends_with("where `a` = 1 and (`b` = 2 or `c` = 3)"));
    }

    #[test]
    fn test_render_case() {
        let case = CaseExpr::searched(
            vec![(
                Expr::column("status").eq(Expr::string("active")),
                Expr::int(1),
            )],
            Some(Expr::int(-1)),
        );
        let sql = render_expr(&Expr::Case(case), Dialect::mysql8()).unwrap();
        assert_eq!(sql, "case when `status` = 'active' then 1 else -1 end");
    }

    #[test]
    fn test_count_star_and_window_function() {
        let expr = Expr::Function(
            FunctionCall::new("row_number", vec![]).over(
                WindowSpec::new()
                    .with_partition_by(vec![Expr::column("dept")])
                    .with_order_by(vec![OrderByExpr::desc(Expr::column("salary"))]),
            ),
        );
        assert_eq!(
            render_expr(&expr, Dialect::mysql8()).unwrap(),
            "row_number() over (partition by `dept` order by `salary` desc)"
        );
        assert_eq!(
            render_expr(&Expr::count_star(), Dialect::mysql8()).unwrap(),
            "count(*)"
        );

        let err = render_expr(&expr, Dialect::mysql57()).unwrap_err();
        assert!(matches!(err, BuildError::DialectUnsupported { .. }));
    }

    #[test]
    fn test_empty_in_list_is_rejected() {
        let expr = Expr::column("id").in_list(vec![]);
        assert_eq!(
            render_expr(&expr, Dialect::mysql8()),
            Err(BuildError::EmptyClauseList { clause: "in" })
        );
    }

    #[test]
    fn test_mysql_only_operator_under_standard() {
        let expr = Expr::binary(Expr::column("a"), BinaryOperator::NullSafeEq, Expr::null());
        assert!(render_expr(&expr, Dialect::mysql8()).is_ok());
        assert!(matches!(
            render_expr(&expr, Dialect::Standard),
            Err(BuildError::DialectUnsupported { .. })
        ));
    }

    #[test]
    fn test_pretty_output_breaks_lines() {
        let stmt = SelectStmt::columns(vec![SelectColumn::star()])
            .with_from(vec![users()])
            .with_limit(10);
        let sql = render_pretty(&Stmt::Query(Query::simple(stmt)), Dialect::mysql8()).unwrap();
        assert_eq!(sql, "select *\nfrom `users` as `u`\nlimit 10");
    }
}
