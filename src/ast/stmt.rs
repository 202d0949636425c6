//! SQL statement types
//!
//! SELECT (simple, composite and bracketed), INSERT/REPLACE, UPDATE and
//! DELETE, with the MySQL clause set: optimizer hints, modifiers, index
//! hints, partitions, WITH ROLLUP, WINDOW, locking and INTO variables.

use super::cte::WithClause;
use super::expr::{ColumnRef, Expr, Ident, OrderByExpr, WindowSpec};
use super::table::{validate_chain, TabularBlock};
use crate::dialect::MySqlVersion;
use crate::error::{BuildError, BuildResult};

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Query(Query),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

/// An optimizer hint, rendered as `/*+ text */`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    /// Oldest server version that understands this hint
    pub min_version: Option<MySqlVersion>,
}

impl Hint {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            min_version: None,
        }
    }

    pub fn since(mut self, version: MySqlVersion) -> Self {
        self.min_version = Some(version);
        self
    }
}

/// Keywords between SELECT and the select list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectModifier {
    All,
    Distinct,
    DistinctRow,
    HighPriority,
    StraightJoin,
    SqlSmallResult,
    SqlBigResult,
    SqlBufferResult,
    SqlNoCache,
    SqlCalcFoundRows,
}

impl SelectModifier {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Distinct => "distinct",
            Self::DistinctRow => "distinctrow",
            Self::HighPriority => "high_priority",
            Self::StraightJoin => "straight_join",
            Self::SqlSmallResult => "sql_small_result",
            Self::SqlBigResult => "sql_big_result",
            Self::SqlBufferResult => "sql_buffer_result",
            Self::SqlNoCache => "sql_no_cache",
            Self::SqlCalcFoundRows => "sql_calc_found_rows",
        }
    }

    /// ALL and DISTINCT are standard; the rest are MySQL extensions.
    pub fn is_standard(&self) -> bool {
        matches!(self, Self::All | Self::Distinct)
    }
}

/// A column in a SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// An expression with optional alias: expr AS alias
    Expr { expr: Expr, alias: Option<Ident> },
    /// All columns: *
    Star,
    /// All columns from a table: table.*
    QualifiedStar { table: Ident },
}

impl SelectColumn {
    /// Create an expression column without alias
    pub fn expr(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }

    /// Create an expression column with alias
    pub fn expr_as(expr: Expr, alias: impl Into<Ident>) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn star() -> Self {
        Self::Star
    }

    pub fn qualified_star(table: impl Into<Ident>) -> Self {
        Self::QualifiedStar {
            table: table.into(),
        }
    }
}

impl From<Expr> for SelectColumn {
    fn from(expr: Expr) -> Self {
        Self::expr(expr)
    }
}

/// LIMIT [offset,] row_count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: Option<u64>,
    pub row_count: u64,
}

impl Limit {
    pub fn new(row_count: u64) -> Self {
        Self {
            offset: None,
            row_count,
        }
    }

    pub fn with_offset(offset: u64, row_count: u64) -> Self {
        Self {
            offset: Some(offset),
            row_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    ForUpdate,
    ForShare,
    /// Pre-8.0 spelling of a shared lock
    LockInShareMode,
}

impl LockStrength {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ForUpdate => "for update",
            Self::ForShare => "for share",
            Self::LockInShareMode => "lock in share mode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    NoWait,
    SkipLocked,
}

impl LockWait {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoWait => "nowait",
            Self::SkipLocked => "skip locked",
        }
    }
}

/// Row locking clause of a SELECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockClause {
    pub strength: LockStrength,
    /// `of a, b`
    pub of: Vec<Ident>,
    pub wait: Option<LockWait>,
}

impl LockClause {
    pub fn new(strength: LockStrength) -> Self {
        Self {
            strength,
            of: Vec::new(),
            wait: None,
        }
    }

    /// Oldest MySQL version able to express this clause
    pub fn required_version(&self) -> Option<MySqlVersion> {
        let modern = self.strength == LockStrength::ForShare
            || !self.of.is_empty()
            || self.wait.is_some();
        modern.then_some(MySqlVersion::V8_0_1)
    }
}

/// `window w as (...)`
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWindow {
    pub name: Ident,
    pub spec: WindowSpec,
}

/// Simple SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    pub with: Option<WithClause>,
    pub hints: Vec<Hint>,
    pub modifiers: Vec<SelectModifier>,
    pub columns: Vec<SelectColumn>,
    /// FROM block chain; empty for `select 1`
    pub from: Vec<TabularBlock>,
    /// AND-ed WHERE predicates
    pub where_clause: Vec<Expr>,
    pub group_by: Vec<OrderByExpr>,
    pub group_with_rollup: bool,
    /// AND-ed HAVING predicates
    pub having: Vec<Expr>,
    pub windows: Vec<NamedWindow>,
    pub order_by: Vec<OrderByExpr>,
    pub order_with_rollup: bool,
    pub limit: Option<Limit>,
    pub lock: Option<LockClause>,
    /// `into @a, @b`
    pub into_vars: Vec<Ident>,
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simple SELECT with columns
    pub fn columns(columns: Vec<SelectColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Vec<TabularBlock>) -> Self {
        self.from = from;
        self
    }

    pub fn with_where(mut self, expr: Expr) -> Self {
        self.where_clause.push(expr);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderByExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(Limit::new(limit));
        self
    }

    /// ORDER BY, LIMIT, locking or INTO after the body
    pub fn has_trailing_clauses(&self) -> bool {
        !self.order_by.is_empty()
            || self.limit.is_some()
            || self.lock.is_some()
            || !self.into_vars.is_empty()
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.columns.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "select" });
        }
        if let Some(with) = &self.with {
            if with.ctes.is_empty() {
                return Err(BuildError::EmptyClauseList { clause: "with" });
            }
        }
        validate_chain(&self.from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    UnionDistinct,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::UnionAll => "union all",
            Self::UnionDistinct => "union distinct",
        }
    }
}

/// `left op right [order by ...] [limit ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeQuery {
    pub left: Query,
    pub op: SetOperator,
    pub right: Query,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
}

/// `(inner) [order by ...] [limit ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct BracketQuery {
    pub inner: Query,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
}

/// Any SELECT-shaped query
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Simple(Box<SelectStmt>),
    Composite(Box<CompositeQuery>),
    Bracketed(Box<BracketQuery>),
}

impl Default for Query {
    fn default() -> Self {
        Self::Simple(Box::default())
    }
}

impl Query {
    pub fn simple(stmt: SelectStmt) -> Self {
        Self::Simple(Box::new(stmt))
    }

    pub fn bracket(inner: Query) -> Self {
        Self::Bracketed(Box::new(BracketQuery {
            inner,
            order_by: Vec::new(),
            limit: None,
        }))
    }

    /// Combine two operands. A right operand that is itself composite or
    /// carries trailing clauses is bracketed so it keeps its meaning.
    pub fn compose(left: Query, op: SetOperator, right: Query) -> Self {
        let right = if right.needs_brackets_as_operand() {
            Query::bracket(right)
        } else {
            right
        };
        Self::Composite(Box::new(CompositeQuery {
            left,
            op,
            right,
            order_by: Vec::new(),
            limit: None,
        }))
    }

    pub fn as_simple(&self) -> Option<&SelectStmt> {
        match self {
            Self::Simple(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeQuery> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_bracketed(&self) -> Option<&BracketQuery> {
        match self {
            Self::Bracketed(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_bracketed(&self) -> bool {
        matches!(self, Self::Bracketed(_))
    }

    /// The WITH clause that prefixes this query, if any. A composite is
    /// led by its leftmost operand; a bracketed query keeps its WITH inside.
    pub fn leading_with(&self) -> Option<&WithClause> {
        match self {
            Self::Simple(s) => s.with.as_ref(),
            Self::Composite(c) => c.left.leading_with(),
            Self::Bracketed(_) => None,
        }
    }

    pub fn has_trailing_clauses(&self) -> bool {
        match self {
            Self::Simple(s) => s.has_trailing_clauses(),
            Self::Composite(c) => !c.order_by.is_empty() || c.limit.is_some(),
            Self::Bracketed(b) => !b.order_by.is_empty() || b.limit.is_some(),
        }
    }

    fn needs_brackets_as_operand(&self) -> bool {
        matches!(self, Self::Composite(_)) || self.has_trailing_clauses()
    }

    /// ORDER BY / LIMIT slots of a composite or bracketed query
    pub fn trailing_mut(&mut self) -> Option<(&mut Vec<OrderByExpr>, &mut Option<Limit>)> {
        match self {
            Self::Simple(_) => None,
            Self::Composite(c) => Some((&mut c.order_by, &mut c.limit)),
            Self::Bracketed(b) => Some((&mut b.order_by, &mut b.limit)),
        }
    }

    pub fn validate(&self) -> BuildResult<()> {
        match self {
            Self::Simple(s) => s.validate(),
            Self::Composite(c) => {
                c.left.validate()?;
                c.right.validate()
            }
            Self::Bracketed(b) => b.inner.validate(),
        }
    }
}

/// `column = value` in SET / ON DUPLICATE KEY UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: Expr,
}

impl Assignment {
    pub fn new(column: impl Into<ColumnRef>, value: Expr) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertVerb {
    #[default]
    Insert,
    Replace,
}

impl InsertVerb {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Replace => "replace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertModifier {
    LowPriority,
    Delayed,
    HighPriority,
    Ignore,
}

impl InsertModifier {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::LowPriority => "low_priority",
            Self::Delayed => "delayed",
            Self::HighPriority => "high_priority",
            Self::Ignore => "ignore",
        }
    }
}

/// Where inserted rows come from; exactly one per statement
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Assignments(Vec<Assignment>),
    Query(Box<Query>),
}

impl InsertSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Values(_) => "values",
            Self::Assignments(_) => "set",
            Self::Query(_) => "select",
        }
    }
}

/// INSERT / REPLACE statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertStmt {
    pub verb: InsertVerb,
    pub hints: Vec<Hint>,
    pub modifiers: Vec<InsertModifier>,
    pub table: Option<super::table::TableRef>,
    pub partitions: Vec<Ident>,
    pub columns: Vec<Ident>,
    pub source: Option<InsertSource>,
    /// ON DUPLICATE KEY UPDATE assignments (INSERT only)
    pub on_duplicate: Vec<Assignment>,
}

impl InsertStmt {
    /// Append a VALUES row
    pub fn push_row(&mut self, row: Vec<Expr>) -> BuildResult<()> {
        let expected = match (&self.source, self.columns.len()) {
            (_, n) if n > 0 => Some(n),
            (Some(InsertSource::Values(rows)), _) => rows.first().map(Vec::len),
            _ => None,
        };
        match &mut self.source {
            None => {
                check_row_width(expected, &row, 0)?;
                self.source = Some(InsertSource::Values(vec![row]));
                Ok(())
            }
            Some(InsertSource::Values(rows)) => {
                check_row_width(expected, &row, rows.len())?;
                rows.push(row);
                Ok(())
            }
            Some(other) => Err(BuildError::ConflictingInsertMode {
                existing: other.name(),
                attempted: "values",
            }),
        }
    }

    /// Append a SET assignment
    pub fn push_assignment(&mut self, assignment: Assignment) -> BuildResult<()> {
        match &mut self.source {
            None => {
                self.source = Some(InsertSource::Assignments(vec![assignment]));
                Ok(())
            }
            Some(InsertSource::Assignments(list)) => {
                list.push(assignment);
                Ok(())
            }
            Some(other) => Err(BuildError::ConflictingInsertMode {
                existing: other.name(),
                attempted: "set",
            }),
        }
    }

    /// Use a sub-select as the row source
    pub fn set_query(&mut self, query: Query) -> BuildResult<()> {
        match &self.source {
            None => {
                self.source = Some(InsertSource::Query(Box::new(query)));
                Ok(())
            }
            Some(other) => Err(BuildError::ConflictingInsertMode {
                existing: other.name(),
                attempted: "select",
            }),
        }
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.table.is_none() {
            return Err(BuildError::stage("insert", "no target table"));
        }
        match &self.source {
            None => Err(BuildError::MissingInsertMode),
            Some(InsertSource::Values(rows)) => {
                if rows.is_empty() {
                    return Err(BuildError::EmptyClauseList { clause: "values" });
                }
                let expected = if self.columns.is_empty() {
                    rows[0].len()
                } else {
                    self.columns.len()
                };
                for (i, row) in rows.iter().enumerate() {
                    check_row_width(Some(expected), row, i)?;
                }
                Ok(())
            }
            Some(InsertSource::Assignments(list)) if list.is_empty() => {
                Err(BuildError::EmptyClauseList { clause: "set" })
            }
            Some(InsertSource::Assignments(_)) => Ok(()),
            Some(InsertSource::Query(q)) => q.validate(),
        }?;
        if self.verb == InsertVerb::Replace && !self.on_duplicate.is_empty() {
            return Err(BuildError::stage(
                "on duplicate key update",
                "not allowed on replace",
            ));
        }
        Ok(())
    }
}

fn check_row_width(expected: Option<usize>, row: &[Expr], index: usize) -> BuildResult<()> {
    match expected {
        Some(n) if n != row.len() => Err(BuildError::ColumnCountMismatch {
            expected: n,
            actual: row.len(),
            row: index,
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateModifier {
    LowPriority,
    Ignore,
}

impl UpdateModifier {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::LowPriority => "low_priority",
            Self::Ignore => "ignore",
        }
    }
}

/// UPDATE statement, single- or multi-table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateStmt {
    pub with: Option<WithClause>,
    pub hints: Vec<Hint>,
    pub modifiers: Vec<UpdateModifier>,
    pub tables: Vec<TabularBlock>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Vec<Expr>,
    /// Single-table only
    pub order_by: Vec<OrderByExpr>,
    /// Single-table only
    pub limit: Option<Limit>,
}

impl UpdateStmt {
    /// More than one table bound, counting those inside nested groups
    pub fn is_multi_table(&self) -> bool {
        self.tables.iter().map(|b| b.bindings().len()).sum::<usize>() > 1
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.tables.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "update" });
        }
        if self.assignments.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "set" });
        }
        if self.is_multi_table() && (!self.order_by.is_empty() || self.limit.is_some()) {
            return Err(BuildError::stage(
                "order by / limit",
                "not allowed on multi-table update",
            ));
        }
        validate_chain(&self.tables)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteModifier {
    LowPriority,
    Quick,
    Ignore,
}

impl DeleteModifier {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::LowPriority => "low_priority",
            Self::Quick => "quick",
            Self::Ignore => "ignore",
        }
    }
}

/// DELETE statement
///
/// With `targets` empty this is `delete from t ...`; otherwise it is the
/// multi-table form `delete a, b from t1 a join t2 b ...`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteStmt {
    pub with: Option<WithClause>,
    pub hints: Vec<Hint>,
    pub modifiers: Vec<DeleteModifier>,
    pub targets: Vec<Ident>,
    pub from: Vec<TabularBlock>,
    pub where_clause: Vec<Expr>,
    /// Single-table only
    pub order_by: Vec<OrderByExpr>,
    /// Single-table only
    pub limit: Option<Limit>,
}

impl DeleteStmt {
    pub fn is_multi_table(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.from.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "from" });
        }
        validate_chain(&self.from)?;
        if self.is_multi_table() {
            if !self.order_by.is_empty() || self.limit.is_some() {
                return Err(BuildError::stage(
                    "order by / limit",
                    "not allowed on multi-table delete",
                ));
            }
            let bound: Vec<Ident> = self.from.iter().flat_map(|b| b.bindings()).collect();
            if let Some(missing) = self.targets.iter().find(|t| !bound.contains(t)) {
                return Err(BuildError::UnknownAlias {
                    alias: missing.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_one() -> Query {
        Query::simple(SelectStmt::columns(vec![Expr::int(1).into()]))
    }

    #[test]
    fn test_compose_brackets_composite_right_operand() {
        let inner = Query::compose(select_one(), SetOperator::Union, select_one());
        let q = Query::compose(select_one(), SetOperator::UnionAll, inner);
        let c = q.as_composite().unwrap();
        assert!(c.left.as_simple().is_some());
        assert!(c.right.is_bracketed());
    }

    #[test]
    fn test_compose_brackets_right_operand_with_limit() {
        let right = Query::simple(SelectStmt::columns(vec![Expr::int(2).into()]).with_limit(1));
        let q = Query::compose(select_one(), SetOperator::Union, right);
        assert!(q.as_composite().unwrap().right.is_bracketed());
    }

    #[test]
    fn test_insert_modes_are_exclusive() {
        let mut insert = InsertStmt::default();
        insert.push_row(vec![Expr::int(1)]).unwrap();
        let err = insert
            .push_assignment(Assignment::new("a", Expr::int(1)))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::ConflictingInsertMode {
                existing: "values",
                attempted: "set"
            }
        );
        assert!(insert.set_query(select_one()).is_err());
    }

    #[test]
    fn test_insert_row_width() {
        let mut insert = InsertStmt {
            columns: vec![Ident::new("a"), Ident::new("b")],
            ..Default::default()
        };
        insert.push_row(vec![Expr::int(1), Expr::int(2)]).unwrap();
        match insert.push_row(vec![Expr::int(1)]) {
            Err(BuildError::ColumnCountMismatch {
                expected, actual, row,
            }) => {
                assert_eq!((expected, actual, row), (2, 1, 1));
            }
            other => panic!("Expected ColumnCountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_without_source() {
        let insert = InsertStmt {
            table: Some("t".into()),
            ..Default::default()
        };
        assert_eq!(insert.validate(), Err(BuildError::MissingInsertMode));
    }

    #[test]
    fn test_lock_required_version() {
        assert_eq!(LockClause::new(LockStrength::ForUpdate).required_version(), None);
        assert_eq!(
            LockClause::new(LockStrength::ForShare).required_version(),
            Some(MySqlVersion::V8_0_1)
        );
        let mut lock = LockClause::new(LockStrength::ForUpdate);
        lock.wait = Some(LockWait::SkipLocked);
        assert!(lock.required_version().is_some());
    }
}
