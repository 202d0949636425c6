//! SQL expression types
//!
//! Expressions are the leaves and inner nodes of every clause: columns,
//! literals, bound values, operators, function calls and subqueries.
//! Subqueries are carried as finished [`Query`] values; they are built
//! inside their own scope and never re-validated by the enclosing one.

use super::params::ParamValue;
use super::stmt::Query;

/// A SQL identifier (table name, column name, alias, ...)
///
/// Identifiers are always quoted when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(pub String);

impl Ident {
    /// Create a new identifier from any string-like type
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&Ident> for Ident {
    fn from(s: &Ident) -> Self {
        s.clone()
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a column, optionally qualified with a table alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias (e.g., "t" in "t.id")
    pub table_alias: Option<Ident>,
    /// Column name
    pub column: Ident,
}

impl ColumnRef {
    pub fn new(column: impl Into<Ident>) -> Self {
        Self {
            table_alias: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self {
            table_alias: Some(table.into()),
            column: column.into(),
        }
    }
}

impl From<&str> for ColumnRef {
    /// `"a.id"` becomes a qualified reference, `"id"` a bare one.
    fn from(s: &str) -> Self {
        match s.split_once('.') {
            Some((table, column)) => Self::qualified(table, column),
            None => Self::new(s),
        }
    }
}

/// SQL literal values, rendered inline
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// String literal (will be properly quoted)
    String(String),
    /// DEFAULT keyword (for INSERT / UPDATE)
    Default,
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    NullSafeEq, // <=>
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // String operators
    Like,
    NotLike,
    RegExp,

    // Logical
    And,
    Or,
    Xor,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    IntDiv, // DIV
    Mod,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    /// Get the SQL representation of this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NullSafeEq => "<=>",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::RegExp => "regexp",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::IntDiv => "div",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        }
    }

    /// Operators that only MySQL understands.
    pub fn is_mysql_only(&self) -> bool {
        matches!(
            self,
            Self::NullSafeEq | Self::RegExp | Self::Xor | Self::IntDiv
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    BitNot,
}

impl UnaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Neg => "-",
            Self::BitNot => "~",
        }
    }
}

/// A function call, aggregate or window function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Ident,
    pub args: Vec<Expr>,
    /// `count(distinct x)`
    pub distinct: bool,
    /// `over w` / `over (partition by ...)`
    pub over: Option<Over>,
}

impl FunctionCall {
    pub fn new(name: impl Into<Ident>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            distinct: false,
            over: None,
        }
    }

    pub fn with_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Turn the call into a window function over a named window.
    pub fn over_window(mut self, name: impl Into<Ident>) -> Self {
        self.over = Some(Over::Named(name.into()));
        self
    }

    /// Turn the call into a window function with an inline specification.
    pub fn over(mut self, spec: WindowSpec) -> Self {
        self.over = Some(Over::Spec(spec));
        self
    }
}

/// The OVER part of a window function
#[derive(Debug, Clone, PartialEq)]
pub enum Over {
    Named(Ident),
    Spec(WindowSpec),
}

/// A window specification, inline or in a WINDOW clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    /// Name of a window this one refines
    pub base: Option<Ident>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub frame: Option<WindowFrame>,
}

impl WindowSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<Ident>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_partition_by(mut self, exprs: Vec<Expr>) -> Self {
        self.partition_by = exprs;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderByExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_frame(mut self, frame: WindowFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub(crate) fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.partition_by
            .iter()
            .chain(self.order_by.iter().map(|o| &o.expr))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub units: FrameUnits,
    pub start: FrameBound,
    /// `between start and end` when present
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnits {
    Rows,
    Range,
}

impl FrameUnits {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Range => "range",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

/// CASE expression
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    /// CASE <operand> (simple case) vs CASE WHEN (searched case)
    pub operand: Option<Box<Expr>>,
    /// WHEN ... THEN ... pairs
    pub when_clauses: Vec<(Expr, Expr)>,
    pub else_clause: Option<Box<Expr>>,
}

impl CaseExpr {
    /// Create a searched CASE expression (CASE WHEN ... THEN ...)
    pub fn searched(when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Self {
        Self {
            operand: None,
            when_clauses,
            else_clause: else_clause.map(Box::new),
        }
    }

    /// Create a simple CASE expression (CASE x WHEN ... THEN ...)
    pub fn simple(
        operand: Expr,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Expr>,
    ) -> Self {
        Self {
            operand: Some(Box::new(operand)),
            when_clauses,
            else_clause: else_clause.map(Box::new),
        }
    }
}

/// ORDER BY / GROUP BY key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
}

impl OrderByExpr {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            direction: None,
        }
    }

    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Some(OrderDirection::Asc),
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Some(OrderDirection::Desc),
        }
    }
}

impl From<Expr> for OrderByExpr {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// The main expression enum encompassing all SQL expression types
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: table.column or just column
    Column(ColumnRef),

    /// Literal value, rendered inline
    Literal(Literal),

    /// Host value bound as a positional placeholder
    Value(ParamValue),

    /// Named parameter, resolved per row of a batch parameter list
    NamedParam(Ident),

    /// `*` as a function argument (`count(*)`)
    Wildcard,

    /// Binary operation: expr op expr
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr (e.g., NOT)
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    Function(FunctionCall),

    Case(CaseExpr),

    /// Scalar subquery: (SELECT ...)
    Subquery(Box<Query>),

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// expr IN (values)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// expr IN (subquery)
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },

    /// expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// EXISTS (subquery)
    Exists { subquery: Box<Query>, negated: bool },

    /// Parenthesized expression (for explicit grouping)
    Nested(Box<Expr>),

    /// Row constructor: (expr1, expr2, ...)
    Row(Vec<Expr>),
}

impl Expr {
    // Convenience constructors

    /// Create a column reference
    pub fn column(name: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    /// Create a qualified column reference (table.column)
    pub fn qualified_column(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::qualified(table, column))
    }

    pub fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    pub fn bool(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }

    pub fn int(n: i64) -> Self {
        Self::Literal(Literal::Integer(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Literal::String(s.into()))
    }

    pub fn default_value() -> Self {
        Self::Literal(Literal::Default)
    }

    /// Bind a host value as a `?` placeholder
    pub fn value(v: impl Into<ParamValue>) -> Self {
        Self::Value(v.into())
    }

    /// Reference a named batch parameter
    pub fn param(name: impl Into<Ident>) -> Self {
        Self::NamedParam(name.into())
    }

    /// Create a binary operation
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a NOT expression
    pub fn not(expr: Expr) -> Self {
        Self::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(expr),
        }
    }

    pub fn is_null(expr: Expr) -> Self {
        Self::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    pub fn is_not_null(expr: Expr) -> Self {
        Self::IsNull {
            expr: Box::new(expr),
            negated: true,
        }
    }

    pub fn function(name: impl Into<Ident>, args: Vec<Expr>) -> Self {
        Self::Function(FunctionCall::new(name, args))
    }

    pub fn count_star() -> Self {
        Self::function("count", vec![Expr::Wildcard])
    }

    pub fn in_list(self, list: Vec<Expr>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn exists(subquery: Query) -> Self {
        Self::Exists {
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    pub fn in_subquery(self, subquery: Query) -> Self {
        Self::InSubquery {
            expr: Box::new(self),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    pub fn scalar(subquery: Query) -> Self {
        Self::Subquery(Box::new(subquery))
    }

    /// Wrap in parentheses
    pub fn nested(self) -> Self {
        Self::Nested(Box::new(self))
    }

    pub fn and(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Or, other)
    }

    pub fn eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::GtEq, other)
    }

    pub fn like(self, pattern: Expr) -> Self {
        Self::binary(self, BinaryOperator::Like, pattern)
    }

    /// Visit every column reference in this expression.
    ///
    /// Subqueries are not entered: their references were checked against
    /// their own scope when they were built.
    pub fn visit_columns<'a>(&'a self, f: &mut dyn FnMut(&'a ColumnRef)) {
        match self {
            Self::Column(c) => f(c),
            Self::Literal(_)
            | Self::Value(_)
            | Self::NamedParam(_)
            | Self::Wildcard
            | Self::Subquery(_)
            | Self::Exists { .. } => {}
            Self::BinaryOp { left, right, .. } => {
                left.visit_columns(f);
                right.visit_columns(f);
            }
            Self::UnaryOp { expr, .. } | Self::IsNull { expr, .. } | Self::Nested(expr) => {
                expr.visit_columns(f)
            }
            Self::Function(call) => {
                for arg in &call.args {
                    arg.visit_columns(f);
                }
                if let Some(Over::Spec(spec)) = &call.over {
                    for e in spec.exprs() {
                        e.visit_columns(f);
                    }
                }
            }
            Self::Case(case) => {
                if let Some(op) = &case.operand {
                    op.visit_columns(f);
                }
                for (when, then) in &case.when_clauses {
                    when.visit_columns(f);
                    then.visit_columns(f);
                }
                if let Some(e) = &case.else_clause {
                    e.visit_columns(f);
                }
            }
            Self::InList { expr, list, .. } => {
                expr.visit_columns(f);
                for e in list {
                    e.visit_columns(f);
                }
            }
            Self::InSubquery { expr, .. } => expr.visit_columns(f),
            Self::Between {
                expr, low, high, ..
            } => {
                expr.visit_columns(f);
                low.visit_columns(f);
                high.visit_columns(f);
            }
            Self::Row(items) => {
                for e in items {
                    e.visit_columns(f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref() {
        let col = ColumnRef::new("id");
        assert_eq!(col.column.as_str(), "id");
        assert!(col.table_alias.is_none());

        let col = ColumnRef::from("users.id");
        assert_eq!(col.table_alias.unwrap().as_str(), "users");
        assert_eq!(col.column.as_str(), "id");
    }

    #[test]
    fn test_expr_constructors() {
        let expr = Expr::qualified_column("t", "id");
        match expr {
            Expr::Column(c) => {
                assert_eq!(c.table_alias.unwrap().as_str(), "t");
                assert_eq!(c.column.as_str(), "id");
            }
            _ => panic!("Expected Column"),
        }

        match Expr::value(42) {
            Expr::Value(ParamValue::Integer(n)) => assert_eq!(n, 42),
            _ => panic!("Expected bound Integer"),
        }
    }

    #[test]
    fn test_binary_op() {
        let expr = Expr::qualified_column("t", "id").eq(Expr::int(1));
        match expr {
            Expr::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::Eq),
            _ => panic!("Expected BinaryOp"),
        }
    }

    #[test]
    fn test_visit_columns_collects_qualified_refs() {
        let expr = Expr::qualified_column("a", "id")
            .eq(Expr::qualified_column("b", "a_id"))
            .and(Expr::column("flag").in_list(vec![Expr::int(1), Expr::int(2)]));

        let mut seen = Vec::new();
        expr.visit_columns(&mut |c| seen.push(c.clone()));

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], ColumnRef::qualified("a", "id"));
        assert_eq!(seen[2], ColumnRef::new("flag"));
    }
}
