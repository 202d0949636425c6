//! Table references and the tabular block chain
//!
//! A FROM clause (and the table list of a multi-table UPDATE or DELETE) is
//! an ordered chain of [`TabularBlock`]s. The first block has no join kind;
//! every later block carries one. A nested join group is itself a chain,
//! stored inline as [`TabularItem::Nested`].

use super::expr::{Expr, Ident};
use super::stmt::Query;
use crate::error::{BuildError, BuildResult};

/// A base table, optionally schema-qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: Option<Ident>,
    pub name: Ident,
}

impl TableRef {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<Ident>, name: impl Into<Ident>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Attach an alias, producing a FROM/JOIN source
    pub fn aliased(self, alias: impl Into<Ident>) -> TableSource {
        TableSource {
            table: self,
            alias: Some(alias.into()),
        }
    }
}

impl From<&str> for TableRef {
    /// `"db.t"` becomes schema-qualified, `"t"` stays bare.
    fn from(s: &str) -> Self {
        match s.split_once('.') {
            Some((schema, name)) => Self::qualified(schema, name),
            None => Self::new(s),
        }
    }
}

impl From<String> for TableRef {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A table plus the alias it is bound under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub table: TableRef,
    pub alias: Option<Ident>,
}

impl TableSource {
    /// The name the block is visible under: the alias, else the table name.
    pub fn binding(&self) -> Ident {
        self.alias.clone().unwrap_or_else(|| self.table.name.clone())
    }
}

impl From<TableRef> for TableSource {
    fn from(table: TableRef) -> Self {
        Self { table, alias: None }
    }
}

impl From<&str> for TableSource {
    fn from(s: &str) -> Self {
        TableRef::from(s).into()
    }
}

impl From<String> for TableSource {
    fn from(s: String) -> Self {
        TableRef::from(s).into()
    }
}

impl<T: Into<TableRef>, A: Into<Ident>> From<(T, A)> for TableSource {
    fn from((table, alias): (T, A)) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }
}

/// How a block attaches to the chain before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// First block of a chain
    None,
    Join,
    Left,
    Right,
    Full,
    Cross,
    /// MySQL `straight_join`
    Straight,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Join => "join",
            Self::Left => "left join",
            Self::Right => "right join",
            Self::Full => "full join",
            Self::Cross => "cross join",
            Self::Straight => "straight_join",
        }
    }

    /// Whether the block must carry ON or USING. No other kind may carry
    /// one: cross and straight joins are always unconstrained.
    pub fn requires_predicate(&self) -> bool {
        matches!(self, Self::Join | Self::Left | Self::Right | Self::Full)
    }
}

/// ON predicates or a USING column list
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    /// AND-ed predicates
    On(Vec<Expr>),
    Using(Vec<Ident>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintAction {
    Use,
    Ignore,
    Force,
}

impl IndexHintAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Use => "use index",
            Self::Ignore => "ignore index",
            Self::Force => "force index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintScope {
    Join,
    OrderBy,
    GroupBy,
}

impl IndexHintScope {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Join => "for join",
            Self::OrderBy => "for order by",
            Self::GroupBy => "for group by",
        }
    }
}

/// `use index for join (a, b)` and friends
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHint {
    pub action: IndexHintAction,
    pub scope: Option<IndexHintScope>,
    pub indexes: Vec<Ident>,
}

/// What a block refers to
#[derive(Debug, Clone, PartialEq)]
pub enum TabularItem {
    Table(TableRef),
    /// Derived table; `lateral` blocks may see earlier siblings
    Derived { query: Box<Query>, lateral: bool },
    CteRef(Ident),
    Nested(NestedJoin),
}

/// A parenthesized join group: `(a join b on ...)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedJoin {
    pub blocks: Vec<TabularBlock>,
}

/// One element of the block chain
#[derive(Debug, Clone, PartialEq)]
pub struct TabularBlock {
    pub join: JoinKind,
    pub item: TabularItem,
    pub alias: Option<Ident>,
    pub constraint: Option<JoinConstraint>,
    pub partitions: Vec<Ident>,
    pub index_hints: Vec<IndexHint>,
}

impl TabularBlock {
    pub fn new(join: JoinKind, item: TabularItem, alias: Option<Ident>) -> Self {
        Self {
            join,
            item,
            alias,
            constraint: None,
            partitions: Vec::new(),
            index_hints: Vec::new(),
        }
    }

    pub fn with_on(mut self, predicates: Vec<Expr>) -> Self {
        self.constraint = Some(JoinConstraint::On(predicates));
        self
    }

    /// Name used in diagnostics: alias, table name, CTE name or `(...)`.
    pub fn label(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.to_string();
        }
        match &self.item {
            TabularItem::Table(t) => t.to_string(),
            TabularItem::CteRef(name) => name.to_string(),
            TabularItem::Derived { .. } => "(derived)".to_string(),
            TabularItem::Nested(_) => "(nested join)".to_string(),
        }
    }

    /// Names this block binds in its scope, nested groups included.
    pub fn bindings(&self) -> Vec<Ident> {
        match (&self.item, &self.alias) {
            (_, Some(alias)) => vec![alias.clone()],
            (TabularItem::Table(t), None) => vec![t.name.clone()],
            (TabularItem::CteRef(name), None) => vec![name.clone()],
            (TabularItem::Nested(group), None) => {
                group.blocks.iter().flat_map(|b| b.bindings()).collect()
            }
            (TabularItem::Derived { .. }, None) => Vec::new(),
        }
    }
}

/// Check the chain rules: first block has no join, later blocks do, and
/// every predicate-taking join has its predicate.
pub fn validate_chain(blocks: &[TabularBlock]) -> BuildResult<()> {
    for (i, block) in blocks.iter().enumerate() {
        match (i, block.join) {
            (0, JoinKind::None) => {}
            (0, kind) => {
                return Err(BuildError::stage(
                    "join",
                    format!("first table cannot be a {}", kind.as_sql()),
                ))
            }
            (_, JoinKind::None) => {
                return Err(BuildError::stage(
                    "from",
                    "only the first table may omit a join",
                ))
            }
            _ => {}
        }
        if block.join.requires_predicate() && block.constraint.is_none() {
            return Err(BuildError::MissingJoinPredicate {
                join: block.join.as_sql(),
                alias: block.label(),
            });
        }
        if block.constraint.is_some() && !block.join.requires_predicate() {
            return Err(BuildError::IllegalClauseForJoinKind {
                clause: "ON/USING",
                join: if block.join == JoinKind::None {
                    "the first table"
                } else {
                    block.join.as_sql()
                },
            });
        }
        if let TabularItem::Nested(group) = &block.item {
            if group.blocks.is_empty() {
                return Err(BuildError::EmptyClauseList {
                    clause: "nested join",
                });
            }
            validate_chain(&group.blocks)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(join: JoinKind, name: &str) -> TabularBlock {
        TabularBlock::new(join, TabularItem::Table(TableRef::new(name)), None)
    }

    #[test]
    fn test_table_ref_from_str() {
        assert_eq!(TableRef::from("db.users"), TableRef::qualified("db", "users"));
        assert_eq!(TableRef::from("users").schema, None);
        let src: TableSource = ("users", "u").into();
        assert_eq!(src.binding().as_str(), "u");
    }

    #[test]
    fn test_validate_chain_requires_predicate() {
        let blocks = vec![table(JoinKind::None, "a"), table(JoinKind::Left, "b")];
        match validate_chain(&blocks) {
            Err(BuildError::MissingJoinPredicate { alias, .. }) => assert_eq!(alias, "b"),
            other => panic!("Expected MissingJoinPredicate, got {:?}", other),
        }

        let blocks = vec![
            table(JoinKind::None, "a"),
            table(JoinKind::Left, "b").with_on(vec![Expr::bool(true)]),
            table(JoinKind::Cross, "c"),
        ];
        assert!(validate_chain(&blocks).is_ok());
    }

    #[test]
    fn test_validate_chain_rejects_on_for_cross_join() {
        let blocks = vec![
            table(JoinKind::None, "a"),
            table(JoinKind::Cross, "b").with_on(vec![Expr::bool(true)]),
        ];
        assert!(matches!(
            validate_chain(&blocks),
            Err(BuildError::IllegalClauseForJoinKind { .. })
        ));
    }

    #[test]
    fn test_validate_chain_rejects_on_for_straight_join() {
        let blocks = vec![
            table(JoinKind::None, "a"),
            table(JoinKind::Straight, "b").with_on(vec![Expr::bool(true)]),
        ];
        assert_eq!(
            validate_chain(&blocks),
            Err(BuildError::IllegalClauseForJoinKind {
                clause: "ON/USING",
                join: "straight_join"
            })
        );
        assert!(!JoinKind::Straight.requires_predicate());
    }

    #[test]
    fn test_nested_bindings_flatten() {
        let group = NestedJoin {
            blocks: vec![
                table(JoinKind::None, "b"),
                table(JoinKind::Join, "c").with_on(vec![Expr::bool(true)]),
            ],
        };
        let block = TabularBlock::new(JoinKind::Left, TabularItem::Nested(group), None);
        let names: Vec<_> = block.bindings().into_iter().map(|i| i.0).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
