//! Scope stack for alias and CTE resolution
//!
//! Every statement, subquery, derived table, CTE body, set-operation
//! operand and nested join group owns one [`CriteriaContext`]. Contexts
//! form a strict LIFO stack; only the top one accepts new bindings.
//! Name lookup starts at the top and walks toward the root.

use crate::ast::{ColumnRef, Expr, Ident, TableRef};
use crate::error::{BuildError, BuildResult};
use crate::metadata::MetadataProvider;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Identity of one pushed scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What opened a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top-level statement
    Statement,
    /// Subquery inside an expression
    Subquery,
    /// Derived table; a non-lateral one cannot see its FROM siblings
    Derived { lateral: bool },
    /// Parenthesized join group; its aliases merge into the parent on close
    NestedJoin,
    /// Body of a CTE
    CteBody { name: Ident, recursive: bool },
    /// Right operand of a set operation
    SetOperand,
}

impl ScopeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Subquery => "subquery",
            Self::Derived { lateral: false } => "derived",
            Self::Derived { lateral: true } => "lateral",
            Self::NestedJoin => "nested_join",
            Self::CteBody { .. } => "cte",
            Self::SetOperand => "set_operand",
        }
    }
}

/// What an alias is bound to
#[derive(Debug, Clone, PartialEq)]
pub enum AliasTarget {
    /// Base table; columns known when a metadata provider is attached
    Table {
        table: TableRef,
        columns: Option<Vec<Ident>>,
    },
    Derived,
    Cte {
        name: Ident,
        columns: Option<Vec<Ident>>,
    },
}

impl AliasTarget {
    /// Known columns, or `None` when any column is accepted
    pub fn columns(&self) -> Option<&[Ident]> {
        match self {
            Self::Table { columns, .. } | Self::Cte { columns, .. } => columns.as_deref(),
            Self::Derived => None,
        }
    }
}

/// A CTE visible to name lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CteInfo {
    pub name: Ident,
    /// Declared column list; empty when omitted
    pub columns: Vec<Ident>,
    /// Registered inside its own recursive body before the body is finished
    pub placeholder: bool,
}

/// Bindings of one scope
#[derive(Debug, Clone)]
pub struct CriteriaContext {
    id: ScopeId,
    kind: ScopeKind,
    parent: Option<ScopeId>,
    aliases: IndexMap<Ident, AliasTarget>,
    ctes: IndexMap<Ident, CteInfo>,
}

impl CriteriaContext {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            parent,
            aliases: IndexMap::new(),
            ctes: IndexMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn alias(&self, name: &Ident) -> Option<&AliasTarget> {
        self.aliases.get(name)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&Ident, &AliasTarget)> {
        self.aliases.iter()
    }

    pub fn cte(&self, name: &Ident) -> Option<&CteInfo> {
        self.ctes.get(name)
    }

    pub fn ctes(&self) -> impl Iterator<Item = &CteInfo> {
        self.ctes.values()
    }
}

/// The LIFO stack of scopes shared by one top-level statement and every
/// sub-builder it spawns
#[derive(Debug, Default)]
pub struct ContextStack {
    scopes: Vec<CriteriaContext>,
    next_id: u64,
    metadata: Option<Arc<dyn MetadataProvider>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: Option<Arc<dyn MetadataProvider>>) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn active(&self) -> Option<&CriteriaContext> {
        self.scopes.last()
    }

    pub fn active_id(&self) -> Option<ScopeId> {
        self.scopes.last().map(|s| s.id)
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.scopes.iter().any(|s| s.id == id)
    }

    pub fn push(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        let parent = self.active_id();
        debug!(
            scope = %id,
            kind = kind.label(),
            depth = self.scopes.len() + 1,
            "push scope"
        );
        self.scopes.push(CriteriaContext::new(id, kind, parent));
        id
    }

    pub fn pop(&mut self) -> BuildResult<CriteriaContext> {
        let ctx = self.scopes.pop().ok_or(BuildError::ScopeUnderflow)?;
        debug!(
            scope = %ctx.id,
            kind = ctx.kind.label(),
            depth = self.scopes.len(),
            aliases = ctx.aliases.len(),
            "pop scope"
        );
        Ok(ctx)
    }

    /// Pop `id`, which must be the active scope
    pub fn pop_scope(&mut self, id: ScopeId) -> BuildResult<CriteriaContext> {
        self.assert_active(id)?;
        self.pop()
    }

    pub fn assert_active(&self, id: ScopeId) -> BuildResult<()> {
        match self.active_id() {
            Some(active) if active == id => Ok(()),
            active => Err(BuildError::StaleContext {
                expected: id,
                active,
            }),
        }
    }

    /// Drop `id` and everything pushed above it.
    fn unwind(&mut self, id: ScopeId) {
        if let Some(pos) = self.scopes.iter().position(|s| s.id == id) {
            let extra = self.scopes.len() - pos - 1;
            if extra > 0 {
                warn!(scope = %id, extra, "unwinding scopes left open by a sub-builder");
            }
            self.scopes.truncate(pos);
            debug!(scope = %id, depth = self.scopes.len(), "unwind scope");
        }
    }

    /// Run `f` inside a fresh child scope, popping it afterwards on every path.
    pub fn with_child<T, F>(&mut self, kind: ScopeKind, f: F) -> BuildResult<T>
    where
        F: FnOnce(&mut ContextStack, ScopeId) -> BuildResult<T>,
    {
        let id = self.push(kind);
        let mut guard = ScopeGuard::new(self, id);
        let result = f(&mut *guard.stack, id);
        drop(guard);
        result
    }

    /// Like [`with_child`](Self::with_child), but on success the child's
    /// aliases are merged into the parent scope.
    pub fn with_child_merging<T, F>(&mut self, kind: ScopeKind, f: F) -> BuildResult<T>
    where
        F: FnOnce(&mut ContextStack, ScopeId) -> BuildResult<T>,
    {
        let id = self.push(kind);
        let mut guard = ScopeGuard::new(self, id);
        let value = f(&mut *guard.stack, id)?;
        let child = guard.stack.pop_scope(id)?;
        guard.armed = false;
        guard.stack.merge_into_active(child)?;
        Ok(value)
    }

    fn active_mut(&mut self, id: ScopeId) -> BuildResult<&mut CriteriaContext> {
        self.assert_active(id)?;
        self.scopes.last_mut().ok_or(BuildError::ScopeUnderflow)
    }

    pub fn register_alias(
        &mut self,
        scope: ScopeId,
        alias: Ident,
        target: AliasTarget,
    ) -> BuildResult<()> {
        let ctx = self.active_mut(scope)?;
        if ctx.aliases.contains_key(&alias) {
            return Err(BuildError::DuplicateAlias {
                alias: alias.to_string(),
            });
        }
        trace!(scope = %scope, alias = %alias, "bind alias");
        ctx.aliases.insert(alias, target);
        Ok(())
    }

    pub fn register_cte(&mut self, scope: ScopeId, info: CteInfo) -> BuildResult<()> {
        let ctx = self.active_mut(scope)?;
        if ctx.ctes.contains_key(&info.name) {
            return Err(BuildError::DuplicateCteName {
                name: info.name.to_string(),
            });
        }
        trace!(scope = %scope, cte = %info.name, placeholder = info.placeholder, "bind cte");
        ctx.ctes.insert(info.name.clone(), info);
        Ok(())
    }

    pub fn has_local_cte(&self, scope: ScopeId, name: &Ident) -> bool {
        self.scopes
            .iter()
            .find(|s| s.id == scope)
            .is_some_and(|s| s.ctes.contains_key(name))
    }

    /// Forget the aliases of `scope`, keeping its CTEs.
    pub fn retire_aliases(&mut self, scope: ScopeId) -> BuildResult<()> {
        let ctx = self.active_mut(scope)?;
        debug!(scope = %scope, retired = ctx.aliases.len(), "retire aliases");
        ctx.aliases.clear();
        Ok(())
    }

    /// Forget the CTEs `names` declared in `scope`.
    pub fn retire_ctes<'a>(
        &mut self,
        scope: ScopeId,
        names: impl IntoIterator<Item = &'a Ident>,
    ) -> BuildResult<()> {
        let ctx = self.active_mut(scope)?;
        for name in names {
            if ctx.ctes.shift_remove(name).is_some() {
                debug!(scope = %scope, cte = %name, "retire cte");
            }
        }
        Ok(())
    }

    fn merge_into_active(&mut self, child: CriteriaContext) -> BuildResult<()> {
        let parent = self.active_id().ok_or(BuildError::ScopeUnderflow)?;
        for (alias, target) in child.aliases {
            self.register_alias(parent, alias, target)?;
        }
        Ok(())
    }

    /// Look an alias up from the active scope toward the root.
    ///
    /// A non-lateral derived table does not see its FROM siblings, only
    /// the scopes further out. Siblings include every enclosing nested
    /// join group up to the scope that owns the FROM chain.
    pub fn resolve_alias(&self, alias: &Ident) -> BuildResult<&AliasTarget> {
        let mut hidden = false;
        for ctx in self.scopes.iter().rev() {
            if hidden {
                // the owning scope is the first one past the join groups
                hidden = ctx.kind == ScopeKind::NestedJoin;
            } else if let Some(target) = ctx.aliases.get(alias) {
                return Ok(target);
            }
            if ctx.kind == (ScopeKind::Derived { lateral: false }) {
                hidden = true;
            }
        }
        Err(BuildError::UnknownAlias {
            alias: alias.to_string(),
        })
    }

    pub fn resolve_cte(&self, name: &Ident) -> BuildResult<&CteInfo> {
        if let Some(info) = self.scopes.iter().rev().find_map(|ctx| ctx.ctes.get(name)) {
            return Ok(info);
        }
        let own_body = self.scopes.iter().any(|ctx| {
            matches!(&ctx.kind, ScopeKind::CteBody { name: n, recursive: false } if n == name)
        });
        if own_body {
            return Err(BuildError::RecursiveSelfReference {
                name: name.to_string(),
            });
        }
        Err(BuildError::UnknownCte {
            name: name.to_string(),
        })
    }

    /// Columns of a base table per the metadata provider.
    ///
    /// `Ok(None)` without a provider; `UnknownTable` when the provider
    /// does not know the table.
    pub fn table_columns(&self, table: &TableRef) -> BuildResult<Option<Vec<Ident>>> {
        match &self.metadata {
            None => Ok(None),
            Some(provider) => provider
                .lookup_table(table)
                .map(|d| Some(d.columns))
                .ok_or_else(|| BuildError::UnknownTable {
                    table: table.to_string(),
                }),
        }
    }

    pub fn metadata(&self) -> Option<&Arc<dyn MetadataProvider>> {
        self.metadata.as_ref()
    }

    pub fn check_column(&self, col: &ColumnRef) -> BuildResult<()> {
        let Some(alias) = &col.table_alias else {
            return Ok(());
        };
        let target = self.resolve_alias(alias)?;
        if let Some(columns) = target.columns() {
            if !columns.contains(&col.column) {
                return Err(BuildError::UnknownColumn {
                    alias: alias.to_string(),
                    column: col.column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check every qualified column reference of `expr` against visible scopes.
    pub fn check_expr(&self, expr: &Expr) -> BuildResult<()> {
        let mut result = Ok(());
        expr.visit_columns(&mut |col| {
            if result.is_ok() {
                result = self.check_column(col);
            }
        });
        result
    }

    pub fn check_exprs<'a>(&self, exprs: impl IntoIterator<Item = &'a Expr>) -> BuildResult<()> {
        exprs.into_iter().try_for_each(|e| self.check_expr(e))
    }
}

/// Pops its scope when dropped unless disarmed
struct ScopeGuard<'a> {
    stack: &'a mut ContextStack,
    id: ScopeId,
    armed: bool,
}

impl<'a> ScopeGuard<'a> {
    fn new(stack: &'a mut ContextStack, id: ScopeId) -> Self {
        Self {
            stack,
            id,
            armed: true,
        }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.stack.unwind(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryCatalog;

    fn table(name: &str) -> AliasTarget {
        AliasTarget::Table {
            table: TableRef::new(name),
            columns: None,
        }
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        let inner = stack.push(ScopeKind::Subquery);

        assert_eq!(stack.active_id(), Some(inner));
        assert_eq!(stack.active().unwrap().parent(), Some(outer));
        assert!(matches!(
            stack.pop_scope(outer),
            Err(BuildError::StaleContext { .. })
        ));

        stack.pop_scope(inner).unwrap();
        stack.pop_scope(outer).unwrap();
        assert_eq!(stack.pop().unwrap_err(), BuildError::ScopeUnderflow);
    }

    #[test]
    fn test_register_on_stale_scope_fails() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        let _inner = stack.push(ScopeKind::Subquery);
        let err = stack
            .register_alias(outer, Ident::new("a"), table("t"))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_resolve_walks_ancestors() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        stack.register_alias(outer, Ident::new("a"), table("t")).unwrap();

        stack
            .with_child(ScopeKind::Subquery, |stack, inner| {
                stack.register_alias(inner, Ident::new("b"), table("u"))?;
                assert!(stack.resolve_alias(&Ident::new("a")).is_ok());
                assert!(stack.resolve_alias(&Ident::new("b")).is_ok());
                Ok(())
            })
            .unwrap();

        // the child is gone, so are its aliases
        assert!(matches!(
            stack.resolve_alias(&Ident::new("b")),
            Err(BuildError::UnknownAlias { .. })
        ));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_derived_scope_hides_siblings() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        stack.register_alias(outer, Ident::new("x"), table("t")).unwrap();
        let stmt = stack.push(ScopeKind::Subquery);
        stack.register_alias(stmt, Ident::new("a"), table("t")).unwrap();

        stack
            .with_child(ScopeKind::Derived { lateral: false }, |stack, _| {
                assert!(stack.resolve_alias(&Ident::new("a")).is_err());
                assert!(stack.resolve_alias(&Ident::new("x")).is_ok());
                Ok(())
            })
            .unwrap();

        stack
            .with_child(ScopeKind::Derived { lateral: true }, |stack, _| {
                assert!(stack.resolve_alias(&Ident::new("a")).is_ok());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_derived_in_join_group_hides_outer_chain() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        stack.register_alias(outer, Ident::new("x"), table("t")).unwrap();
        let stmt = stack.push(ScopeKind::Subquery);
        stack.register_alias(stmt, Ident::new("a"), table("t")).unwrap();
        let group = stack.push(ScopeKind::NestedJoin);
        stack.register_alias(group, Ident::new("b"), table("u")).unwrap();
        stack.push(ScopeKind::NestedJoin);

        stack
            .with_child(ScopeKind::Derived { lateral: false }, |stack, _| {
                assert!(stack.resolve_alias(&Ident::new("b")).is_err());
                assert!(stack.resolve_alias(&Ident::new("a")).is_err());
                assert!(stack.resolve_alias(&Ident::new("x")).is_ok());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_child_popped_on_error() {
        let mut stack = ContextStack::new();
        stack.push(ScopeKind::Statement);
        let result: BuildResult<()> = stack.with_child(ScopeKind::Subquery, |_, _| {
            Err(BuildError::UnknownAlias { alias: "z".into() })
        });
        assert!(result.is_err());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_merging_child_moves_aliases_up() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        stack.register_alias(outer, Ident::new("a"), table("t")).unwrap();

        stack
            .with_child_merging(ScopeKind::NestedJoin, |stack, id| {
                stack.register_alias(id, Ident::new("b"), table("u"))
            })
            .unwrap();
        assert!(stack.active().unwrap().alias(&Ident::new("b")).is_some());

        let dup = stack.with_child_merging(ScopeKind::NestedJoin, |stack, id| {
            stack.register_alias(id, Ident::new("a"), table("v"))
        });
        assert_eq!(
            dup,
            Err(BuildError::DuplicateAlias { alias: "a".into() })
        );
    }

    #[test]
    fn test_cte_resolution_and_self_reference() {
        let mut stack = ContextStack::new();
        let outer = stack.push(ScopeKind::Statement);
        let name = Ident::new("c");

        let err = stack
            .with_child(
                ScopeKind::CteBody {
                    name: name.clone(),
                    recursive: false,
                },
                |stack, _| stack.resolve_cte(&name).map(|_| ()),
            )
            .unwrap_err();
        assert_eq!(err, BuildError::RecursiveSelfReference { name: "c".into() });

        stack
            .register_cte(
                outer,
                CteInfo {
                    name: name.clone(),
                    columns: vec![],
                    placeholder: false,
                },
            )
            .unwrap();
        assert!(stack.resolve_cte(&name).is_ok());
        assert!(matches!(
            stack.resolve_cte(&Ident::new("d")),
            Err(BuildError::UnknownCte { .. })
        ));
    }

    #[test]
    fn test_retired_cte_no_longer_resolves() {
        let mut stack = ContextStack::new();
        let scope = stack.push(ScopeKind::Statement);
        for name in ["c", "d"] {
            stack
                .register_cte(
                    scope,
                    CteInfo {
                        name: Ident::new(name),
                        columns: vec![],
                        placeholder: false,
                    },
                )
                .unwrap();
        }

        stack.retire_ctes(scope, [&Ident::new("c")]).unwrap();
        assert!(matches!(
            stack.resolve_cte(&Ident::new("c")),
            Err(BuildError::UnknownCte { .. })
        ));
        assert!(stack.resolve_cte(&Ident::new("d")).is_ok());
    }

    #[test]
    fn test_metadata_checks_columns() {
        let catalog = InMemoryCatalog::new().with_table("users", vec!["id", "name"]);
        let mut stack = ContextStack::with_metadata(Some(Arc::new(catalog)));
        let scope = stack.push(ScopeKind::Statement);

        let columns = stack.table_columns(&TableRef::new("users")).unwrap();
        stack
            .register_alias(
                scope,
                Ident::new("u"),
                AliasTarget::Table {
                    table: TableRef::new("users"),
                    columns,
                },
            )
            .unwrap();

        assert!(stack.check_expr(&Expr::qualified_column("u", "name")).is_ok());
        assert_eq!(
            stack.check_expr(&Expr::qualified_column("u", "email")),
            Err(BuildError::UnknownColumn {
                alias: "u".into(),
                column: "email".into()
            })
        );
        assert!(matches!(
            stack.table_columns(&TableRef::new("orders")),
            Err(BuildError::UnknownTable { .. })
        ));
    }
}
