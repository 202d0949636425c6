//! WITH clause construction
//!
//! Each CTE body is built in a child scope of the statement. A finished
//! CTE is registered in the statement scope, so later CTEs and the main
//! query can reference it and earlier CTEs cannot. Inside a RECURSIVE
//! clause the CTE's own name is visible within its body.

use super::accumulator::StatementKind;
use super::context::{ContextStack, CteInfo, ScopeId, ScopeKind};
use super::core::StatementBuilder;
use super::query::SelectBuilder;
use super::stage::Start;
use crate::ast::{Cte, Ident, Query, WithClause};
use crate::error::{BuildError, BuildResult};
use tracing::debug;

/// Collects the CTEs of one WITH clause
pub struct WithBuilder<'a> {
    stack: &'a mut ContextStack,
    scope: ScopeId,
    recursive: bool,
    ctes: Vec<Cte>,
}

impl<'a> WithBuilder<'a> {
    fn new(stack: &'a mut ContextStack, scope: ScopeId, recursive: bool) -> Self {
        Self {
            stack,
            scope,
            recursive,
            ctes: Vec::new(),
        }
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn len(&self) -> usize {
        self.ctes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctes.is_empty()
    }

    /// Declare a CTE; its body follows with [`CteDeclaration::as_query`].
    pub fn cte(&mut self, name: impl Into<Ident>) -> BuildResult<CteDeclaration<'_, 'a>> {
        let name = name.into();
        self.stack.assert_active(self.scope)?;
        if self.stack.has_local_cte(self.scope, &name) || self.ctes.iter().any(|c| c.name == name)
        {
            return Err(BuildError::DuplicateCteName {
                name: name.to_string(),
            });
        }
        Ok(CteDeclaration {
            with: self,
            name,
            columns: Vec::new(),
        })
    }

    fn finish(self) -> BuildResult<WithClause> {
        if self.ctes.is_empty() {
            return Err(BuildError::EmptyClauseList { clause: "with" });
        }
        Ok(WithClause {
            recursive: self.recursive,
            ctes: self.ctes,
        })
    }
}

/// A declared CTE awaiting its body
pub struct CteDeclaration<'w, 'a> {
    with: &'w mut WithBuilder<'a>,
    name: Ident,
    columns: Vec<Ident>,
}

impl CteDeclaration<'_, '_> {
    /// `name(col, ...)`
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Build the body in a child scope and register the CTE.
    pub fn as_query<F>(self, f: F) -> BuildResult<()>
    where
        F: FnOnce(SelectBuilder<'_, Start>) -> BuildResult<Query>,
    {
        let Self {
            with,
            name,
            columns,
        } = self;
        let recursive = with.recursive;
        let kind = ScopeKind::CteBody {
            name: name.clone(),
            recursive,
        };
        let placeholder = CteInfo {
            name: name.clone(),
            columns: columns.clone(),
            placeholder: true,
        };

        let query = with.stack.with_child(kind, |stack, id| {
            if recursive {
                stack.register_cte(id, placeholder)?;
            }
            f(StatementBuilder::nested_in(stack, id))
        })?;

        with.stack.register_cte(
            with.scope,
            CteInfo {
                name: name.clone(),
                columns: columns.clone(),
                placeholder: false,
            },
        )?;
        debug!(cte = %name, recursive, columns = columns.len(), "cte declared");
        with.ctes.push(Cte {
            name,
            columns,
            query: Box::new(query),
        });
        Ok(())
    }
}

impl<K: StatementKind, S> StatementBuilder<'_, K, S> {
    pub(crate) fn build_with<F>(&mut self, recursive: bool, f: F) -> BuildResult<WithClause>
    where
        F: FnOnce(&mut WithBuilder<'_>) -> BuildResult<()>,
    {
        self.ensure_active()?;
        let scope = self.scope;
        let mut with = WithBuilder::new(&mut *self.stack, scope, recursive);
        f(&mut with)?;
        with.finish()
    }
}
