//! Error types for statement construction
//!
//! Every failure the builder can report is a variant of [`BuildError`].
//! None of them are recoverable for the statement being built: the caller
//! discards the builder and starts over.

use crate::builder::ScopeId;
use thiserror::Error;

/// Broad classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller used the API out of contract (stale scope, frozen statement, ...).
    ContractViolation,
    /// A name did not resolve, or was declared twice.
    MissingReference,
    /// A required list, predicate or parameter set is absent.
    Incomplete,
    /// The target dialect cannot express a recorded construct.
    DialectIncompatible,
}

/// Primary error type for statement construction and rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    // === Contract violations ===
    /// A builder tried to mutate a scope that is no longer the active one.
    #[error("stale context: scope {expected} is not active (active scope: {active:?})")]
    StaleContext {
        expected: ScopeId,
        active: Option<ScopeId>,
    },

    /// `pop` was called on an empty context stack.
    #[error("context stack underflow")]
    ScopeUnderflow,

    /// `prepare` was called twice without an intervening `clear`.
    #[error("{kind} statement is already prepared")]
    AlreadyPrepared { kind: &'static str },

    /// A mutation reached a prepared statement.
    #[error("{kind} statement is prepared; mutation rejected")]
    StatementFrozen { kind: &'static str },

    /// A clause was requested in a position the grammar does not allow.
    #[error("{clause} is not legal here: {detail}")]
    StageViolation {
        clause: &'static str,
        detail: String,
    },

    /// A parameter list was handed to a statement that was not opened in batch mode.
    #[error("{kind} statement is not a batch statement")]
    NotBatchStatement { kind: &'static str },

    /// `clear` was called on a statement that cannot be reused.
    #[error("{kind} statement does not support clear()")]
    ClearNotSupported { kind: &'static str },

    // === Missing or ambiguous references ===
    /// No visible scope declares this alias.
    #[error("unknown table alias: {alias}")]
    UnknownAlias { alias: String },

    /// No visible WITH clause declares this name.
    #[error("unknown common table expression: {name}")]
    UnknownCte { name: String },

    /// The current WITH list already declares this name.
    #[error("duplicate common table expression name: {name}")]
    DuplicateCteName { name: String },

    /// The current scope already binds this alias.
    #[error("duplicate table alias: {alias}")]
    DuplicateAlias { alias: String },

    /// The metadata provider does not know this table.
    #[error("no such table: {table}")]
    UnknownTable { table: String },

    /// The aliased table has no such column.
    #[error("no such column: {alias}.{column}")]
    UnknownColumn { alias: String, column: String },

    /// A non-recursive CTE referenced itself.
    #[error("common table expression {name} references itself but WITH is not RECURSIVE")]
    RecursiveSelfReference { name: String },

    // === Structural incompleteness ===
    /// A clause that needs at least one entry got none.
    #[error("{clause} clause requires at least one entry")]
    EmptyClauseList { clause: &'static str },

    /// A join that needs ON/USING was left without one.
    #[error("{join} {alias} is missing its ON/USING predicate")]
    MissingJoinPredicate { join: &'static str, alias: String },

    /// ON/USING was attached to a join that does not take one.
    #[error("{clause} is not allowed on {join}")]
    IllegalClauseForJoinKind {
        clause: &'static str,
        join: &'static str,
    },

    /// An INSERT mixed VALUES rows, SET assignments and a sub-select.
    #[error("insert already uses {existing}; cannot add {attempted}")]
    ConflictingInsertMode {
        existing: &'static str,
        attempted: &'static str,
    },

    /// An INSERT reached finalization without any row source.
    #[error("insert has no VALUES, SET or SELECT source")]
    MissingInsertMode,

    /// A batch statement reached finalization without a parameter list.
    #[error("batch {kind} statement has no parameter list")]
    MissingBatchParams { kind: &'static str },

    /// A batch row lacks a value for a named parameter.
    #[error("batch row {row} has no value for parameter :{name}")]
    MissingBatchParam { name: String, row: usize },

    /// A VALUES row does not match the column list.
    #[error("VALUES row {row} has {actual} values, expected {expected}")]
    ColumnCountMismatch {
        expected: usize,
        actual: usize,
        row: usize,
    },

    // === Dialect incompatibility ===
    /// The renderer's dialect cannot express a construct recorded in the AST.
    #[error("{feature} is not supported by {dialect}")]
    DialectUnsupported { feature: String, dialect: String },
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StaleContext { .. }
            | Self::ScopeUnderflow
            | Self::AlreadyPrepared { .. }
            | Self::StatementFrozen { .. }
            | Self::StageViolation { .. }
            | Self::NotBatchStatement { .. }
            | Self::ClearNotSupported { .. } => ErrorKind::ContractViolation,

            Self::UnknownAlias { .. }
            | Self::UnknownCte { .. }
            | Self::DuplicateCteName { .. }
            | Self::DuplicateAlias { .. }
            | Self::UnknownTable { .. }
            | Self::UnknownColumn { .. }
            | Self::RecursiveSelfReference { .. } => ErrorKind::MissingReference,

            Self::EmptyClauseList { .. }
            | Self::MissingJoinPredicate { .. }
            | Self::IllegalClauseForJoinKind { .. }
            | Self::ConflictingInsertMode { .. }
            | Self::MissingInsertMode
            | Self::MissingBatchParams { .. }
            | Self::MissingBatchParam { .. }
            | Self::ColumnCountMismatch { .. } => ErrorKind::Incomplete,

            Self::DialectUnsupported { .. } => ErrorKind::DialectIncompatible,
        }
    }

    /// True when the error signals API misuse rather than bad statement content.
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == ErrorKind::ContractViolation
    }

    pub(crate) fn stage(clause: &'static str, detail: impl Into<String>) -> Self {
        Self::StageViolation {
            clause,
            detail: detail.into(),
        }
    }

    pub(crate) fn unsupported(feature: impl Into<String>, dialect: impl ToString) -> Self {
        Self::DialectUnsupported {
            feature: feature.into(),
            dialect: dialect.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BuildError::UnknownCte { name: "c".into() }.kind(),
            ErrorKind::MissingReference
        );
        assert_eq!(
            BuildError::EmptyClauseList { clause: "ORDER BY" }.kind(),
            ErrorKind::Incomplete
        );
        assert!(BuildError::AlreadyPrepared { kind: "query" }.is_contract_violation());
        assert!(!BuildError::MissingInsertMode.is_contract_violation());
    }

    #[test]
    fn test_error_messages_carry_names() {
        let err = BuildError::UnknownAlias {
            alias: "ghost".into(),
        };
        assert_eq!(err.to_string(), "unknown table alias: ghost");

        let err = BuildError::MissingJoinPredicate {
            join: "left join",
            alias: "o".into(),
        };
        assert!(err.to_string().contains("left join o"));
    }
}
