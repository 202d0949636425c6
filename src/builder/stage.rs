//! Stage markers and capability traits
//!
//! A builder's stage is a zero-sized type parameter. Each clause method is
//! implemented only for the stages from which that clause may legally
//! follow, so an out-of-order call does not compile.

mod sealed {
    pub trait Sealed {}
}

/// Implemented by every stage marker
pub trait Stage: sealed::Sealed {}

macro_rules! stages {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;
            impl sealed::Sealed for $name {}
            impl Stage for $name {}
        )*
    };
}

macro_rules! capability {
    ($(#[$doc:meta])* $trait:ident: $($stage:ident),+ $(,)?) => {
        $(#[$doc])*
        pub trait $trait: Stage {}
        $(impl $trait for $stage {})+
    };
}

stages! {
    /// Nothing recorded yet
    Start,
    /// WITH clause recorded
    WithDone,
    /// Select list recorded
    Projected,
    /// A base table was just added; index hints and partitions may follow
    FromTable,
    /// A predicate join to a base table awaits ON/USING
    JoinTableOn,
    /// A predicate join to a derived table, CTE or group awaits ON/USING
    JoinOn,
    /// The last block is complete
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled,
    Limited,
    Locked,
    /// `into @var, ...` recorded
    IntoVars,

    /// Composite or bracketed query, no trailing clauses yet
    SetOpen,
    SetOrdered,
    SetLimited,

    InsertTarget,
    InsertColumns,
    InsertRows,
    InsertAssigned,
    InsertSelected,
    InsertDuplicate,

    /// SET list of an UPDATE
    Assigned,

    /// Single-table DELETE target
    DeleteTarget,
    /// Multi-table DELETE, target list recorded
    DeleteTargets,
}

capability!(
    /// Another block may be joined
    CanJoin: FromTable, Joined
);

capability!(
    /// Index hints and partitions attach to the last base table
    CanIndexHint: FromTable, JoinTableOn, DeleteTarget
);

capability!(
    /// ON / USING completes the pending join
    CanOn: JoinTableOn, JoinOn
);

capability!(
    /// Optimizer hints and modifiers before the select list
    CanPreface: Start, WithDone
);

capability!(
    /// The select list may be extended
    CanProject: Start, WithDone, Projected
);

capability!(CanWhere: FromTable, Joined);

capability!(CanGroupBy: FromTable, Joined, Filtered);

capability!(CanHaving: Grouped, GroupRolled);

capability!(
    CanWindow: FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed
);

capability!(
    /// No trailing clause yet, so the query may still be a set-operation operand
    CanSetOp: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed
);

capability!(
    CanOrderBy: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed
);

capability!(
    CanLimit: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled
);

capability!(
    /// A later lock clause replaces an earlier one
    CanLock: FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled,
    Limited,
    Locked
);

capability!(
    CanInto: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled,
    Limited,
    Locked
);

capability!(
    /// The query may be wrapped in parentheses
    CanBracket: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled,
    Limited,
    Locked
);

capability!(
    /// The statement is complete enough to finalize
    CanFinish: Projected,
    FromTable,
    Joined,
    Filtered,
    Grouped,
    GroupRolled,
    Having,
    Windowed,
    Ordered,
    OrderRolled,
    Limited,
    Locked,
    IntoVars
);

capability!(CanSetCombine: SetOpen);

capability!(CanSetFinish: SetOpen, SetOrdered, SetLimited);

capability!(CanInsertSource: InsertTarget, InsertColumns);

capability!(CanOnDuplicate: InsertRows, InsertAssigned, InsertSelected);

capability!(
    CanInsertFinish: InsertRows,
    InsertAssigned,
    InsertSelected,
    InsertDuplicate
);

capability!(
    /// The SET list of an UPDATE may start
    CanSet: FromTable, Joined
);

capability!(CanUpdateOrder: Assigned, Filtered);

capability!(CanUpdateLimit: Assigned, Filtered, Ordered);

capability!(
    CanUpdateFinish: Assigned,
    Filtered,
    Ordered,
    Limited
);

capability!(CanDeleteWhere: DeleteTarget, FromTable, Joined);

capability!(CanDeleteOrder: DeleteTarget, Filtered);

capability!(CanDeleteLimit: DeleteTarget, Filtered, Ordered);

capability!(
    CanDeleteFinish: DeleteTarget,
    FromTable,
    Joined,
    Filtered,
    Ordered,
    Limited
);
