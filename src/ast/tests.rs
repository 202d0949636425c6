//! Tests for the AST module
//!
//! These tests construct nodes directly and check the SQL the reference
//! renderer produces for them, per dialect.

use super::*;
use crate::dialect::Dialect;
use crate::error::BuildError;

fn mysql(expr: &Expr) -> String {
    render_expr(expr, Dialect::mysql8()).unwrap()
}

fn block(join: JoinKind, table: &str, alias: &str) -> TabularBlock {
    TabularBlock::new(
        join,
        TabularItem::Table(TableRef::new(table)),
        Some(Ident::new(alias)),
    )
}

fn sql_of(stmt: Stmt, dialect: Dialect) -> String {
    render(&stmt, dialect).unwrap().0
}

fn select_int(n: i64) -> Query {
    Query::simple(SelectStmt::columns(vec![Expr::int(n).into()]))
}

mod expr_tests {
    use super::*;

    #[test]
    fn test_column_expressions() {
        assert_eq!(mysql(&Expr::column("id")), "`id`");
        assert_eq!(mysql(&Expr::qualified_column("users", "email")), "`users`.`email`");
        assert_eq!(
            render_expr(&Expr::qualified_column("users", "email"), Dialect::Standard).unwrap(),
            "\"users\".\"email\""
        );
    }

    #[test]
    fn test_literal_expressions() {
        assert_eq!(mysql(&Expr::null()), "null");
        assert_eq!(mysql(&Expr::bool(true)), "true");
        assert_eq!(mysql(&Expr::bool(false)), "false");
        assert_eq!(mysql(&Expr::int(42)), "42");
        assert_eq!(mysql(&Expr::int(-100)), "-100");
        assert_eq!(mysql(&Expr::Literal(Literal::Float(1.5))), "1.5");
        assert_eq!(mysql(&Expr::string("hello")), "'hello'");
        assert_eq!(mysql(&Expr::default_value()), "default");
    }

    #[test]
    fn test_values_never_inlined() {
        assert_eq!(mysql(&Expr::value("x'; drop table t; --")), "?");
        assert_eq!(mysql(&Expr::param("id")), "?");
    }

    #[test]
    fn test_same_precedence_on_right_is_parenthesized() {
        let expr = Expr::binary(
            Expr::column("a"),
            BinaryOperator::Sub,
            Expr::binary(Expr::column("b"), BinaryOperator::Sub, Expr::column("c")),
        );
        assert_eq!(mysql(&expr), "`a` - (`b` - `c`)");

        let expr = Expr::binary(
            Expr::binary(Expr::column("a"), BinaryOperator::Sub, Expr::column("b")),
            BinaryOperator::Sub,
            Expr::column("c"),
        );
        assert_eq!(mysql(&expr), "`a` - `b` - `c`");
    }

    #[test]
    fn test_looser_operand_is_parenthesized() {
        let expr = Expr::binary(
            Expr::binary(Expr::column("a"), BinaryOperator::Add, Expr::column("b")),
            BinaryOperator::Mul,
            Expr::column("c"),
        );
        assert_eq!(mysql(&expr), "(`a` + `b`) * `c`");

        // and binds tighter than or: no parentheses needed
        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)))
            .or(Expr::column("c").eq(Expr::int(3)));
        assert_eq!(mysql(&expr), "`a` = 1 and `b` = 2 or `c` = 3");
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            mysql(&Expr::not(Expr::column("a").eq(Expr::int(1)))),
            "not (`a` = 1)"
        );
        let neg = Expr::UnaryOp {
            op: UnaryOperator::Neg,
            expr: Box::new(Expr::column("x")),
        };
        assert_eq!(mysql(&neg), "-(`x`)");
    }

    #[test]
    fn test_predicates() {
        assert_eq!(mysql(&Expr::is_null(Expr::column("a"))), "`a` is null");
        assert_eq!(mysql(&Expr::is_not_null(Expr::column("a"))), "`a` is not null");
        assert_eq!(
            mysql(&Expr::column("a").between(Expr::int(1), Expr::int(10))),
            "`a` between 1 and 10"
        );
        assert_eq!(
            mysql(&Expr::column("a").in_list(vec![Expr::int(1), Expr::int(2)])),
            "`a` in (1, 2)"
        );
        assert_eq!(
            mysql(&Expr::column("name").like(Expr::string("a%"))),
            "`name` like 'a%'"
        );
    }

    #[test]
    fn test_row_constructor_in_list() {
        let expr = Expr::Row(vec![Expr::column("a"), Expr::column("b")])
            .in_list(vec![Expr::Row(vec![Expr::int(1), Expr::int(2)])]);
        assert_eq!(mysql(&expr), "(`a`, `b`) in ((1, 2))");
    }

    #[test]
    fn test_function_calls() {
        let call = FunctionCall::new("count", vec![Expr::column("a")]).with_distinct();
        assert_eq!(mysql(&Expr::Function(call)), "count(distinct `a`)");

        // Names outside [A-Za-z0-9_] are quoted
        let call = Expr::function("my-fn", vec![Expr::int(1)]);
        assert_eq!(mysql(&call), "`my-fn`(1)");

        let coalesce = Expr::function("coalesce", vec![Expr::column("a"), Expr::int(0)]);
        assert_eq!(mysql(&coalesce), "coalesce(`a`, 0)");
    }

    #[test]
    fn test_simple_case() {
        let case = CaseExpr::simple(
            Expr::column("kind"),
            vec![(Expr::int(1), Expr::string("one"))],
            None,
        );
        assert_eq!(mysql(&Expr::Case(case)), "case `kind` when 1 then 'one' end");
    }

    #[test]
    fn test_window_frame() {
        let expr = Expr::Function(FunctionCall::new("sum", vec![Expr::column("x")]).over(
            WindowSpec::new()
                .with_order_by(vec![OrderByExpr::asc(Expr::column("d"))])
                .with_frame(WindowFrame {
                    units: FrameUnits::Rows,
                    start: FrameBound::UnboundedPreceding,
                    end: Some(FrameBound::CurrentRow),
                }),
        ));
        assert_eq!(
            mysql(&expr),
            "sum(`x`) over (order by `d` asc rows between unbounded preceding and current row)"
        );

        let named = Expr::Function(FunctionCall::new("rank", vec![]).over_window("w"));
        assert_eq!(mysql(&named), "rank() over `w`");
    }

    #[test]
    fn test_subquery_expressions() {
        let sub = Query::simple(
            SelectStmt::columns(vec![Expr::column("id").into()])
                .with_from(vec![block(JoinKind::None, "t", "t")]),
        );
        assert_eq!(
            mysql(&Expr::column("a").in_subquery(sub.clone())),
            "`a` in (select `id` from `t` as `t`)"
        );
        assert_eq!(mysql(&Expr::exists(select_int(1))), "exists (select 1)");
        assert_eq!(mysql(&Expr::scalar(sub)), "(select `id` from `t` as `t`)");
    }

    #[test]
    fn test_visit_columns_reaches_nested_operands() {
        let expr = Expr::qualified_column("a", "x")
            .eq(Expr::int(1))
            .and(Expr::function("lower", vec![Expr::qualified_column("b", "y")]).eq(Expr::string("z")));
        let mut seen = Vec::new();
        expr.visit_columns(&mut |c| seen.push(c.column.to_string()));
        assert_eq!(seen, vec!["x", "y"]);
    }
}

mod stmt_tests {
    use super::*;

    #[test]
    fn test_select_with_join_and_using() {
        let stmt = SelectStmt::columns(vec![SelectColumn::qualified_star("a")]).with_from(vec![
            block(JoinKind::None, "t", "a"),
            TabularBlock {
                constraint: Some(JoinConstraint::Using(vec![Ident::new("id")])),
                ..block(JoinKind::Join, "u", "b")
            },
        ]);
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select `a`.* from `t` as `a` join `u` as `b` using (`id`)"
        );
    }

    #[test]
    fn test_limit_offset_per_dialect() {
        let stmt = SelectStmt {
            columns: vec![SelectColumn::star()],
            from: vec![block(JoinKind::None, "t", "t")],
            limit: Some(Limit::with_offset(20, 10)),
            ..Default::default()
        };
        let q = Stmt::Query(Query::simple(stmt));
        assert!(sql_of(q.clone(), Dialect::mysql8()).ends_with("limit 20, 10"));
        assert!(sql_of(q, Dialect::Standard).ends_with("limit 10 offset 20"));
    }

    #[test]
    fn test_select_modifiers_and_hints() {
        let stmt = SelectStmt {
            hints: vec![Hint::new("MAX_EXECUTION_TIME(1000)")],
            modifiers: vec![SelectModifier::Distinct, SelectModifier::SqlNoCache],
            columns: vec![Expr::column("a").into()],
            from: vec![block(JoinKind::None, "t", "t")],
            ..Default::default()
        };
        let q = Stmt::Query(Query::simple(stmt));
        assert_eq!(
            sql_of(q.clone(), Dialect::mysql8()),
            "select /*+ MAX_EXECUTION_TIME(1000) */ distinct sql_no_cache `a` from `t` as `t`"
        );
        assert!(matches!(
            render(&q, Dialect::Standard),
            Err(BuildError::DialectUnsupported { .. })
        ));
    }

    #[test]
    fn test_hint_text_cannot_close_comment() {
        for text in ["BKA(t) */ ; delete from t", "BKA(t) **// ; delete from t; /*"] {
            let stmt = SelectStmt {
                hints: vec![Hint::new(text)],
                columns: vec![Expr::int(1).into()],
                ..Default::default()
            };
            let q = Stmt::Query(Query::simple(stmt));
            assert!(matches!(
                render(&q, Dialect::mysql8()),
                Err(BuildError::StageViolation {
                    clause: "optimizer hints",
                    ..
                })
            ));
        }

        let stmt = SelectStmt {
            hints: vec![Hint::new("BKA(t)"), Hint::new("NO_ICP(t)")],
            columns: vec![Expr::int(1).into()],
            ..Default::default()
        };
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select /*+ BKA(t) NO_ICP(t) */ 1"
        );
    }

    #[test]
    fn test_partition_and_index_hints() {
        let mut t = block(JoinKind::None, "t", "a");
        t.partitions = vec![Ident::new("p0")];
        t.index_hints = vec![IndexHint {
            action: IndexHintAction::Force,
            scope: Some(IndexHintScope::Join),
            indexes: vec![Ident::new("idx_a")],
        }];
        let stmt = SelectStmt::columns(vec![SelectColumn::star()]).with_from(vec![t]);
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select * from `t` partition (`p0`) as `a` force index for join (`idx_a`)"
        );
    }

    #[test]
    fn test_full_join_rejected_on_mysql() {
        let stmt = SelectStmt::columns(vec![SelectColumn::star()]).with_from(vec![
            block(JoinKind::None, "t", "a"),
            block(JoinKind::Full, "u", "b").with_on(vec![Expr::bool(true)]),
        ]);
        let q = Stmt::Query(Query::simple(stmt));
        assert!(matches!(
            render(&q, Dialect::mysql8()),
            Err(BuildError::DialectUnsupported { .. })
        ));
        assert_eq!(
            sql_of(q, Dialect::Standard),
            "select * from \"t\" as \"a\" full join \"u\" as \"b\" on true"
        );
    }

    #[test]
    fn test_nested_join_group() {
        let group = NestedJoin {
            blocks: vec![
                block(JoinKind::None, "b", "b"),
                block(JoinKind::Join, "c", "c").with_on(vec![
                    Expr::qualified_column("c", "b_id").eq(Expr::qualified_column("b", "id")),
                ]),
            ],
        };
        let stmt = SelectStmt::columns(vec![SelectColumn::star()]).with_from(vec![
            block(JoinKind::None, "a", "a"),
            TabularBlock::new(JoinKind::Left, TabularItem::Nested(group), None).with_on(vec![
                Expr::qualified_column("b", "a_id").eq(Expr::qualified_column("a", "id")),
            ]),
        ]);
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select * from `a` as `a` left join (`b` as `b` join `c` as `c` on `c`.`b_id` = `b`.`id`) \
             on `b`.`a_id` = `a`.`id`"
        );
    }

    #[test]
    fn test_lock_clause() {
        let stmt = SelectStmt {
            columns: vec![SelectColumn::star()],
            from: vec![block(JoinKind::None, "t", "t")],
            lock: Some(LockClause {
                strength: LockStrength::ForUpdate,
                of: vec![Ident::new("t")],
                wait: Some(LockWait::SkipLocked),
            }),
            ..Default::default()
        };
        let q = Stmt::Query(Query::simple(stmt));
        assert!(sql_of(q.clone(), Dialect::mysql8()).ends_with("for update of `t` skip locked"));
        assert!(matches!(
            render(&q, Dialect::mysql57()),
            Err(BuildError::DialectUnsupported { .. })
        ));
    }

    #[test]
    fn test_select_into_variables() {
        let stmt = SelectStmt {
            columns: vec![Expr::count_star().into()],
            from: vec![block(JoinKind::None, "t", "t")],
            into_vars: vec![Ident::new("n")],
            ..Default::default()
        };
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select count(*) into @`n` from `t` as `t`"
        );
    }

    #[test]
    fn test_group_by_rollup_having_window() {
        let stmt = SelectStmt {
            columns: vec![Expr::column("a").into(), Expr::count_star().into()],
            from: vec![block(JoinKind::None, "t", "t")],
            group_by: vec![OrderByExpr::new(Expr::column("a"))],
            group_with_rollup: true,
            having: vec![Expr::count_star().gt(Expr::int(1))],
            windows: vec![NamedWindow {
                name: Ident::new("w"),
                spec: WindowSpec::new().with_partition_by(vec![Expr::column("a")]),
            }],
            ..Default::default()
        };
        assert_eq!(
            sql_of(Stmt::Query(Query::simple(stmt)), Dialect::mysql8()),
            "select `a`, count(*) from `t` as `t` group by `a` with rollup \
             having count(*) > 1 window `w` as (partition by `a`)"
        );
    }

    #[test]
    fn test_insert_values() {
        let mut insert = InsertStmt {
            table: Some("t".into()),
            columns: vec![Ident::new("a"), Ident::new("b")],
            ..Default::default()
        };
        insert.push_row(vec![Expr::int(1), Expr::value("x")]).unwrap();
        insert.push_row(vec![Expr::int(2), Expr::default_value()]).unwrap();
        let (sql, params) = render(&Stmt::Insert(insert), Dialect::mysql8()).unwrap();
        assert_eq!(sql, "insert into `t` (`a`, `b`) values (1, ?), (2, default)");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_insert_set_and_on_duplicate() {
        let mut insert = InsertStmt {
            table: Some("db.t".into()),
            modifiers: vec![InsertModifier::Ignore],
            on_duplicate: vec![Assignment::new(
                "n",
                Expr::binary(Expr::column("n"), BinaryOperator::Add, Expr::int(1)),
            )],
            ..Default::default()
        };
        insert.push_assignment(Assignment::new("id", Expr::int(1))).unwrap();
        let stmt = Stmt::Insert(insert);
        assert_eq!(
            sql_of(stmt.clone(), Dialect::mysql8()),
            "insert ignore into `db`.`t` set `id` = 1 on duplicate key update `n` = `n` + 1"
        );
        assert!(matches!(
            render(&stmt, Dialect::Standard),
            Err(BuildError::DialectUnsupported { .. })
        ));
    }

    #[test]
    fn test_replace_from_select() {
        let mut insert = InsertStmt {
            verb: InsertVerb::Replace,
            table: Some("t".into()),
            columns: vec![Ident::new("a")],
            ..Default::default()
        };
        insert.set_query(select_int(1)).unwrap();
        assert!(insert.validate().is_ok());
        assert_eq!(
            sql_of(Stmt::Insert(insert), Dialect::mysql8()),
            "replace into `t` (`a`) select 1"
        );
    }

    #[test]
    fn test_replace_rejects_on_duplicate() {
        let mut insert = InsertStmt {
            verb: InsertVerb::Replace,
            table: Some("t".into()),
            on_duplicate: vec![Assignment::new("a", Expr::int(1))],
            ..Default::default()
        };
        insert.push_row(vec![Expr::int(1)]).unwrap();
        assert!(matches!(
            insert.validate(),
            Err(BuildError::StageViolation { .. })
        ));
    }

    #[test]
    fn test_multi_table_update() {
        let stmt = UpdateStmt {
            tables: vec![
                block(JoinKind::None, "t", "a"),
                block(JoinKind::Join, "u", "b").with_on(vec![
                    Expr::qualified_column("b", "id").eq(Expr::qualified_column("a", "id")),
                ]),
            ],
            assignments: vec![Assignment::new("a.x", Expr::qualified_column("b", "x"))],
            where_clause: vec![Expr::qualified_column("b", "flag").eq(Expr::bool(true))],
            ..Default::default()
        };
        assert!(stmt.validate().is_ok());
        assert_eq!(
            sql_of(Stmt::Update(stmt.clone()), Dialect::mysql8()),
            "update `t` as `a` join `u` as `b` on `b`.`id` = `a`.`id` \
             set `a`.`x` = `b`.`x` where `b`.`flag` = true"
        );

        let limited = UpdateStmt {
            limit: Some(Limit::new(1)),
            ..stmt
        };
        assert!(limited.validate().is_err());
    }

    #[test]
    fn test_nested_group_update_is_multi_table() {
        let group = NestedJoin {
            blocks: vec![
                block(JoinKind::None, "t", "a"),
                block(JoinKind::Join, "u", "b").with_on(vec![
                    Expr::qualified_column("b", "id").eq(Expr::qualified_column("a", "id")),
                ]),
            ],
        };
        let stmt = UpdateStmt {
            tables: vec![TabularBlock::new(
                JoinKind::None,
                TabularItem::Nested(group),
                None,
            )],
            assignments: vec![Assignment::new("a.x", Expr::int(1))],
            ..Default::default()
        };
        assert!(stmt.is_multi_table());
        assert!(stmt.validate().is_ok());

        let ordered = UpdateStmt {
            order_by: vec![OrderByExpr::new(Expr::qualified_column("a", "id"))],
            limit: Some(Limit::new(1)),
            ..stmt
        };
        assert!(matches!(
            ordered.validate(),
            Err(BuildError::StageViolation { .. })
        ));

        let single = UpdateStmt {
            tables: vec![block(JoinKind::None, "t", "a")],
            limit: Some(Limit::new(1)),
            ..Default::default()
        };
        assert!(!single.is_multi_table());
    }

    #[test]
    fn test_single_table_delete() {
        let stmt = DeleteStmt {
            from: vec![TabularBlock::new(
                JoinKind::None,
                TabularItem::Table(TableRef::new("t")),
                None,
            )],
            where_clause: vec![Expr::column("id").lt(Expr::int(100))],
            order_by: vec![OrderByExpr::new(Expr::column("id"))],
            limit: Some(Limit::new(10)),
            ..Default::default()
        };
        let q = Stmt::Delete(stmt);
        assert_eq!(
            sql_of(q.clone(), Dialect::mysql8()),
            "delete from `t` where `id` < 100 order by `id` limit 10"
        );
        assert!(render(&q, Dialect::Standard).is_err());
    }

    #[test]
    fn test_multi_table_delete_targets_must_be_bound() {
        let mut stmt = DeleteStmt {
            targets: vec![Ident::new("a")],
            from: vec![
                block(JoinKind::None, "t", "a"),
                block(JoinKind::Left, "u", "b").with_on(vec![
                    Expr::qualified_column("b", "a_id").eq(Expr::qualified_column("a", "id")),
                ]),
            ],
            where_clause: vec![Expr::is_null(Expr::qualified_column("b", "id"))],
            ..Default::default()
        };
        assert!(stmt.validate().is_ok());
        assert_eq!(
            sql_of(Stmt::Delete(stmt.clone()), Dialect::mysql8()),
            "delete `a` from `t` as `a` left join `u` as `b` on `b`.`a_id` = `a`.`id` \
             where `b`.`id` is null"
        );

        stmt.targets.push(Ident::new("zz"));
        assert_eq!(
            stmt.validate(),
            Err(BuildError::UnknownAlias { alias: "zz".into() })
        );
    }
}

mod set_op_tests {
    use super::*;

    #[test]
    fn test_union_chain_is_left_deep() {
        let q = Query::compose(
            Query::compose(select_int(1), SetOperator::Union, select_int(2)),
            SetOperator::UnionAll,
            select_int(3),
        );
        assert_eq!(
            sql_of(Stmt::Query(q), Dialect::mysql8()),
            "select 1 union select 2 union all select 3"
        );
    }

    #[test]
    fn test_right_composite_is_bracketed() {
        let q = Query::compose(
            select_int(1),
            SetOperator::Union,
            Query::compose(select_int(2), SetOperator::UnionDistinct, select_int(3)),
        );
        assert_eq!(
            sql_of(Stmt::Query(q), Dialect::mysql8()),
            "select 1 union (select 2 union distinct select 3)"
        );
    }

    #[test]
    fn test_left_operand_with_limit_is_bracketed() {
        let left = Query::simple(SelectStmt::columns(vec![Expr::int(1).into()]).with_limit(1));
        let mut q = Query::compose(left, SetOperator::Union, select_int(2));
        if let Some((order_by, limit)) = q.trailing_mut() {
            order_by.push(OrderByExpr::new(Expr::int(1)));
            *limit = Some(Limit::new(5));
        }
        assert_eq!(
            sql_of(Stmt::Query(q), Dialect::mysql8()),
            "(select 1 limit 1) union select 2 order by 1 limit 5"
        );
    }

    #[test]
    fn test_bracketed_query_trailing_clauses() {
        let mut q = Query::bracket(select_int(1));
        assert!(q.is_bracketed());
        assert!(!q.has_trailing_clauses());
        if let Some((_, limit)) = q.trailing_mut() {
            *limit = Some(Limit::new(1));
        }
        assert!(q.has_trailing_clauses());
        assert_eq!(sql_of(Stmt::Query(q), Dialect::mysql8()), "(select 1) limit 1");
    }
}

mod cte_tests {
    use super::*;

    fn with_query(with: WithClause) -> Stmt {
        let mut stmt = SelectStmt::columns(vec![SelectColumn::star()]).with_from(vec![
            TabularBlock::new(JoinKind::None, TabularItem::CteRef(Ident::new("c")), None),
        ]);
        stmt.with = Some(with);
        Stmt::Query(Query::simple(stmt))
    }

    #[test]
    fn test_simple_cte() {
        let stmt = with_query(WithClause::new(vec![Cte::new("c", select_int(1))]));
        assert_eq!(
            sql_of(stmt, Dialect::mysql8()),
            "with `c` as (select 1) select * from `c`"
        );
    }

    #[test]
    fn test_cte_with_columns_and_recursive() {
        let stmt = with_query(WithClause::recursive(vec![
            Cte::new("c", select_int(1)).with_columns(vec!["n"]),
        ]));
        assert_eq!(
            sql_of(stmt, Dialect::mysql8()),
            "with recursive `c`(`n`) as (select 1) select * from `c`"
        );
    }

    #[test]
    fn test_cte_needs_mysql8() {
        let stmt = with_query(WithClause::new(vec![Cte::new("c", select_int(1))]));
        assert!(matches!(
            render(&stmt, Dialect::mysql57()),
            Err(BuildError::DialectUnsupported { .. })
        ));
        assert!(render(&stmt, Dialect::Standard).is_ok());
    }

    #[test]
    fn test_cte_lookup() {
        let with = WithClause::new(vec![Cte::new("a", select_int(1)), Cte::new("b", select_int(2))]);
        assert!(with.get(&Ident::new("b")).is_some());
        assert!(with.get(&Ident::new("z")).is_none());
    }
}

mod params_tests {
    use super::*;

    #[test]
    fn test_params_follow_output_order() {
        let stmt = SelectStmt {
            columns: vec![Expr::value(1).into()],
            from: vec![block(JoinKind::None, "t", "t")],
            where_clause: vec![
                Expr::column("a").eq(Expr::value("x")),
                Expr::column("b").eq(Expr::value(true)),
            ],
            ..Default::default()
        };
        let (sql, collector) = render(&Stmt::Query(Query::simple(stmt)), Dialect::mysql8()).unwrap();
        assert_eq!(sql, "select ? from `t` as `t` where `a` = ? and `b` = ?");
        let rendered = RenderedSql::bind(sql, &collector, None).unwrap();
        assert_eq!(
            rendered.params,
            vec![
                ParamValue::Integer(1),
                ParamValue::String("x".into()),
                ParamValue::Bool(true)
            ]
        );
        assert!(rendered.batches.is_empty());
    }

    #[test]
    fn test_batch_binding_resolves_each_row() {
        let expr = Expr::column("id").eq(Expr::param("id")).and(Expr::column("k").eq(Expr::value(0)));
        let mut renderer = SqlRenderer::new(Dialect::mysql8());
        expr.render(&mut renderer).unwrap();
        let (sql, collector) = renderer.into_parts();

        let rows = vec![BatchRow::new().with("id", 1), BatchRow::new().with("id", 2)];
        let rendered = RenderedSql::bind(sql, &collector, Some(&rows)).unwrap();
        assert!(rendered.params.is_empty());
        assert_eq!(
            rendered.batches,
            vec![
                vec![ParamValue::Integer(1), ParamValue::Integer(0)],
                vec![ParamValue::Integer(2), ParamValue::Integer(0)],
            ]
        );
    }

    #[test]
    fn test_named_param_without_rows_fails() {
        let mut renderer = SqlRenderer::new(Dialect::mysql8());
        Expr::param("id").render(&mut renderer).unwrap();
        let (sql, collector) = renderer.into_parts();
        assert_eq!(
            RenderedSql::bind(sql, &collector, None),
            Err(BuildError::MissingBatchParam {
                name: "id".into(),
                row: 0
            })
        );
    }
}
