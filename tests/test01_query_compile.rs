use mysql_middleware::prelude::*;
use serde_json::json;

#[test]
fn select_clauses_render_in_fixed_order() -> Result<(), SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::new("p_");
    qb.table("users u")
        .fields(&["u.id", "u.name"])
        .limit_offset(20, 10)
        .having("cnt", ">", 2)
        .group_by("u.id")
        .and_where("u.age", ">=", 18)
        .or_where("u.vip", "=", true)
        .where_between("u.score", 10, 20)
        .where_not_null("u.email");
    qb.join("orders o", "o.uid = u.id", "left")?
        .order_by("u.name", "asc")?;

    let q = qb.compile_select()?;
    assert_eq!(
        q.query,
        "SELECT u.id,u.name FROM p_users u LEFT JOIN p_orders o on o.uid = u.id \
         WHERE u.age >= ? OR u.vip = ? AND u.score between ? AND ? AND u.email IS NOT NULL \
         GROUP BY u.id HAVING cnt > ? ORDER BY u.name ASC LIMIT 20, 10"
    );
    assert_eq!(
        q.params,
        vec![
            RowValues::Int(18),
            RowValues::Bool(true),
            RowValues::Int(10),
            RowValues::Int(20),
            RowValues::Int(2),
        ]
    );
    assert_eq!(q.placeholder_count(), q.params.len());
    Ok(())
}

#[test]
fn unset_conditions_are_skipped() -> Result<(), SqlMiddlewareDbError> {
    let name: Option<&str> = None;
    let mut qb = QueryBuilder::new("");
    qb.table("t").and_where("name", "=", name);
    assert_eq!(qb.compile_select()?.query, "SELECT * FROM t");

    qb.or_where("id", "=", Some(3));
    let q = qb.compile_select()?;
    assert_eq!(q.query, "SELECT * FROM t WHERE id = ?");
    assert_eq!(q.params, vec![RowValues::Int(3)]);
    Ok(())
}

#[test]
fn sub_queries_splice_their_binds_in_position() -> Result<(), SqlMiddlewareDbError> {
    let mut totals = QueryBuilder::sub_query("s");
    totals
        .table("orders")
        .fields(&["uid", "SUM(total) AS spent"])
        .and_where("status", "=", "paid")
        .group_by("uid");
    let totals = totals.get_sub_query()?;

    let mut banned = QueryBuilder::sub_query("");
    banned.table("bans").fields(&["uid"]).and_where("until", ">", 100);
    let banned = banned.get_sub_query()?;

    let mut qb = QueryBuilder::new("");
    qb.table("users u").and_where("u.age", ">", 30);
    qb.join(totals, "s.uid = u.id", "inner")?;
    qb.where_not_in("u.id", banned);

    let q = qb.compile_select()?;
    assert_eq!(
        q.query,
        "SELECT * FROM users u INNER JOIN (SELECT uid,SUM(total) AS spent FROM orders WHERE status = ? GROUP BY uid) s \
         on s.uid = u.id WHERE u.age > ? AND u.id not in (SELECT uid FROM bans WHERE until > ?)"
    );
    assert_eq!(
        q.params,
        vec![
            RowValues::Text("paid".into()),
            RowValues::Int(30),
            RowValues::Int(100),
        ]
    );
    Ok(())
}

#[test]
fn exists_and_raw_conditions() -> Result<(), SqlMiddlewareDbError> {
    let mut inner = QueryBuilder::sub_query("");
    inner
        .table("sessions")
        .fields(&["1"])
        .where_raw("sessions.uid = users.id AND sessions.ttl > ?", vec![60.into()]);
    let inner = inner.get_sub_query()?;

    let mut qb = QueryBuilder::new("");
    qb.table("users")
        .where_exists(inner)
        .where_raw("FIND_IN_SET(?, tags)", vec!["x".into()]);
    let q = qb.compile_select()?;
    assert_eq!(
        q.query,
        "SELECT * FROM users WHERE exists (SELECT 1 FROM sessions WHERE sessions.uid = users.id AND sessions.ttl > ?) \
         AND FIND_IN_SET(?, tags)"
    );
    assert_eq!(
        q.params,
        vec![RowValues::Int(60), RowValues::Text("x".into())]
    );
    Ok(())
}

#[test]
fn validation_errors_surface_before_compilation() {
    let mut qb = QueryBuilder::new("");
    assert!(matches!(
        qb.join("t", "a = b", "sideways"),
        Err(SqlMiddlewareDbError::JoinType(kind)) if kind == "SIDEWAYS"
    ));
    assert!(matches!(
        qb.order_by("id", "up"),
        Err(SqlMiddlewareDbError::OrderDirection(_))
    ));
    assert!(matches!(
        qb.option("sql_turbo"),
        Err(SqlMiddlewareDbError::WrongOption(_))
    ));
    assert!(matches!(
        qb.scope("active", &[]),
        Err(SqlMiddlewareDbError::UnknownScope(name)) if name == "active"
    ));
    assert!(matches!(
        qb.compile_select(),
        Err(SqlMiddlewareDbError::TableNotSet)
    ));

    qb.table("t").where_in("id", Vec::<i64>::new());
    assert!(matches!(
        qb.compile_select(),
        Err(SqlMiddlewareDbError::InvalidArgument(_))
    ));
}

#[test]
fn options_order_extras_and_locks() -> Result<(), SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::new("p_");
    qb.table("items");
    qb.option("distinct")?
        .option("for   update")?
        .order_by("`items`.weight; DROP", "desc")?
        .order_by_field_list("kind", &["b", "a\""], "asc")?
        .order_by("RAND()", "asc")?;
    qb.with_total_count();
    let q = qb.compile_select()?;
    assert_eq!(
        q.query,
        "SELECT DISTINCT SQL_CALC_FOUND_ROWS * FROM p_items \
         ORDER BY `p_items`.weight DROP DESC, FIELD (kind, \"b\",\"a\") ASC, rand() FOR UPDATE"
    );
    Ok(())
}

#[test]
fn scopes_come_from_the_registry() -> Result<(), SqlMiddlewareDbError> {
    let registry = RegistryBuilder::new()
        .register_scope("active", |state, _args| {
            state.and_where("status", "=", 1);
            Ok(())
        })
        .register_scope("newer_than", |state, args| {
            let days = args
                .first()
                .and_then(RowValues::as_int)
                .copied()
                .ok_or_else(|| SqlMiddlewareDbError::InvalidArgument("days".into()))?;
            state.and_where("created", ">", Value::func("NOW() - INTERVAL ? DAY", vec![days.into()]));
            Ok(())
        })
        .build();

    let mut qb = QueryBuilder::new("").with_registry(registry);
    qb.table("posts")
        .scope("active", &[])?
        .scope("newer_than", &[RowValues::Int(7)])?;
    let q = qb.compile_select()?;
    assert_eq!(
        q.query,
        "SELECT * FROM posts WHERE status = ? AND created > NOW() - INTERVAL ? DAY"
    );
    assert_eq!(q.params, vec![RowValues::Int(1), RowValues::Int(7)]);

    assert!(matches!(
        qb.scope("newer_than", &[]),
        Err(SqlMiddlewareDbError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn mutations_compile_with_data_markers() -> Result<(), SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::new("p_");
    qb.table("counters").and_where("id", "=", 5).limit(1);
    let row = data([
        ("hits", Value::from_marker(&json!({"[I]": 2}))?),
        ("flag", Value::from_marker(&json!({"[N]": ""}))?),
        ("seen", Value::now(Some("-1d"))?),
        ("label", Value::from("x")),
    ]);
    let q = qb.compile_update(&row, false)?;
    assert_eq!(
        q.query,
        "UPDATE p_counters SET `hits` = `hits` + 2, `flag` = !`flag`, `seen` = NOW() - interval 1 day, `label` = ? \
         WHERE id = ? LIMIT 1"
    );
    assert_eq!(q.params, vec![RowValues::Text("x".into()), RowValues::Int(5)]);

    assert!(matches!(
        Value::from_marker(&json!({"[Z]": 1})),
        Err(SqlMiddlewareDbError::WrongOperation(key)) if key == "[Z]"
    ));
    assert!(matches!(
        Value::now(Some("3w")),
        Err(SqlMiddlewareDbError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn replace_and_multi_table_delete() -> Result<(), SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::new("");
    qb.table("tags");
    let q = qb.compile_insert(InsertVerb::Replace, &data([("id", 1), ("n", 2)]))?;
    assert_eq!(q.query, "REPLACE INTO tags (`id`, `n`) VALUES (?, ?)");

    let mut qb = QueryBuilder::new("p_");
    qb.table("posts p").and_where("u.banned", "=", true);
    qb.join("users u", "u.id = p.uid", "")?;
    let q = qb.compile_delete(false)?;
    assert_eq!(
        q.query,
        "DELETE p FROM p_posts p JOIN p_users u on u.id = p.uid WHERE u.banned = ?"
    );

    let mut qb = QueryBuilder::new("");
    qb.table("posts");
    assert!(matches!(
        qb.compile_delete(false),
        Err(SqlMiddlewareDbError::EmptyCondition("delete"))
    ));
    assert_eq!(qb.compile_delete(true)?.query, "DELETE FROM posts");
    Ok(())
}

#[test]
fn detached_select_is_deferred() -> Result<(), SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::sub_query("x");
    qb.table("t").and_where("a", "=", 1);
    match qb.select()? {
        QueryOutcome::Deferred(sub) => {
            assert_eq!(sub.sql, "SELECT * FROM t WHERE a = ?");
            assert_eq!(sub.alias.as_deref(), Some("x"));
        }
        other => panic!("expected a deferred sub-query, got {other:?}"),
    }
    assert!(!qb.state().is_dirty());
    Ok(())
}
