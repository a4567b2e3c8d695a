use std::time::Duration;

use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::Script;

fn connection(script: &Script) -> Connection {
    script.connection(PoolConfig {
        database: "app".into(),
        table_prefix: "p_".into(),
        ..PoolConfig::default()
    })
}

fn users() -> ResultSet {
    ResultSet::from_rows(
        vec!["id", "name"],
        vec![
            vec![RowValues::Int(1), "ann".into()],
            vec![RowValues::Int(2), "bob".into()],
        ],
    )
}

#[tokio::test]
async fn select_helpers_read_rows() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond("SELECT", users());
    let mut conn = connection(&script);

    let rows = conn
        .query()
        .table("users")
        .where_in("id", [1, 2])
        .select()
        .await?
        .into_rows()
        .expect("rows outcome");
    assert_eq!(rows.len(), 2);
    assert_eq!(
        script.executed()[0],
        (
            "SELECT * FROM p_users WHERE id in ( ?, ? )".to_string(),
            vec![RowValues::Int(1), RowValues::Int(2)],
        )
    );

    let row = conn.query().table("users").find().await?.expect("a row");
    assert_eq!(row.get("name"), Some(&RowValues::Text("ann".into())));

    let name = conn
        .query()
        .table("users")
        .and_where("id", "=", 2)
        .value("name")
        .await?;
    assert_eq!(name, Some(RowValues::Text("ann".into())));

    let ids = conn.query().table("users").column("id").await?;
    assert_eq!(ids, vec![RowValues::Int(1), RowValues::Int(2)]);

    assert_eq!(
        script.statements()[1..],
        [
            "SELECT * FROM p_users LIMIT 1".to_string(),
            "SELECT name FROM p_users WHERE id = ? LIMIT 1".to_string(),
            "SELECT id FROM p_users".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn total_count_is_fetched_after_calc_found_rows() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond("SELECT", users()).respond(
        "SELECT FOUND_ROWS()",
        ResultSet::from_rows(vec!["count"], vec![vec![RowValues::Int(42)]]),
    );
    let mut conn = connection(&script);

    conn.query()
        .table("users")
        .with_total_count()
        .limit_offset(0, 2)
        .select()
        .await?;
    assert_eq!(conn.total_count(), 42);
    assert_eq!(
        script.statements(),
        vec![
            "SELECT SQL_CALC_FOUND_ROWS * FROM p_users LIMIT 0, 2",
            "SELECT FOUND_ROWS() as count",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn insert_replace_update_delete() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.set_insert_id(17).set_affected_rows(1);
    let mut conn = connection(&script);

    let id = conn
        .query()
        .table("users")
        .insert([("name", Value::from("cy")), ("age", Value::from(30))])
        .await?;
    assert_eq!(id, 17);
    assert_eq!(conn.insert_id(), 17);

    conn.query()
        .table("users")
        .replace([("id", 17), ("age", 31)])
        .await?;

    let changed = conn
        .query()
        .table("users")
        .and_where("id", "=", 17)
        .update([("visits", Value::inc(1))], false)
        .await?;
    assert_eq!(changed, 1);

    let removed = conn.query().table("sessions").delete(true).await?;
    assert_eq!(removed, 1);

    assert_eq!(
        script.statements(),
        vec![
            "INSERT INTO p_users (`name`, `age`) VALUES (?, ?)",
            "REPLACE INTO p_users (`id`, `age`) VALUES (?, ?)",
            "UPDATE p_users SET `visits` = `visits` + 1 WHERE id = ?",
            "DELETE FROM p_sessions",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unconditional_update_never_reaches_the_client() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    let err = conn
        .query()
        .table("users")
        .update([("banned", true)], false)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlMiddlewareDbError::EmptyCondition("update")));
    let err = conn.query().table("users").delete(false).await.unwrap_err();
    assert!(matches!(err, SqlMiddlewareDbError::EmptyCondition("delete")));
    assert!(script.statements().is_empty());
    assert_eq!(script.connect_attempts(), 0);

    // the failed call still consumed its clauses
    conn.query().table("logs").select().await?;
    assert_eq!(script.statements(), vec!["SELECT * FROM p_logs"]);
    Ok(())
}

#[tokio::test]
async fn fetch_handle_defers_execution() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond("SELECT", users());
    let mut conn = connection(&script);

    let outcome = conn
        .query()
        .fetch_handle()
        .table("users")
        .and_where("id", ">", 0)
        .select()
        .await?;
    let QueryOutcome::Handle(statement) = outcome else {
        panic!("expected a prepared handle");
    };
    assert_eq!(statement.sql, "SELECT * FROM p_users WHERE id > ?");
    assert!(script.executed().is_empty());

    let result = conn.execute_prepared(&statement, None).await?;
    assert_eq!(result.rows.len(), 2);
    Ok(())
}

#[tokio::test]
async fn per_call_timeout_overrides_default() {
    let script = Script::new();
    script.delay_execute(Duration::from_millis(200));
    let mut conn = connection(&script);

    let err = conn
        .query()
        .timeout(Duration::from_millis(20))
        .table("users")
        .select()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlMiddlewareDbError::QueryTimeout { .. }));
    assert!(conn.needs_reconnect());
}

#[tokio::test]
async fn scopes_apply_on_connection_queries() -> Result<(), SqlMiddlewareDbError> {
    let registry = RegistryBuilder::new()
        .register_scope("visible", |state, _| {
            state.and_where("hidden", "=", false).where_null("deleted_at");
            Ok(())
        })
        .build();
    let script = Script::new();
    let mut conn = script.connection_with_registry(
        PoolConfig {
            table_prefix: "p_".into(),
            ..PoolConfig::default()
        },
        registry,
    );

    conn.query()
        .table("posts")
        .scope("visible", &[])?
        .select()
        .await?;
    assert_eq!(
        script.statements(),
        vec!["SELECT * FROM p_posts WHERE hidden = ? AND deleted_at IS NULL"]
    );
    assert!(matches!(
        conn.query().table("posts").scope("missing", &[]),
        Err(SqlMiddlewareDbError::UnknownScope(_))
    ));
    Ok(())
}
