use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::Script;

fn connection(script: &Script) -> Connection {
    script.connection(PoolConfig {
        table_prefix: "p_".into(),
        ..PoolConfig::default()
    })
}

#[tokio::test]
async fn nesting_uses_savepoints_and_only_the_outermost_commit_runs() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    conn.start().await?;
    conn.start().await?;
    conn.start().await?;
    assert_eq!(conn.trans_depth(), 3);
    conn.commit().await?;
    conn.rollback().await?;
    assert_eq!(conn.trans_depth(), 1);
    conn.commit().await?;
    assert_eq!(conn.trans_depth(), 0);

    assert_eq!(
        script.statements(),
        vec![
            "BEGIN",
            "SAVEPOINT trans2",
            "SAVEPOINT trans3",
            "ROLLBACK TO SAVEPOINT trans2",
            "COMMIT",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn nested_levels_are_counted_only_without_savepoint_support() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.without_savepoints();
    let mut conn = connection(&script);

    conn.start().await?;
    conn.start().await?;
    conn.rollback().await?;
    conn.commit().await?;
    assert_eq!(script.statements(), vec!["BEGIN", "COMMIT"]);
    Ok(())
}

#[tokio::test]
async fn commit_without_transaction_is_a_no_op() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);
    conn.commit().await?;
    conn.rollback().await?;
    assert_eq!(conn.trans_depth(), 0);
    assert!(script.statements().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_begin_leaves_depth_unchanged() {
    let script = Script::new();
    let mut conn = connection(&script);
    script.fail_next_execute(1205, "Lock wait timeout exceeded; try restarting transaction");
    let err = conn.start().await.unwrap_err();
    assert_eq!(err.errno(), Some(1205));
    assert_eq!(conn.trans_depth(), 0);
}

#[tokio::test]
async fn unit_of_work_commits_or_rolls_back() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.set_affected_rows(1);
    let mut conn = connection(&script);

    let moved = conn
        .transaction(|c| {
            Box::pin(async move {
                c.execute("UPDATE a SET n = n - 1 WHERE id = ?", &[1.into()], None)
                    .await?;
                c.execute("UPDATE a SET n = n + 1 WHERE id = ?", &[2.into()], None)
                    .await?;
                Ok::<_, SqlMiddlewareDbError>(c.affected_rows())
            })
        })
        .await?;
    assert_eq!(moved, 1);
    assert_eq!(
        script.statements(),
        vec![
            "BEGIN",
            "UPDATE a SET n = n - 1 WHERE id = ?",
            "UPDATE a SET n = n + 1 WHERE id = ?",
            "COMMIT",
        ]
    );

    script.clear_log();
    let duplicate = script.clone();
    let err = conn
        .transaction(|c| {
            Box::pin(async move {
                duplicate.fail_next_execute(1062, "Duplicate entry '2' for key 'PRIMARY'");
                c.execute("INSERT INTO a (id) VALUES (?)", &[2.into()], None)
                    .await?;
                Ok::<_, SqlMiddlewareDbError>(())
            })
        })
        .await
        .unwrap_err();
    assert_eq!(err.errno(), Some(1062));
    assert_eq!(conn.trans_depth(), 0);
    assert_eq!(
        script.statements(),
        vec!["BEGIN", "INSERT INTO a (id) VALUES (?)", "ROLLBACK"]
    );
    Ok(())
}

#[tokio::test]
async fn inner_unit_of_work_rolls_back_to_its_savepoint() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    conn.start().await?;
    let inner = conn
        .transaction(|_conn| {
            Box::pin(async move {
                Err::<(), _>(SqlMiddlewareDbError::Other("abort inner".into()))
            })
        })
        .await;
    assert!(inner.is_err());
    assert_eq!(conn.trans_depth(), 1);
    conn.commit().await?;

    assert_eq!(
        script.statements(),
        vec!["BEGIN", "SAVEPOINT trans2", "ROLLBACK TO SAVEPOINT trans2", "COMMIT"]
    );
    Ok(())
}

#[tokio::test]
async fn batch_runs_in_one_transaction() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.set_affected_rows(2);
    let mut conn = connection(&script);

    let batch = vec![
        QueryAndParams::new("DELETE FROM t WHERE id = ?", vec![1.into()]),
        QueryAndParams::new_without_params("DELETE FROM t WHERE id > 100"),
    ];
    assert_eq!(conn.batch_query(&batch).await?, 4);
    assert_eq!(script.statements().first().map(String::as_str), Some("BEGIN"));
    assert_eq!(script.statements().last().map(String::as_str), Some("COMMIT"));

    script.clear_log();
    script.fail_next_prepare(1064, "You have an error in your SQL syntax");
    assert!(conn.batch_query(&batch).await.is_err());
    assert_eq!(script.statements().last().map(String::as_str), Some("ROLLBACK"));
    assert_eq!(conn.trans_depth(), 0);
    assert_eq!(conn.batch_query(&[]).await?, 0);
    Ok(())
}

#[tokio::test]
async fn table_locks_use_prefix_and_method() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    assert_eq!(conn.lock_method(), LockMethod::Read);
    conn.lock(&["a"]).await?;
    conn.set_lock_method(LockMethod::Write);
    conn.lock(&["a", "b"]).await?;
    conn.unlock().await?;
    assert!(matches!(
        conn.lock(&[]).await,
        Err(SqlMiddlewareDbError::InvalidArgument(_))
    ));

    assert_eq!(
        script.statements(),
        vec![
            "LOCK TABLES p_a READ",
            "LOCK TABLES p_a WRITE, p_b WRITE",
            "UNLOCK TABLES",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn lost_session_inside_a_transaction_is_reported() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    conn.start().await?;
    script.fail_next_execute(2006, "MySQL server has gone away");
    let err = conn
        .execute("UPDATE a SET x = 1", &[], None)
        .await
        .unwrap_err();
    assert!(err.is_connection_lost());
    assert!(conn.needs_reconnect());

    let err = conn
        .execute("UPDATE b SET y = 2", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlMiddlewareDbError::TransactionLost(1)));
    assert_eq!(conn.trans_depth(), 0);
    assert!(!conn.needs_reconnect());
    assert_eq!(script.connect_attempts(), 2);

    // no COMMIT reaches the fresh session and the second UPDATE never ran
    conn.commit().await?;
    assert_eq!(script.statements(), vec!["BEGIN", "UPDATE a SET x = 1"]);

    conn.execute("UPDATE b SET y = 2", &[], None).await?;
    assert_eq!(script.statements().last().map(String::as_str), Some("UPDATE b SET y = 2"));
    Ok(())
}

#[tokio::test]
async fn commit_after_a_lost_session_fails() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    let mut conn = connection(&script);

    conn.start().await?;
    conn.start().await?;
    script.fail_next_execute(2013, "Lost connection to MySQL server during query");
    assert!(conn.execute("DELETE FROM a", &[], None).await.is_err());

    assert!(matches!(
        conn.commit().await,
        Err(SqlMiddlewareDbError::TransactionLost(2))
    ));
    assert_eq!(conn.trans_depth(), 0);
    assert_eq!(
        script.statements(),
        vec!["BEGIN", "SAVEPOINT trans2", "DELETE FROM a"]
    );
    Ok(())
}
