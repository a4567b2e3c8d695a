use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::Script;

fn connection(script: &Script) -> Connection {
    script.connection(PoolConfig {
        database: "app".into(),
        table_prefix: "p_".into(),
        ..PoolConfig::default()
    })
}

fn text(s: &str) -> RowValues {
    RowValues::Text(s.into())
}

#[tokio::test]
async fn column_metadata_is_read_from_show_columns() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond(
        "SHOW COLUMNS",
        ResultSet::from_rows(
            vec!["Field", "Type", "Null", "Key", "Default", "Extra"],
            vec![
                vec![
                    text("id"),
                    text("int(11) unsigned"),
                    text("NO"),
                    text("PRI"),
                    RowValues::Null,
                    text("auto_increment"),
                ],
                vec![
                    text("nick"),
                    text("varchar(64)"),
                    text("YES"),
                    text(""),
                    text("anon"),
                    text(""),
                ],
            ],
        ),
    );
    let mut conn = connection(&script);
    conn.set_field_case(FieldCase::Upper);

    let fields = conn.get_fields("users").await?;
    assert_eq!(script.statements(), vec!["SHOW COLUMNS FROM `p_users`"]);
    assert_eq!(fields.len(), 2);

    let id = &fields[0];
    assert_eq!(id.name, "ID");
    assert!(id.notnull && id.primary && id.autoincrement);
    assert_eq!(id.default, None);
    assert_eq!(field_bind_type(&id.field_type), FieldBindType::Int);

    let nick = &fields[1];
    assert_eq!(nick.name, "NICK");
    assert!(!nick.notnull && !nick.primary && !nick.autoincrement);
    assert_eq!(nick.default.as_deref(), Some("anon"));
    assert_eq!(field_bind_type(&nick.field_type), FieldBindType::Str);
    Ok(())
}

#[tokio::test]
async fn table_listing_keeps_prefixed_names() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond(
        "SHOW TABLES",
        ResultSet::from_rows(
            vec!["Tables_in_app"],
            vec![vec![text("p_users")], vec![text("other")], vec![text("p_posts")]],
        ),
    );
    let mut conn = connection(&script);

    let tables = conn.get_tables(Some("app")).await?;
    assert_eq!(tables, vec!["p_users", "p_posts"]);
    conn.get_tables(None).await?;
    assert_eq!(
        script.statements(),
        vec!["SHOW TABLES FROM `app`", "SHOW TABLES"]
    );
    Ok(())
}

#[tokio::test]
async fn table_exists_compares_found_rows() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond(
        "SELECT FOUND_ROWS()",
        ResultSet::from_rows(vec!["count"], vec![vec![RowValues::Int(2)]]),
    );
    let mut conn = connection(&script);

    assert!(conn.table_exists(&["a", "b"]).await?);
    assert_eq!(
        script.executed()[0],
        (
            "SELECT SQL_CALC_FOUND_ROWS table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_name in ( ?, ? ) LIMIT 2"
                .to_string(),
            vec![text("app"), text("p_a"), text("p_b")],
        )
    );

    assert!(!conn.table_exists(&["a", "b", "c"]).await?);
    assert!(matches!(
        conn.table_exists(&[]).await,
        Err(SqlMiddlewareDbError::InvalidArgument(_))
    ));
    Ok(())
}

#[tokio::test]
async fn table_exists_ignores_unfinished_clauses() -> Result<(), SqlMiddlewareDbError> {
    let script = Script::new();
    script.respond(
        "SELECT FOUND_ROWS()",
        ResultSet::from_rows(vec!["count"], vec![vec![RowValues::Int(1)]]),
    );
    let mut conn = connection(&script);

    conn.query()
        .table("users")
        .and_where("id", "=", 9)
        .join("roles r", "r.uid = id", "left")?;
    assert!(conn.table_exists(&["users"]).await?);
    assert_eq!(
        script.executed()[0],
        (
            "SELECT SQL_CALC_FOUND_ROWS table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_name in ( ? ) LIMIT 1"
                .to_string(),
            vec![text("app"), text("p_users")],
        )
    );
    Ok(())
}

#[test]
fn table_markers_use_the_connection_prefix() {
    let conn = connection(&Script::new());
    assert_eq!(
        conn.parse_sql_table("SELECT * FROM __USERS__ u JOIN __USER_ROLES__ r ON r.uid = u.id"),
        "SELECT * FROM p_users u JOIN p_user_roles r ON r.uid = u.id"
    );
}
