#![cfg(feature = "sqlite")]

use sql_facade::prelude::*;
use sql_facade::statement::{build_insert, build_update};

async fn users_db() -> Result<QueryFacade, SqlFacadeError> {
    let mut db = QueryFacade::connect_sqlite(":memory:").await?;
    db.run(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
        Params::None,
    )
    .await?;
    Ok(db)
}

#[tokio::test]
async fn insert_single_row() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db().await?;
    let affected = db
        .insert(
            "users",
            &[
                ("id", DbValue::Int(1)),
                ("name", DbValue::Text("ada".into())),
                ("age", DbValue::Int(36)),
            ],
        )
        .await?;
    assert_eq!(affected, 1);

    let row = db
        .row("SELECT * FROM users WHERE id = ?", &[DbValue::Int(1)])
        .await?
        .unwrap();
    assert_eq!(row.get("name"), Some(&DbValue::Text("ada".into())));
    assert_eq!(row.get("age"), Some(&DbValue::Int(36)));
    Ok(())
}

#[tokio::test]
async fn insert_many_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db().await?;
    let rows = vec![
        vec![("id", DbValue::Int(1)), ("name", DbValue::Text("a".into()))],
        vec![("id", DbValue::Int(2)), ("name", DbValue::Text("b".into()))],
        vec![("id", DbValue::Int(3)), ("name", DbValue::Text("c".into()))],
    ];
    let affected = db.insert_many("users", &rows).await?;
    assert_eq!(affected, 3);

    let names = db.column("SELECT name FROM users ORDER BY id", &[]).await?;
    assert_eq!(
        names,
        vec![
            DbValue::Text("a".into()),
            DbValue::Text("b".into()),
            DbValue::Text("c".into())
        ]
    );
    Ok(())
}

// A single mapping and a one-element sequence of that mapping are the same
// call: same generated SQL text, same bound values.
#[tokio::test]
async fn single_and_one_element_insert_agree() -> Result<(), Box<dyn std::error::Error>> {
    // both paths share this exact text
    assert_eq!(
        build_insert("users", &["id", "name"]),
        "INSERT INTO \"users\" (\"id\", \"name\") VALUES (?, ?)"
    );

    let mut db = users_db().await?;
    db.insert(
        "users",
        &[("id", DbValue::Int(1)), ("name", DbValue::Text("a".into()))],
    )
    .await?;
    let one = vec![vec![
        ("id", DbValue::Int(2)),
        ("name", DbValue::Text("a".into())),
    ]];
    db.insert_many("users", &one).await?;

    let names = db.column("SELECT name FROM users ORDER BY id", &[]).await?;
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| n == &DbValue::Text("a".into())));
    Ok(())
}

#[tokio::test]
async fn update_binds_set_values_before_where_values() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db().await?;
    db.insert(
        "users",
        &[("id", DbValue::Int(1)), ("name", DbValue::Text("old".into()))],
    )
    .await?;

    // Both sides bind a value against `name`; only the SET-before-WHERE
    // order makes this match the existing row.
    let affected = db
        .update(
            "users",
            &[("name", DbValue::Text("new".into()))],
            &[("name", DbValue::Text("old".into())), ("id", DbValue::Int(1))],
        )
        .await?;
    assert_eq!(affected, 1);

    let name = db
        .cell("SELECT name FROM users WHERE id = ?", &[DbValue::Int(1)])
        .await?;
    assert_eq!(name, Some(DbValue::Text("new".into())));

    assert_eq!(
        build_update("users", &["name"], &["name", "id"]),
        "UPDATE \"users\" SET \"name\" = ? WHERE \"name\" = ? AND \"id\" = ?"
    );
    Ok(())
}

#[tokio::test]
async fn builder_usage_errors() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db().await?;

    let err = db.insert_many("users", &[]).await.unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));

    let mismatched = vec![
        vec![("id", DbValue::Int(1)), ("name", DbValue::Text("a".into()))],
        vec![("name", DbValue::Text("b".into())), ("id", DbValue::Int(2))],
    ];
    let err = db.insert_many("users", &mismatched).await.unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));

    let err = db
        .update("users", &[], &[("id", DbValue::Int(1))])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));

    // no unconditional UPDATE
    let err = db
        .update("users", &[("name", DbValue::Text("x".into()))], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));
    Ok(())
}

#[tokio::test]
async fn insert_rejects_unknown_columns_before_running_sql()
-> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db().await?;
    let err = db
        .insert("users", &[("ghost", DbValue::Int(1))])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SqlFacadeError::UnknownColumn { ref table, ref column }
            if table == "users" && column == "ghost"
    ));

    // nothing was inserted
    let count = db.cell("SELECT COUNT(*) FROM users", &[]).await?;
    assert_eq!(count, Some(DbValue::Int(0)));
    Ok(())
}
