#![cfg(feature = "sqlite")]

use sql_facade::prelude::*;

async fn ledger_db() -> Result<QueryFacade, SqlFacadeError> {
    let mut db = QueryFacade::connect_sqlite(":memory:").await?;
    db.run(
        "CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)",
        Params::None,
    )
    .await?;
    Ok(db)
}

#[tokio::test]
async fn batch_insert_commits_every_set() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ledger_db().await?;
    let result_set = db
        .run(
            "INSERT INTO ledger (id, amount) VALUES (?, ?)",
            Params::Batch(vec![
                vec![DbValue::Int(1), DbValue::Int(10)],
                vec![DbValue::Int(2), DbValue::Int(20)],
                vec![DbValue::Int(3), DbValue::Int(30)],
            ]),
        )
        .await?;
    assert_eq!(result_set.rows_affected, 3);

    let total = db.cell("SELECT SUM(amount) FROM ledger", &[]).await?;
    assert_eq!(total, Some(DbValue::Int(60)));
    Ok(())
}

// One failing set rolls the whole batch back: zero rows committed.
#[tokio::test]
async fn batch_insert_rolls_back_on_constraint_violation()
-> Result<(), Box<dyn std::error::Error>> {
    let mut db = ledger_db().await?;
    let err = db
        .run(
            "INSERT INTO ledger (id, amount) VALUES (?, ?)",
            Params::Batch(vec![
                vec![DbValue::Int(1), DbValue::Int(10)],
                vec![DbValue::Int(1), DbValue::Int(20)], // duplicate key
                vec![DbValue::Int(3), DbValue::Int(30)],
            ]),
        )
        .await;
    assert!(err.is_err());

    let count = db.cell("SELECT COUNT(*) FROM ledger", &[]).await?;
    assert_eq!(count, Some(DbValue::Int(0)));
    Ok(())
}

#[tokio::test]
async fn insert_many_rolls_back_too() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ledger_db().await?;
    let rows = vec![
        vec![("id", DbValue::Int(1)), ("amount", DbValue::Int(1))],
        vec![("id", DbValue::Int(2)), ("amount", DbValue::Null)], // NOT NULL
        vec![("id", DbValue::Int(3)), ("amount", DbValue::Int(3))],
    ];
    assert!(db.insert_many("ledger", &rows).await.is_err());

    let count = db.cell("SELECT COUNT(*) FROM ledger", &[]).await?;
    assert_eq!(count, Some(DbValue::Int(0)));
    Ok(())
}

#[tokio::test]
async fn batch_rules_are_enforced() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ledger_db().await?;

    let err = db
        .run(
            "UPDATE ledger SET amount = ? WHERE id = ?",
            Params::Batch(vec![vec![DbValue::Int(1), DbValue::Int(1)]]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));

    let err = db
        .run(
            "INSERT INTO ledger (id, amount) VALUES (?, ?)",
            Params::Batch(vec![]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::UsageError(_)));
    Ok(())
}

// A failed batch leaves the connection usable and earlier data intact.
#[tokio::test]
async fn failed_batch_preserves_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ledger_db().await?;
    db.insert(
        "ledger",
        &[("id", DbValue::Int(100)), ("amount", DbValue::Int(5))],
    )
    .await?;

    let rows = vec![
        vec![("id", DbValue::Int(1)), ("amount", DbValue::Int(1))],
        vec![("id", DbValue::Int(100)), ("amount", DbValue::Int(2))], // duplicate
    ];
    assert!(db.insert_many("ledger", &rows).await.is_err());

    let amounts = db.column("SELECT amount FROM ledger", &[]).await?;
    assert_eq!(amounts, vec![DbValue::Int(5)]);
    Ok(())
}
