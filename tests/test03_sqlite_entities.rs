#![cfg(feature = "sqlite")]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sql_helper::prelude::*;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct Customer {
    id: i64,
    name: String,
    active: bool,
    email: Option<String>,
    joined: NaiveDateTime,
    // never selected, so it keeps its default
    tier: String,
}

const SETUP: &str = "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, active INTEGER, email TEXT, joined TEXT, notes TEXT);
     INSERT INTO customers VALUES (1, 'ada', 1, 'ada@example.com', '2023-01-02 03:04:05', 'vip');
     INSERT INTO customers VALUES (2, 'bob', 0, NULL, '2023-06-07T08:09:10', NULL);";

#[test]
fn test03_rows_become_records() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
        execute_non_query(&mut ctx, &SqlCommand::text(SETUP)).await?;

        let customers: Vec<Customer> = execute_entity(
            &mut ctx,
            &SqlCommand::text("SELECT * FROM customers ORDER BY id"),
        )
        .await?;

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].name, "ada");
        assert!(customers[0].active);
        assert_eq!(customers[0].email.as_deref(), Some("ada@example.com"));
        assert_eq!(customers[0].joined.to_string(), "2023-01-02 03:04:05");
        assert_eq!(customers[0].tier, "");

        assert!(!customers[1].active);
        assert_eq!(customers[1].email, None);
        assert_eq!(customers[1].joined.to_string(), "2023-06-07 08:09:10");
        Ok::<(), SqlHelperError>(())
    })?;
    Ok(())
}

#[test]
fn test03_missing_columns_keep_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
        execute_non_query(&mut ctx, &SqlCommand::text(SETUP)).await?;

        let names: Vec<Customer> = execute_entity(
            &mut ctx,
            &SqlCommand::text("SELECT name FROM customers WHERE id = ?1").param(2),
        )
        .await?;
        assert_eq!(
            names,
            vec![Customer {
                name: "bob".into(),
                ..Customer::default()
            }]
        );

        let none: Vec<Customer> = execute_entity(
            &mut ctx,
            &SqlCommand::text("SELECT * FROM customers WHERE id < 0"),
        )
        .await?;
        assert!(none.is_empty());
        Ok::<(), SqlHelperError>(())
    })?;
    Ok(())
}

#[test]
fn test03_unusable_column_names_the_member() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
        execute_non_query(&mut ctx, &SqlCommand::text(SETUP)).await?;

        let err = execute_entity::<Customer, _>(
            &mut ctx,
            &SqlCommand::text("SELECT notes AS id FROM customers WHERE id = 1"),
        )
        .await
        .unwrap_err();
        match err {
            SqlHelperError::ParameterError(msg) => assert!(msg.contains("`id`"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        Ok::<(), SqlHelperError>(())
    })?;
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct Flag {
    id: i64,
    active: Option<bool>,
    seen: Option<NaiveDateTime>,
}

#[test]
fn test03_optional_members_from_sqlite_storage() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ctx = DbContext::from_connection_string("sqlite::memory:")?;
        execute_non_query(
            &mut ctx,
            &SqlCommand::text(
                "CREATE TABLE flags (id INTEGER PRIMARY KEY, active INTEGER, seen TEXT);
                 INSERT INTO flags VALUES (1, 1, '2024-02-03 04:05:06');
                 INSERT INTO flags VALUES (2, 0, NULL);
                 INSERT INTO flags VALUES (3, NULL, '2024-02-03T10:00:00');",
            ),
        )
        .await?;

        let flags: Vec<Flag> = execute_entity(
            &mut ctx,
            &SqlCommand::text("SELECT id, active, seen FROM flags ORDER BY id"),
        )
        .await?;

        let active: Vec<Option<bool>> = flags.iter().map(|f| f.active).collect();
        assert_eq!(active, vec![Some(true), Some(false), None]);
        let seen: Vec<Option<String>> = flags
            .iter()
            .map(|f| f.seen.map(|dt| dt.to_string()))
            .collect();
        assert_eq!(
            seen,
            vec![
                Some("2024-02-03 04:05:06".to_string()),
                None,
                Some("2024-02-03 10:00:00".to_string()),
            ]
        );
        Ok::<(), SqlHelperError>(())
    })?;
    Ok(())
}
