#![cfg(feature = "test-utils")]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sql_helper::prelude::*;
use sql_helper::test_utils::{setup_postgres_embedded, stop_postgres_embedded};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct Order {
    id: i64,
    customer: String,
    total: f64,
    shipped: bool,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewOrder {
    customer: String,
    total: f64,
    shipped: Option<bool>,
    note: Option<String>,
    placed: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
struct ImportedOrder {
    id: i64,
    customer: String,
    total: f64,
}

const SCHEMA: &str = "
CREATE TABLE orders (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    customer TEXT NOT NULL UNIQUE,
    total DOUBLE PRECISION NOT NULL,
    shipped BOOLEAN NOT NULL DEFAULT false,
    note TEXT DEFAULT 'none',
    placed TIMESTAMP
);
CREATE FUNCTION orders_over(min_total DOUBLE PRECISION) RETURNS SETOF orders
    LANGUAGE sql AS $$ SELECT * FROM orders WHERE total > min_total ORDER BY id $$;
CREATE PROCEDURE mark_shipped(p_customer TEXT)
    LANGUAGE sql AS $$ UPDATE orders SET shipped = true WHERE customer = p_customer $$;
";

fn new_order(customer: &str, total: f64) -> NewOrder {
    NewOrder {
        customer: customer.to_string(),
        total,
        shipped: None,
        note: None,
        placed: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).and_then(|d| d.and_hms_opt(9, 30, 0)),
    }
}

#[test]
fn test05_postgres_helpers() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres_embedded("helper_test")?;
    let config = pg.config.clone();
    let url = pg.database_url.clone();

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async move {
        let mut ctx = DbContext::new(config);
        ctx.open().await?;
        if let Some(conn) = ctx.connection_mut() {
            conn.execute_batch(SCHEMA).await?;
        }

        // bulk load: identity assigned by the server, NULLs take column defaults
        let orders = vec![
            new_order("ann", 120.0),
            new_order("ben", 45.5),
            new_order("cat", 75.25),
        ];
        let inserted =
            bulk_insert_records(&mut ctx, "orders", &orders, &BulkCopyOptions::default()).await?;
        assert_eq!(inserted, 3);

        let note: String = execute_scalar_as(
            &mut ctx,
            &SqlCommand::text("SELECT note FROM orders WHERE customer = $1").param("ben"),
        )
        .await?;
        assert_eq!(note, "none");

        let placed = execute_scalar(
            &mut ctx,
            &SqlCommand::text("SELECT placed FROM orders WHERE customer = $1").param("ann"),
        )
        .await?;
        assert_eq!(
            placed.as_ref().and_then(RowValues::as_timestamp),
            orders[0].placed
        );

        // a failing load rolls back every batch
        let clash = vec![new_order("dan", 1.0), new_order("ann", 2.0)];
        let err = bulk_insert_records(
            &mut ctx,
            "orders",
            &clash,
            &BulkCopyOptions::default().with_batch_size(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SqlHelperError::PostgresError(_)), "{err:?}");
        let count: i64 =
            execute_scalar_as(&mut ctx, &SqlCommand::text("SELECT count(*) FROM orders")).await?;
        assert_eq!(count, 3);

        // source identity values survive only with KEEP_IDENTITY
        let imported = vec![ImportedOrder {
            id: 500,
            customer: "eve".into(),
            total: 10.0,
        }];
        bulk_insert_records(
            &mut ctx,
            "public.orders",
            &imported,
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_IDENTITY),
        )
        .await?;
        let eve: i64 = execute_scalar_as(
            &mut ctx,
            &SqlCommand::text("SELECT id FROM orders WHERE customer = $1").param("eve"),
        )
        .await?;
        assert_eq!(eve, 500);

        // non-query counts
        let bumped = execute_non_query(
            &mut ctx,
            &SqlCommand::text("UPDATE orders SET total = total + $1 WHERE total > $2")
                .param(1.0)
                .param(70.0),
        )
        .await?;
        assert_eq!(bumped, 2);
        let none = execute_non_query(
            &mut ctx,
            &SqlCommand::text("DELETE FROM orders WHERE customer = $1").param("nobody"),
        )
        .await?;
        assert_eq!(none, 0);

        // stored procedures: set-returning function and CALL
        let big: Vec<Order> = execute_entity(
            &mut ctx,
            &SqlCommand::stored_procedure("orders_over").named_param("min_total", 50.0),
        )
        .await?;
        let names: Vec<&str> = big.iter().map(|o| o.customer.as_str()).collect();
        assert_eq!(names, vec!["ann", "cat"]);
        assert!(big.iter().all(|o| !o.shipped));

        execute_non_query(
            &mut ctx,
            &SqlCommand::stored_procedure("mark_shipped").param("cat"),
        )
        .await?;
        let shipped: bool = execute_scalar_as(
            &mut ctx,
            &SqlCommand::text("SELECT shipped FROM orders WHERE customer = $1").param("cat"),
        )
        .await?;
        assert!(shipped);

        // typed casts
        let err = execute_scalar_as::<i64, _>(
            &mut ctx,
            &SqlCommand::text("SELECT customer FROM orders WHERE id = $1").param(500),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SqlHelperError::InvalidCast { found: "Text", .. }));
        // numeric aggregates and other non-text types come back as values
        let id_sum = execute_scalar(&mut ctx, &SqlCommand::text("SELECT sum(id) FROM orders")).await?;
        assert_eq!(id_sum, Some(RowValues::Float(506.0)));
        let exact: f64 =
            execute_scalar_as(&mut ctx, &SqlCommand::text("SELECT 12.50::numeric(5,2)")).await?;
        assert!((exact - 12.5).abs() < 1e-12);
        let mixed = execute_data_table(
            &mut ctx,
            &SqlCommand::text(
                "SELECT '00000000-0000-0000-0000-00000000002a'::uuid AS key, \
                 '04:05:06'::time AS at, NULL::numeric AS missing",
            ),
        )
        .await?;
        let row = &mixed.rows()[0];
        assert_eq!(
            row.get("key").and_then(RowValues::as_text),
            Some("00000000-0000-0000-0000-00000000002a")
        );
        assert_eq!(row.get("at").and_then(RowValues::as_text), Some("04:05:06"));
        assert_eq!(row.get("missing"), Some(&RowValues::Null));
        ctx.close().await?;

        // a one-off call on its own connection
        let total: f64 = execute_scalar_as(
            url.as_str(),
            &SqlCommand::text("SELECT sum(total) FROM orders"),
        )
        .await?;
        assert!((total - 252.75).abs() < 1e-9);

        Ok::<(), SqlHelperError>(())
    });

    stop_postgres_embedded(pg);
    outcome?;
    Ok(())
}
