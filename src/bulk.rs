//! Bulk load: many rows into one table inside one transaction.
//!
//! Rows are written as multi-row parameterised `INSERT` statements. Every statement runs
//! inside a single transaction that is committed only when all of them succeed; any failure
//! rolls the transaction back and the original error is returned.

use std::fmt::Write;

use bitflags::bitflags;
use tracing::{debug, info, warn};

use crate::connection::BackendConnection;
use crate::error::SqlHelperError;
use crate::types::{DatabaseType, RowValues};

bitflags! {
    /// How a bulk load treats identity columns and NULL cells. Combine with `|`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BulkCopyFlags: u32 {
        /// Preserve source identity values. When not set, identity columns are left out
        /// and the destination assigns them.
        const KEEP_IDENTITY = 0b0000_0001;
        /// Insert NULL cells as NULL. When not set, a NULL cell takes the column default.
        const KEEP_NULLS    = 0b0000_1000;
    }
}

/// Settings for one bulk load.
///
/// ```rust
/// use sql_helper::prelude::*;
///
/// let options = BulkCopyOptions::default()
///     .with_flags(BulkCopyFlags::KEEP_IDENTITY | BulkCopyFlags::KEEP_NULLS)
///     .with_default_schema("dbo");
/// assert_eq!(options.qualify("orders"), "dbo.orders");
/// assert_eq!(options.qualify("sales.orders"), "sales.orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCopyOptions {
    pub flags: BulkCopyFlags,
    /// Rows per `INSERT` statement, further limited by the backend's parameter ceiling
    pub batch_size: usize,
    /// Schema put in front of table names that are not already qualified
    pub default_schema: Option<String>,
}

impl Default for BulkCopyOptions {
    fn default() -> Self {
        Self {
            flags: BulkCopyFlags::empty(),
            batch_size: 100,
            default_schema: None,
        }
    }
}

impl BulkCopyOptions {
    #[must_use]
    pub fn with_flags(mut self, flags: BulkCopyFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// The destination name for `table`: prefixed with the default schema unless it already
    /// contains a `.`.
    #[must_use]
    pub fn qualify(&self, table: &str) -> String {
        match &self.default_schema {
            Some(schema) if !table.contains('.') => format!("{schema}.{table}"),
            _ => table.to_string(),
        }
    }
}

/// Load `rows` (laid out as `columns`) into `table_name`.
///
/// Returns the number of rows inserted. Nothing is sent for empty input.
pub(crate) async fn bulk_insert(
    conn: &mut BackendConnection,
    table_name: &str,
    columns: &[String],
    rows: Vec<Vec<RowValues>>,
    options: &BulkCopyOptions,
) -> Result<usize, SqlHelperError> {
    if rows.is_empty() {
        debug!(table = table_name, "bulk load with no rows; nothing to do");
        return Ok(0);
    }
    let target = options.qualify(table_name);
    let identity = conn.identity_columns(&target).await?;
    let plan = plan_inserts(conn.database_type(), &target, columns, rows, &identity, options)?;

    conn.begin_transaction().await?;
    let outcome = match run_plan(conn, &plan).await {
        Ok(inserted) => conn.commit().await.map(|()| inserted),
        Err(err) => Err(err),
    };
    match outcome {
        Ok(inserted) => {
            info!(
                table = %target,
                rows = inserted,
                batches = plan.batches.len(),
                "bulk load committed"
            );
            Ok(inserted)
        }
        Err(err) => {
            warn!(table = %target, error = %err, "bulk load failed; rolling back");
            if let Err(rollback_err) = conn.rollback().await {
                warn!(table = %target, error = %rollback_err, "rollback after failed bulk load also failed");
            }
            if let Some(off) = &plan.identity_insert_off {
                if let Err(off_err) = conn.execute_batch(off).await {
                    warn!(table = %target, error = %off_err, "could not switch IDENTITY_INSERT back off");
                }
            }
            Err(err)
        }
    }
}

async fn run_plan(conn: &mut BackendConnection, plan: &InsertPlan) -> Result<usize, SqlHelperError> {
    if let Some(on) = &plan.identity_insert_on {
        conn.execute_batch(on).await?;
    }
    let mut inserted = 0;
    for (n, batch) in plan.batches.iter().enumerate() {
        debug!(batch = n + 1, rows = batch.rows, params = batch.params.len(), "writing bulk batch");
        conn.execute_statement(&batch.sql, &batch.params).await?;
        inserted += batch.rows;
    }
    if let Some(off) = &plan.identity_insert_off {
        conn.execute_batch(off).await?;
    }
    Ok(inserted)
}

/// One `INSERT` statement of a bulk load.
#[derive(Debug, Clone, PartialEq)]
struct InsertBatch {
    sql: String,
    params: Vec<RowValues>,
    rows: usize,
}

#[derive(Debug)]
struct InsertPlan {
    batches: Vec<InsertBatch>,
    identity_insert_on: Option<String>,
    identity_insert_off: Option<String>,
}

fn plan_inserts(
    db: DatabaseType,
    target: &str,
    columns: &[String],
    rows: Vec<Vec<RowValues>>,
    identity: &[String],
    options: &BulkCopyOptions,
) -> Result<InsertPlan, SqlHelperError> {
    let keep_identity = options.flags.contains(BulkCopyFlags::KEEP_IDENTITY);
    let keep_nulls = options.flags.contains(BulkCopyFlags::KEEP_NULLS);
    let is_identity = |column: &str| identity.iter().any(|id| id.eq_ignore_ascii_case(column));

    let kept: Vec<usize> = (0..columns.len())
        .filter(|&i| keep_identity || !is_identity(&columns[i]))
        .collect();
    if kept.is_empty() {
        return Err(SqlHelperError::ParameterError(format!(
            "no insertable columns for {target} once identity columns are left out"
        )));
    }
    let identity_kept = keep_identity && kept.iter().any(|&i| is_identity(&columns[i]));
    let kept_names: Vec<&str> = kept.iter().map(|&i| columns[i].as_str()).collect();

    let quoted_target = quote_qualified(db, target);
    let overriding = if identity_kept && is_postgres(db) {
        " OVERRIDING SYSTEM VALUE"
    } else {
        ""
    };
    let head = format!(
        "INSERT INTO {quoted_target} ({}){overriding}",
        quote_list(db, &kept_names)
    );
    let rows_per_statement = rows_per_statement(db, kept.len(), options.batch_size)?;
    // SQLite has no DEFAULT keyword inside VALUES; rows with NULLs go alone without those columns.
    let omit_nulls = !keep_nulls && is_sqlite(db);
    let nulls = if !keep_nulls {
        NullCell::Default
    } else if is_mssql(db) {
        // A bound NULL arrives as nvarchar, which SQL Server will not convert to varbinary.
        NullCell::Literal
    } else {
        NullCell::Bind
    };

    let mut batches = Vec::new();
    let mut pending: Vec<Vec<RowValues>> = Vec::new();
    for mut row in rows {
        let projected: Vec<RowValues> = kept
            .iter()
            .map(|&i| row.get_mut(i).map_or(RowValues::Null, |v| std::mem::replace(v, RowValues::Null)))
            .collect();
        if omit_nulls && projected.iter().any(RowValues::is_null) {
            if !pending.is_empty() {
                batches.push(build_insert(db, &head, std::mem::take(&mut pending), nulls));
            }
            batches.push(build_sparse_insert(db, &quoted_target, overriding, &kept_names, projected));
        } else {
            pending.push(projected);
            if pending.len() == rows_per_statement {
                batches.push(build_insert(db, &head, std::mem::take(&mut pending), nulls));
            }
        }
    }
    if !pending.is_empty() {
        batches.push(build_insert(db, &head, pending, nulls));
    }

    let (identity_insert_on, identity_insert_off) = if identity_kept && is_mssql(db) {
        (
            Some(format!("SET IDENTITY_INSERT {quoted_target} ON")),
            Some(format!("SET IDENTITY_INSERT {quoted_target} OFF")),
        )
    } else {
        (None, None)
    };

    Ok(InsertPlan {
        batches,
        identity_insert_on,
        identity_insert_off,
    })
}

/// How a NULL cell is written into a `VALUES` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullCell {
    /// `DEFAULT`, so the column default applies
    Default,
    /// an untyped `NULL` literal
    Literal,
    /// a bound parameter
    Bind,
}

fn build_insert(
    db: DatabaseType,
    head: &str,
    rows: Vec<Vec<RowValues>>,
    nulls: NullCell,
) -> InsertBatch {
    let row_count = rows.len();
    let mut sql = String::with_capacity(head.len() + row_count * 16);
    sql.push_str(head);
    sql.push_str(" VALUES ");
    let mut params = Vec::new();
    for (r, row) in rows.into_iter().enumerate() {
        if r > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (c, value) in row.into_iter().enumerate() {
            if c > 0 {
                sql.push_str(", ");
            }
            match (value.is_null(), nulls) {
                (true, NullCell::Default) => sql.push_str("DEFAULT"),
                (true, NullCell::Literal) => sql.push_str("NULL"),
                _ => {
                    params.push(value);
                    push_placeholder(db, &mut sql, params.len());
                }
            }
        }
        sql.push(')');
    }
    InsertBatch {
        sql,
        params,
        rows: row_count,
    }
}

fn build_sparse_insert(
    db: DatabaseType,
    quoted_target: &str,
    overriding: &str,
    names: &[&str],
    values: Vec<RowValues>,
) -> InsertBatch {
    let (present, params): (Vec<&str>, Vec<RowValues>) = names
        .iter()
        .zip(values)
        .filter(|(_, v)| !v.is_null())
        .map(|(n, v)| (*n, v))
        .unzip();
    if present.is_empty() {
        return InsertBatch {
            sql: format!("INSERT INTO {quoted_target}{overriding} DEFAULT VALUES"),
            params,
            rows: 1,
        };
    }
    let head = format!("INSERT INTO {quoted_target} ({}){overriding}", quote_list(db, &present));
    build_insert(db, &head, vec![params], NullCell::Bind)
}

/// Largest number of rows one statement may carry for `columns` values per row.
fn rows_per_statement(
    db: DatabaseType,
    columns: usize,
    batch_size: usize,
) -> Result<usize, SqlHelperError> {
    let (max_params, max_rows) = statement_limits(db);
    let by_params = max_params / columns;
    if by_params == 0 {
        return Err(SqlHelperError::ParameterError(format!(
            "{columns} columns exceed the {max_params} parameters one statement can bind"
        )));
    }
    Ok(batch_size.max(1).min(by_params).min(max_rows))
}

fn statement_limits(db: DatabaseType) -> (usize, usize) {
    match db {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => (999, usize::MAX),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => (65_535, usize::MAX),
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => (2_100, 1_000),
    }
}

fn push_placeholder(db: DatabaseType, sql: &mut String, n: usize) {
    let _ = match db {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => write!(sql, "?{n}"),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => write!(sql, "${n}"),
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => write!(sql, "@P{n}"),
    };
}

fn quote_ident(db: DatabaseType, ident: &str) -> String {
    let ident = ident.trim();
    let already_quoted = (ident.starts_with('"') && ident.ends_with('"'))
        || (ident.starts_with('[') && ident.ends_with(']'));
    if already_quoted && ident.len() > 1 {
        return ident.to_string();
    }
    if is_mssql(db) {
        format!("[{}]", ident.replace(']', "]]"))
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

fn quote_qualified(db: DatabaseType, name: &str) -> String {
    name.split('.')
        .map(|part| quote_ident(db, part))
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_list(db: DatabaseType, names: &[&str]) -> String {
    names
        .iter()
        .map(|n| quote_ident(db, n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(unreachable_patterns)]
fn is_sqlite(db: DatabaseType) -> bool {
    match db {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => true,
        _ => false,
    }
}

#[allow(unreachable_patterns)]
fn is_postgres(db: DatabaseType) -> bool {
    match db {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => true,
        _ => false,
    }
}

#[allow(unreachable_patterns)]
fn is_mssql(db: DatabaseType) -> bool {
    match db {
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn int_rows(n: i64) -> Vec<Vec<RowValues>> {
        (0..n)
            .map(|i| vec![RowValues::Int(i), RowValues::Text(format!("r{i}"))])
            .collect()
    }

    #[test]
    fn flags_combine_as_a_union() {
        let both = BulkCopyFlags::KEEP_NULLS | BulkCopyFlags::KEEP_IDENTITY;
        assert!(both.contains(BulkCopyFlags::KEEP_NULLS));
        assert!(both.contains(BulkCopyFlags::KEEP_IDENTITY));
        assert_eq!(both.bits(), 0b1001);
        assert!((BulkCopyFlags::KEEP_NULLS & BulkCopyFlags::KEEP_IDENTITY).is_empty());
    }

    #[test]
    fn schema_only_qualifies_bare_names() {
        let plain = BulkCopyOptions::default();
        assert_eq!(plain.qualify("orders"), "orders");
        let dbo = plain.with_default_schema("dbo");
        assert_eq!(dbo.qualify("orders"), "dbo.orders");
        assert_eq!(dbo.qualify("audit.orders"), "audit.orders");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_batches_by_batch_size() {
        let options = BulkCopyOptions::default().with_batch_size(2);
        let plan = plan_inserts(
            DatabaseType::Sqlite,
            "items",
            &cols(&["id", "name"]),
            int_rows(5),
            &[],
            &options,
        )
        .unwrap();
        let sizes: Vec<usize> = plan.batches.iter().map(|b| b.rows).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(
            plan.batches[0].sql,
            r#"INSERT INTO "items" ("id", "name") VALUES (?1, ?2), (?3, ?4)"#
        );
        assert_eq!(plan.batches[2].params.len(), 2);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_rows_with_nulls_go_alone() {
        let rows = vec![
            vec![RowValues::Int(1), RowValues::Text("a".into())],
            vec![RowValues::Int(2), RowValues::Null],
            vec![RowValues::Int(3), RowValues::Text("c".into())],
        ];
        let plan = plan_inserts(
            DatabaseType::Sqlite,
            "main.items",
            &cols(&["id", "name"]),
            rows,
            &[],
            &BulkCopyOptions::default(),
        )
        .unwrap();
        let sql: Vec<&str> = plan.batches.iter().map(|b| b.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                r#"INSERT INTO "main"."items" ("id", "name") VALUES (?1, ?2)"#,
                r#"INSERT INTO "main"."items" ("id") VALUES (?1)"#,
                r#"INSERT INTO "main"."items" ("id", "name") VALUES (?1, ?2)"#,
            ]
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn identity_columns_are_dropped_unless_kept() {
        let columns = cols(&["id", "name"]);
        let dropped = plan_inserts(
            DatabaseType::Sqlite,
            "items",
            &columns,
            int_rows(1),
            &["ID".to_string()],
            &BulkCopyOptions::default(),
        )
        .unwrap();
        assert_eq!(dropped.batches[0].sql, r#"INSERT INTO "items" ("name") VALUES (?1)"#);
        assert_eq!(dropped.batches[0].params, vec![RowValues::Text("r0".into())]);

        let kept = plan_inserts(
            DatabaseType::Sqlite,
            "items",
            &columns,
            int_rows(1),
            &["id".to_string()],
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_IDENTITY),
        )
        .unwrap();
        assert_eq!(kept.batches[0].params.len(), 2);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn identity_only_table_has_nothing_to_insert() {
        let err = plan_inserts(
            DatabaseType::Sqlite,
            "ids",
            &cols(&["id"]),
            vec![vec![RowValues::Int(1)]],
            &["id".to_string()],
            &BulkCopyOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SqlHelperError::ParameterError(_)));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_nulls_become_default_and_identity_overrides() {
        let rows = vec![
            vec![RowValues::Int(1), RowValues::Null],
            vec![RowValues::Int(2), RowValues::Text("b".into())],
        ];
        let plan = plan_inserts(
            DatabaseType::Postgres,
            "public.items",
            &cols(&["id", "name"]),
            rows,
            &["id".to_string()],
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_IDENTITY),
        )
        .unwrap();
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(
            plan.batches[0].sql,
            r#"INSERT INTO "public"."items" ("id", "name") OVERRIDING SYSTEM VALUE VALUES ($1, DEFAULT), ($2, $3)"#
        );
        assert_eq!(plan.batches[0].params.len(), 3);
        assert!(plan.identity_insert_on.is_none());
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_keep_nulls_binds_nulls() {
        let plan = plan_inserts(
            DatabaseType::Postgres,
            "items",
            &cols(&["id", "name"]),
            vec![vec![RowValues::Int(1), RowValues::Null]],
            &[],
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_NULLS),
        )
        .unwrap();
        assert_eq!(
            plan.batches[0].sql,
            r#"INSERT INTO "items" ("id", "name") VALUES ($1, $2)"#
        );
        assert_eq!(plan.batches[0].params[1], RowValues::Null);
    }

    #[cfg(feature = "mssql")]
    #[test]
    fn mssql_respects_parameter_and_row_limits() {
        assert_eq!(rows_per_statement(DatabaseType::Mssql, 2, 5_000).unwrap(), 1_000);
        assert_eq!(rows_per_statement(DatabaseType::Mssql, 30, 100).unwrap(), 70);
        assert!(rows_per_statement(DatabaseType::Mssql, 2_101, 100).is_err());
    }

    #[cfg(feature = "mssql")]
    #[test]
    fn mssql_identity_insert_wraps_the_load() {
        let plan = plan_inserts(
            DatabaseType::Mssql,
            "dbo.items",
            &cols(&["id", "name"]),
            int_rows(2),
            &["id".to_string()],
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_IDENTITY),
        )
        .unwrap();
        assert_eq!(
            plan.batches[0].sql,
            "INSERT INTO [dbo].[items] ([id], [name]) VALUES (@P1, @P2), (@P3, @P4)"
        );
        assert_eq!(
            plan.identity_insert_on.as_deref(),
            Some("SET IDENTITY_INSERT [dbo].[items] ON")
        );
        assert_eq!(
            plan.identity_insert_off.as_deref(),
            Some("SET IDENTITY_INSERT [dbo].[items] OFF")
        );
    }

    #[cfg(feature = "mssql")]
    #[test]
    fn mssql_keep_nulls_writes_untyped_null_literals() {
        let rows = vec![
            vec![RowValues::Int(1), RowValues::Null],
            vec![RowValues::Int(2), RowValues::Blob(vec![0xde, 0xad])],
        ];
        let plan = plan_inserts(
            DatabaseType::Mssql,
            "dbo.files",
            &cols(&["id", "payload"]),
            rows,
            &[],
            &BulkCopyOptions::default().with_flags(BulkCopyFlags::KEEP_NULLS),
        )
        .unwrap();
        assert_eq!(
            plan.batches[0].sql,
            "INSERT INTO [dbo].[files] ([id], [payload]) VALUES (@P1, NULL), (@P2, @P3)"
        );
        assert!(plan.batches[0].params.iter().all(|v| !v.is_null()));
    }
}
