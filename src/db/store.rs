//! Row-level persistence for catalog records
//!
//! A [`Record`] knows its table and how to move between a struct and a
//! Postgres row. [`CatalogStore`] is the seam the service layer works
//! against; [`PgCatalog`] implements it over any tokio-postgres client or
//! transaction.

use crate::error::AppError;
use crate::pagination::PageParams;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, Row};
use tracing::{debug, info};

/// A catalog table row with an integer primary key and audit timestamps
pub trait Record: Clone + Send + Sync + 'static {
    /// Schema-qualified table name
    const TABLE: &'static str;
    /// Writable columns, in the order returned by [`Record::values`]
    const COLUMNS: &'static [&'static str];
    /// Human readable entity name used in error messages
    const KIND: &'static str;

    fn id(&self) -> i32;

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>;

    fn values(&self) -> Vec<&(dyn ToSql + Sync)>;

    /// Value of an integer column, for in-process filtering and ordering
    fn int_column(&self, column: &str) -> Option<i32>;

    /// Assign identity and creation time to a freshly inserted row
    fn stamp(&mut self, id: i32, at: DateTime<Utc>);

    /// Record a modification time
    fn touch(&mut self, at: DateTime<Utc>);
}

/// Declares a catalog record struct together with its [`Record`] impl.
///
/// `id`, `created_at` and `updated_at` are added to every record. Columns
/// listed under `keys` can be used as list filters and sort keys.
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident in $table:literal as $kind:literal {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
        $( keys [ $($key:ident),* $(,)? ] )?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
        pub struct $name {
            pub id: i32,
            $( $(#[$fmeta])* pub $field: $ty, )*
            pub created_at: chrono::DateTime<chrono::Utc>,
            pub updated_at: chrono::DateTime<chrono::Utc>,
        }

        impl $crate::db::store::Record for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),*];
            const KIND: &'static str = $kind;

            fn id(&self) -> i32 {
                self.id
            }

            fn from_row(row: &tokio_postgres::Row) -> Result<Self, tokio_postgres::Error> {
                Ok(Self {
                    id: row.try_get("id")?,
                    $( $field: row.try_get(stringify!($field))?, )*
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            }

            fn values(&self) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
                vec![$( &self.$field as &(dyn tokio_postgres::types::ToSql + Sync) ),*]
            }

            fn int_column(&self, column: &str) -> Option<i32> {
                match column {
                    "id" => Some(self.id),
                    $($( stringify!($key) => Option::<i32>::from(self.$key), )*)?
                    _ => None,
                }
            }

            fn stamp(&mut self, id: i32, at: chrono::DateTime<chrono::Utc>) {
                self.id = id;
                self.created_at = at;
                self.updated_at = at;
            }

            fn touch(&mut self, at: chrono::DateTime<chrono::Utc>) {
                self.updated_at = at;
            }
        }
    };
}

pub(crate) use record;

/// Ordering applied to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first
    NewestFirst,
    /// Ascending on an integer key column
    Ascending(&'static str),
}

impl SortOrder {
    fn as_sql(&self) -> String {
        match self {
            SortOrder::NewestFirst => "created_at DESC, id DESC".to_string(),
            SortOrder::Ascending(column) => format!("{} ASC, id ASC", column),
        }
    }
}

/// A page of rows, optionally restricted to one foreign key value
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filter: Option<(&'static str, i32)>,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl ListQuery {
    pub fn new(page: &PageParams, order: SortOrder) -> Self {
        Self {
            filter: None,
            order,
            limit: page.limit(),
            offset: page.offset(),
        }
    }

    pub fn filter(mut self, column: &'static str, value: i32) -> Self {
        self.filter = Some((column, value));
        self
    }
}

/// Storage operations the service layer needs
#[async_trait]
pub trait CatalogStore: Send {
    /// Live row by id, soft-deleted rows are invisible
    async fn fetch<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError>;

    /// Insert a row, honoring an explicit id when one is supplied
    async fn insert<R: Record>(&mut self, record: R, id: Option<i32>) -> Result<R, AppError>;

    /// Overwrite every writable column of an existing row
    async fn update<R: Record>(&mut self, record: R) -> Result<R, AppError>;

    /// Clear `deleted_at` on a soft-deleted row. `None` when no deleted row
    /// has this id.
    async fn restore<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError>;

    /// One page of rows plus the total row count
    async fn list<R: Record>(&mut self, query: &ListQuery) -> Result<(Vec<R>, i64), AppError>;

    /// All live rows whose integer column equals `value`
    async fn find_by<R: Record>(&mut self, column: &'static str, value: i32) -> Result<Vec<R>, AppError>;
}

/// Fetch a row or fail with 404
pub async fn get_or_404<R: Record, S: CatalogStore + ?Sized>(store: &mut S, id: i32) -> Result<R, AppError> {
    store
        .fetch::<R>(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", R::KIND, id)))
}

/// Postgres-backed store over a pooled client or an open transaction
pub struct PgCatalog<'a, C> {
    client: &'a C,
}

impl<'a, C> PgCatalog<'a, C>
where
    C: GenericClient + Sync,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

// columns such as "user" are reserved words
fn quoted(column: &str) -> String {
    format!("\"{}\"", column)
}

fn write_error(kind: &str, e: tokio_postgres::Error) -> AppError {
    match e.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
            AppError::Conflict(format!("{} already exists", kind))
        }
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            AppError::BadRequest(format!("{} references a record that does not exist", kind))
        }
        Some(code) if *code == SqlState::NOT_NULL_VIOLATION => {
            AppError::Validation(format!("{} is missing a required field", kind))
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl<'a, C> CatalogStore for PgCatalog<'a, C>
where
    C: GenericClient + Sync,
{
    async fn fetch<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL",
            R::TABLE
        );
        let row = self.client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(R::from_row).transpose()?)
    }

    async fn insert<R: Record>(&mut self, record: R, id: Option<i32>) -> Result<R, AppError> {
        let mut columns: Vec<String> = Vec::with_capacity(R::COLUMNS.len() + 1);
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(R::COLUMNS.len() + 1);
        if let Some(id) = id.as_ref() {
            columns.push(quoted("id"));
            params.push(id);
        }
        columns.extend(R::COLUMNS.iter().map(|c| quoted(c)));
        params.extend(record.values());

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            R::TABLE,
            columns.join(", "),
            placeholders(1, params.len())
        );
        let row = self
            .client
            .query_one(sql.as_str(), &params)
            .await
            .map_err(|e| write_error(R::KIND, e))?;

        if id.is_some() {
            // keep the serial ahead of explicitly chosen ids
            let sql = format!(
                "SELECT setval(pg_get_serial_sequence($1, 'id'), (SELECT MAX(id) FROM {}))",
                R::TABLE
            );
            self.client.query_one(sql.as_str(), &[&R::TABLE]).await?;
        }

        let inserted = R::from_row(&row)?;
        debug!(table = R::TABLE, id = inserted.id(), "Inserted row");
        Ok(inserted)
    }

    async fn update<R: Record>(&mut self, record: R) -> Result<R, AppError> {
        let id = record.id();
        let mut params = record.values();
        let assignments = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", quoted(column), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        params.push(&id);

        let sql = format!(
            "UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ${} AND deleted_at IS NULL RETURNING *",
            R::TABLE,
            assignments,
            params.len()
        );
        let row = self
            .client
            .query_opt(sql.as_str(), &params)
            .await
            .map_err(|e| write_error(R::KIND, e))?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", R::KIND, id)))?;

        debug!(table = R::TABLE, id, "Updated row");
        Ok(R::from_row(&row)?)
    }

    async fn restore<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND deleted_at IS NOT NULL RETURNING *",
            R::TABLE
        );
        let row = self.client.query_opt(sql.as_str(), &[&id]).await?;
        if row.is_some() {
            info!(table = R::TABLE, id, "Restored soft-deleted row");
        }
        Ok(row.as_ref().map(R::from_row).transpose()?)
    }

    async fn list<R: Record>(&mut self, query: &ListQuery) -> Result<(Vec<R>, i64), AppError> {
        let mut condition = String::from("deleted_at IS NULL");
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(3);
        if let Some((column, value)) = &query.filter {
            params.push(value);
            condition.push_str(&format!(" AND {} = $1", column));
        }

        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {}", R::TABLE, condition);
        let total: i64 = self.client.query_one(count_sql.as_str(), &params).await?.try_get(0)?;

        params.push(&query.limit);
        params.push(&query.offset);
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            R::TABLE,
            condition,
            query.order.as_sql(),
            params.len() - 1,
            params.len()
        );
        let rows = self.client.query(sql.as_str(), &params).await?;
        let records = rows.iter().map(R::from_row).collect::<Result<Vec<_>, _>>()?;

        Ok((records, total))
    }

    async fn find_by<R: Record>(&mut self, column: &'static str, value: i32) -> Result<Vec<R>, AppError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 AND deleted_at IS NULL ORDER BY id",
            R::TABLE,
            column
        );
        let rows = self.client.query(sql.as_str(), &[&value]).await?;
        Ok(rows.iter().map(R::from_row).collect::<Result<Vec<_>, _>>()?)
    }
}
