//! In-memory catalog store used by service and route tests

use super::store::{CatalogStore, ListQuery, Record, SortOrder};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Default)]
struct Table {
    last_id: i32,
    rows: BTreeMap<i32, Box<dyn Any + Send + Sync>>,
    deleted: BTreeSet<i32>,
}

impl Table {
    /// Live rows only
    fn records<R: Record>(&self) -> impl Iterator<Item = &R> {
        self.rows
            .iter()
            .filter(|(id, _)| !self.deleted.contains(id))
            .filter_map(|(_, row)| row.downcast_ref::<R>())
    }

    fn live_mut(&mut self, id: i32) -> Option<&mut Box<dyn Any + Send + Sync>> {
        if self.deleted.contains(&id) {
            return None;
        }
        self.rows.get_mut(&id)
    }
}

/// Keeps rows per table in insertion order, ids assigned like a serial column
#[derive(Default)]
pub struct MemoryCatalog {
    tables: HashMap<&'static str, Table>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored for a record type, soft-deleted ones included
    pub fn count<R: Record>(&self) -> usize {
        self.tables.get(R::TABLE).map_or(0, |t| t.rows.len())
    }

    /// Every stored row of a record type, by ascending id
    pub fn all<R: Record>(&self) -> Vec<R> {
        self.tables
            .get(R::TABLE)
            .map(|t| t.records::<R>().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark a row deleted the way `deleted_at` does. Returns false when no
    /// such row exists.
    pub fn soft_delete<R: Record>(&mut self, id: i32) -> bool {
        let table = self.table(R::TABLE);
        table.rows.contains_key(&id) && table.deleted.insert(id)
    }

    fn table(&mut self, name: &'static str) -> &mut Table {
        self.tables.entry(name).or_default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn fetch<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError> {
        Ok(self
            .tables
            .get(R::TABLE)
            .filter(|t| !t.deleted.contains(&id))
            .and_then(|t| t.rows.get(&id))
            .and_then(|row| row.downcast_ref::<R>())
            .cloned())
    }

    async fn insert<R: Record>(&mut self, mut record: R, id: Option<i32>) -> Result<R, AppError> {
        let table = self.table(R::TABLE);
        let id = match id {
            Some(id) if table.rows.contains_key(&id) => {
                return Err(AppError::Conflict(format!("{} already exists", R::KIND)));
            }
            Some(id) => id,
            None => table.last_id + 1,
        };
        table.last_id = table.last_id.max(id);

        record.stamp(id, Utc::now());
        table.rows.insert(id, Box::new(record.clone()));
        Ok(record)
    }

    async fn update<R: Record>(&mut self, mut record: R) -> Result<R, AppError> {
        let table = self.table(R::TABLE);
        let slot = table
            .live_mut(record.id())
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", R::KIND, record.id())))?;

        record.touch(Utc::now());
        *slot = Box::new(record.clone());
        Ok(record)
    }

    async fn restore<R: Record>(&mut self, id: i32) -> Result<Option<R>, AppError> {
        let table = self.table(R::TABLE);
        if !table.deleted.remove(&id) {
            return Ok(None);
        }
        let Some(record) = table.rows.get_mut(&id).and_then(|row| row.downcast_mut::<R>()) else {
            return Ok(None);
        };
        record.touch(Utc::now());
        Ok(Some(record.clone()))
    }

    async fn list<R: Record>(&mut self, query: &ListQuery) -> Result<(Vec<R>, i64), AppError> {
        let mut records: Vec<R> = match self.tables.get(R::TABLE) {
            Some(table) => table
                .records::<R>()
                .filter(|r| match query.filter {
                    Some((column, value)) => r.int_column(column) == Some(value),
                    None => true,
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        match query.order {
            // ids grow with creation time
            SortOrder::NewestFirst => records.sort_by(|a, b| b.id().cmp(&a.id())),
            SortOrder::Ascending(column) => {
                records.sort_by_key(|r| (r.int_column(column), r.id()))
            }
        }

        let total = records.len() as i64;
        let page = records
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by<R: Record>(&mut self, column: &'static str, value: i32) -> Result<Vec<R>, AppError> {
        Ok(self
            .tables
            .get(R::TABLE)
            .map(|t| {
                t.records::<R>()
                    .filter(|r| r.int_column(column) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::get_or_404;
    use crate::models::Domain;
    use crate::pagination::PageParams;

    fn domain(name: &str) -> Domain {
        Domain {
            id: 0,
            name: name.to_string(),
            database: "RAW".to_string(),
            db_schema: "PUBLIC".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_hidden() {
        let mut store = MemoryCatalog::new();
        let kept = store.insert(domain("finance"), None).await.unwrap();
        let gone = store.insert(domain("healthcare"), None).await.unwrap();
        assert!(store.soft_delete::<Domain>(gone.id));

        assert!(store.fetch::<Domain>(gone.id).await.unwrap().is_none());
        assert!(matches!(
            get_or_404::<Domain, _>(&mut store, gone.id).await,
            Err(AppError::NotFound(_))
        ));
        let (rows, total) = store
            .list::<Domain>(&ListQuery::new(&PageParams::default(), SortOrder::NewestFirst))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, kept.id);
        assert!(matches!(store.update(gone.clone()).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.insert(domain("healthcare"), Some(gone.id)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_restore() {
        let mut store = MemoryCatalog::new();
        let row = store.insert(domain("finance"), None).await.unwrap();

        // live rows are not restored
        assert!(store.restore::<Domain>(row.id).await.unwrap().is_none());

        store.soft_delete::<Domain>(row.id);
        let restored = store.restore::<Domain>(row.id).await.unwrap().unwrap();
        assert_eq!(restored.name, "finance");
        assert!(store.fetch::<Domain>(row.id).await.unwrap().is_some());
        assert!(!store.soft_delete::<Domain>(99));
    }
}
