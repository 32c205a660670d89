use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use super::{Anchor, EmployeeStore, Inserted, PageRequest};
use crate::error::{StoreError, StoreResult};
use crate::model::{Employee, EmployeeFields};
use crate::pager::Boundary;

/// Process-local store for development and tests.
///
/// Records are kept in creation order. The store clock never repeats a
/// millisecond, so `(createdAt, id)` ordering matches insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Employee>,
    clock: i64,
}

impl MemoryState {
    fn tick(&mut self) -> i64 {
        self.clock = Utc::now().timestamp_millis().max(self.clock + 1);
        self.clock
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> StoreResult<usize> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".into())
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn insert(&self, fields: &EmployeeFields) -> StoreResult<Inserted> {
        self.ensure_online()?;
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let created_at = state.tick();
        let id = ObjectId::new().to_hex();
        state.records.push(Employee {
            id: id.clone(),
            fields: fields.clone(),
            created_at,
            updated_at: None,
        });
        Ok(Inserted { id, created_at })
    }

    async fn update(&self, id: &str, fields: &EmployeeFields) -> StoreResult<i64> {
        self.ensure_online()?;
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let updated_at = state.tick();
        let record = state
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.fields = fields.clone();
        record.updated_at = Some(updated_at);
        Ok(updated_at)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Employee>> {
        self.ensure_online()?;
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.records.iter().find(|record| record.id == id).cloned())
    }

    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Vec<Employee>> {
        self.ensure_online()?;
        let state = self.state.read().map_err(Self::poisoned)?;
        let records = state.records.iter();
        let page: Vec<Employee> = match &request.anchor {
            Anchor::Start => records.take(request.limit).cloned().collect(),
            Anchor::After(boundary) => records
                .filter(|record| Boundary::of(record) > *boundary)
                .take(request.limit)
                .cloned()
                .collect(),
            Anchor::From(boundary) => records
                .filter(|record| Boundary::of(record) >= *boundary)
                .take(request.limit)
                .cloned()
                .collect(),
            Anchor::Before(boundary) => {
                let before: Vec<&Employee> = records
                    .filter(|record| Boundary::of(record) < *boundary)
                    .collect();
                let skip = before.len().saturating_sub(request.limit);
                before.into_iter().skip(skip).cloned().collect()
            }
        };
        Ok(page)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.ensure_online()?;
        let mut state = self.state.write().map_err(Self::poisoned)?;
        state.records.retain(|record| record.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{Gender, Role};

    fn fields(name: &str) -> EmployeeFields {
        EmployeeFields {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::Tester,
            skills: "exploratory testing".into(),
            experience: "2".into(),
            gender: Gender::Female,
            join_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            duration: NaiveDate::from_ymd_opt(2025, 7, 6).unwrap(),
            agreement: true,
        }
    }

    async fn seeded(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for n in 0..count {
            store.insert(&fields(&format!("E{n}"))).await.unwrap();
        }
        store
    }

    fn names(page: &[Employee]) -> Vec<&str> {
        page.iter().map(|e| e.fields.name.as_str()).collect()
    }

    #[actix_web::test]
    async fn insert_assigns_distinct_ids_and_increasing_timestamps() {
        let store = MemoryStore::new();
        let a = store.insert(&fields("A")).await.unwrap();
        let b = store.insert(&fields("B")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.created_at > a.created_at);
    }

    #[actix_web::test]
    async fn before_anchor_returns_the_closest_records_in_order() {
        let store = seeded(8).await;
        let all = store
            .fetch_page(&PageRequest { anchor: Anchor::Start, limit: 10 })
            .await
            .unwrap();
        let request = PageRequest {
            anchor: Anchor::Before(Boundary::of(&all[6])),
            limit: 3,
        };
        let page = store.fetch_page(&request).await.unwrap();
        assert_eq!(names(&page), ["E3", "E4", "E5"]);
    }

    #[actix_web::test]
    async fn from_anchor_includes_the_boundary_record() {
        let store = seeded(4).await;
        let all = store
            .fetch_page(&PageRequest { anchor: Anchor::Start, limit: 10 })
            .await
            .unwrap();
        let page = store
            .fetch_page(&PageRequest { anchor: Anchor::From(Boundary::of(&all[1])), limit: 2 })
            .await
            .unwrap();
        assert_eq!(names(&page), ["E1", "E2"]);
    }

    #[actix_web::test]
    async fn update_of_missing_id_is_not_found() {
        let store = seeded(1).await;
        let err = store.update("nope", &fields("X")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[actix_web::test]
    async fn delete_is_idempotent() {
        let store = seeded(2).await;
        let first = store
            .fetch_page(&PageRequest { anchor: Anchor::Start, limit: 1 })
            .await
            .unwrap()
            .remove(0);
        store.delete(&first.id).await.unwrap();
        store.delete(&first.id).await.unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get(&first.id).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn offline_store_rejects_every_operation() {
        let store = seeded(1).await;
        store.set_offline(true);
        assert!(matches!(
            store.insert(&fields("Y")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.delete("any").await.is_err());
        store.set_offline(false);
        assert!(store.insert(&fields("Y")).await.is_ok());
    }

    #[test]
    fn poisoned_lock_is_reported_not_hidden() {
        let store = MemoryStore::new();
        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                let _guard = store.state.write().unwrap();
                panic!("writer died holding the lock");
            });
            assert!(writer.join().is_err());
        });
        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
        assert!(store.is_empty().is_err());
    }
}
