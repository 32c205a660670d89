//! Persistence seam for employee records.
//!
//! The hosted document database owns id assignment, timestamps and write
//! ordering. Everything above this module talks to an `Arc<dyn EmployeeStore>`.

mod memory;
mod mongo;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::model::{Employee, EmployeeFields};
use crate::pager::Boundary;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Where a page starts relative to an existing record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start,
    /// Records strictly after the boundary.
    After(Boundary),
    /// The last records strictly before the boundary.
    Before(Boundary),
    /// Records at or after the boundary.
    From(Boundary),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub anchor: Anchor,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inserted {
    pub id: String,
    pub created_at: i64,
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Persist a new record. The store picks the id and `createdAt`.
    async fn insert(&self, fields: &EmployeeFields) -> StoreResult<Inserted>;

    /// Overwrite every field of an existing record and return `updatedAt`.
    /// Fails with `StoreError::NotFound` rather than creating the record.
    async fn update(&self, id: &str, fields: &EmployeeFields) -> StoreResult<i64>;

    async fn get(&self, id: &str) -> StoreResult<Option<Employee>>;

    /// Records ordered by `(createdAt, id)` ascending, at most `limit` of them.
    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Vec<Employee>>;

    /// Remove a record. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> StoreResult<()>;
}
