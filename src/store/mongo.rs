use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Anchor, EmployeeStore, Inserted, PageRequest};
use crate::error::{StoreError, StoreResult};
use crate::model::{Employee, EmployeeFields};

/// Employee collection in a hosted MongoDB deployment.
#[derive(Clone, Debug)]
pub struct MongoStore {
    collection: Collection<EmployeeDocument>,
}

#[derive(Debug, Deserialize, Serialize)]
struct EmployeeDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(flatten)]
    fields: EmployeeFields,
    #[serde(rename = "createdAt")]
    created_at: i64,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<i64>,
}

impl From<EmployeeDocument> for Employee {
    fn from(document: EmployeeDocument) -> Self {
        Employee {
            id: document.id.to_hex(),
            fields: document.fields,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

impl MongoStore {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }

    /// Page reads walk `(createdAt, _id)`; back them with a compound index.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let model = IndexModel::builder()
            .keys(doc! { "createdAt": 1, "_id": 1 })
            .build();
        self.collection.create_index(model).await?;
        Ok(())
    }

    fn documents(&self) -> Collection<Document> {
        self.collection.clone_with_type()
    }
}

fn parse_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn fields_document(fields: &EmployeeFields) -> StoreResult<Document> {
    Ok(bson::to_document(fields)?)
}

/// Filter selecting the records on the requested side of a boundary.
/// Ties on `createdAt` are broken by `_id`.
fn anchor_filter(anchor: &Anchor) -> StoreResult<Document> {
    let (boundary, past, tie) = match anchor {
        Anchor::Start => return Ok(Document::new()),
        Anchor::After(boundary) => (boundary, "$gt", "$gt"),
        Anchor::From(boundary) => (boundary, "$gt", "$gte"),
        Anchor::Before(boundary) => (boundary, "$lt", "$lt"),
    };
    let id = parse_id(&boundary.id)?;

    let mut beyond = Document::new();
    beyond.insert(past, boundary.created_at);
    let mut tied = Document::new();
    tied.insert(tie, id);

    Ok(doc! {
        "$or": [
            { "createdAt": beyond },
            { "createdAt": boundary.created_at, "_id": tied },
        ]
    })
}

fn sort_order(anchor: &Anchor) -> i32 {
    match anchor {
        Anchor::Before(_) => -1,
        _ => 1,
    }
}

#[async_trait]
impl EmployeeStore for MongoStore {
    async fn insert(&self, fields: &EmployeeFields) -> StoreResult<Inserted> {
        let created_at = Utc::now().timestamp_millis();
        let mut document = fields_document(fields)?;
        document.insert("createdAt", created_at);

        let result = self.documents().insert_one(document).await?;
        let id = result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| StoreError::InvalidId(result.inserted_id.to_string()))?;
        Ok(Inserted { id, created_at })
    }

    async fn update(&self, id: &str, fields: &EmployeeFields) -> StoreResult<i64> {
        // An id the database could never have issued cannot name a document.
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let updated_at = Utc::now().timestamp_millis();
        let mut set = fields_document(fields)?;
        set.insert("updatedAt", updated_at);

        let result = self
            .collection
            .update_one(doc! { "_id": object_id }, doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(updated_at)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Employee>> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        let found = self.collection.find_one(doc! { "_id": object_id }).await?;
        Ok(found.map(Employee::from))
    }

    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Vec<Employee>> {
        let filter = anchor_filter(&request.anchor)?;
        let order = sort_order(&request.anchor);
        let limit = i64::try_from(request.limit).unwrap_or(i64::MAX);
        debug!(?filter, limit, "fetching employee page");

        let mut page: Vec<Employee> = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": order, "_id": order })
            .limit(limit)
            .await?
            .map_ok(Employee::from)
            .try_collect()
            .await?;
        if order < 0 {
            page.reverse();
        }
        Ok(page)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(());
        };
        self.collection
            .delete_one(doc! { "_id": object_id })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::Boundary;

    const ID: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

    fn boundary() -> Boundary {
        Boundary {
            created_at: 1_700_000_000_000,
            id: ID.to_string(),
        }
    }

    #[test]
    fn start_anchor_matches_everything() {
        assert_eq!(anchor_filter(&Anchor::Start).unwrap(), Document::new());
    }

    #[test]
    fn after_anchor_breaks_ties_on_id() {
        let oid = ObjectId::parse_str(ID).unwrap();
        let filter = anchor_filter(&Anchor::After(boundary())).unwrap();
        assert_eq!(
            filter,
            doc! {
                "$or": [
                    { "createdAt": { "$gt": 1_700_000_000_000_i64 } },
                    { "createdAt": 1_700_000_000_000_i64, "_id": { "$gt": oid } },
                ]
            }
        );
    }

    #[test]
    fn from_anchor_includes_the_boundary_id() {
        let oid = ObjectId::parse_str(ID).unwrap();
        let filter = anchor_filter(&Anchor::From(boundary())).unwrap();
        assert_eq!(
            filter,
            doc! {
                "$or": [
                    { "createdAt": { "$gt": 1_700_000_000_000_i64 } },
                    { "createdAt": 1_700_000_000_000_i64, "_id": { "$gte": oid } },
                ]
            }
        );
    }

    #[test]
    fn before_anchor_sorts_descending() {
        assert_eq!(sort_order(&Anchor::Before(boundary())), -1);
        assert_eq!(sort_order(&Anchor::After(boundary())), 1);
    }

    #[test]
    fn foreign_ids_are_rejected_in_cursors() {
        let bad = Boundary {
            created_at: 1,
            id: "not-an-object-id".into(),
        };
        let err = anchor_filter(&Anchor::After(bad)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[test]
    fn documents_keep_camel_case_field_names() {
        let document = EmployeeDocument {
            id: ObjectId::parse_str(ID).unwrap(),
            fields: EmployeeFields {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role: crate::model::Role::Developer,
                skills: "rust".into(),
                experience: "4".into(),
                gender: crate::model::Gender::Female,
                join_date: chrono::NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
                duration: chrono::NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
                agreement: true,
            },
            created_at: 10,
            updated_at: None,
        };
        let encoded = bson::to_document(&document).unwrap();
        assert_eq!(encoded.get_str("joinDate").unwrap(), "2024-11-04");
        assert_eq!(encoded.get_i64("createdAt").unwrap(), 10);
        assert!(!encoded.contains_key("updatedAt"));

        let employee = Employee::from(bson::from_document::<EmployeeDocument>(encoded).unwrap());
        assert_eq!(employee.id, ID);
        assert_eq!(employee.fields.name, "Ada");
    }
}
