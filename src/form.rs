//! Registration form: validation and dispatch to the store.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::model::{EmployeeFields, Gender, Role};
use crate::notify::{self, Notification};
use crate::store::{EmployeeStore, Inserted};

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

/// Which record, if any, a submit will overwrite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Create,
    Edit { target_id: String },
}

/// Raw form input, as typed. Nothing is guaranteed until [`FormInput::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct FormInput {
    pub name: String,
    pub email: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub role: Option<Role>,
    pub skills: String,
    pub experience: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub gender: Option<Gender>,
    #[serde(rename = "joinDate", deserialize_with = "blank_as_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub join_date: Option<NaiveDate>,
    #[serde(deserialize_with = "blank_as_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub duration: Option<NaiveDate>,
    pub agreement: bool,
}

/// Unselected choices arrive as `""` (or `null`); both mean "nothing picked".
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

impl From<&EmployeeFields> for FormInput {
    fn from(fields: &EmployeeFields) -> Self {
        Self {
            name: fields.name.clone(),
            email: fields.email.clone(),
            role: Some(fields.role),
            skills: fields.skills.clone(),
            experience: fields.experience.clone(),
            gender: Some(fields.gender),
            join_date: Some(fields.join_date),
            duration: Some(fields.duration),
            agreement: fields.agreement,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Email,
    Role,
    Skills,
    Experience,
    Gender,
    /// Covers both ends of the join/duration date range.
    JoinDate,
    Agreement,
}

impl Field {
    pub fn message(self) -> &'static str {
        match self {
            Field::Name => "Name is required.",
            Field::Email => "Valid email is required.",
            Field::Role => "Please select a role.",
            Field::Skills => "Please enter at least one skill.",
            Field::Experience => "Please enter your experience.",
            Field::Gender => "Please select a gender.",
            Field::JoinDate => "Please select a date range.",
            Field::Agreement => "You must agree to the terms.",
        }
    }
}

/// Per-field validation messages, serialized as `{ "email": "..." }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    fn flag(&mut self, field: Field) {
        self.0.insert(field, field.message());
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FormInput {
    pub fn validate(&self) -> Result<EmployeeFields, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.flag(Field::Name);
        }
        if self.email.trim().is_empty() || !EMAIL_SHAPE.is_match(&self.email) {
            errors.flag(Field::Email);
        }
        if self.role.is_none() {
            errors.flag(Field::Role);
        }
        if self.skills.trim().is_empty() {
            errors.flag(Field::Skills);
        }
        if self.experience.trim().is_empty() {
            errors.flag(Field::Experience);
        }
        if self.gender.is_none() {
            errors.flag(Field::Gender);
        }
        if self.join_date.is_none() || self.duration.is_none() {
            errors.flag(Field::JoinDate);
        }
        if !self.agreement {
            errors.flag(Field::Agreement);
        }

        match (self.role, self.gender, self.join_date, self.duration) {
            (Some(role), Some(gender), Some(join_date), Some(duration)) if errors.is_empty() => {
                Ok(EmployeeFields {
                    name: self.name.clone(),
                    email: self.email.clone(),
                    role,
                    skills: self.skills.clone(),
                    experience: self.experience.clone(),
                    gender,
                    join_date,
                    duration,
                    agreement: self.agreement,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Rejected locally; the store was not contacted.
    Invalid(FieldErrors),
    Created(Inserted),
    Updated { id: String, updated_at: i64 },
    /// The record being edited no longer exists.
    Missing { id: String },
    Failed(StoreError),
}

impl SubmitOutcome {
    pub fn notification(&self) -> Option<Notification> {
        match self {
            SubmitOutcome::Invalid(_) => None,
            SubmitOutcome::Created(_) => Some(Notification::success(notify::REGISTERED)),
            SubmitOutcome::Updated { .. } => Some(Notification::success(notify::UPDATED)),
            SubmitOutcome::Missing { .. } => Some(Notification::error(notify::NO_DOCUMENT)),
            SubmitOutcome::Failed(_) => Some(Notification::error(notify::REQUEST_FAILED)),
        }
    }

    /// Whether the form goes back to an empty `Create` form afterwards.
    pub fn resets_form(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Created(_) | SubmitOutcome::Updated { .. } | SubmitOutcome::Missing { .. }
        )
    }
}

/// Validate `input` and, if it passes, create or overwrite a record.
pub async fn submit(store: &dyn EmployeeStore, mode: &FormMode, input: &FormInput) -> SubmitOutcome {
    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            warn!(?errors, "employee form rejected");
            return SubmitOutcome::Invalid(errors);
        }
    };

    match mode {
        FormMode::Create => match store.insert(&fields).await {
            Ok(inserted) => {
                info!(id = %inserted.id, "employee registered");
                SubmitOutcome::Created(inserted)
            }
            Err(err) => {
                error!(error = %err, "registering employee failed");
                SubmitOutcome::Failed(err)
            }
        },
        FormMode::Edit { target_id } => match store.update(target_id, &fields).await {
            Ok(updated_at) => {
                info!(id = %target_id, "employee updated");
                SubmitOutcome::Updated {
                    id: target_id.clone(),
                    updated_at,
                }
            }
            Err(StoreError::NotFound(id)) => {
                warn!(%id, "no employee document to update");
                SubmitOutcome::Missing { id }
            }
            Err(err) => {
                error!(id = %target_id, error = %err, "updating employee failed");
                SubmitOutcome::Failed(err)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use crate::store::{Anchor, MemoryStore, PageRequest};

    fn complete() -> FormInput {
        FormInput {
            name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            role: Some(Role::Manager),
            skills: "COBOL, leadership".into(),
            experience: "9".into(),
            gender: Some(Gender::Female),
            join_date: NaiveDate::from_ymd_opt(2024, 11, 18),
            duration: NaiveDate::from_ymd_opt(2025, 5, 18),
            agreement: true,
        }
    }

    #[test]
    fn complete_input_validates() {
        let fields = complete().validate().unwrap();
        assert_eq!(fields.name, "Grace Hopper");
        assert_eq!(fields.role, Role::Manager);
        assert_eq!(FormInput::from(&fields), complete());
    }

    #[test]
    fn empty_input_flags_every_field() {
        let errors = FormInput::default().validate().unwrap_err();
        assert_eq!(errors.len(), 8);
        assert_eq!(errors.get(Field::JoinDate), Some("Please select a date range."));
    }

    #[test]
    fn unselected_choices_deserialize_as_missing() {
        let input: FormInput = serde_json::from_value(serde_json::json!({
            "name": "", "email": "", "role": "", "skills": "", "experience": "",
            "gender": "", "joinDate": "", "duration": "", "agreement": false
        }))
        .unwrap();
        assert_eq!(input, FormInput::default());
        assert_eq!(input.validate().unwrap_err().len(), 8);

        let picked: FormInput = serde_json::from_value(serde_json::json!({
            "role": "Tester", "gender": "Male", "joinDate": "2025-01-13", "duration": null
        }))
        .unwrap();
        assert_eq!(picked.role, Some(Role::Tester));
        assert_eq!(picked.gender, Some(Gender::Male));
        assert_eq!(picked.join_date, NaiveDate::from_ymd_opt(2025, 1, 13));
        assert_eq!(picked.duration, None);

        let unknown = serde_json::from_value::<FormInput>(serde_json::json!({ "role": "CEO" }));
        assert!(unknown.is_err());
    }

    #[test]
    fn malformed_email_is_the_only_error() {
        let input = FormInput {
            email: "not-an-email".into(),
            ..complete()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), [Field::Email]);
        assert_eq!(errors.get(Field::Email), Some("Valid email is required."));
    }

    #[test]
    fn missing_agreement_is_the_only_error() {
        let input = FormInput {
            agreement: false,
            ..complete()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), [Field::Agreement]);
    }

    #[test]
    fn half_a_date_range_is_rejected() {
        let input = FormInput {
            duration: None,
            ..complete()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), [Field::JoinDate]);
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let input = FormInput {
            name: "   ".into(),
            skills: "\t".into(),
            ..complete()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), [Field::Name, Field::Skills]);
    }

    #[test]
    fn errors_serialize_by_field_name() {
        let errors = FormInput {
            agreement: false,
            ..complete()
        }
        .validate()
        .unwrap_err();
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "agreement": "You must agree to the terms." }));
    }

    #[actix_web::test]
    async fn invalid_submit_never_reaches_the_store() {
        let store = MemoryStore::new();
        let input = FormInput {
            email: "not-an-email".into(),
            ..complete()
        };
        let outcome = submit(&store, &FormMode::Create, &input).await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert_eq!(outcome.notification(), None);
        assert!(!outcome.resets_form());
        assert!(store.is_empty().unwrap());
    }

    #[actix_web::test]
    async fn created_record_reads_back_unchanged() {
        let store = MemoryStore::new();
        let outcome = submit(&store, &FormMode::Create, &complete()).await;
        let SubmitOutcome::Created(inserted) = &outcome else {
            panic!("expected a created record, got {outcome:?}");
        };
        assert_eq!(
            outcome.notification().map(|n| n.message),
            Some(notify::REGISTERED.to_string())
        );

        let page = store
            .fetch_page(&PageRequest {
                anchor: Anchor::Start,
                limit: 5,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, inserted.id);
        assert_eq!(page[0].created_at, inserted.created_at);
        assert_eq!(page[0].fields, complete().validate().unwrap());
    }

    #[actix_web::test]
    async fn edit_overwrites_the_target() {
        let store = MemoryStore::new();
        let inserted = store.insert(&complete().validate().unwrap()).await.unwrap();
        let mode = FormMode::Edit {
            target_id: inserted.id.clone(),
        };
        let input = FormInput {
            experience: "10".into(),
            ..complete()
        };
        let outcome = submit(&store, &mode, &input).await;
        assert!(matches!(&outcome, SubmitOutcome::Updated { id, .. } if *id == inserted.id));

        let stored = store.get(&inserted.id).await.unwrap().unwrap();
        assert_eq!(stored.fields.experience, "10");
        assert!(stored.updated_at.is_some());
    }

    #[actix_web::test]
    async fn editing_a_deleted_record_reports_missing() {
        let store = MemoryStore::new();
        let inserted = store.insert(&complete().validate().unwrap()).await.unwrap();
        store.delete(&inserted.id).await.unwrap();

        let mode = FormMode::Edit {
            target_id: inserted.id.clone(),
        };
        let outcome = submit(&store, &mode, &complete()).await;
        assert!(matches!(&outcome, SubmitOutcome::Missing { id } if *id == inserted.id));
        let notification = outcome.notification().unwrap();
        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(notification.message, "No document to update.");
        assert!(store.is_empty().unwrap());
    }

    #[actix_web::test]
    async fn store_failure_keeps_the_form() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let outcome = submit(&store, &FormMode::Create, &complete()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(StoreError::Unavailable(_))));
        assert!(!outcome.resets_form());
        assert_eq!(
            outcome.notification().map(|n| n.message),
            Some(notify::REQUEST_FAILED.to_string())
        );
    }
}
