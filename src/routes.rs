use std::collections::BTreeSet;
use std::sync::Arc;

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::{ParseEnumError, StoreError};
use crate::filter::FilterCriteria;
use crate::form::{self, FieldErrors, FormInput, FormMode, SubmitOutcome};
use crate::model::{Employee, EmployeeFields, Gender, Role};
use crate::notify::{self, Notification, Severity};
use crate::pager::{Boundary, Direction, PageCursor, PageOutcome, Pager};
use crate::store::EmployeeStore;

/// Shared by every handler.
pub struct AppState {
    pub store: Arc<dyn EmployeeStore>,
    pub pager: Pager,
}

impl AppState {
    pub fn new(store: Arc<dyn EmployeeStore>, page_size: usize) -> Self {
        Self {
            store,
            pager: Pager::new(page_size),
        }
    }
}

/// Paging position and filter for one listing request.
///
/// The cursor fields echo the `cursor` of the previous response.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default)]
    pub direction: Direction,
    /// First record of the displayed page, as returned in `cursor.first`.
    #[param(value_type = Option<String>)]
    pub first: Option<Boundary>,
    /// Last record of the displayed page, as returned in `cursor.last`.
    #[param(value_type = Option<String>)]
    pub last: Option<Boundary>,
    pub is_first_page: Option<bool>,
    pub is_last_page: Option<bool>,
    /// Comma-separated roles, e.g. `Developer,Tester`.
    pub roles: Option<String>,
    /// Experience ceiling in years; `0` or absent means no limit.
    pub max_experience: Option<u32>,
    #[param(value_type = Option<String>, format = Date)]
    pub joined_after: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub joined_before: Option<NaiveDate>,
    pub name: Option<String>,
}

impl PageQuery {
    pub fn cursor(&self) -> PageCursor {
        let initial = PageCursor::default();
        PageCursor {
            first: self.first.clone(),
            last: self.last.clone(),
            is_first_page: self.is_first_page.unwrap_or(initial.is_first_page),
            is_last_page: self.is_last_page.unwrap_or(initial.is_last_page),
        }
    }

    pub fn criteria(&self) -> Result<FilterCriteria, ParseEnumError> {
        let roles = self
            .roles
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(str::parse::<Role>)
            .collect::<Result<BTreeSet<Role>, _>>()?;
        Ok(FilterCriteria {
            roles,
            max_experience: self.max_experience.unwrap_or(0),
            joined_after: self.joined_after,
            joined_before: self.joined_before,
            name: self.name.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PageResponse {
    /// `false` when the move was ruled out; keep showing the previous page.
    pub changed: bool,
    /// The fetched page after filtering.
    pub employees: Vec<Employee>,
    pub cursor: PageCursor,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MutationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

#[utoipa::path(
    get,
    path = "/employees",
    params(PageQuery),
    responses(
        (status = 200, description = "Employee page", body = PageResponse),
        (status = 400, description = "Malformed cursor or filter"),
        (status = 500, description = "Store unavailable", body = Notification)
    )
)]
#[get("/employees")]
async fn list_employees(state: web::Data<AppState>, query: web::Query<PageQuery>) -> HttpResponse {
    let query = query.into_inner();
    let criteria = match query.criteria() {
        Ok(criteria) => criteria,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };
    let cursor = query.cursor();

    match state
        .pager
        .fetch(state.store.as_ref(), &cursor, query.direction)
        .await
    {
        Ok(PageOutcome::Loaded { records, cursor }) => HttpResponse::Ok().json(PageResponse {
            changed: true,
            employees: criteria.apply(&records).into_iter().cloned().collect(),
            cursor,
        }),
        Ok(PageOutcome::Unchanged { cursor }) => HttpResponse::Ok().json(PageResponse {
            changed: false,
            employees: Vec::new(),
            cursor,
        }),
        Err(StoreError::InvalidId(id)) => {
            HttpResponse::BadRequest().body(format!("malformed page cursor id {id:?}"))
        }
        Err(err) => {
            error!(error = %err, "loading employees failed");
            HttpResponse::InternalServerError().json(Notification::error(notify::LOAD_FAILED))
        }
    }
}

#[utoipa::path(
    get,
    path = "/employees/{id}",
    params(
        ("id" = String, Path, description = "Store-assigned employee id")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal Server Error")
    )
)]
#[get("/employees/{id}")]
async fn get_employee(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let id = id.into_inner();
    match state.store.get(&id).await {
        Ok(Some(employee)) => HttpResponse::Ok().json(employee),
        Ok(None) => HttpResponse::NotFound().body(format!("No employee found with id {id}")),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[utoipa::path(
    post,
    path = "/employees",
    request_body = FormInput,
    responses(
        (status = 201, description = "Employee registered", body = MutationResponse),
        (status = 422, description = "Validation failed", body = MutationResponse),
        (status = 500, description = "Store failure", body = MutationResponse)
    )
)]
#[post("/employees")]
async fn create_employee(state: web::Data<AppState>, input: web::Json<FormInput>) -> HttpResponse {
    let outcome = form::submit(state.store.as_ref(), &FormMode::Create, &input).await;
    outcome_response(outcome)
}

#[utoipa::path(
    put,
    path = "/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee to overwrite")
    ),
    request_body = FormInput,
    responses(
        (status = 200, description = "Employee updated", body = MutationResponse),
        (status = 404, description = "No document to update", body = MutationResponse),
        (status = 422, description = "Validation failed", body = MutationResponse),
        (status = 500, description = "Store failure", body = MutationResponse)
    )
)]
#[put("/employees/{id}")]
async fn update_employee(
    state: web::Data<AppState>,
    id: web::Path<String>,
    input: web::Json<FormInput>,
) -> HttpResponse {
    let mode = FormMode::Edit {
        target_id: id.into_inner(),
    };
    let outcome = form::submit(state.store.as_ref(), &mode, &input).await;
    outcome_response(outcome)
}

#[utoipa::path(
    delete,
    path = "/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee to remove")
    ),
    responses(
        (status = 200, description = "Employee deleted", body = MutationResponse),
        (status = 500, description = "Store failure", body = MutationResponse)
    )
)]
#[delete("/employees/{id}")]
async fn delete_employee(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let id = id.into_inner();
    match state.store.delete(&id).await {
        Ok(()) => {
            info!(%id, "employee deleted");
            HttpResponse::Ok().json(MutationResponse {
                id: Some(id),
                notification: Some(Notification::success(notify::DELETED)),
                errors: None,
            })
        }
        Err(err) => {
            error!(%id, error = %err, "deleting employee failed");
            HttpResponse::InternalServerError().json(MutationResponse {
                id: Some(id),
                notification: Some(Notification::error(notify::DELETE_FAILED)),
                errors: None,
            })
        }
    }
}

fn outcome_response(outcome: SubmitOutcome) -> HttpResponse {
    let notification = outcome.notification();
    match outcome {
        SubmitOutcome::Invalid(errors) => HttpResponse::UnprocessableEntity().json(MutationResponse {
            id: None,
            notification,
            errors: Some(errors),
        }),
        SubmitOutcome::Created(inserted) => HttpResponse::Created().json(MutationResponse {
            id: Some(inserted.id),
            notification,
            errors: None,
        }),
        SubmitOutcome::Updated { id, .. } => HttpResponse::Ok().json(MutationResponse {
            id: Some(id),
            notification,
            errors: None,
        }),
        SubmitOutcome::Missing { id } => HttpResponse::NotFound().json(MutationResponse {
            id: Some(id),
            notification,
            errors: None,
        }),
        SubmitOutcome::Failed(_) => HttpResponse::InternalServerError().json(MutationResponse {
            id: None,
            notification,
            errors: None,
        }),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(list_employees, get_employee, create_employee, update_employee, delete_employee),
    components(schemas(
        Employee,
        EmployeeFields,
        Role,
        Gender,
        FormInput,
        PageCursor,
        PageResponse,
        MutationResponse,
        Notification,
        Severity,
        Direction
    )),
    tags(
        (name = "employee", description = "Employee registry API")
    )
)]
pub struct ApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_employees)
        .service(get_employee)
        .service(create_employee)
        .service(update_employee)
        .service(delete_employee);
}
