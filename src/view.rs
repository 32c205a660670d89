//! State owner for one employee listing session.
//!
//! `EmployeeView` holds the cursor, the loaded page, the filter and the
//! form, and is the only thing that asks the pager for pages. Callers drive
//! it with user actions and drain [`EmployeeView::take_notifications`].

use std::sync::Arc;

use tracing::{error, info};

use crate::error::StoreResult;
use crate::filter::FilterCriteria;
use crate::form::{self, FieldErrors, FormInput, FormMode, SubmitOutcome};
use crate::model::Employee;
use crate::notify::{self, Notification};
use crate::pager::{Direction, PageCursor, PageOutcome, Pager};
use crate::store::EmployeeStore;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub mode: FormMode,
    pub input: FormInput,
    pub errors: FieldErrors,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewStatus {
    #[default]
    Ready,
    /// The last page fetch failed; the displayed records may be stale.
    Failed,
}

pub struct EmployeeView {
    store: Arc<dyn EmployeeStore>,
    pager: Pager,
    cursor: PageCursor,
    loaded: Vec<Employee>,
    filter: FilterCriteria,
    form: FormState,
    status: ViewStatus,
    outbox: Vec<Notification>,
}

impl EmployeeView {
    pub fn new(store: Arc<dyn EmployeeStore>, pager: Pager) -> Self {
        Self {
            store,
            pager,
            cursor: PageCursor::default(),
            loaded: Vec::new(),
            filter: FilterCriteria::default(),
            form: FormState::default(),
            status: ViewStatus::Ready,
            outbox: Vec::new(),
        }
    }

    pub async fn mount(&mut self) -> StoreResult<()> {
        self.navigate(Direction::Initial).await
    }

    pub async fn next(&mut self) -> StoreResult<()> {
        self.navigate(Direction::Next).await
    }

    pub async fn prev(&mut self) -> StoreResult<()> {
        self.navigate(Direction::Prev).await
    }

    async fn navigate(&mut self, direction: Direction) -> StoreResult<()> {
        match self
            .pager
            .fetch(self.store.as_ref(), &self.cursor, direction)
            .await
        {
            Ok(PageOutcome::Loaded { records, cursor }) => {
                self.loaded = records;
                self.cursor = cursor;
                self.status = ViewStatus::Ready;
                Ok(())
            }
            Ok(PageOutcome::Unchanged { cursor }) => {
                self.cursor = cursor;
                Ok(())
            }
            Err(err) => {
                error!(?direction, error = %err, "loading employees failed");
                self.status = ViewStatus::Failed;
                self.outbox.push(Notification::error(notify::LOAD_FAILED));
                Err(err)
            }
        }
    }

    /// Mutations only land in the store; pull the current page again.
    async fn refresh(&mut self) {
        // Failures are already queued as a notification.
        let _ = self.navigate(Direction::Reload).await;
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn loaded(&self) -> &[Employee] {
        &self.loaded
    }

    /// The loaded page narrowed by the current filter.
    pub fn visible(&self) -> Vec<&Employee> {
        self.filter.apply(&self.loaded)
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterCriteria) {
        self.filter = filter;
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn input_mut(&mut self) -> &mut FormInput {
        &mut self.form.input
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    /// Load a record of the current page into the form for editing.
    /// Returns `false` if the id is not on the loaded page.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        let Some(employee) = self.loaded.iter().find(|employee| employee.id == id) else {
            return false;
        };
        self.form = FormState {
            mode: FormMode::Edit {
                target_id: employee.id.clone(),
            },
            input: FormInput::from(&employee.fields),
            errors: FieldErrors::default(),
        };
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form = FormState::default();
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let outcome = form::submit(self.store.as_ref(), &self.form.mode, &self.form.input).await;
        if let Some(notification) = outcome.notification() {
            self.outbox.push(notification);
        }
        match &outcome {
            SubmitOutcome::Invalid(errors) => self.form.errors = errors.clone(),
            _ if outcome.resets_form() => self.form = FormState::default(),
            _ => self.form.errors = FieldErrors::default(),
        }
        if matches!(
            outcome,
            SubmitOutcome::Created(_) | SubmitOutcome::Updated { .. }
        ) {
            self.refresh().await;
        }
        outcome
    }

    pub async fn delete(&mut self, id: &str) -> StoreResult<()> {
        match self.store.delete(id).await {
            Ok(()) => {
                info!(%id, "employee deleted");
                self.outbox.push(Notification::success(notify::DELETED));
                self.refresh().await;
                Ok(())
            }
            Err(err) => {
                error!(%id, error = %err, "deleting employee failed");
                self.outbox.push(Notification::error(notify::DELETE_FAILED));
                Err(err)
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }
}
