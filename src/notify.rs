use serde::Serialize;
use utoipa::ToSchema;

/// How long a client should keep a notification on screen.
pub const AUTO_DISMISS_MS: u64 = 3000;

pub const REGISTERED: &str = "Employee Registered Successfully!";
pub const UPDATED: &str = "Employee Updated Successfully!";
pub const DELETED: &str = "Employee deleted successfully!";
pub const NO_DOCUMENT: &str = "No document to update.";
pub const REQUEST_FAILED: &str = "Error processing request.";
pub const DELETE_FAILED: &str = "Error deleting employee.";
pub const LOAD_FAILED: &str = "Error loading employees.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// A transient, non-blocking message for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "autoDismissMs")]
    pub auto_dismiss_ms: u64,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            auto_dismiss_ms: AUTO_DISMISS_MS,
        }
    }
}
