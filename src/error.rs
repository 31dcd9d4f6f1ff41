//! Error types for the scheduling core.
//!
//! `BackendError` covers anything the record-storage collaborator can
//! report. `ValidationError` is local and field-scoped, it never reaches the
//! network. `SchedulingError` is what operation handlers return.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{AppointmentStatus, UserRole};

/// Shown when the server gives no usable message of its own.
pub const GENERIC_SERVER_MESSAGE: &str = "Error communicating with the server";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Cannot connect to scheduling server at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Scheduling server returned {status}")]
    Server {
        status: u16,
        title: Option<String>,
        detail: Option<String>,
    },

    #[error("Failed to parse server response: {0}")]
    ResponseParsing(String),

    #[error("No schedule configured for veterinarian {veterinarian_id} on {date}")]
    NoSchedule {
        veterinarian_id: String,
        date: NaiveDate,
    },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

impl BackendError {
    /// Message the server itself supplied, as `"title. detail"`.
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Server {
                title: Some(title), detail, ..
            } => Some(match detail.as_deref().filter(|d| !d.is_empty()) {
                Some(detail) => format!("{title}. {detail}"),
                None => title.clone(),
            }),
            Self::Server { status: 401, .. } => {
                Some("You are not allowed to perform this action".into())
            }
            _ => None,
        }
    }

    /// True when the failure happened before the server could answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::HttpClient(_) | Self::ResponseParsing(_)
        )
    }
}

/// Required inputs of the appointment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Owner,
    Pet,
    Service,
    Veterinarian,
    Date,
    Hour,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Pet => "pet",
            Self::Service => "service",
            Self::Veterinarian => "veterinarian",
            Self::Date => "date",
            Self::Hour => "hour",
        }
    }

    /// Message shown under an empty required field.
    pub fn required_message(&self) -> &'static str {
        match self {
            Self::Owner => "A client must be selected",
            Self::Pet => "A pet must be selected",
            Self::Service => "A service must be selected",
            Self::Veterinarian => "A veterinarian must be selected",
            Self::Date => "A date must be selected",
            Self::Hour => "An available hour must be selected",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn required(field: Field) -> Self {
        Self {
            field,
            message: field.required_message().into(),
        }
    }

    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Role {} may not {action} appointments", .role.as_str())]
    Forbidden { role: UserRole, action: &'static str },

    #[error("Appointment {id} is {} and can no longer change", .status.label())]
    TerminalStatus {
        id: String,
        status: AppointmentStatus,
    },

    #[error("Appointment not found in the current list: {0}")]
    NotFound(String),

    #[error("Appointment has not been saved yet")]
    NotPersisted,
}

impl SchedulingError {
    /// Best user-facing message: the server's own words when present,
    /// otherwise `fallback` for remote failures.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Backend(e) => e.server_message().unwrap_or_else(|| fallback.to_string()),
            Self::Validation(e) => e.message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_joins_title_and_detail() {
        let err = BackendError::Server {
            status: 400,
            title: Some("Pet not found".into()),
            detail: Some("id p-9".into()),
        };
        assert_eq!(err.server_message().as_deref(), Some("Pet not found. id p-9"));
    }

    #[test]
    fn server_message_without_detail_is_title() {
        let err = BackendError::Server {
            status: 400,
            title: Some("Bad request".into()),
            detail: Some(String::new()),
        };
        assert_eq!(err.server_message().as_deref(), Some("Bad request"));
    }

    #[test]
    fn unauthorized_without_title_gets_permission_message() {
        let err = BackendError::Server { status: 401, title: None, detail: None };
        assert!(err.server_message().unwrap().contains("not allowed"));
    }

    #[test]
    fn user_message_falls_back_for_transport_errors() {
        let err = SchedulingError::from(BackendError::Connection("http://x".into()));
        assert_eq!(err.user_message("Could not create appointment"), "Could not create appointment");
    }

    #[test]
    fn user_message_for_validation_is_field_message() {
        let err = SchedulingError::from(ValidationError::required(Field::Pet));
        assert_eq!(err.user_message("unused"), "A pet must be selected");
    }

    #[test]
    fn transport_classification() {
        assert!(BackendError::HttpClient("timeout".into()).is_transport());
        assert!(!BackendError::Server { status: 500, title: None, detail: None }.is_transport());
    }
}
