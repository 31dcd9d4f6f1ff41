//! Caller identity and role capabilities.
//!
//! Passed into the form and the lifecycle manager at construction instead of
//! being read from ambient session state. Rules, by role:
//! - owner selector: administrator, veterinarian (a client books for themself)
//! - edit: anyone, while the appointment is not terminal
//! - cancel: administrator, client
//! - complete: administrator, veterinarian
//! - delete: administrator

use crate::models::{User, UserRole};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Appointment action gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Cancel,
    Complete,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
            Self::Delete => "delete",
        }
    }
}

/// Which appointments the caller's list screen loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    Owner(String),
    Veterinarian(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user: User,
}

impl CallerContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> &str {
        &self.user.document_number
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    /// Staff pick the client; a client's own identity is pre-filled.
    pub fn can_select_owner(&self) -> bool {
        matches!(self.role(), UserRole::Administrator | UserRole::Veterinarian)
    }

    pub fn allows(&self, action: Action) -> bool {
        match (action, self.role()) {
            (Action::Edit, _) => true,
            (_, UserRole::Administrator) => true,
            (Action::Cancel, UserRole::Client) => true,
            (Action::Complete, UserRole::Veterinarian) => true,
            _ => false,
        }
    }

    pub fn appointment_scope(&self) -> AppointmentScope {
        match self.role() {
            UserRole::Administrator => AppointmentScope::All,
            UserRole::Veterinarian => AppointmentScope::Veterinarian(self.user_id().to_string()),
            UserRole::Client => AppointmentScope::Owner(self.user_id().to_string()),
        }
    }
}
