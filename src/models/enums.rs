use crate::error::BackendError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The literal doubles as the serde wire name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = BackendError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(BackendError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "PENDIENTE",
    Confirmed => "CONFIRMADA",
    Completed => "FINALIZADA",
    Cancelled => "CANCELADA",
});

str_enum!(UserRole {
    Administrator => "ADMINISTRADOR",
    Veterinarian => "VETERINARIO",
    Client => "CLIENTE",
});

impl AppointmentStatus {
    /// Completed and cancelled appointments accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Human-readable label for list badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn appointment_status_round_trip() {
        for (variant, s) in [
            (AppointmentStatus::Pending, "PENDIENTE"),
            (AppointmentStatus::Confirmed, "CONFIRMADA"),
            (AppointmentStatus::Completed, "FINALIZADA"),
            (AppointmentStatus::Cancelled, "CANCELADA"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AppointmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn user_role_serializes_as_wire_name() {
        let json = serde_json::to_string(&UserRole::Veterinarian).unwrap();
        assert_eq!(json, "\"VETERINARIO\"");
        let role: UserRole = serde_json::from_str("\"CLIENTE\"").unwrap();
        assert_eq!(role, UserRole::Client);
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(!AppointmentStatus::Pending.is_terminal());
        assert!(!AppointmentStatus::Confirmed.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn default_status_is_pending() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(AppointmentStatus::from_str("pending").is_err());
        assert!(UserRole::from_str("").is_err());
    }
}
