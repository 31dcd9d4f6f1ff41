use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::{null_as_default, Record};

/// One booking as the scheduling server stores it.
///
/// `date_time` is the combined `scheduledAt` timestamp; the form keeps date
/// and hour apart until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "idAppointment", default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(rename = "idOwner")]
    pub owner_id: String,
    #[serde(rename = "idPet")]
    pub pet_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<String>,
    pub date_time: NaiveDateTime,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "idVeterinarian")]
    pub veterinarian_id: String,
}

pub type AppointmentRecord = Record<Appointment>;

impl AppointmentRecord {
    pub fn id(&self) -> Option<&str> {
        self.data.appointment_id.as_deref()
    }
}
