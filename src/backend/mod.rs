//! The record-storage collaborator the scheduling core talks to.
//!
//! Two implementations:
//! - `HttpBackend`: the clinic's REST server via reqwest
//! - `InMemoryBackend`: vectors behind a tokio mutex, for tests and demos

pub mod http;
pub mod memory;

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::{Appointment, AppointmentRecord, Pet, Record, Service, User};

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Body of `GET appointment/available`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlots {
    #[serde(default)]
    pub available_slots: Vec<String>,
}

pub trait SchedulingBackend: Send + Sync {
    fn list_appointments(
        &self,
    ) -> impl Future<Output = Result<Vec<AppointmentRecord>, BackendError>> + Send;

    fn list_appointments_for_owner(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<AppointmentRecord>, BackendError>> + Send;

    fn list_appointments_for_veterinarian(
        &self,
        veterinarian_id: &str,
    ) -> impl Future<Output = Result<Vec<AppointmentRecord>, BackendError>> + Send;

    /// Free hours for a veterinarian on a date. A day with no configured
    /// schedule is an error, not an empty list.
    fn available_hours(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<AvailableSlots, BackendError>> + Send;

    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = Result<AppointmentRecord, BackendError>> + Send;

    /// Full replace of the record identified by `appointment.appointment_id`.
    fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = Result<AppointmentRecord, BackendError>> + Send;

    fn delete_appointment(
        &self,
        appointment_id: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn list_users(&self) -> impl Future<Output = Result<Vec<Record<User>>, BackendError>> + Send;

    fn list_veterinarians(
        &self,
    ) -> impl Future<Output = Result<Vec<Record<User>>, BackendError>> + Send;

    fn list_services(
        &self,
    ) -> impl Future<Output = Result<Vec<Record<Service>>, BackendError>> + Send;

    fn list_pets_for_owner(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<Record<Pet>>, BackendError>> + Send;
}
