//! In-memory scheduling backend.
//!
//! Mirrors the server's observable behaviour closely enough to drive the
//! form and lifecycle code end to end: ids are assigned on create, a pet
//! must belong to the appointment's owner, and free hours are the configured
//! slots minus hours already booked by non-cancelled appointments.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AvailableSlots, SchedulingBackend};
use crate::error::BackendError;
use crate::models::{
    Appointment, AppointmentRecord, AppointmentStatus, Meta, Pet, Record, Service, User,
};

/// How an injected failure surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The server answers with a 500 and a title.
    Server,
    /// The request never reaches the server.
    Transport,
}

#[derive(Debug, Default)]
struct Store {
    appointments: Vec<AppointmentRecord>,
    users: Vec<User>,
    veterinarians: Vec<User>,
    services: Vec<Service>,
    pets: Vec<Pet>,
    schedules: HashMap<(String, NaiveDate), Vec<String>>,
    latency: HashMap<(String, NaiveDate), Duration>,
    failures: HashMap<&'static str, FailureMode>,
    calls: Vec<&'static str>,
}

impl Store {
    /// Record the call and return the injected failure for it, if any.
    fn enter(&mut self, op: &'static str) -> Result<(), BackendError> {
        self.calls.push(op);
        match self.failures.get(op) {
            None => Ok(()),
            Some(FailureMode::Server) => Err(BackendError::Server {
                status: 500,
                title: Some(format!("{op} failed")),
                detail: None,
            }),
            Some(FailureMode::Transport) => {
                Err(BackendError::Connection("memory://scheduling".into()))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = User>) -> Self {
        self.store.get_mut().users.extend(users);
        self
    }

    pub fn with_veterinarians(mut self, vets: impl IntoIterator<Item = User>) -> Self {
        self.store.get_mut().veterinarians.extend(vets);
        self
    }

    pub fn with_services(mut self, services: impl IntoIterator<Item = Service>) -> Self {
        self.store.get_mut().services.extend(services);
        self
    }

    pub fn with_pets(mut self, pets: impl IntoIterator<Item = Pet>) -> Self {
        self.store.get_mut().pets.extend(pets);
        self
    }

    pub fn with_appointments(
        mut self,
        records: impl IntoIterator<Item = AppointmentRecord>,
    ) -> Self {
        self.store.get_mut().appointments.extend(records);
        self
    }

    /// Configure the bookable slots of a veterinarian on a date.
    pub fn with_schedule<S: Into<String>>(
        mut self,
        veterinarian_id: &str,
        date: NaiveDate,
        slots: impl IntoIterator<Item = S>,
    ) -> Self {
        self.store.get_mut().schedules.insert(
            (veterinarian_id.to_string(), date),
            slots.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Delay availability answers for one (veterinarian, date) pair.
    pub fn with_latency(mut self, veterinarian_id: &str, date: NaiveDate, delay: Duration) -> Self {
        self.store
            .get_mut()
            .latency
            .insert((veterinarian_id.to_string(), date), delay);
        self
    }

    /// Make every later call to `op` fail. `op` is the trait method name.
    pub async fn fail(&self, op: &'static str, mode: FailureMode) {
        self.store.lock().await.failures.insert(op, mode);
    }

    pub async fn recover(&self, op: &'static str) {
        self.store.lock().await.failures.remove(op);
    }

    /// Trait methods called so far, in order.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.store.lock().await.calls.clone()
    }

    pub async fn call_count(&self, op: &str) -> usize {
        self.store
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| **c == op)
            .count()
    }

    pub async fn appointments(&self) -> Vec<AppointmentRecord> {
        self.store.lock().await.appointments.clone()
    }
}

fn bad_request(title: String) -> BackendError {
    BackendError::Server {
        status: 400,
        title: Some(title),
        detail: None,
    }
}

fn not_found(id: &str) -> BackendError {
    BackendError::Server {
        status: 404,
        title: Some("Appointment not found".into()),
        detail: Some(format!("No appointment with id {id}")),
    }
}

impl SchedulingBackend for InMemoryBackend {
    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_appointments")?;
        Ok(store.appointments.clone())
    }

    async fn list_appointments_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<AppointmentRecord>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_appointments_for_owner")?;
        Ok(store
            .appointments
            .iter()
            .filter(|r| r.data.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_appointments_for_veterinarian(
        &self,
        veterinarian_id: &str,
    ) -> Result<Vec<AppointmentRecord>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_appointments_for_veterinarian")?;
        Ok(store
            .appointments
            .iter()
            .filter(|r| r.data.veterinarian_id == veterinarian_id)
            .cloned()
            .collect())
    }

    async fn available_hours(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> Result<AvailableSlots, BackendError> {
        let key = (veterinarian_id.to_string(), date);
        let delay = {
            let mut store = self.store.lock().await;
            store.enter("available_hours")?;
            store.latency.get(&key).copied()
        };

        // Lock released while "in flight" so other requests can overtake.
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let store = self.store.lock().await;
        let Some(slots) = store.schedules.get(&key) else {
            return Err(BackendError::NoSchedule {
                veterinarian_id: veterinarian_id.to_string(),
                date,
            });
        };

        let booked: Vec<String> = store
            .appointments
            .iter()
            .map(|r| &r.data)
            .filter(|a| {
                a.veterinarian_id == veterinarian_id
                    && a.date_time.date() == date
                    && a.status != AppointmentStatus::Cancelled
            })
            .map(|a| a.date_time.format("%H:%M").to_string())
            .collect();

        Ok(AvailableSlots {
            available_slots: slots
                .iter()
                .filter(|slot| !booked.contains(slot))
                .cloned()
                .collect(),
        })
    }

    async fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<AppointmentRecord, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("create_appointment")?;

        let pet = store
            .pets
            .iter()
            .find(|p| p.pet_id == appointment.pet_id)
            .ok_or_else(|| bad_request(format!("Pet {} not found", appointment.pet_id)))?;
        if pet.owner_id != appointment.owner_id {
            return Err(bad_request(format!(
                "Pet {} does not belong to owner {}",
                appointment.pet_id, appointment.owner_id
            )));
        }

        let now = Local::now().naive_local();
        let mut data = appointment.clone();
        data.appointment_id = Some(Uuid::new_v4().to_string());
        let record = Record {
            data,
            meta: Meta {
                creation_date: Some(now),
                last_update: Some(now),
                source: Some("memory".into()),
                ..Meta::default()
            },
        };
        store.appointments.push(record.clone());
        Ok(record)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<AppointmentRecord, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("update_appointment")?;

        let id = appointment
            .appointment_id
            .as_deref()
            .ok_or_else(|| bad_request("idAppointment is required".into()))?;
        let record = store
            .appointments
            .iter_mut()
            .find(|r| r.id() == Some(id))
            .ok_or_else(|| not_found(id))?;

        // Owner is fixed at creation.
        let owner_id = record.data.owner_id.clone();
        record.data = appointment.clone();
        record.data.owner_id = owner_id;
        record.meta.last_update = Some(Local::now().naive_local());
        Ok(record.clone())
    }

    async fn delete_appointment(&self, appointment_id: &str) -> Result<(), BackendError> {
        let mut store = self.store.lock().await;
        store.enter("delete_appointment")?;

        let before = store.appointments.len();
        store.appointments.retain(|r| r.id() != Some(appointment_id));
        if store.appointments.len() == before {
            return Err(not_found(appointment_id));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Record<User>>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_users")?;
        Ok(store.users.iter().cloned().map(Record::new).collect())
    }

    async fn list_veterinarians(&self) -> Result<Vec<Record<User>>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_veterinarians")?;
        Ok(store.veterinarians.iter().cloned().map(Record::new).collect())
    }

    async fn list_services(&self) -> Result<Vec<Record<Service>>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_services")?;
        Ok(store.services.iter().cloned().map(Record::new).collect())
    }

    async fn list_pets_for_owner(&self, owner_id: &str) -> Result<Vec<Record<Pet>>, BackendError> {
        let mut store = self.store.lock().await;
        store.enter("list_pets_for_owner")?;
        Ok(store
            .pets
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .map(Record::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn luna() -> Pet {
        Pet { pet_id: "p1".into(), owner_id: "o1".into(), name: "Luna".into(), weight: 12.0 }
    }

    fn draft(pet_id: &str, owner_id: &str, hour: u32) -> Appointment {
        Appointment {
            appointment_id: None,
            owner_id: owner_id.into(),
            pet_id: pet_id.into(),
            services: vec!["s1".into()],
            date_time: day().and_hms_opt(hour, 0, 0).unwrap(),
            status: AppointmentStatus::Pending,
            notes: None,
            veterinarian_id: "v1".into(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_meta() {
        let backend = InMemoryBackend::new().with_pets([luna()]);
        let record = backend.create_appointment(&draft("p1", "o1", 9)).await.unwrap();
        assert!(record.id().is_some());
        assert!(record.meta.creation_date.is_some());
        assert_eq!(backend.appointments().await.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_pet_of_another_owner() {
        let backend = InMemoryBackend::new().with_pets([luna()]);
        let err = backend.create_appointment(&draft("p1", "o2", 9)).await.unwrap_err();
        assert!(err.server_message().unwrap().contains("does not belong"));
    }

    #[tokio::test]
    async fn booked_hours_are_not_available() {
        let backend = InMemoryBackend::new()
            .with_pets([luna()])
            .with_schedule("v1", day(), ["09:00", "09:30", "10:00"]);
        backend.create_appointment(&draft("p1", "o1", 10)).await.unwrap();

        let slots = backend.available_hours("v1", day()).await.unwrap();
        assert_eq!(slots.available_slots, vec!["09:00", "09:30"]);
    }

    #[tokio::test]
    async fn unscheduled_day_is_an_error() {
        let backend = InMemoryBackend::new();
        let err = backend.available_hours("v1", day()).await.unwrap_err();
        assert!(matches!(err, BackendError::NoSchedule { .. }));
    }

    #[tokio::test]
    async fn injected_failures_and_call_log() {
        let backend = InMemoryBackend::new().with_users([User {
            document_number: "o1".into(),
            name: "Laura".into(),
            last_name: "Pérez".into(),
            role: UserRole::Client,
        }]);
        backend.fail("list_users", FailureMode::Transport).await;
        assert!(backend.list_users().await.unwrap_err().is_transport());

        backend.recover("list_users").await;
        assert_eq!(backend.list_users().await.unwrap().len(), 1);
        assert_eq!(backend.call_count("list_users").await, 2);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend.delete_appointment("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::Server { status: 404, .. }));
    }
}
