//! Appointment record lifecycle: create, update, status transitions, delete.
//!
//! The manager owns the in-memory mirror of the caller's appointment list and
//! is the only writer to it. Every handler reports its outcome through the
//! [`Notifier`] and returns a typed result; nothing irreversible happens
//! without a [`Confirmer`] saying yes.

use std::sync::Arc;

use chrono::Local;

use crate::backend::SchedulingBackend;
use crate::context::{Action, AppointmentScope, CallerContext};
use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentRecord, AppointmentStatus};
use crate::notice::{ConfirmPrompt, Confirmer, Notice, Notifier};
use crate::selection::ValidSelection;

pub type ChangeListener = Box<dyn Fn(&[AppointmentRecord]) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(AppointmentRecord),
    /// Draft equals the stored record; nothing was sent.
    Unchanged,
    Declined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Transitioned(AppointmentRecord),
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

pub const NO_CHANGES_MESSAGE: &str = "There are no changes to update";

/// Build the wire payload from a validated selection. `base` carries the
/// identity and status of the record being edited.
pub fn normalize(selection: &ValidSelection, base: Option<&Appointment>) -> Appointment {
    Appointment {
        appointment_id: base.and_then(|a| a.appointment_id.clone()),
        owner_id: selection.owner_id.clone(),
        pet_id: selection.pet_id.clone(),
        services: selection.services.clone(),
        date_time: selection.date_time,
        status: base.map(|a| a.status).unwrap_or_default(),
        notes: selection.notes.clone(),
        veterinarian_id: selection.veterinarian_id.clone(),
    }
}

pub struct AppointmentManager<B> {
    backend: Arc<B>,
    context: CallerContext,
    notifier: Arc<dyn Notifier>,
    mirror: Vec<AppointmentRecord>,
    listener: Option<ChangeListener>,
}

impl<B: SchedulingBackend> AppointmentManager<B> {
    pub fn new(backend: Arc<B>, context: CallerContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            context,
            notifier,
            mirror: Vec::new(),
            listener: None,
        }
    }

    /// Called with the whole mirror after every successful mutation.
    pub fn on_change(&mut self, listener: impl Fn(&[AppointmentRecord]) + Send + Sync + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn context(&self) -> &CallerContext {
        &self.context
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn records(&self) -> &[AppointmentRecord] {
        &self.mirror
    }

    pub fn find(&self, appointment_id: &str) -> Option<&AppointmentRecord> {
        self.mirror.iter().find(|r| r.id() == Some(appointment_id))
    }

    /// Replace the mirror with the appointments visible to the caller.
    pub async fn load(&mut self) -> Result<&[AppointmentRecord], SchedulingError> {
        let scope = self.context.appointment_scope();
        let result = match &scope {
            AppointmentScope::All => self.backend.list_appointments().await,
            AppointmentScope::Owner(owner_id) => {
                self.backend.list_appointments_for_owner(owner_id).await
            }
            AppointmentScope::Veterinarian(veterinarian_id) => {
                self.backend
                    .list_appointments_for_veterinarian(veterinarian_id)
                    .await
            }
        };

        match result {
            Ok(records) => {
                tracing::info!(count = records.len(), scope = ?scope, "Appointments loaded");
                self.mirror = records;
                Ok(&self.mirror)
            }
            Err(e) => Err(self.report(e.into(), "Could not load appointments")),
        }
    }

    // ─── Create / update ──────────────────────────────────────────────────

    pub async fn create(
        &mut self,
        selection: &ValidSelection,
    ) -> Result<AppointmentRecord, SchedulingError> {
        let payload = normalize(selection, None);

        let record = match self.backend.create_appointment(&payload).await {
            Ok(record) => record,
            Err(e) => return Err(self.report(e.into(), "Could not create the appointment")),
        };

        tracing::info!(
            appointment_id = record.id().unwrap_or_default(),
            date_time = %record.data.date_time,
            "Appointment created"
        );
        self.mirror.push(record.clone());
        self.notifier.notify(Notice::success("Appointment created"));
        self.changed();
        Ok(record)
    }

    /// Full replace of the record `original` refers to. Status, terminal
    /// check and change detection use the mirror's current copy, not the
    /// one the form was mounted with. An unchanged draft never touches the
    /// network.
    pub async fn update<C: Confirmer>(
        &mut self,
        original: &AppointmentRecord,
        selection: &ValidSelection,
        confirmer: &C,
    ) -> Result<UpdateOutcome, SchedulingError> {
        self.authorize(Action::Edit)?;
        let Some(id) = original.id().map(str::to_string) else {
            return Err(self.report(SchedulingError::NotPersisted, ""));
        };
        let current = self.lookup(&id)?;
        self.ensure_mutable(&id, current.data.status)?;

        let payload = normalize(selection, Some(&current.data));
        if payload == current.data {
            self.notifier.notify(Notice::info(NO_CHANGES_MESSAGE));
            return Ok(UpdateOutcome::Unchanged);
        }

        let prompt = ConfirmPrompt::new("The appointment will be updated", "Yes, update");
        if !confirmer.confirm(&prompt).await {
            tracing::debug!(appointment_id = %id, "Update declined");
            return Ok(UpdateOutcome::Declined);
        }

        let mut record = match self.backend.update_appointment(&payload).await {
            Ok(record) => record,
            Err(e) => return Err(self.report(e.into(), "Could not update the appointment")),
        };

        // An echoed payload carries no meta; keep what the mirror had.
        if record.meta == Default::default() {
            record.meta = current.meta.clone();
            record.meta.last_update = Some(Local::now().naive_local());
        }

        tracing::info!(appointment_id = %id, "Appointment updated");
        self.replace(&id, record.clone());
        self.notifier.notify(Notice::success("Appointment updated"));
        self.changed();
        Ok(UpdateOutcome::Updated(record))
    }

    // ─── Status transitions ───────────────────────────────────────────────

    pub async fn cancel<C: Confirmer>(
        &mut self,
        appointment_id: &str,
        confirmer: &C,
    ) -> Result<TransitionOutcome, SchedulingError> {
        let prompt = ConfirmPrompt::new("The appointment will be cancelled", "Yes, cancel");
        self.transition(appointment_id, Action::Cancel, AppointmentStatus::Cancelled, prompt, confirmer)
            .await
    }

    pub async fn complete<C: Confirmer>(
        &mut self,
        appointment_id: &str,
        confirmer: &C,
    ) -> Result<TransitionOutcome, SchedulingError> {
        let prompt = ConfirmPrompt::new("The appointment will be marked as completed", "Yes, complete");
        self.transition(appointment_id, Action::Complete, AppointmentStatus::Completed, prompt, confirmer)
            .await
    }

    async fn transition<C: Confirmer>(
        &mut self,
        appointment_id: &str,
        action: Action,
        target: AppointmentStatus,
        prompt: ConfirmPrompt,
        confirmer: &C,
    ) -> Result<TransitionOutcome, SchedulingError> {
        self.authorize(action)?;
        let current = self.lookup(appointment_id)?;
        self.ensure_mutable(appointment_id, current.data.status)?;

        if !confirmer.confirm(&prompt).await {
            tracing::debug!(appointment_id, action = action.as_str(), "Status change declined");
            return Ok(TransitionOutcome::Declined);
        }

        let mut payload = current.data.clone();
        payload.status = target;

        if let Err(e) = self.backend.update_appointment(&payload).await {
            let fallback = format!("Could not {} the appointment", action.as_str());
            return Err(self.report(e.into(), &fallback));
        }

        let mut record = current;
        record.data = payload;
        record.meta.last_update = Some(Local::now().naive_local());

        tracing::info!(appointment_id, status = target.as_str(), "Appointment status changed");
        self.replace(appointment_id, record.clone());
        self.notifier
            .notify(Notice::success(format!("Appointment {}", target.label().to_lowercase())));
        self.changed();
        Ok(TransitionOutcome::Transitioned(record))
    }

    // ─── Delete ───────────────────────────────────────────────────────────

    pub async fn delete<C: Confirmer>(
        &mut self,
        appointment_id: &str,
        confirmer: &C,
    ) -> Result<DeleteOutcome, SchedulingError> {
        self.authorize(Action::Delete)?;
        self.lookup(appointment_id)?;

        let prompt = ConfirmPrompt::new("This action cannot be undone", "Yes, delete");
        if !confirmer.confirm(&prompt).await {
            tracing::debug!(appointment_id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(e) = self.backend.delete_appointment(appointment_id).await {
            return Err(self.report(e.into(), "Could not delete the appointment"));
        }

        tracing::info!(appointment_id, "Appointment deleted");
        self.mirror.retain(|r| r.id() != Some(appointment_id));
        self.notifier.notify(Notice::success("Appointment deleted"));
        self.changed();
        Ok(DeleteOutcome::Deleted)
    }

    // ─── Helpers ──────────────────────────────────────────────────────────

    fn authorize(&self, action: Action) -> Result<(), SchedulingError> {
        if self.context.allows(action) {
            return Ok(());
        }
        Err(self.report(
            SchedulingError::Forbidden {
                role: self.context.role(),
                action: action.as_str(),
            },
            "",
        ))
    }

    fn lookup(&self, appointment_id: &str) -> Result<AppointmentRecord, SchedulingError> {
        self.find(appointment_id)
            .cloned()
            .ok_or_else(|| self.report(SchedulingError::NotFound(appointment_id.to_string()), ""))
    }

    fn ensure_mutable(&self, id: &str, status: AppointmentStatus) -> Result<(), SchedulingError> {
        if status.is_terminal() {
            return Err(self.report(
                SchedulingError::TerminalStatus { id: id.to_string(), status },
                "",
            ));
        }
        Ok(())
    }

    fn replace(&mut self, appointment_id: &str, record: AppointmentRecord) {
        match self.mirror.iter_mut().find(|r| r.id() == Some(appointment_id)) {
            Some(slot) => *slot = record,
            None => tracing::warn!(appointment_id, "Updated appointment missing from mirror"),
        }
    }

    fn report(&self, error: SchedulingError, fallback: &str) -> SchedulingError {
        tracing::warn!(error = %error, "Appointment operation failed");
        let fallback = if fallback.is_empty() {
            crate::error::GENERIC_SERVER_MESSAGE
        } else {
            fallback
        };
        self.notifier.notify(Notice::error(error.user_message(fallback)));
        error
    }

    fn changed(&self) {
        if let Some(listener) = &self.listener {
            listener(&self.mirror);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{FailureMode, InMemoryBackend};
    use crate::models::{Pet, Record, User, UserRole};
    use crate::notice::{AutoConfirm, NoticeLevel, RecordingNotifier};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn caller(role: UserRole, id: &str) -> CallerContext {
        CallerContext::new(User {
            document_number: id.into(),
            name: "Test".into(),
            last_name: "Caller".into(),
            role,
        })
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn stored(id: &str, owner: &str, vet: &str, status: AppointmentStatus) -> AppointmentRecord {
        Record::new(Appointment {
            appointment_id: Some(id.into()),
            owner_id: owner.into(),
            pet_id: "P1".into(),
            services: vec!["S1".into()],
            date_time: at(10, 9),
            status,
            notes: None,
            veterinarian_id: vet.into(),
        })
    }

    fn selection_of(record: &AppointmentRecord) -> ValidSelection {
        let a = &record.data;
        ValidSelection {
            owner_id: a.owner_id.clone(),
            pet_id: a.pet_id.clone(),
            services: a.services.clone(),
            veterinarian_id: a.veterinarian_id.clone(),
            date_time: a.date_time,
            notes: a.notes.clone(),
        }
    }

    async fn manager(
        role: UserRole,
        records: Vec<AppointmentRecord>,
    ) -> (AppointmentManager<InMemoryBackend>, Arc<InMemoryBackend>, Arc<RecordingNotifier>) {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_pets([Pet { pet_id: "P1".into(), owner_id: "O1".into(), name: "Luna".into(), weight: 12.0 }])
                .with_appointments(records),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let mut manager = AppointmentManager::new(
            backend.clone(),
            caller(role, "admin-1"),
            notifier.clone(),
        );
        manager.load().await.unwrap();
        (manager, backend, notifier)
    }

    #[tokio::test]
    async fn load_is_scoped_by_role() {
        let backend = Arc::new(InMemoryBackend::new().with_appointments([
            stored("a-1", "O1", "V1", AppointmentStatus::Pending),
            stored("a-2", "O2", "V2", AppointmentStatus::Pending),
        ]));
        let notifier = Arc::new(RecordingNotifier::new());

        let mut client = AppointmentManager::new(backend.clone(), caller(UserRole::Client, "O2"), notifier.clone());
        assert_eq!(client.load().await.unwrap().len(), 1);
        assert_eq!(client.records()[0].id(), Some("a-2"));

        let mut vet = AppointmentManager::new(backend.clone(), caller(UserRole::Veterinarian, "V1"), notifier);
        assert_eq!(vet.load().await.unwrap()[0].id(), Some("a-1"));
        assert_eq!(backend.call_count("list_appointments").await, 0);
    }

    #[tokio::test]
    async fn create_appends_to_mirror_and_notifies_listener() {
        let (mut manager, _backend, notifier) = manager(UserRole::Administrator, vec![]).await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        manager.on_change(move |records| counter.store(records.len(), Ordering::SeqCst));

        let draft = selection_of(&stored("unused", "O1", "V1", AppointmentStatus::Pending));
        let record = manager.create(&draft).await.unwrap();

        assert!(record.id().is_some());
        assert_eq!(record.data.status, AppointmentStatus::Pending);
        assert_eq!(manager.records().len(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(notifier.contains(NoticeLevel::Success, "created"));
    }

    #[tokio::test]
    async fn failed_create_reports_server_message_and_keeps_mirror() {
        let (mut manager, _backend, notifier) = manager(UserRole::Administrator, vec![]).await;
        let mut draft = selection_of(&stored("x", "O1", "V1", AppointmentStatus::Pending));
        draft.owner_id = "O9".into();

        let err = manager.create(&draft).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Backend(_)));
        assert!(manager.records().is_empty());
        assert!(notifier.contains(NoticeLevel::Error, "does not belong"));
    }

    #[tokio::test]
    async fn unchanged_update_makes_no_network_call() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, notifier) = manager(UserRole::Administrator, vec![original.clone()]).await;
        let calls_before = backend.calls().await.len();

        let outcome = manager
            .update(&original, &selection_of(&original), &AutoConfirm(true))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(backend.calls().await.len(), calls_before);
        assert_eq!(notifier.last(), Some(Notice::info(NO_CHANGES_MESSAGE)));
    }

    #[tokio::test]
    async fn update_replaces_mirror_entry_after_confirmation() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![original.clone()]).await;
        let mut draft = selection_of(&original);
        draft.date_time = at(12, 15);

        let declined = manager.update(&original, &draft, &AutoConfirm(false)).await.unwrap();
        assert_eq!(declined, UpdateOutcome::Declined);
        assert_eq!(backend.call_count("update_appointment").await, 0);

        let outcome = manager.update(&original, &draft, &AutoConfirm(true)).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        assert_eq!(manager.find("a-1").unwrap().data.date_time, at(12, 15));
        assert_eq!(manager.records().len(), 1);
    }

    #[tokio::test]
    async fn cancel_sets_status_and_refreshes_last_update() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![original]).await;

        let outcome = manager.cancel("a-1", &AutoConfirm(true)).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::Transitioned(_)));

        let record = manager.find("a-1").unwrap();
        assert_eq!(record.data.status, AppointmentStatus::Cancelled);
        assert!(record.meta.last_update.is_some());
        assert_eq!(backend.appointments().await[0].data.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn terminal_appointments_cannot_change() {
        let done = stored("a-1", "O1", "V1", AppointmentStatus::Completed);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![done.clone()]).await;

        let err = manager.cancel("a-1", &AutoConfirm(true)).await.unwrap_err();
        assert!(matches!(err, SchedulingError::TerminalStatus { .. }));

        let mut draft = selection_of(&done);
        draft.notes = Some("late".into());
        let err = manager.update(&done, &draft, &AutoConfirm(true)).await.unwrap_err();
        assert!(matches!(err, SchedulingError::TerminalStatus { .. }));
        assert_eq!(backend.call_count("update_appointment").await, 0);
    }

    #[tokio::test]
    async fn update_from_stale_copy_cannot_revive_cancelled_appointment() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![original.clone()]).await;
        manager.cancel("a-1", &AutoConfirm(true)).await.unwrap();
        let updates_after_cancel = backend.call_count("update_appointment").await;

        let mut draft = selection_of(&original);
        draft.date_time = at(12, 15);
        let err = manager.update(&original, &draft, &AutoConfirm(true)).await.unwrap_err();

        assert!(matches!(
            err,
            SchedulingError::TerminalStatus { status: AppointmentStatus::Cancelled, .. }
        ));
        assert_eq!(backend.call_count("update_appointment").await, updates_after_cancel);
        assert_eq!(manager.find("a-1").unwrap().data.status, AppointmentStatus::Cancelled);
        assert_eq!(backend.appointments().await[0].data.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn update_of_appointment_deleted_meanwhile_is_not_found() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![original.clone()]).await;
        manager.delete("a-1", &AutoConfirm(true)).await.unwrap();

        let mut draft = selection_of(&original);
        draft.notes = Some("moved".into());
        let err = manager.update(&original, &draft, &AutoConfirm(true)).await.unwrap_err();

        assert!(matches!(err, SchedulingError::NotFound(ref id) if id == "a-1"));
        assert_eq!(backend.call_count("update_appointment").await, 0);
    }

    #[tokio::test]
    async fn update_keeps_status_from_mirror() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let mut confirmed = original.clone();
        confirmed.data.status = AppointmentStatus::Confirmed;
        let (mut manager, _backend, _notifier) = manager(UserRole::Administrator, vec![confirmed]).await;

        let mut draft = selection_of(&original);
        draft.date_time = at(12, 15);
        let outcome = manager.update(&original, &draft, &AutoConfirm(true)).await.unwrap();

        let UpdateOutcome::Updated(record) = outcome else {
            panic!("expected an update");
        };
        assert_eq!(record.data.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn role_gates_are_checked_before_network() {
        let backend = Arc::new(InMemoryBackend::new().with_appointments([stored(
            "a-1",
            "O1",
            "V1",
            AppointmentStatus::Pending,
        )]));
        let notifier = Arc::new(RecordingNotifier::new());

        let mut vet = AppointmentManager::new(backend.clone(), caller(UserRole::Veterinarian, "V1"), notifier.clone());
        vet.load().await.unwrap();
        let err = vet.cancel("a-1", &AutoConfirm(true)).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Forbidden { action: "cancel", .. }));
        let err = vet.delete("a-1", &AutoConfirm(true)).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Forbidden { .. }));

        let mut client = AppointmentManager::new(backend.clone(), caller(UserRole::Client, "O1"), notifier);
        client.load().await.unwrap();
        assert!(client.complete("a-1", &AutoConfirm(true)).await.is_err());

        assert_eq!(backend.call_count("update_appointment").await, 0);
        assert_eq!(backend.call_count("delete_appointment").await, 0);
    }

    #[tokio::test]
    async fn declined_delete_leaves_mirror_unchanged() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, _notifier) = manager(UserRole::Administrator, vec![original.clone()]).await;

        let outcome = manager.delete("a-1", &AutoConfirm(false)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(manager.records(), &[original][..]);
        assert_eq!(backend.call_count("delete_appointment").await, 0);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_by_identity() {
        let (mut manager, _backend, _notifier) = manager(
            UserRole::Administrator,
            vec![
                stored("a-1", "O1", "V1", AppointmentStatus::Pending),
                stored("a-2", "O1", "V1", AppointmentStatus::Pending),
            ],
        )
        .await;

        assert_eq!(manager.delete("a-1", &AutoConfirm(true)).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(manager.records().len(), 1);
        assert_eq!(manager.records()[0].id(), Some("a-2"));
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback_message() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let (mut manager, backend, notifier) = manager(UserRole::Administrator, vec![original]).await;
        backend.fail("delete_appointment", FailureMode::Transport).await;

        assert!(manager.delete("a-1", &AutoConfirm(true)).await.is_err());
        assert_eq!(notifier.last(), Some(Notice::error("Could not delete the appointment")));
        assert_eq!(manager.records().len(), 1);
    }

    #[test]
    fn normalize_keeps_identity_and_status() {
        let original = stored("a-1", "O1", "V1", AppointmentStatus::Pending);
        let payload = normalize(&selection_of(&original), Some(&original.data));
        assert_eq!(payload, original.data);

        let fresh = normalize(&selection_of(&original), None);
        assert_eq!(fresh.appointment_id, None);
        assert_eq!(fresh.status, AppointmentStatus::Pending);
    }
}
