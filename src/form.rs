//! Mountable appointment composition surface.
//!
//! Owns one [`SelectionState`] draft, runs the effects its transitions ask
//! for and hands validated drafts to the [`AppointmentManager`].

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::availability::fetch_hours;
use crate::backend::SchedulingBackend;
use crate::context::CallerContext;
use crate::error::{SchedulingError, GENERIC_SERVER_MESSAGE};
use crate::lifecycle::{AppointmentManager, UpdateOutcome};
use crate::models::{AppointmentRecord, AppointmentStatus, UserRole};
use crate::notice::{Confirmer, Notice, Notifier};
use crate::pricing::DisplayPrice;
use crate::selection::{Effect, SelectionEvent, SelectionState};

const CATALOG_FAILED_MESSAGE: &str = "Could not load services and veterinarians";

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create { preselected_service_id: Option<String> },
    Edit(AppointmentRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Draft,
    Submitting,
    Persisted(AppointmentStatus),
    /// Last attempt failed; the draft is intact for a retry.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(AppointmentRecord),
    Updated(AppointmentRecord),
    Unchanged,
    Declined,
}

/// Performs the network side of [`Effect`]s. Cheap to clone, so loads can be
/// spawned and their events fed back in any order.
pub struct EffectRunner<B> {
    backend: Arc<B>,
}

impl<B> Clone for EffectRunner<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend) }
    }
}

impl<B: SchedulingBackend> EffectRunner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Run one load and turn its result into the event that reports it.
    /// Notices produce no event.
    pub async fn run(&self, effect: Effect) -> Option<SelectionEvent> {
        match effect {
            Effect::LoadPets { owner_id } => Some(self.load_pets(owner_id).await),
            Effect::LoadCatalog { include_owners } => Some(self.load_catalog(include_owners).await),
            Effect::LoadHours(request) => {
                let outcome = fetch_hours(&*self.backend, &request).await;
                Some(SelectionEvent::HourListResolved { request, outcome })
            }
            Effect::Notify(_) => None,
        }
    }

    async fn load_pets(&self, owner_id: String) -> SelectionEvent {
        match self.backend.list_pets_for_owner(&owner_id).await {
            Ok(records) => {
                tracing::debug!(owner_id = %owner_id, count = records.len(), "Pets loaded");
                SelectionEvent::PetListResolved {
                    owner_id,
                    pets: records.into_iter().map(|r| r.data).collect(),
                }
            }
            Err(e) => {
                tracing::warn!(owner_id = %owner_id, error = %e, "Failed to load pets");
                SelectionEvent::PetListFailed {
                    owner_id,
                    message: e.server_message().unwrap_or_default(),
                }
            }
        }
    }

    async fn load_catalog(&self, include_owners: bool) -> SelectionEvent {
        let owners = async {
            if include_owners {
                self.backend.list_users().await
            } else {
                Ok(Vec::new())
            }
        };

        let result = tokio::try_join!(
            owners,
            self.backend.list_services(),
            self.backend.list_veterinarians()
        );

        match result {
            Ok((users, services, veterinarians)) => SelectionEvent::CatalogResolved {
                owners: users
                    .into_iter()
                    .map(|r| r.data)
                    .filter(|u| u.role == UserRole::Client)
                    .collect(),
                services: services.into_iter().map(|r| r.data).collect(),
                veterinarians: veterinarians.into_iter().map(|r| r.data).collect(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load form catalog");
                SelectionEvent::CatalogFailed {
                    message: e
                        .server_message()
                        .unwrap_or_else(|| CATALOG_FAILED_MESSAGE.to_string()),
                }
            }
        }
    }
}

pub struct AppointmentForm<B> {
    state: SelectionState,
    original: Option<AppointmentRecord>,
    runner: EffectRunner<B>,
    notifier: Arc<dyn Notifier>,
    submission: SubmissionState,
}

impl<B: SchedulingBackend> AppointmentForm<B> {
    pub fn mount(
        backend: Arc<B>,
        context: &CallerContext,
        notifier: Arc<dyn Notifier>,
        mode: FormMode,
    ) -> Self {
        let (state, original) = match mode {
            FormMode::Create { preselected_service_id } => {
                (SelectionState::new(context, preselected_service_id), None)
            }
            FormMode::Edit(record) => (SelectionState::seeded(&record, context), Some(record)),
        };

        tracing::debug!(edit = original.is_some(), role = context.role().as_str(), "Appointment form mounted");

        Self {
            state,
            original,
            runner: EffectRunner::new(backend),
            notifier,
            submission: SubmissionState::Draft,
        }
    }

    /// Run the initial loads (catalog, pets and hours of a seeded draft).
    pub async fn open(&mut self) {
        let effects = self.state.start();
        self.settle(effects).await;
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn is_edit(&self) -> bool {
        self.original.is_some()
    }

    /// False once the draft has been persisted.
    pub fn is_open(&self) -> bool {
        !matches!(self.submission, SubmissionState::Persisted(_))
    }

    pub fn runner(&self) -> EffectRunner<B> {
        self.runner.clone()
    }

    pub fn estimated_price(&self) -> DisplayPrice {
        self.state.estimated_price()
    }

    /// Apply an event without running any load. Notices are delivered
    /// immediately; the loads are returned for the caller to run.
    pub fn dispatch(&mut self, event: SelectionEvent) -> Vec<Effect> {
        let effects = self.state.apply(event);
        self.deliver_notices(effects)
    }

    /// Apply an event and run every load it triggers to completion.
    pub async fn send(&mut self, event: SelectionEvent) {
        let effects = self.state.apply(event);
        self.settle(effects).await;
    }

    pub async fn settle(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            if let Effect::Notify(notice) = effect {
                self.notifier.notify(notice);
                continue;
            }
            if let Some(event) = self.runner.run(effect).await {
                queue.extend(self.state.apply(event));
            }
        }
    }

    fn deliver_notices(&self, effects: Vec<Effect>) -> Vec<Effect> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Notify(notice) => {
                    self.notifier.notify(notice);
                    None
                }
                load => Some(load),
            })
            .collect()
    }

    pub async fn select_owner(&mut self, owner_id: Option<&str>) {
        self.send(SelectionEvent::OwnerChanged(owner_id.map(str::to_string))).await
    }

    pub async fn select_pet(&mut self, pet_id: Option<&str>) {
        self.send(SelectionEvent::PetChanged(pet_id.map(str::to_string))).await
    }

    pub async fn select_service(&mut self, service_id: Option<&str>) {
        self.send(SelectionEvent::ServiceChanged(service_id.map(str::to_string))).await
    }

    pub async fn select_veterinarian(&mut self, veterinarian_id: Option<&str>) {
        self.send(SelectionEvent::VeterinarianChanged(veterinarian_id.map(str::to_string)))
            .await
    }

    pub async fn select_date(&mut self, date: Option<NaiveDate>) {
        self.send(SelectionEvent::DateChanged(date)).await
    }

    pub async fn select_hour(&mut self, hour: Option<&str>) {
        self.send(SelectionEvent::HourChanged(hour.map(str::to_string))).await
    }

    pub async fn set_notes(&mut self, notes: Option<&str>) {
        self.send(SelectionEvent::NotesChanged(notes.map(str::to_string))).await
    }

    pub async fn submit<C: Confirmer>(
        &mut self,
        manager: &mut AppointmentManager<B>,
        confirmer: &C,
    ) -> Result<SubmitOutcome, SchedulingError> {
        self.submit_at(manager, confirmer, Local::now().naive_local()).await
    }

    /// Validate against `now`, then create or update through `manager`.
    pub async fn submit_at<C: Confirmer>(
        &mut self,
        manager: &mut AppointmentManager<B>,
        confirmer: &C,
        now: NaiveDateTime,
    ) -> Result<SubmitOutcome, SchedulingError> {
        let selection = match self.state.validate(now) {
            Ok(selection) => selection,
            Err(e) => {
                tracing::debug!(field = %e.field, "Appointment draft rejected");
                self.notifier.notify(Notice::warning(e.message.clone()));
                return Err(e.into());
            }
        };

        self.submission = SubmissionState::Submitting;
        let result = match self.original.clone() {
            None => manager.create(&selection).await.map(SubmitOutcome::Created),
            Some(original) => manager
                .update(&original, &selection, confirmer)
                .await
                .map(|outcome| match outcome {
                    UpdateOutcome::Updated(record) => SubmitOutcome::Updated(record),
                    UpdateOutcome::Unchanged => SubmitOutcome::Unchanged,
                    UpdateOutcome::Declined => SubmitOutcome::Declined,
                }),
        };

        self.submission = match &result {
            Ok(SubmitOutcome::Created(record)) | Ok(SubmitOutcome::Updated(record)) => {
                SubmissionState::Persisted(record.data.status)
            }
            Ok(_) => SubmissionState::Draft,
            Err(e) => SubmissionState::Failed {
                message: e.user_message(GENERIC_SERVER_MESSAGE),
            },
        };
        result
    }
}
