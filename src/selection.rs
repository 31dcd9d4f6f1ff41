//! Cascading selection state of the appointment form.
//!
//! owner -> pet list -> service -> veterinarian -> date -> hour list.
//!
//! Every input is a [`SelectionEvent`] fed to [`SelectionState::apply`], which
//! mutates the state synchronously and returns the [`Effect`]s (network loads,
//! notices) the caller must run. Results of loads come back as events too, so
//! the whole reset cascade can be exercised without a runtime.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::availability::{AvailabilityTracker, BookedHour, HourListOutcome, HourRequest};
use crate::context::CallerContext;
use crate::error::{Field, ValidationError};
use crate::models::{AppointmentRecord, Pet, Service, User};
use crate::notice::Notice;
use crate::pricing::{resolve_price, DisplayPrice};

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PetList {
    Idle,
    Loading { owner_id: String },
    Loaded { owner_id: String, pets: Vec<Pet> },
    Failed { owner_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourList {
    Idle,
    Loading(HourRequest),
    Loaded(Vec<String>),
    Unavailable,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogStatus {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Failed,
}

/// Lists loaded once per form session, independent of other fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub status: CatalogStatus,
    pub owners: Vec<User>,
    pub services: Vec<Service>,
    pub veterinarians: Vec<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    OwnerChanged(Option<String>),
    PetListResolved { owner_id: String, pets: Vec<Pet> },
    PetListFailed { owner_id: String, message: String },
    PetChanged(Option<String>),
    ServiceChanged(Option<String>),
    VeterinarianChanged(Option<String>),
    DateChanged(Option<NaiveDate>),
    HourChanged(Option<String>),
    HourListResolved { request: HourRequest, outcome: HourListOutcome },
    CatalogResolved {
        owners: Vec<User>,
        services: Vec<Service>,
        veterinarians: Vec<User>,
    },
    CatalogFailed { message: String },
    NotesChanged(Option<String>),
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadPets { owner_id: String },
    /// Owners are only fetched when the caller may pick one.
    LoadCatalog { include_owners: bool },
    LoadHours(HourRequest),
    Notify(Notice),
}

/// What the pet select renders.
#[derive(Debug, Clone, PartialEq)]
pub enum PetField<'a> {
    AwaitingOwner,
    Loading,
    NoPets,
    Options(&'a [Pet]),
}

/// What the hour select renders.
#[derive(Debug, Clone, PartialEq)]
pub enum HourField<'a> {
    AwaitingDate,
    AwaitingVeterinarian,
    Loading,
    NoHours,
    Options(&'a [String]),
}

/// A selection that passed local validation, ready for the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSelection {
    pub owner_id: String,
    pub pet_id: String,
    pub services: Vec<String>,
    pub veterinarian_id: String,
    pub date_time: NaiveDateTime,
    pub notes: Option<String>,
}

pub const PAST_DATE_MESSAGE: &str = "The appointment must be scheduled in the future";
pub const INVALID_HOUR_MESSAGE: &str = "The selected hour is not a valid time";
const PETS_FAILED_MESSAGE: &str = "Could not load the client's pets";

// ─── State ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SelectionState {
    owner_id: Option<String>,
    owner_locked: bool,
    pet_id: Option<String>,
    pets: PetList,
    services: Vec<String>,
    veterinarian_id: Option<String>,
    date: Option<NaiveDate>,
    hour: Option<String>,
    hours: HourList,
    catalog: Catalog,
    notes: Option<String>,
    tracker: AvailabilityTracker,
}

impl SelectionState {
    /// Blank draft. A client caller books for themself, so the owner is
    /// pre-filled and cannot be changed.
    pub fn new(context: &CallerContext, preselected_service_id: Option<String>) -> Self {
        let owner_locked = !context.can_select_owner();
        Self {
            owner_id: owner_locked.then(|| context.user_id().to_string()),
            owner_locked,
            pet_id: None,
            pets: PetList::Idle,
            services: preselected_service_id.into_iter().collect(),
            veterinarian_id: None,
            date: None,
            hour: None,
            hours: HourList::Idle,
            catalog: Catalog::default(),
            notes: None,
            tracker: AvailabilityTracker::new(),
        }
    }

    /// Draft seeded from a stored appointment for editing.
    pub fn seeded(record: &AppointmentRecord, context: &CallerContext) -> Self {
        let appointment = &record.data;
        let date = appointment.date_time.date();
        let hour = appointment.date_time.format("%H:%M").to_string();

        Self {
            owner_id: Some(appointment.owner_id.clone()),
            owner_locked: !context.can_select_owner(),
            pet_id: Some(appointment.pet_id.clone()),
            pets: PetList::Idle,
            services: appointment.services.clone(),
            veterinarian_id: Some(appointment.veterinarian_id.clone()),
            date: Some(date),
            hour: Some(hour.clone()),
            hours: HourList::Idle,
            catalog: Catalog::default(),
            notes: appointment.notes.clone(),
            tracker: AvailabilityTracker::preserving(BookedHour {
                veterinarian_id: appointment.veterinarian_id.clone(),
                date,
                hour,
            }),
        }
    }

    /// Loads needed right after mount.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.catalog.status == CatalogStatus::NotRequested {
            self.catalog.status = CatalogStatus::Loading;
            effects.push(Effect::LoadCatalog {
                include_owners: !self.owner_locked,
            });
        }
        if let Some(owner_id) = self.owner_id.clone() {
            if self.pets == PetList::Idle {
                self.pets = PetList::Loading { owner_id: owner_id.clone() };
                effects.push(Effect::LoadPets { owner_id });
            }
        }
        if self.hours == HourList::Idle {
            effects.extend(self.refresh_hours());
        }

        effects
    }

    pub fn apply(&mut self, event: SelectionEvent) -> Vec<Effect> {
        match event {
            SelectionEvent::OwnerChanged(owner_id) => self.change_owner(owner_id),
            SelectionEvent::PetListResolved { owner_id, pets } => {
                self.resolve_pets(owner_id, pets);
                Vec::new()
            }
            SelectionEvent::PetListFailed { owner_id, message } => {
                self.fail_pets(owner_id, message)
            }
            SelectionEvent::PetChanged(pet_id) => {
                self.change_pet(pet_id);
                Vec::new()
            }
            SelectionEvent::ServiceChanged(service_id) => {
                self.services = service_id.into_iter().collect();
                Vec::new()
            }
            SelectionEvent::VeterinarianChanged(veterinarian_id) => {
                if veterinarian_id == self.veterinarian_id {
                    return Vec::new();
                }
                self.veterinarian_id = veterinarian_id;
                self.reset_hours()
            }
            SelectionEvent::DateChanged(date) => {
                if date == self.date {
                    return Vec::new();
                }
                self.date = date;
                self.reset_hours()
            }
            SelectionEvent::HourChanged(hour) => {
                self.change_hour(hour);
                Vec::new()
            }
            SelectionEvent::HourListResolved { request, outcome } => {
                self.resolve_hours(request, outcome)
            }
            SelectionEvent::CatalogResolved {
                owners,
                services,
                veterinarians,
            } => {
                self.catalog = Catalog {
                    status: CatalogStatus::Loaded,
                    owners,
                    services,
                    veterinarians,
                };
                Vec::new()
            }
            SelectionEvent::CatalogFailed { message } => {
                self.catalog.status = CatalogStatus::Failed;
                vec![Effect::Notify(Notice::error(message))]
            }
            SelectionEvent::NotesChanged(notes) => {
                self.notes = notes.filter(|n| !n.trim().is_empty());
                Vec::new()
            }
        }
    }

    // ─── Transitions ──────────────────────────────────────────────────────

    fn change_owner(&mut self, owner_id: Option<String>) -> Vec<Effect> {
        if self.owner_locked {
            tracing::debug!("Owner is fixed for this caller, ignoring change");
            return Vec::new();
        }
        if owner_id == self.owner_id {
            return Vec::new();
        }

        // Pet is cleared before the new list arrives, never after.
        self.owner_id = owner_id;
        self.pet_id = None;

        match self.owner_id.clone() {
            Some(owner_id) => {
                self.pets = PetList::Loading { owner_id: owner_id.clone() };
                vec![Effect::LoadPets { owner_id }]
            }
            None => {
                self.pets = PetList::Idle;
                Vec::new()
            }
        }
    }

    fn resolve_pets(&mut self, owner_id: String, pets: Vec<Pet>) {
        if !matches!(&self.pets, PetList::Loading { owner_id: pending } if *pending == owner_id) {
            tracing::debug!(owner_id = %owner_id, "Dropping pet list for a previous owner");
            return;
        }

        if let Some(pet_id) = &self.pet_id {
            if !pets.iter().any(|p| p.pet_id == *pet_id) {
                tracing::warn!(pet_id = %pet_id, "Selected pet not among the owner's pets");
                self.pet_id = None;
            }
        }
        self.pets = PetList::Loaded { owner_id, pets };
    }

    fn fail_pets(&mut self, owner_id: String, message: String) -> Vec<Effect> {
        if !matches!(&self.pets, PetList::Loading { owner_id: pending } if *pending == owner_id) {
            return Vec::new();
        }
        self.pets = PetList::Failed { owner_id };
        self.pet_id = None;
        let message = if message.is_empty() { PETS_FAILED_MESSAGE.to_string() } else { message };
        vec![Effect::Notify(Notice::error(message))]
    }

    fn change_pet(&mut self, pet_id: Option<String>) {
        let Some(pet_id) = pet_id else {
            self.pet_id = None;
            return;
        };
        match &self.pets {
            PetList::Loaded { pets, .. } if pets.iter().any(|p| p.pet_id == pet_id) => {
                self.pet_id = Some(pet_id);
            }
            _ => tracing::warn!(pet_id = %pet_id, "Pet is not a current option"),
        }
    }

    fn change_hour(&mut self, hour: Option<String>) {
        let Some(hour) = hour else {
            self.hour = None;
            return;
        };
        match &self.hours {
            HourList::Loaded(slots) if slots.contains(&hour) => self.hour = Some(hour),
            _ => tracing::warn!(hour = %hour, "Hour is not a current option"),
        }
    }

    /// Veterinarian or date changed: hour and its options are gone.
    fn reset_hours(&mut self) -> Vec<Effect> {
        self.hour = None;
        self.refresh_hours()
    }

    fn refresh_hours(&mut self) -> Vec<Effect> {
        match (self.veterinarian_id.as_deref(), self.date) {
            (Some(veterinarian_id), Some(date)) => {
                let request = self.tracker.issue(veterinarian_id, date);
                self.hours = HourList::Loading(request.clone());
                vec![Effect::LoadHours(request)]
            }
            _ => {
                self.tracker.invalidate();
                self.hours = HourList::Idle;
                Vec::new()
            }
        }
    }

    fn resolve_hours(&mut self, request: HourRequest, outcome: HourListOutcome) -> Vec<Effect> {
        let inputs_match = request.matches(self.veterinarian_id.as_deref(), self.date);
        if !inputs_match || !self.tracker.settle(&request) {
            tracing::debug!(
                generation = request.generation,
                veterinarian_id = %request.veterinarian_id,
                date = %request.date,
                "Dropping stale availability result"
            );
            return Vec::new();
        }

        match outcome {
            HourListOutcome::Slots(slots) => {
                let slots = self.tracker.augment(&request, slots);
                if let Some(hour) = &self.hour {
                    if !slots.contains(hour) {
                        self.hour = None;
                    }
                }
                self.hours = HourList::Loaded(slots);
                Vec::new()
            }
            HourListOutcome::Unavailable { message } => {
                self.hour = None;
                self.hours = HourList::Unavailable;
                vec![Effect::Notify(Notice::warning(message))]
            }
            HourListOutcome::Failed { message } => {
                self.hour = None;
                self.hours = HourList::Failed;
                vec![Effect::Notify(Notice::error(message))]
            }
        }
    }

    // ─── Views ────────────────────────────────────────────────────────────

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// False for a client, whose own identity is the owner.
    pub fn owner_selectable(&self) -> bool {
        !self.owner_locked
    }

    pub fn pet_id(&self) -> Option<&str> {
        self.pet_id.as_deref()
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn veterinarian_id(&self) -> Option<&str> {
        self.veterinarian_id.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn hour(&self) -> Option<&str> {
        self.hour.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pet_list(&self) -> &PetList {
        &self.pets
    }

    pub fn hour_list(&self) -> &HourList {
        &self.hours
    }

    pub fn pet_field(&self) -> PetField<'_> {
        if self.owner_id.is_none() {
            return PetField::AwaitingOwner;
        }
        match &self.pets {
            PetList::Idle | PetList::Loading { .. } => PetField::Loading,
            PetList::Failed { .. } => PetField::NoPets,
            PetList::Loaded { pets, .. } if pets.is_empty() => PetField::NoPets,
            PetList::Loaded { pets, .. } => PetField::Options(pets),
        }
    }

    pub fn hour_field(&self) -> HourField<'_> {
        if self.date.is_none() {
            return HourField::AwaitingDate;
        }
        if self.veterinarian_id.is_none() {
            return HourField::AwaitingVeterinarian;
        }
        match &self.hours {
            HourList::Idle | HourList::Loading(_) => HourField::Loading,
            HourList::Unavailable | HourList::Failed => HourField::NoHours,
            HourList::Loaded(slots) if slots.is_empty() => HourField::NoHours,
            HourList::Loaded(slots) => HourField::Options(slots),
        }
    }

    pub fn selected_pet(&self) -> Option<&Pet> {
        let pet_id = self.pet_id.as_deref()?;
        match &self.pets {
            PetList::Loaded { pets, .. } => pets.iter().find(|p| p.pet_id == pet_id),
            _ => None,
        }
    }

    /// Only the first service takes part in pricing.
    pub fn selected_service(&self) -> Option<&Service> {
        let service_id = self.services.first()?;
        self.catalog
            .services
            .iter()
            .find(|s| s.service_id == *service_id)
    }

    pub fn estimated_price(&self) -> DisplayPrice {
        resolve_price(self.selected_service(), self.selected_pet())
    }

    /// Required fields still empty, in form order.
    pub fn missing_fields(&self) -> Vec<Field> {
        [
            (Field::Owner, self.owner_id.is_none()),
            (Field::Pet, self.pet_id.is_none()),
            (Field::Service, self.services.is_empty()),
            (Field::Veterinarian, self.veterinarian_id.is_none()),
            (Field::Date, self.date.is_none()),
            (Field::Hour, self.hour.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect()
    }

    /// Local checks only. The first failing field is reported.
    pub fn validate(&self, now: NaiveDateTime) -> Result<ValidSelection, ValidationError> {
        let required = |value: Option<&str>, field: Field| {
            value
                .map(str::to_string)
                .ok_or_else(|| ValidationError::required(field))
        };

        let owner_id = required(self.owner_id(), Field::Owner)?;
        let pet_id = required(self.pet_id(), Field::Pet)?;
        if self.services.is_empty() {
            return Err(ValidationError::required(Field::Service));
        }
        let veterinarian_id = required(self.veterinarian_id(), Field::Veterinarian)?;
        let date = self.date.ok_or_else(|| ValidationError::required(Field::Date))?;
        let hour = required(self.hour(), Field::Hour)?;

        let time = parse_hour(&hour)
            .ok_or_else(|| ValidationError::new(Field::Hour, INVALID_HOUR_MESSAGE))?;
        let date_time = date.and_time(time);
        if date_time <= now {
            return Err(ValidationError::new(Field::Date, PAST_DATE_MESSAGE));
        }

        Ok(ValidSelection {
            owner_id,
            pet_id,
            services: self.services.clone(),
            veterinarian_id,
            date_time,
            notes: self.notes.clone(),
        })
    }
}

/// Server hours come as `HH:MM`, occasionally with seconds.
fn parse_hour(hour: &str) -> Option<NaiveTime> {
    let hour = hour.trim();
    NaiveTime::parse_from_str(hour, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(hour, "%H:%M:%S"))
        .ok()
}
