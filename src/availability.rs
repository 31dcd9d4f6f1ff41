//! Free-hour resolution for a (veterinarian, date) pair.
//!
//! Requests are never aborted. Each one carries a fencing token (a
//! generation number plus the inputs it was issued for); a result is applied
//! only while its token is still the latest one issued. Last input wins,
//! regardless of the order responses arrive in.

use chrono::NaiveDate;

use crate::backend::SchedulingBackend;
use crate::error::BackendError;

/// Fencing token for one availability request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourRequest {
    pub generation: u64,
    pub veterinarian_id: String,
    pub date: NaiveDate,
}

impl HourRequest {
    pub fn matches(&self, veterinarian_id: Option<&str>, date: Option<NaiveDate>) -> bool {
        veterinarian_id == Some(self.veterinarian_id.as_str()) && date == Some(self.date)
    }
}

/// Hour an edited appointment already holds. The server reports it as
/// taken, so it would otherwise vanish from the options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedHour {
    pub veterinarian_id: String,
    pub date: NaiveDate,
    pub hour: String,
}

#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    generation: u64,
    latest: Option<HourRequest>,
    booked: Option<BookedHour>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker for edit mode, preserving the appointment's current hour.
    pub fn preserving(booked: BookedHour) -> Self {
        Self {
            booked: Some(booked),
            ..Self::default()
        }
    }

    /// Issue a new request, superseding any in flight.
    pub fn issue(&mut self, veterinarian_id: &str, date: NaiveDate) -> HourRequest {
        self.generation += 1;
        let request = HourRequest {
            generation: self.generation,
            veterinarian_id: veterinarian_id.to_string(),
            date,
        };
        self.latest = Some(request.clone());
        request
    }

    /// Inputs became incomplete; whatever is in flight is now stale.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.latest = None;
    }

    pub fn is_current(&self, request: &HourRequest) -> bool {
        self.latest.as_ref() == Some(request)
    }

    /// Accept a result for `request` if it is still current. Each token is
    /// accepted at most once.
    pub fn settle(&mut self, request: &HourRequest) -> bool {
        if self.is_current(request) {
            self.latest = None;
            true
        } else {
            false
        }
    }

    /// Put the booked hour back in front of a fresh slot list when the
    /// request is for the booking's own veterinarian and date.
    pub fn augment(&self, request: &HourRequest, mut slots: Vec<String>) -> Vec<String> {
        if let Some(booked) = &self.booked {
            let same_booking =
                booked.veterinarian_id == request.veterinarian_id && booked.date == request.date;
            if same_booking && !slots.iter().any(|s| *s == booked.hour) {
                slots.insert(0, booked.hour.clone());
            }
        }
        slots
    }
}

/// What a finished availability request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourListOutcome {
    Slots(Vec<String>),
    /// The server answered but has no bookable schedule for that day.
    Unavailable { message: String },
    /// The server could not be reached or its answer was unreadable.
    Failed { message: String },
}

pub const NO_SCHEDULE_MESSAGE: &str = "The veterinarian has no schedule for the selected day";
pub const HOURS_FAILED_MESSAGE: &str = "Could not load available hours";

/// Ask the backend for free hours. Never fails: errors become outcomes.
pub async fn fetch_hours<B: SchedulingBackend + ?Sized>(
    backend: &B,
    request: &HourRequest,
) -> HourListOutcome {
    tracing::debug!(
        generation = request.generation,
        veterinarian_id = %request.veterinarian_id,
        date = %request.date,
        "Fetching available hours"
    );

    match backend
        .available_hours(&request.veterinarian_id, request.date)
        .await
    {
        Ok(slots) => {
            tracing::debug!(count = slots.available_slots.len(), "Available hours loaded");
            HourListOutcome::Slots(slots.available_slots)
        }
        Err(e) if e.is_transport() => {
            tracing::warn!(error = %e, "Availability request failed");
            HourListOutcome::Failed {
                message: HOURS_FAILED_MESSAGE.to_string(),
            }
        }
        Err(e) => {
            tracing::info!(error = %e, "No availability for requested day");
            let message = match &e {
                BackendError::NoSchedule { .. } => NO_SCHEDULE_MESSAGE.to_string(),
                other => other
                    .server_message()
                    .unwrap_or_else(|| NO_SCHEDULE_MESSAGE.to_string()),
            };
            HourListOutcome::Unavailable { message }
        }
    }
}
