use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AvailableSlots, SchedulingBackend};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{Appointment, AppointmentRecord, Pet, Record, Service, User};

/// REST client for the clinic's scheduling server.
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
    bearer_token: Option<String>,
    timeout_secs: u64,
}

/// Request body for create/update.
#[derive(Serialize)]
struct DataEnvelope<'a> {
    data: &'a Appointment,
}

/// Problem body the server sends with non-success responses.
#[derive(Deserialize, Default)]
struct ErrorBody {
    title: Option<String>,
    detail: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::HttpClient(format!("Invalid base URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::HttpClient(format!(
                "Invalid base URL {}",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            client,
            bearer_token: config.bearer_token.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Base URL plus `segments`, each one percent-encoded as a single path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::HttpClient(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.to_string())
        } else if e.is_timeout() {
            BackendError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            BackendError::HttpClient(e.to_string())
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let problem: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "Scheduling server error response");
            return Err(BackendError::Server {
                status: status.as_u16(),
                title: problem.title,
                detail: problem.detail,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let response = self.send(self.client.get(self.endpoint(segments)?)).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }
}

impl SchedulingBackend for HttpBackend {
    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, BackendError> {
        self.get_json(&["appointment", "list-appointments"]).await
    }

    async fn list_appointments_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<AppointmentRecord>, BackendError> {
        self.get_json(&["appointment", "list-appointments-user", owner_id])
            .await
    }

    async fn list_appointments_for_veterinarian(
        &self,
        veterinarian_id: &str,
    ) -> Result<Vec<AppointmentRecord>, BackendError> {
        self.get_json(&[
            "appointment",
            "list-appointments-veterinarian",
            veterinarian_id,
        ])
        .await
    }

    async fn available_hours(
        &self,
        veterinarian_id: &str,
        date: NaiveDate,
    ) -> Result<AvailableSlots, BackendError> {
        let request = self.client.get(self.endpoint(&["appointment", "available"])?).query(&[
            ("date", date.format("%Y-%m-%d").to_string()),
            ("idVeterinarian", veterinarian_id.to_string()),
        ]);

        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }

    async fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<AppointmentRecord, BackendError> {
        let request = self
            .client
            .post(self.endpoint(&["appointment", "create"])?)
            .json(&DataEnvelope { data: appointment });

        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<AppointmentRecord, BackendError> {
        let request = self
            .client
            .put(self.endpoint(&["appointment", "update"])?)
            .json(&DataEnvelope { data: appointment });

        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        // Some server builds answer 200 with an empty body; echo the payload.
        if body.trim().is_empty() {
            return Ok(Record::new(appointment.clone()));
        }
        serde_json::from_str(&body).map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }

    async fn delete_appointment(&self, appointment_id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .delete(self.endpoint(&["appointment", "delete"])?)
            .query(&[("idAppointment", appointment_id)]);
        self.send(request).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Record<User>>, BackendError> {
        self.get_json(&["user", "list-users"]).await
    }

    async fn list_veterinarians(&self) -> Result<Vec<Record<User>>, BackendError> {
        self.get_json(&["user", "list-veterinarians"]).await
    }

    async fn list_services(&self) -> Result<Vec<Record<Service>>, BackendError> {
        self.get_json(&["service", "list-services"]).await
    }

    async fn list_pets_for_owner(&self, owner_id: &str) -> Result<Vec<Record<Pet>>, BackendError> {
        self.get_json(&["pet", "owners-pets", owner_id]).await
    }
}
