//! Calendar sync for appointments
//!
//! The access token is granted out of band; when none is configured no calendar is
//! attached to the app and appointments are stored without an event id.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::CalendarConfig,
    consts::APPOINTMENT_DURATION_MINUTES,
    entity::{appointment, employee},
    error::ServiceError,
};

const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[async_trait]
pub trait CalendarSync: Send + Sync {
    /// Zone appointment wall-clock times are interpreted in
    fn time_zone(&self) -> &str;

    /// Returns the external event id
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, ServiceError>;

    async fn update_event(&self, event_id: &str, event: &CalendarEvent) -> Result<(), ServiceError>;

    async fn delete_event(&self, event_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: NaiveDateTime,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    pub fn for_appointment(appointment: &appointment::Model, employee: Option<&employee::Model>, time_zone: &str) -> Self {
        let start = appointment.appointment_date.and_time(appointment.appointment_time);
        let end = start + Duration::minutes(APPOINTMENT_DURATION_MINUTES);

        let description = appointment.appointment_info.clone().unwrap_or_else(|| {
            format!("Appointment for {}", employee.map(|e| e.name.as_str()).unwrap_or("Unknown"))
        });

        Self {
            summary: appointment.appointment_name.clone(),
            description,
            start: EventTime { date_time: start, time_zone: time_zone.to_string() },
            end: EventTime { date_time: end, time_zone: time_zone.to_string() },
            attendees: employee.map(|e| Attendee { email: e.email.clone() }).into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

pub struct GoogleCalendar {
    client: Client,
    config: CalendarConfig,
}

impl GoogleCalendar {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn events_url(&self) -> String {
        format!("{GOOGLE_CALENDAR_API}/calendars/{}/events", self.config.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{event_id}", self.events_url())
    }
}

#[async_trait]
impl CalendarSync for GoogleCalendar {
    fn time_zone(&self) -> &str {
        &self.config.time_zone
    }

    #[instrument(skip_all, fields(summary = %event.summary))]
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, ServiceError> {
        let created: CreatedEvent = self.client
            .post(self.events_url())
            .bearer_auth(&self.config.access_token)
            .json(event)
            .send().await
            .and_then(|res| res.error_for_status())
            .map_err(|err| ServiceError::external("create calendar event", err))?
            .json().await
            .map_err(|err| ServiceError::external("read calendar event", err))?;

        debug!(event_id = %created.id, "calendar event created");

        Ok(created.id)
    }

    #[instrument(skip(self, event))]
    async fn update_event(&self, event_id: &str, event: &CalendarEvent) -> Result<(), ServiceError> {
        self.client
            .put(self.event_url(event_id))
            .bearer_auth(&self.config.access_token)
            .json(event)
            .send().await
            .and_then(|res| res.error_for_status())
            .map_err(|err| ServiceError::external("update calendar event", err))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, event_id: &str) -> Result<(), ServiceError> {
        self.client
            .delete(self.event_url(event_id))
            .bearer_auth(&self.config.access_token)
            .send().await
            .and_then(|res| res.error_for_status())
            .map_err(|err| ServiceError::external("delete calendar event", err))?;

        Ok(())
    }
}
