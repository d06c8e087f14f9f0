use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::notification::domain::notification_sink::NotificationSink;
use crate::notification::domain::recognition_event::RecognitionEvent;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("could not reach notification endpoint {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("notification endpoint {url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// JSON body posted for every emitted event.
#[derive(Debug, Serialize, PartialEq)]
pub struct NotificationPayload<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub timestamp: u64,
}

impl<'a> NotificationPayload<'a> {
    pub fn from_event(event: &'a RecognitionEvent, include_score: bool) -> Self {
        Self {
            name: event.identity.wire_name(),
            score: include_score.then_some(event.score),
            timestamp: event.unix_seconds(),
        }
    }
}

/// Posts each event to an HTTP(S) endpoint, one request per event.
///
/// Blocking with a client-side timeout; a non-2xx answer is an error.
pub struct HttpNotificationSink {
    client: reqwest::blocking::Client,
    url: String,
    include_score: bool,
}

impl HttpNotificationSink {
    pub fn new(url: &str, timeout: Duration, include_score: bool) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|source| NotifyError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            url: url.to_string(),
            include_score,
        })
    }

    pub fn post(&self, event: &RecognitionEvent) -> Result<(), NotifyError> {
        let payload = NotificationPayload::from_event(event, self.include_score);
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|source| NotifyError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl NotificationSink for HttpNotificationSink {
    fn notify(&mut self, event: &RecognitionEvent) -> Result<(), Box<dyn std::error::Error>> {
        self.post(event)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
