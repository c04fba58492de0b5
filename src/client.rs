// src/client.rs

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{Appointment, AppointmentPatch, Doctor, NewAppointment, RecordId};

/// Resource-oriented API the client core talks to.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list_appointments(&self, user_id: &RecordId) -> Result<Vec<Appointment>, ClientError>;

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, ClientError>;

    async fn patch_appointment(
        &self,
        id: &RecordId,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, ClientError>;

    async fn list_doctors(
        &self,
        specialty: Option<&str>,
        location: Option<&str>,
    ) -> Result<Vec<Doctor>, ClientError>;

    /// `Ok(None)` when the doctor does not exist.
    async fn get_doctor(&self, id: &RecordId) -> Result<Option<Doctor>, ClientError>;

    async fn get_profile(&self) -> Result<Value, ClientError>;

    async fn patch_profile(&self, body: &Value) -> Result<Value, ClientError>;
}

/* ============================================================
   reqwest implementation
   ============================================================ */

#[derive(Clone)]
pub struct HttpResourceApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpResourceApi {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut req = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            tracing::debug!(%method, path, status = status.as_u16(), "resource API rejected request");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Decode a collection one record at a time. The resource API stores any
/// JSON object, so a malformed record is skipped rather than failing the list.
fn decode_rows<T: DeserializeOwned>(resource: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(resource, "skipping malformed record from resource API: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list_appointments(&self, user_id: &RecordId) -> Result<Vec<Appointment>, ClientError> {
        let rows: Vec<Value> = self
            .request::<(), _>(
                Method::GET,
                "/appointments",
                &[("userId", user_id.as_str())],
                None,
            )
            .await?;
        Ok(decode_rows("appointments", rows))
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, ClientError> {
        self.request(Method::POST, "/appointments", &[], Some(appointment))
            .await
    }

    async fn patch_appointment(
        &self,
        id: &RecordId,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, ClientError> {
        self.request(Method::PATCH, &format!("/appointments/{id}"), &[], Some(patch))
            .await
    }

    async fn list_doctors(
        &self,
        specialty: Option<&str>,
        location: Option<&str>,
    ) -> Result<Vec<Doctor>, ClientError> {
        let mut query = Vec::new();
        if let Some(s) = specialty.filter(|s| !s.is_empty()) {
            query.push(("specialty", s));
        }
        if let Some(l) = location.filter(|l| !l.is_empty()) {
            query.push(("location", l));
        }
        let rows: Vec<Value> = self
            .request::<(), _>(Method::GET, "/doctors", &query, None)
            .await?;
        Ok(decode_rows("doctors", rows))
    }

    async fn get_doctor(&self, id: &RecordId) -> Result<Option<Doctor>, ClientError> {
        match self
            .request::<(), _>(Method::GET, &format!("/doctors/{id}"), &[], None)
            .await
        {
            Ok(doctor) => Ok(Some(doctor)),
            Err(ClientError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_profile(&self) -> Result<Value, ClientError> {
        self.request::<(), _>(Method::GET, "/profile", &[], None)
            .await
    }

    async fn patch_profile(&self, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::PATCH, "/profile", &[], Some(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_rows_are_skipped() {
        let rows = vec![
            json!({"id": 1, "date": "2030-05-01", "time": "10:00 AM", "status": "confirmed"}),
            json!({"userId": 1, "doctorName": "x", "status": "scheduled"}),
            json!({"id": 2, "date": "2030-05-02", "time": "10:00 AM", "status": "on hold"}),
        ];
        let decoded: Vec<Appointment> = decode_rows("appointments", rows);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, RecordId::from("1"));
    }
}
