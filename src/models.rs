use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::SessionTable;
use crate::store::ResourceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResourceStore>,
    pub sessions: Arc<SessionTable>,
    pub session_ttl_hours: i64,
}

impl AppState {
    pub fn new(store: ResourceStore, session_ttl_hours: i64) -> Self {
        Self {
            store: Arc::new(store),
            sessions: Arc::new(SessionTable::new()),
            session_ttl_hours,
        }
    }
}

/* -------------------------
   Identity
--------------------------*/

/// Canonical record identity.
///
/// The resource API hands out ids as JSON numbers for seeded records and as
/// strings for everything created later, so ids are normalized to their
/// string form on ingestion and compared only in that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity used when no user is signed in.
    pub fn fallback_user() -> Self {
        Self("1".into())
    }

    /// Ids minted on this device while the resource API was unreachable.
    pub fn local() -> Self {
        Self(format!("local-{}", uuid::Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize a raw JSON id. Integers keep their integer spelling so that
    /// `7` and `"7"` are the same record.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    Some(Self(n.to_string()))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        RecordId::from_json(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid record id: {raw}")))
    }
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Completed and cancelled appointments are history no matter their date.
    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default, alias = "doctorSpecialty")]
    pub specialty: String,
    #[serde(default)]
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_image: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
}

impl Appointment {
    pub fn ordering_key(&self) -> (NaiveDate, TimeKey) {
        (self.date, TimeKey::parse(&self.time))
    }

    pub fn belongs_to(&self, user_id: &RecordId) -> bool {
        self.user_id.as_ref().is_none_or(|owner| owner == user_id)
    }
}

/// Appointment as assembled by the booking wizard, before any store has
/// assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub user_id: RecordId,
    pub doctor_id: RecordId,
    pub doctor_name: String,
    pub specialty: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_image: Option<String>,
    pub reason: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub patient_info: PatientInfo,
}

impl NewAppointment {
    pub fn into_appointment(self, id: RecordId) -> Appointment {
        Appointment {
            id,
            user_id: Some(self.user_id),
            doctor_id: Some(self.doctor_id),
            doctor_name: self.doctor_name,
            specialty: self.specialty,
            location: self.location,
            date: self.date,
            time: self.time,
            status: self.status,
            fee: self.fee,
            doctor_image: self.doctor_image,
            reason: self.reason,
            notes: self.notes,
            created_at: Some(self.created_at),
            patient_info: Some(self.patient_info),
        }
    }
}

/// Partial update sent as a PATCH body and replayed onto cached copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl AppointmentPatch {
    pub fn cancel() -> Self {
        Self {
            status: Some(AppointmentStatus::Cancelled),
            ..Self::default()
        }
    }

    pub fn reschedule(date: NaiveDate, time: impl Into<String>) -> Self {
        Self {
            date: Some(date),
            time: Some(time.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(date) = self.date {
            appointment.date = date;
        }
        if let Some(time) = &self.time {
            appointment.time = time.clone();
        }
    }
}

/// Time half of the ordering key. Display strings such as `09:30 AM` sort as
/// clock times; anything unparsable sorts after them, as plain text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeKey {
    Clock(NaiveTime),
    Text(String),
}

impl TimeKey {
    const FORMATS: [&'static str; 4] = ["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"];

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self::FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
            .map(TimeKey::Clock)
            .unwrap_or_else(|| TimeKey::Text(trimmed.to_string()))
    }
}

/* -------------------------
   Doctors / patients / session
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_available: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub reason: String,
    pub notes: String,
}

impl PatientInfo {
    /// Required fields that are still blank, by wire name. Notes are optional.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("dateOfBirth", &self.date_of_birth),
            ("gender", &self.gender),
            ("address", &self.address),
            ("reason", &self.reason),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Signed-in user as mirrored on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/* -------------------------
   Auth DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Value,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: Value,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}
