#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};

use healthcare_portal::cache::LocalStore;
use healthcare_portal::client::ResourceApi;
use healthcare_portal::error::{CacheError, ClientError};
use healthcare_portal::models::{Appointment, AppointmentPatch, Doctor, NewAppointment, RecordId};
use healthcare_portal::profile::merge_profile;

/// In-process stand-in for the resource API that can be switched offline.
pub struct FakeApi {
    online: AtomicBool,
    next_id: AtomicUsize,
    pub appointments: Mutex<Vec<Appointment>>,
    pub doctors: Vec<Doctor>,
    pub profile: Mutex<Value>,
}

impl FakeApi {
    pub fn online(appointments: Vec<Appointment>) -> Self {
        Self {
            online: AtomicBool::new(true),
            next_id: AtomicUsize::new(100),
            appointments: Mutex::new(appointments),
            doctors: vec![doctor(1, "Dr. Sarah Smith", "Cardiology"), doctor(2, "Dr. Michael Jones", "Pediatrics")],
            profile: Mutex::new(json!({"name": "John Doe", "personalInfo": {"phone": "555"}})),
        }
    }

    pub fn offline() -> Self {
        let api = Self::online(vec![]);
        api.set_online(false);
        api
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: 503,
                message: "Service Unavailable".into(),
            })
        }
    }
}

#[async_trait]
impl ResourceApi for FakeApi {
    async fn list_appointments(&self, user_id: &RecordId) -> Result<Vec<Appointment>, ClientError> {
        self.check()?;
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn create_appointment(&self, new: &NewAppointment) -> Result<Appointment, ClientError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = new.clone().into_appointment(RecordId::from(id as i64));
        self.appointments.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn patch_appointment(
        &self,
        id: &RecordId,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, ClientError> {
        self.check()?;
        let mut list = self.appointments.lock().unwrap();
        let apt = list.iter_mut().find(|a| &a.id == id).ok_or(ClientError::NotFound)?;
        patch.apply_to(apt);
        Ok(apt.clone())
    }

    async fn list_doctors(
        &self,
        specialty: Option<&str>,
        location: Option<&str>,
    ) -> Result<Vec<Doctor>, ClientError> {
        self.check()?;
        Ok(self
            .doctors
            .iter()
            .filter(|d| specialty.is_none_or(|s| d.specialty.eq_ignore_ascii_case(s)))
            .filter(|d| location.is_none_or(|l| d.location.eq_ignore_ascii_case(l)))
            .cloned()
            .collect())
    }

    async fn get_doctor(&self, id: &RecordId) -> Result<Option<Doctor>, ClientError> {
        self.check()?;
        Ok(self.doctors.iter().find(|d| &d.id == id).cloned())
    }

    async fn get_profile(&self) -> Result<Value, ClientError> {
        self.check()?;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn patch_profile(&self, body: &Value) -> Result<Value, ClientError> {
        self.check()?;
        let mut profile = self.profile.lock().unwrap();
        merge_profile(&mut profile, body);
        Ok(profile.clone())
    }
}

pub fn doctor(id: i64, name: &str, specialty: &str) -> Doctor {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "specialty": specialty,
        "location": "New York",
        "consultationFee": 150,
        "image": "https://example.test/doc.png"
    }))
    .unwrap()
}

pub fn appointment(id: &str, user: &str, date: &str, time: &str, status: &str) -> Appointment {
    serde_json::from_value(json!({
        "id": id,
        "userId": user,
        "doctorName": "Dr. Sarah Smith",
        "date": date,
        "time": time,
        "status": status
    }))
    .unwrap()
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Local store on a full disk: reads find nothing and every write fails.
pub struct FullDiskStore;

impl LocalStore for FullDiskStore {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value) -> Result<(), CacheError> {
        Err(std::io::Error::other("disk full").into())
    }

    fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(std::io::Error::other("disk full").into())
    }
}
