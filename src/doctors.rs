// src/doctors.rs

use crate::client::ResourceApi;
use crate::error::ClientError;
use crate::models::{Doctor, RecordId};

pub const SPECIALTIES: [&str; 10] = [
    "Cardiology",
    "Dermatology",
    "Endocrinology",
    "Gastroenterology",
    "General Practice",
    "Neurology",
    "Oncology",
    "Orthopedics",
    "Pediatrics",
    "Psychiatry",
];

pub const LOCATIONS: [&str; 7] = [
    "Boston",
    "Cambridge",
    "Chicago",
    "Los Angeles",
    "New York",
    "San Francisco",
    "Seattle",
];

#[derive(Debug, Clone, Default)]
pub struct DoctorQuery {
    pub search_term: String,
    pub specialty: String,
    pub location: String,
}

impl DoctorQuery {
    pub fn matches_name(&self, doctor: &Doctor) -> bool {
        let term = self.search_term.trim().to_lowercase();
        term.is_empty() || doctor.name.to_lowercase().contains(&term)
    }
}

/// Specialty and location are filtered by the resource API; the free-text
/// name search runs here because the API only does exact field matches.
pub async fn search_doctors<A: ResourceApi + ?Sized>(
    api: &A,
    query: &DoctorQuery,
) -> Result<Vec<Doctor>, ClientError> {
    let specialty = Some(query.specialty.trim()).filter(|s| !s.is_empty());
    let location = Some(query.location.trim()).filter(|s| !s.is_empty());

    let doctors = api.list_doctors(specialty, location).await?;
    Ok(doctors
        .into_iter()
        .filter(|d| query.matches_name(d))
        .collect())
}

pub async fn find_doctor<A: ResourceApi + ?Sized>(
    api: &A,
    id: &RecordId,
) -> Result<Option<Doctor>, ClientError> {
    api.get_doctor(id).await
}
