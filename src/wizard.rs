// src/wizard.rs

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::cache::LocalStore;
use crate::client::ResourceApi;
use crate::error::{ValidationError, WizardError};
use crate::models::{AppointmentStatus, Doctor, NewAppointment, PatientInfo, RecordId, SessionUser};
use crate::reconciler::{Reconciler, WriteOutcome};

/// Bookable half-hour slots offered on step 2.
pub const TIME_SLOTS: [&str; 16] = [
    "09:00 AM", "09:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM",
    "12:00 PM", "12:30 PM", "02:00 PM", "02:30 PM", "03:00 PM", "03:30 PM",
    "04:00 PM", "04:30 PM", "05:00 PM", "05:30 PM",
];

pub const BOOKING_WINDOW_DAYS: u64 = 14;

/// The days offered on step 2: tomorrow through two weeks out.
pub fn available_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (1..=BOOKING_WINDOW_DAYS)
        .filter_map(|n| today.checked_add_days(Days::new(n)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    SelectDoctor = 1,
    SelectDateTime = 2,
    PatientInfo = 3,
}

impl Step {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::SelectDoctor => "Select Doctor",
            Step::SelectDateTime => "Date & Time",
            Step::PatientInfo => "Patient Info",
        }
    }

    fn forward(self) -> Self {
        match self {
            Step::SelectDoctor => Step::SelectDateTime,
            Step::SelectDateTime | Step::PatientInfo => Step::PatientInfo,
        }
    }

    fn backward(self) -> Self {
        match self {
            Step::SelectDoctor | Step::SelectDateTime => Step::SelectDoctor,
            Step::PatientInfo => Step::SelectDateTime,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub current_step: Step,
    pub selected_doctor: Option<Doctor>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: String,
    pub patient_info: PatientInfo,
}

impl BookingDraft {
    fn gate(&self, step: Step) -> Result<(), ValidationError> {
        match step {
            Step::SelectDoctor if self.selected_doctor.is_none() => Err(ValidationError::DoctorRequired),
            Step::SelectDateTime
                if self.appointment_date.is_none() || self.appointment_time.trim().is_empty() =>
            {
                Err(ValidationError::DateTimeRequired)
            }
            Step::PatientInfo => {
                let missing = self.patient_info.missing_required_fields();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ValidationError::MissingPatientFields(missing))
                }
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Drafting(BookingDraft),
    /// Terminal: the draft has been handed to the reconciler.
    Booked(WriteOutcome),
}

/// Three-step booking form: doctor, then date and time, then patient details.
pub struct BookingWizard {
    phase: Phase,
    /// Signed-in user; without one the reconciler's default user books.
    user_id: Option<RecordId>,
}

impl BookingWizard {
    pub fn new(session: Option<&SessionUser>) -> Self {
        let patient_info = PatientInfo {
            full_name: session.map(|u| u.name.clone()).unwrap_or_default(),
            email: session.map(|u| u.email.clone()).unwrap_or_default(),
            ..PatientInfo::default()
        };
        Self {
            phase: Phase::Drafting(BookingDraft {
                current_step: Step::SelectDoctor,
                selected_doctor: None,
                appointment_date: None,
                appointment_time: String::new(),
                patient_info,
            }),
            user_id: session.map(|u| u.id.clone()),
        }
    }

    /// Start with a doctor picked from search results. The wizard still opens
    /// on step 1 so the choice can be reviewed.
    pub fn with_doctor(doctor: Doctor, session: Option<&SessionUser>) -> Self {
        let mut wizard = Self::new(session);
        wizard.select_doctor(doctor);
        wizard
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn draft(&self) -> Option<&BookingDraft> {
        match &self.phase {
            Phase::Drafting(draft) => Some(draft),
            Phase::Booked(_) => None,
        }
    }

    fn draft_mut(&mut self) -> Option<&mut BookingDraft> {
        match &mut self.phase {
            Phase::Drafting(draft) => Some(draft),
            Phase::Booked(_) => None,
        }
    }

    /// `None` once booked.
    pub fn step(&self) -> Option<Step> {
        self.draft().map(|d| d.current_step)
    }

    pub fn select_doctor(&mut self, doctor: Doctor) {
        if let Some(draft) = self.draft_mut() {
            draft.selected_doctor = Some(doctor);
        }
    }

    pub fn clear_doctor(&mut self) {
        if let Some(draft) = self.draft_mut() {
            draft.selected_doctor = None;
        }
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        if let Some(draft) = self.draft_mut() {
            draft.appointment_date = Some(date);
        }
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        if let Some(draft) = self.draft_mut() {
            draft.appointment_time = time.into();
        }
    }

    pub fn patient_info_mut(&mut self) -> Option<&mut PatientInfo> {
        self.draft_mut().map(|d| &mut d.patient_info)
    }

    /// Advance one step if the current step is complete. On step 3 this is a
    /// no-op; only `submit` leaves it.
    pub fn next(&mut self) -> Result<Step, ValidationError> {
        let draft = self.draft_mut().ok_or(ValidationError::AlreadyBooked)?;
        if draft.current_step == Step::PatientInfo {
            return Ok(draft.current_step);
        }
        draft.gate(draft.current_step)?;
        draft.current_step = draft.current_step.forward();
        Ok(draft.current_step)
    }

    pub fn back(&mut self) -> Option<Step> {
        let draft = self.draft_mut()?;
        draft.current_step = draft.current_step.backward();
        Some(draft.current_step)
    }

    /// Validate the whole draft, build the appointment and hand it to the
    /// reconciler. The draft survives any error so the user can retry.
    pub async fn submit<A, S>(
        &mut self,
        reconciler: &Reconciler<A, S>,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, WizardError>
    where
        A: ResourceApi,
        S: LocalStore,
    {
        let new = self.build(reconciler.default_user(), now)?;
        let outcome = reconciler.book(new).await?;
        self.phase = Phase::Booked(outcome.clone());
        Ok(outcome)
    }

    fn build(
        &self,
        default_user: &RecordId,
        now: DateTime<Utc>,
    ) -> Result<NewAppointment, ValidationError> {
        let draft = self.draft().ok_or(ValidationError::AlreadyBooked)?;
        if draft.current_step != Step::PatientInfo {
            return Err(ValidationError::NotOnFinalStep);
        }
        for step in [Step::SelectDoctor, Step::SelectDateTime, Step::PatientInfo] {
            draft.gate(step)?;
        }

        let (Some(doctor), Some(date)) = (&draft.selected_doctor, draft.appointment_date) else {
            return Err(ValidationError::DateTimeRequired);
        };
        let info = draft.patient_info.clone();

        Ok(NewAppointment {
            user_id: self.user_id.clone().unwrap_or_else(|| default_user.clone()),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            location: doctor.location.clone(),
            date,
            time: draft.appointment_time.trim().to_string(),
            status: AppointmentStatus::Scheduled,
            fee: doctor.consultation_fee,
            doctor_image: doctor.image.clone(),
            reason: info.reason.clone(),
            notes: info.notes.clone(),
            created_at: now,
            patient_info: info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doctor() -> Doctor {
        serde_json::from_value(json!({
            "id": 1, "name": "Dr. Sarah Smith", "specialty": "Cardiology",
            "location": "New York", "consultationFee": 150
        }))
        .unwrap()
    }

    #[test]
    fn next_requires_doctor() {
        let mut wizard = BookingWizard::new(None);
        assert_eq!(wizard.next(), Err(ValidationError::DoctorRequired));
        assert_eq!(wizard.step(), Some(Step::SelectDoctor));

        wizard.select_doctor(doctor());
        assert_eq!(wizard.next(), Ok(Step::SelectDateTime));
    }

    #[test]
    fn next_requires_date_and_time() {
        let mut wizard = BookingWizard::with_doctor(doctor(), None);
        assert_eq!(wizard.step(), Some(Step::SelectDoctor));
        wizard.next().unwrap();

        wizard.set_date(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());
        assert_eq!(wizard.next(), Err(ValidationError::DateTimeRequired));
        wizard.set_time("   ");
        assert_eq!(wizard.next(), Err(ValidationError::DateTimeRequired));
        wizard.set_time("10:00 AM");
        assert_eq!(wizard.next(), Ok(Step::PatientInfo));
        assert_eq!(wizard.next(), Ok(Step::PatientInfo));
    }

    #[test]
    fn back_is_unconditional_and_clamped() {
        let mut wizard = BookingWizard::with_doctor(doctor(), None);
        wizard.next().unwrap();
        wizard.clear_doctor();
        assert_eq!(wizard.back(), Some(Step::SelectDoctor));
        assert_eq!(wizard.back(), Some(Step::SelectDoctor));
    }

    #[test]
    fn session_prefills_patient_info() {
        let user = SessionUser {
            id: RecordId::from("5"),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
        };
        let wizard = BookingWizard::new(Some(&user));
        let info = &wizard.draft().unwrap().patient_info;
        assert_eq!(info.full_name, "Ada Lovelace");
        assert_eq!(info.email, "ada@example.com");
        assert!(info.phone.is_empty());
    }

    #[test]
    fn build_rejects_before_final_step() {
        let wizard = BookingWizard::with_doctor(doctor(), None);
        assert_eq!(
            wizard.build(&RecordId::fallback_user(), Utc::now()),
            Err(ValidationError::NotOnFinalStep)
        );
    }

    #[test]
    fn available_dates_cover_two_weeks_after_today() {
        let today = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        let dates = available_dates(today);
        assert_eq!(dates.len(), 14);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2026, 12, 26).unwrap());
        assert_eq!(dates[13], NaiveDate::from_ymd_opt(2027, 1, 8).unwrap());
    }
}
