// src/portal.rs

use chrono::{DateTime, NaiveDate, Utc};

use crate::cache::{self, JsonFileStore, LocalStore};
use crate::client::{HttpResourceApi, ResourceApi};
use crate::config::ClientConfig;
use crate::doctors::{self, DoctorQuery};
use crate::error::{CacheError, ClientError, WizardError};
use crate::models::{Appointment, Doctor, SessionUser};
use crate::notifications::{NotificationHub, NotificationKind};
use crate::profile::ProfileService;
use crate::reconciler::{Categorized, MergedView, Reconciler, SyncState, WriteOutcome};
use crate::wizard::BookingWizard;

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentsPage {
    pub view: MergedView,
    pub buckets: Categorized,
}

/// Application root for the patient-facing screens: owns the reconciler and
/// the notification hub and turns write outcomes into user messages.
pub struct Portal<A, S> {
    reconciler: Reconciler<A, S>,
    notifications: NotificationHub,
}

impl Portal<HttpResourceApi, JsonFileStore> {
    /// Portal talking to `cfg.api_base_url`, caching to `cfg.cache_file`.
    pub fn from_config(cfg: &ClientConfig) -> Result<Self, ClientError> {
        let api = HttpResourceApi::new(cfg)?;
        let reconciler = Reconciler::new(api, JsonFileStore::new(cfg.cache_file.clone()))
            .with_default_user(cfg.default_user_id.clone());
        Ok(Self {
            reconciler,
            notifications: NotificationHub::new(),
        })
    }
}

impl<A: ResourceApi, S: LocalStore> Portal<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            reconciler: Reconciler::new(api, store),
            notifications: NotificationHub::new(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<A, S> {
        &self.reconciler
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    pub fn session_user(&self) -> Option<SessionUser> {
        cache::session_user(self.reconciler.cache().store())
    }

    pub fn profile(&self) -> ProfileService<'_, A, S> {
        ProfileService::new(self.reconciler.api(), self.reconciler.cache().store())
    }

    pub fn new_booking(&self, doctor: Option<Doctor>) -> BookingWizard {
        let session = self.session_user();
        match doctor {
            Some(doctor) => BookingWizard::with_doctor(doctor, session.as_ref()),
            None => BookingWizard::new(session.as_ref()),
        }
    }

    pub async fn search_doctors(&self, query: &DoctorQuery) -> Result<Vec<Doctor>, ClientError> {
        doctors::search_doctors(self.reconciler.api(), query).await
    }

    pub async fn appointments(&self, today: NaiveDate) -> AppointmentsPage {
        let session = self.session_user();
        let view = self
            .reconciler
            .fetch_and_merge(session.as_ref().map(|u| &u.id))
            .await;
        let buckets = view.categorize(today);
        AppointmentsPage { view, buckets }
    }

    pub async fn cancel(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, CacheError> {
        let result = self.reconciler.cancel(appointment).await;
        self.announce(&result, "Appointment cancelled successfully!", now);
        result
    }

    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        date: NaiveDate,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, CacheError> {
        let result = self.reconciler.reschedule(appointment, date, time).await;
        self.announce(&result, "Appointment rescheduled successfully!", now);
        result
    }

    pub async fn book(
        &self,
        wizard: &mut BookingWizard,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, WizardError> {
        let result = wizard.submit(&self.reconciler, now).await;
        match &result {
            Ok(outcome) => self.announce_outcome(outcome, "Appointment booked successfully!", now),
            Err(e) => {
                self.notifications
                    .publish(e.to_string(), NotificationKind::Error, now);
            }
        }
        result
    }

    fn announce(
        &self,
        result: &Result<WriteOutcome, CacheError>,
        success: &str,
        now: DateTime<Utc>,
    ) {
        match result {
            Ok(outcome) => self.announce_outcome(outcome, success, now),
            Err(e) => {
                self.notifications.publish(
                    format!("Could not save your change: {e}"),
                    NotificationKind::Error,
                    now,
                );
            }
        }
    }

    fn announce_outcome(&self, outcome: &WriteOutcome, success: &str, now: DateTime<Utc>) {
        match &outcome.sync {
            SyncState::Synced => {
                self.notifications
                    .publish(success, NotificationKind::Success, now);
            }
            SyncState::Pending { .. } => {
                self.notifications.publish(
                    "Saved on this device only. It will not appear on other devices until it syncs.",
                    NotificationKind::Warning,
                    now,
                );
            }
        }
    }
}
