// src/reconciler.rs

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::cache::{AppointmentCache, LocalStore};
use crate::client::ResourceApi;
use crate::error::CacheError;
use crate::models::{Appointment, AppointmentPatch, NewAppointment, RecordId};

/* ============================================================
   Pure merge / categorize
   ============================================================ */

/// Union of server and cached appointments, at most once per id.
///
/// Server records come first in their original order, followed by cached
/// records whose id the server does not know. When both sides carry the same
/// id the server copy wins outright.
pub fn merge(server: Vec<Appointment>, cache: Vec<Appointment>) -> Vec<Appointment> {
    let mut seen: HashSet<RecordId> = server.iter().map(|apt| apt.id.clone()).collect();
    let mut merged = server;

    for apt in cache {
        if seen.insert(apt.id.clone()) {
            merged.push(apt);
        }
    }
    merged
}

/// Reverse chronological order by (date, time). Stable.
pub fn sort_newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| b.ordering_key().cmp(&a.ordering_key()));
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categorized {
    /// Soonest first.
    pub upcoming: Vec<Appointment>,
    /// Most recent first.
    pub past: Vec<Appointment>,
}

pub fn is_past(appointment: &Appointment, today: NaiveDate) -> bool {
    appointment.date < today || appointment.status.is_terminal()
}

/// Split into upcoming and past. Only the calendar date is compared with
/// `today`; a terminal status sends an appointment to `past` even when it is
/// dated today or later.
pub fn categorize(appointments: &[Appointment], today: NaiveDate) -> Categorized {
    let (mut past, mut upcoming): (Vec<_>, Vec<_>) = appointments
        .iter()
        .cloned()
        .partition(|apt| is_past(apt, today));

    upcoming.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
    sort_newest_first(&mut past);

    Categorized { upcoming, past }
}

/* ============================================================
   Reconciler
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSource {
    Server,
    /// The resource API was unreachable; only the device cache was used.
    CacheOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedView {
    /// Newest first.
    pub appointments: Vec<Appointment>,
    pub source: ViewSource,
    /// Cached writes the resource API has not acknowledged yet.
    pub pending_sync: Vec<RecordId>,
}

impl MergedView {
    pub fn categorize(&self, today: NaiveDate) -> Categorized {
        categorize(&self.appointments, today)
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.pending_sync.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    /// Stored on the device only; the remote write failed with `reason`.
    Pending { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub appointment: Appointment,
    pub sync: SyncState,
}

impl WriteOutcome {
    pub fn is_synced(&self) -> bool {
        self.sync == SyncState::Synced
    }
}

pub struct Reconciler<A, S> {
    api: A,
    cache: AppointmentCache<S>,
    default_user: RecordId,
}

impl<A: ResourceApi, S: LocalStore> Reconciler<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            cache: AppointmentCache::new(store),
            default_user: RecordId::fallback_user(),
        }
    }

    /// Identity assumed when no user is signed in.
    pub fn with_default_user(mut self, user_id: RecordId) -> Self {
        self.default_user = user_id;
        self
    }

    pub fn default_user(&self) -> &RecordId {
        &self.default_user
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &AppointmentCache<S> {
        &self.cache
    }

    /// Server list merged with the device cache, newest first.
    ///
    /// Without a user id the default user is assumed. A failing server
    /// call is not an error: the view is built from the cache alone.
    pub async fn fetch_and_merge(&self, user_id: Option<&RecordId>) -> MergedView {
        let user_id = user_id.unwrap_or(&self.default_user);

        let cached: Vec<Appointment> = self
            .cache
            .appointments()
            .into_iter()
            .filter(|apt| apt.belongs_to(user_id))
            .collect();

        let (server, source) = match self.api.list_appointments(user_id).await {
            Ok(list) => (list, ViewSource::Server),
            Err(e) => {
                tracing::warn!(%user_id, "appointments API unavailable, using local cache: {e}");
                (Vec::new(), ViewSource::CacheOnly)
            }
        };

        let mut appointments = merge(server, cached);
        sort_newest_first(&mut appointments);

        MergedView {
            appointments,
            source,
            pending_sync: self.cache.pending_ids(user_id),
        }
    }

    /// Persist a new booking. The server assigns the id when reachable;
    /// otherwise a local id is minted and the booking is queued on the device.
    pub async fn book(&self, new: NewAppointment) -> Result<WriteOutcome, CacheError> {
        match self.api.create_appointment(&new).await {
            Ok(created) => {
                tracing::info!(id = %created.id, "appointment booked");
                self.mirror_synced(&created);
                Ok(WriteOutcome {
                    appointment: created,
                    sync: SyncState::Synced,
                })
            }
            Err(e) => {
                let appointment = new.into_appointment(RecordId::local());
                tracing::warn!(id = %appointment.id, "booking kept on device only: {e}");
                self.cache.upsert(appointment.clone(), true)?;
                Ok(WriteOutcome {
                    appointment,
                    sync: SyncState::Pending {
                        reason: e.to_string(),
                    },
                })
            }
        }
    }

    pub async fn cancel(&self, appointment: &Appointment) -> Result<WriteOutcome, CacheError> {
        self.write_through(appointment, AppointmentPatch::cancel())
            .await
    }

    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        date: NaiveDate,
        time: &str,
    ) -> Result<WriteOutcome, CacheError> {
        self.write_through(appointment, AppointmentPatch::reschedule(date, time))
            .await
    }

    /// The server already holds `appointment`, so a failing cache write only
    /// leaves the device copy stale until the next fetch.
    fn mirror_synced(&self, appointment: &Appointment) {
        if let Err(e) = self.cache.upsert(appointment.clone(), false) {
            tracing::warn!(id = %appointment.id, "failed to mirror synced appointment locally: {e}");
        }
    }

    /// Send `patch` to the resource API and mirror the result into the cache
    /// either way. Appointments that only exist locally are never sent.
    async fn write_through(
        &self,
        appointment: &Appointment,
        patch: AppointmentPatch,
    ) -> Result<WriteOutcome, CacheError> {
        let remote = if appointment.id.is_local() {
            Err("appointment has not reached the server yet".to_string())
        } else {
            self.api
                .patch_appointment(&appointment.id, &patch)
                .await
                .map_err(|e| e.to_string())
        };

        match remote {
            Ok(updated) => {
                tracing::info!(id = %updated.id, "appointment updated");
                self.mirror_synced(&updated);
                Ok(WriteOutcome {
                    appointment: updated,
                    sync: SyncState::Synced,
                })
            }
            Err(reason) => {
                let mut local = self
                    .cache
                    .get(&appointment.id)
                    .map(|entry| entry.appointment)
                    .unwrap_or_else(|| appointment.clone());
                patch.apply_to(&mut local);
                tracing::warn!(id = %local.id, "update kept on device only: {reason}");
                self.cache.upsert(local.clone(), true)?;
                Ok(WriteOutcome {
                    appointment: local,
                    sync: SyncState::Pending { reason },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use serde_json::json;

    fn apt(id: &str, date: &str, time: &str, status: &str) -> Appointment {
        serde_json::from_value(json!({
            "id": id, "userId": 1, "date": date, "time": time, "status": status
        }))
        .unwrap()
    }

    fn ids(list: &[Appointment]) -> Vec<&str> {
        list.iter().map(|a| a.id.as_str()).collect()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn merge_prefers_server_and_keeps_order() {
        let server = vec![
            apt("1", "2026-02-10", "09:00 AM", "confirmed"),
            apt("2", "2026-02-11", "09:00 AM", "pending"),
        ];
        let cache = vec![
            apt("2", "2026-02-11", "09:00 AM", "cancelled"),
            apt("local-x", "2026-03-01", "10:00 AM", "scheduled"),
            apt("3", "2026-01-20", "10:00 AM", "scheduled"),
        ];

        let merged = merge(server, cache);
        assert_eq!(ids(&merged), vec!["1", "2", "local-x", "3"]);
        assert_eq!(merged[1].status, AppointmentStatus::Pending);
    }

    #[test]
    fn merge_with_empty_cache_is_server_list() {
        let server = vec![apt("1", "2026-02-10", "09:00 AM", "confirmed")];
        assert_eq!(merge(server.clone(), vec![]), server);
    }

    #[test]
    fn confirmed_future_appointment_is_upcoming() {
        let list = vec![apt("1", "2026-02-10", "09:00 AM", "confirmed")];
        let out = categorize(&list, day("2026-01-01"));
        assert_eq!(ids(&out.upcoming), vec!["1"]);
        assert!(out.past.is_empty());
    }

    #[test]
    fn old_pending_appointment_is_past() {
        let list = vec![apt("2", "2020-01-01", "09:00 AM", "pending")];
        let out = categorize(&list, day("2026-01-01"));
        assert!(out.upcoming.is_empty());
        assert_eq!(ids(&out.past), vec!["2"]);
    }

    #[test]
    fn cancelled_today_is_past_but_pending_today_is_upcoming() {
        let list = vec![
            apt("3", "2026-01-01", "09:00 AM", "cancelled"),
            apt("4", "2026-01-01", "11:00 PM", "pending"),
        ];
        let out = categorize(&list, day("2026-01-01"));
        assert_eq!(ids(&out.upcoming), vec!["4"]);
        assert_eq!(ids(&out.past), vec!["3"]);
    }

    #[test]
    fn buckets_are_sorted_by_date_then_clock_time() {
        let list = vec![
            apt("a", "2026-02-10", "02:00 PM", "scheduled"),
            apt("b", "2026-02-10", "09:30 AM", "scheduled"),
            apt("c", "2026-02-09", "05:00 PM", "confirmed"),
            apt("d", "2026-02-10", "12:00 PM", "pending"),
            apt("e", "2025-12-01", "09:00 AM", "completed"),
            apt("f", "2025-12-01", "03:00 PM", "completed"),
            apt("g", "2026-03-01", "10:00 AM", "cancelled"),
        ];
        let out = categorize(&list, day("2026-01-01"));
        assert_eq!(ids(&out.upcoming), vec!["c", "b", "d", "a"]);
        assert_eq!(ids(&out.past), vec!["g", "f", "e"]);
    }

    #[test]
    fn identical_keys_keep_input_order() {
        let list = vec![
            apt("x", "2026-02-10", "09:00 AM", "scheduled"),
            apt("y", "2026-02-10", "09:00 AM", "scheduled"),
            apt("p", "2020-02-10", "09:00 AM", "scheduled"),
            apt("q", "2020-02-10", "09:00 AM", "scheduled"),
        ];
        let out = categorize(&list, day("2026-01-01"));
        assert_eq!(ids(&out.upcoming), vec!["x", "y"]);
        assert_eq!(ids(&out.past), vec!["p", "q"]);
    }

    #[test]
    fn newest_first_sort() {
        let mut list = vec![
            apt("old", "2025-01-01", "09:00 AM", "completed"),
            apt("late", "2026-02-10", "04:30 PM", "scheduled"),
            apt("early", "2026-02-10", "09:00 AM", "scheduled"),
        ];
        sort_newest_first(&mut list);
        assert_eq!(ids(&list), vec!["late", "early", "old"]);
    }
}
