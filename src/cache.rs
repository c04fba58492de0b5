// src/cache.rs

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CacheError;
use crate::models::{Appointment, RecordId, SessionUser};

pub const APPOINTMENTS_KEY: &str = "healthcare_booked_appointments";
pub const PROFILE_KEY: &str = "healthcare_profile";
pub const SESSION_USER_KEY: &str = "user";

/// Durable key-value store on the device.
///
/// Reads never fail: a missing, unreadable or corrupt entry is reported as
/// absent so callers can always fall back to an empty view.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

impl<S: LocalStore + ?Sized> LocalStore for Arc<S> {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

/* ============================================================
   In-memory store
   ============================================================ */

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/* ============================================================
   JSON file store
   ============================================================ */

/// All keys live in one JSON object. Writes go to a sibling temp file that is
/// renamed over the original, so a crash never leaves half a document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Map<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "cannot read local store: {e}");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "local store is corrupt, ignoring it");
                Map::new()
            }
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock().ok()?;
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        let mut map = self.read_all();
        map.insert(key.to_string(), value);
        self.write_all(map)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        let mut map = self.read_all();
        if map.remove(key).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }
}

/* ============================================================
   Appointment cache
   ============================================================ */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    /// Set while the resource API has not acknowledged the latest local write.
    #[serde(default)]
    pub sync_pending: bool,
}

/// Appointments created or changed on this device, keyed by id.
pub struct AppointmentCache<S> {
    store: S,
}

impl<S: LocalStore> AppointmentCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn entries(&self) -> Vec<CachedAppointment> {
        let Some(Value::Array(items)) = self.store.get(APPOINTMENTS_KEY) else {
            return vec![];
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<CachedAppointment>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable cached appointment: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.entries().into_iter().map(|e| e.appointment).collect()
    }

    pub fn get(&self, id: &RecordId) -> Option<CachedAppointment> {
        self.entries().into_iter().find(|e| &e.appointment.id == id)
    }

    /// Insert or supersede the entry with the same id, keeping its position.
    pub fn upsert(&self, appointment: Appointment, sync_pending: bool) -> Result<(), CacheError> {
        let mut entries = self.entries();
        let entry = CachedAppointment {
            appointment,
            sync_pending,
        };
        match entries
            .iter_mut()
            .find(|e| e.appointment.id == entry.appointment.id)
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.store.set(APPOINTMENTS_KEY, serde_json::to_value(&entries)?)
    }

    /// Ids of `user_id`'s entries still waiting for the resource API.
    pub fn pending_ids(&self, user_id: &RecordId) -> Vec<RecordId> {
        self.entries()
            .into_iter()
            .filter(|e| e.sync_pending && e.appointment.belongs_to(user_id))
            .map(|e| e.appointment.id)
            .collect()
    }
}

/* ============================================================
   Session user mirror
   ============================================================ */

pub fn session_user(store: &impl LocalStore) -> Option<SessionUser> {
    let raw = store.get(SESSION_USER_KEY)?;
    match serde_json::from_value(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!("error parsing session user from local store: {e}");
            None
        }
    }
}

pub fn save_session_user(store: &impl LocalStore, user: &SessionUser) -> Result<(), CacheError> {
    store.set(SESSION_USER_KEY, serde_json::to_value(user)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use serde_json::json;

    fn appointment(id: &str, status: &str) -> Appointment {
        serde_json::from_value(json!({
            "id": id, "userId": 1, "date": "2026-02-10", "time": "09:00 AM", "status": status
        }))
        .unwrap()
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("healthcare-cache-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn upsert_supersedes_in_place() {
        let cache = AppointmentCache::new(MemoryStore::new());
        cache.upsert(appointment("a", "scheduled"), true).unwrap();
        cache.upsert(appointment("b", "scheduled"), false).unwrap();
        cache.upsert(appointment("a", "cancelled"), false).unwrap();

        let entries = cache.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].appointment.id, RecordId::from("a"));
        assert_eq!(entries[0].appointment.status, AppointmentStatus::Cancelled);
        assert!(!entries[0].sync_pending);
        assert!(cache.pending_ids(&RecordId::from("1")).is_empty());
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let store = MemoryStore::new();
        store
            .set(
                APPOINTMENTS_KEY,
                json!([
                    {"id": "ok", "date": "2026-02-10", "status": "pending", "syncPending": true},
                    {"id": "bad", "date": "not a date", "status": "pending"}
                ]),
            )
            .unwrap();
        let cache = AppointmentCache::new(store);
        assert_eq!(cache.appointments().len(), 1);
        assert_eq!(cache.pending_ids(&RecordId::from("1")), vec![RecordId::from("ok")]);
    }

    #[test]
    fn file_store_round_trips_and_tolerates_corruption() {
        let path = temp_path();
        let store = JsonFileStore::new(&path);
        assert!(store.get("missing").is_none());

        store.set("k", json!({"v": 1})).unwrap();
        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("k"), Some(json!({"v": 1})));

        reopened.remove("k").unwrap();
        assert!(reopened.get("k").is_none());

        fs::write(&path, "{ not json").unwrap();
        assert!(reopened.get("k").is_none());
        reopened.set("k", json!(2)).unwrap();
        assert_eq!(reopened.get("k"), Some(json!(2)));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn session_user_mirror() {
        let store = MemoryStore::new();
        assert!(session_user(&store).is_none());
        let user = SessionUser {
            id: RecordId::from("9"),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        };
        save_session_user(&store, &user).unwrap();
        assert_eq!(session_user(&store), Some(user));

        store.set(SESSION_USER_KEY, json!("garbage")).unwrap();
        assert!(session_user(&store).is_none());
    }
}
