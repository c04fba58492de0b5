// src/store.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::RecordId;
use crate::profile::merge_profile;

pub const COLLECTIONS: [&str; 3] = ["doctors", "appointments", "users"];
pub const PROFILE: &str = "profile";

/// Fields never handed out by the API.
const PRIVATE_USER_FIELDS: [&str; 2] = ["passwordHash", "password"];

const SEED: &str = include_str!("../data/seed.json");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Resource '{0}' not found")]
    UnknownResource(String),
    #[error("Not found")]
    NotFound,
    #[error("request body must be a JSON object")]
    InvalidBody,
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownResource(resource) => ApiError::unknown_resource(&resource),
            StoreError::NotFound => ApiError::record_not_found(),
            StoreError::InvalidBody => ApiError::BadRequest("VALIDATION_ERROR", e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    profile: Value,
    #[serde(flatten)]
    collections: BTreeMap<String, Vec<Value>>,
}

impl Database {
    fn normalized(mut self) -> Self {
        for name in COLLECTIONS {
            self.collections.entry(name.to_string()).or_default();
        }
        if !self.profile.is_object() {
            self.profile = Value::Object(Map::new());
        }
        self
    }

    fn collection(&self, resource: &str) -> Result<&Vec<Value>, StoreError> {
        self.collections
            .get(resource)
            .ok_or_else(|| StoreError::UnknownResource(resource.to_string()))
    }

    fn collection_mut(&mut self, resource: &str) -> Result<&mut Vec<Value>, StoreError> {
        self.collections
            .get_mut(resource)
            .ok_or_else(|| StoreError::UnknownResource(resource.to_string()))
    }
}

/// The JSON "database" behind the resource API: named arrays of records plus
/// the singleton profile object.
#[derive(Debug)]
pub struct ResourceStore {
    db: RwLock<Database>,
    path: Option<PathBuf>,
}

fn id_matches(record: &Value, id: &str) -> bool {
    record
        .get("id")
        .and_then(RecordId::from_json)
        .is_some_and(|rid| rid.as_str() == id.trim())
}

/// Case-insensitive comparison of a field's text form with a query value.
fn field_matches(record: &Value, key: &str, expected: &str) -> bool {
    let text = match record.get(key) {
        None | Some(Value::Null) => return false,
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    text.to_lowercase() == expected.to_lowercase()
}

/// Strip credentials from records of the `users` collection.
pub fn public_view(resource: &str, mut record: Value) -> Value {
    if resource == "users" {
        if let Some(obj) = record.as_object_mut() {
            for field in PRIVATE_USER_FIELDS {
                obj.remove(field);
            }
        }
    }
    record
}

impl ResourceStore {
    /// Open the database at `path`, seeding it on first use. Without a path
    /// the store lives in memory only and starts from the seed data.
    pub fn open(path: Option<PathBuf>) -> Result<Self, StoreError> {
        let db = match path.as_deref() {
            Some(p) if p.exists() => {
                tracing::info!(path = %p.display(), "loading data file");
                serde_json::from_str::<Database>(&fs::read_to_string(p)?)?
            }
            _ => serde_json::from_str::<Database>(SEED)?,
        };

        let store = Self {
            db: RwLock::new(db.normalized()),
            path,
        };
        if let Some(p) = store.path.as_deref().filter(|p| !p.exists()) {
            tracing::info!(path = %p.display(), "creating data file from seed");
            let db = store.db.read().map_err(|_| StoreError::Poisoned)?;
            store.persist(&db)?;
        }
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn resources(&self) -> Vec<String> {
        self.db
            .read()
            .map(|db| db.collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn persist(&self, db: &Database) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(db)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply `change` to a copy of the database and install the copy only
    /// once it is on disk. A failed write leaves the served data untouched.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Database) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut db = self.db.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = db.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *db = next;
        Ok(out)
    }

    pub fn list(&self, resource: &str, filters: &[(String, String)]) -> Result<Vec<Value>, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::Poisoned)?;
        Ok(db
            .collection(resource)?
            .iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(key, value)| field_matches(record, key, value))
            })
            .cloned()
            .collect())
    }

    pub fn get(&self, resource: &str, id: &str) -> Result<Value, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::Poisoned)?;
        db.collection(resource)?
            .iter()
            .find(|record| id_matches(record, id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Append a record under a fresh server-assigned id.
    pub fn insert(&self, resource: &str, body: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = body else {
            return Err(StoreError::InvalidBody);
        };
        fields.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        let record = Value::Object(fields);

        self.commit(|db| {
            db.collection_mut(resource)?.push(record.clone());
            Ok(record)
        })
    }

    /// Shallow-merge `body` into the record. The id cannot be changed.
    pub fn patch(&self, resource: &str, id: &str, body: Value) -> Result<Value, StoreError> {
        let Value::Object(fields) = body else {
            return Err(StoreError::InvalidBody);
        };

        self.commit(|db| {
            let record = db
                .collection_mut(resource)?
                .iter_mut()
                .find(|record| id_matches(record, id))
                .ok_or(StoreError::NotFound)?;
            if let Some(obj) = record.as_object_mut() {
                for (key, value) in fields {
                    if key != "id" {
                        obj.insert(key, value);
                    }
                }
            }
            Ok(record.clone())
        })
    }

    pub fn delete(&self, resource: &str, id: &str) -> Result<Value, StoreError> {
        self.commit(|db| {
            let collection = db.collection_mut(resource)?;
            let index = collection
                .iter()
                .position(|record| id_matches(record, id))
                .ok_or(StoreError::NotFound)?;
            Ok(collection.remove(index))
        })
    }

    pub fn profile(&self) -> Result<Value, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::Poisoned)?;
        Ok(db.profile.clone())
    }

    pub fn patch_profile(&self, body: Value) -> Result<Value, StoreError> {
        if !body.is_object() {
            return Err(StoreError::InvalidBody);
        }
        self.commit(|db| {
            merge_profile(&mut db.profile, &body);
            Ok(db.profile.clone())
        })
    }
}
