// src/profile.rs

use serde_json::{Map, Value, json};

use crate::cache::{LocalStore, PROFILE_KEY};
use crate::client::ResourceApi;
use crate::error::ClientError;

/// Shallow-merge `patch` into `target`, then merge a `personalInfo` object
/// one level deeper instead of replacing it.
pub fn merge_profile(target: &mut Value, patch: &Value) {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return;
    };
    let previous_info = target.get("personalInfo").cloned();
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
    if let (Some(Value::Object(before)), Some(Value::Object(incoming))) =
        (previous_info, patch.get("personalInfo"))
    {
        let mut merged: Map<String, Value> = before;
        for (key, value) in incoming {
            merged.insert(key.clone(), value.clone());
        }
        target.insert("personalInfo".into(), Value::Object(merged));
    }
}

/// Patient profile with a device mirror for offline reads and edits.
pub struct ProfileService<'a, A: ?Sized, S> {
    api: &'a A,
    store: &'a S,
}

impl<'a, A: ResourceApi + ?Sized, S: LocalStore> ProfileService<'a, A, S> {
    pub fn new(api: &'a A, store: &'a S) -> Self {
        Self { api, store }
    }

    pub fn mirror(&self) -> Option<Value> {
        self.store.get(PROFILE_KEY).filter(Value::is_object)
    }

    fn save_mirror(&self, profile: &Value) {
        if let Err(e) = self.store.set(PROFILE_KEY, profile.clone()) {
            tracing::warn!("failed to mirror profile locally: {e}");
        }
    }

    pub async fn fetch(&self) -> Result<Value, ClientError> {
        match self.api.get_profile().await {
            Ok(profile) => {
                self.save_mirror(&profile);
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!("profile API unavailable, loading local copy: {e}");
                self.mirror().ok_or(e)
            }
        }
    }

    pub async fn update_personal_info(&self, fields: Map<String, Value>) -> Result<Value, ClientError> {
        let body = json!({ "personalInfo": fields });
        match self.api.patch_profile(&body).await {
            Ok(profile) => {
                self.save_mirror(&profile);
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!("profile API unavailable, saving locally only: {e}");
                let Some(mut profile) = self.mirror() else {
                    return Err(e);
                };
                merge_profile(&mut profile, &body);
                self.save_mirror(&profile);
                Ok(profile)
            }
        }
    }
}
