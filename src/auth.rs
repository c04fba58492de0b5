use std::collections::HashMap;
use std::sync::RwLock;

use argon2::{
    Argon2,
    PasswordHash,
    PasswordVerifier,
    PasswordHasher,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use argon2::password_hash::{SaltString, rand_core::OsRng as PHOsRng};

use crate::models::RecordId;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Check a login attempt against the PHC string kept on the user record.
/// A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2id with a random salt; the result goes into `users[].passwordHash`.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut PHOsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| format!("argon2 hash error: {e}"))
}

/// Opaque bearer token returned to the client on login.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Sessions are keyed by SHA-256 hex of the token, never the token itself.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub user_id: RecordId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token_hash: String, record: SessionRecord) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token_hash, record);
        }
    }

    /// Live session for `token_hash`. Expired sessions are dropped on sight.
    pub fn lookup(&self, token_hash: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        let mut sessions = self.sessions.write().ok()?;
        match sessions.get(token_hash) {
            Some(record) if record.expires_at > now => Some(record.clone()),
            Some(_) => {
                sessions.remove(token_hash);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token_hash: &str) -> bool {
        self.sessions
            .write()
            .map(|mut sessions| sessions.remove(token_hash).is_some())
            .unwrap_or(false)
    }
}
