use crate::error::{KpiError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// The shared admin password, stored only as an Argon2 hash
///
/// Verification goes through `PasswordVerifier`, which compares in constant
/// time. Without a configured hash every login attempt fails.
#[derive(Debug, Clone, Default)]
pub struct AdminCredential {
    hash: Option<String>,
}

impl AdminCredential {
    /// Rejects strings that are not a PHC-format hash
    pub fn new(hash: Option<String>) -> Result<Self> {
        let hash = hash.map(|h| h.trim().to_string()).filter(|h| !h.is_empty());
        if let Some(h) = &hash {
            PasswordHash::new(h)
                .map_err(|e| KpiError::Config(format!("admin password hash: {}", e)))?;
        }
        Ok(AdminCredential { hash })
    }

    pub fn is_configured(&self) -> bool {
        self.hash.is_some()
    }

    pub fn verify(&self, password: &str) -> bool {
        let Some(hash) = &self.hash else {
            return false;
        };
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Hash a password using Argon2
///
/// Creates a cryptographically secure hash of a password using Argon2id,
/// suitable for `auth.admin_password_hash`.
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(KpiError::Validation("password cannot be empty".to_string()));
    }
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => Err(KpiError::Auth(format!("password hashing failed: {}", e))),
    }
}

#[cfg(feature = "web")]
pub use sessions::SessionStore;

#[cfg(feature = "web")]
mod sessions {
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    /// Live admin sessions, keyed by cookie value
    ///
    /// Owned by the application state; expired entries are purged whenever a
    /// session is created.
    #[derive(Debug)]
    pub struct SessionStore {
        sessions: RwLock<HashMap<String, Instant>>,
        ttl: Duration,
    }

    impl SessionStore {
        pub fn new(ttl: Duration) -> Self {
            SessionStore {
                sessions: RwLock::new(HashMap::new()),
                ttl,
            }
        }

        pub fn create(&self) -> String {
            let session_id = Uuid::new_v4().to_string();
            let expires_at = Instant::now() + self.ttl;

            let mut sessions = match self.sessions.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            sessions.retain(|_, expires| *expires > now);
            sessions.insert(session_id.clone(), expires_at);

            session_id
        }

        pub fn validate(&self, session_id: &str) -> bool {
            let sessions = match self.sessions.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            sessions
                .get(session_id)
                .is_some_and(|expires| *expires > Instant::now())
        }

        pub fn revoke(&self, session_id: &str) {
            let mut sessions = match self.sessions.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            sessions.remove(session_id);
        }
    }
}
