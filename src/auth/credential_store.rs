//! Credential Storage
//! Mission: Keep login -> bcrypt hash associations in memory

use crate::auth::{clock::Clock, errors::CredentialError, models::User};
use bcrypt::{hash, verify};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// bcrypt only reads this many bytes of input; longer passwords are refused
pub const MAX_PASSWORD_BYTES: usize = 72;

const DUMMY_PASSWORD: &str = "geoservice-unknown-login";

/// Volatile user storage guarded by a single reader/writer lock
pub struct CredentialStore {
    users: RwLock<HashMap<String, User>>,
    hash_cost: u32,
    /// Verified against for unknown logins so they cost the same as known ones
    dummy_hash: Option<String>,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    /// `hash_cost` is the bcrypt work factor (4..=31)
    pub fn new(hash_cost: u32, clock: Arc<dyn Clock>) -> Self {
        let dummy_hash = match hash(DUMMY_PASSWORD, hash_cost) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(hash_cost, error = %e, "Unusable bcrypt cost");
                None
            }
        };

        Self {
            users: RwLock::new(HashMap::with_capacity(100)),
            hash_cost,
            dummy_hash,
            clock,
        }
    }

    /// Register a new login. The password is hashed outside the lock.
    pub fn register(&self, login: &str, password: &str) -> Result<(), CredentialError> {
        if self.users.read().contains_key(login) {
            return Err(CredentialError::AlreadyRegistered {
                login: login.to_string(),
            });
        }

        if password.len() > MAX_PASSWORD_BYTES {
            return Err(CredentialError::HashingFailed {
                login: login.to_string(),
                message: format!("password longer than {} bytes", MAX_PASSWORD_BYTES),
            });
        }

        let password_hash =
            hash(password, self.hash_cost).map_err(|e| CredentialError::HashingFailed {
                login: login.to_string(),
                message: e.to_string(),
            })?;

        // A concurrent register may have won while we were hashing
        match self.users.write().entry(login.to_string()) {
            Entry::Occupied(_) => Err(CredentialError::AlreadyRegistered {
                login: login.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(User {
                    login: login.to_string(),
                    password_hash,
                    created_at: self.clock.now(),
                });
                info!(login, "Created user");
                Ok(())
            }
        }
    }

    /// Check a login/password pair against the stored hash.
    ///
    /// Every call runs one bcrypt verification, whether or not the login
    /// exists.
    pub fn verify(&self, login: &str, password: &str) -> Result<(), CredentialError> {
        let stored_hash = self
            .users
            .read()
            .get(login)
            .map(|user| user.password_hash.clone());

        // Over-long passwords were never accepted at registration, so they
        // are checked against the dummy hash and never match
        let too_long = password.len() > MAX_PASSWORD_BYTES;
        let target = match (&stored_hash, too_long) {
            (Some(stored), false) => Some(stored.as_str()),
            _ => self.dummy_hash.as_deref(),
        };

        // bcrypt compares digests in constant time
        let valid = match target {
            Some(target) => {
                verify(password, target).map_err(|e| CredentialError::HashingFailed {
                    login: login.to_string(),
                    message: e.to_string(),
                })?
            }
            None => false,
        };

        match stored_hash {
            None => Err(CredentialError::NotFound {
                login: login.to_string(),
            }),
            Some(_) if too_long || !valid => {
                debug!(login, "Password mismatch");
                Err(CredentialError::IncorrectPassword {
                    login: login.to_string(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Get user by login
    pub fn get(&self, login: &str) -> Option<User> {
        self.users.read().get(login).cloned()
    }

    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
