//! User credential store.
//!
//! One JSON file mapping `username -> {"password": <sha256 hex>}`.
//! Hashing happens in the server layer; this store only compares the
//! hex digests it is handed. The file is re-read on every operation so
//! concurrent processes see each other's writes, as the original
//! service did.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

const USERS_FILE: &str = "users.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserRecord {
    password: String,
}

#[derive(Debug)]
pub struct JsonUserStore {
    path: PathBuf,
}

impl JsonUserStore {
    /// Store backed by `users.json` inside the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonUserStore {
            path: dir.join(USERS_FILE),
        })
    }

    /// Register a new user. Returns `false` if the username is taken.
    pub fn register(&self, username: &str, password_hash: &str) -> Result<bool, StorageError> {
        let mut users = self.load()?;
        if users.contains_key(username) {
            return Ok(false);
        }
        users.insert(
            username.to_string(),
            UserRecord {
                password: password_hash.to_string(),
            },
        );
        self.save(&users)?;
        Ok(true)
    }

    /// Check a username/password-hash pair.
    pub fn login(&self, username: &str, password_hash: &str) -> Result<bool, StorageError> {
        let users = self.load()?;
        Ok(users
            .get(username)
            .map(|record| record.password == password_hash)
            .unwrap_or(false))
    }

    /// Replace a user's password hash after verifying the old one.
    pub fn update_credentials(
        &self,
        username: &str,
        old_hash: &str,
        new_hash: &str,
    ) -> Result<bool, StorageError> {
        let mut users = self.load()?;
        match users.get_mut(username) {
            Some(record) if record.password == old_hash => {
                record.password = new_hash.to_string();
                self.save(&users)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, UserRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save(&self, users: &BTreeMap<String, UserRecord>) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(users)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> JsonUserStore {
        let dir = std::env::temp_dir().join(format!(
            "exchange-users-test-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        JsonUserStore::open(dir).unwrap()
    }

    #[test]
    fn register_login_update_flow() {
        let store = temp_store("flow");
        assert!(store.register("alice", "hash1").unwrap());
        // Duplicate username rejected.
        assert!(!store.register("alice", "other").unwrap());

        assert!(store.login("alice", "hash1").unwrap());
        assert!(!store.login("alice", "wrong").unwrap());
        assert!(!store.login("nobody", "hash1").unwrap());

        assert!(store.update_credentials("alice", "hash1", "hash2").unwrap());
        assert!(!store.update_credentials("alice", "hash1", "hash3").unwrap());
        assert!(store.login("alice", "hash2").unwrap());
    }
}
