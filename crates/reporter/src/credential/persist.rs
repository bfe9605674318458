// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk format for the file-backed credential store, with atomic writes.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::credential::store::StoreError;
use crate::credential::{Credential, UserBinding};

/// Persisted bindings for all registered users, keyed by external id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedBindings {
    #[serde(default)]
    pub users: HashMap<String, PersistedUser>,
}

/// Persisted state for a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedUser {
    pub provider_user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

impl PersistedUser {
    pub fn to_binding(&self, external_id: &str) -> UserBinding {
        UserBinding {
            external_id: external_id.to_owned(),
            provider_user_id: self.provider_user_id,
            credential: Credential::new(self.access_token.clone(), self.refresh_token.clone()),
        }
    }

    pub fn set_credential(&mut self, credential: &Credential) {
        self.access_token.clone_from(&credential.access_token);
        self.refresh_token.clone_from(&credential.refresh_token);
    }
}

impl From<&UserBinding> for PersistedUser {
    fn from(binding: &UserBinding) -> Self {
        Self {
            provider_user_id: binding.provider_user_id,
            access_token: binding.credential.access_token.clone(),
            refresh_token: binding.credential.refresh_token.clone(),
        }
    }
}

/// Load persisted bindings from a JSON file. A missing file is an empty store.
pub fn load(path: &Path) -> Result<PersistedBindings, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PersistedBindings::default())
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&contents)?)
}

/// Save persisted bindings to a JSON file atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so concurrent saves never share
/// a `.tmp` file.
pub fn save(path: &Path, bindings: &PersistedBindings) -> Result<(), StoreError> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(bindings)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
