// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: durable mapping from chat user id to [`UserBinding`].
//!
//! The executor depends only on [`CredentialStore`]. How bindings are laid
//! out physically is up to the implementation.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::{Mutex, RwLock};

use crate::credential::persist::{self, PersistedUser};
use crate::credential::{Credential, UserBinding};

/// Boxed future returned by [`CredentialStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store encoding: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("user not registered: {0}")]
    NotRegistered(String),
}

pub trait CredentialStore: Send + Sync + 'static {
    /// Look up the binding for a chat user.
    fn load<'a>(&'a self, external_id: &'a str) -> StoreFuture<'a, Option<UserBinding>>;

    /// Replace the credential of an existing binding as a unit.
    fn save<'a>(&'a self, external_id: &'a str, credential: &'a Credential)
        -> StoreFuture<'a, ()>;

    /// Create or replace a whole binding (registration completion).
    fn register(&self, binding: UserBinding) -> StoreFuture<'_, ()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bindings: RwLock<HashMap<String, UserBinding>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn load<'a>(&'a self, external_id: &'a str) -> StoreFuture<'a, Option<UserBinding>> {
        Box::pin(async move { Ok(self.bindings.read().await.get(external_id).cloned()) })
    }

    fn save<'a>(
        &'a self,
        external_id: &'a str,
        credential: &'a Credential,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut bindings = self.bindings.write().await;
            let binding = bindings
                .get_mut(external_id)
                .ok_or_else(|| StoreError::NotRegistered(external_id.to_owned()))?;
            binding.credential = credential.clone();
            Ok(())
        })
    }

    fn register(&self, binding: UserBinding) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.bindings.write().await.insert(binding.external_id.clone(), binding);
            Ok(())
        })
    }
}

/// JSON-file store.
///
/// Every mutation is a read-modify-write of the whole file, serialized by an
/// in-process lock and committed with an atomic rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load<'a>(&'a self, external_id: &'a str) -> StoreFuture<'a, Option<UserBinding>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let persisted = persist::load(&self.path)?;
            Ok(persisted.users.get(external_id).map(|u| u.to_binding(external_id)))
        })
    }

    fn save<'a>(
        &'a self,
        external_id: &'a str,
        credential: &'a Credential,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let mut persisted = persist::load(&self.path)?;
            let user = persisted
                .users
                .get_mut(external_id)
                .ok_or_else(|| StoreError::NotRegistered(external_id.to_owned()))?;
            user.set_credential(credential);
            persist::save(&self.path, &persisted)
        })
    }

    fn register(&self, binding: UserBinding) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let mut persisted = persist::load(&self.path)?;
            persisted.users.insert(binding.external_id.clone(), PersistedUser::from(&binding));
            persist::save(&self.path, &persisted)
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
