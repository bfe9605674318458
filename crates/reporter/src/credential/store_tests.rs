// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{CredentialStore, FileStore, MemoryStore, StoreError};
use crate::credential::{Credential, UserBinding};

fn binding(id: &str, user: i64, access: &str, refresh: &str) -> UserBinding {
    UserBinding::new(id, user, Credential::new(access, refresh))
}

#[tokio::test]
async fn memory_store_roundtrips_binding() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    assert!(store.load("U1").await?.is_none());

    store.register(binding("U1", 42, "a", "r")).await?;
    let loaded = store.load("U1").await?;
    assert_eq!(loaded, Some(binding("U1", 42, "a", "r")));
    assert_eq!(store.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn memory_store_save_replaces_credential_only() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.register(binding("U1", 42, "a", "r")).await?;

    store.save("U1", &Credential::new("a2", "r2")).await?;
    let loaded = store.load("U1").await?.ok_or_else(|| anyhow::anyhow!("missing binding"))?;
    assert_eq!(loaded.provider_user_id, 42);
    assert_eq!(loaded.credential, Credential::new("a2", "r2"));
    Ok(())
}

#[tokio::test]
async fn memory_store_save_unknown_user_fails() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let result = store.save("nobody", &Credential::new("a", "r")).await;
    assert!(matches!(result, Err(StoreError::NotRegistered(ref id)) if id == "nobody"));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn file_store_missing_file_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path().join("credentials.json"));
    assert!(store.load("U1").await?.is_none());
    assert!(!store.path().exists());
    Ok(())
}

#[tokio::test]
async fn file_store_persists_across_instances() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/credentials.json");

    let store = FileStore::new(&path);
    store.register(binding("U1", 7, "a", "r")).await?;
    store.register(binding("U2", 8, "b", "s")).await?;
    store.save("U1", &Credential::new("a2", "r")).await?;

    let reopened = FileStore::new(&path);
    let u1 = reopened.load("U1").await?.ok_or_else(|| anyhow::anyhow!("missing U1"))?;
    let u2 = reopened.load("U2").await?.ok_or_else(|| anyhow::anyhow!("missing U2"))?;
    assert_eq!(u1, binding("U1", 7, "a2", "r"));
    assert_eq!(u2, binding("U2", 8, "b", "s"));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw["users"]["U1"]["provider_user_id"], 7);
    assert_eq!(raw["users"]["U1"]["access_token"], "a2");
    Ok(())
}

#[tokio::test]
async fn file_store_leaves_no_temp_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path().join("credentials.json"));
    store.register(binding("U1", 1, "a", "r")).await?;
    store.save("U1", &Credential::new("a2", "r2")).await?;

    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["credentials.json".to_owned()]);
    Ok(())
}

#[tokio::test]
async fn file_store_save_unknown_user_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path().join("credentials.json"));
    let result = store.save("nobody", &Credential::new("a", "r")).await;
    assert!(matches!(result, Err(StoreError::NotRegistered(_))));
    Ok(())
}

#[tokio::test]
async fn file_store_corrupt_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "{not json")?;
    let store = FileStore::new(&path);
    assert!(matches!(store.load("U1").await, Err(StoreError::Serde(_))));
    Ok(())
}
