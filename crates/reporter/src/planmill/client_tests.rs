// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::Planmill;
use crate::credential::{Credential, UserBinding};
use crate::planmill::executor::ExecutionError;
use crate::planmill::{PlanmillConfig, PlanmillUser};
use crate::test_support::{fast_policy, FakePlanmill, RecordingStore, Reply};

fn client(fake: &FakePlanmill, store: Arc<RecordingStore>) -> anyhow::Result<Planmill> {
    Planmill::new(fake.config(), store, fast_policy(), Duration::from_secs(2))
}

#[test]
fn config_derives_urls_from_instance_name() -> anyhow::Result<()> {
    let config = PlanmillConfig::new("acme", "id", "secret");
    assert_eq!(config.base_url(), "https://online.planmill.com/acme/api/");
    assert_eq!(config.token_url(), "https://online.planmill.com/acme/api/oauth2/token");
    assert_eq!(config.authorize_url(), "https://online.planmill.com/acme/api/oauth2/authorize");
    assert_eq!(config.api_url(), "https://online.planmill.com/acme/api/1.5/");
    Ok(())
}

#[test]
fn config_base_url_override_gets_trailing_slash() -> anyhow::Result<()> {
    let config =
        PlanmillConfig::new("acme", "id", "secret").with_base_url("http://localhost:9/api");
    assert_eq!(config.api_url(), "http://localhost:9/api/1.5/");
    Ok(())
}

#[test]
fn config_debug_hides_client_secret() -> anyhow::Result<()> {
    let config = PlanmillConfig::new("acme", "id", "top-secret");
    assert!(!format!("{config:?}").contains("top-secret"));
    Ok(())
}

#[test]
fn config_deserializes_camel_case_fields() -> anyhow::Result<()> {
    let config: PlanmillConfig = serde_json::from_value(json!({
        "instanceName": "acme",
        "oAuthClientId": "id",
        "oAuthClientSecret": "secret",
    }))?;
    assert_eq!(config, PlanmillConfig::new("acme", "id", "secret"));
    Ok(())
}

#[tokio::test]
async fn authorization_url_carries_state_and_redirect() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let planmill = client(&fake, Arc::new(RecordingStore::new()))?;

    assert_eq!(planmill.config().instance_name, "test");
    assert_eq!(planmill.executor().policy().max_attempts(), 4);

    let url = planmill.build_authorization_url("st+te/1", "https://bot.example/cb")?;
    let parsed = reqwest::Url::parse(&url)?;
    assert_eq!(parsed.path(), "/api/oauth2/authorize");
    let params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    assert!(params.contains(&("response_type".into(), "code".into())));
    assert!(params.contains(&("client_id".into(), "client-id".into())));
    assert!(params.contains(&("redirect_uri".into(), "https://bot.example/cb".into())));
    assert!(params.contains(&("state".into(), "st+te/1".into())));
    assert!(!url.contains("client-secret"));
    Ok(())
}

#[tokio::test]
async fn token_owner_parses_user() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let planmill = client(&fake, Arc::new(RecordingStore::new()))?;
    fake.push_resource(Reply::ok(json!({ "id": 42, "firstName": "Ada", "lastName": "Lovelace" })));

    let owner = planmill.get_token_owner(Credential::new("a", "r")).await?;
    assert_eq!(
        owner.value,
        PlanmillUser { id: 42, first_name: "Ada".into(), last_name: "Lovelace".into() }
    );
    assert_eq!(fake.resource_requests()[0].path, "/api/1.5/me");
    Ok(())
}

#[tokio::test]
async fn token_owner_returns_refreshed_credential() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let store = Arc::new(RecordingStore::new());
    let planmill = client(&fake, Arc::clone(&store))?;
    fake.push_resource(Reply::unauthorized()).push_resource(Reply::ok(json!({ "id": 42 })));
    fake.push_token(Reply::tokens("a2", None));

    let owner = planmill.get_token_owner(Credential::new("a", "r")).await?;
    assert_eq!(owner.value.id, 42);
    assert_eq!(owner.credential, Credential::new("a2", "r"));
    assert_eq!(store.save_attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn reportable_tasks_uses_provider_user_id() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let user = UserBinding::new("U1", 42, Credential::new("a", "r"));
    let store = Arc::new(RecordingStore::with_binding(user.clone()).await?);
    let planmill = client(&fake, store)?;
    fake.push_resource(Reply::ok(json!([
        {
            "task": 1, "taskName": "Backend", "project": 10, "projectName": "Hours",
            "lastTimereportCreated": "2026-01-02T10:00:00"
        },
        { "task": 2, "taskName": "Tests", "project": 10, "projectName": "Hours" }
    ])));

    let tasks = planmill.get_reportable_tasks(&user).await?;
    assert_eq!(tasks.value.len(), 2);
    assert_eq!(tasks.value[0].task_name, "Backend");
    assert_eq!(tasks.value[0].last_timereport_created.as_deref(), Some("2026-01-02T10:00:00"));
    assert_eq!(tasks.value[1].last_timereport_created, None);
    assert_eq!(fake.resource_requests()[0].path, "/api/1.5/users/42/reportableassignments");
    Ok(())
}

#[tokio::test]
async fn reportable_tasks_refresh_is_persisted() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let user = UserBinding::new("U1", 42, Credential::new("a", "r"));
    let store = Arc::new(RecordingStore::with_binding(user.clone()).await?);
    let planmill = client(&fake, Arc::clone(&store))?;
    fake.push_resource(Reply::unauthorized()).push_resource(Reply::ok(json!([])));
    fake.push_token(Reply::tokens("a2", Some("r2")));

    let tasks = planmill.get_reportable_tasks(&user).await?;
    assert!(tasks.value.is_empty());
    assert_eq!(store.saves(), vec![("U1".to_owned(), Credential::new("a2", "r2"))]);
    Ok(())
}

#[tokio::test]
async fn unexpected_payload_shape_is_decode_error() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let user = UserBinding::new("U1", 42, Credential::new("a", "r"));
    let store = Arc::new(RecordingStore::with_binding(user.clone()).await?);
    let planmill = client(&fake, store)?;
    fake.push_resource(Reply::ok(json!({ "not": "a list" })));

    let result = planmill.get_reportable_tasks(&user).await;
    assert!(matches!(result, Err(ExecutionError::Decode(_))), "got {result:?}");
    Ok(())
}

#[tokio::test]
async fn fetch_access_token_exchanges_code() -> anyhow::Result<()> {
    let fake = FakePlanmill::start().await?;
    let planmill = client(&fake, Arc::new(RecordingStore::new()))?;
    fake.push_token(Reply::tokens("a", Some("r")));

    let cred = planmill.fetch_access_token("code-1", "https://bot.example/cb").await?;
    assert_eq!(cred, Credential::new("a", "r"));
    Ok(())
}
