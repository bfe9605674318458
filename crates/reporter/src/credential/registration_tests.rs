// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::{epoch_secs, RegistrationError, RegistrationTokens};

const SECRET: &str = "registration-test-secret";

#[test]
fn issued_token_verifies_and_carries_user_id() -> anyhow::Result<()> {
    let tokens = RegistrationTokens::new(SECRET);
    let token = tokens.issue("U024BE7LH")?;
    let claims = tokens.verify(&token)?;
    assert_eq!(claims.user_id, "U024BE7LH");
    assert_eq!(claims.exp - claims.iat, 3600);
    Ok(())
}

#[test]
fn token_is_query_string_safe() -> anyhow::Result<()> {
    let token = RegistrationTokens::new(SECRET).issue("user with spaces/and+symbols")?;
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    Ok(())
}

#[test]
fn payload_uses_user_id_claim_name() -> anyhow::Result<()> {
    let token = RegistrationTokens::new(SECRET).issue("U1")?;
    let jwt = String::from_utf8(URL_SAFE_NO_PAD.decode(&token)?)?;
    let payload = jwt.split('.').nth(1).ok_or_else(|| anyhow::anyhow!("no payload segment"))?;
    let claims: serde_json::Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload)?)?;
    assert_eq!(claims["userId"], "U1");
    Ok(())
}

#[test]
fn expired_token_is_rejected() -> anyhow::Result<()> {
    let tokens = RegistrationTokens::new(SECRET);
    let token = tokens.issue_at("U1", epoch_secs() - 2 * 3600)?;
    assert!(matches!(tokens.verify(&token), Err(RegistrationError::Expired)));
    Ok(())
}

#[test]
fn custom_lifetime_is_applied() -> anyhow::Result<()> {
    let tokens = RegistrationTokens::new(SECRET).with_lifetime(Duration::from_secs(120));
    let claims = tokens.verify(&tokens.issue("U1")?)?;
    assert_eq!(claims.exp - claims.iat, 120);
    Ok(())
}

#[test]
fn token_signed_with_other_secret_is_invalid() -> anyhow::Result<()> {
    let token = RegistrationTokens::new("other-secret").issue("U1")?;
    let result = RegistrationTokens::new(SECRET).verify(&token);
    assert!(matches!(result, Err(RegistrationError::Invalid)));
    Ok(())
}

#[yare::parameterized(
    empty        = { "" },
    not_base64   = { "%%%not-base64%%%" },
    not_a_jwt    = { "bm90LWEtand0" },
)]
fn garbage_is_invalid(token: &str) {
    let result = RegistrationTokens::new(SECRET).verify(token);
    assert!(matches!(result, Err(RegistrationError::Invalid)), "got {result:?}");
}
