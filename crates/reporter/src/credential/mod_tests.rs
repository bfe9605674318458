// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::Credential;

#[yare::parameterized(
    both_present   = { "a", "r", None },
    empty_access   = { "", "r", Some("access_token") },
    empty_refresh  = { "a", "", Some("refresh_token") },
    blank_access   = { "  ", "r", Some("access_token") },
    both_empty     = { "", "", Some("access_token") },
)]
fn validate_reports_first_missing_field(access: &str, refresh: &str, missing: Option<&str>) {
    let result = Credential::new(access, refresh).validate();
    match missing {
        None => assert!(result.is_ok()),
        Some(field) => {
            let err = result.err().unwrap_or_default();
            assert!(err.contains(field), "expected {field} in {err:?}");
        }
    }
}

#[test]
fn debug_output_redacts_tokens() -> anyhow::Result<()> {
    let cred = Credential::new("secret-access", "secret-refresh");
    let out = format!("{cred:?}");
    assert!(!out.contains("secret-access"));
    assert!(!out.contains("secret-refresh"));
    assert!(out.contains("<redacted>"));

    let empty = format!("{:?}", Credential::new("", "r"));
    assert!(empty.contains("<empty>"));
    Ok(())
}

#[test]
fn credential_serializes_as_token_pair() -> anyhow::Result<()> {
    let json = serde_json::to_value(Credential::new("a", "r"))?;
    assert_eq!(json, serde_json::json!({ "access_token": "a", "refresh_token": "r" }));
    Ok(())
}

proptest! {
    #[test]
    fn any_credential_with_a_blank_token_is_invalid(
        token in "[a-zA-Z0-9]{1,32}",
        blank in "[ \t]{0,3}",
        blank_access in any::<bool>(),
    ) {
        let cred = if blank_access {
            Credential::new(blank.clone(), token.clone())
        } else {
            Credential::new(token.clone(), blank.clone())
        };
        prop_assert!(!cred.is_valid());
    }

    #[test]
    fn any_credential_with_both_tokens_is_valid(
        access in "[a-zA-Z0-9._-]{1,64}",
        refresh in "[a-zA-Z0-9._-]{1,64}",
    ) {
        prop_assert!(Credential::new(access, refresh).is_valid());
    }
}
