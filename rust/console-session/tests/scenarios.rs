use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use console_policy::{CREATE_SERVICE_ACCOUNT_ADMIN_ACTION, JsonPolicyParser};
use console_session::{
    AccountInfo, AdminError, AllowResource, Claims, ConditionValues, KmsStatus, Principal,
    Resolution, ServerType, SessionError, Settings, StaticAdminClient, check_session_at,
    resolve_permissions,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn token(claims: Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 8, 15, 0).unwrap()
}

fn resolve(policy: Value, account: &str, claims: &Claims) -> Result<Resolution, SessionError> {
    let principal = Principal::new("AKIA", "secret", "", account);
    let settings = Settings::default();
    let conditions = ConditionValues::new(&principal, &settings, claims, now());
    resolve_permissions(
        &JsonPolicyParser,
        policy.to_string().as_bytes(),
        account,
        claims,
        &conditions,
    )
}

fn actions(resolution: &Resolution, resource: &str) -> Vec<String> {
    resolution
        .permissions
        .get(resource)
        .map(|actions| actions.to_strings())
        .unwrap_or_default()
}

#[test]
fn it_scopes_grants_to_the_substituted_account() -> Result<()> {
    let resolution = resolve(
        json!({
            "Version": "2012-10-17",
            "Statement": [
                { "Effect": "Allow", "Action": ["admin:ServerInfo"] },
                {
                    "Effect": "Allow",
                    "Action": ["s3:ListBucket"],
                    "Resource": ["arn:aws:s3:::${aws:username}"]
                }
            ]
        }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(actions(&resolution, ""), vec!["admin:ServerInfo"]);
    assert_eq!(
        actions(&resolution, "arn:aws:s3:::alice"),
        vec!["admin:ServerInfo", "s3:ListBucket"]
    );
    assert!(!resolution.permissions.contains_key("arn:aws:s3:::${aws:username}"));
    Ok(())
}

#[test]
fn it_retracts_an_allow_with_a_later_deny() -> Result<()> {
    let resolution = resolve(
        json!({
            "Statement": [
                { "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": ["bucket1"] },
                { "Effect": "Deny", "Action": ["s3:PutObject"], "Resource": ["bucket1"] }
            ]
        }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(actions(&resolution, "bucket1"), vec!["s3:GetObject"]);
    Ok(())
}

#[test]
fn it_does_not_let_a_later_allow_undo_a_deny() -> Result<()> {
    let resolution = resolve(
        json!({
            "Statement": [
                { "Effect": "Deny", "Action": ["s3:PutObject"], "Resource": ["bucket1"] },
                { "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": ["bucket1"] },
                { "Effect": "Allow", "Action": ["s3:PutObject"], "Resource": ["bucket1"] }
            ]
        }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(actions(&resolution, "bucket1"), vec!["s3:GetObject"]);
    Ok(())
}

#[test]
fn it_substitutes_directory_usernames() -> Result<()> {
    let claims = Claims::new().with("ldapUsername", "bob");
    let resolution = resolve(
        json!({
            "Statement": [
                { "Effect": "Allow", "Action": ["s3:*"], "Resource": ["arn:aws:s3:::home/${ldap:username}/*"] }
            ]
        }),
        "uid=bob,dc=example,dc=org",
        &claims,
    )?;

    assert_eq!(actions(&resolution, "arn:aws:s3:::home/bob/*"), vec!["s3:*"]);
    Ok(())
}

#[test]
fn it_extracts_prefix_restrictions() -> Result<()> {
    let resolution = resolve(
        json!({
            "Statement": [
                {
                    "Effect": "Allow",
                    "Action": ["s3:ListBucket"],
                    "Resource": ["arn:aws:s3:::shared"],
                    "Condition": { "StringLike": { "s3:prefix": ["docs/", "images/"] } }
                }
            ]
        }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(
        resolution.allow_resources,
        vec![AllowResource {
            resource: "arn:aws:s3:::shared".into(),
            prefixes: vec!["docs/".into(), "images/".into()],
            condition_operator: "StringLike".into(),
        }]
    );
    Ok(())
}

#[test]
fn it_resolves_an_empty_policy_to_the_global_entry() -> Result<()> {
    let resolution = resolve(
        json!({ "Version": "2012-10-17", "Statement": [] }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(resolution.permissions.keys().collect::<Vec<_>>(), vec![""]);
    assert!(resolution.permissions[""].is_empty());
    assert!(resolution.allow_resources.is_empty());
    Ok(())
}

#[test]
fn it_keeps_unmatched_placeholders_verbatim() -> Result<()> {
    let resolution = resolve(
        json!({
            "Statement": [
                { "Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::${jwt:email}/*"] }
            ]
        }),
        "alice",
        &Claims::new(),
    )?;

    assert_eq!(
        actions(&resolution, "arn:aws:s3:::${jwt:email}/*"),
        vec!["s3:GetObject"]
    );
    Ok(())
}

#[test]
fn it_evaluates_default_conditions_against_token_claims() -> Result<()> {
    let policy = json!({
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["admin:ServerInfo"],
                "Condition": { "StringEquals": { "jwt:department": "ops" } }
            }
        ]
    });

    let ops = resolve(policy.clone(), "alice", &Claims::new().with("department", "ops"))?;
    assert_eq!(actions(&ops, ""), vec!["admin:ServerInfo"]);

    let finance = resolve(policy, "alice", &Claims::new().with("department", "finance"))?;
    assert!(actions(&finance, "").is_empty());
    Ok(())
}

#[tokio::test]
async fn it_allows_conditioned_service_account_creation() -> Result<()> {
    let principal = Principal::new("AKIA", "secret", token(json!({ "sub": "alice" })), "alice");
    let policy = json!({
        "Statement": [
            { "Effect": "Allow", "Action": ["admin:*"] },
            {
                "Effect": "Deny",
                "Action": [CREATE_SERVICE_ACCOUNT_ADMIN_ACTION],
                "Condition": { "StringEquals": { "aws:username": "alice" } }
            }
        ]
    });
    let admin = StaticAdminClient::new(AccountInfo::new("alice", policy.to_string()));

    let response = check_session_at(
        Some(&principal),
        &admin,
        &JsonPolicyParser,
        &Settings::default(),
        now(),
    )
    .await?;

    assert!(
        response.permissions[""]
            .iter()
            .any(|action| action == CREATE_SERVICE_ACCOUNT_ADMIN_ACTION)
    );
    Ok(())
}

#[tokio::test]
async fn it_reports_malformed_conditions_as_processing_errors() -> Result<()> {
    let principal = Principal::new("AKIA", "secret", token(json!({})), "alice");
    let policy = json!({
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["s3:ListBucket"],
                "Resource": ["arn:aws:s3:::bucket"],
                "Condition": { "StringLike": { "s3:prefix": { "not": "a list" } } }
            }
        ]
    });
    let admin = StaticAdminClient::new(AccountInfo::new("alice", policy.to_string()));

    let error = check_session_at(
        Some(&principal),
        &admin,
        &JsonPolicyParser,
        &Settings::default(),
        now(),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, SessionError::Processing(_)));
    assert_eq!(error.status_code(), 500);
    Ok(())
}

#[tokio::test]
async fn it_reports_untrusted_sessions_as_invalid() -> Result<()> {
    let settings = Settings::default();
    let valid_policy = AccountInfo::new("alice", r#"{"Statement":[]}"#);

    let missing = check_session_at(
        None,
        &StaticAdminClient::new(valid_policy.clone()),
        &JsonPolicyParser,
        &settings,
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(missing, SessionError::InvalidSession(_)));

    let opaque = Principal::new("AKIA", "secret", "opaque-session-token", "alice");
    let not_a_jwt = check_session_at(
        Some(&opaque),
        &StaticAdminClient::new(valid_policy),
        &JsonPolicyParser,
        &settings,
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(not_a_jwt, SessionError::Claims(_)));

    let principal = Principal::new("AKIA", "secret", token(json!({})), "alice");
    let unparsable = check_session_at(
        Some(&principal),
        &StaticAdminClient::new(AccountInfo::new("alice", "{ not json")),
        &JsonPolicyParser,
        &settings,
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(unparsable, SessionError::MalformedPolicy(_)));

    let unreachable = check_session_at(
        Some(&principal),
        &StaticAdminClient::failing(AdminError::Unavailable("connection refused".into())),
        &JsonPolicyParser,
        &settings,
        now(),
    )
    .await
    .unwrap_err();

    for error in [missing, not_a_jwt, unparsable, unreachable] {
        assert!(error.is_invalid_session(), "{error}");
        assert_eq!(error.status_code(), 401);
    }
    Ok(())
}

#[tokio::test]
async fn it_builds_the_full_session_response() -> Result<()> {
    let settings = Settings::from_lookup(|name| {
        match name {
            "CONSOLE_MINIO_SERVER" => Some("https://minio.example.com:9000"),
            "CONSOLE_LOG_QUERY_URL" => Some("http://logsearch:8080"),
            "CONSOLE_IDP_URL" => Some("https://idp.example.com"),
            "CONSOLE_IDP_CLIENT_ID" => Some("console"),
            "CONSOLE_LDAP_ENABLED" => Some("on"),
            "CONSOLE_MAX_CONCURRENT_UPLOADS" => Some("3"),
            _ => None,
        }
        .map(String::from)
    });
    let principal = Principal::new("AKIA", "secret", token(json!({ "sub": "alice" })), "alice")
        .with_hide_menu(true)
        .with_object_browser_only(true)
        .with_custom_style("eyJiZyI6IiMwMDAifQ==");
    let admin = StaticAdminClient::new(
        AccountInfo::new(
            "alice",
            json!({
                "Statement": [
                    { "Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::alice/*"] }
                ]
            })
            .to_string(),
        )
        .with_server_type(ServerType::Erasure),
    )
    .with_kms(KmsStatus {
        name: "kes".into(),
        default_key_id: "console-key".into(),
        endpoints: vec!["https://kes:7373".into()],
    });

    let response =
        check_session_at(Some(&principal), &admin, &JsonPolicyParser, &settings, now()).await?;

    assert_eq!(
        serde_json::to_value(&response)?,
        json!({
            "features": [
                "log-search",
                "oidc-idp",
                "external-idp",
                "ldap-idp",
                "external-idp",
                "hide-menu",
                "object-browser-only",
                "kms"
            ],
            "status": "ok",
            "operator": false,
            "distributedMode": true,
            "permissions": {
                "": [],
                "arn:aws:s3:::alice/*": ["s3:GetObject"]
            },
            "allowResources": [],
            "customStyles": "eyJiZyI6IiMwMDAifQ==",
            "envConstants": { "maxConcurrentUploads": 3, "maxConcurrentDownloads": 20 },
            "serverEndPoint": "https://minio.example.com:9000"
        })
    );
    Ok(())
}

#[tokio::test]
async fn it_produces_identical_responses_for_identical_inputs() -> Result<()> {
    let principal = Principal::new("AKIA", "secret", token(json!({ "sub": "alice" })), "alice");
    let admin = StaticAdminClient::new(AccountInfo::new(
        "alice",
        json!({
            "Statement": [
                { "Effect": "Allow", "Action": ["s3:PutObject", "s3:GetObject", "admin:*"], "Resource": ["b", "a", "c"] },
                { "Effect": "Deny", "Action": ["s3:PutObject"], "Resource": ["c"] },
                {
                    "Effect": "Allow",
                    "Action": ["s3:ListBucket"],
                    "Resource": ["a"],
                    "Condition": {
                        "StringLike": { "s3:prefix": ["x/"] },
                        "StringEquals": { "s3:prefix": ["y/"] }
                    }
                }
            ]
        })
        .to_string(),
    ));
    let settings = Settings::default();

    let first =
        check_session_at(Some(&principal), &admin, &JsonPolicyParser, &settings, now()).await?;
    let second =
        check_session_at(Some(&principal), &admin, &JsonPolicyParser, &settings, now()).await?;

    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    Ok(())
}
