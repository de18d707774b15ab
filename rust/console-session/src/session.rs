//! Session checks.
//!
//! A session check turns the authenticated [`Principal`] into the
//! [`SessionResponse`] the UI renders from: the account policy is fetched
//! with the session's own credentials, identity placeholders are
//! substituted, and the parsed policy is folded into per-resource
//! permissions. Nothing is cached between checks, so permissions always
//! reflect the current token.

use chrono::{DateTime, Utc};
use console_policy::{Policy, PolicyParser};

use crate::{
    AdminClient, Claims, ConditionValues, Principal, Resolution, SessionError, SessionResponse,
    Settings, aggregate, enabled_features, replace_policy_variables,
};

/// Parse `raw_policy` for `principal` and fold it into permissions.
///
/// This is the synchronous core of a session check: substitution, parsing,
/// condition values and aggregation. A policy that does not parse is an
/// invalid session; a statement whose conditions cannot be decoded is a
/// processing error.
pub fn resolve_permissions<P>(
    parser: &P,
    raw_policy: &[u8],
    account_name: &str,
    claims: &Claims,
    conditions: &ConditionValues<'_>,
) -> Result<Resolution, SessionError>
where
    P: PolicyParser + ?Sized,
{
    let policy = parse_policy(parser, raw_policy, account_name, claims)?;
    aggregate(&policy, &conditions.build()).map_err(SessionError::Processing)
}

/// Substitute identity placeholders in `raw_policy` and parse the result.
pub fn parse_policy<P>(
    parser: &P,
    raw_policy: &[u8],
    account_name: &str,
    claims: &Claims,
) -> Result<Policy, SessionError>
where
    P: PolicyParser + ?Sized,
{
    let substituted = replace_policy_variables(raw_policy, account_name, claims);
    parser
        .parse(&substituted)
        .map_err(SessionError::MalformedPolicy)
}

/// Check a session at the current time.
pub async fn check_session<A, P>(
    principal: Option<&Principal>,
    admin: &A,
    parser: &P,
    settings: &Settings,
) -> Result<SessionResponse, SessionError>
where
    A: AdminClient + ?Sized,
    P: PolicyParser + ?Sized,
{
    check_session_at(principal, admin, parser, settings, Utc::now()).await
}

/// Check a session as of `now`.
pub async fn check_session_at<A, P>(
    principal: Option<&Principal>,
    admin: &A,
    parser: &P,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionResponse, SessionError>
where
    A: AdminClient + ?Sized,
    P: PolicyParser + ?Sized,
{
    let result = match principal {
        Some(principal) => check(principal, admin, parser, settings, now).await,
        None => Err(SessionError::InvalidSession("no session principal".into())),
    };

    if let Err(error) = &result {
        tracing::warn!(
            %error,
            invalid_session = error.is_invalid_session(),
            status = error.status_code(),
            "session check failed"
        );
    }

    result
}

async fn check<A, P>(
    principal: &Principal,
    admin: &A,
    parser: &P,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<SessionResponse, SessionError>
where
    A: AdminClient + ?Sized,
    P: PolicyParser + ?Sized,
{
    let claims = Claims::from_token(&principal.sts_session_token)?;
    let account = admin.account_info().await?;

    let conditions = ConditionValues::new(principal, settings, &claims, now);
    let resolution = resolve_permissions(
        parser,
        &account.policy,
        &account.account_name,
        &claims,
        &conditions,
    )?;

    tracing::debug!(
        account = %principal.account_access_key,
        resources = resolution.permissions.len(),
        allow_resources = resolution.allow_resources.len(),
        "resolved session permissions"
    );

    Ok(SessionResponse::builder(resolution)
        .features(enabled_features(admin, principal, settings).await)
        .distributed_mode(account.is_erasure())
        .custom_styles(principal.custom_style.clone())
        .settings(settings)
        .build())
}
