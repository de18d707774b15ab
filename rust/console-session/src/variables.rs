//! Policy variable substitution.
//!
//! Policies may reference the caller's identity through placeholders such as
//! `arn:aws:s3:::${aws:username}/*`. Before the document is parsed, every
//! known placeholder is replaced textually, one literal pass per placeholder
//! in a fixed order. The document is never rescanned, so a value inserted by
//! a later pass is not expanded by an earlier one.
//!
//! Placeholders whose value is unknown (e.g. `${jwt:email}` without an
//! `email` claim) are left in place.

use crate::{Claims, LDAP_USER_CLAIM, LDAP_USERNAME_CLAIM};

/// OIDC claims that may be referenced as `${jwt:<claim>}`, in substitution
/// order.
pub const JWT_VARIABLE_CLAIMS: &[&str] = &[
    "sub",
    "iss",
    "aud",
    "jti",
    "upn",
    "name",
    "groups",
    "given_name",
    "family_name",
    "middle_name",
    "nickname",
    "preferred_username",
    "profile",
    "picture",
    "website",
    "email",
    "gender",
    "birthdate",
    "phone_number",
    "address",
    "scope",
    "client_id",
];

/// Replace identity placeholders in a raw policy document.
///
/// `${aws:username}` and `${aws:userid}` become `account_name`; `${jwt:*}`
/// placeholders for [`JWT_VARIABLE_CLAIMS`] and `${ldap:user}` /
/// `${ldap:username}` come from `claims` when present.
pub fn replace_policy_variables(raw: &[u8], account_name: &str, claims: &Claims) -> Vec<u8> {
    let mut policy = replace_all(raw, b"${aws:username}", account_name.as_bytes());
    policy = replace_all(&policy, b"${aws:userid}", account_name.as_bytes());
    policy = replace_jwt_variables(&policy, claims);
    replace_ldap_variables(&policy, claims)
}

fn replace_jwt_variables(raw: &[u8], claims: &Claims) -> Vec<u8> {
    let mut policy = raw.to_vec();
    for field in JWT_VARIABLE_CLAIMS {
        if let Some(value) = claims.get(field) {
            let variable = format!("${{jwt:{field}}}");
            policy = replace_all(
                &policy,
                variable.as_bytes(),
                value.to_variable_string().as_bytes(),
            );
        }
    }
    policy
}

fn replace_ldap_variables(raw: &[u8], claims: &Claims) -> Vec<u8> {
    let mut policy = raw.to_vec();
    for (variable, claim) in [
        (&b"${ldap:user}"[..], LDAP_USER_CLAIM),
        (&b"${ldap:username}"[..], LDAP_USERNAME_CLAIM),
    ] {
        if let Some(value) = claims.get(claim) {
            policy = replace_all(&policy, variable, value.to_variable_string().as_bytes());
        }
    }
    policy
}

/// Replace every non-overlapping occurrence of `from` with `to`, scanning
/// left to right. Replaced text is never rescanned.
fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }

    let mut output = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(position) = rest.windows(from.len()).position(|window| window == from) {
        output.extend_from_slice(&rest[..position]);
        output.extend_from_slice(to);
        rest = &rest[position + from.len()..];
    }
    output.extend_from_slice(rest);
    output
}
