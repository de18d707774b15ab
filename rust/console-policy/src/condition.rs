//! Statement conditions.
//!
//! A statement's `Condition` element is a map of operator blocks:
//!
//! ```text
//! "Condition": {
//!     "StringLike": { "s3:prefix": ["docs/", "images/"] },
//!     "Bool":       { "aws:SecureTransport": "true" }
//! }
//! ```
//!
//! [`ConditionSet::decode`] turns the raw JSON into operator → key → values,
//! and [`ConditionSet::evaluate`] checks it against the request facts that
//! are known up front (see [`ConditionContext`]).

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::{PolicyError, wildcard};

/// Request facts keyed by condition key *name* (see [`key_name`]).
pub type ConditionContext = BTreeMap<String, Vec<String>>;

/// Condition key whose values restrict listing to object-path prefixes.
pub const S3_PREFIX_KEY: &str = "s3:prefix";

const KEY_PREFIXES: &[&str] = &["aws:", "s3:", "jwt:", "ldap:", "sts:", "svc:"];

/// Strip the namespace from a condition key: `aws:username` → `username`,
/// `jwt:groups` → `groups`. Keys without a known namespace are returned
/// unchanged.
pub fn key_name(key: &str) -> &str {
    KEY_PREFIXES
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix))
        .unwrap_or(key)
}

/// One operator block: condition key → accepted values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionBlock(BTreeMap<String, Vec<String>>);

impl ConditionBlock {
    /// Values listed for the given key (as written, namespace included).
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// The `s3:prefix` values of this block, or an empty list.
    pub fn prefixes(&self) -> Vec<String> {
        self.values(S3_PREFIX_KEY)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Iterate over key → values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// Decoded conditions of a statement: operator → [`ConditionBlock`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet(BTreeMap<String, ConditionBlock>);

impl ConditionSet {
    /// Decode raw `Condition` JSON.
    ///
    /// Every operator must map to an object, and every key in that object to
    /// a scalar (string, bool or number) or an array of scalars.
    pub fn decode(raw: &Map<String, Value>) -> Result<Self, PolicyError> {
        let mut operators = BTreeMap::new();

        for (operator, block) in raw {
            let Value::Object(entries) = block else {
                return Err(PolicyError::malformed_condition(
                    operator,
                    "expected an object of condition keys",
                ));
            };

            let mut keys = BTreeMap::new();
            for (key, value) in entries {
                let values = match value {
                    Value::Array(items) => items
                        .iter()
                        .map(|item| scalar(item).ok_or_else(|| unexpected(operator, key, item)))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => vec![scalar(other).ok_or_else(|| unexpected(operator, key, other))?],
                };
                keys.insert(key.clone(), values);
            }

            operators.insert(operator.clone(), ConditionBlock(keys));
        }

        Ok(Self(operators))
    }

    /// Whether there are no operator blocks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of operator blocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Operator blocks in operator-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConditionBlock)> {
        self.0.iter()
    }

    /// The block for the given operator, if present.
    pub fn get(&self, operator: &str) -> Option<&ConditionBlock> {
        self.0.get(operator)
    }

    /// True when every operator block is satisfied by `context`. An empty set
    /// is always satisfied; an operator this evaluator does not know never is.
    pub fn evaluate(&self, context: &ConditionContext) -> bool {
        self.0.iter().all(|(name, block)| match Operator::parse(name) {
            Some(operator) => block
                .iter()
                .all(|(key, expected)| operator.evaluate(expected, context.get(key_name(key)))),
            None => {
                tracing::debug!(operator = %name, "unsupported condition operator");
                false
            }
        })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn unexpected(operator: &str, key: &str, value: &Value) -> PolicyError {
    PolicyError::malformed_condition(
        operator,
        format!("unexpected value for '{key}': {value}"),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qualifier {
    None,
    ForAnyValue,
    ForAllValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
}

impl Comparison {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Equals => ordering == Ordering::Equal,
            Comparison::LessThan => ordering == Ordering::Less,
            Comparison::LessThanEquals => ordering != Ordering::Greater,
            Comparison::GreaterThan => ordering == Ordering::Greater,
            Comparison::GreaterThanEquals => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    StringEquals { ignore_case: bool },
    StringLike,
    Bool,
    Null,
    Numeric(Comparison),
    Date(Comparison),
    IpAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Operator {
    family: Family,
    negated: bool,
    qualifier: Qualifier,
    if_exists: bool,
}

impl Operator {
    fn parse(name: &str) -> Option<Self> {
        let (qualifier, rest) = if let Some(rest) = name.strip_prefix("ForAnyValue:") {
            (Qualifier::ForAnyValue, rest)
        } else if let Some(rest) = name.strip_prefix("ForAllValues:") {
            (Qualifier::ForAllValues, rest)
        } else {
            (Qualifier::None, name)
        };
        let (if_exists, base) = match rest.strip_suffix("IfExists") {
            Some(base) => (true, base),
            None => (false, rest),
        };

        let (family, negated) = match base {
            "StringEquals" => (Family::StringEquals { ignore_case: false }, false),
            "StringNotEquals" => (Family::StringEquals { ignore_case: false }, true),
            "StringEqualsIgnoreCase" => (Family::StringEquals { ignore_case: true }, false),
            "StringNotEqualsIgnoreCase" => (Family::StringEquals { ignore_case: true }, true),
            "StringLike" => (Family::StringLike, false),
            "StringNotLike" => (Family::StringLike, true),
            "Bool" => (Family::Bool, false),
            "Null" => (Family::Null, false),
            "NumericEquals" => (Family::Numeric(Comparison::Equals), false),
            "NumericNotEquals" => (Family::Numeric(Comparison::Equals), true),
            "NumericLessThan" => (Family::Numeric(Comparison::LessThan), false),
            "NumericLessThanEquals" => (Family::Numeric(Comparison::LessThanEquals), false),
            "NumericGreaterThan" => (Family::Numeric(Comparison::GreaterThan), false),
            "NumericGreaterThanEquals" => (Family::Numeric(Comparison::GreaterThanEquals), false),
            "DateEquals" => (Family::Date(Comparison::Equals), false),
            "DateNotEquals" => (Family::Date(Comparison::Equals), true),
            "DateLessThan" => (Family::Date(Comparison::LessThan), false),
            "DateLessThanEquals" => (Family::Date(Comparison::LessThanEquals), false),
            "DateGreaterThan" => (Family::Date(Comparison::GreaterThan), false),
            "DateGreaterThanEquals" => (Family::Date(Comparison::GreaterThanEquals), false),
            "IpAddress" => (Family::IpAddress, false),
            "NotIpAddress" => (Family::IpAddress, true),
            _ => return None,
        };

        Some(Self {
            family,
            negated,
            qualifier,
            if_exists,
        })
    }

    fn evaluate(&self, expected: &[String], actual: Option<&Vec<String>>) -> bool {
        if self.family == Family::Null {
            let absent = actual.is_none_or(|values| values.is_empty());
            return expected
                .iter()
                .any(|value| value.eq_ignore_ascii_case("true") == absent);
        }

        if self.qualifier == Qualifier::ForAllValues
            && actual.is_none_or(|values| values.is_empty())
        {
            return true;
        }

        let Some(actual) = actual else {
            return self.if_exists || self.negated;
        };

        let matched = match self.qualifier {
            Qualifier::ForAllValues => actual
                .iter()
                .all(|value| expected.iter().any(|candidate| self.accepts(candidate, value))),
            Qualifier::None | Qualifier::ForAnyValue => actual
                .iter()
                .any(|value| expected.iter().any(|candidate| self.accepts(candidate, value))),
        };

        matched != self.negated
    }

    fn accepts(&self, expected: &str, actual: &str) -> bool {
        match self.family {
            Family::StringEquals { ignore_case: false } => expected == actual,
            Family::StringEquals { ignore_case: true } => {
                expected.to_lowercase() == actual.to_lowercase()
            }
            Family::StringLike => wildcard::matches(expected, actual),
            Family::Bool => match (parse_bool(expected), parse_bool(actual)) {
                (Some(expected), Some(actual)) => expected == actual,
                _ => false,
            },
            Family::Numeric(comparison) => {
                match (expected.parse::<f64>(), actual.parse::<f64>()) {
                    (Ok(expected), Ok(actual)) => actual
                        .partial_cmp(&expected)
                        .is_some_and(|ordering| comparison.holds(ordering)),
                    _ => false,
                }
            }
            Family::Date(comparison) => match (parse_date(expected), parse_date(actual)) {
                (Some(expected), Some(actual)) => comparison.holds(actual.cmp(&expected)),
                _ => false,
            },
            Family::IpAddress => cidr_contains(expected, actual),
            Family::Null => false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

fn cidr_contains(cidr: &str, address: &str) -> bool {
    let Ok(address) = address.parse::<IpAddr>() else {
        return false;
    };
    let (network, bits) = match cidr.split_once('/') {
        Some((network, bits)) => match bits.parse::<u32>() {
            Ok(bits) => (network, Some(bits)),
            Err(_) => return false,
        },
        None => (cidr, None),
    };
    let Ok(network) = network.parse::<IpAddr>() else {
        return false;
    };

    match (network, address) {
        (IpAddr::V4(network), IpAddr::V4(address)) => {
            let bits = bits.unwrap_or(32).min(32);
            let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
            u32::from(network) & mask == u32::from(address) & mask
        }
        (IpAddr::V6(network), IpAddr::V6(address)) => {
            let bits = bits.unwrap_or(128).min(128);
            let mask = u128::MAX.checked_shl(128 - bits).unwrap_or(0);
            u128::from(network) & mask == u128::from(address) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> ConditionSet {
        let Value::Object(map) = value else {
            panic!("conditions must be an object");
        };
        ConditionSet::decode(&map).unwrap()
    }

    fn context(entries: &[(&str, &[&str])]) -> ConditionContext {
        entries
            .iter()
            .map(|(key, values)| {
                (
                    key.to_string(),
                    values.iter().map(|value| value.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn it_strips_key_namespaces() {
        assert_eq!(key_name("aws:username"), "username");
        assert_eq!(key_name("s3:prefix"), "prefix");
        assert_eq!(key_name("jwt:groups"), "groups");
        assert_eq!(key_name("ldap:user"), "user");
        assert_eq!(key_name("custom"), "custom");
    }

    #[test]
    fn it_decodes_scalars_and_arrays() {
        let conditions = decode(json!({
            "StringLike": { "s3:prefix": ["docs/", "images/"] },
            "Bool": { "aws:SecureTransport": true },
            "NumericLessThan": { "aws:EpochTime": 1700000000 }
        }));

        assert_eq!(conditions.len(), 3);
        assert_eq!(
            conditions.get("StringLike").unwrap().prefixes(),
            vec!["docs/", "images/"]
        );
        assert_eq!(
            conditions.get("Bool").unwrap().values("aws:SecureTransport"),
            Some(&["true".to_string()][..])
        );
        assert_eq!(
            conditions.get("NumericLessThan").unwrap().values("aws:EpochTime"),
            Some(&["1700000000".to_string()][..])
        );
    }

    #[test]
    fn it_rejects_non_object_operator_blocks() {
        let Value::Object(raw) = json!({ "StringLike": ["docs/"] }) else {
            unreachable!()
        };
        let error = ConditionSet::decode(&raw).unwrap_err();
        assert!(matches!(
            error,
            PolicyError::MalformedCondition { ref operator, .. } if operator == "StringLike"
        ));
    }

    #[test]
    fn it_rejects_nested_values() {
        let Value::Object(raw) = json!({ "StringEquals": { "s3:prefix": { "a": "b" } } }) else {
            unreachable!()
        };
        assert!(ConditionSet::decode(&raw).is_err());

        let Value::Object(raw) = json!({ "StringEquals": { "s3:prefix": [null] } }) else {
            unreachable!()
        };
        assert!(ConditionSet::decode(&raw).is_err());
    }

    #[test]
    fn it_evaluates_string_operators() {
        let facts = context(&[("username", &["alice"])]);

        assert!(decode(json!({ "StringEquals": { "aws:username": "alice" } })).evaluate(&facts));
        assert!(!decode(json!({ "StringEquals": { "aws:username": "bob" } })).evaluate(&facts));
        assert!(decode(json!({ "StringNotEquals": { "aws:username": "bob" } })).evaluate(&facts));
        assert!(
            decode(json!({ "StringEqualsIgnoreCase": { "aws:username": "ALICE" } }))
                .evaluate(&facts)
        );
        assert!(decode(json!({ "StringLike": { "aws:username": "al*" } })).evaluate(&facts));
        assert!(!decode(json!({ "StringNotLike": { "aws:username": "a?ice" } })).evaluate(&facts));
    }

    #[test]
    fn it_treats_missing_keys_by_operator() {
        let facts = context(&[]);

        assert!(!decode(json!({ "StringLike": { "s3:prefix": "docs/*" } })).evaluate(&facts));
        assert!(decode(json!({ "StringNotEquals": { "s3:prefix": "docs/" } })).evaluate(&facts));
        assert!(
            decode(json!({ "StringEqualsIfExists": { "s3:prefix": "docs/" } })).evaluate(&facts)
        );
        assert!(decode(json!({ "Null": { "s3:prefix": "true" } })).evaluate(&facts));
        assert!(!decode(json!({ "Null": { "s3:prefix": "false" } })).evaluate(&facts));
    }

    #[test]
    fn it_evaluates_bool_numeric_and_date_operators() {
        let facts = context(&[
            ("SecureTransport", &["false"]),
            ("EpochTime", &["1700000000"]),
            ("CurrentTime", &["2023-11-14T22:13:20Z"]),
        ]);

        assert!(decode(json!({ "Bool": { "aws:SecureTransport": "false" } })).evaluate(&facts));
        assert!(!decode(json!({ "Bool": { "aws:SecureTransport": true } })).evaluate(&facts));
        assert!(
            decode(json!({ "NumericGreaterThan": { "aws:EpochTime": 1600000000 } }))
                .evaluate(&facts)
        );
        assert!(
            !decode(json!({ "NumericLessThan": { "aws:EpochTime": "1600000000" } }))
                .evaluate(&facts)
        );
        assert!(
            decode(json!({ "DateLessThan": { "aws:CurrentTime": "2030-01-01T00:00:00Z" } }))
                .evaluate(&facts)
        );
        assert!(
            !decode(json!({ "DateGreaterThan": { "aws:CurrentTime": "2030-01-01T00:00:00Z" } }))
                .evaluate(&facts)
        );
    }

    #[test]
    fn it_evaluates_set_qualifiers() {
        let facts = context(&[("groups", &["dev", "ops"])]);

        assert!(
            decode(json!({ "ForAnyValue:StringEquals": { "jwt:groups": ["ops"] } }))
                .evaluate(&facts)
        );
        assert!(
            !decode(json!({ "ForAllValues:StringEquals": { "jwt:groups": ["ops"] } }))
                .evaluate(&facts)
        );
        assert!(
            decode(json!({ "ForAllValues:StringEquals": { "jwt:groups": ["ops", "dev", "qa"] } }))
                .evaluate(&facts)
        );
    }

    #[test]
    fn it_treats_for_all_values_as_vacuous_without_values() {
        let block = decode(json!({ "ForAllValues:StringEquals": { "jwt:groups": ["ops"] } }));

        assert!(block.evaluate(&ConditionContext::new()));
        assert!(block.evaluate(&context(&[("groups", &[])])));
        assert!(
            !decode(json!({ "ForAnyValue:StringEquals": { "jwt:groups": ["ops"] } }))
                .evaluate(&ConditionContext::new())
        );
    }

    #[test]
    fn it_matches_ip_ranges() {
        assert!(cidr_contains("10.0.0.0/8", "10.1.2.3"));
        assert!(!cidr_contains("10.0.0.0/8", "11.1.2.3"));
        assert!(cidr_contains("0.0.0.0/0", "192.168.1.1"));
        assert!(cidr_contains("192.168.1.1", "192.168.1.1"));
        assert!(cidr_contains("2001:db8::/32", "2001:db8::1"));
        assert!(!cidr_contains("2001:db8::/32", "10.0.0.1"));
    }

    #[test]
    fn it_never_satisfies_unknown_operators() {
        let facts = context(&[("username", &["alice"])]);
        assert!(!decode(json!({ "BinaryEquals": { "aws:username": "alice" } })).evaluate(&facts));
    }

    #[test]
    fn it_requires_every_block() {
        let facts = context(&[("username", &["alice"]), ("SecureTransport", &["true"])]);
        let conditions = decode(json!({
            "StringEquals": { "aws:username": "alice" },
            "Bool": { "aws:SecureTransport": "false" }
        }));
        assert!(!conditions.evaluate(&facts));
    }
}
