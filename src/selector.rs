//! Pod selector translation
//!
//! Turns a Kubernetes `LabelSelector` into the label query string the
//! API server understands (`app=web,tier in (a,b),!canary`).

use crate::error::{OperatorError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

/// Build a label query from a selector. An empty selector selects everything.
pub fn label_query(selector: &LabelSelector) -> Result<String> {
    let mut terms = Vec::new();

    if let Some(labels) = &selector.match_labels {
        for (key, value) in labels {
            validate_key(key)?;
            validate_value(key, value)?;
            terms.push(format!("{}={}", key, value));
        }
    }

    for expr in selector.match_expressions.iter().flatten() {
        validate_key(&expr.key)?;
        let values = expr.values.as_deref().unwrap_or_default();
        let term = match expr.operator.as_str() {
            "In" | "NotIn" => {
                if values.is_empty() {
                    return Err(OperatorError::InvalidSelector(format!(
                        "operator {} on key '{}' requires at least one value",
                        expr.operator, expr.key
                    )));
                }
                for value in values {
                    validate_value(&expr.key, value)?;
                }
                let op = if expr.operator == "In" { "in" } else { "notin" };
                format!("{} {} ({})", expr.key, op, values.join(","))
            }
            "Exists" | "DoesNotExist" => {
                if !values.is_empty() {
                    return Err(OperatorError::InvalidSelector(format!(
                        "operator {} on key '{}' must not have values",
                        expr.operator, expr.key
                    )));
                }
                if expr.operator == "Exists" {
                    expr.key.clone()
                } else {
                    format!("!{}", expr.key)
                }
            }
            other => {
                return Err(OperatorError::InvalidSelector(format!(
                    "unknown operator '{}' on key '{}'",
                    other, expr.key
                )))
            }
        };
        terms.push(term);
    }

    Ok(terms.join(","))
}

fn validate_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    let name_ok = !name.is_empty() && name.len() <= 63 && is_label_token(name);
    let prefix_ok = prefix.map_or(true, is_dns_subdomain);
    if !name_ok || !prefix_ok {
        return Err(OperatorError::InvalidSelector(format!(
            "invalid label key '{}'",
            key
        )));
    }
    Ok(())
}

// DNS-1123 subdomain: lowercase alphanumerics, '-' and '.', alphanumeric at both ends.
fn is_dns_subdomain(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    !bytes.is_empty()
        && bytes.len() <= 253
        && edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && bytes
            .iter()
            .all(|&b| edge_ok(b) || b == b'-' || b == b'.')
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.len() > 63 || (!value.is_empty() && !is_label_token(value)) {
        return Err(OperatorError::InvalidSelector(format!(
            "invalid value '{}' for label '{}'",
            value, key
        )));
    }
    Ok(())
}

// Alphanumeric at both ends, with '-', '_' and '.' allowed in between.
fn is_label_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_alphanumeric();
    edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && bytes
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use std::collections::BTreeMap;

    fn requirement(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| v.to_string()).collect())
            },
        }
    }

    #[test]
    fn test_empty_selector_selects_everything() {
        assert_eq!(label_query(&LabelSelector::default()).unwrap(), "");
    }

    #[test]
    fn test_match_labels() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([
                ("app".to_string(), "web".to_string()),
                ("tier".to_string(), "frontend".to_string()),
            ])),
            ..Default::default()
        };
        assert_eq!(label_query(&selector).unwrap(), "app=web,tier=frontend");
    }

    #[test]
    fn test_match_expressions() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
            match_expressions: Some(vec![
                requirement("env", "In", &["prod", "staging"]),
                requirement("track", "NotIn", &["canary"]),
                requirement("app.kubernetes.io/managed-by", "Exists", &[]),
                requirement("paused", "DoesNotExist", &[]),
            ]),
        };
        assert_eq!(
            label_query(&selector).unwrap(),
            "app=web,env in (prod,staging),track notin (canary),app.kubernetes.io/managed-by,!paused"
        );
    }

    #[test]
    fn test_invalid_selectors() {
        let unknown_op = LabelSelector {
            match_expressions: Some(vec![requirement("env", "Matches", &["x"])]),
            ..Default::default()
        };
        assert!(matches!(
            label_query(&unknown_op),
            Err(OperatorError::InvalidSelector(_))
        ));

        let in_without_values = LabelSelector {
            match_expressions: Some(vec![requirement("env", "In", &[])]),
            ..Default::default()
        };
        assert!(label_query(&in_without_values).is_err());

        let exists_with_values = LabelSelector {
            match_expressions: Some(vec![requirement("env", "Exists", &["x"])]),
            ..Default::default()
        };
        assert!(label_query(&exists_with_values).is_err());

        let bad_value = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "a b".to_string())])),
            ..Default::default()
        };
        assert!(label_query(&bad_value).is_err());

        let bad_key = LabelSelector {
            match_labels: Some(BTreeMap::from([("-app".to_string(), "web".to_string())])),
            ..Default::default()
        };
        assert!(label_query(&bad_key).is_err());
    }

    #[test]
    fn test_key_prefix_must_be_dns_subdomain() {
        let with_labels = |key: &str| LabelSelector {
            match_labels: Some(BTreeMap::from([(key.to_string(), "web".to_string())])),
            ..Default::default()
        };

        for key in [
            "bad prefix,x/app",
            "Example.com/app",
            "-example.com/app",
            "example.com./app",
            "/app",
            "a/b/app",
        ] {
            assert!(
                matches!(label_query(&with_labels(key)), Err(OperatorError::InvalidSelector(_))),
                "key {:?} should be rejected",
                key
            );
        }

        let long_prefix = format!("{}/app", "a".repeat(254));
        assert!(label_query(&with_labels(&long_prefix)).is_err());

        assert_eq!(
            label_query(&with_labels("app.kubernetes.io/name")).unwrap(),
            "app.kubernetes.io/name=web"
        );

        let expression = LabelSelector {
            match_expressions: Some(vec![requirement("x,y/tier", "Exists", &[])]),
            ..Default::default()
        };
        assert!(label_query(&expression).is_err());
    }

    #[test]
    fn test_empty_label_value_is_allowed() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), String::new())])),
            ..Default::default()
        };
        assert_eq!(label_query(&selector).unwrap(), "app=");
    }
}
