//! Request binding and validation against an `InputSchema`.

use crate::config::{InputSchema, ValidationRule};
use crate::error::AppError;
use crate::store::Document;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

pub struct RequestValidator;

impl RequestValidator {
    /// Keep only the declared fields of a JSON object body, then validate them.
    pub fn bind(body: Value, schema: &InputSchema) -> Result<Document, AppError> {
        let Value::Object(mut map) = body else {
            return Err(AppError::BadRequest("Request body must be a JSON object.".into()));
        };
        let mut doc = Document::new();
        for (name, _) in &schema.fields {
            if let Some(v) = map.remove(name) {
                doc.insert(name.clone(), v);
            }
        }
        Self::validate(&doc, schema)?;
        Ok(doc)
    }

    /// Check every declared field and report all failures at once, one message per field.
    pub fn validate(doc: &Document, schema: &InputSchema) -> Result<(), AppError> {
        let mut errors = BTreeMap::new();
        for (name, rule) in &schema.fields {
            if let Some(msg) = check_field(name, doc, rule)? {
                errors.insert(name.clone(), format!("{} {}", name, msg));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "Unprocessable Entity".into(),
                fields: errors,
            })
        }
    }
}

/// First failing constraint for `name`, as a message suffix.
fn check_field(name: &str, doc: &Document, rule: &ValidationRule) -> Result<Option<String>, AppError> {
    let v = match doc.get(name) {
        None | Some(Value::Null) => {
            return Ok(if rule.required == Some(true) {
                Some("is a required field.".into())
            } else {
                None
            });
        }
        Some(v) => v,
    };
    if rule.required == Some(true) && v.as_str().is_some_and(str::is_empty) {
        return Ok(Some("is a required field.".into()));
    }
    if let Some(format) = &rule.format {
        if let Some(msg) = check_format(v, format)? {
            return Ok(Some(msg));
        }
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(n) = rule.length {
            if len != n as usize {
                return Ok(Some(format!("must be of {} character(s).", n)));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Ok(Some(format!("must be a minimum of {} character(s).", min)));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Ok(Some(format!("must be a maximum of {} character(s).", max)));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|e| AppError::Internal(format!("invalid pattern for {}: {}", name, e)))?;
            if !re.is_match(s) {
                return Ok(Some("does not match the required pattern.".into()));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let shown: Vec<String> = allowed.iter().take(5).map(Value::to_string).collect();
            return Ok(Some(format!("must be one of: {}.", shown.join(", "))));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Ok(Some(format!("must be greater than or equal to {}.", min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Ok(Some(format!("must be less than or equal to {}.", max)));
            }
        }
    }
    if let Some(other) = &rule.equals_field {
        if doc.get(other) != Some(v) {
            return Ok(Some(format!("does not match with {}.", other)));
        }
    }
    Ok(None)
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(v: &Value, format: &str) -> Result<Option<String>, AppError> {
    let Some(s) = v.as_str() else {
        return Ok(None);
    };
    match format.to_lowercase().as_str() {
        "email" => {
            let re = Regex::new(EMAIL_PATTERN).map_err(|e| AppError::Internal(e.to_string()))?;
            Ok((!re.is_match(s)).then(|| "is not a valid email.".to_string()))
        }
        "uuid" => Ok(uuid::Uuid::parse_str(s)
            .is_err()
            .then(|| "is not a valid UUID.".to_string())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register_schema() -> InputSchema {
        InputSchema::new()
            .field("email", ValidationRule::required().format("email"))
            .field("password", ValidationRule::required().min_length(8))
            .field(
                "confirmPassword",
                ValidationRule::required().min_length(8).equals_field("password"),
            )
    }

    fn field_errors(err: AppError) -> BTreeMap<String, String> {
        match err {
            AppError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn bind_drops_undeclared_fields() {
        let schema = InputSchema::new().field("name", ValidationRule::required());
        let doc = RequestValidator::bind(json!({"name": "a", "admin": true}), &schema).unwrap();
        assert_eq!(Value::Object(doc), json!({"name": "a"}));
    }

    #[test]
    fn non_object_body_is_bad_request() {
        let err = RequestValidator::bind(json!([1, 2]), &InputSchema::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn every_failing_field_is_reported() {
        let err = RequestValidator::bind(
            json!({"email": "nope", "password": "short", "confirmPassword": "different1"}),
            &register_schema(),
        )
        .unwrap_err();
        let fields = field_errors(err);
        assert_eq!(fields["email"], "email is not a valid email.");
        assert_eq!(fields["password"], "password must be a minimum of 8 character(s).");
        assert_eq!(fields["confirmPassword"], "confirmPassword does not match with password.");
    }

    #[test]
    fn required_rejects_missing_null_and_empty() {
        let schema = InputSchema::new()
            .field("a", ValidationRule::required())
            .field("b", ValidationRule::required())
            .field("c", ValidationRule::required())
            .field("d", ValidationRule::optional().min_length(3));
        let fields = field_errors(RequestValidator::bind(json!({"b": null, "c": ""}), &schema).unwrap_err());
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["a"], "a is a required field.");
        assert!(!fields.contains_key("d"));
    }

    #[test]
    fn exact_length_allowed_and_range() {
        let schema = InputSchema::new()
            .field("code", ValidationRule::required().length(6))
            .field("kind", ValidationRule::optional().allowed(vec![json!("a"), json!("b")]))
            .field("n", ValidationRule::optional().minimum(1.0).maximum(10.0));
        let fields =
            field_errors(RequestValidator::bind(json!({"code": "12345", "kind": "c", "n": 11}), &schema).unwrap_err());
        assert_eq!(fields["code"], "code must be of 6 character(s).");
        assert_eq!(fields["kind"], "kind must be one of: \"a\", \"b\".");
        assert_eq!(fields["n"], "n must be less than or equal to 10.");

        assert!(RequestValidator::bind(json!({"code": "123456", "kind": "a", "n": 3}), &schema).is_ok());
    }

    #[test]
    fn valid_registration_passes() {
        let doc = RequestValidator::bind(
            json!({"email": "a@b.co", "password": "secret123", "confirmPassword": "secret123"}),
            &register_schema(),
        )
        .unwrap();
        assert_eq!(doc.len(), 3);
    }
}
