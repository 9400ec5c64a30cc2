//! Declarative per-operation schemas: input validation rules, output projection, timestamps.

use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation rule for one input field. Every constraint except `required` is skipped for null values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    /// `email` or `uuid`.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    /// Exact length in characters.
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Name of another input field that must hold the same value.
    #[serde(default)]
    pub equals_field: Option<String>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        ValidationRule::default()
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn length(mut self, n: u32) -> Self {
        self.length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.minimum = Some(n);
        self
    }

    pub fn maximum(mut self, n: f64) -> Self {
        self.maximum = Some(n);
        self
    }

    pub fn equals_field(mut self, field: &str) -> Self {
        self.equals_field = Some(field.to_string());
        self
    }
}

/// Declared input fields, in declaration order. Undeclared body fields are dropped on bind.
#[derive(Clone, Debug, Default)]
pub struct InputSchema {
    pub fields: Vec<(String, ValidationRule)>,
}

impl InputSchema {
    pub fn new() -> Self {
        InputSchema::default()
    }

    pub fn field(mut self, name: &str, rule: ValidationRule) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), rule));
        self
    }

    pub fn rule(&self, name: &str) -> Option<&ValidationRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

/// Field projection applied to each record before it is written to a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputSchema {
    /// Keep only these fields.
    Only(Vec<String>),
    /// Drop these fields.
    Except(Vec<String>),
}

impl OutputSchema {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OutputSchema::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn except<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OutputSchema::Except(fields.into_iter().map(Into::into).collect())
    }

    pub fn project(&self, mut doc: Document) -> Document {
        match self {
            OutputSchema::Only(keep) => {
                doc.retain(|k, _| keep.iter().any(|f| f == k));
                doc
            }
            OutputSchema::Except(drop) => {
                for f in drop {
                    doc.remove(f);
                }
                doc
            }
        }
    }

    /// Project a serialised record; non-object values pass through unchanged.
    pub fn project_value(&self, v: Value) -> Value {
        match v {
            Value::Object(map) => Value::Object(self.project(map)),
            other => other,
        }
    }
}

/// Which timestamps the repository stamps on writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestampConfig {
    pub created_at: bool,
    pub updated_at: bool,
}

impl TimestampConfig {
    pub const FIELD_CREATED_AT: &'static str = "createdAt";
    pub const FIELD_UPDATED_AT: &'static str = "updatedAt";

    pub fn both() -> Self {
        TimestampConfig {
            created_at: true,
            updated_at: true,
        }
    }

    pub fn none() -> Self {
        TimestampConfig::default()
    }
}
