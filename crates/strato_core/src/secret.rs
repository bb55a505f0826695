//! Opaque secret references.
//!
//! Secrets embedded in generated configuration (database passwords, OAuth
//! tokens) are carried as runtime secret-store references and rendered as
//! provider dynamic references. Plaintext never passes through this layer.

use serde_json::{json, Value};

/// A deferred reference into the secret store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    /// Reference a named Secrets Manager secret, optionally a JSON field
    /// within its secret string.
    SecretsManager {
        secret_id: String,
        json_field: Option<String>,
    },
    /// Reference a field of a secret declared in the same stack, by its
    /// resource ref (the secret ARN at deploy time).
    SecretRef { secret_ref: Value, json_field: String },
}

impl SecretValue {
    pub fn secrets_manager(secret_id: impl Into<String>) -> Self {
        SecretValue::SecretsManager {
            secret_id: secret_id.into(),
            json_field: None,
        }
    }

    pub fn secrets_manager_json(
        secret_id: impl Into<String>,
        json_field: impl Into<String>,
    ) -> Self {
        SecretValue::SecretsManager {
            secret_id: secret_id.into(),
            json_field: Some(json_field.into()),
        }
    }

    pub fn from_secret_ref(secret_ref: Value, json_field: impl Into<String>) -> Self {
        SecretValue::SecretRef {
            secret_ref,
            json_field: json_field.into(),
        }
    }

    /// Render as a template value holding a dynamic reference.
    pub fn render(&self) -> Value {
        match self {
            SecretValue::SecretsManager {
                secret_id,
                json_field,
            } => {
                let field = json_field.as_deref().unwrap_or("");
                Value::String(format!(
                    "{{{{resolve:secretsmanager:{}:SecretString:{}}}}}",
                    secret_id, field
                ))
            }
            SecretValue::SecretRef {
                secret_ref,
                json_field,
            } => json!({
                "Fn::Join": ["", [
                    "{{resolve:secretsmanager:",
                    secret_ref,
                    format!(":SecretString:{}}}}}", json_field),
                ]]
            }),
        }
    }
}

/// A secret supplied either as a ready [`SecretValue`] or as the name of a
/// Secrets Manager secret whose JSON field of the same name holds the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    SecretName(String),
    Value(SecretValue),
}

impl TokenSource {
    /// Resolve into a concrete secret reference.
    pub fn resolve(self) -> SecretValue {
        match self {
            TokenSource::SecretName(key) => SecretValue::secrets_manager_json(key.clone(), key),
            TokenSource::Value(value) => value,
        }
    }
}

impl From<&str> for TokenSource {
    fn from(key: &str) -> Self {
        TokenSource::SecretName(key.to_string())
    }
}

impl From<String> for TokenSource {
    fn from(key: String) -> Self {
        TokenSource::SecretName(key)
    }
}

impl From<SecretValue> for TokenSource {
    fn from(value: SecretValue) -> Self {
        TokenSource::Value(value)
    }
}
