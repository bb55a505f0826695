//! Secrets Manager secrets generated at provisioning time.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, SecretValue, Stack};

/// Rules for a generated secret string.
#[derive(Debug, Clone)]
pub struct GenerateSecretString {
    pub exclude_characters: String,
    pub include_space: bool,
    pub password_length: u32,
    /// JSON template the generated value is merged into.
    pub secret_string_template: Value,
    /// Key under which the generated value is stored.
    pub generate_string_key: String,
}

/// Properties for a Secrets Manager secret.
#[derive(Debug, Clone)]
pub struct SecretProps {
    pub name: Option<String>,
    pub description: Option<String>,
    pub generate: GenerateSecretString,
}

/// Handle to a secret declared in-stack. `Ref` yields the secret ARN.
#[derive(Debug, Clone)]
pub struct SecretHandle {
    pub logical_id: String,
}

impl SecretHandle {
    pub fn arn(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }

    /// Opaque reference to a JSON field of this secret's value.
    pub fn secret_value(&self, json_field: &str) -> SecretValue {
        SecretValue::from_secret_ref(self.arn(), json_field)
    }
}

pub struct Secret;

impl Secret {
    pub fn new(stack: &mut Stack, id: &str, props: SecretProps) -> CoreResult<SecretHandle> {
        let generate = &props.generate;
        stack.add_resource(
            id,
            Resource::new("AWS::SecretsManager::Secret")
                .prop(
                    "Name",
                    props.name.clone().map(Value::String).unwrap_or(Value::Null),
                )
                .prop(
                    "Description",
                    props
                        .description
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                )
                .prop(
                    "GenerateSecretString",
                    json!({
                        "ExcludeCharacters": generate.exclude_characters,
                        "IncludeSpace": generate.include_space,
                        "PasswordLength": generate.password_length,
                        "SecretStringTemplate": generate.secret_string_template.to_string(),
                        "GenerateStringKey": generate.generate_string_key,
                    }),
                ),
        )?;
        Ok(SecretHandle {
            logical_id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_generated_secret_renders_template() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        let secret = Secret::new(
            &mut stack,
            "dbMasterPassword",
            SecretProps {
                name: Some("app/devdbMasterPassword".to_string()),
                description: None,
                generate: GenerateSecretString {
                    exclude_characters: "{}[]\"'`@/\\".to_string(),
                    include_space: false,
                    password_length: 16,
                    secret_string_template: json!({ "username": "appDevDbUser" }),
                    generate_string_key: "password".to_string(),
                },
            },
        )
        .unwrap();

        let template = stack.synth();
        let generated =
            &template.resource("dbMasterPassword").unwrap()["Properties"]["GenerateSecretString"];
        assert_eq!(generated["PasswordLength"], 16);
        assert_eq!(generated["GenerateStringKey"], "password");
        assert_eq!(generated["ExcludeCharacters"], "{}[]\"'`@/\\");

        // Field references render as an opaque dynamic reference.
        let rendered = secret.secret_value("password").render();
        assert!(rendered.get("Fn::Join").is_some());
    }
}
