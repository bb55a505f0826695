//! KMS keys and aliases.

use serde_json::{json, Value};

use strato_core::{CoreResult, RemovalPolicy, Resource, Stack};

/// Handle to a KMS key.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    pub logical_id: String,
}

impl KeyHandle {
    pub fn key_id(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        Stack::get_att(&self.logical_id, "Arn")
    }
}

pub struct Key;

impl Key {
    /// Declare a key administered by the account root.
    pub fn new(stack: &mut Stack, id: &str, removal_policy: RemovalPolicy) -> CoreResult<KeyHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::KMS::Key")
                .removal_policy(removal_policy)
                .prop(
                    "KeyPolicy",
                    json!({
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": {
                                "AWS": { "Fn::Sub": "arn:aws:iam::${AWS::AccountId}:root" }
                            },
                            "Action": "kms:*",
                            "Resource": "*",
                        }]
                    }),
                ),
        )?;
        Ok(KeyHandle {
            logical_id: id.to_string(),
        })
    }
}

pub struct Alias;

impl Alias {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        alias_name: &str,
        key: &KeyHandle,
    ) -> CoreResult<()> {
        stack.add_resource(
            id,
            Resource::new("AWS::KMS::Alias")
                .not_taggable()
                .prop("AliasName", json!(alias_name))
                .prop("TargetKeyId", key.key_id()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_key_with_alias() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        let key = Key::new(&mut stack, "artifactsKey", RemovalPolicy::Destroy).unwrap();
        Alias::new(&mut stack, "artifactsKeyAlias", "alias/codepipeline-appdev", &key).unwrap();

        let template = stack.synth();
        assert_eq!(template.resource("artifactsKey").unwrap()["DeletionPolicy"], "Delete");
        assert_eq!(
            template.resource("artifactsKeyAlias").unwrap()["Properties"]["AliasName"],
            "alias/codepipeline-appdev"
        );
    }
}
