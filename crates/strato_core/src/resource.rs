//! Desired-state resource declarations.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// How a resource is removed when its stack is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    #[default]
    Retain,
    Destroy,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Destroy => "Delete",
        }
    }
}

/// A single desired-state resource declaration.
///
/// A thin wrapper over the provider's resource schema: a type string plus a
/// JSON property bag. Ordering is preserved via sorted maps so synthesis is
/// deterministic.
#[derive(Debug, Clone)]
pub struct Resource {
    resource_type: String,
    properties: Map<String, Value>,
    depends_on: Vec<String>,
    taggable: bool,
    tags: BTreeMap<String, String>,
    removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            taggable: true,
            tags: BTreeMap::new(),
            removal_policy: None,
        }
    }

    /// Set a property. `Null` values are skipped so optional props can be
    /// passed through unconditionally.
    pub fn prop(mut self, name: &str, value: Value) -> Self {
        if !value.is_null() {
            self.properties.insert(name.to_string(), value);
        }
        self
    }

    /// Add an explicit dependency on another resource in the same stack.
    pub fn depends_on(mut self, logical_id: &str) -> Self {
        self.depends_on.push(logical_id.to_string());
        self
    }

    /// Mark the resource type as not accepting tags. These resources are the
    /// documented gap in tag propagation.
    pub fn not_taggable(mut self) -> Self {
        self.taggable = false;
        self
    }

    /// Add a resource-specific tag (e.g. `Name`), merged with the stack's
    /// convention tags at synthesis.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn is_taggable(&self) -> bool {
        self.taggable
    }

    /// Render into the provider's resource JSON, merging in the stack-level
    /// convention tags when the resource accepts them.
    pub fn render(&self, stack_tags: &BTreeMap<String, String>) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), Value::String(self.resource_type.clone()));

        let mut properties = self.properties.clone();
        if self.taggable {
            let mut merged = stack_tags.clone();
            merged.extend(self.tags.clone());
            let tags: Vec<Value> = merged
                .into_iter()
                .map(|(k, v)| serde_json::json!({"Key": k, "Value": v}))
                .collect();
            properties.insert("Tags".to_string(), Value::Array(tags));
        }
        body.insert("Properties".to_string(), Value::Object(properties));

        if !self.depends_on.is_empty() {
            body.insert(
                "DependsOn".to_string(),
                Value::Array(
                    self.depends_on
                        .iter()
                        .map(|d| Value::String(d.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(policy) = self.removal_policy {
            body.insert(
                "DeletionPolicy".to_string(),
                Value::String(policy.as_str().to_string()),
            );
        }

        Value::Object(body)
    }
}

/// A stack output exposed after provisioning.
#[derive(Debug, Clone)]
pub struct Output {
    pub value: Value,
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_merges_stack_tags() {
        let resource = Resource::new("AWS::EC2::VPC")
            .prop("CidrBlock", json!("10.0.0.0/16"))
            .tag("Name", "app-dev-vpc");
        let stack_tags = BTreeMap::from([("strato:app-name".to_string(), "app".to_string())]);

        let rendered = resource.render(&stack_tags);
        let tags = rendered["Properties"]["Tags"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().any(|t| t["Key"] == "Name"));
        assert!(tags.iter().any(|t| t["Key"] == "strato:app-name"));
    }

    #[test]
    fn test_untaggable_resource_gets_no_tags() {
        let resource = Resource::new("AWS::CodePipeline::Webhook").not_taggable();
        let stack_tags = BTreeMap::from([("strato:app-name".to_string(), "app".to_string())]);

        let rendered = resource.render(&stack_tags);
        assert!(rendered["Properties"].get("Tags").is_none());
    }

    #[test]
    fn test_null_props_are_skipped() {
        let resource = Resource::new("AWS::S3::Bucket").prop("BucketName", Value::Null);
        let rendered = resource.render(&BTreeMap::new());
        assert!(rendered["Properties"].get("BucketName").is_none());
    }

    #[test]
    fn test_depends_on_and_deletion_policy() {
        let resource = Resource::new("AWS::KMS::Alias")
            .not_taggable()
            .depends_on("key")
            .removal_policy(RemovalPolicy::Destroy);
        let rendered = resource.render(&BTreeMap::new());
        assert_eq!(rendered["DependsOn"], json!(["key"]));
        assert_eq!(rendered["DeletionPolicy"], "Delete");
    }
}
