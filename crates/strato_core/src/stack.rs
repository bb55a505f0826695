//! Stack assembly and template synthesis.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::app::AppIdentity;
use crate::conventions::Conventions;
use crate::error::{CoreError, CoreResult};
use crate::resource::{Output, Resource};

/// A declarative grouping of desired-state resources.
///
/// Constructs register resources against a stack; [`Stack::synth`] renders
/// the accumulated graph into a [`Template`]. The stack's convention tags are
/// applied to every taggable resource at that point.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    conventions: Conventions,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>, identity: AppIdentity) -> Self {
        let name = name.into();
        info!("Declaring stack {}", name);
        Self {
            name,
            description: None,
            conventions: Conventions::new(identity),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Register a resource under a logical id unique within the stack.
    pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> CoreResult<()> {
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidLogicalId(logical_id.to_string()));
        }
        if self.resources.contains_key(logical_id) {
            return Err(CoreError::DuplicateLogicalId(logical_id.to_string()));
        }
        debug!(
            "Adding {} as {} to stack {}",
            resource.resource_type(),
            logical_id,
            self.name
        );
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn add_output(&mut self, name: &str, output: Output) {
        self.outputs.insert(name.to_string(), output);
    }

    pub fn has_resource(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    /// Reference token for a resource declared in this stack.
    pub fn r#ref(logical_id: &str) -> Value {
        json!({ "Ref": logical_id })
    }

    /// Attribute token for a resource declared in this stack.
    pub fn get_att(logical_id: &str, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [logical_id, attribute] })
    }

    /// Render the declared graph into a template.
    pub fn synth(&self) -> Template {
        info!(
            "Synthesizing stack {} ({} resources)",
            self.name,
            self.resources.len()
        );
        let stack_tags = self.conventions.tags();

        let mut resources = Map::new();
        for (logical_id, resource) in &self.resources {
            resources.insert(logical_id.clone(), resource.render(&stack_tags));
        }

        let mut body = Map::new();
        body.insert(
            "AWSTemplateFormatVersion".to_string(),
            Value::String("2010-09-09".to_string()),
        );
        if let Some(description) = &self.description {
            body.insert("Description".to_string(), Value::String(description.clone()));
        }
        body.insert("Resources".to_string(), Value::Object(resources));

        if !self.outputs.is_empty() {
            let mut outputs = Map::new();
            for (name, output) in &self.outputs {
                let mut entry = Map::new();
                if let Some(description) = &output.description {
                    entry.insert(
                        "Description".to_string(),
                        Value::String(description.clone()),
                    );
                }
                entry.insert("Value".to_string(), output.value.clone());
                outputs.insert(name.clone(), Value::Object(entry));
            }
            body.insert("Outputs".to_string(), Value::Object(outputs));
        }

        Template {
            stack_name: self.name.clone(),
            body: Value::Object(body),
        }
    }
}

/// A fully synthesized template ready for the provisioning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    stack_name: String,
    body: Value,
}

impl Template {
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.body["Resources"].get(logical_id)
    }

    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Value> {
        self.body["Resources"]
            .as_object()
            .map(|resources| {
                resources
                    .values()
                    .filter(|r| r["Type"] == resource_type)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.body.get("Outputs").and_then(|outputs| outputs.get(name))
    }

    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    /// Write the template as `{stack}.template.json` into an output directory.
    pub fn write_to(&self, out_dir: &Path) -> CoreResult<PathBuf> {
        fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}.template.json", self.stack_name));
        fs::write(&path, self.to_json_pretty()?)?;
        debug!("Wrote template to {:?}", path);
        Ok(path)
    }
}
