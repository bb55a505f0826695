//! IAM roles, groups, policies and instance profiles.

use serde_json::{json, Map, Value};

use strato_core::{CoreResult, Resource, Stack};

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// A single IAM policy statement.
#[derive(Debug, Clone, Default)]
pub struct PolicyStatement {
    pub sid: Option<String>,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
    pub conditions: Option<Value>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.actions.push(action.to_string());
        self
    }

    pub fn resource(mut self, resource: Value) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn condition(mut self, condition: Value) -> Self {
        self.conditions = Some(condition);
        self
    }

    pub fn render(&self) -> Value {
        let mut statement = Map::new();
        if let Some(sid) = &self.sid {
            statement.insert("Sid".to_string(), json!(sid));
        }
        statement.insert("Effect".to_string(), json!(self.effect.as_str()));
        statement.insert("Action".to_string(), json!(self.actions));
        statement.insert("Resource".to_string(), json!(self.resources));
        if let Some(conditions) = &self.conditions {
            statement.insert("Condition".to_string(), conditions.clone());
        }
        Value::Object(statement)
    }
}

/// ARN of an AWS-managed policy.
pub fn managed_policy_arn(name: &str) -> String {
    format!("arn:aws:iam::aws:policy/{}", name)
}

/// The managed policy required for SSM session access to instances.
pub fn ssm_managed_instance_policy() -> String {
    managed_policy_arn("AmazonSSMManagedInstanceCore")
}

/// Properties for an IAM role.
#[derive(Debug, Clone, Default)]
pub struct RoleProps {
    pub role_name: Option<String>,
    /// Service principal allowed to assume the role (e.g. `ec2.amazonaws.com`).
    pub assumed_by_service: String,
    pub managed_policy_arns: Vec<String>,
    pub inline_statements: Vec<PolicyStatement>,
}

/// Handle to an IAM role.
#[derive(Debug, Clone)]
pub struct RoleHandle {
    pub logical_id: String,
}

impl RoleHandle {
    pub fn role_name(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        Stack::get_att(&self.logical_id, "Arn")
    }
}

pub struct Role;

impl Role {
    pub fn new(stack: &mut Stack, id: &str, props: RoleProps) -> CoreResult<RoleHandle> {
        let mut resource = Resource::new("AWS::IAM::Role")
            .prop(
                "RoleName",
                props.role_name.map(Value::String).unwrap_or(Value::Null),
            )
            .prop(
                "AssumeRolePolicyDocument",
                json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": props.assumed_by_service },
                        "Action": "sts:AssumeRole",
                    }]
                }),
            );
        if !props.managed_policy_arns.is_empty() {
            resource = resource.prop("ManagedPolicyArns", json!(props.managed_policy_arns));
        }
        if !props.inline_statements.is_empty() {
            let statements: Vec<Value> =
                props.inline_statements.iter().map(|s| s.render()).collect();
            resource = resource.prop(
                "Policies",
                json!([{
                    "PolicyName": format!("{}Policy", id),
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": statements,
                    }
                }]),
            );
        }
        stack.add_resource(id, resource)?;
        Ok(RoleHandle {
            logical_id: id.to_string(),
        })
    }
}

/// Handle to an IAM group.
#[derive(Debug, Clone)]
pub struct GroupHandle {
    pub logical_id: String,
}

impl GroupHandle {
    pub fn group_name(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct Group;

impl Group {
    pub fn new(stack: &mut Stack, id: &str, group_name: Option<String>) -> CoreResult<GroupHandle> {
        // IAM groups do not accept tags.
        stack.add_resource(
            id,
            Resource::new("AWS::IAM::Group")
                .not_taggable()
                .prop("GroupName", group_name.map(Value::String).unwrap_or(Value::Null)),
        )?;
        Ok(GroupHandle {
            logical_id: id.to_string(),
        })
    }
}

/// Properties for a standalone managed policy attached to groups or roles.
#[derive(Debug, Clone, Default)]
pub struct PolicyProps {
    pub policy_name: String,
    pub statements: Vec<PolicyStatement>,
    pub groups: Vec<Value>,
    pub roles: Vec<Value>,
}

pub struct Policy;

impl Policy {
    pub fn new(stack: &mut Stack, id: &str, props: PolicyProps) -> CoreResult<()> {
        let statements: Vec<Value> = props.statements.iter().map(|s| s.render()).collect();
        let mut resource = Resource::new("AWS::IAM::Policy")
            .not_taggable()
            .prop("PolicyName", json!(props.policy_name))
            .prop(
                "PolicyDocument",
                json!({ "Version": "2012-10-17", "Statement": statements }),
            );
        if !props.groups.is_empty() {
            resource = resource.prop("Groups", json!(props.groups));
        }
        if !props.roles.is_empty() {
            resource = resource.prop("Roles", json!(props.roles));
        }
        stack.add_resource(id, resource)
    }
}

/// Handle to an EC2 instance profile.
#[derive(Debug, Clone)]
pub struct InstanceProfileHandle {
    pub logical_id: String,
}

impl InstanceProfileHandle {
    pub fn profile_ref(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct InstanceProfile;

impl InstanceProfile {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        instance_profile_name: Option<String>,
        role: &RoleHandle,
    ) -> CoreResult<InstanceProfileHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::IAM::InstanceProfile")
                .not_taggable()
                .depends_on(&role.logical_id)
                .prop(
                    "InstanceProfileName",
                    instance_profile_name.map(Value::String).unwrap_or(Value::Null),
                )
                .prop("Roles", json!([role.role_name()])),
        )?;
        Ok(InstanceProfileHandle {
            logical_id: id.to_string(),
        })
    }
}
