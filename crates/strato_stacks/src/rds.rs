//! RDS stack with convention-driven defaults.

use serde_json::json;

use strato_aws::ec2::{SecurityGroup, SecurityGroupHandle, SecurityGroupProps, VpcHandle};
use strato_aws::rds::{DatabaseEngine, DatabaseInstance, DatabaseInstanceHandle, DatabaseInstanceProps};
use strato_aws::secretsmanager::{GenerateSecretString, Secret, SecretProps};
use strato_core::{
    resolve_vpc, AppIdentity, ContextLookup, NameFormat, SecretValue, Stack, VpcRef,
};

use crate::error::StackResult;

/// Properties for an [`RdsStack`]. Unset fields fall back to convention
/// defaults derived from the app identity.
#[derive(Debug, Clone)]
pub struct RdsStackProps {
    pub vpc: VpcRef,
    pub engine: DatabaseEngine,
    pub master_username: Option<String>,
    pub master_user_password: Option<SecretValue>,
    pub database_name: Option<String>,
    pub instance_identifier: Option<String>,
    pub instance_class: Option<String>,
    pub allocated_storage_gb: u32,
    pub backup_retention_days: Option<u32>,
}

impl RdsStackProps {
    pub fn new(vpc: impl Into<VpcRef>) -> Self {
        Self {
            vpc: vpc.into(),
            engine: DatabaseEngine::default(),
            master_username: None,
            master_user_password: None,
            database_name: None,
            instance_identifier: None,
            instance_class: None,
            allocated_storage_gb: 20,
            backup_retention_days: None,
        }
    }
}

/// A database instance in its own security group, with a generated master
/// password unless one is supplied.
pub struct RdsStack {
    pub stack: Stack,
    pub instance: DatabaseInstanceHandle,
    pub security_group: SecurityGroupHandle,
    pub master_username: String,
    pub master_password: SecretValue,
    pub database_name: String,
}

impl RdsStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: RdsStackProps,
    ) -> StackResult<Self> {
        let environment = identity.environment.clone();
        let mut stack = Stack::new(id, identity)
            .with_description(format!("RDS for the {} {} environment", id, environment));

        let vpc = VpcHandle::from(resolve_vpc(lookup, props.vpc)?);

        let security_group = SecurityGroup::new(
            &mut stack,
            "securityGroup",
            &vpc,
            SecurityGroupProps::default(),
        )?;

        let conventions = stack.conventions().clone();
        let master_username = props
            .master_username
            .unwrap_or_else(|| format!("{}DbUser", conventions.eqn(NameFormat::Camel)));

        let master_password = match props.master_user_password {
            Some(password) => password,
            None => {
                // The secret name gets truncated by Secrets Manager, so best
                // to keep it short.
                let secret = Secret::new(
                    &mut stack,
                    "masterPassword",
                    SecretProps {
                        name: Some(format!(
                            "{}dbMasterPassword",
                            conventions.eqn(NameFormat::Path)
                        )),
                        description: None,
                        generate: GenerateSecretString {
                            // The database engines reject @ / and \ values,
                            // and Beanstalk chokes on backticks, so all quote
                            // characters stay out.
                            exclude_characters: "{}[]\"'`@/\\".to_string(),
                            include_space: false,
                            password_length: 16,
                            secret_string_template: json!({ "username": master_username }),
                            generate_string_key: "password".to_string(),
                        },
                    },
                )?;
                secret.secret_value("password")
            }
        };

        let database_name = props
            .database_name
            .unwrap_or_else(|| conventions.eqn(NameFormat::Underscore));
        let instance_identifier = props
            .instance_identifier
            .unwrap_or_else(|| conventions.eqn_default());

        let instance = DatabaseInstance::new(
            &mut stack,
            "instance",
            &vpc,
            DatabaseInstanceProps {
                engine: props.engine,
                instance_identifier,
                database_name: database_name.clone(),
                master_username: master_username.clone(),
                master_user_password: master_password.clone(),
                instance_class: props
                    .instance_class
                    .unwrap_or_else(|| "db.t3.micro".to_string()),
                allocated_storage_gb: props.allocated_storage_gb,
                backup_retention_days: props.backup_retention_days.unwrap_or(7),
                security_group_ids: vec![security_group.group_id()],
            },
        )?;

        Ok(Self {
            stack,
            instance,
            security_group,
            master_username,
            master_password,
            database_name,
        })
    }
}
