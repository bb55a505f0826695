//! Rails on Elastic Beanstalk.

use serde_json::Value;

use strato_aws::ec2::{PortRange, SecurityGroup, SecurityGroupProps, VpcHandle};
use strato_aws::elasticbeanstalk::{
    Application, ApplicationHandle, ApplicationVersion, ApplicationVersionHandle, CommandSettings,
    Environment, EnvironmentProps, EnvironmentVariable, ProcessSettings, SourceBundle,
};
use strato_aws::iam::{
    managed_policy_arn, ssm_managed_instance_policy, InstanceProfile, Role, RoleProps,
};
use strato_core::{
    resolve_vpc, AppIdentity, ContextLookup, NameFormat, SecretValue, Stack, VpcRef,
};

use crate::error::StackResult;
use crate::session_access::{SessionAccess, SessionAccessProps};

const DEFAULT_SOLUTION_STACK_NAME: &str = "64bit Amazon Linux 2 v3.2.2 running Ruby 2.7";

/// Every environment starts from this starter bundle, a very basic Rails app.
/// It gets replaced by CodePipeline later in the setup.
fn starter_source_bundle(region: &str) -> SourceBundle {
    let s3_bucket = match region {
        "us-east-1" => "rails-cdk-us-east-1",
        _ => "rails-cdk",
    };
    SourceBundle {
        s3_bucket: s3_bucket.to_string(),
        s3_key: "starterApp.zip".to_string(),
    }
}

/// Access details for the database the Rails app connects to.
///
/// Values are template tokens so the database may live in this stack or be
/// imported from another.
#[derive(Debug, Clone)]
pub struct DatabaseAccess {
    pub endpoint_address: Value,
    pub endpoint_port: Value,
    /// Engine port for the ingress rule from the app security group.
    pub port: i64,
    pub security_group_id: Value,
    pub username: String,
    pub password: SecretValue,
    pub database_name: String,
}

/// Properties for a [`RailsEnvironment`].
#[derive(Debug, Clone)]
pub struct RailsEnvironmentProps {
    pub application_name: String,
    pub environment_name: String,
    pub database_access: DatabaseAccess,
    pub rails_master_key: Option<SecretValue>,
    /// RAILS_ENV value. Defaults to `production`.
    pub rails_environment: Option<String>,
    pub solution_stack_name: Option<String>,
    pub application_version: ApplicationVersionHandle,
    pub ec2_key_name: Option<String>,
    pub ec2_instance_types: Vec<String>,
    pub root_volume_type: Option<String>,
    pub root_volume_size_gb: Option<u32>,
    /// Additional managed policies for the EC2 role.
    pub ec2_role_managed_policy_arns: Vec<String>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub default_process: ProcessSettings,
    pub command: CommandSettings,
    pub ssl_certificate_arns: Option<String>,
}

/// A Beanstalk environment wired to a database, with the Rails configuration
/// surfaced through environment variables.
pub struct RailsEnvironment {
    pub environment_name: String,
}

impl RailsEnvironment {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        props: RailsEnvironmentProps,
    ) -> StackResult<Self> {
        let db = &props.database_access;

        let security_group = SecurityGroup::new(
            stack,
            &format!("{}SecurityGroup", id),
            vpc,
            SecurityGroupProps::default(),
        )?;
        SecurityGroup::allow_to(
            stack,
            &format!("{}ToDatabase", id),
            &security_group,
            db.security_group_id.clone(),
            PortRange::tcp(db.port),
        )?;

        let role_name = format!("{}-{}-ec2-role", props.application_name, props.environment_name);
        let mut managed_policy_arns = vec![
            managed_policy_arn("AWSElasticBeanstalkWebTier"),
            managed_policy_arn("AWSElasticBeanstalkWorkerTier"),
            managed_policy_arn("AWSElasticBeanstalkMulticontainerDocker"),
        ];
        managed_policy_arns.extend(props.ec2_role_managed_policy_arns.clone());
        let role = Role::new(
            stack,
            &format!("{}Role", id),
            RoleProps {
                role_name: Some(role_name.clone()),
                assumed_by_service: "ec2.amazonaws.com".to_string(),
                managed_policy_arns,
                inline_statements: vec![],
            },
        )?;
        let profile = InstanceProfile::new(
            stack,
            &format!("{}InstanceProfile", id),
            Some(role_name.clone()),
            &role,
        )?;

        let rails_env = props
            .rails_environment
            .clone()
            .unwrap_or_else(|| "production".to_string());
        let mut environment_variables = props.environment_variables.clone();
        environment_variables.extend([
            EnvironmentVariable::new("DATABASE_HOST", db.endpoint_address.clone()),
            EnvironmentVariable::new("DATABASE_PORT", db.endpoint_port.clone()),
            EnvironmentVariable::new("DATABASE_USER", Value::String(db.username.clone())),
            EnvironmentVariable::new("DATABASE_NAME", Value::String(db.database_name.clone())),
            EnvironmentVariable::new("DATABASE_PASSWORD", db.password.render()),
            EnvironmentVariable::new("RAILS_ENV", Value::String(rails_env)),
        ]);
        if let Some(master_key) = &props.rails_master_key {
            environment_variables.push(EnvironmentVariable::new(
                "RAILS_MASTER_KEY",
                master_key.render(),
            ));
        }

        let environment_name = props.environment_name.clone();
        Environment::new(
            stack,
            &format!("{}EbEnv", id),
            EnvironmentProps {
                application_name: props.application_name,
                environment_name: environment_name.clone(),
                solution_stack_name: props
                    .solution_stack_name
                    .unwrap_or_else(|| DEFAULT_SOLUTION_STACK_NAME.to_string()),
                application_version: props.application_version,
                vpc_id: vpc.vpc_id.clone(),
                private_subnet_ids: join_ids(&vpc.private_subnet_ids),
                public_subnet_ids: join_ids(&vpc.public_subnet_ids),
                security_group_id: security_group.group_id(),
                iam_instance_profile: role_name,
                ec2_key_name: props.ec2_key_name,
                ec2_instance_types: props.ec2_instance_types,
                root_volume_type: props.root_volume_type,
                root_volume_size_gb: props.root_volume_size_gb,
                environment_variables,
                default_process: props.default_process,
                command: props.command,
                ssl_certificate_arns: props.ssl_certificate_arns,
                depends_on: vec![profile.logical_id],
            },
        )?;

        Ok(Self { environment_name })
    }
}

/// Join subnet id tokens into the comma-separated string Beanstalk option
/// settings expect. Literal ids join directly; tokens use `Fn::Join`.
fn join_ids(ids: &[Value]) -> Value {
    if ids.iter().all(|id| id.is_string()) {
        Value::String(
            ids.iter()
                .filter_map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    } else {
        serde_json::json!({ "Fn::Join": [",", ids] })
    }
}

/// Properties for a [`RailsStack`].
#[derive(Debug, Clone)]
pub struct RailsStackProps {
    pub vpc: VpcRef,
    /// Region the stack deploys into, used to pick the starter bundle bucket.
    pub region: String,
    pub database_access: DatabaseAccess,
    /// Defaults to the app name.
    pub application_name: Option<String>,
    /// Defaults to the dash-formatted environment-qualified name.
    pub environment_name: Option<String>,
    /// Defaults to a Secrets Manager reference named
    /// `{eqn camel}SecretKeyBase`.
    pub rails_master_key: Option<SecretValue>,
    pub rails_environment: Option<String>,
    pub solution_stack_name: Option<String>,
    pub ec2_key_name: Option<String>,
    pub ec2_instance_types: Option<Vec<String>>,
    pub root_volume_type: Option<String>,
    pub root_volume_size_gb: Option<u32>,
    pub ec2_role_managed_policy_arns: Vec<String>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub default_process: ProcessSettings,
    pub command: CommandSettings,
    pub ssl_certificate_arns: Option<String>,
}

impl RailsStackProps {
    pub fn new(vpc: impl Into<VpcRef>, region: &str, database_access: DatabaseAccess) -> Self {
        Self {
            vpc: vpc.into(),
            region: region.to_string(),
            database_access,
            application_name: None,
            environment_name: None,
            rails_master_key: None,
            rails_environment: None,
            solution_stack_name: None,
            ec2_key_name: None,
            ec2_instance_types: None,
            root_volume_type: None,
            root_volume_size_gb: None,
            ec2_role_managed_policy_arns: vec![],
            environment_variables: vec![],
            default_process: ProcessSettings::default(),
            command: CommandSettings::default(),
            ssl_certificate_arns: None,
        }
    }
}

/// Elastic Beanstalk application, starter version, environment, and operator
/// session access for a Rails app.
pub struct RailsStack {
    pub stack: Stack,
    pub application: ApplicationHandle,
    pub environment: RailsEnvironment,
}

impl RailsStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: RailsStackProps,
    ) -> StackResult<Self> {
        let mut stack = Stack::new(id, identity)
            .with_description(format!("Elasticbeanstalk setup for {}", id));
        let conventions = stack.conventions().clone();

        let application_name = props
            .application_name
            .unwrap_or_else(|| conventions.identity().name.clone());
        let environment_name = props
            .environment_name
            .unwrap_or_else(|| conventions.eqn_default());

        let vpc = VpcHandle::from(resolve_vpc(lookup, props.vpc)?);

        let application = Application::new(&mut stack, "rails", &application_name)?;
        let application_version = ApplicationVersion::new(
            &mut stack,
            "railsAppVer",
            &application,
            starter_source_bundle(&props.region),
        )?;

        let rails_master_key = props.rails_master_key.unwrap_or_else(|| {
            let secret_key = format!("{}SecretKeyBase", conventions.eqn(NameFormat::Camel));
            SecretValue::secrets_manager_json(secret_key.clone(), secret_key)
        });

        let environment = RailsEnvironment::new(
            &mut stack,
            "railsEnv",
            &vpc,
            RailsEnvironmentProps {
                application_name: application_name.clone(),
                environment_name: environment_name.clone(),
                database_access: props.database_access,
                rails_master_key: Some(rails_master_key),
                rails_environment: props.rails_environment,
                solution_stack_name: props.solution_stack_name,
                application_version,
                ec2_key_name: props.ec2_key_name,
                ec2_instance_types: props
                    .ec2_instance_types
                    .unwrap_or_else(|| vec!["t3.micro".to_string()]),
                root_volume_type: Some(
                    props.root_volume_type.unwrap_or_else(|| "gp2".to_string()),
                ),
                root_volume_size_gb: Some(props.root_volume_size_gb.unwrap_or(50)),
                ec2_role_managed_policy_arns: {
                    // Session access needs the SSM agent permissions.
                    let mut arns = vec![ssm_managed_instance_policy()];
                    arns.extend(props.ec2_role_managed_policy_arns);
                    arns
                },
                environment_variables: props.environment_variables,
                default_process: props.default_process,
                command: props.command,
                ssl_certificate_arns: props.ssl_certificate_arns,
            },
        )?;

        SessionAccess::new(
            &mut stack,
            "sessionAccess",
            SessionAccessProps {
                name: Some(conventions.eqn(NameFormat::Camel)),
                ec2_instance_tag: "elasticbeanstalk:environment-name".to_string(),
                ec2_instance_tag_value: environment_name,
            },
        )?;

        Ok(Self {
            stack,
            application,
            environment,
        })
    }
}
