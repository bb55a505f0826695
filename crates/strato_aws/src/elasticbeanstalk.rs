//! Elastic Beanstalk applications, versions and environments.
//!
//! Environments are configured entirely through option settings; see
//! <https://docs.aws.amazon.com/elasticbeanstalk/latest/dg/command-options-general.html>.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

/// Handle to an Elastic Beanstalk application.
#[derive(Debug, Clone)]
pub struct ApplicationHandle {
    pub logical_id: String,
    pub application_name: String,
}

pub struct Application;

impl Application {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        application_name: &str,
    ) -> CoreResult<ApplicationHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::ElasticBeanstalk::Application")
                .not_taggable()
                .prop("ApplicationName", json!(application_name)),
        )?;
        Ok(ApplicationHandle {
            logical_id: id.to_string(),
            application_name: application_name.to_string(),
        })
    }
}

/// S3 location of an application source bundle.
#[derive(Debug, Clone)]
pub struct SourceBundle {
    pub s3_bucket: String,
    pub s3_key: String,
}

/// Handle to an application version. `Ref` yields the version label.
#[derive(Debug, Clone)]
pub struct ApplicationVersionHandle {
    pub logical_id: String,
}

impl ApplicationVersionHandle {
    pub fn version_label(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct ApplicationVersion;

impl ApplicationVersion {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        application: &ApplicationHandle,
        bundle: SourceBundle,
    ) -> CoreResult<ApplicationVersionHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::ElasticBeanstalk::ApplicationVersion")
                .not_taggable()
                .depends_on(&application.logical_id)
                .prop("ApplicationName", json!(application.application_name))
                .prop(
                    "SourceBundle",
                    json!({ "S3Bucket": bundle.s3_bucket, "S3Key": bundle.s3_key }),
                ),
        )?;
        Ok(ApplicationVersionHandle {
            logical_id: id.to_string(),
        })
    }
}

/// Environment variable surfaced to the application processes.
#[derive(Debug, Clone)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: Value,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Health check settings for the default process.
#[derive(Debug, Clone, Default)]
pub struct ProcessSettings {
    pub health_check_interval: Option<u32>,
    pub health_check_path: Option<String>,
    pub health_check_timeout: Option<u32>,
    pub healthy_threshold_count: Option<u32>,
}

/// Deployment command settings.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub deployment_policy: String,
    pub ignore_health_check: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            deployment_policy: "Rolling".to_string(),
            ignore_health_check: false,
        }
    }
}

/// Properties for a load-balanced environment inside a VPC.
#[derive(Debug, Clone)]
pub struct EnvironmentProps {
    pub application_name: String,
    pub environment_name: String,
    pub solution_stack_name: String,
    pub application_version: ApplicationVersionHandle,
    pub vpc_id: Value,
    pub private_subnet_ids: Value,
    pub public_subnet_ids: Value,
    pub security_group_id: Value,
    pub iam_instance_profile: String,
    pub ec2_key_name: Option<String>,
    pub ec2_instance_types: Vec<String>,
    pub root_volume_type: Option<String>,
    pub root_volume_size_gb: Option<u32>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub default_process: ProcessSettings,
    pub command: CommandSettings,
    pub ssl_certificate_arns: Option<String>,
    /// Extra dependencies, typically the instance profile.
    pub depends_on: Vec<String>,
}

fn setting(namespace: &str, option_name: &str, value: Value) -> Value {
    json!({ "Namespace": namespace, "OptionName": option_name, "Value": value })
}

pub struct Environment;

impl Environment {
    // Tags set on the environment do not reach the EC2 instances, load
    // balancer or security groups that Beanstalk manages itself.
    pub fn new(stack: &mut Stack, id: &str, props: EnvironmentProps) -> CoreResult<()> {
        let launch = "aws:autoscaling:launchconfiguration";
        let mut settings: Vec<Value> = Vec::new();

        if let Some(key_name) = &props.ec2_key_name {
            settings.push(setting(launch, "EC2KeyName", json!(key_name)));
        }
        if let Some(volume_type) = &props.root_volume_type {
            settings.push(setting(launch, "RootVolumeType", json!(volume_type)));
        }
        if let Some(size) = props.root_volume_size_gb {
            settings.push(setting(launch, "RootVolumeSize", json!(size.to_string())));
        }
        if !props.ec2_instance_types.is_empty() {
            settings.push(setting(
                "aws:ec2:instances",
                "InstanceTypes",
                json!(props.ec2_instance_types.join(",")),
            ));
        }
        for var in &props.environment_variables {
            settings.push(setting(
                "aws:elasticbeanstalk:application:environment",
                &var.name,
                var.value.clone(),
            ));
        }

        let process = "aws:elasticbeanstalk:environment:process:default";
        if let Some(interval) = props.default_process.health_check_interval {
            settings.push(setting(process, "HealthCheckInterval", json!(interval.to_string())));
        }
        if let Some(path) = &props.default_process.health_check_path {
            settings.push(setting(process, "HealthCheckPath", json!(path)));
        }
        if let Some(timeout) = props.default_process.health_check_timeout {
            settings.push(setting(process, "HealthCheckTimeout", json!(timeout.to_string())));
        }
        if let Some(count) = props.default_process.healthy_threshold_count {
            settings.push(setting(process, "HealthyThresholdCount", json!(count.to_string())));
        }

        let command = "aws:elasticbeanstalk:command";
        settings.push(setting(
            command,
            "DeploymentPolicy",
            json!(props.command.deployment_policy),
        ));
        settings.push(setting(
            command,
            "IgnoreHealthCheck",
            json!(props.command.ignore_health_check.to_string()),
        ));

        if let Some(cert_arns) = &props.ssl_certificate_arns {
            let listener = "aws:elbv2:listener:443";
            settings.push(setting(listener, "DefaultProcess", json!("default")));
            settings.push(setting(listener, "ListenerEnabled", json!("true")));
            settings.push(setting(listener, "Protocol", json!("HTTPS")));
            settings.push(setting(listener, "SSLCertificateArns", json!(cert_arns)));
        }

        settings.push(setting(launch, "SecurityGroups", props.security_group_id.clone()));
        settings.push(setting(
            launch,
            "IamInstanceProfile",
            json!(props.iam_instance_profile),
        ));
        // Enhanced health reporting requires the AWSElasticBeanstalkEnhancedHealth role.
        settings.push(setting(
            "aws:elasticbeanstalk:healthreporting:system",
            "SystemType",
            json!("enhanced"),
        ));
        settings.push(setting("aws:ec2:vpc", "VPCId", props.vpc_id.clone()));
        settings.push(setting("aws:ec2:vpc", "Subnets", props.private_subnet_ids.clone()));
        settings.push(setting("aws:ec2:vpc", "ELBSubnets", props.public_subnet_ids.clone()));
        settings.push(setting(
            "aws:elasticbeanstalk:environment",
            "LoadBalancerType",
            json!("application"),
        ));

        let mut resource = Resource::new("AWS::ElasticBeanstalk::Environment")
            .not_taggable()
            .depends_on(&props.application_version.logical_id)
            .prop("ApplicationName", json!(props.application_name))
            .prop("EnvironmentName", json!(props.environment_name))
            .prop("SolutionStackName", json!(props.solution_stack_name))
            .prop("OptionSettings", json!(settings))
            .prop("VersionLabel", props.application_version.version_label());
        for dependency in &props.depends_on {
            resource = resource.depends_on(dependency);
        }
        stack.add_resource(id, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    fn stack() -> Stack {
        Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        )
    }

    fn base_props(version: ApplicationVersionHandle) -> EnvironmentProps {
        EnvironmentProps {
            application_name: "app".to_string(),
            environment_name: "app-dev".to_string(),
            solution_stack_name: "64bit Amazon Linux 2 v3.2.2 running Ruby 2.7".to_string(),
            application_version: version,
            vpc_id: json!("vpc-123"),
            private_subnet_ids: json!("subnet-a,subnet-b"),
            public_subnet_ids: json!("subnet-c,subnet-d"),
            security_group_id: json!("sg-123"),
            iam_instance_profile: "app-dev-ec2-role".to_string(),
            ec2_key_name: None,
            ec2_instance_types: vec!["t3.small".to_string(), "t3.medium".to_string()],
            root_volume_type: None,
            root_volume_size_gb: None,
            environment_variables: vec![EnvironmentVariable::new("RAILS_ENV", json!("production"))],
            default_process: ProcessSettings::default(),
            command: CommandSettings::default(),
            ssl_certificate_arns: None,
            depends_on: vec![],
        }
    }

    fn settings_of<'a>(environment: &'a Value) -> &'a Vec<Value> {
        environment["Properties"]["OptionSettings"].as_array().unwrap()
    }

    fn find<'a>(settings: &'a [Value], namespace: &str, option: &str) -> Option<&'a Value> {
        settings
            .iter()
            .find(|s| s["Namespace"] == namespace && s["OptionName"] == option)
            .map(|s| &s["Value"])
    }

    #[test]
    fn test_environment_option_settings() {
        let mut stack = stack();
        let app = Application::new(&mut stack, "app", "app").unwrap();
        let version = ApplicationVersion::new(
            &mut stack,
            "appVersion",
            &app,
            SourceBundle {
                s3_bucket: "rails-cdk".to_string(),
                s3_key: "starterApp.zip".to_string(),
            },
        )
        .unwrap();
        Environment::new(&mut stack, "environment", base_props(version)).unwrap();

        let template = stack.synth();
        let environment = template.resource("environment").unwrap();
        let settings = settings_of(environment);

        assert_eq!(
            find(settings, "aws:ec2:instances", "InstanceTypes").unwrap(),
            "t3.small,t3.medium"
        );
        assert_eq!(
            find(settings, "aws:elasticbeanstalk:application:environment", "RAILS_ENV").unwrap(),
            "production"
        );
        assert_eq!(
            find(settings, "aws:elasticbeanstalk:command", "DeploymentPolicy").unwrap(),
            "Rolling"
        );
        assert_eq!(
            find(settings, "aws:elasticbeanstalk:command", "IgnoreHealthCheck").unwrap(),
            "false"
        );
        assert_eq!(
            find(settings, "aws:elasticbeanstalk:healthreporting:system", "SystemType").unwrap(),
            "enhanced"
        );
        assert_eq!(
            find(settings, "aws:elasticbeanstalk:environment", "LoadBalancerType").unwrap(),
            "application"
        );
        assert!(find(settings, "aws:elbv2:listener:443", "Protocol").is_none());
        assert_eq!(environment["DependsOn"], json!(["appVersion"]));
    }

    #[test]
    fn test_ssl_settings_enable_https_listener() {
        let mut stack = stack();
        let app = Application::new(&mut stack, "app", "app").unwrap();
        let version = ApplicationVersion::new(
            &mut stack,
            "appVersion",
            &app,
            SourceBundle {
                s3_bucket: "rails-cdk".to_string(),
                s3_key: "starterApp.zip".to_string(),
            },
        )
        .unwrap();
        let mut props = base_props(version);
        props.ssl_certificate_arns = Some("arn:aws:acm:us-east-1:1:certificate/abc".to_string());
        Environment::new(&mut stack, "environment", props).unwrap();

        let template = stack.synth();
        let environment = template.resource("environment").unwrap();
        let settings = settings_of(environment);
        assert_eq!(find(settings, "aws:elbv2:listener:443", "Protocol").unwrap(), "HTTPS");
        assert_eq!(
            find(settings, "aws:elbv2:listener:443", "DefaultProcess").unwrap(),
            "default"
        );
    }

    #[test]
    fn test_untagged_because_beanstalk_manages_children() {
        let mut stack = stack();
        Application::new(&mut stack, "app", "app").unwrap();
        let template = stack.synth();
        let application = template.resource("app").unwrap();
        assert!(application["Properties"].get("Tags").is_none());
    }
}
