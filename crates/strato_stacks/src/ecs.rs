//! ECS cluster stack with a conventional load balancer and session access.

use strato_aws::ec2::{PortRange, SecurityGroup, SecurityGroupHandle, SecurityGroupProps, VpcHandle};
use strato_aws::ecs::{AutoScalingGroup, AutoScalingGroupProps, Cluster, ClusterHandle};
use strato_aws::elbv2::{HealthCheck, ListenerHandle, TargetGroup, TargetGroupHandle, TargetGroupProps};
use strato_aws::iam::{ssm_managed_instance_policy, InstanceProfile, Role, RoleProps};
use strato_core::{resolve_vpc, AppIdentity, ContextLookup, NameFormat, Stack, VpcRef};

use crate::error::{StackError, StackResult};
use crate::load_balancer::{SimpleLoadBalancer, SimpleLoadBalancerProps};
use crate::session_access::{SessionAccess, SessionAccessProps};

/// Properties for a [`SimpleCluster`].
#[derive(Debug, Clone)]
pub struct SimpleClusterProps {
    pub cluster_name: String,
    pub instance_type: String,
    pub instance_managed_policy_arns: Vec<String>,
}

impl SimpleClusterProps {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            instance_type: "t2.micro".to_string(),
            instance_managed_policy_arns: vec![],
        }
    }
}

/// An ECS cluster backed by a single-instance auto scaling group, with its own
/// security group and instance role.
pub struct SimpleCluster {
    pub cluster: ClusterHandle,
    pub security_group: SecurityGroupHandle,
}

impl SimpleCluster {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        props: SimpleClusterProps,
    ) -> StackResult<Self> {
        let cluster_name = props.cluster_name;
        let cluster = Cluster::new(stack, id, &cluster_name)?;

        let security_group = SecurityGroup::new(
            stack,
            &format!("{}SecurityGroup", id),
            vpc,
            SecurityGroupProps {
                group_name: Some(format!("{}-ecs-sg", cluster_name)),
                ..Default::default()
            },
        )?;

        let role = Role::new(
            stack,
            &format!("{}InstanceRole", id),
            RoleProps {
                role_name: Some(format!("{}ECSInstanceRole", cluster_name)),
                assumed_by_service: "ec2.amazonaws.com".to_string(),
                managed_policy_arns: props.instance_managed_policy_arns,
                inline_statements: vec![],
            },
        )?;
        let profile = InstanceProfile::new(stack, &format!("{}InstanceProfile", id), None, &role)?;

        AutoScalingGroup::new(
            stack,
            &format!("{}AutoScalingGroup", id),
            vpc,
            &security_group,
            &profile,
            AutoScalingGroupProps {
                name: Some(format!("{}-default-asg", cluster_name)),
                instance_type: props.instance_type,
                desired_capacity: 1,
                cluster_name,
            },
        )?;

        Ok(Self {
            cluster,
            security_group,
        })
    }
}

/// Properties for an [`EcsStack`].
#[derive(Debug, Clone)]
pub struct EcsStackProps {
    pub vpc: VpcRef,
    pub instance_type: Option<String>,
    /// Serve `*.{wildcard_domain}` over HTTPS from the load balancer.
    pub wildcard_domain: Option<String>,
    pub wildcard_https_certificate_arn: Option<String>,
}

impl EcsStackProps {
    pub fn new(vpc: impl Into<VpcRef>) -> Self {
        Self {
            vpc: vpc.into(),
            instance_type: None,
            wildcard_domain: None,
            wildcard_https_certificate_arn: None,
        }
    }
}

/// A cluster, a load balancer wired to it, and session access for operators.
pub struct EcsStack {
    pub stack: Stack,
    pub vpc: VpcHandle,
    pub cluster: SimpleCluster,
    pub load_balancer: SimpleLoadBalancer,
}

impl EcsStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: EcsStackProps,
    ) -> StackResult<Self> {
        let mut stack = Stack::new(id, identity);
        let vpc = VpcHandle::from(resolve_vpc(lookup, props.vpc)?);

        let eqn = stack.conventions().eqn_default();
        let mut cluster_props = SimpleClusterProps::new(eqn);
        cluster_props.instance_managed_policy_arns = vec![ssm_managed_instance_policy()];
        if let Some(instance_type) = props.instance_type {
            cluster_props.instance_type = instance_type;
        }
        let cluster = SimpleCluster::new(&mut stack, "cluster", &vpc, cluster_props)?;

        let load_balancer = match &props.wildcard_domain {
            Some(domain) => SimpleLoadBalancer::with_wildcard_domain(
                &mut stack,
                "loadBalancer",
                &vpc,
                lookup,
                domain,
                props.wildcard_https_certificate_arn.clone(),
            )?,
            None => SimpleLoadBalancer::new(
                &mut stack,
                "loadBalancer",
                &vpc,
                SimpleLoadBalancerProps::default(),
            )?,
        };

        SecurityGroup::allow_from(
            &mut stack,
            "loadBalancerToCluster",
            &load_balancer.security_group,
            &cluster.security_group,
            PortRange::all_tcp(),
        )?;

        let name = stack.conventions().eqn(NameFormat::Camel);
        let stack_name = stack.name().to_string();
        SessionAccess::new(
            &mut stack,
            "sessionAccess",
            SessionAccessProps {
                name: Some(name),
                ec2_instance_tag: "aws:cloudformation:stack-name".to_string(),
                ec2_instance_tag_value: stack_name,
            },
        )?;

        Ok(Self {
            stack,
            vpc,
            cluster,
            load_balancer,
        })
    }
}

/// A service to route traffic to from the load balancer's listeners.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub container_name: String,
    /// Host port of the service's default container, if it maps one.
    pub container_port: Option<i64>,
    pub host_header: String,
    pub priority: Option<i64>,
    pub target_group_name: Option<String>,
    pub health_check: HealthCheck,
}

/// Register a service with every listener by declaring a target group and a
/// host-header listener rule per listener.
pub fn register_service_to_listeners(
    stack: &mut Stack,
    vpc: &VpcHandle,
    listeners: &[&ListenerHandle],
    options: &ServiceOptions,
) -> StackResult<Vec<TargetGroupHandle>> {
    let container_port = options.container_port.ok_or_else(|| {
        StackError::MissingConfiguration(
            "Default container doesn't have port mapping".to_string(),
        )
    })?;

    let container: String = options
        .container_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    let mut target_groups = Vec::new();
    for listener in listeners {
        let target_group = TargetGroup::routed_from(
            stack,
            &format!(
                "{}TargetGroup{}{}",
                listener.logical_id, container, container_port
            ),
            listener,
            vpc,
            TargetGroupProps {
                target_group_name: options.target_group_name.clone(),
                port: 80,
                host_header: options.host_header.clone(),
                priority: options.priority.unwrap_or(100),
                health_check: options.health_check.clone(),
            },
        )?;
        target_groups.push(target_group);
    }
    Ok(target_groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::{MockContextLookup, VpcAttributes};

    fn identity() -> AppIdentity {
        AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap()
    }

    fn attributes() -> VpcAttributes {
        VpcAttributes {
            vpc_id: "vpc-1".to_string(),
            cidr_block: None,
            availability_zones: vec![],
            public_subnet_ids: vec!["subnet-a".to_string()],
            private_subnet_ids: vec!["subnet-b".to_string()],
        }
    }

    #[test]
    fn test_ecs_stack_wires_cluster_and_load_balancer() {
        let lookup = MockContextLookup::new();
        let ecs = EcsStack::new(
            "app-dev-ecs",
            identity(),
            &lookup,
            EcsStackProps::new(attributes()),
        )
        .unwrap();

        let template = ecs.stack.synth();
        assert_eq!(
            template.resource("cluster").unwrap()["Properties"]["ClusterName"],
            "app-dev"
        );
        assert_eq!(
            template.resource("clusterSecurityGroup").unwrap()["Properties"]["GroupName"],
            "app-dev-ecs-sg"
        );
        assert_eq!(
            template.resource("clusterInstanceRole").unwrap()["Properties"]["RoleName"],
            "app-devECSInstanceRole"
        );
        assert_eq!(
            template.resource("clusterAutoScalingGroup").unwrap()["Properties"]
                ["AutoScalingGroupName"],
            "app-dev-default-asg"
        );
        let ingress = template.resource("loadBalancerToCluster").unwrap();
        assert_eq!(ingress["Properties"]["ToPort"], 65535);
        assert!(template.resource("sessionAccessGroup").is_some());
    }

    #[test]
    fn test_service_registration_requires_container_port() {
        let lookup = MockContextLookup::new();
        let mut ecs = EcsStack::new(
            "app-dev-ecs",
            identity(),
            &lookup,
            EcsStackProps::new(attributes()),
        )
        .unwrap();

        let options = ServiceOptions {
            container_name: "web".to_string(),
            container_port: None,
            host_header: "app.example.com".to_string(),
            priority: None,
            target_group_name: None,
            health_check: HealthCheck::default(),
        };
        let err = register_service_to_listeners(
            &mut ecs.stack,
            &ecs.vpc,
            &[&ecs.load_balancer.http_listener],
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, StackError::MissingConfiguration(_)));
    }

    #[test]
    fn test_service_registration_declares_target_group_per_listener() {
        let lookup = MockContextLookup::new();
        let mut ecs = EcsStack::new(
            "app-dev-ecs",
            identity(),
            &lookup,
            EcsStackProps::new(attributes()),
        )
        .unwrap();

        let options = ServiceOptions {
            container_name: "web".to_string(),
            container_port: Some(3000),
            host_header: "app.example.com".to_string(),
            priority: None,
            target_group_name: None,
            health_check: HealthCheck::default(),
        };
        let listeners = ecs.load_balancer.listeners();
        let http_listener = listeners[0].clone();
        let target_groups = register_service_to_listeners(
            &mut ecs.stack,
            &ecs.vpc,
            &[&http_listener],
            &options,
        )
        .unwrap();
        assert_eq!(target_groups.len(), 1);

        let template = ecs.stack.synth();
        let rule = template
            .resource("loadBalancerHttpListenerTargetGroupweb3000Rule")
            .unwrap();
        assert_eq!(rule["Properties"]["Priority"], 100);
    }
}
