//! Application load balancers, listeners and target groups.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

use crate::ec2::{SecurityGroupHandle, VpcHandle};

/// Properties for an application load balancer.
#[derive(Debug, Clone, Default)]
pub struct LoadBalancerProps {
    pub name: Option<String>,
    pub internet_facing: bool,
    pub http2_enabled: bool,
}

/// Handle to an application load balancer.
#[derive(Debug, Clone)]
pub struct LoadBalancerHandle {
    pub logical_id: String,
}

impl LoadBalancerHandle {
    pub fn arn(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }

    pub fn dns_name(&self) -> Value {
        Stack::get_att(&self.logical_id, "DNSName")
    }

    pub fn canonical_hosted_zone_id(&self) -> Value {
        Stack::get_att(&self.logical_id, "CanonicalHostedZoneID")
    }
}

pub struct ApplicationLoadBalancer;

impl ApplicationLoadBalancer {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        security_group: &SecurityGroupHandle,
        props: LoadBalancerProps,
    ) -> CoreResult<LoadBalancerHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
                .prop("Name", props.name.map(Value::String).unwrap_or(Value::Null))
                .prop("Type", json!("application"))
                .prop(
                    "Scheme",
                    json!(if props.internet_facing {
                        "internet-facing"
                    } else {
                        "internal"
                    }),
                )
                .prop("Subnets", json!(vpc.public_subnet_ids))
                .prop("SecurityGroups", json!([security_group.group_id()]))
                .prop(
                    "LoadBalancerAttributes",
                    json!([{
                        "Key": "routing.http2.enabled",
                        "Value": props.http2_enabled.to_string(),
                    }]),
                ),
        )?;
        Ok(LoadBalancerHandle {
            logical_id: id.to_string(),
        })
    }
}

/// Fixed response served when no listener rule matches.
#[derive(Debug, Clone)]
pub struct FixedResponse {
    pub content_type: String,
    pub message_body: String,
    pub status_code: String,
}

impl FixedResponse {
    /// The default handler that just renders a 200.
    pub fn it_works() -> Self {
        Self {
            content_type: "text/plain".to_string(),
            message_body: "It Works!".to_string(),
            status_code: "200".to_string(),
        }
    }
}

/// Properties for a listener.
#[derive(Debug, Clone)]
pub struct ListenerProps {
    pub port: i64,
    pub certificate_arns: Vec<Value>,
    pub default_response: FixedResponse,
}

/// Handle to a listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    pub logical_id: String,
}

impl ListenerHandle {
    pub fn arn(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct Listener;

impl Listener {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        load_balancer: &LoadBalancerHandle,
        props: ListenerProps,
    ) -> CoreResult<ListenerHandle> {
        let https = !props.certificate_arns.is_empty();
        let mut resource = Resource::new("AWS::ElasticLoadBalancingV2::Listener")
            .not_taggable()
            .prop("LoadBalancerArn", load_balancer.arn())
            .prop("Port", json!(props.port))
            .prop("Protocol", json!(if https { "HTTPS" } else { "HTTP" }))
            .prop(
                "DefaultActions",
                json!([{
                    "Type": "fixed-response",
                    "FixedResponseConfig": {
                        "ContentType": props.default_response.content_type,
                        "MessageBody": props.default_response.message_body,
                        "StatusCode": props.default_response.status_code,
                    }
                }]),
            );
        if https {
            let certificates: Vec<Value> = props
                .certificate_arns
                .iter()
                .map(|arn| json!({ "CertificateArn": arn }))
                .collect();
            resource = resource.prop("Certificates", json!(certificates));
        }
        stack.add_resource(id, resource)?;
        Ok(ListenerHandle {
            logical_id: id.to_string(),
        })
    }
}

/// Health check settings for a target group.
#[derive(Debug, Clone, Default)]
pub struct HealthCheck {
    pub path: Option<String>,
    pub interval_seconds: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub healthy_threshold_count: Option<i64>,
}

/// Properties for a target group routed from a listener rule.
#[derive(Debug, Clone)]
pub struct TargetGroupProps {
    pub target_group_name: Option<String>,
    pub port: i64,
    pub host_header: String,
    pub priority: i64,
    pub health_check: HealthCheck,
}

/// Handle to a target group.
#[derive(Debug, Clone)]
pub struct TargetGroupHandle {
    pub logical_id: String,
}

impl TargetGroupHandle {
    pub fn arn(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct TargetGroup;

impl TargetGroup {
    /// Declare a target group plus the listener rule routing a host header to
    /// it.
    pub fn routed_from(
        stack: &mut Stack,
        id: &str,
        listener: &ListenerHandle,
        vpc: &VpcHandle,
        props: TargetGroupProps,
    ) -> CoreResult<TargetGroupHandle> {
        let mut resource = Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
            .prop(
                "Name",
                props
                    .target_group_name
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            )
            .prop("Port", json!(props.port))
            .prop("Protocol", json!("HTTP"))
            .prop("TargetType", json!("instance"))
            .prop("VpcId", vpc.vpc_id.clone());

        let health = &props.health_check;
        if let Some(path) = &health.path {
            resource = resource.prop("HealthCheckPath", json!(path));
        }
        if let Some(interval) = health.interval_seconds {
            resource = resource.prop("HealthCheckIntervalSeconds", json!(interval));
        }
        if let Some(timeout) = health.timeout_seconds {
            resource = resource.prop("HealthCheckTimeoutSeconds", json!(timeout));
        }
        if let Some(threshold) = health.healthy_threshold_count {
            resource = resource.prop("HealthyThresholdCount", json!(threshold));
        }
        stack.add_resource(id, resource)?;
        let handle = TargetGroupHandle {
            logical_id: id.to_string(),
        };

        stack.add_resource(
            &format!("{}Rule", id),
            Resource::new("AWS::ElasticLoadBalancingV2::ListenerRule")
                .not_taggable()
                .prop("ListenerArn", listener.arn())
                .prop("Priority", json!(props.priority))
                .prop(
                    "Conditions",
                    json!([{
                        "Field": "host-header",
                        "HostHeaderConfig": { "Values": [props.host_header] },
                    }]),
                )
                .prop(
                    "Actions",
                    json!([{ "Type": "forward", "TargetGroupArn": handle.arn() }]),
                ),
        )?;

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::{AppIdentity, VpcAttributes};

    fn vpc() -> VpcHandle {
        VpcHandle::from(VpcAttributes {
            vpc_id: "vpc-1".to_string(),
            cidr_block: None,
            availability_zones: vec![],
            public_subnet_ids: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            private_subnet_ids: vec![],
        })
    }

    fn stack() -> Stack {
        Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        )
    }

    #[test]
    fn test_http_and_https_listeners() {
        let mut stack = stack();
        let vpc = vpc();
        let sg = crate::ec2::SecurityGroup::new(
            &mut stack,
            "albSg",
            &vpc,
            Default::default(),
        )
        .unwrap();
        let alb = ApplicationLoadBalancer::new(
            &mut stack,
            "alb",
            &vpc,
            &sg,
            LoadBalancerProps {
                name: Some("app-dev-alb".to_string()),
                internet_facing: true,
                http2_enabled: true,
            },
        )
        .unwrap();

        Listener::new(
            &mut stack,
            "httpListener",
            &alb,
            ListenerProps {
                port: 80,
                certificate_arns: vec![],
                default_response: FixedResponse::it_works(),
            },
        )
        .unwrap();
        Listener::new(
            &mut stack,
            "httpsListener",
            &alb,
            ListenerProps {
                port: 443,
                certificate_arns: vec![json!("arn:aws:acm:us-east-1:123:certificate/x")],
                default_response: FixedResponse::it_works(),
            },
        )
        .unwrap();

        let template = stack.synth();
        let http = template.resource("httpListener").unwrap();
        assert_eq!(http["Properties"]["Protocol"], "HTTP");
        assert_eq!(
            http["Properties"]["DefaultActions"][0]["FixedResponseConfig"]["MessageBody"],
            "It Works!"
        );
        let https = template.resource("httpsListener").unwrap();
        assert_eq!(https["Properties"]["Protocol"], "HTTPS");
        assert!(https["Properties"]["Certificates"][0]["CertificateArn"].is_string());
    }

    #[test]
    fn test_target_group_and_rule() {
        let mut stack = stack();
        let vpc = vpc();
        let listener = ListenerHandle {
            logical_id: "httpListener".to_string(),
        };
        TargetGroup::routed_from(
            &mut stack,
            "apiTargets",
            &listener,
            &vpc,
            TargetGroupProps {
                target_group_name: None,
                port: 80,
                host_header: "api.example.com".to_string(),
                priority: 100,
                health_check: HealthCheck {
                    path: Some("/health".to_string()),
                    ..Default::default()
                },
            },
        )
        .unwrap();

        let template = stack.synth();
        assert_eq!(
            template.resource("apiTargets").unwrap()["Properties"]["HealthCheckPath"],
            "/health"
        );
        let rule = template.resource("apiTargetsRule").unwrap();
        assert_eq!(rule["Properties"]["Priority"], 100);
        assert_eq!(
            rule["Properties"]["Conditions"][0]["HostHeaderConfig"]["Values"][0],
            "api.example.com"
        );
    }
}
