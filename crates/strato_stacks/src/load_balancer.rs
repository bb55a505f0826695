//! A conventionally named application load balancer with HTTP and optional
//! HTTPS listeners.

use serde_json::{json, Value};

use strato_aws::acm::{DnsValidatedCertificate, DnsValidatedCertificateProps};
use strato_aws::ec2::{SecurityGroup, SecurityGroupHandle, SecurityGroupProps, VpcHandle};
use strato_aws::elbv2::{
    ApplicationLoadBalancer, FixedResponse, Listener, ListenerHandle, ListenerProps,
    LoadBalancerHandle, LoadBalancerProps,
};
use strato_aws::route53::AliasRecordProps;
use strato_core::{ContextLookup, Stack};

use crate::error::StackResult;

/// Properties for a simple load balancer.
#[derive(Debug, Clone, Default)]
pub struct SimpleLoadBalancerProps {
    /// Certificate ARNs enabling the HTTPS listener.
    pub https_certificate_arns: Vec<Value>,
}

/// An internet-facing ALB with an HTTP listener, an HTTPS listener when
/// certificates are supplied, and a fixed 200 default response on each.
pub struct SimpleLoadBalancer {
    pub alb: LoadBalancerHandle,
    pub security_group: SecurityGroupHandle,
    pub http_listener: ListenerHandle,
    pub https_listener: Option<ListenerHandle>,
}

impl SimpleLoadBalancer {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        props: SimpleLoadBalancerProps,
    ) -> StackResult<Self> {
        let eqn = stack.conventions().eqn_default();

        let security_group = SecurityGroup::new(
            stack,
            &format!("{}SecurityGroup", id),
            vpc,
            SecurityGroupProps {
                group_name: Some(format!("{}-alb-sg", eqn)),
                allow_all_outbound: true,
                ..Default::default()
            },
        )?;

        let alb = ApplicationLoadBalancer::new(
            stack,
            id,
            vpc,
            &security_group,
            LoadBalancerProps {
                name: Some(format!("{}-alb", eqn)),
                internet_facing: true,
                http2_enabled: true,
            },
        )?;

        let http_listener = Listener::new(
            stack,
            &format!("{}HttpListener", id),
            &alb,
            ListenerProps {
                port: 80,
                certificate_arns: vec![],
                default_response: FixedResponse::it_works(),
            },
        )?;

        let https_listener = if props.https_certificate_arns.is_empty() {
            None
        } else {
            Some(Listener::new(
                stack,
                &format!("{}HttpsListener", id),
                &alb,
                ListenerProps {
                    port: 443,
                    certificate_arns: props.https_certificate_arns,
                    default_response: FixedResponse::it_works(),
                },
            )?)
        };

        Ok(Self {
            alb,
            security_group,
            http_listener,
            https_listener,
        })
    }

    /// Listeners in declaration order, for registering services against.
    pub fn listeners(&self) -> Vec<&ListenerHandle> {
        let mut listeners = vec![&self.http_listener];
        if let Some(https) = &self.https_listener {
            listeners.push(https);
        }
        listeners
    }

    /// Variant serving `*.{base_domain}`. Uses the given certificate ARN, or
    /// issues a DNS-validated wildcard certificate against the looked-up
    /// hosted zone, and points a wildcard alias record at the balancer.
    pub fn with_wildcard_domain(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        lookup: &dyn ContextLookup,
        base_domain: &str,
        certificate_arn: Option<String>,
    ) -> StackResult<Self> {
        let hosted_zone = lookup.lookup_hosted_zone(base_domain)?;
        let wildcard = format!("*.{}", base_domain);

        let certificate_arn = match certificate_arn {
            Some(arn) => json!(arn),
            None => {
                let certificate = DnsValidatedCertificate::new(
                    stack,
                    &format!("{}Certificate", id),
                    DnsValidatedCertificateProps {
                        domain_name: wildcard.clone(),
                        subject_alternative_names: vec![],
                        hosted_zone: hosted_zone.clone(),
                    },
                )?;
                certificate.arn()
            }
        };

        let load_balancer = Self::new(
            stack,
            id,
            vpc,
            SimpleLoadBalancerProps {
                https_certificate_arns: vec![certificate_arn],
            },
        )?;

        strato_aws::route53::AliasRecord::new(
            stack,
            &format!("{}AliasRecord", id),
            AliasRecordProps {
                record_name: wildcard,
                hosted_zone_id: hosted_zone.hosted_zone_id,
                target_dns_name: load_balancer.alb.dns_name(),
                target_hosted_zone_id: load_balancer.alb.canonical_hosted_zone_id(),
            },
        )?;

        Ok(load_balancer)
    }
}
