//! CloudFront distributions for static sites.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

/// Properties for a web distribution fronting an S3 origin.
#[derive(Debug, Clone)]
pub struct DistributionProps {
    /// Alternate domain names served by the distribution.
    pub aliases: Vec<String>,
    pub acm_certificate_arn: Value,
    /// TLS policy for viewer connections.
    pub minimum_protocol_version: String,
    /// Domain name of the S3 origin bucket.
    pub origin_domain_name: Value,
}

impl DistributionProps {
    pub fn new(aliases: Vec<String>, acm_certificate_arn: Value, origin_domain_name: Value) -> Self {
        Self {
            aliases,
            acm_certificate_arn,
            minimum_protocol_version: "TLSv1.2_2018".to_string(),
            origin_domain_name,
        }
    }
}

/// Handle to a CloudFront distribution.
#[derive(Debug, Clone)]
pub struct DistributionHandle {
    pub logical_id: String,
}

impl DistributionHandle {
    pub fn domain_name(&self) -> Value {
        Stack::get_att(&self.logical_id, "DomainName")
    }
}

pub struct Distribution;

impl Distribution {
    pub fn new(stack: &mut Stack, id: &str, props: DistributionProps) -> CoreResult<DistributionHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::CloudFront::Distribution").prop(
                "DistributionConfig",
                json!({
                    "Enabled": true,
                    "Aliases": props.aliases,
                    "DefaultRootObject": "index.html",
                    "Origins": [{
                        "Id": "s3Origin",
                        "DomainName": props.origin_domain_name,
                        "S3OriginConfig": {},
                    }],
                    "DefaultCacheBehavior": {
                        "TargetOriginId": "s3Origin",
                        "ViewerProtocolPolicy": "redirect-to-https",
                        "ForwardedValues": { "QueryString": false },
                    },
                    "ViewerCertificate": {
                        "AcmCertificateArn": props.acm_certificate_arn,
                        "SslSupportMethod": "sni-only",
                        "MinimumProtocolVersion": props.minimum_protocol_version,
                    },
                }),
            ),
        )?;
        Ok(DistributionHandle {
            logical_id: id.to_string(),
        })
    }
}
