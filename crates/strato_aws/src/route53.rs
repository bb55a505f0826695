//! Route 53 record sets.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

/// Fixed hosted zone id shared by all CloudFront distributions.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Properties for an alias A record.
#[derive(Debug, Clone)]
pub struct AliasRecordProps {
    pub record_name: String,
    pub hosted_zone_id: String,
    pub target_dns_name: Value,
    pub target_hosted_zone_id: Value,
}

pub struct AliasRecord;

impl AliasRecord {
    pub fn new(stack: &mut Stack, id: &str, props: AliasRecordProps) -> CoreResult<()> {
        stack.add_resource(
            id,
            Resource::new("AWS::Route53::RecordSet")
                .not_taggable()
                .prop("HostedZoneId", json!(props.hosted_zone_id))
                .prop("Name", json!(props.record_name))
                .prop("Type", json!("A"))
                .prop(
                    "AliasTarget",
                    json!({
                        "DNSName": props.target_dns_name,
                        "HostedZoneId": props.target_hosted_zone_id,
                    }),
                ),
        )
    }

    /// Alias record pointing at a CloudFront distribution.
    pub fn to_cloudfront(
        stack: &mut Stack,
        id: &str,
        record_name: &str,
        hosted_zone_id: &str,
        distribution_domain_name: Value,
    ) -> CoreResult<()> {
        Self::new(
            stack,
            id,
            AliasRecordProps {
                record_name: record_name.to_string(),
                hosted_zone_id: hosted_zone_id.to_string(),
                target_dns_name: distribution_domain_name,
                target_hosted_zone_id: json!(CLOUDFRONT_HOSTED_ZONE_ID),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_cloudfront_alias_record() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        AliasRecord::to_cloudfront(
            &mut stack,
            "siteAliasRecord",
            "www.example.com",
            "Z123",
            json!("d111.cloudfront.net"),
        )
        .unwrap();

        let template = stack.synth();
        let record = template.resource("siteAliasRecord").unwrap();
        assert_eq!(record["Properties"]["Type"], "A");
        assert_eq!(
            record["Properties"]["AliasTarget"]["HostedZoneId"],
            CLOUDFRONT_HOSTED_ZONE_ID
        );
    }
}
