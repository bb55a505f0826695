//! Single page application hosting on S3, optionally fronted by CloudFront.

use serde_json::{json, Value};

use strato_aws::acm::{DnsValidatedCertificate, DnsValidatedCertificateProps};
use strato_aws::cloudfront::{Distribution, DistributionProps};
use strato_aws::route53::AliasRecord;
use strato_aws::s3::{Bucket, BucketHandle, BucketProps};
use strato_core::{ContextLookup, NameFormat, Output, RemovalPolicy, Stack};

use crate::error::StackResult;

/// A public website bucket serving a single page application.
///
/// The error document is the index document so client-side routes re-render
/// on pushState navigation.
pub struct S3Spa {
    pub bucket: BucketHandle,
}

impl S3Spa {
    pub fn new(stack: &mut Stack, id: &str, bucket_name: &str) -> StackResult<Self> {
        let bucket = Bucket::new(
            stack,
            &format!("{}Bucket", id),
            BucketProps {
                bucket_name: Some(bucket_name.to_string()),
                website_index_document: Some("index.html".to_string()),
                website_error_document: Some("index.html".to_string()),
                public_read_access: true,
                removal_policy: RemovalPolicy::Destroy,
                ..Default::default()
            },
        )?;
        Ok(Self { bucket })
    }

    pub fn website_url(&self) -> Value {
        self.bucket.website_url()
    }
}

/// Properties for a [`CloudfrontSpa`].
#[derive(Debug, Clone)]
pub struct CloudfrontSpaProps {
    /// Subdomain prefix served by the distribution.
    pub sub_domain: Option<String>,
    /// Existing certificate to serve with. When absent a DNS-validated
    /// certificate is issued against the looked-up zone.
    pub certificate_arn: Option<String>,
    /// Existing website bucket. When absent a new SPA bucket is declared.
    pub source_bucket: Option<BucketHandle>,
    pub domain_name: String,
}

/// A CloudFront distribution over an SPA bucket, with a DNS alias record and
/// an HTTPS URL output.
pub struct CloudfrontSpa {
    pub bucket: BucketHandle,
    pub full_domain: String,
}

impl CloudfrontSpa {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        lookup: &dyn ContextLookup,
        props: CloudfrontSpaProps,
    ) -> StackResult<Self> {
        let hosted_zone = lookup.lookup_hosted_zone(&props.domain_name)?;
        let sub_domain = props.sub_domain.unwrap_or_else(|| "www".to_string());
        let full_domain = format!("{}.{}", sub_domain, hosted_zone.zone_name);

        let certificate_arn = match props.certificate_arn {
            Some(arn) => json!(arn),
            None => DnsValidatedCertificate::new(
                stack,
                &format!("{}Certificate", id),
                DnsValidatedCertificateProps {
                    domain_name: props.domain_name.clone(),
                    subject_alternative_names: vec![],
                    hosted_zone: hosted_zone.clone(),
                },
            )?
            .arn(),
        };

        let bucket = match props.source_bucket {
            Some(bucket) => bucket,
            None => {
                let bucket_name = stack.conventions().eqn(NameFormat::Dash).to_lowercase();
                S3Spa::new(stack, id, &bucket_name)?.bucket
            }
        };

        let distribution = Distribution::new(
            stack,
            &format!("{}Distribution", id),
            DistributionProps::new(
                vec![full_domain.clone(), props.domain_name.clone()],
                certificate_arn,
                bucket.regional_domain_name(),
            ),
        )?;

        AliasRecord::to_cloudfront(
            stack,
            &format!("{}AliasRecord", id),
            &full_domain,
            &hosted_zone.hosted_zone_id,
            distribution.domain_name(),
        )?;

        stack.add_output(
            "ProjectHttpsUrl",
            Output::new(json!(format!("https://{}", full_domain)))
                .with_description("Project URL using CloudFront Route53 for SSL"),
        );

        Ok(Self {
            bucket,
            full_domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::{AppIdentity, HostedZoneAttributes, MockContextLookup};

    fn identity() -> AppIdentity {
        AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap()
    }

    fn zone_lookup() -> MockContextLookup {
        let mut lookup = MockContextLookup::new();
        lookup.expect_lookup_hosted_zone().returning(|_| {
            Ok(HostedZoneAttributes {
                hosted_zone_id: "Z123".to_string(),
                zone_name: "example.com".to_string(),
            })
        });
        lookup
    }

    #[test]
    fn test_s3_spa_renders_index_for_errors() {
        let mut stack = Stack::new("app-dev", identity());
        let spa = S3Spa::new(&mut stack, "spa", "app-dev").unwrap();

        let template = stack.synth();
        let bucket = template.resource("spaBucket").unwrap();
        assert_eq!(
            bucket["Properties"]["WebsiteConfiguration"]["ErrorDocument"],
            "index.html"
        );
        assert!(template.resource("spaBucketPolicy").is_some());
        assert!(spa.website_url().get("Fn::GetAtt").is_some());
    }

    #[test]
    fn test_cloudfront_spa_defaults_to_www() {
        let lookup = zone_lookup();
        let mut stack = Stack::new("app-dev", identity());
        let spa = CloudfrontSpa::new(
            &mut stack,
            "spa",
            &lookup,
            CloudfrontSpaProps {
                sub_domain: None,
                certificate_arn: None,
                source_bucket: None,
                domain_name: "example.com".to_string(),
            },
        )
        .unwrap();
        assert_eq!(spa.full_domain, "www.example.com");

        let template = stack.synth();
        assert!(template.resource("spaCertificate").is_some());
        let config = &template.resource("spaDistribution").unwrap()["Properties"]
            ["DistributionConfig"];
        assert_eq!(config["Aliases"], json!(["www.example.com", "example.com"]));
        let record = template.resource("spaAliasRecord").unwrap();
        assert_eq!(record["Properties"]["Name"], "www.example.com");
        assert_eq!(
            template.output("ProjectHttpsUrl").unwrap()["Value"],
            "https://www.example.com"
        );
    }

    #[test]
    fn test_existing_certificate_is_used_verbatim() {
        let lookup = zone_lookup();
        let mut stack = Stack::new("app-dev", identity());
        CloudfrontSpa::new(
            &mut stack,
            "spa",
            &lookup,
            CloudfrontSpaProps {
                sub_domain: Some("app".to_string()),
                certificate_arn: Some("arn:aws:acm:us-east-1:1:certificate/abc".to_string()),
                source_bucket: None,
                domain_name: "example.com".to_string(),
            },
        )
        .unwrap();

        let template = stack.synth();
        assert!(template.resource("spaCertificate").is_none());
        let config = &template.resource("spaDistribution").unwrap()["Properties"]
            ["DistributionConfig"];
        assert_eq!(
            config["ViewerCertificate"]["AcmCertificateArn"],
            "arn:aws:acm:us-east-1:1:certificate/abc"
        );
    }
}
