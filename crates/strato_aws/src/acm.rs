//! ACM certificates with DNS validation.

use serde_json::{json, Value};

use strato_core::{CoreResult, HostedZoneAttributes, Resource, Stack};

/// Properties for a DNS-validated certificate.
///
/// Certificates used by CloudFront must live in us-east-1; keeping them in a
/// dedicated stack also avoids re-issuing against the yearly ACM limit when
/// application stacks are torn down and rebuilt.
#[derive(Debug, Clone)]
pub struct DnsValidatedCertificateProps {
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    pub hosted_zone: HostedZoneAttributes,
}

/// Handle to a certificate. `Ref` yields the certificate ARN.
#[derive(Debug, Clone)]
pub struct CertificateHandle {
    pub logical_id: String,
}

impl CertificateHandle {
    pub fn arn(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct DnsValidatedCertificate;

impl DnsValidatedCertificate {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        props: DnsValidatedCertificateProps,
    ) -> CoreResult<CertificateHandle> {
        let mut resource = Resource::new("AWS::CertificateManager::Certificate")
            .prop("DomainName", json!(props.domain_name))
            .prop("ValidationMethod", json!("DNS"))
            .prop(
                "DomainValidationOptions",
                json!([{
                    "DomainName": props.domain_name,
                    "HostedZoneId": props.hosted_zone.hosted_zone_id,
                }]),
            );
        if !props.subject_alternative_names.is_empty() {
            resource = resource.prop(
                "SubjectAlternativeNames",
                json!(props.subject_alternative_names),
            );
        }
        stack.add_resource(id, resource)?;
        Ok(CertificateHandle {
            logical_id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_dns_validated_certificate() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        DnsValidatedCertificate::new(
            &mut stack,
            "cert",
            DnsValidatedCertificateProps {
                domain_name: "example.com".to_string(),
                subject_alternative_names: vec!["*.example.com".to_string()],
                hosted_zone: HostedZoneAttributes {
                    hosted_zone_id: "Z123".to_string(),
                    zone_name: "example.com".to_string(),
                },
            },
        )
        .unwrap();

        let template = stack.synth();
        let cert = template.resource("cert").unwrap();
        assert_eq!(cert["Properties"]["ValidationMethod"], "DNS");
        assert_eq!(
            cert["Properties"]["DomainValidationOptions"][0]["HostedZoneId"],
            "Z123"
        );
        assert_eq!(
            cert["Properties"]["SubjectAlternativeNames"],
            json!(["*.example.com"])
        );
    }
}
