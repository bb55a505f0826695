//! Hosted zone lookup plus a DNS-validated certificate in a dedicated stack.

use strato_aws::acm::{CertificateHandle, DnsValidatedCertificate, DnsValidatedCertificateProps};
use strato_core::{AppIdentity, ContextLookup, HostedZoneAttributes, NameFormat, Stack};

use crate::error::StackResult;

/// Properties for a [`Route53AcmSslStack`].
#[derive(Debug, Clone)]
pub struct Route53AcmSslStackProps {
    pub domain_name: String,
}

/// Looks up the hosted zone for a domain and issues a DNS-validated
/// certificate against it.
///
/// The certificate lives in its own stack so application stacks can be torn
/// down and rebuilt without re-issuing against the yearly ACM certificate
/// limit.
pub struct Route53AcmSslStack {
    pub stack: Stack,
    pub hosted_zone: HostedZoneAttributes,
    pub certificate: CertificateHandle,
}

impl Route53AcmSslStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: Route53AcmSslStackProps,
    ) -> StackResult<Self> {
        let name = identity.name.clone();
        let environment = identity.environment.clone();
        let mut stack = Stack::new(id, identity).with_description(format!(
            "Route53 HostedZone and ACM certificate for {}-{}.",
            name, environment
        ));

        let hosted_zone = lookup.lookup_hosted_zone(&props.domain_name)?;

        let cert_id = format!("{}SslCert", stack.conventions().eqn(NameFormat::Camel));
        let certificate = DnsValidatedCertificate::new(
            &mut stack,
            &cert_id,
            DnsValidatedCertificateProps {
                domain_name: props.domain_name,
                subject_alternative_names: vec![],
                hosted_zone: hosted_zone.clone(),
            },
        )?;

        Ok(Self {
            stack,
            hosted_zone,
            certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::MockContextLookup;

    #[test]
    fn test_certificate_validates_against_looked_up_zone() {
        let mut lookup = MockContextLookup::new();
        lookup
            .expect_lookup_hosted_zone()
            .withf(|domain| domain == "example.com")
            .times(1)
            .returning(|_| {
                Ok(HostedZoneAttributes {
                    hosted_zone_id: "Z123".to_string(),
                    zone_name: "example.com".to_string(),
                })
            });

        let dns = Route53AcmSslStack::new(
            "app-dev-dns",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
            &lookup,
            Route53AcmSslStackProps {
                domain_name: "example.com".to_string(),
            },
        )
        .unwrap();

        let template = dns.stack.synth();
        let certificate = template.resource("appDevSslCert").unwrap();
        assert_eq!(certificate["Properties"]["DomainName"], "example.com");
        assert_eq!(
            certificate["Properties"]["DomainValidationOptions"][0]["HostedZoneId"],
            "Z123"
        );
    }
}
