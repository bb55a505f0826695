//! VPC stacks: declare a new network or select an existing one.

use tracing::warn;

use strato_aws::ec2::{Vpc, VpcHandle, VpcProps};
use strato_core::{AppIdentity, ContextLookup, Stack, VpcLookupOptions};

use crate::error::StackResult;

/// A stack holding a freshly declared VPC spread over two availability zones.
pub struct VpcStack {
    pub stack: Stack,
    pub vpc: VpcHandle,
}

impl VpcStack {
    pub fn new(id: &str, identity: AppIdentity) -> StackResult<Self> {
        let environment = identity.environment.clone();
        let mut stack = Stack::new(id, identity)
            .with_description(format!("VPC for the {} {} environment", id, environment));
        let vpc = Vpc::new(&mut stack, "vpc", VpcProps::default())?;
        Ok(Self { stack, vpc })
    }
}

/// Criteria for selecting an existing VPC.
#[derive(Debug, Clone, Default)]
pub struct VpcLookupStackProps {
    pub vpc_id: Option<String>,
    pub vpc_name: Option<String>,
}

/// A stack that selects an existing VPC instead of declaring one.
///
/// Prefers a VPC id, then a VPC name, and finally falls back to the account's
/// default VPC.
pub struct VpcLookupStack {
    pub stack: Stack,
    pub vpc: VpcHandle,
}

impl VpcLookupStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: VpcLookupStackProps,
    ) -> StackResult<Self> {
        let stack = Stack::new(id, identity)
            .with_description("Select an existing VPC to use with your application.");

        if props.vpc_id.is_none() && props.vpc_name.is_none() {
            warn!(
                "Using default VPC from your selected region. \
                 Add a vpc_id or vpc_name to select an existing VPC"
            );
        }

        let options = if let Some(vpc_id) = props.vpc_id {
            VpcLookupOptions::by_id(vpc_id)
        } else if let Some(vpc_name) = props.vpc_name {
            VpcLookupOptions::by_name(vpc_name)
        } else {
            VpcLookupOptions::default_vpc()
        };

        let attributes = lookup.lookup_vpc(&options)?;
        Ok(Self {
            stack,
            vpc: VpcHandle::from(attributes),
        })
    }
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
            vpc_id: "vpc-123".to_string(),
            cidr_block: None,
            availability_zones: vec!["us-east-1a".to_string()],
            public_subnet_ids: vec!["subnet-pub".to_string()],
            private_subnet_ids: vec!["subnet-priv".to_string()],
        }
    }

    #[test]
    fn test_vpc_stack_declares_network() {
        let vpc_stack = VpcStack::new("app-dev-vpc", identity()).unwrap();
        let template = vpc_stack.stack.synth();
        assert_eq!(template.resources_of_type("AWS::EC2::VPC").len(), 1);
        assert_eq!(template.resources_of_type("AWS::EC2::Subnet").len(), 4);
    }

    #[test]
    fn test_lookup_prefers_vpc_id_over_name() {
        let mut lookup = MockContextLookup::new();
        lookup
            .expect_lookup_vpc()
            .withf(|options| options.vpc_id.as_deref() == Some("vpc-123") && !options.is_default)
            .times(1)
            .returning(|_| Ok(attributes()));

        let vpc_stack = VpcLookupStack::new(
            "app-dev-vpc",
            identity(),
            &lookup,
            VpcLookupStackProps {
                vpc_id: Some("vpc-123".to_string()),
                vpc_name: Some("ignored".to_string()),
            },
        )
        .unwrap();
        assert_eq!(vpc_stack.vpc.vpc_id, serde_json::json!("vpc-123"));
    }

    #[test]
    fn test_lookup_falls_back_to_default_vpc() {
        let mut lookup = MockContextLookup::new();
        lookup
            .expect_lookup_vpc()
            .withf(|options| options.is_default)
            .times(1)
            .returning(|_| Ok(attributes()));

        VpcLookupStack::new(
            "app-dev-vpc",
            identity(),
            &lookup,
            VpcLookupStackProps::default(),
        )
        .unwrap();
    }
}
