//! Synthesis-time lookups of existing infrastructure.
//!
//! The lookup capability is owned by the external provider tooling; this
//! layer delegates through [`ContextLookup`] and propagates failures
//! unchanged. No retry, caching, or interpretation happens here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreResult;

/// Search criteria for finding an existing VPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcLookupOptions {
    pub vpc_id: Option<String>,
    pub vpc_name: Option<String>,
    /// Fall back to the account's default VPC.
    pub is_default: bool,
}

impl VpcLookupOptions {
    pub fn by_id(vpc_id: impl Into<String>) -> Self {
        Self {
            vpc_id: Some(vpc_id.into()),
            ..Self::default()
        }
    }

    pub fn by_name(vpc_name: impl Into<String>) -> Self {
        Self {
            vpc_name: Some(vpc_name.into()),
            ..Self::default()
        }
    }

    pub fn default_vpc() -> Self {
        Self {
            is_default: true,
            ..Self::default()
        }
    }
}

/// Concrete handle to a VPC, whether declared in-stack or looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcAttributes {
    pub vpc_id: String,
    pub cidr_block: Option<String>,
    pub availability_zones: Vec<String>,
    pub public_subnet_ids: Vec<String>,
    pub private_subnet_ids: Vec<String>,
}

/// Concrete handle to a Route 53 hosted zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZoneAttributes {
    pub hosted_zone_id: String,
    pub zone_name: String,
}

/// Synthesis-time lookup collaborator, implemented by the provider tooling
/// driving synthesis. May fail; failures are opaque to this layer.
///
/// With the `test-util` feature a mockall double ([`MockContextLookup`]) is
/// generated for test suites; production builds never compile it.
#[cfg_attr(feature = "test-util", mockall::automock)]
pub trait ContextLookup {
    fn lookup_vpc(&self, options: &VpcLookupOptions) -> CoreResult<VpcAttributes>;
    fn lookup_hosted_zone(&self, domain_name: &str) -> CoreResult<HostedZoneAttributes>;
}

/// A VPC supplied either by value or by lookup criteria.
///
/// The two cases are an explicit sum type so the "is this already a handle"
/// question is answered at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpcRef {
    Attributes(VpcAttributes),
    Lookup(VpcLookupOptions),
}

impl From<VpcAttributes> for VpcRef {
    fn from(attributes: VpcAttributes) -> Self {
        VpcRef::Attributes(attributes)
    }
}

impl From<VpcLookupOptions> for VpcRef {
    fn from(options: VpcLookupOptions) -> Self {
        VpcRef::Lookup(options)
    }
}

/// Resolve a VPC reference into a concrete handle, exactly once.
///
/// By-value references pass through unchanged; lookup criteria are delegated
/// to the collaborator.
pub fn resolve_vpc(lookup: &dyn ContextLookup, vpc: VpcRef) -> CoreResult<VpcAttributes> {
    match vpc {
        VpcRef::Attributes(attributes) => Ok(attributes),
        VpcRef::Lookup(options) => {
            debug!("Looking up VPC with {:?}", options);
            lookup.lookup_vpc(&options)
        }
    }
}
