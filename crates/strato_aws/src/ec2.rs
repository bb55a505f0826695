//! EC2 networking resources: VPCs and security groups.

use serde_json::{json, Value};

use strato_core::{CoreError, CoreResult, Resource, Stack, VpcAttributes};

/// Handle to a VPC usable by downstream constructs. Fields are template
/// values, so both declared VPCs (Ref/GetAtt tokens) and looked-up VPCs
/// (literal ids) flow through the same shape.
#[derive(Debug, Clone)]
pub struct VpcHandle {
    pub vpc_id: Value,
    pub availability_zones: Vec<Value>,
    pub public_subnet_ids: Vec<Value>,
    pub private_subnet_ids: Vec<Value>,
}

impl From<VpcAttributes> for VpcHandle {
    fn from(attributes: VpcAttributes) -> Self {
        Self {
            vpc_id: Value::String(attributes.vpc_id),
            availability_zones: attributes
                .availability_zones
                .into_iter()
                .map(Value::String)
                .collect(),
            public_subnet_ids: attributes
                .public_subnet_ids
                .into_iter()
                .map(Value::String)
                .collect(),
            private_subnet_ids: attributes
                .private_subnet_ids
                .into_iter()
                .map(Value::String)
                .collect(),
        }
    }
}

/// Properties for a new VPC.
#[derive(Debug, Clone)]
pub struct VpcProps {
    /// Number of availability zones to spread subnets over.
    pub max_azs: usize,
    pub cidr: String,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            max_azs: 2,
            cidr: "10.0.0.0/16".to_string(),
        }
    }
}

/// A VPC with one public and one private subnet per availability zone, an
/// internet gateway, and public route tables.
pub struct Vpc;

impl Vpc {
    pub fn new(stack: &mut Stack, id: &str, props: VpcProps) -> CoreResult<VpcHandle> {
        // Public then private /20 blocks both come out of the same /16, so
        // past 8 AZs the third octet would overflow.
        if props.max_azs == 0 || props.max_azs > 8 {
            return Err(CoreError::InvalidProperty(format!(
                "max_azs must be between 1 and 8, got {}",
                props.max_azs
            )));
        }
        let name = stack.conventions().eqn_default();

        stack.add_resource(
            id,
            Resource::new("AWS::EC2::VPC")
                .prop("CidrBlock", json!(props.cidr))
                .prop("EnableDnsHostnames", json!(true))
                .prop("EnableDnsSupport", json!(true))
                .tag("Name", format!("{}-vpc", name)),
        )?;
        let vpc_id = Stack::r#ref(id);

        let igw_id = format!("{}Igw", id);
        stack.add_resource(
            &igw_id,
            Resource::new("AWS::EC2::InternetGateway").tag("Name", format!("{}-igw", name)),
        )?;
        let attachment_id = format!("{}IgwAttachment", id);
        stack.add_resource(
            &attachment_id,
            Resource::new("AWS::EC2::VPCGatewayAttachment")
                .not_taggable()
                .prop("VpcId", vpc_id.clone())
                .prop("InternetGatewayId", Stack::r#ref(&igw_id)),
        )?;

        let route_table_id = format!("{}PublicRouteTable", id);
        stack.add_resource(
            &route_table_id,
            Resource::new("AWS::EC2::RouteTable")
                .prop("VpcId", vpc_id.clone())
                .tag("Name", format!("{}-public-rt", name)),
        )?;
        stack.add_resource(
            &format!("{}PublicRoute", id),
            Resource::new("AWS::EC2::Route")
                .not_taggable()
                .depends_on(&attachment_id)
                .prop("RouteTableId", Stack::r#ref(&route_table_id))
                .prop("DestinationCidrBlock", json!("0.0.0.0/0"))
                .prop("GatewayId", Stack::r#ref(&igw_id)),
        )?;

        let mut availability_zones = Vec::new();
        let mut public_subnet_ids = Vec::new();
        let mut private_subnet_ids = Vec::new();

        // Carve /20 blocks out of the VPC cidr, public first, then private,
        // matching the subnet layout the original templates assumed.
        for az_index in 0..props.max_azs {
            let az = json!({ "Fn::Select": [az_index, { "Fn::GetAZs": "" }] });
            availability_zones.push(az.clone());

            let public_id = format!("{}PublicSubnet{}", id, az_index + 1);
            stack.add_resource(
                &public_id,
                Resource::new("AWS::EC2::Subnet")
                    .prop("VpcId", vpc_id.clone())
                    .prop("CidrBlock", json!(subnet_cidr(&props.cidr, az_index)))
                    .prop("AvailabilityZone", az.clone())
                    .prop("MapPublicIpOnLaunch", json!(true))
                    .tag("Name", format!("{}-public-{}", name, az_index + 1))
                    .tag("Type", "public"),
            )?;
            stack.add_resource(
                &format!("{}PublicSubnet{}RouteAssoc", id, az_index + 1),
                Resource::new("AWS::EC2::SubnetRouteTableAssociation")
                    .not_taggable()
                    .prop("SubnetId", Stack::r#ref(&public_id))
                    .prop("RouteTableId", Stack::r#ref(&route_table_id)),
            )?;
            public_subnet_ids.push(Stack::r#ref(&public_id));

            let private_id = format!("{}PrivateSubnet{}", id, az_index + 1);
            stack.add_resource(
                &private_id,
                Resource::new("AWS::EC2::Subnet")
                    .prop("VpcId", vpc_id.clone())
                    .prop(
                        "CidrBlock",
                        json!(subnet_cidr(&props.cidr, az_index + props.max_azs)),
                    )
                    .prop("AvailabilityZone", az)
                    .tag("Name", format!("{}-private-{}", name, az_index + 1))
                    .tag("Type", "private"),
            )?;
            private_subnet_ids.push(Stack::r#ref(&private_id));
        }

        Ok(VpcHandle {
            vpc_id,
            availability_zones,
            public_subnet_ids,
            private_subnet_ids,
        })
    }
}

/// Derive the nth /20 block from a /16 cidr.
fn subnet_cidr(vpc_cidr: &str, index: usize) -> String {
    let base = vpc_cidr.split('.').take(2).collect::<Vec<_>>().join(".");
    format!("{}.{}.0/20", base, index * 16)
}

/// A TCP port range for ingress rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub from: i64,
    pub to: i64,
}

impl PortRange {
    pub fn tcp(port: i64) -> Self {
        Self { from: port, to: port }
    }

    pub fn all_tcp() -> Self {
        Self { from: 0, to: 65535 }
    }
}

/// Properties for a security group.
#[derive(Debug, Clone, Default)]
pub struct SecurityGroupProps {
    pub group_name: Option<String>,
    pub description: Option<String>,
    pub allow_all_outbound: bool,
}

/// Handle to a security group.
#[derive(Debug, Clone)]
pub struct SecurityGroupHandle {
    pub logical_id: String,
}

impl SecurityGroupHandle {
    pub fn group_id(&self) -> Value {
        Stack::get_att(&self.logical_id, "GroupId")
    }
}

pub struct SecurityGroup;

impl SecurityGroup {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        props: SecurityGroupProps,
    ) -> CoreResult<SecurityGroupHandle> {
        let description = props
            .description
            .unwrap_or_else(|| format!("Security group for {}", stack.name()));
        let mut resource = Resource::new("AWS::EC2::SecurityGroup")
            .prop("GroupDescription", json!(description))
            .prop("VpcId", vpc.vpc_id.clone())
            .prop(
                "GroupName",
                props.group_name.map(Value::String).unwrap_or(Value::Null),
            );
        if props.allow_all_outbound {
            resource = resource.prop(
                "SecurityGroupEgress",
                json!([{ "IpProtocol": "-1", "CidrIp": "0.0.0.0/0" }]),
            );
        }
        stack.add_resource(id, resource)?;
        Ok(SecurityGroupHandle {
            logical_id: id.to_string(),
        })
    }

    /// Allow traffic from a security group into an externally supplied group
    /// id, such as one imported from another stack.
    pub fn allow_to(
        stack: &mut Stack,
        id: &str,
        source: &SecurityGroupHandle,
        target_group_id: Value,
        ports: PortRange,
    ) -> CoreResult<()> {
        stack.add_resource(
            id,
            Resource::new("AWS::EC2::SecurityGroupIngress")
                .not_taggable()
                .prop("GroupId", target_group_id)
                .prop("SourceSecurityGroupId", source.group_id())
                .prop("IpProtocol", json!("tcp"))
                .prop("FromPort", json!(ports.from))
                .prop("ToPort", json!(ports.to)),
        )
    }

    /// Allow traffic from one security group to another over a port range.
    pub fn allow_from(
        stack: &mut Stack,
        id: &str,
        source: &SecurityGroupHandle,
        target: &SecurityGroupHandle,
        ports: PortRange,
    ) -> CoreResult<()> {
        stack.add_resource(
            id,
            Resource::new("AWS::EC2::SecurityGroupIngress")
                .not_taggable()
                .prop("GroupId", target.group_id())
                .prop("SourceSecurityGroupId", source.group_id())
                .prop("IpProtocol", json!("tcp"))
                .prop("FromPort", json!(ports.from))
                .prop("ToPort", json!(ports.to)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    fn stack() -> Stack {
        Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        )
    }

    #[test]
    fn test_vpc_declares_subnets_per_az() {
        let mut stack = stack();
        let vpc = Vpc::new(&mut stack, "vpc", VpcProps::default()).unwrap();
        assert_eq!(vpc.public_subnet_ids.len(), 2);
        assert_eq!(vpc.private_subnet_ids.len(), 2);

        let template = stack.synth();
        assert_eq!(template.resources_of_type("AWS::EC2::Subnet").len(), 4);
        assert_eq!(template.resources_of_type("AWS::EC2::VPC").len(), 1);
        assert_eq!(
            template.resources_of_type("AWS::EC2::InternetGateway").len(),
            1
        );
    }

    #[test]
    fn test_vpc_rejects_more_azs_than_the_cidr_holds() {
        let mut stack = stack();
        let err = Vpc::new(
            &mut stack,
            "vpc",
            VpcProps {
                max_azs: 9,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidProperty(_)));
        assert!(!stack.has_resource("vpc"));
    }

    #[test]
    fn test_subnet_cidr_blocks_do_not_overlap() {
        assert_eq!(subnet_cidr("10.0.0.0/16", 0), "10.0.0.0/20");
        assert_eq!(subnet_cidr("10.0.0.0/16", 1), "10.0.16.0/20");
        assert_eq!(subnet_cidr("10.0.0.0/16", 3), "10.0.48.0/20");
    }

    #[test]
    fn test_security_group_ingress_rule() {
        let mut stack = stack();
        let vpc = Vpc::new(&mut stack, "vpc", VpcProps::default()).unwrap();
        let alb = SecurityGroup::new(
            &mut stack,
            "albSg",
            &vpc,
            SecurityGroupProps {
                group_name: Some("app-dev-alb-sg".to_string()),
                allow_all_outbound: true,
                ..Default::default()
            },
        )
        .unwrap();
        let cluster =
            SecurityGroup::new(&mut stack, "clusterSg", &vpc, SecurityGroupProps::default())
                .unwrap();
        SecurityGroup::allow_from(
            &mut stack,
            "albToCluster",
            &alb,
            &cluster,
            PortRange::all_tcp(),
        )
        .unwrap();

        let template = stack.synth();
        let ingress = template.resource("albToCluster").unwrap();
        assert_eq!(ingress["Properties"]["FromPort"], 0);
        assert_eq!(ingress["Properties"]["ToPort"], 65535);
    }
}
