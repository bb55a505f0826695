//! ECS clusters backed by EC2 auto scaling groups.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

use crate::ec2::{SecurityGroupHandle, VpcHandle};
use crate::iam::InstanceProfileHandle;

/// SSM parameter resolving to the current ECS-optimized Amazon Linux 2 AMI.
const ECS_OPTIMIZED_AMI_PARAMETER: &str =
    "{{resolve:ssm:/aws/service/ecs/optimized-ami/amazon-linux-2/recommended/image_id}}";

/// Handle to an ECS cluster.
#[derive(Debug, Clone)]
pub struct ClusterHandle {
    pub logical_id: String,
    pub cluster_name: String,
}

impl ClusterHandle {
    pub fn name_ref(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct Cluster;

impl Cluster {
    pub fn new(stack: &mut Stack, id: &str, cluster_name: &str) -> CoreResult<ClusterHandle> {
        stack.add_resource(
            id,
            Resource::new("AWS::ECS::Cluster").prop("ClusterName", json!(cluster_name)),
        )?;
        Ok(ClusterHandle {
            logical_id: id.to_string(),
            cluster_name: cluster_name.to_string(),
        })
    }
}

/// Properties for the cluster's auto scaling group.
#[derive(Debug, Clone)]
pub struct AutoScalingGroupProps {
    pub name: Option<String>,
    pub instance_type: String,
    pub desired_capacity: u32,
    pub cluster_name: String,
}

pub struct AutoScalingGroup;

impl AutoScalingGroup {
    /// Declare a launch configuration and auto scaling group that joins
    /// instances to the named ECS cluster.
    ///
    /// Auto scaling groups use a propagation-aware tag shape the generic tag
    /// injection does not emit, so they sit on the untagged side of the
    /// documented tag-propagation gap.
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        security_group: &SecurityGroupHandle,
        instance_profile: &InstanceProfileHandle,
        props: AutoScalingGroupProps,
    ) -> CoreResult<()> {
        let launch_config_id = format!("{}LaunchConfig", id);
        let user_data = json!({
            "Fn::Base64": format!(
                "#!/bin/bash\necho ECS_CLUSTER={} >> /etc/ecs/ecs.config\n",
                props.cluster_name
            )
        });
        stack.add_resource(
            &launch_config_id,
            Resource::new("AWS::AutoScaling::LaunchConfiguration")
                .not_taggable()
                .prop("ImageId", json!(ECS_OPTIMIZED_AMI_PARAMETER))
                .prop("InstanceType", json!(props.instance_type))
                .prop("IamInstanceProfile", instance_profile.profile_ref())
                .prop("SecurityGroups", json!([security_group.group_id()]))
                .prop("UserData", user_data),
        )?;

        stack.add_resource(
            id,
            Resource::new("AWS::AutoScaling::AutoScalingGroup")
                .not_taggable()
                .prop(
                    "AutoScalingGroupName",
                    props.name.map(Value::String).unwrap_or(Value::Null),
                )
                .prop("LaunchConfigurationName", Stack::r#ref(&launch_config_id))
                .prop("MinSize", json!(props.desired_capacity.to_string()))
                .prop("MaxSize", json!(props.desired_capacity.to_string()))
                .prop("DesiredCapacity", json!(props.desired_capacity.to_string()))
                .prop("VPCZoneIdentifier", json!(vpc.private_subnet_ids)),
        )?;

        Ok(())
    }
}
