//! SSM Session Manager access scoped to a set of tagged instances.

use serde_json::json;

use strato_aws::iam::{Group, Policy, PolicyProps, PolicyStatement};
use strato_core::Stack;

use crate::error::StackResult;

/// Properties for a session access group.
#[derive(Debug, Clone)]
pub struct SessionAccessProps {
    /// Name prefix for the group and policy. Defaults to the construct id.
    pub name: Option<String>,
    /// Instance tag the session permission is scoped by.
    pub ec2_instance_tag: String,
    pub ec2_instance_tag_value: String,
}

/// An IAM group whose members may open Session Manager sessions on instances
/// carrying a given tag, and terminate only their own sessions.
pub struct SessionAccess;

impl SessionAccess {
    pub fn new(stack: &mut Stack, id: &str, props: SessionAccessProps) -> StackResult<()> {
        let name = props.name.unwrap_or_else(|| id.to_string());

        let group = Group::new(
            stack,
            &format!("{}Group", id),
            Some(format!("{}SessionGroup", name)),
        )?;

        let tag_condition = json!({
            "StringLike": {
                format!("ssm:resourceTag/{}", props.ec2_instance_tag):
                    props.ec2_instance_tag_value,
            }
        });

        Policy::new(
            stack,
            &format!("{}Policy", id),
            PolicyProps {
                policy_name: format!("{}SessionAccessPolicy", name),
                statements: vec![
                    PolicyStatement::allow()
                        .sid(format!("{}AllowSessionManager", name))
                        .action("ssm:StartSession")
                        .resource(json!("arn:aws:ec2:*:*:instance/*"))
                        .condition(tag_condition),
                    PolicyStatement::allow()
                        .sid(format!("{}OnlyAllowTerminateSelfOwnedSessions", name))
                        .action("ssm:TerminateSession")
                        .resource(json!("arn:aws:ssm:*:*:session/${aws:username}-*")),
                    // ec2:DescribeInstances cannot be constrained further.
                    PolicyStatement::allow()
                        .sid(format!("{}DescribeInstances", name))
                        .action("ec2:DescribeInstances")
                        .resource(json!("*")),
                ],
                groups: vec![group.group_name()],
                roles: vec![],
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_session_access_scopes_by_instance_tag() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        SessionAccess::new(
            &mut stack,
            "sessionAccess",
            SessionAccessProps {
                name: Some("appDev".to_string()),
                ec2_instance_tag: "aws:cloudformation:stack-name".to_string(),
                ec2_instance_tag_value: "app-dev".to_string(),
            },
        )
        .unwrap();

        let template = stack.synth();
        let group = template.resource("sessionAccessGroup").unwrap();
        assert_eq!(group["Properties"]["GroupName"], "appDevSessionGroup");

        let policy = template.resource("sessionAccessPolicy").unwrap();
        let statements = policy["Properties"]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0]["Sid"], "appDevAllowSessionManager");
        assert_eq!(
            statements[0]["Condition"]["StringLike"]
                ["ssm:resourceTag/aws:cloudformation:stack-name"],
            "app-dev"
        );
        assert_eq!(
            statements[1]["Resource"][0],
            "arn:aws:ssm:*:*:session/${aws:username}-*"
        );
        assert_eq!(statements[2]["Action"][0], "ec2:DescribeInstances");
    }
}
