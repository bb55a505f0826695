//! CodeBuild projects used inside pipelines.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, Stack};

use crate::iam::{PolicyStatement, Role, RoleProps};

/// Properties for a CodeBuild project wired into a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineProjectProps {
    pub project_name: String,
    /// Buildspec path inside the source artifact.
    pub buildspec_path: String,
}

impl PipelineProjectProps {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            buildspec_path: "./buildspec.yml".to_string(),
        }
    }
}

/// Handle to a CodeBuild project.
#[derive(Debug, Clone)]
pub struct ProjectHandle {
    pub logical_id: String,
}

impl ProjectHandle {
    pub fn name_ref(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

pub struct PipelineProject;

impl PipelineProject {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        props: PipelineProjectProps,
    ) -> CoreResult<ProjectHandle> {
        let role = Role::new(
            stack,
            &format!("{}Role", id),
            RoleProps {
                role_name: None,
                assumed_by_service: "codebuild.amazonaws.com".to_string(),
                managed_policy_arns: vec![],
                inline_statements: vec![
                    PolicyStatement::allow()
                        .action("logs:CreateLogGroup")
                        .action("logs:CreateLogStream")
                        .action("logs:PutLogEvents")
                        .resource(json!("*")),
                    PolicyStatement::allow()
                        .action("s3:GetObject")
                        .action("s3:GetObjectVersion")
                        .action("s3:PutObject")
                        .resource(json!("*")),
                ],
            },
        )?;

        stack.add_resource(
            id,
            Resource::new("AWS::CodeBuild::Project")
                .prop("Name", json!(props.project_name))
                .prop("ServiceRole", role.arn())
                .prop(
                    "Source",
                    json!({ "Type": "CODEPIPELINE", "BuildSpec": props.buildspec_path }),
                )
                .prop("Artifacts", json!({ "Type": "CODEPIPELINE" }))
                .prop(
                    "Environment",
                    json!({
                        "ComputeType": "BUILD_GENERAL1_SMALL",
                        "Image": "aws/codebuild/standard:5.0",
                        "Type": "LINUX_CONTAINER",
                    }),
                ),
        )?;

        Ok(ProjectHandle {
            logical_id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_core::AppIdentity;

    #[test]
    fn test_pipeline_project_sources_buildspec_from_repo() {
        let mut stack = Stack::new(
            "app-dev",
            AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap(),
        );
        PipelineProject::new(
            &mut stack,
            "project",
            PipelineProjectProps::new("app-dev-spa"),
        )
        .unwrap();

        let template = stack.synth();
        let project = template.resource("project").unwrap();
        assert_eq!(project["Properties"]["Name"], "app-dev-spa");
        assert_eq!(project["Properties"]["Source"]["BuildSpec"], "./buildspec.yml");
        assert!(template.resource("projectRole").is_some());
    }
}
