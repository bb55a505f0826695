//! CodePipeline pipelines, stages and actions.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, SecretValue, Stack};

use crate::iam::{managed_policy_arn, PolicyStatement, Role, RoleProps};

/// A named artifact passed between pipeline actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact(pub String);

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// A single pipeline action.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub category: String,
    pub owner: String,
    pub provider: String,
    pub version: String,
    pub configuration: Value,
    pub input_artifacts: Vec<String>,
    pub output_artifacts: Vec<String>,
}

impl Action {
    /// GitHub source action. The OAuth token stays an opaque secret
    /// reference.
    pub fn github_source(
        name: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        oauth_token: &SecretValue,
        output: &Artifact,
    ) -> Self {
        Self {
            name: name.to_string(),
            category: "Source".to_string(),
            owner: "ThirdParty".to_string(),
            provider: "GitHub".to_string(),
            version: "1".to_string(),
            configuration: json!({
                "Owner": owner,
                "Repo": repo,
                "Branch": branch,
                "OAuthToken": oauth_token.render(),
                // Webhook triggered; no polling.
                "PollForSourceChanges": false,
            }),
            input_artifacts: vec![],
            output_artifacts: vec![output.0.clone()],
        }
    }

    pub fn code_build(
        name: &str,
        project_name: Value,
        input: &Artifact,
        output: &Artifact,
    ) -> Self {
        Self {
            name: name.to_string(),
            category: "Build".to_string(),
            owner: "AWS".to_string(),
            provider: "CodeBuild".to_string(),
            version: "1".to_string(),
            configuration: json!({ "ProjectName": project_name }),
            input_artifacts: vec![input.0.clone()],
            output_artifacts: vec![output.0.clone()],
        }
    }

    pub fn s3_deploy(name: &str, input: &Artifact, bucket_name: Value) -> Self {
        Self {
            name: name.to_string(),
            category: "Deploy".to_string(),
            owner: "AWS".to_string(),
            provider: "S3".to_string(),
            version: "1".to_string(),
            configuration: json!({ "BucketName": bucket_name, "Extract": true }),
            input_artifacts: vec![input.0.clone()],
            output_artifacts: vec![],
        }
    }

    /// Deploy a source bundle to an Elastic Beanstalk environment. Takes
    /// exactly one input artifact and produces none.
    pub fn elastic_beanstalk_deploy(
        name: &str,
        application_name: &str,
        environment_name: &str,
        input: &Artifact,
    ) -> Self {
        Self {
            name: name.to_string(),
            category: "Deploy".to_string(),
            owner: "AWS".to_string(),
            provider: "ElasticBeanstalk".to_string(),
            version: "1".to_string(),
            configuration: json!({
                "ApplicationName": application_name,
                "EnvironmentName": environment_name,
            }),
            input_artifacts: vec![input.0.clone()],
            output_artifacts: vec![],
        }
    }

    fn render(&self) -> Value {
        let inputs: Vec<Value> = self
            .input_artifacts
            .iter()
            .map(|a| json!({ "Name": a }))
            .collect();
        let outputs: Vec<Value> = self
            .output_artifacts
            .iter()
            .map(|a| json!({ "Name": a }))
            .collect();
        json!({
            "Name": self.name,
            "ActionTypeId": {
                "Category": self.category,
                "Owner": self.owner,
                "Provider": self.provider,
                "Version": self.version,
            },
            "Configuration": self.configuration,
            "InputArtifacts": inputs,
            "OutputArtifacts": outputs,
        })
    }
}

/// An ordered pipeline stage.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }
}

/// GitHub webhook registration for a source action.
#[derive(Debug, Clone)]
struct WebhookSpec {
    source_action_name: String,
    branch: String,
    oauth_token: SecretValue,
}

/// Handle to a declared pipeline.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    pub logical_id: String,
}

impl PipelineHandle {
    pub fn name_ref(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }
}

/// Pipeline builder. Stages can keep being appended until the pipeline is
/// added to a stack.
#[derive(Debug, Clone)]
pub struct Pipeline {
    id: String,
    artifact_bucket_name: Value,
    encryption_key_arn: Option<Value>,
    stages: Vec<Stage>,
    webhook: Option<WebhookSpec>,
}

impl Pipeline {
    pub fn new(id: &str, artifact_bucket_name: Value) -> Self {
        Self {
            id: id.to_string(),
            artifact_bucket_name,
            encryption_key_arn: None,
            stages: Vec::new(),
            webhook: None,
        }
    }

    pub fn with_encryption_key(mut self, key_arn: Value) -> Self {
        self.encryption_key_arn = Some(key_arn);
        self
    }

    pub fn add_stage(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Register a GitHub webhook so pushes to the branch trigger the source
    /// action.
    pub fn trigger_on_push(
        &mut self,
        source_action_name: &str,
        branch: &str,
        oauth_token: SecretValue,
    ) -> &mut Self {
        self.webhook = Some(WebhookSpec {
            source_action_name: source_action_name.to_string(),
            branch: branch.to_string(),
            oauth_token,
        });
        self
    }

    fn deploys_to_elastic_beanstalk(&self) -> bool {
        self.stages
            .iter()
            .flat_map(|s| &s.actions)
            .any(|a| a.provider == "ElasticBeanstalk")
    }

    /// Declare the pipeline, its role, and any webhook.
    pub fn build(self, stack: &mut Stack) -> CoreResult<PipelineHandle> {
        let mut managed_policy_arns = Vec::new();
        if self.deploys_to_elastic_beanstalk() {
            // Deploy actions need read access to artifacts plus Beanstalk
            // access; the managed policy mirrors what the deploy provider
            // grants itself.
            managed_policy_arns.push(managed_policy_arn("AWSElasticBeanstalkFullAccess"));
        }
        let role = Role::new(
            stack,
            &format!("{}Role", self.id),
            RoleProps {
                role_name: None,
                assumed_by_service: "codepipeline.amazonaws.com".to_string(),
                managed_policy_arns,
                inline_statements: vec![
                    PolicyStatement::allow()
                        .action("s3:GetObject")
                        .action("s3:GetObjectVersion")
                        .action("s3:GetBucketVersioning")
                        .action("s3:PutObject")
                        .resource(json!("*")),
                    PolicyStatement::allow()
                        .action("codebuild:StartBuild")
                        .action("codebuild:BatchGetBuilds")
                        .resource(json!("*")),
                ],
            },
        )?;

        let mut artifact_store = json!({
            "Type": "S3",
            "Location": self.artifact_bucket_name,
        });
        if let Some(key_arn) = &self.encryption_key_arn {
            artifact_store["EncryptionKey"] = json!({ "Id": key_arn, "Type": "KMS" });
        }

        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|stage| {
                let actions: Vec<Value> = stage.actions.iter().map(|a| a.render()).collect();
                json!({ "Name": stage.name, "Actions": actions })
            })
            .collect();

        stack.add_resource(
            &self.id,
            Resource::new("AWS::CodePipeline::Pipeline")
                .prop("RoleArn", role.arn())
                .prop("ArtifactStore", artifact_store)
                .prop("Stages", json!(stages)),
        )?;
        let handle = PipelineHandle {
            logical_id: self.id.clone(),
        };

        if let Some(webhook) = &self.webhook {
            stack.add_resource(
                &format!("{}Webhook", self.id),
                Resource::new("AWS::CodePipeline::Webhook")
                    .not_taggable()
                    .prop("Authentication", json!("GITHUB_HMAC"))
                    .prop(
                        "AuthenticationConfiguration",
                        json!({ "SecretToken": webhook.oauth_token.render() }),
                    )
                    .prop(
                        "Filters",
                        json!([{
                            "JsonPath": "$.ref",
                            "MatchEquals": format!("refs/heads/{}", webhook.branch),
                        }]),
                    )
                    .prop("TargetPipeline", handle.name_ref())
                    .prop("TargetAction", json!(webhook.source_action_name))
                    .prop("TargetPipelineVersion", Stack::get_att(&self.id, "Version"))
                    .prop("RegisterWithThirdParty", json!(true)),
            )?;
        }

        Ok(handle)
    }
}
