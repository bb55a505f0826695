//! GitHub-sourced CodePipeline stacks for SPA and Rails deployments.

use serde_json::{json, Value};

use strato_aws::codebuild::{PipelineProject, PipelineProjectProps};
use strato_aws::codepipeline::{Action, Artifact, Pipeline, Stage};
use strato_aws::kms::{Alias, Key};
use strato_aws::s3::{Bucket, BucketProps};
use strato_core::{
    AppIdentity, ContextLookup, NameFormat, Output, RemovalPolicy, Stack, TokenSource,
};

use crate::error::StackResult;
use crate::spa::{CloudfrontSpa, CloudfrontSpaProps, S3Spa};

const SOURCE_ACTION_NAME: &str = "githubRepoSource";

/// Source configuration shared by all pipeline stacks.
#[derive(Debug, Clone)]
pub struct GithubSourceProps {
    pub owner_name: String,
    /// Repository name. Defaults to the app name.
    pub repo_name: Option<String>,
    /// Branch to track. Defaults to `master`.
    pub branch_name: Option<String>,
    /// OAuth token reference. Defaults to a Secrets Manager secret named
    /// `{eqn camel}GithubOAuthToken` with a JSON field of the same name.
    pub github_oauth_token: Option<TokenSource>,
}

impl GithubSourceProps {
    pub fn new(owner_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            repo_name: None,
            branch_name: None,
            github_oauth_token: None,
        }
    }
}

/// A pipeline with a GitHub webhook source stage, ready for further stages.
pub struct GithubSourcePipeline {
    pub pipeline: Pipeline,
    pub source_artifact: Artifact,
}

impl GithubSourcePipeline {
    /// Declare the KMS-encrypted artifact bucket and a pipeline sourcing from
    /// GitHub. The caller appends stages and then calls
    /// [`Pipeline::build`].
    pub fn new(
        stack: &mut Stack,
        id: &str,
        bucket_name: &str,
        source: GithubSourceProps,
    ) -> StackResult<Self> {
        // The key is removed with the stack; the deletion grace period is
        // enough for any emergency access to the bucket artifacts.
        let key = Key::new(
            stack,
            &format!("{}ArtifactsKey", id),
            RemovalPolicy::Destroy,
        )?;
        Alias::new(
            stack,
            &format!("{}ArtifactsKeyAlias", id),
            &format!(
                "alias/codepipeline-{}",
                stack.conventions().eqn_default().to_lowercase()
            ),
            &key,
        )?;

        let artifact_bucket_name = format!("{}-pl-artifacts", bucket_name);
        Bucket::new(
            stack,
            &format!("{}ArtifactsBucket", id),
            BucketProps {
                bucket_name: Some(artifact_bucket_name.clone()),
                encryption_key_arn: Some(key.arn()),
                block_public_access: true,
                removal_policy: RemovalPolicy::Destroy,
                ..Default::default()
            },
        )?;

        let identity = stack.conventions().identity().clone();
        let default_token_key = format!(
            "{}GithubOAuthToken",
            stack.conventions().eqn(NameFormat::Camel)
        );
        let token = source
            .github_oauth_token
            .unwrap_or_else(|| TokenSource::SecretName(default_token_key))
            .resolve();
        let repo_name = source.repo_name.unwrap_or(identity.name);
        let branch_name = source.branch_name.unwrap_or_else(|| "master".to_string());

        let source_artifact = Artifact::new("githubRepoOutput");
        let mut pipeline = Pipeline::new(id, json!(artifact_bucket_name))
            .with_encryption_key(key.arn());
        pipeline.add_stage(Stage::new(
            "Source",
            vec![Action::github_source(
                SOURCE_ACTION_NAME,
                &source.owner_name,
                &repo_name,
                &branch_name,
                &token,
                &source_artifact,
            )],
        ));
        pipeline.trigger_on_push(SOURCE_ACTION_NAME, &branch_name, token);

        Ok(Self {
            pipeline,
            source_artifact,
        })
    }
}

/// Append Build and Deploy stages producing a website artifact and syncing it
/// into a bucket.
pub struct SpaPipeline;

impl SpaPipeline {
    pub fn add_stages(
        stack: &mut Stack,
        id: &str,
        pipeline: &mut Pipeline,
        project_name: &str,
        source_artifact: &Artifact,
        website_bucket_name: Value,
    ) -> StackResult<()> {
        let project = PipelineProject::new(
            stack,
            &format!("{}Project", id),
            PipelineProjectProps::new(format!("{}-spa", project_name)),
        )?;

        let website_output = Artifact::new("websiteOutput");
        pipeline.add_stage(Stage::new(
            "Build",
            vec![Action::code_build(
                "Website",
                project.name_ref(),
                source_artifact,
                &website_output,
            )],
        ));
        pipeline.add_stage(Stage::new(
            "Deploy",
            vec![Action::s3_deploy(
                "Website",
                &website_output,
                website_bucket_name,
            )],
        ));
        Ok(())
    }
}

/// Append a deploy stage pushing the source bundle to an Elastic Beanstalk
/// environment.
pub struct RailsPipeline;

impl RailsPipeline {
    pub fn add_deploy_stage(
        pipeline: &mut Pipeline,
        application_name: &str,
        environment_name: &str,
        source_artifact: &Artifact,
    ) {
        pipeline.add_stage(Stage::new(
            "DeployToEB",
            vec![Action::elastic_beanstalk_deploy(
                "DeployToEB",
                application_name,
                environment_name,
                source_artifact,
            )],
        ));
    }
}

/// Properties for an [`S3SpaPipelineStack`].
#[derive(Debug, Clone)]
pub struct S3SpaPipelineStackProps {
    pub source: GithubSourceProps,
    /// Name of the website bucket, part of the final website URL. Defaults to
    /// the dash-formatted environment-qualified name, lowercased.
    pub site_bucket_name: Option<String>,
}

/// Pipeline that builds a single page application and deploys it to an S3
/// website bucket.
pub struct S3SpaPipelineStack {
    pub stack: Stack,
    pub spa: S3Spa,
}

impl S3SpaPipelineStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        props: S3SpaPipelineStackProps,
    ) -> StackResult<Self> {
        let description = format!(
            "Pipeline, Build & Deploy to S3 bucket for {}-{} SPA Application",
            identity.name, identity.environment
        );
        let mut stack = Stack::new(id, identity).with_description(description);
        let eqn = stack.conventions().eqn_default();

        let site_bucket_name = props
            .site_bucket_name
            .unwrap_or_else(|| eqn.to_lowercase());
        let spa = S3Spa::new(&mut stack, "spa", &site_bucket_name)?;

        let mut source =
            GithubSourcePipeline::new(&mut stack, "pipeline", &site_bucket_name, props.source)?;
        SpaPipeline::add_stages(
            &mut stack,
            "spa",
            &mut source.pipeline,
            &eqn,
            &source.source_artifact,
            spa.bucket.bucket_name(),
        )?;
        source.pipeline.build(&mut stack)?;

        stack.add_output(
            "SpaSite",
            Output::new(spa.website_url())
                .with_description(format!("Project URL for {}", eqn)),
        );

        Ok(Self { stack, spa })
    }
}

/// Properties for a [`SpaPipelineStack`].
#[derive(Debug, Clone)]
pub struct SpaPipelineStackProps {
    pub source: GithubSourceProps,
    /// Subdomain the site bucket is named after. Defaults to the bare app
    /// name in production and the environment-qualified name elsewhere.
    pub sub_domain: Option<String>,
}

/// Pipeline deploying a single page application to a subdomain-named website
/// bucket.
pub struct SpaPipelineStack {
    pub stack: Stack,
}

impl SpaPipelineStack {
    pub fn new(id: &str, identity: AppIdentity, props: SpaPipelineStackProps) -> StackResult<Self> {
        let mut stack = Stack::new(id, identity);
        let conventions = stack.conventions().clone();
        let identity = conventions.identity();

        let sub_domain = props.sub_domain.unwrap_or_else(|| {
            if identity.is_production() {
                identity.name.clone()
            } else {
                conventions.eqn_default()
            }
        });

        let bucket = Bucket::new(
            &mut stack,
            "siteBucket",
            BucketProps {
                bucket_name: Some(sub_domain.clone()),
                website_index_document: Some("index.html".to_string()),
                website_error_document: Some("index.html".to_string()),
                public_read_access: true,
                ..Default::default()
            },
        )?;

        let mut source =
            GithubSourcePipeline::new(&mut stack, "pipeline", &sub_domain, props.source)?;
        SpaPipeline::add_stages(
            &mut stack,
            "spa",
            &mut source.pipeline,
            &conventions.eqn_default(),
            &source.source_artifact,
            bucket.bucket_name(),
        )?;
        source.pipeline.build(&mut stack)?;

        stack.add_output(
            &format!("{}URL", conventions.eqn(NameFormat::Camel)),
            Output::new(bucket.website_url()).with_description("URL for Website"),
        );

        Ok(Self { stack })
    }
}

/// Properties for a [`CloudfrontSpaPipelineStack`].
#[derive(Debug, Clone)]
pub struct CloudfrontSpaPipelineStackProps {
    pub source: GithubSourceProps,
    /// Defaults to the dash-formatted environment-qualified name.
    pub sub_domain: Option<String>,
    pub domain_name: String,
}

/// Pipeline deploying a single page application behind CloudFront with a
/// custom domain.
pub struct CloudfrontSpaPipelineStack {
    pub stack: Stack,
    pub spa: CloudfrontSpa,
}

impl CloudfrontSpaPipelineStack {
    pub fn new(
        id: &str,
        identity: AppIdentity,
        lookup: &dyn ContextLookup,
        props: CloudfrontSpaPipelineStackProps,
    ) -> StackResult<Self> {
        let description = format!(
            "Pipeline, Build & Deploy to Cloudfront for {}-{} SPA Application",
            identity.name, identity.environment
        );
        let mut stack = Stack::new(id, identity).with_description(description);
        let eqn = stack.conventions().eqn_default();

        let spa = CloudfrontSpa::new(
            &mut stack,
            "spa",
            lookup,
            CloudfrontSpaProps {
                sub_domain: Some(props.sub_domain.unwrap_or_else(|| eqn.clone())),
                certificate_arn: None,
                source_bucket: None,
                domain_name: props.domain_name,
            },
        )?;

        let mut source =
            GithubSourcePipeline::new(&mut stack, "pipeline", &eqn.to_lowercase(), props.source)?;
        SpaPipeline::add_stages(
            &mut stack,
            "build",
            &mut source.pipeline,
            &eqn,
            &source.source_artifact,
            spa.bucket.bucket_name(),
        )?;
        source.pipeline.build(&mut stack)?;

        stack.add_output(
            "SpaSite",
            Output::new(json!(format!("https://{}", spa.full_domain)))
                .with_description(format!("Project URL for {}", eqn)),
        );

        Ok(Self { stack, spa })
    }
}
