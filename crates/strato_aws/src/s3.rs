//! S3 buckets, including static website hosting.

use serde_json::{json, Value};

use strato_core::{CoreResult, RemovalPolicy, Resource, Stack};

/// Properties for an S3 bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketProps {
    pub bucket_name: Option<String>,
    /// Serve the bucket as a static website with this index document. The
    /// error document defaults to the index document so single page apps can
    /// re-render on pushState routes.
    pub website_index_document: Option<String>,
    pub website_error_document: Option<String>,
    pub public_read_access: bool,
    /// KMS key ARN for server-side encryption.
    pub encryption_key_arn: Option<Value>,
    pub block_public_access: bool,
    pub removal_policy: RemovalPolicy,
}

/// Handle to an S3 bucket.
#[derive(Debug, Clone)]
pub struct BucketHandle {
    pub logical_id: String,
}

impl BucketHandle {
    pub fn bucket_name(&self) -> Value {
        Stack::r#ref(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        Stack::get_att(&self.logical_id, "Arn")
    }

    pub fn website_url(&self) -> Value {
        Stack::get_att(&self.logical_id, "WebsiteURL")
    }

    pub fn regional_domain_name(&self) -> Value {
        Stack::get_att(&self.logical_id, "RegionalDomainName")
    }
}

pub struct Bucket;

impl Bucket {
    pub fn new(stack: &mut Stack, id: &str, props: BucketProps) -> CoreResult<BucketHandle> {
        let mut resource = Resource::new("AWS::S3::Bucket")
            .prop(
                "BucketName",
                props.bucket_name.map(Value::String).unwrap_or(Value::Null),
            )
            .removal_policy(props.removal_policy);

        if let Some(index) = &props.website_index_document {
            let error = props
                .website_error_document
                .clone()
                .unwrap_or_else(|| index.clone());
            resource = resource.prop(
                "WebsiteConfiguration",
                json!({ "IndexDocument": index, "ErrorDocument": error }),
            );
        }
        if let Some(key_arn) = &props.encryption_key_arn {
            resource = resource.prop(
                "BucketEncryption",
                json!({
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": {
                            "SSEAlgorithm": "aws:kms",
                            "KMSMasterKeyID": key_arn,
                        }
                    }]
                }),
            );
        }
        if props.block_public_access {
            resource = resource.prop(
                "PublicAccessBlockConfiguration",
                json!({
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                }),
            );
        }

        stack.add_resource(id, resource)?;
        let handle = BucketHandle {
            logical_id: id.to_string(),
        };

        if props.public_read_access {
            stack.add_resource(
                &format!("{}Policy", id),
                Resource::new("AWS::S3::BucketPolicy")
                    .not_taggable()
                    .prop("Bucket", handle.bucket_name())
                    .prop(
                        "PolicyDocument",
                        json!({
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": "*",
                                "Action": "s3:GetObject",
                                "Resource": { "Fn::Join": ["", [handle.arn(), "/*"]] },
                            }]
                        }),
                    ),
            )?;
        }

        Ok(handle)
    }
}
