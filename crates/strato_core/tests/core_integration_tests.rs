//! Integration tests for the construct core.

use serde_json::json;
use strato_core::{
    resolve_vpc, AppIdentity, Conventions, CoreError, MockContextLookup, NameFormat, Output,
    Resource, Stack, VpcAttributes, VpcLookupOptions, VpcRef,
};
use tempfile::tempdir;

fn identity() -> AppIdentity {
    AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap()
}

#[test]
fn test_eqn_format_table() {
    let conventions = Conventions::new(identity());

    assert_eq!(conventions.eqn(NameFormat::Dash), "app-dev");
    assert_eq!(conventions.eqn(NameFormat::Camel), "appDev");
    assert_eq!(conventions.eqn(NameFormat::Underscore), "app_dev");
    assert_eq!(conventions.eqn(NameFormat::Path), "app/dev");
}

#[test]
fn test_invalid_format_token_fails() {
    let err = NameFormat::parse("screaming-snake").unwrap_err();
    assert!(matches!(err, CoreError::InvalidNameFormat(_)));
}

#[test]
fn test_tags_match_identity_fields() {
    let conventions = Conventions::new(
        AppIdentity::new("shop", "staging", "acme", "team@acme.io").unwrap(),
    );
    let tags = conventions.tags();

    assert_eq!(tags.len(), 4);
    assert_eq!(tags["strato:app-name"], "shop");
    assert_eq!(tags["strato:app-environment"], "staging");
    assert_eq!(tags["strato:org-name"], "acme");
    assert_eq!(tags["strato:author"], "team@acme.io");
}

#[test]
fn test_synthesized_template_round_trip() {
    let dir = tempdir().unwrap();

    let mut stack = Stack::new("app-dev", identity()).with_description("Test stack");
    stack
        .add_resource(
            "bucket",
            Resource::new("AWS::S3::Bucket").prop("BucketName", json!("app-dev")),
        )
        .unwrap();
    stack.add_output("BucketName", Output::new(Stack::r#ref("bucket")));

    let template = stack.synth();
    let path = template.write_to(dir.path()).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["Description"], "Test stack");
    assert_eq!(
        written["Resources"]["bucket"]["Properties"]["BucketName"],
        "app-dev"
    );
    assert_eq!(written["Outputs"]["BucketName"]["Value"], json!({"Ref": "bucket"}));
}

#[test]
fn test_every_taggable_resource_carries_convention_tags() {
    let mut stack = Stack::new("app-dev", identity());
    stack
        .add_resource("bucket", Resource::new("AWS::S3::Bucket"))
        .unwrap();
    stack
        .add_resource("vpc", Resource::new("AWS::EC2::VPC"))
        .unwrap();
    stack
        .add_resource(
            "webhook",
            Resource::new("AWS::CodePipeline::Webhook").not_taggable(),
        )
        .unwrap();

    let template = stack.synth();
    for logical_id in ["bucket", "vpc"] {
        let tags = template.resource(logical_id).unwrap()["Properties"]["Tags"]
            .as_array()
            .unwrap();
        assert_eq!(tags.len(), 4, "{} should carry the four convention tags", logical_id);
    }
    assert!(
        template.resource("webhook").unwrap()["Properties"]
            .get("Tags")
            .is_none(),
        "untaggable resources are the documented propagation gap"
    );
}

#[test]
fn test_repeated_synthesis_is_byte_stable() {
    let build = || {
        let mut stack = Stack::new("app-dev", identity());
        stack
            .add_resource("zulu", Resource::new("AWS::S3::Bucket"))
            .unwrap();
        stack
            .add_resource("alpha", Resource::new("AWS::EC2::VPC"))
            .unwrap();
        stack.synth().to_json_pretty().unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_vpc_reference_resolution() {
    let attributes = VpcAttributes {
        vpc_id: "vpc-abc".to_string(),
        cidr_block: None,
        availability_zones: vec![],
        public_subnet_ids: vec![],
        private_subnet_ids: vec![],
    };

    // By-value: collaborator is never consulted.
    let mut lookup = MockContextLookup::new();
    lookup.expect_lookup_vpc().times(0);
    let resolved = resolve_vpc(&lookup, VpcRef::from(attributes.clone())).unwrap();
    assert_eq!(resolved, attributes);

    // By-criteria: delegated once.
    let mut lookup = MockContextLookup::new();
    let returned = attributes.clone();
    lookup
        .expect_lookup_vpc()
        .times(1)
        .returning(move |_| Ok(returned.clone()));
    let resolved = resolve_vpc(&lookup, VpcRef::from(VpcLookupOptions::by_name("main"))).unwrap();
    assert_eq!(resolved.vpc_id, "vpc-abc");
}
