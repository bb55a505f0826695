//! # strato_core
//!
//! Construct and stack foundation for strato infrastructure templates.
//!
//! This crate provides the pieces every template builds on: the app identity,
//! the naming/tagging convention resolver, desired-state resource
//! declarations, template synthesis, opaque secret references, and the
//! synthesis-time lookup seam.
//!
//! ## Features
//!
//! - Environment-qualified names in dash, camel, underscore and path formats
//! - Namespaced convention tags applied to every taggable resource
//! - Deterministic template synthesis (same inputs, same bytes)
//! - By-value-or-by-lookup resource references resolved exactly once
//!
//! ## Example
//!
//! ```rust,no_run
//! use strato_core::{AppIdentity, NameFormat, Resource, Stack};
//! use serde_json::json;
//!
//! let identity = AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap();
//! let mut stack = Stack::new("app-dev", identity);
//!
//! let name = stack.conventions().eqn(NameFormat::Dash);
//! stack.add_resource(
//!     "bucket",
//!     Resource::new("AWS::S3::Bucket").prop("BucketName", json!(name.to_lowercase())),
//! ).unwrap();
//!
//! let template = stack.synth();
//! template.write_to(std::path::Path::new("./out")).unwrap();
//! ```

pub mod app;
pub mod conventions;
pub mod error;
pub mod lookup;
pub mod resource;
pub mod secret;
pub mod stack;

pub use app::AppIdentity;
pub use conventions::{Conventions, NameFormat};
pub use error::{CoreError, CoreResult};
pub use lookup::{
    resolve_vpc, ContextLookup, HostedZoneAttributes, VpcAttributes, VpcLookupOptions, VpcRef,
};
#[cfg(feature = "test-util")]
pub use lookup::MockContextLookup;
pub use resource::{Output, RemovalPolicy, Resource};
pub use secret::{SecretValue, TokenSource};
pub use stack::{Stack, Template};
