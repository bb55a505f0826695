//! Low-level AWS resource builders for `strato` stacks.
//!
//! Each module covers one service and exposes builders that register
//! CloudFormation resources on a [`strato_core::Stack`] and hand back small
//! handle types whose methods produce `Ref`/`Fn::GetAtt` tokens. Builders
//! never talk to AWS; they only shape template JSON.
//!
//! # Example
//!
//! ```no_run
//! use strato_core::{AppIdentity, Stack};
//! use strato_aws::ec2::{Vpc, VpcProps};
//!
//! # fn main() -> strato_core::CoreResult<()> {
//! let identity = AppIdentity::new("shop", "dev", "acme", "dev@acme.io")?;
//! let mut stack = Stack::new("shop-dev-vpc", identity);
//! let vpc = Vpc::new(&mut stack, "vpc", VpcProps::default())?;
//! let template = stack.synth();
//! # let _ = (vpc, template);
//! # Ok(())
//! # }
//! ```

pub mod acm;
pub mod cloudfront;
pub mod codebuild;
pub mod codepipeline;
pub mod ec2;
pub mod ecs;
pub mod elasticbeanstalk;
pub mod elbv2;
pub mod iam;
pub mod kms;
pub mod rds;
pub mod route53;
pub mod s3;
pub mod secretsmanager;
