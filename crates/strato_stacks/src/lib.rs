//! Opinionated stacks composed from the low-level resource builders.
//!
//! Each stack owns a [`strato_core::Stack`], wires the conventional naming
//! and tagging through it, and exposes handles to the resources downstream
//! stacks care about. Stacks that resolve a VPC or hosted zone from the
//! target account take a [`strato_core::ContextLookup`].
//!
//! ```no_run
//! use std::path::Path;
//!
//! use strato_core::AppIdentity;
//! use strato_stacks::vpc::VpcStack;
//!
//! # fn main() -> Result<(), strato_stacks::StackError> {
//! let identity = AppIdentity::new("shop", "dev", "acme", "dev@acme.io")?;
//! let vpc = VpcStack::new("shop-dev-vpc", identity)?;
//! vpc.stack.synth().write_to(Path::new("cdk.out"))?;
//! # Ok(())
//! # }
//! ```

pub mod dns;
pub mod ecs;
pub mod error;
pub mod load_balancer;
pub mod pipeline;
pub mod rails;
pub mod rds;
pub mod session_access;
pub mod spa;
pub mod vpc;

pub use error::{StackError, StackResult};
