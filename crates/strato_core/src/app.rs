//! Application identity supplied once per synthesis pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identity of the application a template is synthesized for.
///
/// Immutable once validated; every derived name and tag is a pure function of
/// these four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Application name.
    pub name: String,
    /// Deployment environment (e.g. develop, staging, prod).
    pub environment: String,
    /// Organization that owns this app/stack.
    pub org_name: String,
    /// Author that constructed this app/stack.
    pub author: String,
}

impl AppIdentity {
    /// Create a validated identity. Name and environment must be non-empty;
    /// an empty value here would produce degenerate resource names.
    pub fn new(
        name: impl Into<String>,
        environment: impl Into<String>,
        org_name: impl Into<String>,
        author: impl Into<String>,
    ) -> CoreResult<Self> {
        let identity = Self {
            name: name.into(),
            environment: environment.into(),
            org_name: org_name.into(),
            author: author.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Load an identity from a YAML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let identity: AppIdentity = serde_yaml::from_str(&content)?;
        identity.validate()?;
        Ok(identity)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::InvalidIdentity("name cannot be empty".into()));
        }
        if self.environment.is_empty() {
            return Err(CoreError::InvalidIdentity(
                "environment cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether this identity targets a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "prod" | "production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(AppIdentity::new("app", "dev", "acme", "dev@acme.io").is_ok());
        assert!(AppIdentity::new("", "dev", "acme", "dev@acme.io").is_err());
        assert!(AppIdentity::new("app", "", "acme", "dev@acme.io").is_err());
    }

    #[test]
    fn test_is_production() {
        let prod = AppIdentity::new("app", "prod", "acme", "a").unwrap();
        let dev = AppIdentity::new("app", "dev", "acme", "a").unwrap();
        assert!(prod.is_production());
        assert!(!dev.is_production());
    }
}
