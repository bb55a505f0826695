//! Naming and tagging conventions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::AppIdentity;
use crate::error::{CoreError, CoreResult};

/// Textual formats for environment-qualified names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameFormat {
    #[default]
    Dash,
    Camel,
    Underscore,
    Path,
}

impl NameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameFormat::Dash => "dash",
            NameFormat::Camel => "camel",
            NameFormat::Underscore => "underscore",
            NameFormat::Path => "path",
        }
    }

    /// Parse a format token. Unrecognized tokens are a configuration error,
    /// never silently defaulted.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "dash" => Ok(NameFormat::Dash),
            "camel" => Ok(NameFormat::Camel),
            "underscore" => Ok(NameFormat::Underscore),
            "path" => Ok(NameFormat::Path),
            other => Err(CoreError::InvalidNameFormat(other.to_string())),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            NameFormat::Dash,
            NameFormat::Camel,
            NameFormat::Underscore,
            NameFormat::Path,
        ]
    }
}

impl std::fmt::Display for NameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Naming/tagging convention resolver.
///
/// Wraps an [`AppIdentity`] and derives environment-qualified names and the
/// descriptive tag set applied to every provisioned resource. All derivations
/// are deterministic, so repeated synthesis runs produce identical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    identity: AppIdentity,
}

impl Conventions {
    pub fn new(identity: AppIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    /// Environment qualified name (TM). Convenience for generating consistent
    /// names across constructs; the format variants exist to play nicely with
    /// different provider naming constraints.
    pub fn eqn(&self, format: NameFormat) -> String {
        let AppIdentity {
            name, environment, ..
        } = &self.identity;
        match format {
            NameFormat::Dash => format!("{}-{}", name, environment),
            NameFormat::Camel => {
                let mut chars = environment.chars();
                match chars.next() {
                    Some(first) => format!(
                        "{}{}{}",
                        name,
                        first.to_uppercase(),
                        chars.as_str()
                    ),
                    None => name.clone(),
                }
            }
            NameFormat::Underscore => format!("{}_{}", name, environment),
            NameFormat::Path => format!("{}/{}", name, environment),
        }
    }

    /// Environment qualified name in the default (dash) format.
    pub fn eqn_default(&self) -> String {
        self.eqn(NameFormat::default())
    }

    /// Descriptive tags attached to every taggable resource in a stack.
    ///
    /// Keys are namespaced to avoid colliding with provider or user tags.
    /// Note that tags do not reach resources the provider creates internally
    /// on a construct's behalf (Elastic Beanstalk-managed instances being the
    /// known case); that propagation is owned by the provider, not this layer.
    pub fn tags(&self) -> BTreeMap<String, String> {
        let AppIdentity {
            name,
            environment,
            org_name,
            author,
        } = &self.identity;
        BTreeMap::from([
            ("strato:app-name".to_string(), name.clone()),
            ("strato:app-environment".to_string(), environment.clone()),
            ("strato:org-name".to_string(), org_name.clone()),
            ("strato:author".to_string(), author.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conventions() -> Conventions {
        Conventions::new(AppIdentity::new("app", "dev", "acme", "dev@acme.io").unwrap())
    }

    #[test]
    fn test_eqn_formats() {
        let c = conventions();
        assert_eq!(c.eqn(NameFormat::Dash), "app-dev");
        assert_eq!(c.eqn(NameFormat::Camel), "appDev");
        assert_eq!(c.eqn(NameFormat::Underscore), "app_dev");
        assert_eq!(c.eqn(NameFormat::Path), "app/dev");
    }

    #[test]
    fn test_eqn_default_is_dash() {
        assert_eq!(conventions().eqn_default(), "app-dev");
    }

    #[test]
    fn test_eqn_is_deterministic() {
        let c = conventions();
        for format in NameFormat::all() {
            assert_eq!(c.eqn(format), c.eqn(format));
        }
    }

    #[test]
    fn test_camel_capitalizes_only_first_letter() {
        let c = Conventions::new(
            AppIdentity::new("api", "staging", "acme", "dev@acme.io").unwrap(),
        );
        assert_eq!(c.eqn(NameFormat::Camel), "apiStaging");
    }

    #[test]
    fn test_tags_contain_exactly_four_namespaced_keys() {
        let tags = conventions().tags();
        assert_eq!(tags.len(), 4);
        assert_eq!(tags["strato:app-name"], "app");
        assert_eq!(tags["strato:app-environment"], "dev");
        assert_eq!(tags["strato:org-name"], "acme");
        assert_eq!(tags["strato:author"], "dev@acme.io");
    }

    #[test]
    fn test_parse_format_token() {
        assert_eq!(NameFormat::parse("dash").unwrap(), NameFormat::Dash);
        assert_eq!(NameFormat::parse("camel").unwrap(), NameFormat::Camel);
        assert_eq!(
            NameFormat::parse("underscore").unwrap(),
            NameFormat::Underscore
        );
        assert_eq!(NameFormat::parse("path").unwrap(), NameFormat::Path);
        assert!(matches!(
            NameFormat::parse("kebab"),
            Err(CoreError::InvalidNameFormat(_))
        ));
    }
}
