//! Declared-reference matching.
//!
//! Projects declare assembly references as include strings such as
//! `Acme.Core, Version=14.1.0.0, Culture=neutral, PublicKeyToken=abc123`.
//! A reference belongs to the target family when it contains one of the
//! family keywords and the family's public key token.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::PackageConfig;

/// Captures the version from an include string.
#[allow(clippy::expect_used)]
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version=(.*?),").expect("constant pattern compiles"));

/// Matches declared references against the target package family.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    /// Keywords identifying family assemblies.
    keywords: Vec<String>,
    /// `PublicKeyToken=<token>` fragment required on family references.
    token_fragment: String,
}

impl ReferenceMatcher {
    /// Creates a matcher from the package configuration.
    #[must_use]
    pub fn new(config: &PackageConfig) -> Self {
        Self {
            keywords: config.reference_keywords.clone(),
            token_fragment: format!("PublicKeyToken={}", config.public_key_token),
        }
    }

    /// Returns true if the include string references the target family.
    #[must_use]
    pub fn is_family_reference(&self, include: &str) -> bool {
        self.keywords.iter().any(|k| include.contains(k.as_str()))
            && include.contains(&self.token_fragment)
    }

    /// Returns true if any of the references belongs to the family.
    #[must_use]
    pub fn has_family_reference(&self, references: &[String]) -> bool {
        references.iter().any(|r| self.is_family_reference(r))
    }

    /// Detects the installed family version from the first family reference.
    ///
    /// Returns `None` when there is no family reference or it carries no
    /// version.
    #[must_use]
    pub fn detect_version(&self, references: &[String]) -> Option<String> {
        let reference = references.iter().find(|r| self.is_family_reference(r))?;
        VERSION_RE
            .captures(reference)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ReferenceMatcher {
        ReferenceMatcher::new(&PackageConfig::default())
    }

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_family_reference_requires_keyword_and_token() {
        let m = matcher();
        assert!(m.is_family_reference(
            "Telerik.Sitefinity, Version=13.3.7600.0, Culture=neutral, PublicKeyToken=b28c218413bdf563"
        ));
        assert!(m.is_family_reference(
            "Progress.Sitefinity.Renderer, Version=14.1.7800.0, Culture=neutral, PublicKeyToken=b28c218413bdf563"
        ));
        assert!(!m.is_family_reference(
            "Telerik.Sitefinity, Version=13.3.7600.0, Culture=neutral, PublicKeyToken=0000000000000000"
        ));
        assert!(!m.is_family_reference(
            "Newtonsoft.Json, Version=12.0.0.0, Culture=neutral, PublicKeyToken=b28c218413bdf563"
        ));
    }

    #[test]
    fn test_detect_version_uses_first_family_reference() {
        let m = matcher();
        let references = refs(&[
            "System.Web",
            "Telerik.Sitefinity.Model, Version=13.3.7600.0, Culture=neutral, PublicKeyToken=b28c218413bdf563",
            "Telerik.Sitefinity, Version=14.0.0.0, Culture=neutral, PublicKeyToken=b28c218413bdf563",
        ]);
        assert_eq!(m.detect_version(&references).as_deref(), Some("13.3.7600.0"));
    }

    #[test]
    fn test_detect_version_absent() {
        let m = matcher();
        assert_eq!(m.detect_version(&refs(&["System.Web"])), None);
        assert_eq!(
            m.detect_version(&refs(&["Telerik.Sitefinity PublicKeyToken=b28c218413bdf563"])),
            None
        );
        assert!(!m.has_family_reference(&refs(&["System.Web"])));
    }

    #[test]
    fn test_matchers_share_version_pattern() {
        let custom = ReferenceMatcher::new(&PackageConfig {
            reference_keywords: vec![String::from("Acme")],
            public_key_token: String::from("abc123"),
            ..PackageConfig::default()
        });
        let references =
            refs(&["Acme.Core, Version=2.1.0.0, Culture=neutral, PublicKeyToken=abc123"]);

        assert_eq!(custom.detect_version(&references).as_deref(), Some("2.1.0.0"));
        assert_eq!(matcher().detect_version(&references), None);
    }
}
