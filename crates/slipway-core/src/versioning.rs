use std::collections::BTreeMap;

/// Decides whether a version string marks ongoing development rather than a
/// fixed release, for resolution purposes.
///
/// Injectable so alternate versioning schemes can be substituted without
/// touching the resolution algorithm.
pub trait FloatingVersion {
    /// True if the version should be rewritten during a release.
    fn is_floating(&self, version: &str) -> bool;

    /// The version with the floating marker removed. Returns the input
    /// unchanged for non-floating versions.
    fn base_version(&self, version: &str) -> String;
}

/// The default policy: a version is floating iff it carries a fixed suffix.
///
/// This is a deliberately simple string check, not a semantic version
/// comparison.
#[derive(Debug, Clone)]
pub struct SnapshotSuffix {
    suffix: String,
}

impl SnapshotSuffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Default for SnapshotSuffix {
    fn default() -> Self {
        Self::new("-SNAPSHOT")
    }
}

impl FloatingVersion for SnapshotSuffix {
    fn is_floating(&self, version: &str) -> bool {
        version.ends_with(&self.suffix)
    }

    fn base_version(&self, version: &str) -> String {
        version
            .strip_suffix(&self.suffix)
            .unwrap_or(version)
            .to_string()
    }
}

/// Resolve a `${property}` version expression against a module's own
/// properties.
///
/// Expressions that do not resolve are returned verbatim: an unresolved
/// expression never looks floating, so it is left alone rather than
/// reported. Properties inherited from a parent are not visible here, which
/// can under-report unresolved dependencies.
pub fn resolve_version<'a>(version: &'a str, properties: &'a BTreeMap<String, String>) -> &'a str {
    if let Some(key) = version.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        return properties.get(key).map(String::as_str).unwrap_or(version);
    }
    version
}
