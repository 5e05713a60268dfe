use std::collections::BTreeMap;
use std::path::PathBuf;

/// One declared reference to another artifact: a parent, a dependency, or a
/// build plugin. The version is the raw declared string and may be a
/// `${property}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ArtifactRef {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// True when this reference points at the given module identity.
    pub fn points_at(&self, group: &str, name: &str) -> bool {
        self.group == group && self.name == name
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} {}", self.group, self.name, self.version)
    }
}

/// One module's descriptor, as read from its `module.toml`.
///
/// Mutated in place by the version resolution engine during a release
/// attempt, then persisted back over the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub group: String,
    pub name: String,
    pub version: String,
    pub parent: Option<ArtifactRef>,
    pub dependencies: Vec<ArtifactRef>,
    pub plugins: Vec<ArtifactRef>,
    pub properties: BTreeMap<String, String>,
    /// Absolute path of the descriptor file.
    pub manifest_path: PathBuf,
    /// Path of the module directory relative to the repository root.
    /// `.` for a module living at the root itself.
    pub relative_path: String,
}

/// The version a module carries through one release attempt.
///
/// The business version is the declared version with the floating suffix
/// stripped; the release version appends the build number. Both are pure
/// functions of their inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionName {
    business_version: String,
    build_number: u64,
    release_version: String,
}

impl VersionName {
    pub fn new(business_version: impl Into<String>, build_number: u64) -> Self {
        let business_version = business_version.into();
        let release_version = format!("{business_version}.{build_number}");
        Self {
            business_version,
            build_number,
            release_version,
        }
    }

    pub fn business_version(&self) -> &str {
        &self.business_version
    }

    pub fn build_number(&self) -> u64 {
        self.build_number
    }

    pub fn release_version(&self) -> &str {
        &self.release_version
    }
}
