use crate::types::VersionName;

/// An immutable annotated-tag value: the tag name plus the version and
/// build number it encodes. Created once per module that will be released,
/// bound to the branch tip when saved, and either pushed or discarded on
/// rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedTag {
    name: String,
    business_version: String,
    build_number: u64,
}

impl AnnotatedTag {
    pub fn new(name: impl Into<String>, version: &VersionName) -> Self {
        Self {
            name: name.into(),
            business_version: version.business_version().to_string(),
            build_number: version.build_number(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn business_version(&self) -> &str {
        &self.business_version
    }

    pub fn build_number(&self) -> u64 {
        self.build_number
    }

    /// The annotated-tag message body: a small JSON object so later runs
    /// (and humans) can recover what the tag encodes.
    pub fn message(&self) -> String {
        serde_json::json!({
            "version": self.business_version,
            "buildNumber": self.build_number,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_encodes_version_and_build_number() {
        let tag = AnnotatedTag::new("app-2.0.7", &VersionName::new("2.0", 7));
        let parsed: serde_json::Value = serde_json::from_str(&tag.message()).unwrap();
        assert_eq!(parsed["version"], "2.0");
        assert_eq!(parsed["buildNumber"], 7);
    }

    #[test]
    fn tag_values_are_plain_data() {
        let version = VersionName::new("1.0", 3);
        let a = AnnotatedTag::new("core-1.0.3", &version);
        let b = AnnotatedTag::new("core-1.0.3", &version);
        assert_eq!(a, b);
    }
}
