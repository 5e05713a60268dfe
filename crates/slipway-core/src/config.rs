use crate::errors::SlipwayError;
use std::path::Path;

/// Configuration for Slipway, loaded from `.slipway/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Glob patterns, relative to the repository root, under which module
    /// descriptors are discovered.
    pub members: Vec<String>,
    /// Name (or URL) of the remote used for tag pushes and remote tag
    /// lookups.
    pub remote: String,
    /// Whether tags are pushed to the remote as they are created.
    pub push_tags: bool,
    /// External build command invoked after tagging.
    pub build_command: String,
    /// Default goals passed to the build command.
    pub goals: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            members: vec!["*".to_string(), "*/*".to_string()],
            remote: "origin".to_string(),
            push_tags: true,
            build_command: "cargo".to_string(),
            goals: vec!["build".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from `.slipway/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load(root: &Path) -> Result<Self, SlipwayError> {
        let path = root.join(".slipway").join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let value: toml::Value = text
            .parse()
            .map_err(|e| SlipwayError::Config(format!("invalid config.toml: {e}")))?;

        let defaults = Self::default();

        let members = string_list(&value, "modules", "members").unwrap_or(defaults.members);
        if members.is_empty() {
            return Err(SlipwayError::Config(
                "modules.members must list at least one pattern".to_string(),
            ));
        }

        let remote = value
            .get("git")
            .and_then(|v| v.as_table())
            .and_then(|t| t.get("remote"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or(defaults.remote);

        let push_tags = value
            .get("git")
            .and_then(|v| v.as_table())
            .and_then(|t| t.get("push_tags"))
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.push_tags);

        let build_command = value
            .get("build")
            .and_then(|v| v.as_table())
            .and_then(|t| t.get("command"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or(defaults.build_command);

        let goals = string_list(&value, "build", "goals").unwrap_or(defaults.goals);

        Ok(Self {
            members,
            remote,
            push_tags,
            build_command,
            goals,
        })
    }

    /// Default content written by `slipway init`.
    pub fn default_file_contents() -> &'static str {
        r#"[modules]
members = ["*", "*/*"]

[git]
remote = "origin"
push_tags = true

[build]
command = "cargo"
goals = ["build"]
"#
    }
}

fn string_list(value: &toml::Value, table: &str, key: &str) -> Option<Vec<String>> {
    value
        .get(table)
        .and_then(|v| v.as_table())
        .and_then(|t| t.get(key))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
}
