use crate::errors::{Result, SlipwayError};
use crate::types::{ArtifactRef, ModuleDescriptor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use toml_edit::{DocumentMut, value};

/// File name of a module descriptor.
pub const DESCRIPTOR_FILE: &str = "module.toml";

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    module: RawIdentity,
    parent: Option<RawRef>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: Vec<RawRef>,
    #[serde(default)]
    plugins: Vec<RawRef>,
}

#[derive(Debug, Deserialize)]
struct RawIdentity {
    group: String,
    name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    group: String,
    name: String,
    version: String,
}

impl From<RawRef> for ArtifactRef {
    fn from(raw: RawRef) -> Self {
        ArtifactRef::new(raw.group, raw.name, raw.version)
    }
}

/// Read a module descriptor from disk.
///
/// `root` is the repository root, used to record the module's relative path
/// for tag bookkeeping and per-path git operations.
pub fn read_descriptor(manifest_path: &Path, root: &Path) -> Result<ModuleDescriptor> {
    let text = std::fs::read_to_string(manifest_path)
        .map_err(|e| crate::errors::io_error_with_path(e, manifest_path))?;
    let raw: RawDescriptor = toml::from_str(&text).map_err(|e| {
        SlipwayError::InvalidData(format!(
            "invalid module descriptor {}: {e}",
            manifest_path.display()
        ))
    })?;

    let module_dir = manifest_path.parent().unwrap_or(root);
    let relative_path = match module_dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            return Err(SlipwayError::InvalidData(format!(
                "module {} lies outside the repository root {}",
                manifest_path.display(),
                root.display()
            )));
        }
    };

    Ok(ModuleDescriptor {
        group: raw.module.group,
        name: raw.module.name,
        version: raw.module.version,
        parent: raw.parent.map(ArtifactRef::from),
        dependencies: raw.dependencies.into_iter().map(ArtifactRef::from).collect(),
        plugins: raw.plugins.into_iter().map(ArtifactRef::from).collect(),
        properties: raw.properties,
        manifest_path: manifest_path.to_path_buf(),
        relative_path,
    })
}

/// Render the descriptor's current version fields back onto its original
/// text, preserving formatting and comments.
///
/// Only the module version, the parent version, and dependency versions are
/// touched. Plugin versions are never rewritten by the release engine.
pub fn render_descriptor(descriptor: &ModuleDescriptor, original: &str) -> Result<String> {
    let mut doc: DocumentMut = original.parse().map_err(|e| {
        SlipwayError::InvalidData(format!(
            "failed to re-parse descriptor {}: {e}",
            descriptor.manifest_path.display()
        ))
    })?;

    doc["module"]["version"] = value(&descriptor.version);

    if let Some(parent) = &descriptor.parent {
        if doc.get("parent").is_some() {
            doc["parent"]["version"] = value(&parent.version);
        }
    }

    if let Some(deps) = doc
        .get_mut("dependencies")
        .and_then(|item| item.as_array_of_tables_mut())
    {
        for table in deps.iter_mut() {
            let (Some(group), Some(name)) = (
                table.get("group").and_then(|v| v.as_str()),
                table.get("name").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let resolved = descriptor
                .dependencies
                .iter()
                .find(|dep| dep.group == group && dep.name == name);
            if let Some(dep) = resolved {
                table["version"] = value(&dep.version);
            }
        }
    }

    Ok(doc.to_string())
}

/// Persist the descriptor over its original file, fully overwriting prior
/// content. Returns the path that was written.
pub fn save_descriptor(descriptor: &ModuleDescriptor) -> Result<std::path::PathBuf> {
    let path = &descriptor.manifest_path;
    let original =
        std::fs::read_to_string(path).map_err(|e| crate::errors::io_error_with_path(e, path))?;
    let rendered = render_descriptor(descriptor, &original)?;
    std::fs::write(path, rendered).map_err(|e| crate::errors::io_error_with_path(e, path))?;
    Ok(path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"# demo module
[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[parent]
group = "com.example"
name = "parent"
version = "1.0-SNAPSHOT"

[properties]
util-version = "1.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "util"
version = "${util-version}"

[[plugins]]
group = "dev.slipway"
name = "slipway"
version = "1.0-SNAPSHOT"
"#;

    fn write_descriptor(dir: &Path, text: &str) -> std::path::PathBuf {
        let path = dir.join(DESCRIPTOR_FILE);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn reads_identity_references_and_properties() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_descriptor(temp.path(), DESCRIPTOR);

        let descriptor = read_descriptor(&path, temp.path()).unwrap();
        assert_eq!(descriptor.group, "com.example");
        assert_eq!(descriptor.name, "app");
        assert_eq!(descriptor.version, "2.0-SNAPSHOT");
        assert_eq!(descriptor.relative_path, ".");
        assert_eq!(descriptor.parent.as_ref().unwrap().name, "parent");
        assert_eq!(descriptor.dependencies.len(), 1);
        assert_eq!(descriptor.dependencies[0].version, "${util-version}");
        assert_eq!(descriptor.plugins.len(), 1);
        assert_eq!(
            descriptor.properties.get("util-version").map(String::as_str),
            Some("1.0-SNAPSHOT")
        );
    }

    #[test]
    fn records_relative_path_for_nested_modules() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("modules/app");
        std::fs::create_dir_all(&nested).unwrap();
        let path = write_descriptor(&nested, DESCRIPTOR);

        let descriptor = read_descriptor(&path, temp.path()).unwrap();
        assert_eq!(descriptor.relative_path, "modules/app");
    }

    #[test]
    fn render_rewrites_versions_and_preserves_comments() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_descriptor(temp.path(), DESCRIPTOR);

        let mut descriptor = read_descriptor(&path, temp.path()).unwrap();
        descriptor.version = "2.0.7".to_string();
        descriptor.parent.as_mut().unwrap().version = "1.0.7".to_string();
        descriptor.dependencies[0].version = "1.0.7".to_string();

        let rendered = render_descriptor(&descriptor, DESCRIPTOR).unwrap();
        assert!(rendered.starts_with("# demo module"));
        assert!(rendered.contains("version = \"2.0.7\""));
        assert!(rendered.contains("version = \"1.0.7\""));
        assert!(!rendered.contains("${util-version}"));
        // plugin version stays floating: the engine never rewrites plugins
        assert!(rendered.contains("version = \"1.0-SNAPSHOT\""));
    }

    #[test]
    fn save_overwrites_the_original_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_descriptor(temp.path(), DESCRIPTOR);

        let mut descriptor = read_descriptor(&path, temp.path()).unwrap();
        descriptor.version = "2.0.9".to_string();
        let written = save_descriptor(&descriptor).unwrap();
        assert_eq!(written, path);

        let reread = std::fs::read_to_string(&path).unwrap();
        assert!(reread.contains("version = \"2.0.9\""));
    }

    #[test]
    fn invalid_descriptor_reports_the_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_descriptor(temp.path(), "[module\nname=\"broken\"");

        let err = read_descriptor(&path, temp.path()).unwrap_err();
        assert!(format!("{err}").contains("module.toml"));
    }
}
