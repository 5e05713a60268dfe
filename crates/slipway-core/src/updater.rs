use crate::errors::SlipwayError;
use crate::manifest;
use crate::reactor::{Reactor, ReleasableModule};
use crate::types::ModuleDescriptor;
use crate::versioning::{FloatingVersion, resolve_version};
use std::path::PathBuf;

/// Identity of the release engine itself. A floating plugin reference to
/// slipway is a genuine self-reference, never a dependency problem.
pub const SELF_GROUP: &str = "dev.slipway";
pub const SELF_NAME: &str = "slipway";

/// The outcome of rewriting every module's descriptor in one attempt: the
/// files actually altered, the flattened per-module errors, and an optional
/// unexpected failure. The single decision point for "proceed to tagging"
/// vs "abort and roll back".
#[derive(Debug)]
pub struct UpdateResult {
    pub altered: Vec<PathBuf>,
    pub module_errors: Vec<String>,
    pub unexpected: Option<SlipwayError>,
}

impl UpdateResult {
    pub fn success(&self) -> bool {
        self.module_errors.is_empty() && self.unexpected.is_none()
    }
}

/// The per-module rewrite decisions, computed against the immutable release
/// set before any descriptor is touched. Keeping this as an explicit value
/// makes a single module's resolution testable in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModulePlan {
    release_version: String,
    parent_version: Option<String>,
    /// (index into descriptor.dependencies, resolved version)
    dependency_versions: Vec<(usize, String)>,
    errors: Vec<String>,
}

/// Rewrite every module's descriptor in build order, persisting each one
/// over its original file.
///
/// Faults are collected per module, never raised, so one module's failure
/// does not prevent discovering faults in every other module. Only an
/// unexpected failure (I/O, parse) short-circuits the remaining modules.
pub fn update_versions(reactor: &mut Reactor, floating: &dyn FloatingVersion) -> UpdateResult {
    let plans: Vec<ModulePlan> = reactor
        .modules_in_build_order()
        .iter()
        .map(|module| plan_module(module, reactor, floating))
        .collect();

    let mut altered = Vec::new();
    let mut unexpected = None;
    for (module, plan) in reactor.modules_mut().iter_mut().zip(plans) {
        if module.will_be_released() {
            println!(
                "Going to release {} {}",
                module.descriptor.name, plan.release_version
            );
        }
        apply_plan(&mut module.descriptor, &plan);
        module.set_errors(plan.errors);

        // Recorded as changed before the write so rollback has a correct
        // file list even if the write itself half-fails.
        let path = module.descriptor.manifest_path.clone();
        module.set_changed_manifest(path.clone());
        altered.push(path);

        if let Err(e) = manifest::save_descriptor(&module.descriptor) {
            unexpected = Some(e);
            break;
        }
    }

    let module_errors = reactor
        .modules_in_build_order()
        .iter()
        .flat_map(|module| module.errors().iter().cloned())
        .collect();

    UpdateResult {
        altered,
        module_errors,
        unexpected,
    }
}

/// Resolve one module's references against the release set.
fn plan_module(
    module: &ReleasableModule,
    reactor: &Reactor,
    floating: &dyn FloatingVersion,
) -> ModulePlan {
    let descriptor = &module.descriptor;
    let searching_from = descriptor.name.as_str();
    let mut errors = Vec::new();

    let parent_version = descriptor.parent.as_ref().and_then(|parent| {
        if !floating.is_floating(&parent.version) {
            return None;
        }
        match reactor.find(&parent.group, &parent.name, &parent.version) {
            Ok(found) => Some(found.version_to_depend_on().to_string()),
            Err(unresolved) => {
                errors.push(format!("The parent of {searching_from} is {unresolved}"));
                None
            }
        }
    });

    let mut dependency_versions = Vec::new();
    for (idx, dep) in descriptor.dependencies.iter().enumerate() {
        let effective = resolve_version(&dep.version, &descriptor.properties);
        if !floating.is_floating(effective) {
            continue;
        }
        match reactor.find(&dep.group, &dep.name, effective) {
            Ok(found) => {
                dependency_versions.push((idx, found.version_to_depend_on().to_string()));
            }
            Err(unresolved) => {
                errors.push(format!("{searching_from} references dependency {unresolved}"));
            }
        }
    }

    // Plugin versions are never auto-rewritten, only flagged: plugin
    // resolution at build time has different semantics than dependency
    // resolution. A self-reference to slipway is skipped silently.
    for plugin in &descriptor.plugins {
        let effective = resolve_version(&plugin.version, &descriptor.properties);
        if !floating.is_floating(effective) {
            continue;
        }
        if plugin.points_at(SELF_GROUP, SELF_NAME) {
            continue;
        }
        errors.push(format!(
            "{searching_from} references plugin {}:{} {effective}",
            plugin.group, plugin.name
        ));
    }

    ModulePlan {
        release_version: module.new_version().to_string(),
        parent_version,
        dependency_versions,
        errors,
    }
}

fn apply_plan(descriptor: &mut ModuleDescriptor, plan: &ModulePlan) {
    descriptor.version = plan.release_version.clone();
    if let (Some(parent), Some(version)) = (descriptor.parent.as_mut(), &plan.parent_version) {
        parent.version = version.clone();
    }
    for (idx, version) in &plan.dependency_versions {
        descriptor.dependencies[*idx].version = version.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{DESCRIPTOR_FILE, read_descriptor};
    use crate::types::VersionName;
    use crate::versioning::SnapshotSuffix;
    use std::fs;
    use std::path::Path;

    fn write_module(root: &Path, name: &str, text: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(DESCRIPTOR_FILE);
        fs::write(&path, text).unwrap();
        path
    }

    fn module_from(
        root: &Path,
        path: &Path,
        build_number: u64,
        equivalent: Option<&str>,
    ) -> ReleasableModule {
        let descriptor = read_descriptor(path, root).unwrap();
        let floating = SnapshotSuffix::default();
        let business = floating.base_version(&descriptor.version);
        ReleasableModule::new(
            descriptor,
            VersionName::new(business, build_number),
            equivalent.map(|v| v.to_string()),
        )
    }

    const CORE: &str = r#"[module]
group = "com.example"
name = "core"
version = "1.0-SNAPSHOT"
"#;

    const APP: &str = r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "core"
version = "1.0-SNAPSHOT"
"#;

    #[test]
    fn rewrites_sibling_dependencies_to_release_versions() {
        let temp = tempfile::tempdir().unwrap();
        let core_path = write_module(temp.path(), "core", CORE);
        let app_path = write_module(temp.path(), "app", APP);

        let mut reactor = Reactor::new(vec![
            module_from(temp.path(), &core_path, 7, None),
            module_from(temp.path(), &app_path, 7, None),
        ]);

        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(result.success());
        assert_eq!(result.altered.len(), 2);

        let core = fs::read_to_string(&core_path).unwrap();
        assert!(core.contains("version = \"1.0.7\""));
        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"2.0.7\""));
        assert!(app.contains("version = \"1.0.7\""));
        assert!(!app.contains("SNAPSHOT"));
    }

    #[test]
    fn pass_through_modules_resolve_to_their_equivalent_version() {
        let temp = tempfile::tempdir().unwrap();
        let core_path = write_module(temp.path(), "core", CORE);
        let app_path = write_module(temp.path(), "app", APP);

        let mut reactor = Reactor::new(vec![
            module_from(temp.path(), &core_path, 7, Some("1.0.3")),
            module_from(temp.path(), &app_path, 7, None),
        ]);

        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(result.success());

        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"1.0.3\""));
    }

    #[test]
    fn unresolvable_sibling_reference_yields_one_fault_and_leaves_the_reference() {
        let temp = tempfile::tempdir().unwrap();
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "x"
version = "1.0-SNAPSHOT"
"#,
        );

        let mut reactor = Reactor::new(vec![module_from(temp.path(), &app_path, 7, None)]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());

        assert!(!result.success());
        assert_eq!(result.module_errors.len(), 1);
        assert_eq!(
            result.module_errors[0],
            "app references dependency com.example:x 1.0-SNAPSHOT"
        );
        // The reference stays untouched; the file is still recorded as
        // changed because its own version was rewritten.
        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"1.0-SNAPSHOT\""));
        assert_eq!(result.altered, vec![app_path]);
    }

    #[test]
    fn missing_parent_is_reported_and_left_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[parent]
group = "com.example"
name = "parent"
version = "1.0-SNAPSHOT"
"#,
        );

        let mut reactor = Reactor::new(vec![module_from(temp.path(), &app_path, 7, None)]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());

        assert_eq!(
            result.module_errors,
            vec!["The parent of app is com.example:parent 1.0-SNAPSHOT"]
        );
    }

    #[test]
    fn parent_in_the_release_set_is_rewritten() {
        let temp = tempfile::tempdir().unwrap();
        let parent_path = write_module(
            temp.path(),
            "parent",
            r#"[module]
group = "com.example"
name = "parent"
version = "1.0-SNAPSHOT"
"#,
        );
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[parent]
group = "com.example"
name = "parent"
version = "1.0-SNAPSHOT"
"#,
        );

        let mut reactor = Reactor::new(vec![
            module_from(temp.path(), &parent_path, 5, None),
            module_from(temp.path(), &app_path, 5, None),
        ]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(result.success());

        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"1.0.5\""));
    }

    #[test]
    fn property_indirection_is_resolved_against_own_properties() {
        let temp = tempfile::tempdir().unwrap();
        let core_path = write_module(temp.path(), "core", CORE);
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[properties]
core-version = "1.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "core"
version = "${core-version}"
"#,
        );

        let mut reactor = Reactor::new(vec![
            module_from(temp.path(), &core_path, 7, None),
            module_from(temp.path(), &app_path, 7, None),
        ]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(result.success());

        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"1.0.7\""));
        assert!(!app.contains("${core-version}"));
    }

    #[test]
    fn unresolvable_property_expression_is_skipped_silently() {
        let temp = tempfile::tempdir().unwrap();
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "core"
version = "${inherited-version}"
"#,
        );

        let mut reactor = Reactor::new(vec![module_from(temp.path(), &app_path, 7, None)]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());

        // Known gap: an expression that cannot be resolved from the
        // module's own properties is treated as not floating.
        assert!(result.success());
        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("${inherited-version}"));
    }

    #[test]
    fn floating_plugin_is_flagged_but_a_self_reference_is_not() {
        let temp = tempfile::tempdir().unwrap();
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[[plugins]]
group = "dev.slipway"
name = "slipway"
version = "1.0-SNAPSHOT"

[[plugins]]
group = "com.example"
name = "codegen"
version = "3.0-SNAPSHOT"
"#,
        );

        let mut reactor = Reactor::new(vec![module_from(temp.path(), &app_path, 7, None)]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());

        assert_eq!(
            result.module_errors,
            vec!["app references plugin com.example:codegen 3.0-SNAPSHOT"]
        );
        // Plugins keep their declared versions either way.
        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"3.0-SNAPSHOT\""));
    }

    #[test]
    fn non_floating_references_are_left_alone() {
        let temp = tempfile::tempdir().unwrap();
        let app_path = write_module(
            temp.path(),
            "app",
            r#"[module]
group = "com.example"
name = "app"
version = "2.0-SNAPSHOT"

[[dependencies]]
group = "com.example"
name = "released-lib"
version = "4.2"
"#,
        );

        let mut reactor = Reactor::new(vec![module_from(temp.path(), &app_path, 7, None)]);
        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(result.success());

        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("version = \"4.2\""));
    }

    #[test]
    fn io_failure_is_reported_as_unexpected_and_short_circuits() {
        let temp = tempfile::tempdir().unwrap();
        let core_path = write_module(temp.path(), "core", CORE);
        let app_path = write_module(temp.path(), "app", APP);

        let mut broken = module_from(temp.path(), &core_path, 7, None);
        broken.descriptor.manifest_path = temp.path().join("missing/module.toml");
        let mut reactor = Reactor::new(vec![broken, module_from(temp.path(), &app_path, 7, None)]);

        let result = update_versions(&mut reactor, &SnapshotSuffix::default());
        assert!(!result.success());
        assert!(result.unexpected.is_some());
        // The loop stopped before the second module was written.
        let app = fs::read_to_string(&app_path).unwrap();
        assert!(app.contains("2.0-SNAPSHOT"));
    }
}
