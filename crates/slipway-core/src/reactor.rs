use crate::config::Config;
use crate::errors::{Result, SlipwayError, ValidationError};
use crate::manifest::{self, DESCRIPTOR_FILE};
use crate::repo::LocalRepo;
use crate::types::{ModuleDescriptor, VersionName};
use crate::versioning::FloatingVersion;
use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// A module reference that points at a sibling floating version which
/// cannot be located in the current release set. Accumulated per module,
/// fatal only in aggregate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{group}:{name} {version}")]
pub struct UnresolvedDependency {
    pub group: String,
    pub name: String,
    pub version: String,
}

/// One module's release state for the lifetime of an attempt.
#[derive(Debug, Clone)]
pub struct ReleasableModule {
    pub descriptor: ModuleDescriptor,
    version: VersionName,
    equivalent_version: Option<String>,
    tag_name: String,
    errors: Vec<String>,
    changed_manifest: Option<PathBuf>,
}

impl ReleasableModule {
    pub fn new(
        descriptor: ModuleDescriptor,
        version: VersionName,
        equivalent_version: Option<String>,
    ) -> Self {
        // Stable once computed: deterministic from the artifact name and
        // the release version.
        let tag_name = format!("{}-{}", descriptor.name, version.release_version());
        Self {
            descriptor,
            version,
            equivalent_version,
            tag_name,
            errors: Vec::new(),
            changed_manifest: None,
        }
    }

    pub fn version(&self) -> &VersionName {
        &self.version
    }

    /// The concrete version this module carries if released this attempt.
    pub fn new_version(&self) -> &str {
        self.version.release_version()
    }

    /// Non-empty exactly when the module is judged unchanged and reuses a
    /// prior release's version instead of producing a new one.
    pub fn equivalent_version(&self) -> Option<&str> {
        self.equivalent_version.as_deref()
    }

    pub fn will_be_released(&self) -> bool {
        self.equivalent_version.is_none()
    }

    /// What siblings should depend on: the release version if this module
    /// is released, otherwise the prior equivalent version.
    pub fn version_to_depend_on(&self) -> &str {
        match &self.equivalent_version {
            Some(equivalent) => equivalent,
            None => self.version.release_version(),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// A second, distinct state representing this module as the one being
    /// released: the equivalent version is cleared.
    pub fn create_releasable_version(&self) -> Self {
        Self::new(self.descriptor.clone(), self.version.clone(), None)
    }

    pub fn is_one_of(&self, module_names: &[String]) -> bool {
        module_names.iter().any(|name| *name == self.descriptor.name)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn set_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
    }

    pub fn changed_manifest(&self) -> Option<&Path> {
        self.changed_manifest.as_deref()
    }

    pub fn set_changed_manifest(&mut self, path: PathBuf) {
        self.changed_manifest = Some(path);
    }
}

/// The full release set, held in build order.
#[derive(Debug)]
pub struct Reactor {
    modules: Vec<ReleasableModule>,
}

impl Reactor {
    pub fn new(modules_in_build_order: Vec<ReleasableModule>) -> Self {
        Self {
            modules: modules_in_build_order,
        }
    }

    pub fn modules_in_build_order(&self) -> &[ReleasableModule] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut [ReleasableModule] {
        &mut self.modules
    }

    /// The specific module satisfying an identity, or an unresolved signal.
    ///
    /// Matching is by (group, name); the declared version is carried only
    /// for diagnostics since references may declare the version through a
    /// property expression.
    pub fn find(
        &self,
        group: &str,
        name: &str,
        version: &str,
    ) -> std::result::Result<&ReleasableModule, UnresolvedDependency> {
        self.modules
            .iter()
            .find(|module| module.descriptor.group == group && module.descriptor.name == name)
            .ok_or_else(|| UnresolvedDependency {
                group: group.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    /// Discover modules under the configured member patterns, order them by
    /// dependency, and decide per module whether it is released this
    /// attempt or passes through on a prior equivalent version.
    pub fn from_workspace(
        repo: &LocalRepo,
        config: &Config,
        build_number: u64,
        modules_to_force_release: &[String],
        floating: &dyn FloatingVersion,
    ) -> Result<Self> {
        let descriptors = discover_descriptors(repo.root(), &config.members)?;
        if descriptors.is_empty() {
            return Err(ValidationError::from_summary(format!(
                "No module descriptors ({DESCRIPTOR_FILE}) were found under the configured member patterns."
            ))
            .into());
        }
        let ordered = order_by_dependencies(descriptors)?;
        let module_dirs: Vec<String> = ordered.iter().map(|d| d.relative_path.clone()).collect();

        let mut releasing: BTreeSet<(String, String)> = BTreeSet::new();
        let mut modules = Vec::with_capacity(ordered.len());
        for descriptor in ordered {
            let business = floating.base_version(&descriptor.version);
            let version = VersionName::new(business, build_number);

            let depends_on_released = descriptor
                .parent
                .iter()
                .chain(descriptor.dependencies.iter())
                .any(|dep| releasing.contains(&(dep.group.clone(), dep.name.clone())));

            let equivalent = if depends_on_released {
                None
            } else {
                let children = nested_module_paths(&descriptor.relative_path, &module_dirs);
                find_equivalent_version(repo, &descriptor, &version, &children)?
            };

            let mut module = ReleasableModule::new(descriptor, version, equivalent);
            if module.is_one_of(modules_to_force_release) {
                module = module.create_releasable_version();
            }
            if module.will_be_released() {
                releasing.insert((
                    module.descriptor.group.clone(),
                    module.descriptor.name.clone(),
                ));
            }
            modules.push(module);
        }

        if releasing.is_empty() {
            let summary = "No module changes detected, so there is nothing to release.".to_string();
            return Err(ValidationError::new(
                summary.clone(),
                vec![
                    summary,
                    "Every module matches its last released tag.".to_string(),
                    "Use --force-release <module> to release a module anyway.".to_string(),
                ],
            )
            .into());
        }

        Ok(Self::new(modules))
    }
}

/// A module is unchanged when its directory is untouched since its highest
/// previously released tag for the same business version. Unchanged modules
/// reuse that tag's version. Child-module directories are excluded from the
/// comparison so an aggregator module is judged on its own files only.
fn find_equivalent_version(
    repo: &LocalRepo,
    descriptor: &ModuleDescriptor,
    version: &VersionName,
    child_modules: &[String],
) -> Result<Option<String>> {
    let prefix = format!("{}-{}.", descriptor.name, version.business_version());
    let tags = repo.local_tags_matching(&format!("{prefix}*"))?;
    let previous_build = tags
        .iter()
        .filter_map(|tag| tag.strip_prefix(&prefix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max();

    let Some(build) = previous_build else {
        return Ok(None);
    };
    let tag_name = format!("{prefix}{build}");
    if repo.has_changes_since(&tag_name, &descriptor.relative_path, child_modules)? {
        Ok(None)
    } else {
        Ok(Some(format!("{}.{build}", version.business_version())))
    }
}

/// Module directories lying inside `parent_path`, excluding the parent
/// itself.
fn nested_module_paths(parent_path: &str, module_dirs: &[String]) -> Vec<String> {
    module_dirs
        .iter()
        .filter(|dir| {
            if *dir == parent_path {
                return false;
            }
            if parent_path == "." {
                return true;
            }
            dir.starts_with(&format!("{parent_path}/"))
        })
        .cloned()
        .collect()
}

fn discover_descriptors(root: &Path, members: &[String]) -> Result<Vec<ModuleDescriptor>> {
    let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
    let root_descriptor = root.join(DESCRIPTOR_FILE);
    if root_descriptor.is_file() {
        paths.insert(root_descriptor);
    }
    for member in members {
        let pattern = root.join(member).join(DESCRIPTOR_FILE);
        let pattern = pattern.to_string_lossy().into_owned();
        let entries = glob::glob(&pattern)
            .map_err(|e| SlipwayError::Config(format!("invalid member pattern '{member}': {e}")))?;
        for entry in entries {
            let path = entry.map_err(|e| {
                SlipwayError::InvalidData(format!("failed to read module path: {e}"))
            })?;
            if path.is_file() {
                paths.insert(path);
            }
        }
    }

    let mut descriptors = Vec::with_capacity(paths.len());
    for path in paths {
        descriptors.push(manifest::read_descriptor(&path, root)?);
    }
    Ok(descriptors)
}

/// Kahn topological sort over intra-set parent/dependency edges: every
/// module comes after the modules it references.
fn order_by_dependencies(descriptors: Vec<ModuleDescriptor>) -> Result<Vec<ModuleDescriptor>> {
    let by_identity: FxHashMap<(String, String), usize> = descriptors
        .iter()
        .enumerate()
        .map(|(idx, d)| ((d.group.clone(), d.name.clone()), idx))
        .collect();

    let mut indegree: Vec<usize> = vec![0; descriptors.len()];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];
    for (idx, descriptor) in descriptors.iter().enumerate() {
        for dep in descriptor.parent.iter().chain(descriptor.dependencies.iter()) {
            if let Some(&dep_idx) = by_identity.get(&(dep.group.clone(), dep.name.clone())) {
                forward[dep_idx].push(idx);
                indegree[idx] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, &d)| if d == 0 { Some(idx) } else { None })
        .collect();
    let mut order: Vec<usize> = Vec::with_capacity(descriptors.len());
    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        for &next in &forward[idx] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != descriptors.len() {
        return Err(ValidationError::from_summary(
            "Cannot release because there is a dependency cycle among the modules.",
        )
        .into());
    }

    let mut slots: Vec<Option<ModuleDescriptor>> = descriptors.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|idx| slots[idx].take().expect("each index appears once"))
        .collect())
}
