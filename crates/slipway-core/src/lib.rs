pub mod config;
pub mod errors;
pub mod invoker;
pub mod manifest;
pub mod reactor;
pub mod release;
pub mod repo;
pub mod tags;
pub mod types;
pub mod updater;
pub mod versioning;

// Re-export commonly used items
pub use config::Config;
pub use errors::{Result, SlipwayError, ValidationError};
pub use invoker::{BuildRunner, CommandRunner};
pub use manifest::{DESCRIPTOR_FILE, read_descriptor, render_descriptor, save_descriptor};
pub use reactor::{Reactor, ReleasableModule, UnresolvedDependency};
pub use release::{RELEASE_COMMIT_MESSAGE, ReleaseOptions, run_release, run_release_with};
pub use repo::{LocalRepo, RevertState};
pub use tags::AnnotatedTag;
pub use types::{ArtifactRef, ModuleDescriptor, VersionName};
pub use updater::{UpdateResult, update_versions};
pub use versioning::{FloatingVersion, SnapshotSuffix, resolve_version};
