use crate::config::Config;
use crate::errors::{Result, SlipwayError, ValidationError};
use crate::invoker::{BuildRunner, CommandRunner};
use crate::reactor::Reactor;
use crate::repo::LocalRepo;
use crate::tags::AnnotatedTag;
use crate::updater::{self, UpdateResult};
use crate::versioning::SnapshotSuffix;
use std::path::{Path, PathBuf};

/// Message of the commit that carries the rewritten descriptors.
pub const RELEASE_COMMIT_MESSAGE: &str = "Incremented versions";

const REVERT_FAILED_MESSAGE: &str =
    "Could not revert changes - working directory is no longer clean. Please revert changes manually";

/// Options for one release attempt, as supplied by the CLI.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Appended to each module's business version to form its release
    /// version.
    pub build_number: u64,
    /// When non-empty, restricts tagging and the build to these modules.
    pub modules_to_release: Vec<String>,
    /// Modules released even when judged unchanged.
    pub modules_to_force_release: Vec<String>,
    /// Overrides the configured push behavior when set.
    pub push_tags: Option<bool>,
    /// Whether the success path insists on reverting the version commit.
    pub revert_changes: bool,
    pub skip_tests: bool,
    /// Overrides the configured build goals when set.
    pub goals: Option<Vec<String>>,
}

impl ReleaseOptions {
    pub fn new(build_number: u64) -> Self {
        Self {
            build_number,
            modules_to_release: Vec::new(),
            modules_to_force_release: Vec::new(),
            push_tags: None,
            revert_changes: true,
            skip_tests: false,
            goals: None,
        }
    }
}

/// Run one release attempt against the repository at `root`.
pub fn run_release(root: &Path, opts: &ReleaseOptions) -> Result<()> {
    let config = Config::load(root)?;
    let runner = CommandRunner::new(config.build_command.clone(), root);
    run_release_with(root, opts, &config, &runner)
}

/// The release state machine:
/// clean check → rewrite → (abort | validate tags → commit → tag → build)
/// → revert. Tagging happens strictly before the build so a half-failed
/// build can never lead to silently reusing a version number; the cleanup
/// revert always runs and never masks the original failure.
pub fn run_release_with(
    root: &Path,
    opts: &ReleaseOptions,
    config: &Config,
    runner: &dyn BuildRunner,
) -> Result<()> {
    let mut repo = LocalRepo::open(root, config.remote.clone())?;
    repo.error_if_not_clean()?;

    let floating = SnapshotSuffix::default();
    let mut reactor = Reactor::from_workspace(
        &repo,
        config,
        opts.build_number,
        &opts.modules_to_force_release,
        &floating,
    )?;

    let update = updater::update_versions(&mut reactor, &floating);
    if !update.success() {
        println!("Going to revert changes because there was an error.");
        if !repo.revert_working_copy(&update.altered) {
            eprintln!("Warning: {REVERT_FAILED_MESSAGE}");
        }
        return Err(update_failure(update));
    }
    let changed = update.altered;

    let tags = match validate_tags(&mut repo, &reactor, &opts.modules_to_release) {
        Ok(tags) => tags,
        Err(e) => {
            // No commit was made yet: undo the rewrites before reporting.
            if !repo.revert_working_copy(&changed) {
                eprintln!("Warning: {REVERT_FAILED_MESSAGE}");
            }
            return Err(e);
        }
    };

    if let Err(e) = repo.commit_changes(RELEASE_COMMIT_MESSAGE) {
        if !repo.revert_working_copy(&changed) {
            eprintln!("Warning: {REVERT_FAILED_MESSAGE}");
        }
        return Err(e);
    }

    let push_tags = opts.push_tags.unwrap_or(config.push_tags);
    let goals = opts.goals.as_ref().unwrap_or(&config.goals);
    let outcome = tag_and_build(&repo, &tags, push_tags, runner, goals, opts);

    match outcome {
        Ok(()) => {
            if opts.revert_changes && !repo.revert_commit(&changed) {
                // An inconsistent committed state after an otherwise
                // successful release is a release-breaking condition.
                return Err(SlipwayError::Release(REVERT_FAILED_MESSAGE.to_string()));
            }
            revert_or_warn(&mut repo, &changed);
            Ok(())
        }
        Err(e) => {
            // The original failure must propagate, not be masked by a
            // secondary revert failure.
            revert_or_warn(&mut repo, &changed);
            Err(e)
        }
    }
}

/// Compute and validate every candidate tag before any tag is created.
///
/// A local duplicate fails immediately (the same build number was already
/// used here); remote duplicates are collected across the whole set so the
/// user sees every collision in one message.
fn validate_tags(
    repo: &mut LocalRepo,
    reactor: &Reactor,
    modules_to_release: &[String],
) -> Result<Vec<AnnotatedTag>> {
    let mut tags = Vec::new();
    for module in reactor.modules_in_build_order() {
        if !module.will_be_released() {
            println!(
                "No need to release {}, skipping...",
                module.descriptor.name
            );
            continue;
        }
        if !modules_to_release.is_empty() && !module.is_one_of(modules_to_release) {
            continue;
        }

        let tag_name = module.tag_name();
        if repo.has_local_tag(tag_name)? {
            let summary = format!("There is already a tag named {tag_name} in this repository.");
            return Err(ValidationError::new(
                summary.clone(),
                vec![
                    summary,
                    "It is likely that this version has been released before.".to_string(),
                    "Please try incrementing the build number and trying again.".to_string(),
                ],
            )
            .into());
        }
        tags.push(AnnotatedTag::new(tag_name, module.version()));
    }

    let names: Vec<String> = tags.iter().map(|tag| tag.name().to_string()).collect();
    let collisions = repo.remote_tags_among(&names)?;
    if !collisions.is_empty() {
        let summary =
            "Cannot release because there is already a tag with the same build number on the remote Git repo."
                .to_string();
        let mut messages = vec![summary.clone()];
        for collision in &collisions {
            messages.push(format!(
                " * There is already a tag named {collision} in the remote repo."
            ));
        }
        messages.push("Please try releasing again with a new build number.".to_string());
        return Err(ValidationError::new(summary, messages).into());
    }

    Ok(tags)
}

fn tag_and_build(
    repo: &LocalRepo,
    tags: &[AnnotatedTag],
    push_tags: bool,
    runner: &dyn BuildRunner,
    goals: &[String],
    opts: &ReleaseOptions,
) -> Result<()> {
    for tag in tags {
        println!("About to tag the repository with {}", tag.name());
        repo.create_tag(tag)?;
        if push_tags {
            repo.push_tag(tag.name())?;
        }
    }
    runner.run(goals, &opts.modules_to_release, opts.skip_tests)
}

fn revert_or_warn(repo: &mut LocalRepo, changed: &[PathBuf]) {
    if !repo.revert_commit(changed) {
        eprintln!("Warning: {REVERT_FAILED_MESSAGE}");
    }
}

fn update_failure(update: UpdateResult) -> SlipwayError {
    if let Some(unexpected) = update.unexpected {
        return SlipwayError::Release(format!(
            "Unexpected error while setting the release versions in the descriptors: {unexpected}"
        ));
    }
    let summary = "Cannot release with references to snapshot dependencies".to_string();
    let mut messages = vec![
        summary.clone(),
        "The following dependency errors were found:".to_string(),
    ];
    for error in &update.module_errors {
        messages.push(format!(" * {error}"));
    }
    ValidationError::new(summary, messages).into()
}
