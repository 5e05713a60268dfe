use crate::errors::{Result, SlipwayError, ValidationError};
use crate::tags::AnnotatedTag;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether this repository handle has already performed its one revert.
///
/// The orchestrator calls revert from two places (the success path and the
/// always-run cleanup), so the second call must be a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertState {
    NotReverted,
    Reverted,
}

enum RevertMode {
    /// Restore working-tree content from the last commit (nothing was
    /// committed yet).
    WorkingCopy,
    /// Restore content from the commit before the version-rewrite commit,
    /// scoped per path.
    PriorCommit,
}

/// Wraps tag, push, commit, and revert operations against one repository
/// clone and (optionally) one remote. No knowledge of modules.
#[derive(Debug)]
pub struct LocalRepo {
    root: PathBuf,
    remote: String,
    revert_state: RevertState,
    remote_tags: Option<Vec<String>>,
}

impl LocalRepo {
    /// Open the repository at `dir`, which must be the root of a git clone.
    pub fn open(dir: &Path, remote: impl Into<String>) -> Result<Self> {
        if !dir.join(".git").exists() {
            let summary;
            let mut messages = Vec::new();
            if let Some(git_root) = git_root_in_parents(dir) {
                summary =
                    "Releases can only be performed from the root folder of your Git repository."
                        .to_string();
                messages.push(summary.clone());
                messages.push(format!(
                    "{} is not the root of a Git repository.",
                    dir.display()
                ));
                messages.push(format!("Try running slipway from {}.", git_root.display()));
            } else {
                summary = "Releases can only be performed from Git repositories.".to_string();
                messages.push(summary.clone());
                messages.push(format!("{} is not a Git repository.", dir.display()));
            }
            return Err(ValidationError::new(summary, messages).into());
        }
        Ok(Self {
            root: dir.to_path_buf(),
            remote: remote.into(),
            revert_state: RevertState::NotReverted,
            remote_tags: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn revert_state(&self) -> RevertState {
        self.revert_state
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlipwayError::Git(format!(
                "git {} failed with status {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }

    fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.git(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Precondition check: refuse to release unless the working tree is
    /// completely clean. Uncommitted and untracked files are listed
    /// separately with remediation text.
    pub fn error_if_not_clean(&self) -> Result<()> {
        let status = self.git_stdout(&["status", "--porcelain"])?;
        if status.trim().is_empty() {
            return Ok(());
        }

        let mut uncommitted = Vec::new();
        let mut untracked = Vec::new();
        for line in status.lines() {
            if line.len() < 4 {
                continue;
            }
            let path = line[3..].to_string();
            if line.starts_with("??") {
                untracked.push(path);
            } else {
                uncommitted.push(path);
            }
        }

        let summary =
            "Cannot release with uncommitted changes. Please check the following files:".to_string();
        let mut messages = vec![summary.clone()];
        if !uncommitted.is_empty() {
            messages.push("Uncommitted:".to_string());
            for path in &uncommitted {
                messages.push(format!(" * {path}"));
            }
        }
        if !untracked.is_empty() {
            messages.push("Untracked:".to_string());
            for path in &untracked {
                messages.push(format!(" * {path}"));
            }
        }
        messages.push("Please commit or revert these changes before releasing.".to_string());
        Err(ValidationError::new(summary, messages).into())
    }

    /// Commit every tracked change in one commit.
    pub fn commit_changes(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-a", "-m", message])?;
        Ok(())
    }

    pub fn head_commit(&self) -> Result<String> {
        Ok(self.git_stdout(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// The commit a tag points at.
    pub fn tag_commit(&self, tag_name: &str) -> Result<String> {
        let rev = format!("{tag_name}^{{commit}}");
        Ok(self.git_stdout(&["rev-parse", &rev])?.trim().to_string())
    }

    pub fn has_local_tag(&self, tag_name: &str) -> Result<bool> {
        let out = self.git_stdout(&["tag", "--list", tag_name])?;
        Ok(out.lines().any(|line| line.trim() == tag_name))
    }

    /// All local tags matching a glob pattern.
    pub fn local_tags_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let out = self.git_stdout(&["tag", "--list", pattern])?;
        Ok(out
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// True when anything under `relative_path` changed between the tag and
    /// the branch tip, ignoring the given nested paths. An aggregator
    /// module's own changes must be distinguishable from its children's.
    pub fn has_changes_since(
        &self,
        tag_name: &str,
        relative_path: &str,
        exclude_paths: &[String],
    ) -> Result<bool> {
        let range = format!("{tag_name}..HEAD");
        let mut args = vec![
            "diff".to_string(),
            "--name-only".to_string(),
            range,
            "--".to_string(),
            relative_path.to_string(),
        ];
        for exclude in exclude_paths {
            args.push(format!(":(exclude){exclude}"));
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.git_stdout(&args)?;
        Ok(!out.trim().is_empty())
    }

    /// Create the annotated tag at the current branch tip.
    pub fn create_tag(&self, tag: &AnnotatedTag) -> Result<()> {
        self.git(&["tag", "-a", tag.name(), "-m", &tag.message()])?;
        Ok(())
    }

    fn has_remote(&self) -> Result<bool> {
        if self.remote.contains('/') || self.remote.contains(':') {
            // A URL rather than a remote name: always usable.
            return Ok(true);
        }
        let remotes = self.git_stdout(&["remote"])?;
        Ok(remotes.lines().any(|line| line.trim() == self.remote))
    }

    /// Push one tag to the configured remote. Skips with a warning when the
    /// remote does not exist, since the remote is optional by contract.
    pub fn push_tag(&self, tag_name: &str) -> Result<()> {
        if !self.has_remote()? {
            eprintln!(
                "Warning: remote '{}' is not configured; tag {} was created locally but not pushed",
                self.remote, tag_name
            );
            return Ok(());
        }
        let refspec = format!("refs/tags/{tag_name}");
        self.git(&["push", &self.remote, &refspec])?;
        Ok(())
    }

    /// The full remote tag set, fetched once per attempt and cached so an
    /// attempt never observes its own just-pushed tags mid-attempt.
    pub fn remote_tags(&mut self) -> Result<&[String]> {
        if self.remote_tags.is_none() {
            let tags = if self.has_remote()? {
                let out = self.git_stdout(&["ls-remote", "--tags", &self.remote])?;
                out.lines()
                    .filter_map(|line| line.split('\t').nth(1))
                    .filter_map(|r| r.strip_prefix("refs/tags/"))
                    .filter(|name| !name.ends_with("^{}"))
                    .map(|name| name.to_string())
                    .collect()
            } else {
                Vec::new()
            };
            self.remote_tags = Some(tags);
        }
        Ok(self.remote_tags.as_deref().unwrap_or_default())
    }

    /// Which of the given tag names already exist on the remote.
    pub fn remote_tags_among(&mut self, tag_names: &[String]) -> Result<Vec<String>> {
        let remote = self.remote_tags()?;
        Ok(tag_names
            .iter()
            .filter(|name| remote.iter().any(|r| r == *name))
            .cloned()
            .collect())
    }

    /// Restore each changed file's working-tree content from the last
    /// commit. Used when the version-rewrite commit was never made.
    ///
    /// Returns whether every file was reverted; individual failures are
    /// reported and do not stop the remaining files.
    pub fn revert_working_copy(&mut self, changed_files: &[PathBuf]) -> bool {
        self.revert_files(changed_files, RevertMode::WorkingCopy)
    }

    /// Undo the version-rewrite commit's effect on each changed file,
    /// scoped per path so unrelated commits are not touched.
    pub fn revert_commit(&mut self, changed_files: &[PathBuf]) -> bool {
        self.revert_files(changed_files, RevertMode::PriorCommit)
    }

    fn revert_files(&mut self, changed_files: &[PathBuf], mode: RevertMode) -> bool {
        if self.revert_state == RevertState::Reverted {
            return true;
        }
        let mut all_reverted = true;
        for file in changed_files {
            let relative = match file.strip_prefix(&self.root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => {
                    all_reverted = false;
                    eprintln!(
                        "Unable to revert changes to {} - it lies outside the repository",
                        file.display()
                    );
                    continue;
                }
            };
            let result = match mode {
                RevertMode::WorkingCopy => self.git(&["checkout", "--", &relative]),
                RevertMode::PriorCommit => self.git(&["checkout", "HEAD~1", "--", &relative]),
            };
            if let Err(e) = result {
                all_reverted = false;
                eprintln!(
                    "Unable to revert changes to {} - you may need to manually revert this file. Error was: {e}",
                    file.display()
                );
            }
        }
        self.revert_state = RevertState::Reverted;
        all_reverted
    }
}

fn git_root_in_parents(dir: &Path) -> Option<PathBuf> {
    let mut candidate = Some(dir);
    while let Some(current) = candidate {
        if current.join(".git").is_dir() {
            return Some(current.to_path_buf());
        }
        candidate = current.parent();
    }
    None
}
