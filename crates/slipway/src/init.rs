use slipway_core::errors::Result;
use slipway_core::{Config, LocalRepo};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct InitReport {
    pub root: PathBuf,
    pub created_dir: bool,
    pub created_config: bool,
}

/// Initialize Slipway in the current working directory.
///
/// Unlike `release`, `init` does not walk up the directory tree: releases
/// run from the repository root, so the configuration must live there. The
/// same root check applies.
pub fn init_from_cwd(cwd: &Path) -> Result<InitReport> {
    LocalRepo::open(cwd, "origin")?;
    init_at_root(cwd)
}

fn init_at_root(root: &Path) -> Result<InitReport> {
    let dir = root.join(".slipway");

    let mut created_dir = false;
    let mut created_config = false;

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        created_dir = true;
    }

    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        fs::write(&config_path, Config::default_file_contents())?;
        created_config = true;
    }

    Ok(InitReport {
        root: root.to_path_buf(),
        created_dir,
        created_config,
    })
}
