use crate::errors::{Result, SlipwayError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs the external build against the release-scoped module set.
///
/// Opaque to the release engine: the run either completes or fails. A trait
/// so the orchestrator can be exercised with a recording stub.
pub trait BuildRunner {
    fn run(&self, goals: &[String], modules_to_release: &[String], skip_tests: bool) -> Result<()>;
}

/// Invokes the configured build command as a child process.
///
/// Goals become arguments. The release subset and test policy are exported
/// through `SLIPWAY_MODULES` and `SLIPWAY_SKIP_TESTS` so any build tool can
/// pick them up.
#[derive(Debug)]
pub struct CommandRunner {
    program: String,
    working_dir: PathBuf,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, working_dir: &Path) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.to_path_buf(),
        }
    }
}

impl BuildRunner for CommandRunner {
    fn run(&self, goals: &[String], modules_to_release: &[String], skip_tests: bool) -> Result<()> {
        println!("Running the release build: {} {}", self.program, goals.join(" "));
        let mut cmd = command(&self.program);
        cmd.args(goals)
            .current_dir(&self.working_dir)
            .env("SLIPWAY_MODULES", modules_to_release.join(","));
        if skip_tests {
            cmd.env("SLIPWAY_SKIP_TESTS", "1");
        }
        let status = cmd.status()?;
        if !status.success() {
            return Err(SlipwayError::Build(format!(
                "{} {} failed with status {}",
                self.program,
                goals.join(" "),
                status
            )));
        }
        Ok(())
    }
}

/// Creates a `Command` that can resolve `.cmd` and `.bat` scripts on
/// Windows, where `std::process::Command` only auto-resolves `.exe`. The
/// invocation is wrapped through `cmd.exe /C` so PATHEXT applies.
fn command(program: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", program]);
        cmd
    } else {
        Command::new(program)
    }
}
