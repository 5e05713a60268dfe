use clap::{Args, Parser, Subcommand};

/// Slipway CLI – release a multi-module repository as one atomic operation
#[derive(Debug, Parser)]
#[command(name = "slipway", version, about, long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize Slipway in the current repository
    Init,

    /// Tag and build a release of every changed module
    Release(ReleaseArgs),
}

#[derive(Debug, Args, Default)]
pub struct ReleaseArgs {
    /// Build number appended to each module's version, e.g. 1.0-SNAPSHOT
    /// with build number 7 releases as 1.0.7
    #[arg(short, long, value_name = "NUMBER")]
    pub build_number: u64,

    /// Restrict tagging and the build to these modules (their changed
    /// dependencies are still versioned)
    #[arg(short, long, num_args = 1.., value_name = "MODULE")]
    pub module: Vec<String>,

    /// Release these modules even when they have not changed since their
    /// last release
    #[arg(long, num_args = 1.., value_name = "MODULE")]
    pub force_release: Vec<String>,

    /// Create tags locally without pushing them to the remote
    #[arg(long)]
    pub no_push: bool,

    /// Tolerate a failed revert of the version commit after a successful
    /// build instead of treating it as a release failure
    #[arg(long)]
    pub no_revert: bool,

    /// Ask the build to skip running tests
    #[arg(long)]
    pub skip_tests: bool,

    /// Override the configured build goals
    #[arg(short, long, num_args = 1.., value_name = "GOAL")]
    pub goal: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init() {
        let cli = Cli::try_parse_from(["slipway", "init"]).unwrap();
        match cli.command {
            Commands::Init => {}
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn release_requires_a_build_number() {
        assert!(Cli::try_parse_from(["slipway", "release"]).is_err());

        let cli = Cli::try_parse_from(["slipway", "release", "-b", "7"]).unwrap();
        match cli.command {
            Commands::Release(args) => {
                assert_eq!(args.build_number, 7);
                assert!(args.module.is_empty());
                assert!(!args.no_push);
                assert!(!args.no_revert);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_release_with_all_options() {
        let cli = Cli::try_parse_from([
            "slipway",
            "release",
            "--build-number",
            "12",
            "-m",
            "core",
            "app",
            "--force-release",
            "docs",
            "--no-push",
            "--no-revert",
            "--skip-tests",
            "-g",
            "verify",
            "dist",
        ])
        .unwrap();

        match cli.command {
            Commands::Release(args) => {
                assert_eq!(args.build_number, 12);
                assert_eq!(args.module, vec!["core", "app"]);
                assert_eq!(args.force_release, vec!["docs"]);
                assert!(args.no_push);
                assert!(args.no_revert);
                assert!(args.skip_tests);
                assert_eq!(args.goal, vec!["verify", "dist"]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_a_non_numeric_build_number() {
        assert!(Cli::try_parse_from(["slipway", "release", "-b", "seven"]).is_err());
    }
}
