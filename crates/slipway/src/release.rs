use crate::cli::ReleaseArgs;
use slipway_core::errors::Result;
use slipway_core::release::{ReleaseOptions, run_release};

pub fn run(args: &ReleaseArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    run_release(&cwd, &options_from(args))
}

fn options_from(args: &ReleaseArgs) -> ReleaseOptions {
    let mut opts = ReleaseOptions::new(args.build_number);
    opts.modules_to_release = args.module.clone();
    opts.modules_to_force_release = args.force_release.clone();
    if args.no_push {
        opts.push_tags = Some(false);
    }
    opts.revert_changes = !args.no_revert;
    opts.skip_tests = args.skip_tests;
    if !args.goal.is_empty() {
        opts.goals = Some(args.goal.clone());
    }
    opts
}
