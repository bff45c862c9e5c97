//! Invalidation tokens derived from source-control state

use memoexec_core::{Invocation, Program, Result, Verbosity};
use memoexec_task::CommandExecutor;
use std::path::Path;

/// Token identifying the checked-out revision of the git repository at `dir`.
///
/// Format: `git:<dir>@<describe>(<head>)`, where `<describe>` comes from
/// `git describe --tags --dirty --always` so uncommitted changes yield a
/// different token.
pub fn git_revision_token<E>(executor: &E, dir: &Path) -> Result<String>
where
    E: CommandExecutor + ?Sized,
{
    let describe = git_output(executor, dir, &["describe", "--tags", "--dirty", "--always"])?;
    let head = git_output(executor, dir, &["rev-parse", "HEAD"])?;

    let token = format!("git:{}@{}({})", dir.display(), describe, head);
    tracing::debug!(%token, "computed git revision token");
    Ok(token)
}

fn git_output<E>(executor: &E, dir: &Path, args: &[&str]) -> Result<String>
where
    E: CommandExecutor + ?Sized,
{
    let invocation = Invocation::builder(Program::new("git"))
        .args(args.iter().copied())
        .working_dir(dir)
        .verbosity(Verbosity::Silent)
        .build();

    let result = executor.execute(&invocation)?.ensure_success(&invocation)?;
    Ok(result.stdout.trim().to_string())
}
