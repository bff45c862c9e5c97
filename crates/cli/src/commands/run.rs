use clap::Args;
use memoexec_cache::{
    git_revision_token, CacheConfig, CacheMode, CacheOutcome, ExecuteOptions, MemoizationCache,
};
use memoexec_core::{ExecutionResult, Invocation, Program, Verbosity};
use memoexec_task::SystemCommandExecutor;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Cache root; `-` disables caching [env: MEMOEXEC_CACHE_DIR]
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<String>,

    /// Re-run even when a cached result exists, replacing it
    #[arg(short, long)]
    force: bool,

    /// Run the command line through the platform shell
    #[arg(long)]
    shell: bool,

    /// How output is shown while the command runs (default: indicator,
    /// passthrough with --verbose)
    #[arg(long, value_name = "MODE")]
    output: Option<Verbosity>,

    /// Cache mode [env: MEMOEXEC_CACHE]
    #[arg(long, value_name = "MODE", value_parser = ["off", "read", "read-write", "write"])]
    cache_mode: Option<String>,

    /// Also store results of commands that exit with a nonzero code
    #[arg(long)]
    cache_failures: bool,

    /// Path left out of fingerprinting (repeatable)
    #[arg(long = "ignore", value_name = "PATH")]
    ignore: Vec<PathBuf>,

    /// Extra string folded into the fingerprint (repeatable)
    #[arg(long = "token", value_name = "TOKEN")]
    tokens: Vec<String>,

    /// Git checkout whose revision invalidates cached results (repeatable)
    #[arg(long = "git-source", value_name = "DIR")]
    git_sources: Vec<PathBuf>,

    /// Command and its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

impl RunArgs {
    fn verbosity(&self, verbose: bool) -> Verbosity {
        match self.output {
            Some(verbosity) => verbosity,
            None if verbose => Verbosity::Passthrough,
            None => Verbosity::Indicator,
        }
    }

    fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::from_env().with_cache_failures(self.cache_failures);
        if let Some(mode) = &self.cache_mode {
            config = config.with_mode(CacheMode::from(mode.clone()));
        }
        match super::resolve_cache_dir(self.cache_dir.as_deref()) {
            Some(dir) => config.with_base_dir(dir),
            None => config.with_mode(CacheMode::Off),
        }
    }

    fn invocation(&self, verbose: bool) -> eyre::Result<Invocation> {
        let (program, arguments) = self
            .command
            .split_first()
            .ok_or_else(|| eyre::eyre!("no command given"))?;

        let program = if self.shell {
            // Shell text is passed through verbatim
            Program::new(program.clone())
        } else {
            Program::from_words([program.clone()])?
        };

        let mut builder = Invocation::builder(program)
            .args(arguments.iter().cloned())
            .shell(self.shell)
            .verbosity(self.verbosity(verbose));
        if let Ok(dir) = std::env::current_dir() {
            builder = builder.working_dir(dir);
        }
        Ok(builder.build())
    }
}

/// Run the command and return the exit code to terminate with
pub fn execute(args: RunArgs, verbose: bool) -> eyre::Result<i32> {
    let config = args.cache_config();
    config.validate()?;
    let invocation = args.invocation(verbose)?;

    if verbose {
        if config.mode.is_enabled() {
            eprintln!("Cache directory: {} ({})", config.base_dir.display(), config.mode);
        } else {
            eprintln!("Caching disabled");
        }
    }

    let cache = MemoizationCache::new(SystemCommandExecutor::new(), config);

    let mut options = ExecuteOptions::new()
        .force(args.force)
        .tokens(args.tokens.iter().cloned());
    options.ignore_paths = args.ignore.clone();

    // Source tokens only matter when a fingerprint is computed
    if cache.config().mode.is_enabled() {
        for source in &args.git_sources {
            let token = git_revision_token(cache.executor(), source)?;
            if verbose {
                eprintln!("Git source: {token}");
            }
            options = options.token(token);
        }
    }

    tracing::debug!(command = %invocation.display_command(), ?options, "starting memoized run");
    let started = Instant::now();
    let (result, outcome) = cache.execute_with_outcome(&invocation, &options)?;

    if verbose {
        match outcome {
            CacheOutcome::Hit => eprintln!("Reusing cached result"),
            CacheOutcome::Forced => eprintln!("Re-executed (forced)"),
            CacheOutcome::Miss | CacheOutcome::Bypassed => eprintln!("Executed"),
        }
        eprintln!("Elapsed: {:.2}s", started.elapsed().as_secs_f64());
    }

    surface_output(&result, outcome, invocation.verbosity());
    Ok(exit_code_for(&result))
}

/// Print what the run itself did not already show
fn surface_output(result: &ExecutionResult, outcome: CacheOutcome, verbosity: Verbosity) {
    // Passthrough echoed during the run and hits re-emit stdout themselves
    if verbosity == Verbosity::Indicator && !outcome.is_hit() {
        write_out(&mut std::io::stdout(), &result.stdout);
    }
    if !result.success() && verbosity != Verbosity::Passthrough {
        write_out(&mut std::io::stderr(), &result.stderr);
    }
}

fn write_out(stream: &mut impl Write, text: &str) {
    let _ = stream.write_all(text.as_bytes());
    let _ = stream.flush();
}

/// The child's exit code, or 1 for a failure that reports none
fn exit_code_for(result: &ExecutionResult) -> i32 {
    match result.exit_code {
        0 => 0,
        code if code > 0 => code,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        Harness::parse_from(std::iter::once("run").chain(args.iter().copied())).run
    }

    #[test]
    fn test_trailing_command_keeps_hyphen_arguments() {
        let args = parse(&["--force", "--", "ls", "-la", "--color"]);
        assert!(args.force);
        assert_eq!(args.command, vec!["ls", "-la", "--color"]);
    }

    #[test]
    fn test_verbosity_selection() {
        assert_eq!(parse(&["true"]).verbosity(false), Verbosity::Indicator);
        assert_eq!(parse(&["true"]).verbosity(true), Verbosity::Passthrough);
        assert_eq!(
            parse(&["--output", "silent", "true"]).verbosity(true),
            Verbosity::Silent
        );
    }

    #[test]
    fn test_dash_cache_dir_disables_caching() {
        let config = parse(&["--cache-dir", "-", "true"]).cache_config();
        assert_eq!(config.mode, CacheMode::Off);
    }

    #[test]
    fn test_cache_flags() {
        let config = parse(&[
            "--cache-dir",
            "/tmp/memo",
            "--cache-mode",
            "read",
            "--cache-failures",
            "true",
        ])
        .cache_config();
        assert_eq!(config.base_dir, PathBuf::from("/tmp/memo"));
        assert_eq!(config.mode, CacheMode::Read);
        assert!(config.cache_failures);
    }

    #[test]
    fn test_shell_invocation_keeps_command_text() {
        let args = parse(&["--shell", "echo hi | tr a-z A-Z"]);
        let invocation = args.invocation(false).unwrap();
        assert!(invocation.use_shell());
        assert_eq!(invocation.shell_command_line(), "echo hi | tr a-z A-Z");
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code_for(&ExecutionResult::new(0, "", "")), 0);
        assert_eq!(exit_code_for(&ExecutionResult::new(3, "", "")), 3);
        assert_eq!(exit_code_for(&ExecutionResult::new(-1, "", "")), 1);
    }
}
