use clap::Subcommand;
use memoexec_cache::CacheConfig;
use std::path::PathBuf;

pub mod cache;
pub mod run;

use self::cache::CacheCommands;
use self::run::RunArgs;

/// `--cache-dir` value that disables caching
pub const NO_CACHE_DIR: &str = "-";

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command through the memoization cache
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Manage the memoization cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

impl Commands {
    /// Execute the subcommand and return the process exit code
    pub fn execute(self, verbose: bool) -> eyre::Result<i32> {
        match self {
            Commands::Run(args) => run::execute(args, verbose),
            Commands::Cache { command } => command.execute().map(|()| 0),
        }
    }
}

/// Cache root selected by a `--cache-dir` flag: `None` when caching is
/// disabled, the environment's root when the flag is absent
pub fn resolve_cache_dir(flag: Option<&str>) -> Option<PathBuf> {
    match flag {
        Some(NO_CACHE_DIR) => None,
        Some(dir) => Some(memoexec_utils::xdg::expand_home(dir)),
        None => Some(CacheConfig::from_env().base_dir),
    }
}
