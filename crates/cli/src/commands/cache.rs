use clap::Subcommand;
use memoexec_cache::{CacheConfig, CacheStore};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove every cached result
    Clear {
        /// Cache root to clear [env: MEMOEXEC_CACHE_DIR]
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<String>,
    },
    /// Print the cache root in effect
    Path,
}

impl CacheCommands {
    pub fn execute(self) -> eyre::Result<()> {
        match self {
            CacheCommands::Clear { cache_dir } => {
                let Some(root) = super::resolve_cache_dir(cache_dir.as_deref()) else {
                    eyre::bail!("`--cache-dir -` disables caching; there is nothing to clear");
                };
                let store = CacheStore::new(&root);
                let removed = store.clear()?;
                println!("✓ Removed {removed} cached result(s) from {}", root.display());
                Ok(())
            }
            CacheCommands::Path => {
                println!("{}", CacheConfig::from_env().base_dir.display());
                Ok(())
            }
        }
    }
}
