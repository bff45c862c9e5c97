use clap::Parser;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "memoexec")]
#[command(about = "Run external commands, reusing the output of identical earlier runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Report cache decisions and timings on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    memoexec_utils::tracing::init(default_level)
        .map_err(|e| eyre::eyre!("failed to initialize logging: {e}"))?;

    let exit_code = cli.command.execute(cli.verbose)?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
