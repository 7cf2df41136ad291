use clap::{Parser, Subcommand};

use version_lens::lsp::server::{LogFormat, run_server};

#[derive(Parser)]
#[command(name = "version-lens")]
#[command(version, about = "Language Server showing npm version lenses for package.json")]
struct Cli {
    /// Format of the log file written to the data directory
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the data directory holding the cache and log file
    DataDir,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::DataDir) => {
            println!("{}", version_lens::config::data_dir().display());
            Ok(())
        }
        None => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_server(cli.log_format)),
    }
}
