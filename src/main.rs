use clap::Parser;
use correction_rag::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Search(args) => cli::search::run(args).await,
        Command::Prompt(args) => cli::prompt::run(args).await,
        Command::Correct(args) => cli::correct::run(args).await,
    }
}
