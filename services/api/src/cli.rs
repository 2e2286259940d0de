use crate::commands::{run_search, run_suggest, SearchArgs, SuggestArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use utility_providers::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Utility Provider Suggestions",
    about = "Serve or query utility provider suggestions for property onboarding",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print provider suggestions for an address as JSON
    Suggest(SuggestArgs),
    /// Search the provider directory by name or alias
    Search(SearchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Suggest(args) => run_suggest(args).await,
        Command::Search(args) => run_search(args),
    }
}
