mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use utility_providers::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
