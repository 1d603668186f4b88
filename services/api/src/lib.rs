mod cli;
mod infra;
mod routes;
mod server;

use flat_registry::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
