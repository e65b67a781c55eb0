mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use kpi_commission::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
