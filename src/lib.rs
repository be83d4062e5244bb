mod cli;
mod infra;
mod list;
mod routes;
mod server;

use enrollment_core::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
