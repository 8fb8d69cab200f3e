mod cli;
mod infra;
mod routes;
mod server;

use invoice_audit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
