mod cli;
mod demo;
mod infra;
mod routes;
mod scorecard;
mod server;

use pipeline_ebes::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
