use error_stack::{Result, ResultExt};
use headline::{config, database, logging};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to migrate the database")]
struct MigrateError;

/// Applies the embedded migrations to the primary database.
async fn migrate() -> Result<(), MigrateError> {
  let config = config::Server::load().change_context(MigrateError)?;
  logging::init(&config.logging).change_context(MigrateError)?;

  let pool = database::Pool::new(&config.db, &config.db.primary)
    .await
    .change_context(MigrateError)?;

  pool.wait_until_healthy().await.change_context(MigrateError)?;
  pool.migrate().await.change_context(MigrateError)?;

  tracing::info!("database is up to date");
  Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
  match migrate().await {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      eprintln!("{error:?}");
      ExitCode::FAILURE
    }
  }
}
