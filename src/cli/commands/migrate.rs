use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let database = DatabaseManager::connect(&config.database).await?;
    let result = database.migrate().await;
    database.close().await;
    result?;

    output_success(&output_format, "Database migrations applied", None)
}
