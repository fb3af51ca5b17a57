//! # OSF Web Main Entry Point

use osf_web::{config::ConfigLoader, db, mail, server::run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;
    db::migrate(&db).await?;

    let mailer = mail::from_config(&config.mail)?;

    run_server(config, db, mailer).await
}
