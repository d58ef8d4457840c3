// Diamond Price Estimator - Web Server
// Serves the prediction form and JSON API over the same estimator the terminal UI uses

use anyhow::{Context, Result};
use diamond_price::{api, startup, ArtifactError, Config, SeedOutcome};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    println!("🌐 Diamond Price Predictor - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env()?;

    let (estimator, report) = match startup(&config) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            if e.downcast_ref::<ArtifactError>().is_some() {
                eprintln!("   Set DIAMOND_MODEL_PATH / DIAMOND_FEATURES_PATH to the trained model files.");
            }
            std::process::exit(1);
        }
    };

    println!("✓ Database opened: {}", config.db_path.display());
    println!("✓ Model loaded: {} ({})", estimator.model_name(), estimator.fingerprint());
    if let Some(notice) = report.seed.notice() {
        match report.seed {
            SeedOutcome::Failed(_) => warn!("{}", notice),
            _ => info!("{}", notice),
        }
    }

    let app = api::router(Arc::new(estimator));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/diamonds/recent", config.bind_addr);
    println!("   UI:  http://{}", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
