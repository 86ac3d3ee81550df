use anyhow::Result;
use mailora_dedup::{config::GeneratorConfig, generator, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = GeneratorConfig::from_env()?;
    tokio::select! {
        res = generator::run(config) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("email generator stopped");
            Ok(())
        }
    }
}
