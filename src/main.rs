use yaya_webhook::{App, ConfigBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment.
    dotenvy::dotenv().ok();

    let config = ConfigBuilder::new().from_env().build()?;
    yaya_webhook::init_tracing_with_config(&config);

    App::with_config(config)?.serve().await?;

    Ok(())
}
