use formosa::{config::Config, logging, system::SystemBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    logging::init_logging(&config.log_level);

    let system = SystemBuilder::new(config).build().await?;
    system.run().await?;

    Ok(())
}
