use anyhow::Result;
use tracing_subscriber::EnvFilter;
use url_pulse::config::{self, Config};
use url_pulse::server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;

    init_tracing(&config);
    config.print_summary();

    server::run(config).await
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
