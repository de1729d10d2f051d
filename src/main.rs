use anyhow::{Context, Result};

use rpc_price_dashboard::client::HttpDashboardApi;
use rpc_price_dashboard::config::Config;
use rpc_price_dashboard::poller::{Poller, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("Polling dashboard API at {}", config.api_base_url);

    let api = HttpDashboardApi::new(&config.api_base_url, config.request_timeout())
        .context("Failed to create dashboard API client")?;

    let poller = Poller::new(api, SharedState::default(), config.poll_interval());
    poller.run().await
}
