use std::io::Write;
use std::sync::Arc;

use profit_taker::config::{TraderConfig, VenueConfig};
use profit_taker::gateway::FixGateway;
use profit_taker::Supervisor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logger();

    log::info!("FIX Profit-Taker Bot Starting...");

    if let Err(e) = run().await {
        log::error!("Trader stopped: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let trader = TraderConfig::from_env()?;
    let venue = VenueConfig::from_env()?;

    // Systems are fully built before any session exists; loops start only
    // once the gateway is up.
    let supervisor = Supervisor::new(trader.systems, trader.poll_interval);
    let (gateway, events) = FixGateway::connect(&venue).await?;

    supervisor.run(Arc::new(gateway), events).await
}

fn init_logger() {
    env_logger::Builder::from_default_env()
        .format(|f, record| {
            writeln!(
                f,
                "[{} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
