use dotenvy::dotenv;
use log::info;

use ticketdesk::main_module::{build_app_state, run_axum_server};
use ticketdesk::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env()?;
    info!(
        "Starting {} {} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.bind_address()
    );

    let app_state = build_app_state(&config).await?;
    run_axum_server(app_state, &config.bind_address()).await?;
    Ok(())
}
