//! Connects to the Easee cloud with the configured account, subscribes to
//! the configured charger's telemetry stream and prints decoded
//! observations until interrupted.
//!
//! Configuration comes from `Easee.toml` and/or `EASEE_*` environment
//! variables; at minimum `username`, `password` and `charger_id` must be
//! set. Log verbosity follows `RUST_LOG`.
//!
//! ```sh
//! EASEE_USERNAME=user@example.com EASEE_PASSWORD=... EASEE_CHARGER_ID=EH000001 \
//!     cargo run --bin easee-monitor
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use easee_client::auth::{AccountsApi, TokenManager, TokenSettings};
use easee_client::config::EaseeConfig;
use easee_client::stream::{StreamEvent, StreamSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = EaseeConfig::from_figment(&EaseeConfig::figment())
        .context("failed to load configuration")?;
    log::info!("Starting easee-monitor with {:?}", config);

    let charger_id = config
        .charger_id
        .clone()
        .context("no charger_id configured; set EASEE_CHARGER_ID")?;

    let api = AccountsApi::new(
        &config.rest_base_url,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    let tokens = Arc::new(TokenManager::new(
        api,
        Some(config.credentials()),
        TokenSettings::default(),
    ));

    if !tokens.ensure_authenticated().await {
        anyhow::bail!("initial authentication failed; check the configured credentials");
    }

    let check_loop = tokens.spawn_check_loop();

    let (subscriber, mut events) = StreamSubscriber::new(config, Arc::clone(&tokens));
    let stream = subscriber.spawn(charger_id);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event);
            }
        }
    }

    // Suppress reconnects, then cancel both timers' tasks outright.
    stream.shutdown();
    check_loop.abort();

    Ok(())
}

fn print_event(event: &StreamEvent) {
    match event {
        StreamEvent::Status(state) => println!("# stream {:?}", state),
        StreamEvent::ProductUpdate(value) => println!("product-update {}", value),
        StreamEvent::ChargerUpdate {
            charger_id,
            observation,
        } => {
            let charger = charger_id.as_deref().unwrap_or("-");
            let name = observation.name.unwrap_or("unknown");
            match (observation.display_text, observation.unit) {
                (Some(text), _) => {
                    println!("{} {} = {} ({})", charger, name, observation.value, text)
                }
                (None, Some(unit)) => {
                    println!("{} {} = {} {}", charger, name, observation.value, unit)
                }
                (None, None) => println!("{} {} = {}", charger, name, observation.value),
            }
        }
        StreamEvent::CommandResponse(value) => println!("command-response {}", value),
    }
}
