use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use companion::{Command, Dashboard, Provider, config};
use personalize::{Language, Notifier, Suggestion};
use positions::beacon::{self, Beacon};
use relay::RelayState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: companion [dashboard | relay | simulate <trip_id>]";

const BEACON_INTERVAL: Duration = Duration::from_secs(5);

// Colombo Fort to Maradana
const ROUTE: [(f64, f64); 5] = [
    (6.9344, 79.8428),
    (6.9327, 79.8501),
    (6.9301, 79.8563),
    (6.9290, 79.8627),
    (6.9287, 79.8672),
];

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "dashboard".to_string());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    runtime.block_on(async move {
        match mode.as_str() {
            "dashboard" => dashboard().await,
            "relay" => serve_relay().await,
            "simulate" => {
                let trip_id = args.next().ok_or_else(|| anyhow!(USAGE))?;
                simulate(&trip_id).await
            }
            _ => Err(anyhow!(USAGE)),
        }
    })
}

/// Logs confirmations; spoken ones are tagged for a screen reader.
struct Console;

impl Notifier for Console {
    fn confirm(&self, message: &str, speak: bool) {
        info!(speak, "{message}");
    }
}

async fn dashboard() -> Result<()> {
    let provider = Provider::new()?;
    let dashboard = Dashboard::load(provider, Console).await?;

    let mut ranked = dashboard.ranked();
    let preferences = dashboard.preferences();
    tokio::spawn(async move {
        loop {
            let language = preferences.borrow().preferences.language;
            log_ranked(&ranked.borrow_and_update(), language);
            if ranked.changed().await.is_err() {
                break;
            }
        }
    });

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx));

    dashboard.run(rx).await;
    Ok(())
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("{e}"),
        }
    }
}

fn log_ranked(ranked: &[Suggestion], language: Language) {
    for (rank, suggestion) in ranked.iter().enumerate() {
        info!(
            rank = rank + 1,
            id = %suggestion.id,
            score = suggestion.score.unwrap_or_default(),
            "{}",
            suggestion.title.get(language)
        );
    }
}

async fn serve_relay() -> Result<()> {
    let addr = config::get_relay_addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, "relay listening");

    axum::serve(listener, relay::router(RelayState::default())).await.context("serving relay")
}

#[allow(clippy::cast_precision_loss)]
async fn simulate(trip_id: &str) -> Result<()> {
    let provider = Provider::new()?;
    let base_url = config::get_aggregator_url();
    let mut interval = tokio::time::interval(BEACON_INTERVAL);

    for (step, (lat, lon)) in ROUTE.iter().copied().cycle().enumerate() {
        interval.tick().await;

        let speed_kph = 20.0 + (step % 4) as f64 * 5.0;
        match beacon::send(&provider, &base_url, &Beacon::new(trip_id, lat, lon, speed_kph)).await {
            Ok(()) => info!(%trip_id, lat, lon, speed_kph, "beacon sent"),
            Err(e) => warn!(%trip_id, error = %e, "beacon failed"),
        }
    }
    Ok(())
}
