// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! salon-live: headless client for the salon dashboard's live updates.
//!
//! Signs in with a session token, keeps the notifications and appointments
//! caches in sync with the server and logs every change until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use salon_live::{Config, LiveSession};
use sl_core::{AppointmentScope, SessionState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// salon-live: live-update client for the salon dashboard
#[derive(Parser, Debug)]
#[command(name = "salon-live", version)]
#[command(about = "Mirror salon notifications and appointments from the live endpoint")]
struct Args {
    /// Config file (default: <config dir>/salon-live/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Live endpoint, overrides the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Read API base URL, overrides the config file
    #[arg(long)]
    api_url: Option<String>,

    /// Session token
    #[arg(long, env = "SALON_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Date whose appointments are mirrored, as YYYY-MM-DD (default: today)
    #[arg(short, long)]
    date: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> salon_live::Result<Config> {
    let mut config = Config::discover(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        config.realtime.endpoint = endpoint.clone();
    }
    if let Some(api_url) = &args.api_url {
        config.api.base_url = api_url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_config(&args)?;
    let date = match &args.date {
        Some(date) => AppointmentScope::parse(date)?.date,
        None => chrono::Local::now().date_naive(),
    };

    info!("Starting salon-live");
    info!("  Endpoint: {}", config.realtime.endpoint);
    info!("  API: {}", config.api.base_url);
    info!("  Date: {}", date);

    let session = LiveSession::from_config(&config, date)?;

    let mut state = session.connection().state_changes();
    let mut notifications = session.notifications().watch();
    let mut appointments = session.appointments().watch();

    match args.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            session.apply_session(&SessionState::authenticated(token));
            if let Err(e) = session.appointment_sync().refetch().await {
                warn!(error = %e, "initial appointment load failed");
            }
        }
        None => warn!("no session token given (--token or SALON_TOKEN); staying signed out"),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = state.changed() => {
                let state = *state.borrow_and_update();
                info!(?state, "connection state changed");
            }
            Ok(()) = notifications.changed() => {
                let feed = notifications.borrow_and_update().clone();
                let latest = feed.items().first().map(|n| n.title.clone()).unwrap_or_default();
                info!(total = feed.len(), unread = feed.unread_count(), %latest, "notifications updated");
            }
            Ok(()) = appointments.changed() => {
                let view = appointments.borrow_and_update().clone();
                info!(date = %view.date(), count = view.items().len(), "appointments updated");
            }
        }
    }

    info!("Shutting down");
    session.teardown();
    Ok(())
}
