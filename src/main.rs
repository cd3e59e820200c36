//! Tank duel self-play runner
//!
//! Hosts a room, joins it with a second peer and lets two scripted gunners
//! play it out, then reports whether both replicas agree.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tank_duel::app::run_self_play;
use tank_duel::config::{Config, GameTuning};
use tank_duel::net::protocol::PlayerIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    info!(
        room = %config.room_code,
        tick_rate = config.tick_rate,
        max_turns = config.max_turns,
        "Starting tank duel self-play"
    );

    let report = tokio::select! {
        report = run_self_play(&config, GameTuning::default()) => report?,
        _ = shutdown_signal() => {
            info!("Interrupted before the duel finished");
            return Ok(());
        }
    };

    match report.knockout {
        Some(result) => info!(
            match_id = %report.match_id,
            winner = %result.winner,
            shots = report.host_view.shots_fired,
            "Match decided by knockout"
        ),
        None => info!(
            match_id = %report.match_id,
            shots = report.host_view.shots_fired,
            "Shot cap reached without a knockout"
        ),
    }

    for player in PlayerIndex::ALL {
        let host = report.host_view.tank(player).map(|t| t.health);
        let guest = report.guest_view.tank(player).map(|t| t.health);
        info!(player = %player, host = ?host, guest = ?guest, "Final health");
    }

    for record in &report.records {
        info!(record = %serde_json::to_string(record)?, "Match record");
    }

    if report.converged() {
        info!(seed = report.seed, "Replicas converged");
    } else {
        warn!(seed = report.seed, "Replicas diverged");
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
