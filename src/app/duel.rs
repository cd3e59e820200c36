//! Self-play duel: host and guest peers in one process
//!
//! The host rolls the match start and hands it to the guest the way a lobby
//! would, then both peers run over the same room topic with a scripted
//! gunner on each side.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, GameTuning};
use crate::game::{MatchResult, MatchSession, MatchSnapshot, SessionError};
use crate::net::channel::ChannelHub;
use crate::net::peer::{spawn_peer, PeerCommand, PeerExit, PeerHandle, PeerSettings};
use crate::net::protocol::{MatchStart, PlayerIndex};
use crate::store::{MatchRecord, MemoryRecorder};
use crate::util::time::tick_duration;

/// Time allowed for both replicas to agree after the host stops playing
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a self-play run
#[derive(Debug, Clone)]
pub struct DuelReport {
    pub match_id: Uuid,
    pub room_code: String,
    pub seed: u64,
    /// Knockout result, if the match ended before the shot cap
    pub knockout: Option<MatchResult>,
    pub turn_limit_hit: bool,
    pub host_view: MatchSnapshot,
    pub guest_view: MatchSnapshot,
    pub exits: [PeerExit; 2],
    pub records: Vec<MatchRecord>,
}

impl DuelReport {
    /// Both replicas ended on the same healths
    pub fn converged(&self) -> bool {
        PlayerIndex::ALL.into_iter().all(|player| {
            let host = self.host_view.tank(player).map(|t| t.health);
            let guest = self.guest_view.tank(player).map(|t| t.health);
            host.is_some() && host == guest
        })
    }
}

/// Self-play errors
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("Failed to start session: {0}")]
    Session(#[from] SessionError),

    #[error("Peer task failed: {0}")]
    Peer(#[from] JoinError),

    #[error("Peer stopped before the match ended")]
    PeerGone,

    #[error("Replicas did not settle in time")]
    Stalled,
}

/// Run a full duel between two scripted peers
pub async fn run_self_play(config: &Config, tuning: GameTuning) -> Result<DuelReport, DuelError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let start = MatchStart::generate(&mut rng, config.field, &tuning);
    info!(
        match_id = %start.match_id,
        room = %config.room_code,
        seed,
        wind = start.wind,
        first_turn = %start.first_turn,
        "Hosting self-play duel"
    );

    let host_session = MatchSession::new(&start, PlayerIndex::One, tuning, rng.gen())?;
    let guest_session = MatchSession::new(&start, PlayerIndex::Two, tuning, rng.gen())?;

    // both subscribe before either peer can broadcast
    let hub = ChannelHub::default();
    let host_channel = hub.subscribe(&config.room_code);
    let guest_channel = hub.subscribe(&config.room_code);

    let recorder = Arc::new(MemoryRecorder::new());
    let settings = PeerSettings {
        tick_duration: tick_duration(config.tick_rate),
        snapshot_every: config.snapshot_every,
        event_rate_limit: config.event_rate_limit,
    };

    let host = spawn_peer(host_session, host_channel, recorder.clone(), settings);
    let guest = spawn_peer(guest_session, guest_channel, recorder.clone(), settings);

    for handle in [&host, &guest] {
        tokio::spawn(gunner(
            handle.watch_snapshots(),
            handle.commander(),
            ChaCha8Rng::seed_from_u64(rng.gen()),
            config.max_turns,
        ));
    }

    let mut host_watch = host.watch_snapshots();
    let ended = wait_until(&mut host_watch, |s| {
        s.result.is_some() || (s.shots_fired >= config.max_turns && s.projectile.is_none())
    })
    .await?;
    let knockout = ended.result;
    let turn_limit_hit = knockout.is_none();

    if turn_limit_hit {
        info!(shots = ended.shots_fired, "Shot cap reached, host leaving");
    }

    let mut guest_watch = guest.watch_snapshots();
    let settled = tokio::time::timeout(
        SETTLE_TIMEOUT,
        wait_until(&mut guest_watch, |s| {
            s.shots_fired == ended.shots_fired && s.projectile.is_none() && s.result == knockout
        }),
    )
    .await;
    match settled {
        Ok(result) => {
            result?;
        }
        Err(_) => return Err(DuelError::Stalled),
    }

    let host_view = host.snapshot();
    let guest_view = guest.snapshot();

    host.leave().await;
    let host_exit = drain(host).await?;
    let guest_exit = drain(guest).await?;

    let report = DuelReport {
        match_id: start.match_id,
        room_code: config.room_code.clone(),
        seed,
        knockout,
        turn_limit_hit,
        host_view,
        guest_view,
        exits: [host_exit, guest_exit],
        records: recorder.records(),
    };
    let pruned = hub.prune();
    debug!(pruned, remaining = hub.active_rooms(), "Room topics pruned");

    Ok(report)
}

async fn wait_until<F>(view: &mut watch::Receiver<MatchSnapshot>, done: F) -> Result<MatchSnapshot, DuelError>
where
    F: Fn(&MatchSnapshot) -> bool,
{
    loop {
        {
            let snapshot = view.borrow_and_update();
            if done(&*snapshot) {
                return Ok(snapshot.clone());
            }
        }
        if view.changed().await.is_err() {
            return Err(DuelError::PeerGone);
        }
    }
}

/// Log whatever the peer surfaced, then wait for it to stop
async fn drain(mut handle: PeerHandle) -> Result<PeerExit, DuelError> {
    while let Some(notice) = handle.try_notice() {
        debug!(notice = ?notice, "Peer notice");
    }
    Ok(handle.join().await?)
}

/// Fires a random shot every time its side gets the turn
async fn gunner(
    mut view: watch::Receiver<MatchSnapshot>,
    commands: mpsc::Sender<PeerCommand>,
    mut rng: ChaCha8Rng,
    max_turns: u32,
) {
    while view.changed().await.is_ok() {
        let snapshot = view.borrow_and_update().clone();
        if snapshot.result.is_some() || snapshot.shots_fired >= max_turns {
            return;
        }
        if !snapshot.input_enabled {
            continue;
        }

        let angle = rng.gen_range(30..=70);
        let power_percent = rng.gen_range(40..=90);
        debug!(player = %snapshot.local_player, angle, power_percent, "Gunner firing");

        if commands
            .send(PeerCommand::Fire { angle, power_percent })
            .await
            .is_err()
        {
            warn!(player = %snapshot.local_player, "Peer gone, gunner stopping");
            return;
        }
    }
}
