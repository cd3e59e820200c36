//! Peer task: drives one `MatchSession` against its room channel
//!
//! The task owns the session outright. UI commands arrive over an mpsc
//! queue, opponent events over the room channel, and the fixed-rate ticker
//! advances the simulation. Snapshots go out on a watch channel so slow
//! renderers only ever see the latest frame.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::game::{Effects, MatchResult, MatchSession, MatchSnapshot, SnapshotBuilder};
use crate::store::{should_record, MatchRecord, MatchRecorder};
use crate::util::rate_limit::{InboundLimiter, INBOUND_EVENT_RATE_LIMIT};
use crate::util::time::{tick_duration, SIMULATION_TPS};

use super::channel::{Inbound, RoomChannel, TransportError};
use super::protocol::PeerEvent;

const COMMAND_QUEUE: usize = 32;
const NOTICE_QUEUE: usize = 16;

/// Commands from the local UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerCommand {
    Fire { angle: i32, power_percent: i32 },
    Leave,
}

/// Things the UI should surface to the player
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// An outbound event could not be delivered
    Transport(String),
    MatchOver(MatchResult),
    OpponentLeft,
}

/// Why the peer task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    /// Local player left
    Left,
    /// Opponent left the room
    OpponentLeft,
    /// Room channel closed underneath us
    TransportClosed,
}

/// Final state of a peer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerExit {
    pub cause: ExitCause,
    pub result: Option<MatchResult>,
}

/// Loop timing and limits
#[derive(Debug, Clone, Copy)]
pub struct PeerSettings {
    pub tick_duration: Duration,
    /// Publish a snapshot every N ticks
    pub snapshot_every: u32,
    pub event_rate_limit: u32,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            tick_duration: tick_duration(SIMULATION_TPS),
            snapshot_every: 1,
            event_rate_limit: INBOUND_EVENT_RATE_LIMIT,
        }
    }
}

/// UI side of a running peer
pub struct PeerHandle {
    commands: mpsc::Sender<PeerCommand>,
    snapshots: watch::Receiver<MatchSnapshot>,
    notices: mpsc::Receiver<Notice>,
    task: JoinHandle<PeerExit>,
}

impl PeerHandle {
    /// Ask to fire. Returns false once the peer task is gone.
    pub async fn fire(&self, angle: i32, power_percent: i32) -> bool {
        self.commands
            .send(PeerCommand::Fire { angle, power_percent })
            .await
            .is_ok()
    }

    pub async fn leave(&self) -> bool {
        self.commands.send(PeerCommand::Leave).await.is_ok()
    }

    /// Extra command sender for automated players
    pub fn commander(&self) -> mpsc::Sender<PeerCommand> {
        self.commands.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> MatchSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<MatchSnapshot> {
        self.snapshots.clone()
    }

    pub fn try_notice(&mut self) -> Option<Notice> {
        self.notices.try_recv().ok()
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Wait for the peer task to stop
    pub async fn join(self) -> Result<PeerExit, tokio::task::JoinError> {
        self.task.await
    }
}

/// Spawn the task that runs `session` over `channel`
pub fn spawn_peer(
    session: MatchSession,
    channel: RoomChannel,
    recorder: Arc<dyn MatchRecorder>,
    settings: PeerSettings,
) -> PeerHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (notice_tx, notice_rx) = mpsc::channel(NOTICE_QUEUE);
    let (snapshot_tx, snapshot_rx) = watch::channel(SnapshotBuilder::build(&session));

    let peer = PeerTask {
        session,
        channel,
        recorder,
        snapshots: snapshot_tx,
        notices: notice_tx,
        snapshot_builder: SnapshotBuilder::new(settings.snapshot_every),
        limiter: InboundLimiter::new(settings.event_rate_limit),
    };
    let task = tokio::spawn(peer.run(command_rx, settings.tick_duration));

    PeerHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        notices: notice_rx,
        task,
    }
}

enum Step {
    Tick,
    Inbound(Result<Inbound, TransportError>),
    Command(Option<PeerCommand>),
}

struct PeerTask {
    session: MatchSession,
    channel: RoomChannel,
    recorder: Arc<dyn MatchRecorder>,
    snapshots: watch::Sender<MatchSnapshot>,
    notices: mpsc::Sender<Notice>,
    snapshot_builder: SnapshotBuilder,
    limiter: InboundLimiter,
}

impl PeerTask {
    async fn run(mut self, mut commands: mpsc::Receiver<PeerCommand>, tick: Duration) -> PeerExit {
        let match_id = self.session.id();
        info!(
            match_id = %match_id,
            local = %self.session.local(),
            topic = %self.channel.topic(),
            "Peer loop started"
        );

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let cause = loop {
            let step = tokio::select! {
                _ = ticker.tick() => Step::Tick,
                inbound = self.channel.recv() => Step::Inbound(inbound),
                command = commands.recv() => Step::Command(command),
            };

            let exit = match step {
                Step::Tick => {
                    let effects = self.session.tick();
                    let exit = self.dispatch(effects);
                    if self.snapshot_builder.should_send() {
                        self.publish();
                    }
                    exit
                }
                Step::Inbound(Ok(Inbound::Event(payload))) => {
                    let exit = self.on_payload(&payload);
                    self.publish();
                    exit
                }
                Step::Inbound(Ok(Inbound::PeerLeft)) => {
                    debug!(match_id = %match_id, "Opponent presence dropped");
                    let effects = self.session.on_peer_disconnected();
                    let exit = self.dispatch(effects);
                    self.publish();
                    exit
                }
                Step::Inbound(Err(e)) => {
                    error!(match_id = %match_id, error = %e, "Room channel failed");
                    Some(ExitCause::TransportClosed)
                }
                Step::Command(Some(PeerCommand::Fire { angle, power_percent })) => {
                    let effects = self.session.request_fire(angle, power_percent);
                    let exit = self.dispatch(effects);
                    self.publish();
                    exit
                }
                // UI handle dropped counts as leaving
                Step::Command(Some(PeerCommand::Leave)) | Step::Command(None) => {
                    self.say_goodbye();
                    Some(ExitCause::Left)
                }
            };

            if let Some(cause) = exit {
                break cause;
            }
        };

        let result = self.session.result();
        info!(match_id = %match_id, cause = ?cause, result = ?result, "Peer loop stopped");

        if cause == ExitCause::Left {
            self.channel.unsubscribe();
        }
        PeerExit { cause, result }
    }

    fn on_payload(&mut self, payload: &str) -> Option<ExitCause> {
        if !self.limiter.check() {
            warn!(match_id = %self.session.id(), "Inbound event rate limited, dropping");
            return None;
        }

        match PeerEvent::decode(payload) {
            Ok(event) => {
                debug!(match_id = %self.session.id(), kind = event.kind(), "Inbound event");
                let effects = self.session.apply_remote(event);
                self.dispatch(effects)
            }
            Err(e) => {
                warn!(match_id = %self.session.id(), error = %e, "Failed to decode peer event");
                None
            }
        }
    }

    /// Carry out what a session step asked for
    fn dispatch(&mut self, effects: Effects) -> Option<ExitCause> {
        for event in &effects.outbound {
            if let Err(e) = self.channel.send(event) {
                warn!(
                    match_id = %self.session.id(),
                    kind = event.kind(),
                    error = %e,
                    "Failed to broadcast event"
                );
                self.notify(Notice::Transport(e.to_string()));
            }
        }

        if let Some(result) = effects.finished {
            self.record(result);
            self.notify(Notice::MatchOver(result));
            self.snapshot_builder.force_next();
        }

        if effects.opponent_left {
            self.notify(Notice::OpponentLeft);
            return Some(ExitCause::OpponentLeft);
        }
        None
    }

    fn record(&self, result: MatchResult) {
        if !should_record(&result, self.session.local()) {
            return;
        }
        let record = MatchRecord::new(self.session.id(), result, self.session.shots_fired());
        match self.recorder.record(record) {
            Ok(()) => info!(match_id = %self.session.id(), winner = %result.winner, "Match recorded"),
            Err(e) => error!(match_id = %self.session.id(), error = %e, "Failed to record match"),
        }
    }

    fn say_goodbye(&mut self) {
        let farewell = self.session.leave();
        if let Err(e) = self.channel.send(&farewell) {
            debug!(match_id = %self.session.id(), error = %e, "Farewell not delivered");
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.try_send(notice).is_err() {
            debug!(match_id = %self.session.id(), "Notice queue full or closed");
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(SnapshotBuilder::build(&self.session));
    }
}
