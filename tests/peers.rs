//! Peer tasks talking over a shared room channel

use std::sync::Arc;
use std::time::Duration;

use tank_duel::config::GameTuning;
use tank_duel::game::{MatchSession, MatchSnapshot, WinReason};
use tank_duel::net::channel::ChannelHub;
use tank_duel::net::peer::{spawn_peer, ExitCause, Notice, PeerHandle, PeerSettings};
use tank_duel::net::protocol::{FieldSize, MatchStart, PlayerIndex};
use tank_duel::store::MemoryRecorder;
use tokio_test::assert_ok;
use uuid::Uuid;

fn settings() -> PeerSettings {
    PeerSettings {
        tick_duration: Duration::from_millis(1),
        ..PeerSettings::default()
    }
}

fn start_pair(hub: &ChannelHub, recorder: Arc<MemoryRecorder>) -> (PeerHandle, PeerHandle) {
    let start = MatchStart {
        match_id: Uuid::new_v4(),
        field: FieldSize::default(),
        terrain: vec![0.3; 51],
        wind: 0,
        healths: [100.0, 100.0],
        first_turn: PlayerIndex::One,
    };
    let one = MatchSession::new(&start, PlayerIndex::One, GameTuning::default(), 1).unwrap();
    let two = MatchSession::new(&start, PlayerIndex::Two, GameTuning::default(), 2).unwrap();

    let one_channel = hub.subscribe("DUEL42");
    let two_channel = hub.subscribe("DUEL42");
    (
        spawn_peer(one, one_channel, recorder.clone(), settings()),
        spawn_peer(two, two_channel, recorder, settings()),
    )
}

async fn wait_for<F>(handle: &PeerHandle, done: F) -> MatchSnapshot
where
    F: Fn(&MatchSnapshot) -> bool,
{
    let mut view = handle.watch_snapshots();
    tokio::time::timeout(Duration::from_secs(5), async move {
        loop {
            {
                let snapshot = view.borrow_and_update();
                if done(&*snapshot) {
                    return snapshot.clone();
                }
            }
            view.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn fire_hands_the_turn_to_the_opponent() {
    let hub = ChannelHub::default();
    let recorder = Arc::new(MemoryRecorder::new());
    let (one, two) = start_pair(&hub, recorder.clone());

    assert!(one.snapshot().input_enabled);
    assert!(!two.snapshot().input_enabled);

    assert!(one.fire(45, 50).await);

    let seen = wait_for(&two, |s| s.shots_fired == 1 && s.input_enabled).await;
    assert_eq!(seen.active_player, PlayerIndex::Two);
    assert!(seen.projectile.is_none());

    let host = wait_for(&one, |s| s.shots_fired == 1 && s.projectile.is_none()).await;
    assert!(!host.input_enabled);
    assert_eq!(host.active_player, PlayerIndex::Two);
    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn leaving_gives_the_opponent_a_disconnect_win() {
    let hub = ChannelHub::default();
    let recorder = Arc::new(MemoryRecorder::new());
    let (one, mut two) = start_pair(&hub, recorder.clone());

    assert!(one.leave().await);

    let over = wait_for(&two, |s| s.result.is_some()).await;
    let result = over.result.unwrap();
    assert_eq!(result.winner, PlayerIndex::Two);
    assert_eq!(result.reason, WinReason::Disconnect);
    assert!(!over.input_enabled);

    assert_eq!(two.next_notice().await, Some(Notice::MatchOver(result)));
    assert_eq!(two.next_notice().await, Some(Notice::OpponentLeft));

    let one_exit = assert_ok!(one.join().await);
    let two_exit = assert_ok!(two.join().await);
    assert_eq!(one_exit.cause, ExitCause::Left);
    assert_eq!(two_exit.cause, ExitCause::OpponentLeft);

    let records = recorder.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].winner, PlayerIndex::Two);
    assert_eq!(records[0].loser, PlayerIndex::One);
}
