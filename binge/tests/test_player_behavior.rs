#![cfg(feature = "test-utils")]
mod support;

use std::sync::Arc;
use std::time::Duration;

use binge::config::ServiceConfig;
use binge::playback::{
    CompletionRegistry, PlaybackSnapshot, PlayerDeps, PlayerHandle, PlayerStatus, PlayerService,
    PositionStore, SeriesWatchState, Settings,
};
use binge::test_support::{
    MemoryCompletion, MemoryKv, PlayerCall, PrefixResolver, RecordingCurrent, RecordingPlayer,
};
use binge::Episode;
use tokio::time::timeout;

use crate::support::tracing_init;

const DURATION: u64 = 1_200_000;
const COMPLETION_FLOOR: u64 = 1_080_000; // 90% of DURATION

fn episode(number: u32) -> Episode {
    Episode::new("series-1", number, format!("ref-{number}"))
}

fn episodes() -> Vec<Episode> {
    vec![episode(1), episode(2), episode(3)]
}

/// Playback service wired to recording mocks.
struct PlayerFixture {
    handle: PlayerHandle,
    snapshot_rx: tokio::sync::mpsc::UnboundedReceiver<PlaybackSnapshot>,
    player: Arc<RecordingPlayer>,
    kv: Arc<MemoryKv>,
    completion: Arc<MemoryCompletion>,
    current: Arc<RecordingCurrent>,
}

impl PlayerFixture {
    fn new(settings: Settings) -> Self {
        tracing_init();
        let player = Arc::new(RecordingPlayer::default());
        let kv = Arc::new(MemoryKv::default());
        let completion = Arc::new(MemoryCompletion::default());
        let current = Arc::new(RecordingCurrent::default());
        let deps = PlayerDeps {
            player: player.clone(),
            resolver: Arc::new(PrefixResolver),
            kv: kv.clone(),
            completion: completion.clone(),
            current: current.clone(),
        };
        let handle = PlayerService::start(
            episodes(),
            episode(1),
            settings,
            ServiceConfig::default(),
            deps,
            tokio::runtime::Handle::current(),
        );
        let snapshot_rx = handle.subscribe();
        Self {
            handle,
            snapshot_rx,
            player,
            kv,
            completion,
            current,
        }
    }

    fn store(&self) -> PositionStore {
        PositionStore::new(self.kv.clone())
    }

    /// Wait for a snapshot matching the predicate, consuming earlier ones.
    /// The generous timeout keeps this safely past the hide-timer deadline
    /// under a paused clock.
    async fn wait_for(
        &mut self,
        predicate: impl Fn(&PlaybackSnapshot) -> bool,
    ) -> PlaybackSnapshot {
        timeout(Duration::from_secs(30), async {
            loop {
                let snapshot = self
                    .snapshot_rx
                    .recv()
                    .await
                    .expect("snapshot stream closed");
                if predicate(&snapshot) {
                    return snapshot;
                }
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    /// Wait for the next published snapshot regardless of content.
    async fn next_snapshot(&mut self) -> PlaybackSnapshot {
        self.wait_for(|_| true).await
    }

    fn push_playing_tick(&self, position_ms: u64) {
        self.handle.push_status(PlayerStatus {
            position_ms: Some(position_ms),
            duration_ms: Some(DURATION),
            is_playing: true,
            ..Default::default()
        });
    }

    /// Initialize and drive the session into steady playback.
    async fn start_playing(&mut self) {
        self.handle.initialize(episode(1), false);
        self.push_playing_tick(1_000);
        self.wait_for(|s| !s.is_loading).await;
    }
}

/// Poll the resume record until the fire-and-forget store write lands.
async fn wait_for_record(
    store: &PositionStore,
    series_id: &str,
    predicate: impl Fn(Option<SeriesWatchState>) -> bool,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            if predicate(store.get(series_id).await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for resume record");
}

#[tokio::test]
async fn test_initialize_loads_resolved_source_at_zero() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.handle.initialize(episode(1), false);

    let snapshot = fixture.next_snapshot().await;
    assert!(snapshot.is_loading);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(
        fixture.player.calls(),
        vec![PlayerCall::Load {
            uri: "https://cdn.example/ref-1".to_string(),
            start_position_ms: 0,
        }]
    );
}

#[tokio::test]
async fn test_initialize_resumes_stored_position() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.store().put("series-1", 1, 300_000).await;

    fixture.handle.initialize(episode(1), true);
    let snapshot = fixture.next_snapshot().await;
    assert_eq!(snapshot.position_ms, 300_000);
    assert_eq!(
        fixture.player.calls(),
        vec![PlayerCall::Load {
            uri: "https://cdn.example/ref-1".to_string(),
            start_position_ms: 300_000,
        }]
    );
}

#[tokio::test]
async fn test_initialize_ignores_record_for_other_episode() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.store().put("series-1", 2, 300_000).await;

    fixture.handle.initialize(episode(1), true);
    let snapshot = fixture.next_snapshot().await;
    assert_eq!(snapshot.position_ms, 0);
}

#[tokio::test]
async fn test_progress_inside_band_persists_resume_record() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.push_playing_tick(120_000);
    fixture.wait_for(|s| s.position_ms == 120_000).await;

    wait_for_record(&fixture.store(), "series-1", |record| {
        record
            == Some(SeriesWatchState {
                episode: 1,
                position_ms: 120_000,
            })
    })
    .await;
}

#[tokio::test]
async fn test_completion_deletes_record_and_marks_once() {
    let mut fixture = PlayerFixture::new(Settings {
        auto_mark: true,
        autoplay: false,
    });
    fixture.start_playing().await;

    fixture.push_playing_tick(120_000);
    wait_for_record(&fixture.store(), "series-1", |record| record.is_some()).await;

    fixture.push_playing_tick(COMPLETION_FLOOR);
    fixture.wait_for(|s| s.episode_complete).await;
    wait_for_record(&fixture.store(), "series-1", |record| record.is_none()).await;

    // Later ticks past the floor stay silent.
    fixture.push_playing_tick(COMPLETION_FLOOR + 10_000);
    fixture
        .wait_for(|s| s.position_ms == COMPLETION_FLOOR + 10_000)
        .await;
    assert_eq!(fixture.completion.mark_calls(), vec![1]);
}

#[tokio::test]
async fn test_auto_advance_loads_next_episode() {
    let mut fixture = PlayerFixture::new(Settings {
        auto_mark: false,
        autoplay: true,
    });
    fixture.start_playing().await;

    fixture.handle.push_status(PlayerStatus {
        did_just_finish: true,
        ..Default::default()
    });
    let snapshot = fixture.wait_for(|s| s.episode.number == 2).await;
    assert!(snapshot.is_loading);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(fixture.current.seen(), vec![2]);
    assert!(fixture.player.calls().contains(&PlayerCall::Load {
        uri: "https://cdn.example/ref-2".to_string(),
        start_position_ms: 0,
    }));
}

#[tokio::test]
async fn test_finale_does_not_advance() {
    let mut fixture = PlayerFixture::new(Settings {
        auto_mark: false,
        autoplay: true,
    });
    fixture.handle.initialize(episode(3), false);
    fixture.next_snapshot().await;

    fixture.handle.push_status(PlayerStatus {
        did_just_finish: true,
        ..Default::default()
    });
    let snapshot = fixture.wait_for(|s| s.is_paused).await;
    assert_eq!(snapshot.episode.number, 3);
    assert!(fixture.current.seen().is_empty());
    let loads = fixture
        .player
        .calls()
        .iter()
        .filter(|call| matches!(call, PlayerCall::Load { .. }))
        .count();
    assert_eq!(loads, 1);
}

#[tokio::test]
async fn test_scrub_resumes_when_scrub_paused_playback() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.handle.begin_scrub();
    fixture.wait_for(|s| s.is_paused).await;

    fixture.handle.end_scrub(5_000);
    let snapshot = fixture.wait_for(|s| !s.is_paused).await;
    assert_eq!(snapshot.position_ms, 5_000);

    let calls = fixture.player.calls();
    let pause_at = calls.iter().position(|c| *c == PlayerCall::Pause).unwrap();
    let seek_at = calls
        .iter()
        .position(|c| *c == PlayerCall::SetPosition(5_000))
        .unwrap();
    let play_at = calls.iter().position(|c| *c == PlayerCall::Play).unwrap();
    assert!(pause_at < seek_at && seek_at < play_at);
}

#[tokio::test]
async fn test_scrub_stays_paused_after_user_pause() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.handle.pause();
    fixture.wait_for(|s| s.is_paused).await;

    fixture.handle.begin_scrub();
    fixture.handle.end_scrub(7_000);
    let snapshot = fixture.wait_for(|s| s.position_ms == 7_000).await;
    assert!(snapshot.is_paused);
    assert!(!fixture.player.calls().contains(&PlayerCall::Play));
}

#[tokio::test]
async fn test_seek_shortcuts_step_by_configured_amount() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.push_playing_tick(120_000);
    fixture.wait_for(|s| s.position_ms == 120_000).await;

    fixture.handle.seek_forward();
    fixture.wait_for(|s| s.position_ms == 130_000).await;
    fixture.handle.seek_back();
    fixture.wait_for(|s| s.position_ms == 120_000).await;

    let calls = fixture.player.calls();
    assert!(calls.contains(&PlayerCall::SetPosition(130_000)));
    assert!(calls.contains(&PlayerCall::SetPosition(120_000)));
}

#[tokio::test]
async fn test_load_error_is_sticky_until_retry() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.player.fail_next_load();

    fixture.handle.initialize(episode(1), false);
    let snapshot = fixture.wait_for(|s| s.has_error).await;
    assert!(!snapshot.is_loading);

    // Playback commands are no-ops while the error is sticky.
    fixture.handle.play();
    fixture.next_snapshot().await;
    fixture.handle.seek_by(10_000);
    fixture.next_snapshot().await;
    assert!(fixture.player.calls().is_empty());

    fixture.handle.retry();
    let snapshot = fixture.wait_for(|s| !s.has_error).await;
    assert!(snapshot.is_loading);
    assert_eq!(
        fixture.player.calls(),
        vec![PlayerCall::Load {
            uri: "https://cdn.example/ref-1".to_string(),
            start_position_ms: 0,
        }]
    );
}

#[tokio::test]
async fn test_status_error_is_sticky_too() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.handle.push_status(PlayerStatus {
        error: Some("stream reset".to_string()),
        ..Default::default()
    });
    let snapshot = fixture.wait_for(|s| s.has_error).await;
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_buffering_reenters_loading_after_steady_playback() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.start_playing().await;

    fixture.handle.push_status(PlayerStatus {
        position_ms: Some(2_000),
        duration_ms: Some(DURATION),
        is_buffering: true,
        is_playing: false,
        ..Default::default()
    });
    fixture.wait_for(|s| s.is_loading).await;

    fixture.push_playing_tick(2_500);
    fixture.wait_for(|s| !s.is_loading).await;
}

#[tokio::test(start_paused = true)]
async fn test_controls_hide_after_delay_and_toggle_reschedules() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.handle.initialize(episode(1), false);
    let snapshot = fixture.next_snapshot().await;
    assert!(snapshot.controls_visible);

    fixture.wait_for(|s| !s.controls_visible).await;

    fixture.handle.toggle_controls();
    fixture.wait_for(|s| s.controls_visible).await;
    fixture.wait_for(|s| !s.controls_visible).await;
}

#[tokio::test]
async fn test_toggle_complete_round_trips_registry() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.handle.initialize(episode(1), false);
    fixture.next_snapshot().await;

    fixture.handle.toggle_complete(true);
    let snapshot = fixture.wait_for(|s| s.episode_complete).await;
    assert!(snapshot.episode_complete);
    assert!(fixture.completion.is_complete(&episode(1)));

    fixture.handle.toggle_complete(false);
    fixture.wait_for(|s| !s.episode_complete).await;
    assert!(!fixture.completion.is_complete(&episode(1)));
}

#[tokio::test]
async fn test_snapshot_reflects_preexisting_completion() {
    let mut fixture = PlayerFixture::new(Settings::default());
    fixture.completion.seed("series-1", 1);

    fixture.handle.initialize(episode(1), false);
    let snapshot = fixture.wait_for(|s| s.episode_complete).await;
    assert!(snapshot.episode_complete);
}
