use std::sync::{Arc, Mutex};
use std::time::Duration;

use binge_common::Episode;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{error, info};

use crate::config::ServiceConfig;

use super::session::{Effect, PlaybackSession, PlaybackSnapshot};
use super::store::PositionStore;
use super::timer::HideTimer;
use super::traits::{
    CompletionRegistry, CurrentEpisodeRegistry, KeyValueStore, LoadOptions, PlayerStatus,
    Settings, SourceResolver, VideoPlayer,
};

/// Commands processed by the service loop, one at a time, to completion.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    Initialize {
        episode: Episode,
        resume_if_any: bool,
    },
    Play,
    Pause,
    SeekBy(i64),
    BeginScrub,
    EndScrub(u64),
    ToggleComplete(bool),
    Retry,
    ToggleControls,
    /// A status tick from the player integration.
    Status(PlayerStatus),
    /// The hide countdown elapsed.
    ControlsTimeout,
}

/// External collaborators the controller drives.
pub struct PlayerDeps {
    pub player: Arc<dyn VideoPlayer>,
    pub resolver: Arc<dyn SourceResolver>,
    pub kv: Arc<dyn KeyValueStore>,
    pub completion: Arc<dyn CompletionRegistry>,
    pub current: Arc<dyn CurrentEpisodeRegistry>,
}

/// Handle for dispatching commands to the playback service.
#[derive(Clone)]
pub struct PlayerHandle {
    command_tx: tokio_mpsc::UnboundedSender<PlayerCommand>,
    snapshot_handle: SnapshotHandle,
    seek_step_ms: u64,
}

impl PlayerHandle {
    pub fn initialize(&self, episode: Episode, resume_if_any: bool) {
        let _ = self.command_tx.send(PlayerCommand::Initialize {
            episode,
            resume_if_any,
        });
    }
    pub fn play(&self) {
        let _ = self.command_tx.send(PlayerCommand::Play);
    }
    pub fn pause(&self) {
        let _ = self.command_tx.send(PlayerCommand::Pause);
    }
    pub fn seek_by(&self, delta_ms: i64) {
        let _ = self.command_tx.send(PlayerCommand::SeekBy(delta_ms));
    }
    /// Discrete forward seek by the configured step.
    pub fn seek_forward(&self) {
        self.seek_by(self.seek_step_ms as i64);
    }
    /// Discrete backward seek by the configured step.
    pub fn seek_back(&self) {
        self.seek_by(-(self.seek_step_ms as i64));
    }
    pub fn begin_scrub(&self) {
        let _ = self.command_tx.send(PlayerCommand::BeginScrub);
    }
    pub fn end_scrub(&self, position_ms: u64) {
        let _ = self.command_tx.send(PlayerCommand::EndScrub(position_ms));
    }
    pub fn toggle_complete(&self, complete: bool) {
        let _ = self
            .command_tx
            .send(PlayerCommand::ToggleComplete(complete));
    }
    pub fn retry(&self) {
        let _ = self.command_tx.send(PlayerCommand::Retry);
    }
    pub fn toggle_controls(&self) {
        let _ = self.command_tx.send(PlayerCommand::ToggleControls);
    }
    /// Feed a player status tick into the controller.
    pub fn push_status(&self, status: PlayerStatus) {
        let _ = self.command_tx.send(PlayerCommand::Status(status));
    }
    /// Subscribe to consolidated snapshots; one is published after every
    /// processed command.
    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<PlaybackSnapshot> {
        self.snapshot_handle.subscribe()
    }
}

/// Fan-out of consolidated snapshots to UI subscribers. Dead subscribers are
/// pruned on send.
#[derive(Clone)]
struct SnapshotHandle {
    subscribers: Arc<Mutex<Vec<tokio_mpsc::UnboundedSender<PlaybackSnapshot>>>>,
}

impl SnapshotHandle {
    fn new(
        mut snapshot_rx: tokio_mpsc::UnboundedReceiver<PlaybackSnapshot>,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let subscribers: Arc<Mutex<Vec<tokio_mpsc::UnboundedSender<PlaybackSnapshot>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let subscribers_task = subscribers.clone();
        runtime_handle.spawn(async move {
            while let Some(snapshot) = snapshot_rx.recv().await {
                subscribers_task
                    .lock()
                    .unwrap()
                    .retain(|tx| tx.send(snapshot.clone()).is_ok());
            }
        });
        Self { subscribers }
    }

    fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<PlaybackSnapshot> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// The controller facade: one serial loop owning the session.
///
/// Status events and user commands are applied synchronously to completion
/// before the next is admitted; there is no reentrant status handling. The
/// service is the only component touching collaborator notifications, so
/// every decision's side effects run exactly once.
pub struct PlayerService {
    deps: PlayerDeps,
    store: PositionStore,
    session: PlaybackSession,
    config: ServiceConfig,
    command_rx: tokio_mpsc::UnboundedReceiver<PlayerCommand>,
    snapshot_tx: tokio_mpsc::UnboundedSender<PlaybackSnapshot>,
    timer: HideTimer,
}

impl PlayerService {
    /// Spawn the service loop. The session lives until every command sender
    /// (the handle and the player integration) is dropped.
    pub fn start(
        episodes: Vec<Episode>,
        first_episode: Episode,
        settings: Settings,
        config: ServiceConfig,
        deps: PlayerDeps,
        runtime_handle: tokio::runtime::Handle,
    ) -> PlayerHandle {
        let (command_tx, command_rx) = tokio_mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = tokio_mpsc::unbounded_channel();
        let snapshot_handle = SnapshotHandle::new(snapshot_rx, runtime_handle.clone());
        let handle = PlayerHandle {
            command_tx: command_tx.clone(),
            snapshot_handle,
            seek_step_ms: config.seek_step_ms,
        };
        let timer = HideTimer::new(
            Duration::from_millis(config.hide_delay_ms),
            command_tx.downgrade(),
        );
        let store = PositionStore::new(deps.kv.clone());
        let session = PlaybackSession::new(episodes, first_episode, settings);
        let mut service = PlayerService {
            deps,
            store,
            session,
            config,
            command_rx,
            snapshot_tx,
            timer,
        };
        runtime_handle.spawn(async move {
            service.run().await;
        });
        handle
    }

    async fn run(&mut self) {
        info!("playback service started");
        while let Some(command) = self.command_rx.recv().await {
            let effects = match command {
                PlayerCommand::Initialize {
                    episode,
                    resume_if_any,
                } => self.initialize(episode, resume_if_any).await,
                PlayerCommand::Play => self.session.play(),
                PlayerCommand::Pause => self.session.pause(),
                PlayerCommand::SeekBy(delta_ms) => self.session.seek_by(delta_ms),
                PlayerCommand::BeginScrub => self.session.begin_scrub(),
                PlayerCommand::EndScrub(position_ms) => self.session.end_scrub(position_ms),
                PlayerCommand::ToggleComplete(complete) => self.session.set_complete(complete),
                PlayerCommand::Retry => self.session.retry(),
                PlayerCommand::ToggleControls => self.session.toggle_controls(),
                PlayerCommand::Status(status) => self.session.handle_status(&status),
                PlayerCommand::ControlsTimeout => {
                    self.session.controls_timeout();
                    Vec::new()
                }
            };
            self.apply_effects(effects).await;
            self.publish();
        }
        info!("playback service stopped");
    }

    async fn initialize(&mut self, episode: Episode, resume_if_any: bool) -> Vec<Effect> {
        let start_position_ms = if resume_if_any {
            self.store
                .get(&episode.series_id)
                .await
                .filter(|state| state.episode == episode.number)
                .map(|state| state.position_ms)
                .unwrap_or(0)
        } else {
            0
        };
        self.session.load_episode(episode, start_position_ms)
    }

    async fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Play => {
                    if let Err(err) = self.deps.player.play().await {
                        error!("play command rejected: {err}");
                    }
                }
                Effect::Pause => {
                    if let Err(err) = self.deps.player.pause().await {
                        error!("pause command rejected: {err}");
                    }
                }
                Effect::Seek(position_ms) => {
                    if let Err(err) = self.deps.player.set_position(position_ms).await {
                        error!("seek rejected: {err}");
                        self.session.mark_load_error();
                    }
                }
                Effect::Load {
                    episode,
                    start_position_ms,
                } => self.load(episode, start_position_ms).await,
                Effect::Persist {
                    series_id,
                    episode,
                    position_ms,
                } => {
                    // Fire-and-forget: a slow or failed write never blocks
                    // playback progression.
                    let store = self.store.clone();
                    tokio::spawn(async move {
                        store.put(&series_id, episode, position_ms).await;
                    });
                }
                Effect::DeletePersisted { series_id } => {
                    let store = self.store.clone();
                    tokio::spawn(async move {
                        store.delete(&series_id).await;
                    });
                }
                Effect::MarkComplete(episode) => self.deps.completion.mark_complete(&episode),
                Effect::UnmarkComplete(episode) => self.deps.completion.unmark_complete(&episode),
                Effect::MarkCurrent(episode) => self.deps.current.mark_current(&episode),
                Effect::RestartHideTimer => self.timer.restart(),
                Effect::CancelHideTimer => self.timer.cancel(),
            }
        }
    }

    async fn load(&mut self, episode: Episode, start_position_ms: u64) {
        let uri = match self.deps.resolver.resolve(&episode.source_ref) {
            Ok(uri) => uri,
            Err(err) => {
                error!(episode = episode.number, "source resolution failed: {err}");
                self.session.mark_load_error();
                return;
            }
        };
        let options = LoadOptions {
            start_position_ms,
            should_auto_play: true,
            progress_interval_ms: self.config.progress_interval_ms,
        };
        if let Err(err) = self
            .deps
            .player
            .load(&uri, &self.config.headers, options)
            .await
        {
            error!(episode = episode.number, "load rejected: {err}");
            self.session.mark_load_error();
            return;
        }
        let complete = self.deps.completion.is_complete(&episode);
        self.session.set_episode_complete(complete);
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.session.snapshot().clone());
    }
}
