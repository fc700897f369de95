//! Collaborator contracts the controller consumes.
//!
//! The core never talks to a concrete player, storage backend, or bookkeeping
//! layer; everything external comes in through these narrow interfaces.
use async_trait::async_trait;
use binge_common::Episode;

use super::error::{PlayerError, ResolveError, StoreError};

/// Status payload delivered by the player at a fixed cadence while media is
/// loaded (~500 ms between ticks).
#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    pub position_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub is_buffering: bool,
    pub is_playing: bool,
    pub did_just_finish: bool,
    pub error: Option<String>,
}

/// Options for a load command.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start_position_ms: u64,
    pub should_auto_play: bool,
    pub progress_interval_ms: u64,
}

/// The external video player handle.
///
/// `load` replaces any currently loaded media. Status ticks flow back into
/// the controller through `PlayerHandle::push_status`, not through this
/// trait.
#[async_trait]
pub trait VideoPlayer: Send + Sync {
    async fn load(
        &self,
        uri: &str,
        headers: &[(String, String)],
        options: LoadOptions,
    ) -> Result<(), PlayerError>;
    async fn play(&self) -> Result<(), PlayerError>;
    async fn pause(&self) -> Result<(), PlayerError>;
    async fn set_position(&self, position_ms: u64) -> Result<(), PlayerError>;
}

/// Resolves an opaque source ref into a playable URI.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, source_ref: &str) -> Result<String, ResolveError>;
}

/// External key-value storage. The whole resume map lives under a single
/// well-known key as one serialized value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Externally-owned set of completed episodes. The core reads membership and
/// requests insertion/removal; it does not own the storage.
pub trait CompletionRegistry: Send + Sync {
    fn mark_complete(&self, episode: &Episode);
    fn unmark_complete(&self, episode: &Episode);
    fn is_complete(&self, episode: &Episode) -> bool;
}

/// External bookkeeping of which episode is "now playing" for a series.
pub trait CurrentEpisodeRegistry: Send + Sync {
    fn mark_current(&self, episode: &Episode);
}

/// Read-only playback preferences supplied by the host application.
#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    /// Mark episodes complete automatically when the completion floor is
    /// crossed.
    pub auto_mark: bool,
    /// Advance to the next sequential episode on stream end.
    pub autoplay: bool,
}
