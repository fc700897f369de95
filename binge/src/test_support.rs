//! Mock collaborators for behavior tests.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use binge_common::Episode;

use crate::playback::{
    CompletionRegistry, CurrentEpisodeRegistry, KeyValueStore, LoadOptions, PlayerError,
    ResolveError, SourceResolver, StoreError, VideoPlayer,
};

/// One command the controller issued to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load {
        uri: String,
        start_position_ms: u64,
    },
    Play,
    Pause,
    SetPosition(u64),
}

/// Records every command the controller issues; can be scripted to reject
/// the next load.
#[derive(Default)]
pub struct RecordingPlayer {
    calls: Mutex<Vec<PlayerCall>>,
    fail_next_load: AtomicBool,
}

impl RecordingPlayer {
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_load(&self) {
        self.fail_next_load.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoPlayer for RecordingPlayer {
    async fn load(
        &self,
        uri: &str,
        _headers: &[(String, String)],
        options: LoadOptions,
    ) -> Result<(), PlayerError> {
        if self.fail_next_load.swap(false, Ordering::SeqCst) {
            return Err(PlayerError::load("scripted load failure"));
        }
        self.calls.lock().unwrap().push(PlayerCall::Load {
            uri: uri.to_string(),
            start_position_ms: options.start_position_ms,
        });
        Ok(())
    }

    async fn play(&self) -> Result<(), PlayerError> {
        self.calls.lock().unwrap().push(PlayerCall::Play);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.calls.lock().unwrap().push(PlayerCall::Pause);
        Ok(())
    }

    async fn set_position(&self, position_ms: u64) -> Result<(), PlayerError> {
        self.calls
            .lock()
            .unwrap()
            .push(PlayerCall::SetPosition(position_ms));
        Ok(())
    }
}

/// Resolves refs to a fixed CDN prefix; refs starting with `bad` fail.
pub struct PrefixResolver;

impl SourceResolver for PrefixResolver {
    fn resolve(&self, source_ref: &str) -> Result<String, ResolveError> {
        if source_ref.starts_with("bad") {
            return Err(ResolveError(format!("unresolvable ref {source_ref}")));
        }
        Ok(format!("https://cdn.example/{source_ref}"))
    }
}

/// In-memory key-value store.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory completion set that counts mark requests.
#[derive(Default)]
pub struct MemoryCompletion {
    complete: Mutex<HashSet<(String, u32)>>,
    mark_calls: Mutex<Vec<u32>>,
}

impl MemoryCompletion {
    pub fn seed(&self, series_id: &str, number: u32) {
        self.complete
            .lock()
            .unwrap()
            .insert((series_id.to_string(), number));
    }

    /// Episode numbers passed to `mark_complete`, in order.
    pub fn mark_calls(&self) -> Vec<u32> {
        self.mark_calls.lock().unwrap().clone()
    }
}

impl CompletionRegistry for MemoryCompletion {
    fn mark_complete(&self, episode: &Episode) {
        self.complete
            .lock()
            .unwrap()
            .insert((episode.series_id.clone(), episode.number));
        self.mark_calls.lock().unwrap().push(episode.number);
    }

    fn unmark_complete(&self, episode: &Episode) {
        self.complete
            .lock()
            .unwrap()
            .remove(&(episode.series_id.clone(), episode.number));
    }

    fn is_complete(&self, episode: &Episode) -> bool {
        self.complete
            .lock()
            .unwrap()
            .contains(&(episode.series_id.clone(), episode.number))
    }
}

/// Records which episodes were announced as "now playing".
#[derive(Default)]
pub struct RecordingCurrent {
    seen: Mutex<Vec<u32>>,
}

impl RecordingCurrent {
    pub fn seen(&self) -> Vec<u32> {
        self.seen.lock().unwrap().clone()
    }
}

impl CurrentEpisodeRegistry for RecordingCurrent {
    fn mark_current(&self, episode: &Episode) {
        self.seen.lock().unwrap().push(episode.number);
    }
}
