use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::traits::KeyValueStore;

/// Well-known key holding the whole serialized resume map.
const RESUME_MAP_KEY: &str = "last_episodes";

/// Per-series resume record. Overwritten whole on every persistence event,
/// removed entirely when the episode is deemed complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesWatchState {
    pub episode: u32,
    pub position_ms: u64,
}

/// Durable per-series resume state over an external key-value store.
///
/// The entire map is one serialized JSON value under a single key, not
/// per-series keys. Every operation is best-effort: a failed read behaves as
/// absent and failed writes are swallowed — resume persistence must never
/// interrupt playback.
#[derive(Clone)]
pub struct PositionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PositionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn get(&self, series_id: &str) -> Option<SeriesWatchState> {
        self.read_map().await.remove(series_id)
    }

    pub async fn put(&self, series_id: &str, episode: u32, position_ms: u64) {
        let mut map = self.read_map().await;
        map.insert(
            series_id.to_string(),
            SeriesWatchState {
                episode,
                position_ms,
            },
        );
        self.write_map(&map).await;
    }

    /// Idempotent: deleting an absent record is not an error.
    pub async fn delete(&self, series_id: &str) {
        let mut map = self.read_map().await;
        if map.remove(series_id).is_some() {
            self.write_map(&map).await;
        }
    }

    async fn read_map(&self) -> HashMap<String, SeriesWatchState> {
        let raw = match self.kv.get(RESUME_MAP_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(err) => {
                warn!("resume map read failed, treating as absent: {err}");
                return HashMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(err) => {
                warn!("resume map is malformed, starting fresh: {err}");
                HashMap::new()
            }
        }
    }

    async fn write_map(&self, map: &HashMap<String, SeriesWatchState>) {
        let raw = match serde_json::to_string(map) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("resume map serialization failed: {err}");
                return;
            }
        };
        if let Err(err) = self.kv.set(RESUME_MAP_KEY, &raw).await {
            warn!("resume map write failed: {err}");
        }
    }
}
