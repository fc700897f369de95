//! Playback error types
use thiserror::Error;

/// Errors surfaced by the video player collaborator.
///
/// All of these degrade to the session's sticky error state; nothing here
/// propagates uncaught out of the service loop.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Player rejected a load (bad media, unreachable source, ...)
    #[error("Load rejected: {0}")]
    Load(String),
    /// Player rejected a play/pause/seek command
    #[error("Command rejected: {0}")]
    Command(String),
    /// Command issued against a handle that is not ready yet
    #[error("Player not ready: {0}")]
    NotReady(String),
}

impl PlayerError {
    pub fn load(e: impl std::fmt::Display) -> Self {
        Self::Load(e.to_string())
    }
    pub fn command(e: impl std::fmt::Display) -> Self {
        Self::Command(e.to_string())
    }
    pub fn not_ready(e: impl std::fmt::Display) -> Self {
        Self::NotReady(e.to_string())
    }
}

/// An opaque source ref could not be resolved to a playable URI.
#[derive(Error, Debug)]
#[error("Source resolution failed: {0}")]
pub struct ResolveError(pub String);

/// Key-value store failures. Always swallowed by the position store:
/// resume-state persistence must never interrupt playback.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Write failed: {0}")]
    Write(String),
}

impl StoreError {
    pub fn read(e: impl std::fmt::Display) -> Self {
        Self::Read(e.to_string())
    }
    pub fn write(e: impl std::fmt::Display) -> Self {
        Self::Write(e.to_string())
    }
}
