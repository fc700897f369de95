mod error;
pub mod service;
mod session;
mod store;
mod timer;
mod traits;

pub use error::{PlayerError, ResolveError, StoreError};
pub use service::{PlayerCommand, PlayerDeps, PlayerHandle, PlayerService};
pub use session::{Effect, PlaybackSession, PlaybackSnapshot};
pub use store::{PositionStore, SeriesWatchState};
pub use traits::{
    CompletionRegistry, CurrentEpisodeRegistry, KeyValueStore, LoadOptions, PlayerStatus,
    Settings, SourceResolver, VideoPlayer,
};
