pub mod config;
pub mod playback;
#[cfg(feature = "test-utils")]
pub mod test_support;

pub use binge_common::{millis_to_timestamp, Episode};
