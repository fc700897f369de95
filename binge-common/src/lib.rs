pub mod episode;
pub mod format;
pub mod policy;

pub use episode::{find_by_number, Episode};
pub use format::millis_to_timestamp;
pub use policy::{
    auto_advance_target, completion_floor_ms, evaluate_tick, TickDecision, RESUME_FLOOR_MS,
};
