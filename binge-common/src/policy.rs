use crate::episode::Episode;

/// Positions at or below this are "just started" and never worth resuming
/// into; a re-watch naturally begins from the start.
pub const RESUME_FLOOR_MS: u64 = 90_000;

/// Fraction of the duration at which an episode counts as finished,
/// independent of literal stream end. Tolerates players that fire completion
/// slightly before 100%.
const COMPLETION_RATIO: f64 = 0.9;

/// Completion floor for an episode, or `None` while the duration is unknown.
pub fn completion_floor_ms(duration_ms: u64) -> Option<u64> {
    (duration_ms > 0).then(|| (duration_ms as f64 * COMPLETION_RATIO) as u64)
}

/// What a single progress tick asks the caller to do.
///
/// The policy is stateless and may be evaluated every tick; the caller owns
/// the one-shot completion gate and decides persist-write frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickDecision {
    /// Overwrite the series resume record with this position.
    pub persist: bool,
    /// Remove the series resume record (episode is effectively finished).
    pub delete_persisted: bool,
    /// Insert the episode into the completion set.
    pub mark_complete: bool,
}

/// Evaluate one progress tick.
///
/// A resume record is only ever written strictly inside the band between the
/// resume floor and the completion floor. The first tick at or past the
/// completion floor deletes the record and, when auto-mark is on and the
/// episode is not already complete, marks it complete; `completion_signaled`
/// is the caller's gate that keeps both one-shot.
pub fn evaluate_tick(
    position_ms: u64,
    duration_ms: u64,
    completion_signaled: bool,
    auto_mark: bool,
    already_complete: bool,
) -> TickDecision {
    let Some(floor) = completion_floor_ms(duration_ms) else {
        // Duration not reported yet: no band to compare against.
        return TickDecision::default();
    };

    let crossed = position_ms >= floor && !completion_signaled;
    TickDecision {
        persist: position_ms > RESUME_FLOOR_MS && position_ms < floor,
        delete_persisted: crossed,
        mark_complete: crossed && auto_mark && !already_complete,
    }
}

/// Episode number to advance to on stream end, or `None` to stay put.
///
/// Selection is exact: the episode numbered `current + 1` must exist in the
/// list. A gap in numbering (or the series finale) yields `None`.
pub fn auto_advance_target(autoplay: bool, current: u32, episodes: &[Episode]) -> Option<u32> {
    if !autoplay {
        return None;
    }
    let next = current + 1;
    episodes
        .iter()
        .any(|episode| episode.number == next)
        .then_some(next)
}
