use binge_common::{auto_advance_target, evaluate_tick, find_by_number, Episode};
use tracing::{info, warn};

use super::traits::{PlayerStatus, Settings};

/// The controller's authoritative state at any instant.
///
/// Exactly one snapshot exists per active session. It is owned by the
/// session and mutated only by a player status event, a user command, or the
/// hide countdown elapsing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub episode: Episode,
    /// Membership of the current episode in the completion set, mirrored so
    /// a bound UI can render its toggle without another collaborator call.
    pub episode_complete: bool,
    pub is_paused: bool,
    pub is_buffering: bool,
    pub is_loading: bool,
    pub has_error: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub controls_visible: bool,
}

/// Side effects a transition asks the service to execute.
///
/// The session itself performs no I/O; the service runs each intent exactly
/// once, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Play,
    Pause,
    Seek(u64),
    Load {
        episode: Episode,
        start_position_ms: u64,
    },
    Persist {
        series_id: String,
        episode: u32,
        position_ms: u64,
    },
    DeletePersisted {
        series_id: String,
    },
    MarkComplete(Episode),
    UnmarkComplete(Episode),
    MarkCurrent(Episode),
    RestartHideTimer,
    CancelHideTimer,
}

/// The playback state machine.
///
/// Translates player status events and user commands into snapshot mutations
/// plus a list of side-effect intents, which keeps every transition testable
/// without a real player.
pub struct PlaybackSession {
    episodes: Vec<Episode>,
    settings: Settings,
    snapshot: PlaybackSnapshot,
    /// One-shot gate for the completion-floor crossing. Reset on load.
    completion_signaled: bool,
    /// Whether the current pause was induced by a scrub gesture, so that
    /// ending the scrub resumes only pauses it caused. Reset on load.
    paused_by_scrub: bool,
}

impl PlaybackSession {
    pub fn new(episodes: Vec<Episode>, first: Episode, settings: Settings) -> Self {
        Self {
            episodes,
            settings,
            snapshot: PlaybackSnapshot {
                episode: first,
                episode_complete: false,
                is_paused: false,
                is_buffering: false,
                is_loading: true,
                has_error: false,
                position_ms: 0,
                duration_ms: 0,
                controls_visible: true,
            },
            completion_signaled: false,
            paused_by_scrub: false,
        }
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    pub fn set_episode_complete(&mut self, complete: bool) {
        self.snapshot.episode_complete = complete;
    }

    /// Select `episode` as current and stage a load at `start_position_ms`.
    ///
    /// Resets the per-episode one-shot flags and restarts the hide countdown.
    pub fn load_episode(&mut self, episode: Episode, start_position_ms: u64) -> Vec<Effect> {
        self.completion_signaled = false;
        self.paused_by_scrub = false;
        self.snapshot.episode = episode.clone();
        self.snapshot.is_paused = false;
        self.snapshot.is_buffering = false;
        self.snapshot.is_loading = true;
        self.snapshot.position_ms = start_position_ms;
        self.snapshot.duration_ms = 0;
        vec![
            self.hide_timer_effect(),
            Effect::Load {
                episode,
                start_position_ms,
            },
        ]
    }

    /// Central transition: apply one player status tick.
    ///
    /// Each step is independently applicable; a single tick can update the
    /// position, reconcile the loading flag, surface an error, and finish
    /// the stream.
    pub fn handle_status(&mut self, status: &PlayerStatus) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let Some(duration_ms) = status.duration_ms {
            self.snapshot.duration_ms = duration_ms;
        }
        if let Some(position_ms) = status.position_ms {
            self.snapshot.position_ms = position_ms;
            let decision = evaluate_tick(
                position_ms,
                self.snapshot.duration_ms,
                self.completion_signaled,
                self.settings.auto_mark,
                self.snapshot.episode_complete,
            );
            if decision.persist {
                effects.push(Effect::Persist {
                    series_id: self.snapshot.episode.series_id.clone(),
                    episode: self.snapshot.episode.number,
                    position_ms,
                });
            }
            if decision.delete_persisted {
                self.completion_signaled = true;
                effects.push(Effect::DeletePersisted {
                    series_id: self.snapshot.episode.series_id.clone(),
                });
            }
            if decision.mark_complete {
                self.snapshot.episode_complete = true;
                effects.push(Effect::MarkComplete(self.snapshot.episode.clone()));
            }
        }

        // Loading reconciliation. The buffering check only runs once loading
        // has cleared, and while loading only a playing tick clears it; a
        // momentary buffer during steady playback re-enters loading without
        // flickering through intermediate states.
        self.snapshot.is_buffering = status.is_buffering;
        if !self.snapshot.is_loading {
            if status.is_buffering && !status.is_playing && !self.snapshot.is_paused {
                self.snapshot.is_loading = true;
            }
        } else if status.is_playing {
            self.snapshot.is_loading = false;
        }

        if let Some(error) = &status.error {
            warn!("player reported unrecoverable error: {error}");
            self.snapshot.has_error = true;
            self.snapshot.is_loading = false;
        }

        if status.did_just_finish {
            self.snapshot.is_paused = true;
            if self.settings.autoplay {
                let target = auto_advance_target(
                    true,
                    self.snapshot.episode.number,
                    &self.episodes,
                )
                .and_then(|number| find_by_number(&self.episodes, number))
                .cloned();
                match target {
                    Some(next) => {
                        info!(
                            from = self.snapshot.episode.number,
                            to = next.number,
                            "auto-advancing"
                        );
                        effects.push(Effect::MarkCurrent(next.clone()));
                        effects.extend(self.load_episode(next, 0));
                    }
                    None => {
                        info!(
                            episode = self.snapshot.episode.number,
                            "stream ended with no matching next episode"
                        );
                    }
                }
            }
        }

        effects
    }

    /// No-op when already playing or while the error state is sticky.
    pub fn play(&mut self) -> Vec<Effect> {
        if self.snapshot.has_error || !self.snapshot.is_paused {
            return Vec::new();
        }
        self.snapshot.is_paused = false;
        vec![Effect::Play, self.hide_timer_effect()]
    }

    /// No-op when already paused or while the error state is sticky.
    pub fn pause(&mut self) -> Vec<Effect> {
        if self.snapshot.has_error || self.snapshot.is_paused {
            return Vec::new();
        }
        self.snapshot.is_paused = true;
        vec![Effect::Pause, self.hide_timer_effect()]
    }

    /// Discrete seek relative to the current position, clamped to the known
    /// duration. Paused state is unchanged.
    pub fn seek_by(&mut self, delta_ms: i64) -> Vec<Effect> {
        if self.snapshot.has_error {
            return Vec::new();
        }
        let target = self
            .snapshot
            .position_ms
            .saturating_add_signed(delta_ms)
            .min(self.snapshot.duration_ms);
        self.snapshot.position_ms = target;
        vec![Effect::Seek(target), self.hide_timer_effect()]
    }

    /// A scrub gesture started. Pauses playback if it was running and
    /// remembers that the scrub caused the pause; the controls must not
    /// vanish mid-gesture, so the hide countdown is cancelled without
    /// rescheduling.
    pub fn begin_scrub(&mut self) -> Vec<Effect> {
        if self.snapshot.has_error {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if !self.snapshot.is_paused {
            self.snapshot.is_paused = true;
            self.paused_by_scrub = true;
            effects.push(Effect::Pause);
        }
        effects.push(Effect::CancelHideTimer);
        effects
    }

    /// The scrub gesture ended at `target_ms`. Resumes playback only when
    /// the scrub itself induced the pause.
    pub fn end_scrub(&mut self, target_ms: u64) -> Vec<Effect> {
        if self.snapshot.has_error {
            return Vec::new();
        }
        self.snapshot.position_ms = target_ms;
        let mut effects = vec![Effect::Seek(target_ms)];
        if self.paused_by_scrub {
            self.paused_by_scrub = false;
            self.snapshot.is_paused = false;
            effects.push(Effect::Play);
        }
        effects.push(self.hide_timer_effect());
        effects
    }

    /// Clear the sticky error and reload the current episode at the last
    /// known position.
    pub fn retry(&mut self) -> Vec<Effect> {
        if !self.snapshot.has_error {
            return Vec::new();
        }
        self.snapshot.has_error = false;
        let episode = self.snapshot.episode.clone();
        let position_ms = self.snapshot.position_ms;
        self.load_episode(episode, position_ms)
    }

    /// User tap: invert control visibility. Becoming visible schedules the
    /// hide countdown; becoming hidden cancels any pending one.
    pub fn toggle_controls(&mut self) -> Vec<Effect> {
        self.snapshot.controls_visible = !self.snapshot.controls_visible;
        vec![self.hide_timer_effect()]
    }

    /// The hide countdown elapsed.
    pub fn controls_timeout(&mut self) {
        self.snapshot.controls_visible = false;
    }

    /// User toggled the completion checkbox.
    pub fn set_complete(&mut self, complete: bool) -> Vec<Effect> {
        self.snapshot.episode_complete = complete;
        if complete {
            vec![Effect::MarkComplete(self.snapshot.episode.clone())]
        } else {
            vec![Effect::UnmarkComplete(self.snapshot.episode.clone())]
        }
    }

    /// A load failed outside the status stream (resolver failure or player
    /// rejection). Sticky until `retry`.
    pub fn mark_load_error(&mut self) {
        self.snapshot.has_error = true;
        self.snapshot.is_loading = false;
    }

    fn hide_timer_effect(&self) -> Effect {
        if self.snapshot.controls_visible {
            Effect::RestartHideTimer
        } else {
            Effect::CancelHideTimer
        }
    }
}
